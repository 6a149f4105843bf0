//! HTTP-based integration tests for the JSON-RPC chain client and price providers.
//!
//! Uses `wiremock` to stand in for Solana RPC nodes, CoinGecko and Binance.

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use solana_sdk::pubkey::Pubkey;
use wiremock::{
    Mock, MockServer, ResponseTemplate,
    matchers::{body_partial_json, method, path, query_param},
};

use solana_sweep_service::domain::{
    AppError, BlockchainError, ChainRpc, Commitment, ExternalServiceError, PriceProvider,
    SendOptions,
};
use solana_sweep_service::infra::{
    BinancePriceProvider, CoinGeckoPriceProvider, RpcChainClient, RpcClientConfig,
};

const BLOCKHASH: &str = "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N";

fn rpc_result(result: serde_json::Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(json!({
        "jsonrpc": "2.0",
        "id": 1,
        "result": result
    }))
}

fn fast_config() -> RpcClientConfig {
    RpcClientConfig {
        timeout: Duration::from_secs(2),
        confirmation_timeout: Duration::from_secs(2),
        poll_interval: Duration::from_millis(10),
    }
}

// ============================================================================
// JSON-RPC CHAIN CLIENT TESTS
// ============================================================================

mod rpc_chain_client_tests {
    use super::*;

    #[tokio::test]
    async fn test_get_balance_sends_commitment_and_parses_value() {
        let mock_server = MockServer::start().await;
        let address = Pubkey::new_unique();

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "getBalance",
                "params": [address.to_string(), {"commitment": "confirmed"}]
            })))
            .respond_with(rpc_result(json!({
                "context": {"slot": 1},
                "value": 1_000_000_000u64
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = RpcChainClient::new(&mock_server.uri(), fast_config()).unwrap();
        let balance = client
            .get_balance(&address, Commitment::Confirmed)
            .await
            .unwrap();
        assert_eq!(balance, 1_000_000_000);
    }

    #[tokio::test]
    async fn test_get_latest_blockhash() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "getLatestBlockhash"})))
            .respond_with(rpc_result(json!({
                "context": {"slot": 1},
                "value": {"blockhash": BLOCKHASH, "lastValidBlockHeight": 3090}
            })))
            .mount(&mock_server)
            .await;

        let client = RpcChainClient::new(&mock_server.uri(), fast_config()).unwrap();
        let latest = client
            .get_latest_blockhash(Commitment::Finalized)
            .await
            .unwrap();
        assert_eq!(latest.blockhash, BLOCKHASH);
        assert_eq!(latest.last_valid_block_height, 3090);
    }

    #[tokio::test]
    async fn test_send_transaction_uses_base64_and_preflight() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({
                "method": "sendTransaction",
                "params": ["AQID", {
                    "encoding": "base64",
                    "skipPreflight": false,
                    "preflightCommitment": "confirmed"
                }]
            })))
            .respond_with(rpc_result(json!("5eykt4UsFv8P8NJdTREpY1vzqKqZKvdpKuc147dw2N9d")))
            .expect(1)
            .mount(&mock_server)
            .await;

        let client = RpcChainClient::new(&mock_server.uri(), fast_config()).unwrap();
        let signature = client
            .send_raw_transaction(&[1, 2, 3], SendOptions::default())
            .await
            .unwrap();
        assert_eq!(signature, "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdpKuc147dw2N9d");
    }

    #[tokio::test]
    async fn test_rpc_error_is_surfaced_with_code() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": {"code": -32002, "message": "Transaction simulation failed"}
            })))
            .mount(&mock_server)
            .await;

        let client = RpcChainClient::new(&mock_server.uri(), fast_config()).unwrap();
        let result = client
            .send_raw_transaction(&[1, 2, 3], SendOptions::default())
            .await;

        match result {
            Err(AppError::Blockchain(BlockchainError::RpcError(message))) => {
                assert!(message.contains("-32002"));
                assert!(message.contains("simulation failed"));
            }
            other => panic!("Expected RpcError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(503).set_body_string("Service Unavailable"))
            .mount(&mock_server)
            .await;

        let client = RpcChainClient::new(&mock_server.uri(), fast_config()).unwrap();
        let result = client.get_block_height().await;
        assert!(matches!(
            result,
            Err(AppError::Blockchain(BlockchainError::RpcError(_)))
        ));
    }

    #[tokio::test]
    async fn test_malformed_result_is_invalid_response() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(rpc_result(json!({"unexpected": true})))
            .mount(&mock_server)
            .await;

        let client = RpcChainClient::new(&mock_server.uri(), fast_config()).unwrap();
        let result = client
            .get_balance(&Pubkey::new_unique(), Commitment::Confirmed)
            .await;
        assert!(matches!(
            result,
            Err(AppError::Blockchain(BlockchainError::InvalidResponse(_)))
        ));
    }

    #[tokio::test]
    async fn test_confirm_transaction_reaches_confirmed() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "getSignatureStatuses"})))
            .respond_with(rpc_result(json!({
                "context": {"slot": 1},
                "value": [{
                    "slot": 1,
                    "confirmations": 10,
                    "err": null,
                    "confirmationStatus": "confirmed"
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = RpcChainClient::new(&mock_server.uri(), fast_config()).unwrap();
        client
            .confirm_transaction("sig", BLOCKHASH, 1000, Commitment::Confirmed)
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn test_confirm_transaction_reports_on_chain_failure() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "getSignatureStatuses"})))
            .respond_with(rpc_result(json!({
                "context": {"slot": 1},
                "value": [{
                    "slot": 1,
                    "confirmations": 0,
                    "err": {"InstructionError": [0, "Custom"]},
                    "confirmationStatus": "processed"
                }]
            })))
            .mount(&mock_server)
            .await;

        let client = RpcChainClient::new(&mock_server.uri(), fast_config()).unwrap();
        let result = client
            .confirm_transaction("sig", BLOCKHASH, 1000, Commitment::Confirmed)
            .await;
        assert!(matches!(
            result,
            Err(AppError::Blockchain(BlockchainError::TransactionFailed(_)))
        ));
    }

    #[tokio::test]
    async fn test_confirm_transaction_detects_expired_blockhash() {
        let mock_server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "getSignatureStatuses"})))
            .respond_with(rpc_result(json!({
                "context": {"slot": 1},
                "value": [null]
            })))
            .mount(&mock_server)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "getBlockHeight"})))
            .respond_with(rpc_result(json!(1001)))
            .mount(&mock_server)
            .await;

        let client = RpcChainClient::new(&mock_server.uri(), fast_config()).unwrap();
        let result = client
            .confirm_transaction("sig", BLOCKHASH, 1000, Commitment::Confirmed)
            .await;
        assert!(matches!(
            result,
            Err(AppError::Blockchain(BlockchainError::BlockhashExpired {
                last_valid_block_height: 1000,
                current_height: 1001
            }))
        ));
    }
}

// ============================================================================
// PRICE PROVIDER TESTS
// ============================================================================

mod price_provider_tests {
    use super::*;
    use solana_sweep_service::app::PriceOracle;

    const TIMEOUT: Duration = Duration::from_secs(2);

    #[tokio::test]
    async fn test_coingecko_parses_simple_price() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .and(query_param("ids", "solana"))
            .and(query_param("vs_currencies", "usd"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"solana": {"usd": 171.42}})),
            )
            .mount(&mock_server)
            .await;

        let provider = CoinGeckoPriceProvider::new(Some(mock_server.uri()), TIMEOUT).unwrap();
        assert_eq!(provider.fetch_price().await.unwrap(), 171.42);
    }

    #[tokio::test]
    async fn test_binance_parses_string_price() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ticker/price"))
            .and(query_param("symbol", "SOLUSDT"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"symbol": "SOLUSDT", "price": "168.25000000"})),
            )
            .mount(&mock_server)
            .await;

        let provider = BinancePriceProvider::new(Some(mock_server.uri()), TIMEOUT).unwrap();
        assert_eq!(provider.fetch_price().await.unwrap(), 168.25);
    }

    #[tokio::test]
    async fn test_coingecko_malformed_json() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/simple/price"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&mock_server)
            .await;

        let provider = CoinGeckoPriceProvider::new(Some(mock_server.uri()), TIMEOUT).unwrap();
        assert!(matches!(
            provider.fetch_price().await,
            Err(AppError::ExternalService(
                ExternalServiceError::MalformedResponse(_)
            ))
        ));
    }

    #[tokio::test]
    async fn test_binance_rate_limited_429() {
        let mock_server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/ticker/price"))
            .respond_with(ResponseTemplate::new(429))
            .mount(&mock_server)
            .await;

        let provider = BinancePriceProvider::new(Some(mock_server.uri()), TIMEOUT).unwrap();
        assert!(matches!(
            provider.fetch_price().await,
            Err(AppError::ExternalService(ExternalServiceError::RateLimited(
                _
            )))
        ));
    }

    #[tokio::test]
    async fn test_oracle_falls_back_when_providers_fail() {
        let coingecko_server = MockServer::start().await;
        let binance_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&coingecko_server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"price": "-1"})))
            .mount(&binance_server)
            .await;

        let oracle = PriceOracle::new(vec![
            Arc::new(CoinGeckoPriceProvider::new(Some(coingecko_server.uri()), TIMEOUT).unwrap())
                as Arc<dyn PriceProvider>,
            Arc::new(BinancePriceProvider::new(Some(binance_server.uri()), TIMEOUT).unwrap()),
        ])
        .with_fallback_price(99.5);

        let quote = oracle.quote().await;
        assert!(quote.is_fallback);
        assert_eq!(quote.price_usd, 99.5);
    }

    #[tokio::test]
    async fn test_oracle_uses_whichever_provider_answers() {
        let coingecko_server = MockServer::start().await;
        let binance_server = MockServer::start().await;

        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&coingecko_server)
            .await;
        Mock::given(method("GET"))
            .and(path("/ticker/price"))
            .respond_with(
                ResponseTemplate::new(200).set_body_json(json!({"price": "150.00"})),
            )
            .mount(&binance_server)
            .await;

        let oracle = PriceOracle::new(vec![
            Arc::new(CoinGeckoPriceProvider::new(Some(coingecko_server.uri()), TIMEOUT).unwrap())
                as Arc<dyn PriceProvider>,
            Arc::new(BinancePriceProvider::new(Some(binance_server.uri()), TIMEOUT).unwrap()),
        ]);

        let quote = oracle.quote().await;
        assert_eq!(quote.source, "binance");
        assert_eq!(quote.price_usd, 150.0);
        assert!(!quote.is_fallback);
    }
}

// ============================================================================
// PLANNER OVER HTTP
// ============================================================================

mod planner_failover_tests {
    use super::*;
    use solana_sweep_service::app::{PlannerConfig, PriceOracle, SweepPlanner};
    use solana_sweep_service::infra::HttpRpcConnector;

    #[tokio::test]
    async fn test_planner_skips_failing_node() {
        let broken = MockServer::start().await;
        let healthy = MockServer::start().await;

        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&broken)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "getBlockHeight"})))
            .respond_with(rpc_result(json!(2900)))
            .mount(&healthy)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "getBalance"})))
            .respond_with(rpc_result(json!({"context": {"slot": 1}, "value": 1_000_000_000u64})))
            .mount(&healthy)
            .await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({"method": "getLatestBlockhash"})))
            .respond_with(rpc_result(json!({
                "context": {"slot": 1},
                "value": {"blockhash": BLOCKHASH, "lastValidBlockHeight": 3050}
            })))
            .mount(&healthy)
            .await;

        let planner = SweepPlanner::new(
            Arc::new(HttpRpcConnector::new(fast_config())),
            Arc::new(PriceOracle::new(Vec::new())),
            PlannerConfig::new(vec![broken.uri(), healthy.uri()], Pubkey::new_unique()),
        );

        let plan = planner.plan(&Pubkey::new_unique().to_string()).await.unwrap();
        assert_eq!(plan.endpoint, healthy.uri());
        assert_eq!(plan.transfer_amount_lamports, 969_015_450);
        assert_eq!(plan.blockhash, BLOCKHASH);
        assert_eq!(plan.last_valid_block_height, 3050);
        assert!(plan.reference_price.is_fallback);
    }
}
