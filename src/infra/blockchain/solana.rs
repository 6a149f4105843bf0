//! JSON-RPC chain client for Solana.
//!
//! `RpcChainClient` speaks the handful of RPC methods the sweep needs on top
//! of a pluggable `JsonRpcTransport`, so the request/response handling can be
//! unit tested without a network.

use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use base64::Engine;
use base64::engine::general_purpose::STANDARD as BASE64_STANDARD;
use reqwest::Client;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use solana_sdk::pubkey::Pubkey;
use tracing::{debug, info, instrument, warn};

use crate::domain::{
    AppError, BlockchainError, ChainRpc, Commitment, LatestBlockhash, RpcConnector, SendOptions,
};

/// Public mainnet endpoints tried, in order, when planning a sweep
pub const DEFAULT_PLANNER_ENDPOINTS: &[&str] = &[
    "https://api.mainnet-beta.solana.com",
    "https://solana-rpc.publicnode.com",
    "https://rpc.ankr.com/solana",
    "https://solana.drpc.org",
];

/// Public mainnet endpoints tried, in order, when broadcasting
pub const DEFAULT_BROADCAST_ENDPOINTS: &[&str] = &[
    "https://api.mainnet-beta.solana.com",
    "https://solana-rpc.publicnode.com",
    "https://solana.drpc.org",
];

/// Configuration for the RPC client
#[derive(Debug, Clone)]
pub struct RpcClientConfig {
    pub timeout: Duration,
    pub confirmation_timeout: Duration,
    pub poll_interval: Duration,
}

impl Default for RpcClientConfig {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            confirmation_timeout: Duration::from_secs(60),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// Transport for raw JSON-RPC calls
#[async_trait]
pub trait JsonRpcTransport: Send + Sync {
    async fn send_request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, AppError>;
}

/// HTTP transport backed by `reqwest`
pub struct HttpJsonRpcTransport {
    http_client: Client,
    rpc_url: String,
}

impl HttpJsonRpcTransport {
    pub fn new(rpc_url: &str, timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AppError::Blockchain(BlockchainError::Connection(e.to_string())))?;

        Ok(Self {
            http_client,
            rpc_url: rpc_url.to_string(),
        })
    }
}

#[async_trait]
impl JsonRpcTransport for HttpJsonRpcTransport {
    async fn send_request(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<serde_json::Value, AppError> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 1,
            method: method.to_string(),
            params,
        };

        let response = self
            .http_client
            .post(&self.rpc_url)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    AppError::Blockchain(BlockchainError::Timeout(e.to_string()))
                } else if e.is_connect() {
                    AppError::Blockchain(BlockchainError::Connection(e.to_string()))
                } else {
                    AppError::Blockchain(BlockchainError::RpcError(e.to_string()))
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(AppError::Blockchain(BlockchainError::RpcError(format!(
                "HTTP {}",
                status
            ))));
        }

        let rpc_response: JsonRpcResponse<serde_json::Value> = response
            .json()
            .await
            .map_err(|e| AppError::Blockchain(BlockchainError::InvalidResponse(e.to_string())))?;

        if let Some(error) = rpc_response.error {
            return Err(AppError::Blockchain(BlockchainError::RpcError(format!(
                "{}: {}",
                error.code, error.message
            ))));
        }

        rpc_response.result.ok_or_else(|| {
            AppError::Blockchain(BlockchainError::InvalidResponse(
                "Empty response".to_string(),
            ))
        })
    }
}

#[derive(Debug, Serialize)]
struct JsonRpcRequest<T: Serialize> {
    jsonrpc: &'static str,
    id: u64,
    method: String,
    params: T,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse<T> {
    result: Option<T>,
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct RpcValue<T> {
    value: T,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BlockhashValue {
    blockhash: String,
    last_valid_block_height: u64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignatureStatus {
    confirmations: Option<u64>,
    err: Option<serde_json::Value>,
    confirmation_status: Option<String>,
}

impl SignatureStatus {
    /// Commitment reached so far. A null confirmation count means the slot is rooted.
    fn reached(&self) -> Commitment {
        match self.confirmation_status.as_deref().map(str::parse::<Commitment>) {
            Some(Ok(commitment)) => commitment,
            _ if self.confirmations.is_none() => Commitment::Finalized,
            _ => Commitment::Processed,
        }
    }
}

/// Solana chain client for a single endpoint
pub struct RpcChainClient {
    transport: Box<dyn JsonRpcTransport>,
    endpoint: String,
    config: RpcClientConfig,
}

impl RpcChainClient {
    /// Create a client that talks HTTP to `rpc_url`
    pub fn new(rpc_url: &str, config: RpcClientConfig) -> Result<Self, AppError> {
        let transport = HttpJsonRpcTransport::new(rpc_url, config.timeout)?;
        debug!(rpc_url = %rpc_url, "Created chain RPC client");
        Ok(Self {
            transport: Box::new(transport),
            endpoint: rpc_url.to_string(),
            config,
        })
    }

    /// Create a client over a specific transport (useful for testing)
    pub fn with_transport(
        endpoint: impl Into<String>,
        transport: Box<dyn JsonRpcTransport>,
        config: RpcClientConfig,
    ) -> Self {
        Self {
            transport,
            endpoint: endpoint.into(),
            config,
        }
    }

    #[instrument(skip(self, params), fields(endpoint = %self.endpoint))]
    async fn rpc_call<R: DeserializeOwned>(
        &self,
        method: &str,
        params: serde_json::Value,
    ) -> Result<R, AppError> {
        let value = self.transport.send_request(method, params).await?;
        serde_json::from_value(value).map_err(|e| {
            AppError::Blockchain(BlockchainError::InvalidResponse(format!(
                "{}: {}",
                method, e
            )))
        })
    }

    async fn signature_status(&self, signature: &str) -> Result<Option<SignatureStatus>, AppError> {
        let params = serde_json::json!([[signature], {"searchTransactionHistory": false}]);
        let result: RpcValue<Vec<Option<SignatureStatus>>> =
            self.rpc_call("getSignatureStatuses", params).await?;
        Ok(result.value.into_iter().next().flatten())
    }
}

#[async_trait]
impl ChainRpc for RpcChainClient {
    fn endpoint(&self) -> &str {
        &self.endpoint
    }

    async fn get_block_height(&self) -> Result<u64, AppError> {
        self.rpc_call("getBlockHeight", serde_json::json!([])).await
    }

    async fn get_balance(
        &self,
        address: &Pubkey,
        commitment: Commitment,
    ) -> Result<u64, AppError> {
        let params = serde_json::json!([address.to_string(), {"commitment": commitment.as_str()}]);
        let result: RpcValue<u64> = self.rpc_call("getBalance", params).await?;
        Ok(result.value)
    }

    async fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> Result<LatestBlockhash, AppError> {
        let params = serde_json::json!([{"commitment": commitment.as_str()}]);
        let result: RpcValue<BlockhashValue> = self.rpc_call("getLatestBlockhash", params).await?;
        Ok(LatestBlockhash {
            blockhash: result.value.blockhash,
            last_valid_block_height: result.value.last_valid_block_height,
        })
    }

    async fn send_raw_transaction(
        &self,
        wire_transaction: &[u8],
        options: SendOptions,
    ) -> Result<String, AppError> {
        let encoded = BASE64_STANDARD.encode(wire_transaction);
        let params = serde_json::json!([
            encoded,
            {
                "encoding": "base64",
                "skipPreflight": options.skip_preflight,
                "preflightCommitment": options.preflight_commitment.as_str(),
            }
        ]);
        self.rpc_call("sendTransaction", params).await
    }

    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn confirm_transaction(
        &self,
        signature: &str,
        blockhash: &str,
        last_valid_block_height: u64,
        commitment: Commitment,
    ) -> Result<(), AppError> {
        let start = Instant::now();

        loop {
            match self.signature_status(signature).await {
                Ok(Some(status)) if status.err.is_some() => {
                    return Err(AppError::Blockchain(BlockchainError::TransactionFailed(
                        format!("{:?}", status.err),
                    )));
                }
                Ok(Some(status)) if status.reached() >= commitment => {
                    info!(signature = %signature, commitment = %commitment, "Transaction confirmed");
                    return Ok(());
                }
                Ok(_) => {
                    debug!(signature = %signature, "Transaction not yet confirmed");
                }
                Err(e) => {
                    warn!(signature = %signature, error = %e, "Error checking signature status");
                }
            }

            match self.get_block_height().await {
                Ok(current_height) if current_height > last_valid_block_height => {
                    return Err(AppError::Blockchain(BlockchainError::BlockhashExpired {
                        last_valid_block_height,
                        current_height,
                    }));
                }
                Ok(_) => {}
                Err(e) => {
                    warn!(error = %e, "Error checking block height during confirmation");
                }
            }

            if start.elapsed() >= self.config.confirmation_timeout {
                return Err(AppError::Blockchain(BlockchainError::Timeout(format!(
                    "Transaction {} not confirmed within {}s",
                    signature,
                    self.config.confirmation_timeout.as_secs()
                ))));
            }

            tokio::time::sleep(self.config.poll_interval).await;
        }
    }
}

/// Builds HTTP chain clients sharing one configuration
#[derive(Debug, Clone, Default)]
pub struct HttpRpcConnector {
    config: RpcClientConfig,
}

impl HttpRpcConnector {
    #[must_use]
    pub fn new(config: RpcClientConfig) -> Self {
        Self { config }
    }
}

impl RpcConnector for HttpRpcConnector {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn ChainRpc>, AppError> {
        Ok(Arc::new(RpcChainClient::new(endpoint, self.config.clone())?))
    }
}
