//! Application service: request validation around the planner and broadcaster.

use std::sync::Arc;
use std::time::Duration;

use futures_util::future::join_all;
use tracing::{info, instrument, warn};
use validator::Validate;

use super::broadcaster::Broadcaster;
use super::planner::SweepPlanner;
use super::wire::decode_base64;
use crate::domain::{
    AppError, BroadcastRequest, BroadcastResult, EndpointHealth, HealthResponse,
    PlanSweepRequest, RpcConnector, SweepError, SweepPlan, ValidationError,
};

/// Per-endpoint timeout for health checks
const HEALTH_CHECK_TIMEOUT: Duration = Duration::from_secs(3);

/// Application service containing business logic
pub struct AppService {
    planner: Arc<SweepPlanner>,
    broadcaster: Arc<Broadcaster>,
}

impl AppService {
    #[must_use]
    pub fn new(planner: Arc<SweepPlanner>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            planner,
            broadcaster,
        }
    }

    pub fn planner(&self) -> &Arc<SweepPlanner> {
        &self.planner
    }

    pub fn broadcaster(&self) -> &Arc<Broadcaster> {
        &self.broadcaster
    }

    #[instrument(skip(self, request), fields(address = %request.address))]
    pub async fn plan_sweep(&self, request: &PlanSweepRequest) -> Result<SweepPlan, AppError> {
        // The address is the only field, so any failure is an unusable address
        request.validate().map_err(|e| {
            warn!(error = %e, "Validation failed");
            AppError::Sweep(SweepError::InvalidAddress(format!(
                "'{}': {}",
                request.address, e
            )))
        })?;

        self.planner.plan(&request.address).await
    }

    #[instrument(skip(self, request), fields(blockhash = %request.blockhash))]
    pub async fn broadcast_sweep(
        &self,
        request: &BroadcastRequest,
    ) -> Result<BroadcastResult, AppError> {
        request.validate().map_err(|e| {
            warn!(error = %e, "Validation failed");
            AppError::Validation(ValidationError::Multiple(e.to_string()))
        })?;

        let wire = decode_base64("signed_transaction", &request.signed_transaction)?;
        let result = self
            .broadcaster
            .broadcast(&wire, &request.blockhash, request.last_valid_block_height)
            .await?;

        info!(signature = %result.signature, endpoint = %result.endpoint, "Broadcast accepted");
        Ok(result)
    }

    /// Check every configured endpoint concurrently
    pub async fn health_check(&self) -> HealthResponse {
        let connector = self.planner.connector();
        let (planner, broadcast) = tokio::join!(
            check_endpoints(connector.as_ref(), self.planner.endpoints()),
            check_endpoints(connector.as_ref(), self.broadcaster.endpoints()),
        );
        HealthResponse::new(planner, broadcast)
    }
}

async fn check_endpoints(connector: &dyn RpcConnector, endpoints: &[String]) -> EndpointHealth {
    let checks = endpoints.iter().map(|endpoint| async move {
        let Ok(client) = connector.connect(endpoint) else {
            return false;
        };
        matches!(
            tokio::time::timeout(HEALTH_CHECK_TIMEOUT, client.get_block_height()).await,
            Ok(Ok(_))
        )
    });
    let reachable = join_all(checks).await.into_iter().filter(|ok| *ok).count();

    EndpointHealth {
        reachable,
        configured: endpoints.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::planner::PlannerConfig;
    use crate::app::price::PriceOracle;
    use crate::domain::{ChainRpc, HealthStatus};
    use crate::test_utils::{MockChainRpc, MockRpcConnector};
    use solana_sdk::pubkey::Pubkey;

    fn service_with(mocks: Vec<Arc<MockChainRpc>>) -> AppService {
        let endpoints: Vec<String> = mocks.iter().map(|m| m.endpoint().to_string()).collect();
        let connector = Arc::new(MockRpcConnector::with_endpoints(mocks));
        let planner = SweepPlanner::new(
            connector.clone(),
            Arc::new(PriceOracle::new(Vec::new())),
            PlannerConfig::new(endpoints.clone(), Pubkey::new_unique()),
        );
        let broadcaster = Broadcaster::new(connector, endpoints);
        AppService::new(Arc::new(planner), Arc::new(broadcaster))
    }

    #[tokio::test]
    async fn test_plan_sweep_rejects_malformed_address_without_network() {
        let rpc = Arc::new(MockChainRpc::new("http://a"));
        let service = service_with(vec![rpc.clone()]);

        let too_long = "1".repeat(60);
        for address in ["", "abc", too_long.as_str()] {
            let result = service.plan_sweep(&PlanSweepRequest::new(address)).await;
            assert!(
                matches!(result, Err(AppError::Sweep(SweepError::InvalidAddress(_)))),
                "{address:?}"
            );
        }
        assert_eq!(rpc.calls.total(), 0);
    }

    #[tokio::test]
    async fn test_plan_sweep_delegates_to_planner() {
        let service = service_with(vec![Arc::new(
            MockChainRpc::new("http://a").with_balance(1_000_000_000),
        )]);
        let plan = service
            .plan_sweep(&PlanSweepRequest::new(Pubkey::new_unique().to_string()))
            .await
            .unwrap();
        assert_eq!(plan.transfer_amount_lamports, 969_015_450);
    }

    #[tokio::test]
    async fn test_broadcast_sweep_rejects_bad_base64() {
        let service = service_with(vec![Arc::new(MockChainRpc::new("http://a"))]);
        let request = BroadcastRequest {
            signed_transaction: "%%%".to_string(),
            blockhash: "EkSnNWid2cvwEVnVx9aBqawnmiCNiDgp3gUdkDPTKN1N".to_string(),
            last_valid_block_height: 10,
        };
        let result = service.broadcast_sweep(&request).await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn test_health_check_counts_reachable_endpoints() {
        let service = service_with(vec![
            Arc::new(MockChainRpc::new("http://a")),
            Arc::new(MockChainRpc::new("http://b").failing_liveness("down")),
        ]);
        let health = service.health_check().await;
        assert_eq!(health.planner_endpoints.reachable, 1);
        assert_eq!(health.planner_endpoints.configured, 2);
        assert_eq!(health.status, HealthStatus::Degraded);
    }

    #[tokio::test]
    async fn test_health_check_all_down() {
        let service = service_with(vec![Arc::new(
            MockChainRpc::new("http://a").failing_liveness("down"),
        )]);
        let health = service.health_check().await;
        assert_eq!(health.status, HealthStatus::Unhealthy);

        // And planning reports the outage as a typed rejection
        let result = service
            .plan_sweep(&PlanSweepRequest::new(Pubkey::new_unique().to_string()))
            .await;
        assert!(matches!(
            result,
            Err(AppError::Sweep(SweepError::NetworkUnavailable { .. }))
        ));
    }
}
