//! End-to-end sweep: plan, have the owner's wallet sign, broadcast.

use std::sync::Arc;

use serde::Serialize;
use tracing::{info, instrument, warn};

use super::broadcaster::Broadcaster;
use super::planner::SweepPlanner;
use super::wire::{decode_transaction, serialize_transaction};
use crate::domain::{AppError, BroadcastResult, SweepError, SweepPlan, WalletSigner};

/// A planned sweep and its confirmed broadcast
#[derive(Debug, Clone, Serialize)]
pub struct SweepReceipt {
    pub plan: SweepPlan,
    pub result: BroadcastResult,
}

pub struct SweepFlow {
    planner: Arc<SweepPlanner>,
    broadcaster: Arc<Broadcaster>,
}

impl SweepFlow {
    #[must_use]
    pub fn new(planner: Arc<SweepPlanner>, broadcaster: Arc<Broadcaster>) -> Self {
        Self {
            planner,
            broadcaster,
        }
    }

    /// Sweep the wallet behind `signer`.
    ///
    /// The wallet must sign exactly the planned message; a wallet that
    /// declines or alters it yields `SigningRejected` and nothing is sent.
    #[instrument(skip(self, signer))]
    pub async fn execute(&self, signer: &dyn WalletSigner) -> Result<SweepReceipt, AppError> {
        let owner = signer.connect().await.map_err(signing_rejected)?;
        let plan = self.planner.plan(&owner.to_string()).await?;

        let unsigned = decode_transaction(&plan.unsigned_transaction)?;
        let signed = signer
            .sign_transaction(unsigned.clone())
            .await
            .map_err(signing_rejected)?;

        if signed.message != unsigned.message {
            warn!(plan_id = %plan.plan_id, "Wallet returned a different message than planned");
            return Err(SweepError::SigningRejected(
                "Signed message does not match the planned transaction".to_string(),
            )
            .into());
        }

        let wire = serialize_transaction(&signed)?;
        let result = self
            .broadcaster
            .broadcast(&wire, &plan.blockhash, plan.last_valid_block_height)
            .await?;

        info!(plan_id = %plan.plan_id, signature = %result.signature, "Sweep complete");
        Ok(SweepReceipt { plan, result })
    }
}

fn signing_rejected(error: AppError) -> AppError {
    match error {
        AppError::Sweep(SweepError::SigningRejected(_)) => error,
        other => SweepError::SigningRejected(other.to_string()).into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::planner::PlannerConfig;
    use crate::app::price::PriceOracle;
    use crate::app::wire::deserialize_transaction;
    use crate::domain::ChainRpc;
    use crate::test_utils::{MockChainRpc, MockRpcConnector, MockWalletSigner};
    use solana_sdk::pubkey::Pubkey;
    use std::sync::atomic::Ordering;

    fn flow_with(rpc: Arc<MockChainRpc>) -> SweepFlow {
        let endpoints = vec![rpc.endpoint().to_string()];
        let connector = Arc::new(MockRpcConnector::with_endpoints(vec![rpc]));
        let planner = SweepPlanner::new(
            connector.clone(),
            Arc::new(PriceOracle::new(Vec::new())),
            PlannerConfig::new(endpoints.clone(), Pubkey::new_unique()),
        );
        let broadcaster = Broadcaster::new(connector, endpoints);
        SweepFlow::new(Arc::new(planner), Arc::new(broadcaster))
    }

    #[tokio::test]
    async fn test_execute_signs_and_broadcasts_planned_transaction() {
        let rpc = Arc::new(
            MockChainRpc::new("http://a")
                .with_balance(2_000_000_000)
                .with_signature("sig_ok"),
        );
        let flow = flow_with(rpc.clone());
        let wallet = MockWalletSigner::new();

        let receipt = flow.execute(&wallet).await.unwrap();

        assert_eq!(receipt.result.signature, "sig_ok");
        assert_eq!(receipt.plan.source, wallet.pubkey().to_string());
        let sent = deserialize_transaction(&rpc.sent_transactions()[0].0).unwrap();
        assert_eq!(sent.message.account_keys[0], wallet.pubkey());
        assert_eq!(sent.message.recent_blockhash.to_string(), receipt.plan.blockhash);
    }

    #[tokio::test]
    async fn test_execute_surfaces_wallet_rejection() {
        let rpc = Arc::new(MockChainRpc::new("http://a").with_balance(2_000_000_000));
        let flow = flow_with(rpc.clone());
        let wallet = MockWalletSigner::rejecting();

        let result = flow.execute(&wallet).await;
        assert!(matches!(
            result,
            Err(AppError::Sweep(SweepError::SigningRejected(_)))
        ));
        assert_eq!(wallet.sign_count(), 1);
        assert_eq!(rpc.calls.send.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_refuses_altered_transaction() {
        let rpc = Arc::new(MockChainRpc::new("http://a").with_balance(2_000_000_000));
        let flow = flow_with(rpc.clone());

        let result = flow.execute(&MockWalletSigner::tampering()).await;
        assert!(matches!(
            result,
            Err(AppError::Sweep(SweepError::SigningRejected(_)))
        ));
        assert_eq!(rpc.calls.send.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_execute_stops_on_planner_rejection() {
        let rpc = Arc::new(MockChainRpc::new("http://a").with_balance(1));
        let flow = flow_with(rpc);
        let wallet = MockWalletSigner::new();

        let result = flow.execute(&wallet).await;
        assert!(matches!(
            result,
            Err(AppError::Sweep(SweepError::InsufficientBalance { .. }))
        ));
        assert_eq!(wallet.sign_count(), 0);
    }
}
