//! Balance sweep planning.
//!
//! Turns a wallet address into an unsigned transfer of everything above the
//! reserve, built against the first reachable RPC endpoint.

use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use solana_sdk::{hash::Hash, message::Message, pubkey::Pubkey, transaction::Transaction};
use solana_system_interface::instruction as system_instruction;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use super::price::PriceOracle;
use super::wire::encode_transaction;
use crate::domain::{
    AppError, BlockchainError, ChainRpc, Commitment, ReservePolicy, RpcConnector, SweepError,
    SweepPlan,
};

/// Default timeout for the per-endpoint liveness check
pub const DEFAULT_LIVENESS_TIMEOUT: Duration = Duration::from_secs(5);

/// Planner configuration
#[derive(Debug, Clone)]
pub struct PlannerConfig {
    /// Endpoints tried in order
    pub endpoints: Vec<String>,
    pub liveness_timeout: Duration,
    pub policy: ReservePolicy,
    /// Where swept funds go
    pub destination: Pubkey,
}

impl PlannerConfig {
    #[must_use]
    pub fn new(endpoints: Vec<String>, destination: Pubkey) -> Self {
        Self {
            endpoints,
            liveness_timeout: DEFAULT_LIVENESS_TIMEOUT,
            policy: ReservePolicy::default(),
            destination,
        }
    }
}

/// Plans balance sweeps
pub struct SweepPlanner {
    connector: Arc<dyn RpcConnector>,
    price_oracle: Arc<PriceOracle>,
    config: PlannerConfig,
}

impl SweepPlanner {
    #[must_use]
    pub fn new(
        connector: Arc<dyn RpcConnector>,
        price_oracle: Arc<PriceOracle>,
        config: PlannerConfig,
    ) -> Self {
        Self {
            connector,
            price_oracle,
            config,
        }
    }

    pub fn endpoints(&self) -> &[String] {
        &self.config.endpoints
    }

    pub fn policy(&self) -> &ReservePolicy {
        &self.config.policy
    }

    pub fn destination(&self) -> &Pubkey {
        &self.config.destination
    }

    pub fn connector(&self) -> &Arc<dyn RpcConnector> {
        &self.connector
    }

    /// Plan a sweep of `address`.
    ///
    /// Rejections (`InvalidAddress`, `InsufficientBalance`, `TransferTooSmall`)
    /// happen before any blockhash is fetched or transaction built.
    #[instrument(skip(self), fields(address = %address))]
    pub async fn plan(&self, address: &str) -> Result<SweepPlan, AppError> {
        let source = parse_address(address)?;
        if source == self.config.destination {
            return Err(SweepError::InvalidAddress(
                "Source wallet is the sweep destination".to_string(),
            )
            .into());
        }

        let (client, balance) = self.fetch_balance(&source).await?;
        let reference_price = self.price_oracle.quote().await;

        let policy = &self.config.policy;
        if balance < policy.minimum_balance {
            info!(balance = balance, "Sweep rejected: insufficient balance");
            return Err(SweepError::InsufficientBalance {
                balance_lamports: balance,
                required_lamports: policy.minimum_balance,
            }
            .into());
        }

        let reserve = policy.total_reserve();
        let transfer_amount = policy.transfer_amount(balance);
        if transfer_amount < policy.dust_threshold {
            info!(
                balance = balance,
                transfer_amount = transfer_amount,
                "Sweep rejected: transfer below dust threshold"
            );
            return Err(SweepError::TransferTooSmall {
                balance_lamports: balance,
                transfer_lamports: transfer_amount,
                dust_threshold: policy.dust_threshold,
            }
            .into());
        }

        let latest = client
            .get_latest_blockhash(Commitment::Finalized)
            .await
            .map_err(|e| SweepError::BlockhashFetchFailed(e.to_string()))?;
        let blockhash = Hash::from_str(&latest.blockhash).map_err(|e| {
            SweepError::BlockhashFetchFailed(format!(
                "Unparseable blockhash '{}': {}",
                latest.blockhash, e
            ))
        })?;

        let transaction =
            build_sweep_transaction(&source, &self.config.destination, transfer_amount, blockhash);
        let unsigned_transaction = encode_transaction(&transaction)?;

        let plan = SweepPlan {
            plan_id: Uuid::new_v4().to_string(),
            source: source.to_string(),
            destination: self.config.destination.to_string(),
            balance_lamports: balance,
            reserve_lamports: reserve,
            transfer_amount_lamports: transfer_amount,
            blockhash: latest.blockhash,
            last_valid_block_height: latest.last_valid_block_height,
            unsigned_transaction,
            reference_price,
            endpoint: client.endpoint().to_string(),
        };

        info!(
            plan_id = %plan.plan_id,
            endpoint = %plan.endpoint,
            balance = balance,
            transfer_amount = transfer_amount,
            value_usd = plan.transfer_value_usd(),
            "Sweep planned"
        );
        Ok(plan)
    }

    /// Walk the endpoint list until one answers the liveness check and the
    /// balance query
    async fn fetch_balance(&self, source: &Pubkey) -> Result<(Arc<dyn ChainRpc>, u64), AppError> {
        let mut last_error = "no endpoints configured".to_string();

        for endpoint in &self.config.endpoints {
            let client = match self.connector.connect(endpoint) {
                Ok(client) => client,
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "Failed to create RPC client");
                    last_error = e.to_string();
                    continue;
                }
            };

            match tokio::time::timeout(self.config.liveness_timeout, client.get_block_height())
                .await
            {
                Ok(Ok(height)) => debug!(endpoint = %endpoint, height = height, "Endpoint live"),
                Ok(Err(e)) => {
                    warn!(endpoint = %endpoint, error = %e, "Liveness check failed");
                    last_error = e.to_string();
                    continue;
                }
                Err(_) => {
                    let e = BlockchainError::Timeout(format!(
                        "{} did not answer within {}ms",
                        endpoint,
                        self.config.liveness_timeout.as_millis()
                    ));
                    warn!(endpoint = %endpoint, "Liveness check timed out");
                    last_error = e.to_string();
                    continue;
                }
            }

            match client.get_balance(source, Commitment::Confirmed).await {
                Ok(balance) => return Ok((client, balance)),
                Err(e) => {
                    warn!(endpoint = %endpoint, error = %e, "Balance fetch failed");
                    last_error = e.to_string();
                }
            }
        }

        Err(SweepError::NetworkUnavailable { last_error }.into())
    }
}

/// Parse a base58 account address
pub fn parse_address(address: &str) -> Result<Pubkey, AppError> {
    Pubkey::from_str(address.trim())
        .map_err(|e| SweepError::InvalidAddress(format!("{}: {}", address, e)).into())
}

/// Single system transfer, fee paid by `source`, left unsigned
#[must_use]
pub fn build_sweep_transaction(
    source: &Pubkey,
    destination: &Pubkey,
    lamports: u64,
    recent_blockhash: Hash,
) -> Transaction {
    let instruction = system_instruction::transfer(source, destination, lamports);
    let message = Message::new_with_blockhash(&[instruction], Some(source), &recent_blockhash);
    Transaction::new_unsigned(message)
}
