//! Domain types with validation support.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use solana_commitment_config::CommitmentConfig;
use utoipa::ToSchema;
use validator::Validate;

/// Lamports per SOL
pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;

/// Basis-point denominator for the sweep fraction
pub const BPS_DENOMINATOR: u64 = 10_000;

/// Fee and reserve constants applied before a sweep.
///
/// The total reserve (`network_fee + safety_buffer + minimum_reserve`) is kept
/// back from the balance, and `sweep_bps` of what remains is transferred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct ReservePolicy {
    /// Estimated network fee for a single-signature transfer
    #[schema(example = 5000)]
    pub network_fee: u64,
    /// Extra headroom on top of the fee estimate
    #[schema(example = 10000)]
    pub safety_buffer: u64,
    /// Floor left in the source account after the sweep
    #[schema(example = 1000000)]
    pub minimum_reserve: u64,
    /// Balances below this are rejected outright
    #[schema(example = 10000000)]
    pub minimum_balance: u64,
    /// Transfers below this are not worth submitting
    #[schema(example = 5000)]
    pub dust_threshold: u64,
    /// Share of the available balance to transfer, in basis points
    #[schema(example = 9700)]
    pub sweep_bps: u64,
}

impl Default for ReservePolicy {
    fn default() -> Self {
        Self {
            network_fee: 5_000,
            safety_buffer: 10_000,
            minimum_reserve: LAMPORTS_PER_SOL / 1_000,
            minimum_balance: LAMPORTS_PER_SOL / 100,
            dust_threshold: 5_000,
            sweep_bps: 9_700,
        }
    }
}

impl ReservePolicy {
    #[must_use]
    pub fn total_reserve(&self) -> u64 {
        self.network_fee
            .saturating_add(self.safety_buffer)
            .saturating_add(self.minimum_reserve)
    }

    /// Balance left after the reserve, never negative
    #[must_use]
    pub fn available(&self, balance_lamports: u64) -> u64 {
        balance_lamports.saturating_sub(self.total_reserve())
    }

    /// `floor(available * sweep_bps / 10_000)` in exact integer arithmetic
    #[must_use]
    pub fn transfer_amount(&self, balance_lamports: u64) -> u64 {
        let available = u128::from(self.available(balance_lamports));
        let amount = available * u128::from(self.sweep_bps) / u128::from(BPS_DENOMINATOR);
        // sweep_bps <= 10_000 is enforced at config load, so this fits
        u64::try_from(amount).unwrap_or(u64::MAX)
    }
}

/// Commitment level for reads and confirmations
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, ToSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum Commitment {
    Processed,
    Confirmed,
    Finalized,
}

impl Commitment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Processed => "processed",
            Self::Confirmed => "confirmed",
            Self::Finalized => "finalized",
        }
    }
}

impl std::str::FromStr for Commitment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "processed" => Ok(Self::Processed),
            "confirmed" => Ok(Self::Confirmed),
            "finalized" => Ok(Self::Finalized),
            _ => Err(format!("Invalid commitment: {}", s)),
        }
    }
}

impl std::fmt::Display for Commitment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl From<Commitment> for CommitmentConfig {
    fn from(value: Commitment) -> Self {
        match value {
            Commitment::Processed => CommitmentConfig::processed(),
            Commitment::Confirmed => CommitmentConfig::confirmed(),
            Commitment::Finalized => CommitmentConfig::finalized(),
        }
    }
}

impl From<CommitmentConfig> for Commitment {
    fn from(value: CommitmentConfig) -> Self {
        if value.is_finalized() {
            Self::Finalized
        } else if value.is_confirmed() {
            Self::Confirmed
        } else {
            Self::Processed
        }
    }
}

/// Options for `sendTransaction`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SendOptions {
    pub skip_preflight: bool,
    pub preflight_commitment: Commitment,
}

impl Default for SendOptions {
    fn default() -> Self {
        Self {
            skip_preflight: false,
            preflight_commitment: Commitment::Confirmed,
        }
    }
}

/// A recent blockhash and the last block height at which it is accepted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LatestBlockhash {
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// Native asset price in USD. Informational only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct PriceQuote {
    #[schema(example = 153.32)]
    pub price_usd: f64,
    /// Provider that produced the price, or `fallback`
    #[schema(example = "coingecko")]
    pub source: String,
    pub from_cache: bool,
    pub is_fallback: bool,
    pub fetched_at: DateTime<Utc>,
}

impl PriceQuote {
    #[must_use]
    pub fn fallback(price_usd: f64) -> Self {
        Self {
            price_usd,
            source: "fallback".to_string(),
            from_cache: false,
            is_fallback: true,
            fetched_at: Utc::now(),
        }
    }
}

/// Request to plan a sweep of a wallet's SOL balance
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct PlanSweepRequest {
    /// Wallet to sweep (Base58 Solana address)
    #[validate(length(min = 32, max = 44, message = "Address must be 32-44 characters"))]
    #[schema(example = "HvwC9QSAzwEXkUkwqNNGhfNHoVqXJYfPvPZfQvJmHWcF")]
    pub address: String,
}

impl PlanSweepRequest {
    #[must_use]
    pub fn new(address: impl Into<String>) -> Self {
        Self {
            address: address.into(),
        }
    }
}

/// An unsigned sweep transaction ready for the owner's wallet to sign
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SweepPlan {
    #[schema(example = "550e8400-e29b-41d4-a716-446655440000")]
    pub plan_id: String,
    /// Source wallet and fee payer
    pub source: String,
    pub destination: String,
    pub balance_lamports: u64,
    pub reserve_lamports: u64,
    pub transfer_amount_lamports: u64,
    pub blockhash: String,
    pub last_valid_block_height: u64,
    /// Base64 of the bincode-serialized, unsigned transaction
    pub unsigned_transaction: String,
    pub reference_price: PriceQuote,
    /// RPC endpoint the plan was built against
    pub endpoint: String,
}

impl SweepPlan {
    /// Transfer amount valued at the reference price
    #[must_use]
    pub fn transfer_value_usd(&self) -> f64 {
        self.transfer_amount_lamports as f64 / LAMPORTS_PER_SOL as f64
            * self.reference_price.price_usd
    }
}

/// Request to broadcast a signed sweep transaction
#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct BroadcastRequest {
    /// Base64 of the bincode-serialized, signed transaction
    #[validate(length(min = 1, message = "Signed transaction is required"))]
    pub signed_transaction: String,
    /// Blockhash the transaction was built with
    #[validate(length(min = 32, max = 44, message = "Blockhash must be 32-44 characters"))]
    pub blockhash: String,
    pub last_valid_block_height: u64,
}

/// Outcome of a successful broadcast
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct BroadcastResult {
    #[schema(example = "5eykt4UsFv8P8NJdTREpY1vzqKqZKvdpKuc147dw2N9d")]
    pub signature: String,
    /// RPC endpoint that accepted and confirmed the transaction
    pub endpoint: String,
}

/// Health status enum
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    /// All systems operational
    Healthy,
    /// Some systems degraded but functional
    Degraded,
    /// Critical systems unavailable
    Unhealthy,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Overall system status
    pub status: HealthStatus,
    /// Planner endpoints reachable out of configured
    pub planner_endpoints: EndpointHealth,
    /// Broadcast endpoints reachable out of configured
    pub broadcast_endpoints: EndpointHealth,
    /// Current server timestamp
    pub timestamp: DateTime<Utc>,
    /// Application version
    #[schema(example = "0.1.0")]
    pub version: String,
}

/// Reachability of one endpoint list
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct EndpointHealth {
    pub reachable: usize,
    pub configured: usize,
}

impl EndpointHealth {
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        if self.reachable == 0 {
            HealthStatus::Unhealthy
        } else if self.reachable < self.configured {
            HealthStatus::Degraded
        } else {
            HealthStatus::Healthy
        }
    }
}

impl HealthResponse {
    #[must_use]
    pub fn new(planner_endpoints: EndpointHealth, broadcast_endpoints: EndpointHealth) -> Self {
        let status = match (planner_endpoints.status(), broadcast_endpoints.status()) {
            (HealthStatus::Healthy, HealthStatus::Healthy) => HealthStatus::Healthy,
            (HealthStatus::Unhealthy, _) | (_, HealthStatus::Unhealthy) => HealthStatus::Unhealthy,
            _ => HealthStatus::Degraded,
        };
        Self {
            status,
            planner_endpoints,
            broadcast_endpoints,
            timestamp: Utc::now(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Error response structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    /// Error details
    pub error: ErrorDetail,
}

/// Error detail structure
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ErrorDetail {
    /// Error type identifier
    #[schema(example = "insufficient_balance")]
    pub r#type: String,
    /// Human-readable error message
    #[schema(example = "Insufficient balance: 42 lamports, at least 10000000 required")]
    pub message: String,
    /// Structured amounts for balance-related rejections
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<RejectionDetails>,
}

/// Amounts attached to balance-related rejections
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, ToSchema)]
pub struct RejectionDetails {
    pub balance_lamports: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub required_lamports: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub transfer_lamports: Option<u64>,
}

/// Rate limit exceeded response
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RateLimitResponse {
    /// Error details
    pub error: ErrorDetail,
    /// Seconds until rate limit resets
    #[schema(example = 1)]
    pub retry_after: u64,
}
