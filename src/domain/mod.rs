//! Domain layer containing core business types, traits, and error definitions.

pub mod error;
pub mod traits;
pub mod types;

pub use error::{
    AppError, BlockchainError, ConfigError, ExternalServiceError, SweepError, ValidationError,
};
pub use traits::{ChainRpc, PriceProvider, RpcConnector, WalletSigner};
pub use types::{
    BPS_DENOMINATOR, BroadcastRequest, BroadcastResult, Commitment, EndpointHealth, ErrorDetail,
    ErrorResponse, HealthResponse, HealthStatus, LAMPORTS_PER_SOL, LatestBlockhash,
    PlanSweepRequest, PriceQuote, RateLimitResponse, RejectionDetails, ReservePolicy,
    SendOptions, SweepPlan,
};
