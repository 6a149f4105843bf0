//! Error taxonomy for the sweep service.

use thiserror::Error;

/// Top-level application error
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Sweep rejected: {0}")]
    Sweep(#[from] SweepError),

    #[error("Blockchain error: {0}")]
    Blockchain(#[from] BlockchainError),

    #[error("External service error: {0}")]
    ExternalService(#[from] ExternalServiceError),

    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(String),

    #[error("Internal error: {0}")]
    Internal(String),

    #[error("Not supported: {0}")]
    NotSupported(String),

    #[error("Rate limit exceeded")]
    RateLimited,
}

/// Rejections produced while planning or broadcasting a sweep.
///
/// Every variant is terminal for the current call. Callers that hit
/// `AllEndpointsFailed` after a blockhash expiry should plan again.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SweepError {
    #[error("Invalid address: {0}")]
    InvalidAddress(String),

    #[error("No RPC endpoint reachable (last error: {last_error})")]
    NetworkUnavailable { last_error: String },

    #[error("Insufficient balance: {balance_lamports} lamports, at least {required_lamports} required")]
    InsufficientBalance {
        balance_lamports: u64,
        required_lamports: u64,
    },

    #[error(
        "Transfer too small: {transfer_lamports} lamports from a balance of {balance_lamports} (minimum {dust_threshold})"
    )]
    TransferTooSmall {
        balance_lamports: u64,
        transfer_lamports: u64,
        dust_threshold: u64,
    },

    #[error("Failed to fetch latest blockhash: {0}")]
    BlockhashFetchFailed(String),

    #[error("Signing rejected by wallet: {0}")]
    SigningRejected(String),

    #[error("All {attempts} broadcast endpoints failed (last error: {last_error})")]
    AllEndpointsFailed { attempts: usize, last_error: String },
}

/// Chain RPC errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BlockchainError {
    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("RPC error: {0}")]
    RpcError(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Transaction failed: {0}")]
    TransactionFailed(String),

    #[error("Blockhash expired at height {last_valid_block_height} (current {current_height})")]
    BlockhashExpired {
        last_valid_block_height: u64,
        current_height: u64,
    },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

/// Errors from third-party HTTP services (price quotes)
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExternalServiceError {
    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("Request timed out: {0}")]
    Timeout(String),

    #[error("Rate limited: {0}")]
    RateLimited(String),

    #[error("Malformed response: {0}")]
    MalformedResponse(String),
}

/// Request validation errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Invalid field '{field}': {message}")]
    InvalidField { field: String, message: String },

    #[error("{0}")]
    Multiple(String),
}

/// Configuration errors
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid value for {name}: {message}")]
    InvalidValue { name: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sweep_error_converts_into_app_error() {
        let err: AppError = SweepError::InvalidAddress("bad".to_string()).into();
        assert!(matches!(err, AppError::Sweep(SweepError::InvalidAddress(_))));
        assert_eq!(err.to_string(), "Sweep rejected: Invalid address: bad");
    }

    #[test]
    fn test_insufficient_balance_message_carries_amounts() {
        let err = SweepError::InsufficientBalance {
            balance_lamports: 42,
            required_lamports: 10_000_000,
        };
        let msg = err.to_string();
        assert!(msg.contains("42"));
        assert!(msg.contains("10000000"));
    }

    #[test]
    fn test_all_endpoints_failed_message() {
        let err = SweepError::AllEndpointsFailed {
            attempts: 3,
            last_error: "RPC error: -32002".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "All 3 broadcast endpoints failed (last error: RPC error: -32002)"
        );
    }
}
