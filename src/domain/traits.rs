//! Domain traits defining contracts for external systems.

use std::sync::Arc;

use async_trait::async_trait;
use solana_sdk::{pubkey::Pubkey, transaction::Transaction};

use super::error::AppError;
use super::types::{Commitment, LatestBlockhash, SendOptions};

/// Chain RPC operations used by the planner and broadcaster
#[async_trait]
pub trait ChainRpc: Send + Sync {
    /// URL this client talks to
    fn endpoint(&self) -> &str;

    /// Current block height; doubles as a liveness check
    async fn get_block_height(&self) -> Result<u64, AppError>;

    /// Balance in lamports
    async fn get_balance(&self, address: &Pubkey, commitment: Commitment)
    -> Result<u64, AppError>;

    /// Latest blockhash with its expiry height
    async fn get_latest_blockhash(
        &self,
        commitment: Commitment,
    ) -> Result<LatestBlockhash, AppError>;

    /// Submit a serialized signed transaction, returning its signature
    async fn send_raw_transaction(
        &self,
        wire_transaction: &[u8],
        options: SendOptions,
    ) -> Result<String, AppError>;

    /// Wait until `signature` reaches `commitment`, or fail once the
    /// blockhash's expiry height has passed
    async fn confirm_transaction(
        &self,
        signature: &str,
        blockhash: &str,
        last_valid_block_height: u64,
        commitment: Commitment,
    ) -> Result<(), AppError>;
}

/// Factory for RPC clients, one per endpoint URL
pub trait RpcConnector: Send + Sync {
    fn connect(&self, endpoint: &str) -> Result<Arc<dyn ChainRpc>, AppError>;
}

/// A single external source of the SOL/USD price
#[async_trait]
pub trait PriceProvider: Send + Sync {
    fn name(&self) -> &str;

    async fn fetch_price(&self) -> Result<f64, AppError>;
}

/// Signing capability of the wallet that owns the swept funds.
///
/// The service never holds private keys; it only hands an unsigned
/// transaction to the wallet and receives the signed one back.
#[async_trait]
pub trait WalletSigner: Send + Sync {
    /// Ask the wallet for its public key
    async fn connect(&self) -> Result<Pubkey, AppError>;

    /// Return `transaction` with the wallet's signature filled in
    async fn sign_transaction(&self, transaction: Transaction) -> Result<Transaction, AppError>;
}
