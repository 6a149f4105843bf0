//! Solana sweep service.
//!
//! Plans a transfer of a wallet's SOL balance (less fee and rent reserves)
//! to an operator-configured destination, leaves signing to the wallet
//! owner, and broadcasts the signed transaction with endpoint failover.

pub mod api;
pub mod app;
pub mod domain;
pub mod infra;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;
