//! Infrastructure layer implementations.

pub mod blockchain;
pub mod pricing;
pub mod signer;

pub use blockchain::{HttpRpcConnector, RpcChainClient, RpcClientConfig};
pub use pricing::{BinancePriceProvider, CoinGeckoPriceProvider};
pub use signer::{KeypairSigner, signing_key_from_base58};
