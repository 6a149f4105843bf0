//! Blockchain client implementations.
//!
//! A JSON-RPC client per endpoint, plus the connector the planner and
//! broadcaster use to walk their endpoint lists.

pub mod solana;

pub use solana::{
    DEFAULT_BROADCAST_ENDPOINTS, DEFAULT_PLANNER_ENDPOINTS, HttpJsonRpcTransport,
    HttpRpcConnector, JsonRpcTransport, RpcChainClient, RpcClientConfig,
};
