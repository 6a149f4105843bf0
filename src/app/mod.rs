//! Application layer containing business logic and shared state.

pub mod broadcaster;
pub mod config;
pub mod flow;
pub mod planner;
pub mod price;
pub mod service;
pub mod state;
pub mod wire;

pub use broadcaster::Broadcaster;
pub use config::SweepConfig;
pub use flow::{SweepFlow, SweepReceipt};
pub use planner::{PlannerConfig, SweepPlanner};
pub use price::{PriceCache, PriceOracle};
pub use service::AppService;
pub use state::AppState;
