//! Environment-driven configuration.

use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use solana_sdk::pubkey::Pubkey;

use super::broadcaster::Broadcaster;
use super::planner::{DEFAULT_LIVENESS_TIMEOUT, PlannerConfig, SweepPlanner};
use super::price::{
    DEFAULT_FALLBACK_PRICE_USD, DEFAULT_PRICE_CACHE_TTL, DEFAULT_PROVIDER_TIMEOUT, PriceOracle,
};
use crate::domain::{AppError, BPS_DENOMINATOR, ConfigError, PriceProvider, ReservePolicy, RpcConnector};
use crate::infra::blockchain::{
    DEFAULT_BROADCAST_ENDPOINTS, DEFAULT_PLANNER_ENDPOINTS, HttpRpcConnector, RpcClientConfig,
};
use crate::infra::pricing::{BinancePriceProvider, CoinGeckoPriceProvider};

/// Slack on top of the slowest request path
const REQUEST_TIMEOUT_MARGIN: Duration = Duration::from_secs(10);

/// Everything the service needs from the environment
#[derive(Debug, Clone)]
pub struct SweepConfig {
    pub host: String,
    pub port: u16,
    pub destination: Pubkey,
    pub planner_endpoints: Vec<String>,
    pub broadcast_endpoints: Vec<String>,
    pub rpc: RpcClientConfig,
    pub liveness_timeout: Duration,
    pub policy: ReservePolicy,
    pub price_timeout: Duration,
    pub price_cache_ttl: Duration,
    pub fallback_price_usd: f64,
    pub coingecko_api_url: Option<String>,
    pub binance_api_url: Option<String>,
    pub enable_rate_limiting: bool,
    pub rate_limit_rps: u32,
    pub rate_limit_burst: u32,
    pub json_logs: bool,
}

impl SweepConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup (the environment in production)
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let destination_str =
            get("SWEEP_DESTINATION").ok_or_else(|| ConfigError::MissingEnvVar("SWEEP_DESTINATION".to_string()))?;
        let destination = Pubkey::from_str(destination_str.trim()).map_err(|e| {
            ConfigError::InvalidValue {
                name: "SWEEP_DESTINATION".to_string(),
                message: e.to_string(),
            }
        })?;

        let planner_endpoints = endpoint_list(get("PLANNER_RPC_URLS"), DEFAULT_PLANNER_ENDPOINTS);
        let broadcast_endpoints =
            endpoint_list(get("BROADCAST_RPC_URLS"), DEFAULT_BROADCAST_ENDPOINTS);

        let rpc_defaults = RpcClientConfig::default();
        let rpc = RpcClientConfig {
            timeout: parse_or(&get, "RPC_TIMEOUT_MS", rpc_defaults.timeout.as_millis() as u64)
                .map(Duration::from_millis)?,
            confirmation_timeout: parse_or(
                &get,
                "CONFIRMATION_TIMEOUT_SECS",
                rpc_defaults.confirmation_timeout.as_secs(),
            )
            .map(Duration::from_secs)?,
            poll_interval: rpc_defaults.poll_interval,
        };

        let sweep_bps = parse_or(&get, "SWEEP_BPS", ReservePolicy::default().sweep_bps)?;
        if sweep_bps == 0 || sweep_bps > BPS_DENOMINATOR {
            return Err(ConfigError::InvalidValue {
                name: "SWEEP_BPS".to_string(),
                message: format!("must be between 1 and {}", BPS_DENOMINATOR),
            });
        }
        let policy = ReservePolicy {
            sweep_bps,
            ..Default::default()
        };

        let fallback_price_usd = parse_or(&get, "FALLBACK_SOL_PRICE_USD", DEFAULT_FALLBACK_PRICE_USD)?;
        if !(fallback_price_usd.is_finite() && fallback_price_usd > 0.0) {
            return Err(ConfigError::InvalidValue {
                name: "FALLBACK_SOL_PRICE_USD".to_string(),
                message: "must be a positive number".to_string(),
            });
        }

        Ok(Self {
            host: get("HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
            port: parse_or(&get, "PORT", 3000)?,
            destination,
            planner_endpoints,
            broadcast_endpoints,
            rpc,
            liveness_timeout: parse_or(
                &get,
                "LIVENESS_TIMEOUT_MS",
                DEFAULT_LIVENESS_TIMEOUT.as_millis() as u64,
            )
            .map(Duration::from_millis)?,
            policy,
            price_timeout: parse_or(
                &get,
                "PRICE_TIMEOUT_MS",
                DEFAULT_PROVIDER_TIMEOUT.as_millis() as u64,
            )
            .map(Duration::from_millis)?,
            price_cache_ttl: parse_or(
                &get,
                "PRICE_CACHE_TTL_SECS",
                DEFAULT_PRICE_CACHE_TTL.as_secs(),
            )
            .map(Duration::from_secs)?,
            fallback_price_usd,
            coingecko_api_url: get("COINGECKO_API_URL"),
            binance_api_url: get("BINANCE_API_URL"),
            enable_rate_limiting: get("ENABLE_RATE_LIMITING")
                .map(|v| v == "true" || v == "1")
                .unwrap_or(false),
            rate_limit_rps: parse_or(&get, "RATE_LIMIT_RPS", 10)?,
            rate_limit_burst: parse_or(&get, "RATE_LIMIT_BURST", 20)?,
            json_logs: get("LOG_FORMAT").is_some_and(|v| v.eq_ignore_ascii_case("json")),
        })
    }

    /// Price oracle over the public CoinGecko and Binance endpoints
    pub fn price_oracle(&self) -> Result<PriceOracle, AppError> {
        let providers: Vec<Arc<dyn PriceProvider>> = vec![
            Arc::new(CoinGeckoPriceProvider::new(
                self.coingecko_api_url.clone(),
                self.price_timeout,
            )?),
            Arc::new(BinancePriceProvider::new(
                self.binance_api_url.clone(),
                self.price_timeout,
            )?),
        ];
        Ok(PriceOracle::new(providers)
            .with_provider_timeout(self.price_timeout)
            .with_cache_ttl(self.price_cache_ttl)
            .with_fallback_price(self.fallback_price_usd))
    }

    /// HTTP request timeout long enough for a full pass over either endpoint list.
    ///
    /// A broadcast endpoint may spend a send, the confirmation window, one
    /// more poll interval and the two status calls of the last poll. A planner
    /// endpoint may spend the liveness check and a balance fetch; the price
    /// race and blockhash fetch follow once.
    pub fn request_timeout(&self) -> Duration {
        let rpc = &self.rpc;
        let per_broadcast_endpoint = rpc.timeout * 3 + rpc.confirmation_timeout + rpc.poll_interval;
        let broadcast = per_broadcast_endpoint * endpoint_count(&self.broadcast_endpoints);

        let per_planner_endpoint = self.liveness_timeout + rpc.timeout;
        let plan = per_planner_endpoint * endpoint_count(&self.planner_endpoints)
            + self.price_timeout
            + rpc.timeout;

        broadcast.max(plan) + REQUEST_TIMEOUT_MARGIN
    }

    pub fn connector(&self) -> Arc<dyn RpcConnector> {
        Arc::new(HttpRpcConnector::new(self.rpc.clone()))
    }

    pub fn planner(
        &self,
        connector: Arc<dyn RpcConnector>,
        price_oracle: Arc<PriceOracle>,
    ) -> SweepPlanner {
        let config = PlannerConfig {
            endpoints: self.planner_endpoints.clone(),
            liveness_timeout: self.liveness_timeout,
            policy: self.policy,
            destination: self.destination,
        };
        SweepPlanner::new(connector, price_oracle, config)
    }

    pub fn broadcaster(&self, connector: Arc<dyn RpcConnector>) -> Broadcaster {
        Broadcaster::new(connector, self.broadcast_endpoints.clone())
    }
}

fn endpoint_list(value: Option<String>, defaults: &[&str]) -> Vec<String> {
    match value {
        Some(list) => list
            .split(',')
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .map(str::to_string)
            .collect(),
        None => defaults.iter().map(|url| url.to_string()).collect(),
    }
}

fn endpoint_count(endpoints: &[String]) -> u32 {
    u32::try_from(endpoints.len()).unwrap_or(u32::MAX)
}

fn parse_or<T, G>(get: &G, key: &str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::InvalidValue {
            name: key.to_string(),
            message: e.to_string(),
        }),
        None => Ok(default),
    }
}
