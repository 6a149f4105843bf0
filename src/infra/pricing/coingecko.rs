//! CoinGecko simple-price provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{get_json, validate_price};
use crate::domain::{AppError, ExternalServiceError, PriceProvider};

/// Default CoinGecko API base URL
pub const DEFAULT_COINGECKO_API_URL: &str = "https://api.coingecko.com/api/v3";

#[derive(Debug, Deserialize)]
struct SimplePriceResponse {
    solana: Option<UsdPrice>,
}

#[derive(Debug, Deserialize)]
struct UsdPrice {
    usd: Option<f64>,
}

/// Price provider backed by `GET /simple/price?ids=solana&vs_currencies=usd`
#[derive(Debug, Clone)]
pub struct CoinGeckoPriceProvider {
    http_client: Client,
    base_url: String,
}

impl CoinGeckoPriceProvider {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::ExternalService(ExternalServiceError::Unavailable(e.to_string()))
        })?;

        Ok(Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_COINGECKO_API_URL.to_string()),
        })
    }
}

#[async_trait]
impl PriceProvider for CoinGeckoPriceProvider {
    fn name(&self) -> &str {
        "coingecko"
    }

    async fn fetch_price(&self) -> Result<f64, AppError> {
        let url = format!("{}/simple/price", self.base_url);
        let response: SimplePriceResponse = get_json(
            &self.http_client,
            &url,
            &[("ids", "solana"), ("vs_currencies", "usd")],
        )
        .await?;

        let price = response.solana.and_then(|p| p.usd).ok_or_else(|| {
            AppError::ExternalService(ExternalServiceError::MalformedResponse(
                "missing solana.usd".to_string(),
            ))
        })?;
        validate_price(self.name(), price)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deserialize_simple_price() {
        let response: SimplePriceResponse =
            serde_json::from_str(r#"{"solana":{"usd":171.42}}"#).unwrap();
        assert_eq!(response.solana.and_then(|p| p.usd), Some(171.42));
    }

    #[test]
    fn test_deserialize_missing_asset() {
        let response: SimplePriceResponse = serde_json::from_str(r#"{}"#).unwrap();
        assert!(response.solana.is_none());
    }

    #[test]
    fn test_provider_creation_uses_default_url() {
        let provider = CoinGeckoPriceProvider::new(None, Duration::from_secs(3)).unwrap();
        assert_eq!(provider.base_url, DEFAULT_COINGECKO_API_URL);
        assert_eq!(provider.name(), "coingecko");
    }
}
