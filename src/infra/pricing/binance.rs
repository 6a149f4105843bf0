//! Binance ticker price provider.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::{get_json, validate_price};
use crate::domain::{AppError, ExternalServiceError, PriceProvider};

/// Default Binance API base URL
pub const DEFAULT_BINANCE_API_URL: &str = "https://api.binance.com/api/v3";

/// Binance quotes prices as decimal strings
#[derive(Debug, Deserialize)]
struct TickerPriceResponse {
    price: String,
}

/// Price provider backed by `GET /ticker/price?symbol=SOLUSDT`
#[derive(Debug, Clone)]
pub struct BinancePriceProvider {
    http_client: Client,
    base_url: String,
}

impl BinancePriceProvider {
    pub fn new(base_url: Option<String>, timeout: Duration) -> Result<Self, AppError> {
        let http_client = Client::builder().timeout(timeout).build().map_err(|e| {
            AppError::ExternalService(ExternalServiceError::Unavailable(e.to_string()))
        })?;

        Ok(Self {
            http_client,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BINANCE_API_URL.to_string()),
        })
    }
}

#[async_trait]
impl PriceProvider for BinancePriceProvider {
    fn name(&self) -> &str {
        "binance"
    }

    async fn fetch_price(&self) -> Result<f64, AppError> {
        let url = format!("{}/ticker/price", self.base_url);
        let response: TickerPriceResponse =
            get_json(&self.http_client, &url, &[("symbol", "SOLUSDT")]).await?;

        let price = response.price.trim().parse::<f64>().map_err(|e| {
            AppError::ExternalService(ExternalServiceError::MalformedResponse(format!(
                "price '{}': {}",
                response.price, e
            )))
        })?;
        validate_price(self.name(), price)
    }
}
