//! SOL/USD price providers.
//!
//! Each provider normalises its own response shape to a plain `f64`.

pub mod binance;
pub mod coingecko;

pub use binance::{BinancePriceProvider, DEFAULT_BINANCE_API_URL};
pub use coingecko::{CoinGeckoPriceProvider, DEFAULT_COINGECKO_API_URL};

use reqwest::Client;
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::domain::{AppError, ExternalServiceError};

/// GET `url` and decode the JSON body, mapping failures to `ExternalServiceError`
async fn get_json<T: DeserializeOwned>(
    http_client: &Client,
    url: &str,
    query: &[(&str, &str)],
) -> Result<T, AppError> {
    debug!(url = %url, "Requesting price quote");

    let response = http_client
        .get(url)
        .query(query)
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() {
                AppError::ExternalService(ExternalServiceError::Timeout(e.to_string()))
            } else {
                AppError::ExternalService(ExternalServiceError::Unavailable(e.to_string()))
            }
        })?;

    let status = response.status();
    if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
        return Err(AppError::ExternalService(ExternalServiceError::RateLimited(
            url.to_string(),
        )));
    }
    if !status.is_success() {
        return Err(AppError::ExternalService(ExternalServiceError::Unavailable(
            format!("HTTP {} from {}", status, url),
        )));
    }

    response.json().await.map_err(|e| {
        AppError::ExternalService(ExternalServiceError::MalformedResponse(e.to_string()))
    })
}

/// Reject zero, negative and non-finite prices
fn validate_price(provider: &str, price: f64) -> Result<f64, AppError> {
    if price.is_finite() && price > 0.0 {
        Ok(price)
    } else {
        Err(AppError::ExternalService(
            ExternalServiceError::MalformedResponse(format!(
                "{} returned unusable price {}",
                provider, price
            )),
        ))
    }
}
