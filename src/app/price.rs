//! Reference price lookup with a short-lived cache.
//!
//! The price is informational: `PriceOracle::quote` never fails and falls back
//! to a fixed constant when every provider is down.

use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use chrono::Utc;
use futures_util::future::select_ok;
use tracing::{debug, instrument, warn};

use crate::domain::{AppError, ExternalServiceError, PriceProvider, PriceQuote};

/// Used when no provider returns a usable price
pub const DEFAULT_FALLBACK_PRICE_USD: f64 = 153.32;

/// Default cache lifetime: 5 minutes
pub const DEFAULT_PRICE_CACHE_TTL: Duration = Duration::from_secs(300);

/// Default per-provider timeout
pub const DEFAULT_PROVIDER_TIMEOUT: Duration = Duration::from_secs(3);

/// Last good quote and when it was stored.
///
/// Readers check freshness, then a miss refreshes; concurrent refreshes may
/// both write, which only affects freshness.
#[derive(Debug)]
pub struct PriceCache {
    ttl: Duration,
    entry: RwLock<Option<(Instant, PriceQuote)>>,
}

impl PriceCache {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entry: RwLock::new(None),
        }
    }

    /// Fresh cached quote, marked `from_cache`
    pub fn get(&self) -> Option<PriceQuote> {
        let guard = self.entry.read().ok()?;
        let (stored_at, quote) = guard.as_ref()?;
        if stored_at.elapsed() < self.ttl {
            Some(PriceQuote {
                from_cache: true,
                ..quote.clone()
            })
        } else {
            None
        }
    }

    pub fn put(&self, quote: PriceQuote) {
        if let Ok(mut guard) = self.entry.write() {
            *guard = Some((Instant::now(), quote));
        }
    }

    pub fn clear(&self) {
        if let Ok(mut guard) = self.entry.write() {
            *guard = None;
        }
    }
}

/// Races price providers and caches the winner
pub struct PriceOracle {
    providers: Vec<Arc<dyn PriceProvider>>,
    provider_timeout: Duration,
    fallback_price: f64,
    cache: PriceCache,
}

impl PriceOracle {
    #[must_use]
    pub fn new(providers: Vec<Arc<dyn PriceProvider>>) -> Self {
        Self {
            providers,
            provider_timeout: DEFAULT_PROVIDER_TIMEOUT,
            fallback_price: DEFAULT_FALLBACK_PRICE_USD,
            cache: PriceCache::new(DEFAULT_PRICE_CACHE_TTL),
        }
    }

    #[must_use]
    pub fn with_provider_timeout(mut self, timeout: Duration) -> Self {
        self.provider_timeout = timeout;
        self
    }

    #[must_use]
    pub fn with_fallback_price(mut self, price_usd: f64) -> Self {
        self.fallback_price = price_usd;
        self
    }

    #[must_use]
    pub fn with_cache_ttl(mut self, ttl: Duration) -> Self {
        self.cache = PriceCache::new(ttl);
        self
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    /// Current SOL/USD quote
    #[instrument(skip(self))]
    pub async fn quote(&self) -> PriceQuote {
        if let Some(cached) = self.cache.get() {
            debug!(price = cached.price_usd, source = %cached.source, "Using cached price");
            return cached;
        }

        if self.providers.is_empty() {
            return PriceQuote::fallback(self.fallback_price);
        }

        let attempts = self.providers.iter().map(|provider| {
            let timeout = self.provider_timeout;
            Box::pin(async move {
                match tokio::time::timeout(timeout, provider.fetch_price()).await {
                    Ok(Ok(price)) => Ok((provider.name().to_string(), price)),
                    Ok(Err(e)) => {
                        debug!(provider = %provider.name(), error = %e, "Price provider failed");
                        Err(e)
                    }
                    Err(_) => Err(AppError::ExternalService(ExternalServiceError::Timeout(
                        format!("{} exceeded {}ms", provider.name(), timeout.as_millis()),
                    ))),
                }
            })
        });

        match select_ok(attempts).await {
            Ok(((source, price_usd), _)) => {
                let quote = PriceQuote {
                    price_usd,
                    source,
                    from_cache: false,
                    is_fallback: false,
                    fetched_at: Utc::now(),
                };
                self.cache.put(quote.clone());
                quote
            }
            Err(e) => {
                warn!(
                    error = %e,
                    fallback = self.fallback_price,
                    "All price providers failed, using fallback price"
                );
                PriceQuote::fallback(self.fallback_price)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::MockPriceProvider;

    #[tokio::test]
    async fn test_first_success_wins_and_is_cached() {
        let failing = Arc::new(MockPriceProvider::failing("a"));
        let working = Arc::new(MockPriceProvider::with_price("b", 171.5));
        let oracle = PriceOracle::new(vec![failing.clone() as _, working.clone() as _]);

        let quote = oracle.quote().await;
        assert_eq!(quote.price_usd, 171.5);
        assert_eq!(quote.source, "b");
        assert!(!quote.from_cache);
        assert!(!quote.is_fallback);

        let cached = oracle.quote().await;
        assert_eq!(cached.price_usd, 171.5);
        assert!(cached.from_cache);
        assert_eq!(cached.source, "b");
        assert_eq!(working.call_count(), 1);
    }

    #[tokio::test]
    async fn test_fallback_when_all_fail() {
        let oracle = PriceOracle::new(vec![
            Arc::new(MockPriceProvider::failing("a")) as _,
            Arc::new(MockPriceProvider::failing("b")) as _,
        ])
        .with_fallback_price(99.0);

        let quote = oracle.quote().await;
        assert_eq!(quote.price_usd, 99.0);
        assert!(quote.is_fallback);
        assert_eq!(quote.source, "fallback");
        // Fallbacks are not cached
        assert!(oracle.cache().get().is_none());
    }

    #[tokio::test]
    async fn test_slow_provider_times_out() {
        let slow = MockPriceProvider::with_price("slow", 200.0).with_delay(Duration::from_secs(5));
        let oracle = PriceOracle::new(vec![Arc::new(slow) as _])
            .with_provider_timeout(Duration::from_millis(20));

        let started = Instant::now();
        let quote = oracle.quote().await;
        assert!(quote.is_fallback);
        assert_eq!(quote.price_usd, DEFAULT_FALLBACK_PRICE_USD);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_fast_provider_beats_slow_provider() {
        let slow = MockPriceProvider::with_price("slow", 1.0).with_delay(Duration::from_secs(2));
        let fast = MockPriceProvider::with_price("fast", 2.0);
        let oracle = PriceOracle::new(vec![Arc::new(slow) as _, Arc::new(fast) as _]);

        let quote = oracle.quote().await;
        assert_eq!(quote.source, "fast");
        assert_eq!(quote.price_usd, 2.0);
    }

    #[tokio::test]
    async fn test_no_providers_returns_fallback() {
        let oracle = PriceOracle::new(Vec::new());
        assert!(oracle.quote().await.is_fallback);
    }

    #[test]
    fn test_cache_expiry() {
        let cache = PriceCache::new(Duration::ZERO);
        cache.put(PriceQuote::fallback(1.0));
        assert!(cache.get().is_none());

        let cache = PriceCache::new(Duration::from_secs(60));
        cache.put(PriceQuote::fallback(1.0));
        assert!(cache.get().is_some());
        cache.clear();
        assert!(cache.get().is_none());
    }
}
