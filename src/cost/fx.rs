//! USD to display-currency exchange rate
//!
//! Lookups can fail or hang; [`FxRates::current`] never does. A good value
//! is cached for a TTL and the configured fallback covers every failure.
//! A failed lookup is not retried until [`RETRY_BACKOFF`] has passed, and
//! only one caller refreshes at a time while the others are served the
//! stale value or the fallback.

use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};

/// Default display currency
pub const DEFAULT_CURRENCY: &str = "INR";
/// Used whenever no live rate is available
pub const DEFAULT_FALLBACK_RATE: f64 = 88.0;
pub const DEFAULT_FX_URL: &str = "https://api.frankfurter.dev/v1/latest";

const LOOKUP_TIMEOUT: Duration = Duration::from_secs(5);
/// Quiet period after a failed lookup, capped at the cache TTL
const RETRY_BACKOFF: Duration = Duration::from_secs(60);

#[derive(Debug, Error)]
pub enum FxError {
    #[error("rate request failed: {0}")]
    Request(String),
    #[error("rate response missing currency {0}")]
    MissingCurrency(String),
    #[error("rate is not a positive number: {0}")]
    InvalidRate(f64),
}

/// Something that can quote USD -> display currency
#[async_trait]
pub trait ExchangeRateSource: Send + Sync {
    async fn fetch_rate(&self) -> Result<f64, FxError>;
}

/// Frankfurter (ECB reference rates) lookup
pub struct FrankfurterRates {
    client: Client,
    url: String,
    currency: String,
}

impl FrankfurterRates {
    pub fn new(url: impl Into<String>, currency: impl Into<String>) -> Self {
        let client = Client::builder()
            .timeout(LOOKUP_TIMEOUT)
            .build()
            .expect("Failed to create HTTP client");
        Self {
            client,
            url: url.into(),
            currency: currency.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct FrankfurterResponse {
    #[serde(default)]
    date: Option<NaiveDate>,
    rates: HashMap<String, f64>,
}

impl FrankfurterResponse {
    fn rate_for(&self, currency: &str) -> Result<f64, FxError> {
        let rate = *self
            .rates
            .get(currency)
            .ok_or_else(|| FxError::MissingCurrency(currency.to_string()))?;
        if rate.is_finite() && rate > 0.0 {
            Ok(rate)
        } else {
            Err(FxError::InvalidRate(rate))
        }
    }
}

#[async_trait]
impl ExchangeRateSource for FrankfurterRates {
    async fn fetch_rate(&self) -> Result<f64, FxError> {
        let response = self
            .client
            .get(&self.url)
            .query(&[("base", "USD"), ("symbols", self.currency.as_str())])
            .send()
            .await
            .map_err(|e| FxError::Request(e.to_string()))?
            .error_for_status()
            .map_err(|e| FxError::Request(e.to_string()))?;

        let body: FrankfurterResponse = response
            .json()
            .await
            .map_err(|e| FxError::Request(e.to_string()))?;

        let rate = body.rate_for(&self.currency)?;
        tracing::debug!(currency = %self.currency, rate, date = ?body.date, "Fetched exchange rate");
        Ok(rate)
    }
}

/// A constant rate; stands in when lookups are disabled
pub struct FixedRate(pub f64);

#[async_trait]
impl ExchangeRateSource for FixedRate {
    async fn fetch_rate(&self) -> Result<f64, FxError> {
        if self.0.is_finite() && self.0 > 0.0 {
            Ok(self.0)
        } else {
            Err(FxError::InvalidRate(self.0))
        }
    }
}

#[derive(Debug, Default)]
struct RateCache {
    good: Option<(f64, Instant)>,
    failed_at: Option<Instant>,
}

impl RateCache {
    fn stale_or(&self, fallback: f64) -> f64 {
        self.good.map_or(fallback, |(rate, _)| rate)
    }
}

/// Process-wide rate cache shared by every session
pub struct FxRates {
    source: Arc<dyn ExchangeRateSource>,
    fallback: f64,
    ttl: Duration,
    retry_backoff: Duration,
    cache: RwLock<RateCache>,
    refreshing: Mutex<()>,
}

impl FxRates {
    pub fn new(source: Arc<dyn ExchangeRateSource>, fallback: f64, ttl: Duration) -> Self {
        Self {
            source,
            fallback,
            ttl,
            retry_backoff: RETRY_BACKOFF.min(ttl),
            cache: RwLock::new(RateCache::default()),
            refreshing: Mutex::new(()),
        }
    }

    /// Always returns `rate`, with no lookups
    pub fn fixed(rate: f64) -> Self {
        Self::new(Arc::new(FixedRate(rate)), rate, Duration::MAX)
    }

    pub fn fallback(&self) -> f64 {
        self.fallback
    }

    /// Current rate: cached if fresh, else looked up, else the fallback
    pub async fn current(&self) -> f64 {
        if let Some(rate) = self.settled(&*self.cache.read().await) {
            return rate;
        }

        // Someone else is already looking the rate up
        let Ok(_guard) = self.refreshing.try_lock() else {
            return self.cache.read().await.stale_or(self.fallback);
        };
        if let Some(rate) = self.settled(&*self.cache.read().await) {
            return rate;
        }

        match self.source.fetch_rate().await {
            Ok(rate) => {
                *self.cache.write().await = RateCache {
                    good: Some((rate, Instant::now())),
                    failed_at: None,
                };
                rate
            }
            Err(e) => {
                let mut cache = self.cache.write().await;
                cache.failed_at = Some(Instant::now());
                let rate = cache.stale_or(self.fallback);
                tracing::warn!(
                    error = %e,
                    rate,
                    retry_in_secs = self.retry_backoff.as_secs(),
                    "Exchange rate lookup failed, using last known or fallback rate"
                );
                rate
            }
        }
    }

    /// A rate that needs no lookup: a fresh value, or the stale/fallback
    /// value while a recent failure is backing off
    fn settled(&self, cache: &RateCache) -> Option<f64> {
        if let Some((rate, at)) = cache.good {
            if at.elapsed() < self.ttl {
                return Some(rate);
            }
        }
        match cache.failed_at {
            Some(at) if at.elapsed() < self.retry_backoff => Some(cache.stale_or(self.fallback)),
            _ => None,
        }
    }
}
