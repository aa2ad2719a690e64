//! Currency normalization with a cached/persisted/external cascade.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::Duration;

use chrono::Utc;
use serde_json::Value;
use tracing::{debug, warn};

use crate::infrastructure::storage::RateStore;
use crate::shared::errors::CurrencyError;
use crate::shared::types::CurrencyRate;

const RATES_URL: &str = "https://www.cbr-xml-daily.ru/latest.js";
const FALLBACK_USD: f64 = 90.0;
const FALLBACK_OTHER: f64 = 100.0;

/// Converts arbitrary-currency prices to the base currency.
///
/// Resolution cascade: in-process cache, persisted store, external daily
/// rates API (the published value is "units per unit of base", so it is
/// inverted before use), static fallback constants. Any resolved rate stays
/// cached for the process lifetime until `refresh` is called.
///
/// The cache is shared state with relaxed consistency: concurrent resolution
/// races are tolerated, last writer wins.
pub struct CurrencyNormalizer {
    base_currency: String,
    cache: RwLock<HashMap<String, f64>>,
    store: Arc<dyn RateStore>,
    rates_url: String,
    timeout: Duration,
}

impl CurrencyNormalizer {
    pub fn new(base_currency: &str, store: Arc<dyn RateStore>, timeout_secs: u64) -> Self {
        let base = base_currency.trim().to_uppercase();
        let mut cache = HashMap::new();
        cache.insert(base.clone(), 1.0);
        Self {
            base_currency: base,
            cache: RwLock::new(cache),
            store,
            rates_url: RATES_URL.to_string(),
            timeout: Duration::from_secs(timeout_secs),
        }
    }

    pub fn base_currency(&self) -> &str {
        &self.base_currency
    }

    /// Rate from `code` to the base currency. The base currency itself (and
    /// an empty code, treated as already-base) always resolves to 1.0.
    pub async fn rate_to_base(&self, code: &str) -> f64 {
        let code = code.trim().to_uppercase();
        if code.is_empty() || code == self.base_currency {
            return 1.0;
        }

        if let Some(rate) = self.cached(&code) {
            return rate;
        }

        if let Some(record) = self.store.latest(&code).await {
            self.remember(&code, record.rate);
            return record.rate;
        }

        if let Some(rate) = self.fetch_external(&code).await {
            self.remember(&code, rate);
            self.store
                .upsert(CurrencyRate {
                    code: code.clone(),
                    rate,
                    updated_at: Utc::now(),
                })
                .await;
            return rate;
        }

        let fallback = if code == "USD" {
            FALLBACK_USD
        } else {
            FALLBACK_OTHER
        };
        warn!("No rate source for {}, using fallback {}", code, fallback);
        self.remember(&code, fallback);
        fallback
    }

    /// Convert a price to the base currency.
    /// A negative price is a caller bug and propagates as an error.
    pub async fn normalize(&self, price: f64, code: &str) -> Result<f64, CurrencyError> {
        if price < 0.0 {
            return Err(CurrencyError::NegativePrice(price));
        }
        Ok(price * self.rate_to_base(code).await)
    }

    /// Drop cached rates and re-resolve the given codes, persisting fresh
    /// values. Intended for the external batch refresh job.
    pub async fn refresh(&self, codes: &[&str]) {
        if let Ok(mut cache) = self.cache.write() {
            cache.retain(|code, _| code == &self.base_currency);
        }
        for code in codes {
            let code = code.trim().to_uppercase();
            if code.is_empty() || code == self.base_currency {
                continue;
            }
            if let Some(rate) = self.fetch_external(&code).await {
                self.remember(&code, rate);
                self.store
                    .upsert(CurrencyRate {
                        code,
                        rate,
                        updated_at: Utc::now(),
                    })
                    .await;
            }
        }
    }

    fn cached(&self, code: &str) -> Option<f64> {
        self.cache.read().ok()?.get(code).copied()
    }

    fn remember(&self, code: &str, rate: f64) {
        if let Ok(mut cache) = self.cache.write() {
            cache.insert(code.to_string(), rate);
        }
    }

    /// The API publishes rates[code] = units of `code` per unit of base;
    /// the normalizer needs the reciprocal.
    async fn fetch_external(&self, code: &str) -> Option<f64> {
        let client = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .ok()?;
        let response = match client.get(&self.rates_url).send().await {
            Ok(response) if response.status().is_success() => response,
            Ok(response) => {
                debug!("Rates API returned status {}", response.status());
                return None;
            }
            Err(e) => {
                debug!("Rates API unreachable: {}", e);
                return None;
            }
        };
        let data: Value = response.json().await.ok()?;
        let published = data.get("rates")?.get(code)?.as_f64()?;
        if published <= 0.0 {
            return None;
        }
        Some(1.0 / published)
    }

    #[cfg(test)]
    fn with_rates_url(mut self, url: &str) -> Self {
        self.rates_url = url.to_string();
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::infrastructure::storage::InMemoryRateStore;

    const DEAD_URL: &str = "http://127.0.0.1:1/latest.js";

    fn normalizer(store: Arc<InMemoryRateStore>) -> CurrencyNormalizer {
        CurrencyNormalizer::new("RUB", store, 1).with_rates_url(DEAD_URL)
    }

    #[tokio::test]
    async fn test_base_currency_is_always_one() {
        let normalizer = normalizer(Arc::new(InMemoryRateStore::default()));
        assert_eq!(normalizer.rate_to_base("RUB").await, 1.0);
        assert_eq!(normalizer.rate_to_base("rub").await, 1.0);
        assert_eq!(normalizer.rate_to_base("").await, 1.0);
    }

    #[tokio::test]
    async fn test_store_hit_then_warm_cache_idempotence() {
        let store = Arc::new(InMemoryRateStore::default());
        store
            .upsert(CurrencyRate {
                code: "EUR".to_string(),
                rate: 98.5,
                updated_at: Utc::now(),
            })
            .await;
        let normalizer = normalizer(Arc::clone(&store));

        let first = normalizer.rate_to_base("EUR").await;
        // Second resolution must be a pure cache lookup with the identical
        // value, even if the store changes underneath.
        store
            .upsert(CurrencyRate {
                code: "EUR".to_string(),
                rate: 50.0,
                updated_at: Utc::now(),
            })
            .await;
        let second = normalizer.rate_to_base("EUR").await;
        assert_eq!(first, 98.5);
        assert_eq!(second, 98.5);
    }

    #[tokio::test]
    async fn test_fallback_constants_when_everything_fails() {
        let normalizer = normalizer(Arc::new(InMemoryRateStore::default()));
        assert_eq!(normalizer.rate_to_base("USD").await, 90.0);
        assert_eq!(normalizer.rate_to_base("GBP").await, 100.0);
    }

    #[tokio::test]
    async fn test_normalize_rejects_negative_price() {
        let normalizer = normalizer(Arc::new(InMemoryRateStore::default()));
        assert!(normalizer.normalize(-1.0, "USD").await.is_err());
        assert_eq!(normalizer.normalize(2.0, "RUB").await.unwrap(), 2.0);
    }
}
