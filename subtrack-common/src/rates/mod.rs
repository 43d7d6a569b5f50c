use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

pub const BASE_CURRENCY: &str = "USD";

/// Converts minor units between currencies using USD-relative rates. A
/// missing rate degrades to 1.0 so totals always compute.
pub fn convert(cents: i64, from: &str, to: &str, rates: &HashMap<String, f64>) -> i64 {
    let from_rate = rates.get(from).copied().unwrap_or(1.0);
    let to_rate = rates.get(to).copied().unwrap_or(1.0);

    (cents as f64 * (to_rate / from_rate)).round() as i64
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ExchangeRates {
    pub rates: HashMap<String, f64>,
    pub fallback: bool,
}

impl ExchangeRates {
    /// The degraded table used when the rate provider is unreachable.
    pub fn usd_only() -> Self {
        let mut rates = HashMap::new();
        rates.insert(String::from(BASE_CURRENCY), 1.0);

        Self {
            rates,
            fallback: true,
        }
    }

    pub fn convert(&self, cents: i64, from: &str, to: &str) -> i64 {
        convert(cents, from, to, &self.rates)
    }
}

#[derive(Deserialize)]
struct RateProviderResponse {
    rates: HashMap<String, f64>,
}

struct CachedRates {
    fetched_at: Instant,
    rates: ExchangeRates,
}

/// USD-based rate table fetched from the configured provider and cached for
/// a TTL. Fetch failures degrade to the USD-only table with the fallback
/// flag set; degraded results are not cached so the next caller retries.
pub struct RateCache {
    client: reqwest::Client,
    provider_url: String,
    ttl: Duration,
    cached: RwLock<Option<CachedRates>>,
}

impl RateCache {
    pub fn new(provider_url: String, ttl: Duration) -> Self {
        Self {
            client: reqwest::Client::new(),
            provider_url,
            ttl,
            cached: RwLock::new(None),
        }
    }

    pub async fn current(&self) -> ExchangeRates {
        {
            let cached = self.cached.read().await;

            if let Some(cached) = &*cached {
                if cached.fetched_at.elapsed() < self.ttl {
                    return cached.rates.clone();
                }
            }
        }

        match self.fetch().await {
            Ok(rates) => {
                let mut cached = self.cached.write().await;
                *cached = Some(CachedRates {
                    fetched_at: Instant::now(),
                    rates: rates.clone(),
                });

                rates
            }
            Err(e) => {
                log::warn!("Failed to fetch exchange rates: {e}");
                ExchangeRates::usd_only()
            }
        }
    }

    async fn fetch(&self) -> Result<ExchangeRates, reqwest::Error> {
        let resp: RateProviderResponse = self
            .client
            .get(&self.provider_url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let mut rates = resp.rates;
        rates.insert(String::from(BASE_CURRENCY), 1.0);

        Ok(ExchangeRates {
            rates,
            fallback: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_rates() -> HashMap<String, f64> {
        let mut rates = HashMap::new();
        rates.insert(String::from("USD"), 1.0);
        rates.insert(String::from("EUR"), 0.5);
        rates.insert(String::from("SEK"), 10.0);
        rates
    }

    #[test]
    fn test_convert_identity() {
        let rates = test_rates();
        assert_eq!(convert(1599, "USD", "USD", &rates), 1599);
        assert_eq!(convert(0, "EUR", "EUR", &rates), 0);
    }

    #[test]
    fn test_convert_between_currencies() {
        let rates = test_rates();
        assert_eq!(convert(1000, "USD", "EUR", &rates), 500);
        assert_eq!(convert(500, "EUR", "USD", &rates), 1000);
        assert_eq!(convert(100, "EUR", "SEK", &rates), 2000);
    }

    #[test]
    fn test_convert_missing_rate_defaults_to_one() {
        let rates = test_rates();
        assert_eq!(convert(1000, "XXX", "USD", &rates), 1000);
        assert_eq!(convert(1000, "USD", "XXX", &rates), 1000);
        assert_eq!(convert(1000, "EUR", "XXX", &rates), 2000);
    }

    #[test]
    fn test_convert_rounds_to_nearest_cent() {
        let mut rates = test_rates();
        rates.insert(String::from("GBP"), 0.777);
        assert_eq!(convert(999, "USD", "GBP", &rates), 776);
    }

    #[test]
    fn test_usd_only_table() {
        let rates = ExchangeRates::usd_only();
        assert!(rates.fallback);
        assert_eq!(rates.rates.len(), 1);
        assert_eq!(rates.convert(1234, "USD", "USD"), 1234);
    }

    #[tokio::test]
    async fn test_cache_degrades_when_provider_unreachable() {
        // Connection refused immediately; no network involved
        let cache = RateCache::new(
            String::from("http://127.0.0.1:1/latest?from=USD"),
            Duration::from_secs(3600),
        );

        let rates = cache.current().await;
        assert!(rates.fallback);
        assert_eq!(rates.rates.get("USD"), Some(&1.0));
    }
}
