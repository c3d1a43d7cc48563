use crate::Result;
use chrono::{DateTime, Duration, TimeZone, Utc};
use reqwest::Client;
use serde::Deserialize;
use tokio::time::sleep;

const REFERENCE_API_BASE: &str = "https://finnhub.io/api/v1";
const MAX_RETRIES: u32 = 3;
const INITIAL_BACKOFF_MS: u64 = 2000;

/// Client for the static reference-data API
///
/// Consumed at startup only: company metadata and a short daily closing
/// series for the chart printout. Lookups here never influence trading
/// decisions.
#[derive(Clone)]
pub struct ReferenceDataClient {
    client: Client,
    base_url: String,
    api_key: String,
}

#[derive(Debug, Clone)]
pub struct CompanyProfile {
    pub name: String,
    pub exchange: String,
    pub industry: String,
}

#[derive(Debug, Clone)]
pub struct ClosingPrice {
    pub date: DateTime<Utc>,
    pub close: f64,
}

#[derive(Debug, Deserialize)]
struct ProfileResponse {
    #[serde(default)]
    name: String,
    #[serde(default)]
    exchange: String,
    #[serde(default, rename = "finnhubIndustry")]
    industry: String,
}

#[derive(Debug, Deserialize)]
struct CandleResponse {
    /// Status: "ok" or "no_data"
    s: String,
    #[serde(default)]
    c: Vec<f64>,
    #[serde(default)]
    t: Vec<i64>,
}

impl ReferenceDataClient {
    pub fn new(api_key: String) -> Self {
        Self::with_base_url(api_key, REFERENCE_API_BASE.to_string())
    }

    /// Create a client against a non-default API base (used by tests)
    pub fn with_base_url(api_key: String, base_url: String) -> Self {
        Self {
            client: Client::new(),
            base_url,
            api_key,
        }
    }

    /// Get company metadata for a symbol
    /// Includes retry logic with exponential backoff for transient failures
    pub async fn company_profile(&self, symbol: &str) -> Result<CompanyProfile> {
        self.with_retries(symbol, || self.fetch_profile_once(symbol))
            .await
    }

    /// Get up to `days` recent daily closing prices for a symbol
    pub async fn daily_closes(&self, symbol: &str, days: i64) -> Result<Vec<ClosingPrice>> {
        let to = Utc::now();
        let from = to - Duration::days(days);
        self.with_retries(symbol, || {
            self.fetch_closes_once(symbol, from.timestamp(), to.timestamp())
        })
        .await
    }

    async fn with_retries<T, F, Fut>(&self, symbol: &str, fetch: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut last_error = None;

        for attempt in 1..=MAX_RETRIES {
            match fetch().await {
                Ok(value) => {
                    if attempt > 1 {
                        tracing::info!(
                            "Successfully fetched reference data for {} after {} attempts",
                            symbol,
                            attempt
                        );
                    }
                    return Ok(value);
                }
                Err(e) => {
                    last_error = Some(e);
                    if attempt < MAX_RETRIES {
                        let backoff_ms = INITIAL_BACKOFF_MS * 2u64.pow(attempt - 1);
                        tracing::warn!(
                            "Reference lookup for {} failed (attempt {}/{}), retrying in {}ms",
                            symbol,
                            attempt,
                            MAX_RETRIES,
                            backoff_ms
                        );
                        sleep(std::time::Duration::from_millis(backoff_ms)).await;
                    }
                }
            }
        }

        Err(last_error
            .unwrap_or_else(|| format!("Reference lookup failed for {}", symbol).into()))
    }

    async fn fetch_profile_once(&self, symbol: &str) -> Result<CompanyProfile> {
        let url = format!(
            "{}/stock/profile2?symbol={}&token={}",
            self.base_url, symbol, self.api_key
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(format!("Profile lookup returned HTTP {}", response.status()).into());
        }

        let profile: ProfileResponse = response.json().await?;
        if profile.name.is_empty() {
            return Err(format!("No profile found for {}", symbol).into());
        }

        Ok(CompanyProfile {
            name: profile.name,
            exchange: profile.exchange,
            industry: profile.industry,
        })
    }

    async fn fetch_closes_once(
        &self,
        symbol: &str,
        from: i64,
        to: i64,
    ) -> Result<Vec<ClosingPrice>> {
        let url = format!(
            "{}/stock/candle?symbol={}&resolution=D&from={}&to={}&token={}",
            self.base_url, symbol, from, to, self.api_key
        );

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(format!("Candle lookup returned HTTP {}", response.status()).into());
        }

        let candles: CandleResponse = response.json().await?;
        if candles.s != "ok" {
            return Err(format!("No historical data for {} ({})", symbol, candles.s).into());
        }

        Ok(candles
            .t
            .iter()
            .zip(candles.c.iter())
            .filter_map(|(&ts, &close)| {
                Utc.timestamp_opt(ts, 0)
                    .single()
                    .map(|date| ClosingPrice { date, close })
            })
            .collect())
    }
}
