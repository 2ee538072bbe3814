use crate::config::AppConfig;
use crate::data_structures::RawRecord;
use async_trait::async_trait;
use reqwest::{Client, Error as ReqwestError};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::sleep;
use tracing::{debug, warn};

#[derive(Debug, Error)]
pub enum FetchError {
    #[error("network failure talking to quote provider: {0}")]
    Transport(#[from] ReqwestError),
    #[error("no intraday data available for symbol {0}")]
    DataUnavailable(String),
    #[error("malformed provider response: {0}")]
    InvalidResponse(String),
}

const SERIES_KEY: &str = "Time Series (1min)";
const OPEN_KEY: &str = "1. open";
const CLOSE_KEY: &str = "4. close";

/// Fetch capability over a quote provider. Implemented by the live client
/// and by the offline fixture, selected at startup via configuration.
#[async_trait]
pub trait QuoteFetcher: Send + Sync {
    async fn fetch_intraday(&self, symbol: &str) -> Result<Vec<RawRecord>, FetchError>;
}

pub type SharedFetcher = Arc<dyn QuoteFetcher>;

pub struct AlphaVantageFetcher {
    client: Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
}

impl AlphaVantageFetcher {
    pub fn new(config: &AppConfig) -> Result<Self, FetchError> {
        let client = Client::builder().timeout(config.fetch_timeout).build()?;

        Ok(AlphaVantageFetcher {
            client,
            base_url: config.api_base_url.clone(),
            api_key: config.api_key.clone(),
            max_retries: config.fetch_max_retries,
        })
    }

    // Transport failures and retryable statuses back off with jitter; any
    // other provider status fails immediately.
    async fn request_series(&self, symbol: &str) -> Result<Value, FetchError> {
        let mut last_error: Option<ReqwestError> = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                let delay = Duration::from_secs_f64(
                    2.0_f64.powi(attempt as i32 - 1) + rand::random::<f64>(),
                );
                let delay = delay.min(Duration::from_secs(30));
                debug!(attempt, delay_ms = delay.as_millis() as u64, "Retrying provider request");
                sleep(delay).await;
            }

            let response = self
                .client
                .get(&self.base_url)
                .query(&[
                    ("function", "TIME_SERIES_INTRADAY"),
                    ("symbol", symbol),
                    ("interval", "1min"),
                    ("apikey", self.api_key.as_str()),
                ])
                .send()
                .await;

            match response {
                Ok(resp) => {
                    let status = resp.status();
                    if status.is_success() {
                        return Ok(resp.json::<Value>().await?);
                    }
                    if status.as_u16() == 429 || status.is_server_error() {
                        warn!(%status, attempt, "Provider returned retryable status");
                        continue;
                    }
                    return Err(FetchError::InvalidResponse(format!(
                        "provider returned status {status}"
                    )));
                }
                Err(e) => {
                    warn!(error = %e, attempt, "Provider request failed");
                    last_error = Some(e);
                }
            }
        }

        Err(match last_error {
            Some(e) => FetchError::Transport(e),
            None => FetchError::InvalidResponse(
                "retries exhausted on provider status errors".to_string(),
            ),
        })
    }

    fn parse_series(symbol: &str, payload: &Value) -> Result<Vec<RawRecord>, FetchError> {
        let series = payload
            .get(SERIES_KEY)
            .and_then(|value| value.as_object())
            .ok_or_else(|| FetchError::DataUnavailable(symbol.to_string()))?;

        let mut records = Vec::with_capacity(series.len());
        for (time, values) in series {
            records.push(RawRecord {
                time: Some(time.clone()),
                open: Some(parse_price(values, OPEN_KEY)?),
                close: Some(parse_price(values, CLOSE_KEY)?),
            });
        }
        Ok(records)
    }
}

fn parse_price(values: &Value, key: &str) -> Result<f64, FetchError> {
    let raw = values
        .get(key)
        .and_then(|value| value.as_str())
        .ok_or_else(|| FetchError::InvalidResponse(format!("missing \"{key}\" in series entry")))?;
    raw.parse::<f64>().map_err(|_| {
        FetchError::InvalidResponse(format!("cannot parse \"{key}\" value '{raw}' as a number"))
    })
}

#[async_trait]
impl QuoteFetcher for AlphaVantageFetcher {
    async fn fetch_intraday(&self, symbol: &str) -> Result<Vec<RawRecord>, FetchError> {
        debug!(symbol, "Fetching intraday series from provider");
        let payload = self.request_series(symbol).await?;
        let records = Self::parse_series(symbol, &payload)?;
        debug!(symbol, record_count = records.len(), "Parsed provider series");
        Ok(records)
    }
}

/// Offline stand-in serving a fixed intraday sample without a network call.
#[derive(Debug, Default)]
pub struct FixtureFetcher;

pub fn fixture_records() -> Vec<RawRecord> {
    vec![
        RawRecord::new("2025-01-11 15:00:00", 100.5, 101.2),
        RawRecord::new("2025-01-11 15:01:00", 101.2, 102.0),
        RawRecord::new("2025-01-11 15:02:00", 102.0, 101.8),
    ]
}

#[async_trait]
impl QuoteFetcher for FixtureFetcher {
    async fn fetch_intraday(&self, symbol: &str) -> Result<Vec<RawRecord>, FetchError> {
        debug!(symbol, "Serving fixture intraday data");
        Ok(fixture_records())
    }
}
