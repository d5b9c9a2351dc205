use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::Duration;

use super::traits::PriceResolver;
use crate::errors::CoreError;

const BASE_URL: &str = "https://www.alphavantage.co/query";
const PROVIDER: &str = "Alpha Vantage";

/// Alpha Vantage daily closing prices.
///
/// - **Free tier**: 25 requests/day (across ALL endpoints).
/// - **Requires**: API key (settings key "alphavantage").
/// - `outputsize=full` so dates older than the last 100 sessions resolve.
pub struct AlphaVantageResolver {
    client: Client,
    api_key: String,
}

impl AlphaVantageResolver {
    pub fn new(api_key: String) -> Self {
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_else(|_| Client::new());
        Self { client, api_key }
    }

    /// Fetch the full daily time series for a symbol.
    async fn fetch_daily_series(
        &self,
        symbol: &str,
    ) -> Result<HashMap<String, DailyData>, CoreError> {
        let resp: TimeSeriesResponse = self
            .client
            .get(BASE_URL)
            .query(&[
                ("function", "TIME_SERIES_DAILY"),
                ("symbol", &symbol.to_uppercase()),
                ("outputsize", "full"),
                ("apikey", &self.api_key),
            ])
            .send()
            .await?
            .json()
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to parse time series for {symbol}: {e}"),
            })?;

        if let Some(note) = resp.note.or(resp.information) {
            return Err(CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Rate limited while fetching {symbol}: {note}"),
            });
        }

        resp.time_series.ok_or_else(|| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("No time series data for {symbol}"),
        })
    }
}

// ── Alpha Vantage API response types ────────────────────────────────

#[derive(Deserialize)]
struct TimeSeriesResponse {
    #[serde(rename = "Time Series (Daily)")]
    time_series: Option<HashMap<String, DailyData>>,
    #[serde(rename = "Note")]
    note: Option<String>,
    #[serde(rename = "Information")]
    information: Option<String>,
}

#[derive(Deserialize)]
struct DailyData {
    #[serde(rename = "4. close")]
    close: String,
}

#[async_trait]
impl PriceResolver for AlphaVantageResolver {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn closing_price(&self, symbol: &str, date: NaiveDate) -> Result<f64, CoreError> {
        log::debug!("{PROVIDER}: fetching {symbol} for {date}");
        let series = self.fetch_daily_series(symbol).await?;

        series
            .get(&date.format("%Y-%m-%d").to_string())
            .and_then(|d| d.close.parse().ok())
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: symbol.to_uppercase(),
                date,
            })
    }
}
