use async_trait::async_trait;
use chrono::{Datelike, NaiveDate};
use time::OffsetDateTime;

use super::traits::PriceResolver;
use crate::errors::CoreError;

const PROVIDER: &str = "Yahoo Finance";

/// Yahoo Finance daily closing prices.
///
/// No API key and no strict rate limit (unofficial public endpoints),
/// wrapped by the `yahoo_finance_api` crate. Only a quote dated exactly on
/// the requested day counts; a weekend or holiday is `PriceNotAvailable`.
pub struct YahooFinanceResolver {
    connector: yahoo_finance_api::YahooConnector,
}

impl YahooFinanceResolver {
    pub fn new() -> Result<Self, CoreError> {
        let connector = yahoo_finance_api::YahooConnector::new().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to create connector: {e}"),
        })?;
        Ok(Self { connector })
    }

    /// Midnight UTC of `date` as a `time::OffsetDateTime`.
    fn to_offset_datetime(date: NaiveDate) -> Result<OffsetDateTime, CoreError> {
        let month = time::Month::try_from(date.month() as u8).map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Invalid month in {date}: {e}"),
        })?;

        let odt = time::Date::from_calendar_date(date.year(), month, date.day() as u8)
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Invalid date {date}: {e}"),
            })?
            .midnight()
            .assume_utc();
        Ok(odt)
    }

    fn timestamp_to_naive_date(ts: i64) -> Option<NaiveDate> {
        chrono::DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive())
    }
}

#[async_trait]
impl PriceResolver for YahooFinanceResolver {
    fn name(&self) -> &str {
        PROVIDER
    }

    async fn closing_price(&self, symbol: &str, date: NaiveDate) -> Result<f64, CoreError> {
        log::debug!("{PROVIDER}: fetching {symbol} for {date}");
        let start = Self::to_offset_datetime(date)?;
        let end = Self::to_offset_datetime(date + chrono::Duration::days(1))?;

        let resp = self
            .connector
            .get_quote_history(symbol, start, end)
            .await
            .map_err(|e| CoreError::Api {
                provider: PROVIDER.into(),
                message: format!("Failed to fetch history for {symbol} on {date}: {e}"),
            })?;

        let quotes = resp.quotes().map_err(|e| CoreError::Api {
            provider: PROVIDER.into(),
            message: format!("Failed to parse quotes for {symbol}: {e}"),
        })?;

        quotes
            .iter()
            .find(|q| Self::timestamp_to_naive_date(q.timestamp) == Some(date))
            .map(|q| q.close)
            .ok_or_else(|| CoreError::PriceNotAvailable {
                symbol: symbol.to_uppercase(),
                date,
            })
    }
}
