use chrono::{Datelike, Days, Months, NaiveDate};

use super::valuation_service::ValuationService;
use crate::errors::CoreError;
use crate::models::chart::{Granularity, PerformanceChart, PerformancePoint};
use crate::models::instrument::InstrumentCache;
use crate::models::portfolio::Portfolio;

/// Widest bar drawn, in `*` characters.
pub const MAX_BAR_WIDTH: f64 = 50.0;

/// Builds text bar charts of a portfolio's value over a date range.
///
/// The range length picks the sampling granularity:
///
/// | span (days) | samples                         |
/// |-------------|---------------------------------|
/// | ≤ 30        | every day                       |
/// | 31–150      | five steps of `span / 5` days   |
/// | 151–912     | month-ends                      |
/// | 913–1826    | every other month-end           |
/// | > 1826      | year-ends                       |
///
/// Stepped samples start one step after `start` and never pass `end`.
/// Every other sequence ends on the range's last day.
pub struct PerformanceService {
    valuation: ValuationService,
}

impl PerformanceService {
    pub fn new() -> Self {
        Self {
            valuation: ValuationService::new(),
        }
    }

    /// Granularity and ordered sample dates for `start..=end`.
    pub fn sample_dates(
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<(Granularity, Vec<NaiveDate>), CoreError> {
        if start >= end {
            return Err(CoreError::InvalidArgument(format!(
                "Start date ({start}) must be before end date ({end})"
            )));
        }

        let span = (end - start).num_days();
        let (granularity, mut dates): (Granularity, Vec<NaiveDate>) = match span {
            0..=30 => (
                Granularity::Daily,
                start.iter_days().take_while(|d| *d <= end).collect(),
            ),
            31..=150 => {
                let step = span / 5;
                let dates = (1..)
                    .map_while(|k| start.checked_add_days(Days::new((k * step) as u64)))
                    .take_while(|d| *d <= end)
                    .collect();
                (Granularity::Stepped { days: step }, dates)
            }
            151..=912 => (Granularity::Monthly, Self::period_ends(start, end, 1, month_end)),
            913..=1826 => (Granularity::Bimonthly, Self::period_ends(start, end, 2, month_end)),
            _ => (Granularity::Yearly, Self::period_ends(start, end, 12, year_end)),
        };

        dates.dedup();

        log::debug!("Charting {start}..={end} ({span} days) as {granularity:?}: {} samples", dates.len());
        Ok((granularity, dates))
    }

    /// Walk from `start` in `months` steps while below `end`, taking the
    /// period end of each step, clamped to `end`. Always finishes on `end`.
    fn period_ends(
        start: NaiveDate,
        end: NaiveDate,
        months: u32,
        period_end: fn(NaiveDate) -> NaiveDate,
    ) -> Vec<NaiveDate> {
        let mut dates = Vec::new();
        let mut cursor = start;
        while cursor < end {
            dates.push(period_end(cursor).min(end));
            cursor = match cursor.checked_add_months(Months::new(months)) {
                Some(next) => next,
                None => break,
            };
        }
        if dates.last() != Some(&end) {
            dates.push(end);
        }
        dates
    }

    /// Smallest whole scale with `(max - min) / scale < 50`.
    pub fn scale_for(min: f64, max: f64) -> u64 {
        let diff = (max - min).max(0.0);
        // floor(diff / 50) never satisfies the bound itself, so start there.
        let mut scale = ((diff / MAX_BAR_WIDTH).floor() as u64).max(1);
        while diff / scale as f64 >= MAX_BAR_WIDTH {
            scale += 1;
        }
        scale
    }

    /// Value the portfolio at every sample date of `start..=end`.
    pub async fn chart(
        &self,
        portfolio: &Portfolio,
        instruments: &InstrumentCache,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<PerformanceChart, CoreError> {
        let (granularity, dates) = Self::sample_dates(start, end)?;

        let mut points = Vec::with_capacity(dates.len());
        let mut min_value = f64::INFINITY;
        let mut max_value = f64::NEG_INFINITY;

        for date in dates {
            let value = self.valuation.value(portfolio, instruments, date).await?;
            min_value = min_value.min(value);
            max_value = max_value.max(value);
            points.push(PerformancePoint { date, value });
        }

        Ok(PerformanceChart {
            granularity,
            points,
            min_value,
            max_value,
            scale: Self::scale_for(min_value, max_value),
        })
    }

    /// `chart` rendered as text.
    pub async fn render(
        &self,
        portfolio: &Portfolio,
        instruments: &InstrumentCache,
        start: NaiveDate,
        end: NaiveDate,
    ) -> Result<String, CoreError> {
        Ok(self.chart(portfolio, instruments, start, end).await?.render())
    }
}

impl Default for PerformanceService {
    fn default() -> Self {
        Self::new()
    }
}

/// Last calendar day of `date`'s month.
pub fn month_end(date: NaiveDate) -> NaiveDate {
    let (year, month) = if date.month() == 12 {
        (date.year() + 1, 1)
    } else {
        (date.year(), date.month() + 1)
    };
    NaiveDate::from_ymd_opt(year, month, 1)
        .and_then(|first| first.pred_opt())
        .unwrap_or(date)
}

/// December 31st of `date`'s year.
pub fn year_end(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date)
}
