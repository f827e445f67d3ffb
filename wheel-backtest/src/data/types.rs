//! Core data types for the weekly wheel backtester.
//!
//! A `PriceSeries` is the resident, pre-fetched daily history of one
//! instrument. The backtest loop only ever performs in-memory lookups
//! against it.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum SeriesError {
    #[error("Dates must be strictly increasing: {next} follows {previous}")]
    Unordered {
        previous: NaiveDate,
        next: NaiveDate,
    },
}

/// Daily bar for the traded instrument or the benchmark.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PriceBar {
    pub date: NaiveDate,
    pub open: Decimal,
    pub high: Decimal,
    pub low: Decimal,
    /// Close, or adjusted close when the source provides one.
    pub close: Decimal,
    /// Trailing annualized realized volatility. `None` while undefined.
    pub realized_vol: Option<f64>,
}

impl PriceBar {
    /// Bar with identical open/high/low/close.
    pub fn flat(date: NaiveDate, price: Decimal) -> Self {
        Self {
            date,
            open: price,
            high: price,
            low: price,
            close: price,
            realized_vol: None,
        }
    }

    pub fn with_realized_vol(mut self, vol: f64) -> Self {
        self.realized_vol = if vol.is_finite() && vol >= 0.0 {
            Some(vol)
        } else {
            None
        };
        self
    }
}

/// A dated scalar, the unit of every report series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeriesPoint {
    pub date: NaiveDate,
    pub value: f64,
}

impl SeriesPoint {
    pub fn new(date: NaiveDate, value: f64) -> Self {
        Self { date, value }
    }
}

/// Ordered daily history for one instrument.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PriceSeries {
    ticker: String,
    bars: Vec<PriceBar>,
}

impl PriceSeries {
    /// Build a series, rejecting dates that are not strictly increasing.
    pub fn new(ticker: impl Into<String>, bars: Vec<PriceBar>) -> Result<Self, SeriesError> {
        if let Some(pair) = bars.windows(2).find(|w| w[1].date <= w[0].date) {
            return Err(SeriesError::Unordered {
                previous: pair[0].date,
                next: pair[1].date,
            });
        }
        Ok(Self {
            ticker: ticker.into(),
            bars,
        })
    }

    pub fn ticker(&self) -> &str {
        &self.ticker
    }

    pub fn bars(&self) -> &[PriceBar] {
        &self.bars
    }

    pub fn len(&self) -> usize {
        self.bars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bars.is_empty()
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.bars.first().map(|b| b.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.bars.last().map(|b| b.date)
    }

    /// Bar for an exact trading date.
    pub fn get(&self, date: NaiveDate) -> Option<&PriceBar> {
        self.bars
            .binary_search_by_key(&date, |b| b.date)
            .ok()
            .map(|idx| &self.bars[idx])
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.get(date).is_some()
    }

    /// Closing prices as report points.
    pub fn closes(&self) -> Vec<SeriesPoint> {
        self.bars
            .iter()
            .map(|b| SeriesPoint::new(b.date, decimal_to_f64(b.close)))
            .collect()
    }

    pub(crate) fn bars_mut(&mut self) -> &mut Vec<PriceBar> {
        &mut self.bars
    }
}

/// Lossy conversion used at the money/ratio boundary.
pub fn decimal_to_f64(value: Decimal) -> f64 {
    value.try_into().unwrap_or(f64::NAN)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    #[test]
    fn test_series_rejects_unordered_dates() {
        let bars = vec![PriceBar::flat(day(3), dec!(10)), PriceBar::flat(day(2), dec!(11))];
        let err = PriceSeries::new("TQQQ", bars).unwrap_err();
        assert_eq!(
            err,
            SeriesError::Unordered {
                previous: day(3),
                next: day(2)
            }
        );
    }

    #[test]
    fn test_series_rejects_duplicate_dates() {
        let bars = vec![PriceBar::flat(day(2), dec!(10)), PriceBar::flat(day(2), dec!(11))];
        assert!(PriceSeries::new("TQQQ", bars).is_err());
    }

    #[test]
    fn test_lookup_by_date() {
        let bars = vec![
            PriceBar::flat(day(2), dec!(10)),
            PriceBar::flat(day(3), dec!(11)),
            PriceBar::flat(day(5), dec!(12)),
        ];
        let series = PriceSeries::new("TQQQ", bars).unwrap();
        assert_eq!(series.get(day(3)).map(|b| b.close), Some(dec!(11)));
        assert!(!series.contains(day(4)));
        assert_eq!(series.first_date(), Some(day(2)));
        assert_eq!(series.last_date(), Some(day(5)));
    }

    #[test]
    fn test_nan_realized_vol_is_undefined() {
        let bar = PriceBar::flat(day(2), dec!(10)).with_realized_vol(f64::NAN);
        assert_eq!(bar.realized_vol, None);
        let bar = PriceBar::flat(day(2), dec!(10)).with_realized_vol(0.25);
        assert_eq!(bar.realized_vol, Some(0.25));
    }
}
