//! Best-effort implied volatility lookup.
//!
//! Implied volatility is optional input. Any source may fail to answer for a
//! given date; the backtester then falls back to realized volatility. NaN,
//! infinite and negative values are reported as unavailable, never passed on.

use std::collections::BTreeMap;

use chrono::NaiveDate;

/// Source of annualized implied volatility for a near-the-money put.
pub trait ImpliedVolSource {
    fn implied_vol(&self, date: NaiveDate) -> Option<f64>;
}

/// Source that never has an answer.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoImpliedVol;

impl ImpliedVolSource for NoImpliedVol {
    fn implied_vol(&self, _date: NaiveDate) -> Option<f64> {
        None
    }
}

impl<F> ImpliedVolSource for F
where
    F: Fn(NaiveDate) -> Option<f64>,
{
    fn implied_vol(&self, date: NaiveDate) -> Option<f64> {
        self(date).filter(|v| is_usable(*v))
    }
}

/// Pre-fetched implied volatility keyed by trading date.
#[derive(Debug, Clone, Default)]
pub struct ImpliedVolTable {
    values: BTreeMap<NaiveDate, f64>,
}

impl ImpliedVolTable {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, date: NaiveDate, iv: f64) {
        self.values.insert(date, iv);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Number of entries that would actually be served.
    pub fn usable_len(&self) -> usize {
        self.values.values().filter(|v| is_usable(**v)).count()
    }
}

impl FromIterator<(NaiveDate, f64)> for ImpliedVolTable {
    fn from_iter<T: IntoIterator<Item = (NaiveDate, f64)>>(iter: T) -> Self {
        Self {
            values: iter.into_iter().collect(),
        }
    }
}

impl ImpliedVolSource for ImpliedVolTable {
    fn implied_vol(&self, date: NaiveDate) -> Option<f64> {
        self.values.get(&date).copied().filter(|v| is_usable(*v))
    }
}

fn is_usable(value: f64) -> bool {
    value.is_finite() && value >= 0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
    }

    #[test]
    fn test_table_lookup() {
        let table: ImpliedVolTable = [(day(1), 0.55), (day(8), f64::NAN)].into_iter().collect();
        assert_eq!(table.implied_vol(day(1)), Some(0.55));
        assert_eq!(table.implied_vol(day(8)), None);
        assert_eq!(table.implied_vol(day(15)), None);
        assert_eq!(table.len(), 2);
        assert_eq!(table.usable_len(), 1);
    }

    #[test]
    fn test_closure_source_filters_nan() {
        let source = |_: NaiveDate| Some(f64::NAN);
        assert_eq!(source.implied_vol(day(1)), None);

        let source = |_: NaiveDate| Some(0.4);
        assert_eq!(source.implied_vol(day(1)), Some(0.4));
    }

    #[test]
    fn test_negative_iv_unavailable() {
        let mut table = ImpliedVolTable::new();
        table.insert(day(1), -0.1);
        assert_eq!(table.implied_vol(day(1)), None);
    }

    #[test]
    fn test_no_implied_vol() {
        assert_eq!(NoImpliedVol.implied_vol(day(1)), None);
    }
}
