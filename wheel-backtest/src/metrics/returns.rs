//! Cumulative return series.
//!
//! Mirrors `series.ffill().pct_change().add(1).cumprod()` with the first
//! point seeded at exactly 1.0.

use std::collections::BTreeMap;

use chrono::NaiveDate;

use crate::data::SeriesPoint;

/// Forward-fill sparse values onto a dense date index.
///
/// Dates before the first known value are dropped, since they have nothing
/// to carry forward.
pub fn forward_fill(index: &[NaiveDate], values: &BTreeMap<NaiveDate, f64>) -> Vec<SeriesPoint> {
    let mut filled = Vec::with_capacity(index.len());
    let mut last: Option<f64> = None;
    for &date in index {
        if let Some(v) = values.get(&date).filter(|v| v.is_finite()) {
            last = Some(*v);
        }
        if let Some(v) = last {
            filled.push(SeriesPoint::new(date, v));
        }
    }
    filled
}

/// Period-over-period simple returns, one shorter than the input.
pub fn period_returns(values: &[SeriesPoint]) -> Vec<SeriesPoint> {
    values
        .windows(2)
        .map(|w| SeriesPoint::new(w[1].date, pct_change(w[0].value, w[1].value)))
        .collect()
}

/// Growth of one unit invested at the first point.
pub fn cumulative_returns(values: &[SeriesPoint]) -> Vec<SeriesPoint> {
    let mut out = Vec::with_capacity(values.len());
    let mut growth = 1.0;
    let mut previous: Option<f64> = None;

    for point in values {
        // NaN values are treated as missing and carry the previous level.
        let current = if point.value.is_finite() {
            point.value
        } else {
            match previous {
                Some(p) => p,
                None => continue,
            }
        };
        if let Some(prev) = previous {
            growth *= 1.0 + pct_change(prev, current);
        }
        previous = Some(current);
        out.push(SeriesPoint::new(point.date, growth));
    }
    out
}

/// Final growth minus one, 0.0 for an empty series.
pub fn total_return(cumulative: &[SeriesPoint]) -> f64 {
    cumulative.last().map(|p| p.value - 1.0).unwrap_or(0.0)
}

fn pct_change(previous: f64, current: f64) -> f64 {
    if previous == 0.0 {
        0.0
    } else {
        current / previous - 1.0
    }
}
