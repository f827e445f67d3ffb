//! Benchmark comparison and period-to-date performance.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;

use crate::data::SeriesPoint;

use super::returns::period_returns;

/// Strategy versus benchmark over their common length.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BenchmarkComparison {
    /// Mean strategy period return minus mean benchmark period return.
    pub excess_return: f64,
    /// Population standard deviation of the per-period return difference.
    pub tracking_error: f64,
}

/// Month-, quarter- and year-to-date percentage performance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeriodPerformance {
    pub reference_date: NaiveDate,
    pub mtd_pct: Option<f64>,
    pub qtd_pct: Option<f64>,
    pub ytd_pct: Option<f64>,
}

/// Compare two value series (prices or cumulative returns).
///
/// Returns `None` when either side has fewer than two points.
pub fn compare_to_benchmark(
    strategy: &[SeriesPoint],
    benchmark: &[SeriesPoint],
) -> Option<BenchmarkComparison> {
    let strategy_returns: Vec<f64> = period_returns(strategy).iter().map(|p| p.value).collect();
    let benchmark_returns: Vec<f64> = period_returns(benchmark).iter().map(|p| p.value).collect();
    let len = strategy_returns.len().min(benchmark_returns.len());
    if len == 0 {
        return None;
    }

    let excess_return =
        strategy_returns[..len].iter().mean() - benchmark_returns[..len].iter().mean();
    let differences: Vec<f64> = strategy_returns[..len]
        .iter()
        .zip(&benchmark_returns[..len])
        .map(|(s, b)| s - b)
        .collect();
    let tracking_error = differences.iter().population_std_dev();

    Some(BenchmarkComparison {
        excess_return,
        tracking_error,
    })
}

/// Value on or before `date`, the last one available.
pub fn value_at(series: &[SeriesPoint], date: NaiveDate) -> Option<f64> {
    let idx = series.partition_point(|p| p.date <= date);
    idx.checked_sub(1).map(|i| series[i].value)
}

/// Percentage change from the value at `start` to the value at `end`.
pub fn performance_between(series: &[SeriesPoint], start: NaiveDate, end: NaiveDate) -> Option<f64> {
    let start_value = value_at(series, start)?;
    let end_value = value_at(series, end)?;
    if start_value == 0.0 {
        return None;
    }
    Some((end_value - start_value) / start_value * 100.0)
}

fn quarter_start(date: NaiveDate) -> NaiveDate {
    let month = (date.month0() / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), month, 1).unwrap_or(date)
}

/// MTD/QTD/YTD performance at `reference_date`.
///
/// A period start before the first point has no value and yields `None`
/// for that period.
pub fn period_to_date(series: &[SeriesPoint], reference_date: NaiveDate) -> PeriodPerformance {
    let month_start = reference_date.with_day(1).unwrap_or(reference_date);
    let year_start = NaiveDate::from_ymd_opt(reference_date.year(), 1, 1).unwrap_or(reference_date);

    PeriodPerformance {
        reference_date,
        mtd_pct: performance_between(series, month_start, reference_date),
        qtd_pct: performance_between(series, quarter_start(reference_date), reference_date),
        ytd_pct: performance_between(series, year_start, reference_date),
    }
}
