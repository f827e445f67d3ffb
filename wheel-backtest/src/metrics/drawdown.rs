//! Peak-to-trough drawdown of a cumulative return series.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::data::SeriesPoint;

/// `series[i] / max(series[..=i]) - 1` for every point.
pub fn drawdown_series(series: &[SeriesPoint]) -> Vec<SeriesPoint> {
    let mut peak = f64::NEG_INFINITY;
    series
        .iter()
        .map(|point| {
            peak = peak.max(point.value);
            let drawdown = if peak > 0.0 {
                point.value / peak - 1.0
            } else {
                0.0
            };
            SeriesPoint::new(point.date, drawdown)
        })
        .collect()
}

/// Largest relative decline from a running peak, as a value `<= 0`.
///
/// Empty and non-decreasing series return exactly 0.0.
pub fn max_drawdown(series: &[SeriesPoint]) -> f64 {
    drawdown_series(series)
        .into_iter()
        .map(|p| p.value)
        .fold(0.0, f64::min)
}

/// Where the worst drawdown happened.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DrawdownAnalysis {
    pub max_drawdown: f64,
    pub peak_date: Option<NaiveDate>,
    pub trough_date: Option<NaiveDate>,
    pub recovery_date: Option<NaiveDate>,
}

impl DrawdownAnalysis {
    pub fn analyze(series: &[SeriesPoint]) -> Self {
        let mut peak_value = f64::NEG_INFINITY;
        let mut peak_date = None;
        let mut worst = 0.0;
        let mut worst_peak = None;
        let mut trough_date = None;

        for point in series {
            if point.value > peak_value {
                peak_value = point.value;
                peak_date = Some(point.date);
            }
            let drawdown = if peak_value > 0.0 {
                point.value / peak_value - 1.0
            } else {
                0.0
            };
            if drawdown < worst {
                worst = drawdown;
                worst_peak = peak_date;
                trough_date = Some(point.date);
            }
        }

        let recovery_date = match (trough_date, worst_peak) {
            (Some(trough), Some(peak)) => {
                let peak_level = series
                    .iter()
                    .find(|p| p.date == peak)
                    .map(|p| p.value)
                    .unwrap_or(f64::INFINITY);
                series
                    .iter()
                    .filter(|p| p.date > trough)
                    .find(|p| p.value >= peak_level)
                    .map(|p| p.date)
            }
            _ => None,
        };

        Self {
            max_drawdown: worst,
            peak_date: worst_peak,
            trough_date,
            recovery_date,
        }
    }
}
