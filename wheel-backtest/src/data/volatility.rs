//! Trailing realized volatility.
//!
//! `vol[i] = std(daily_pct_change[i-window+1..=i]) * sqrt(252)`, using the
//! sample (n-1) standard deviation. The first `window - 1` rows have no
//! full window and are dropped from the series.

use statrs::statistics::Statistics;

use super::types::{decimal_to_f64, PriceSeries};

/// Default lookback in trading days.
pub const REALIZED_VOL_WINDOW: usize = 30;

/// Trading days per year used for annualization.
pub const TRADING_DAYS_PER_YEAR: f64 = 252.0;

/// Simple daily returns, `None` for the first row.
pub fn daily_returns(closes: &[f64]) -> Vec<Option<f64>> {
    let mut returns = Vec::with_capacity(closes.len());
    for (idx, close) in closes.iter().enumerate() {
        if idx == 0 || closes[idx - 1] == 0.0 {
            returns.push(None);
        } else {
            returns.push(Some(close / closes[idx - 1] - 1.0));
        }
    }
    returns
}

/// Annualized trailing volatility for each row, `None` while undefined.
///
/// Windows below two are never defined.
pub fn realized_volatility(closes: &[f64], window: usize) -> Vec<Option<f64>> {
    let returns = daily_returns(closes);

    (0..closes.len())
        .map(|idx| {
            if idx + 1 < window {
                return None;
            }
            let values: Vec<f64> = returns[idx + 1 - window..=idx]
                .iter()
                .flatten()
                .copied()
                .collect();
            if values.len() < 2 {
                return None;
            }
            let std = values.iter().std_dev();
            std.is_finite()
                .then(|| std * TRADING_DAYS_PER_YEAR.sqrt())
        })
        .collect()
}

/// Attach the realized volatility column and drop rows where it is undefined.
pub fn with_realized_volatility(mut series: PriceSeries, window: usize) -> PriceSeries {
    let closes: Vec<f64> = series.bars().iter().map(|b| decimal_to_f64(b.close)).collect();
    let vols = realized_volatility(&closes, window);

    let bars = series.bars_mut();
    let kept: Vec<_> = bars
        .drain(..)
        .zip(vols)
        .filter_map(|(bar, vol)| vol.map(|v| bar.with_realized_vol(v)))
        .filter(|bar| bar.realized_vol.is_some())
        .collect();
    *bars = kept;

    series
}
