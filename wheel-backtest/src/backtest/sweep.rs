//! Parameter sweep over strategy variants.
//!
//! Every variant runs against the same resident series, so the data is
//! loaded once and the runs are spread across threads.

use indicatif::ProgressBar;
use rayon::prelude::*;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::data::{ImpliedVolSource, PriceSeries};

use super::config::WheelConfig;
use super::engine::{BacktestError, WheelBacktester};

/// Values to sweep. An empty list keeps the base configuration's value.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SweepGrid {
    pub strike_offsets: Vec<f64>,
    pub premium_ratios: Vec<f64>,
    pub protection_ratios: Vec<f64>,
}

impl SweepGrid {
    /// Calculate total number of parameter combinations.
    pub fn total_combinations(&self) -> usize {
        self.strike_offsets.len().max(1)
            * self.premium_ratios.len().max(1)
            * self.protection_ratios.len().max(1)
    }

    /// Expand the grid around `base`.
    pub fn configs(&self, base: &WheelConfig) -> Vec<WheelConfig> {
        let or_base = |values: &[f64], base_value: f64| {
            if values.is_empty() {
                vec![base_value]
            } else {
                values.to_vec()
            }
        };
        let offsets = or_base(&self.strike_offsets, base.strike_offset);
        let premiums = or_base(&self.premium_ratios, base.base_premium_ratio);
        let protections = or_base(&self.protection_ratios, base.put_protection_ratio);

        let mut configs = Vec::with_capacity(self.total_combinations());
        for &strike_offset in &offsets {
            for &base_premium_ratio in &premiums {
                for &put_protection_ratio in &protections {
                    configs.push(WheelConfig {
                        strike_offset,
                        base_premium_ratio,
                        put_protection_ratio,
                        ..base.clone()
                    });
                }
            }
        }
        configs
    }
}

/// Outcome of one variant.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepResult {
    pub config: WheelConfig,
    pub final_value: Decimal,
    pub total_return: f64,
    pub max_drawdown: f64,
    pub equivalent_cost: Decimal,
    pub put_protection_cost: Decimal,
    pub assignments: usize,
}

/// Run every configuration, best final value first.
///
/// Configurations that fail validation are skipped; data errors fail the
/// whole sweep since every variant shares the same data.
pub fn run_sweep<S>(
    configs: Vec<WheelConfig>,
    prices: &PriceSeries,
    benchmark: &PriceSeries,
    implied_vol: &S,
    progress: Option<&ProgressBar>,
) -> Result<Vec<SweepResult>, BacktestError>
where
    S: ImpliedVolSource + Sync + ?Sized,
{
    if prices.is_empty() {
        return Err(BacktestError::DataUnavailable {
            series: prices.ticker().to_string(),
        });
    }
    if benchmark.is_empty() {
        return Err(BacktestError::DataUnavailable {
            series: benchmark.ticker().to_string(),
        });
    }

    info!(variants = configs.len(), "starting parameter sweep");

    let mut results: Vec<SweepResult> = configs
        .into_par_iter()
        .filter_map(|config| {
            let outcome = WheelBacktester::new(config.clone())
                .and_then(|mut engine| engine.run(prices, benchmark, implied_vol));
            if let Some(pb) = progress {
                pb.inc(1);
            }
            let report = outcome.ok()?;
            Some(SweepResult {
                config,
                final_value: report.final_value,
                total_return: report.total_return(),
                max_drawdown: report.max_drawdown,
                equivalent_cost: report.equivalent_cost,
                put_protection_cost: report.put_protection_cost,
                assignments: report.assignments(),
            })
        })
        .collect();

    results.sort_by(|a, b| b.final_value.cmp(&a.final_value));
    info!(completed = results.len(), "parameter sweep complete");
    Ok(results)
}
