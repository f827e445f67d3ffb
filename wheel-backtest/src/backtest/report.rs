//! Backtest report assembly.
//!
//! The report carries everything the plotting side consumes: cumulative
//! strategy and benchmark returns, the final equivalent cost, the maximum
//! drawdown, the total protective-put spend and the weekly history series.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::data::{decimal_to_f64, PriceSeries, SeriesPoint};
use crate::metrics::{
    compare_to_benchmark, cumulative_returns, drawdown_series, forward_fill, max_drawdown,
    period_to_date, total_return, BenchmarkComparison, DrawdownAnalysis, PeriodPerformance,
};

use super::config::WheelConfig;
use super::state::{PortfolioState, WeeklyRecord};

/// Result of a completed wheel backtest.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BacktestReport {
    pub ticker: String,
    pub benchmark_ticker: String,
    pub config: WheelConfig,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,

    /// Cumulative strategy return on trading days, forward-filled between checkpoints.
    pub strategy_returns: Vec<SeriesPoint>,

    /// Cumulative benchmark return, starting at exactly 1.0.
    pub benchmark_returns: Vec<SeriesPoint>,

    /// Final equivalent cost per share.
    pub equivalent_cost: Decimal,

    /// Maximum drawdown of the strategy returns, `<= 0`.
    pub max_drawdown: f64,

    /// Total spent on protective puts.
    pub put_protection_cost: Decimal,

    pub final_cash: Decimal,
    pub final_shares: Decimal,
    pub final_value: Decimal,

    /// Grid checkpoints, processed or not.
    pub checkpoints_total: usize,

    /// Per-checkpoint plotting series, serialized as top-level keys.
    #[serde(flatten)]
    pub series: HistorySeries,

    /// One record per processed checkpoint.
    pub history: Vec<WeeklyRecord>,
}

/// Weekly series taken from the processed checkpoints.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct HistorySeries {
    pub equivalent_cost_history: Vec<SeriesPoint>,
    /// Protective-put spend per week (zero in distributing weeks).
    pub put_protection_history: Vec<SeriesPoint>,
    pub cash_history: Vec<SeriesPoint>,
    pub shares_history: Vec<SeriesPoint>,
    pub price_history: Vec<SeriesPoint>,
    pub net_value_history: Vec<SeriesPoint>,
}

impl HistorySeries {
    pub fn from_history(history: &[WeeklyRecord]) -> Self {
        let series = |f: fn(&WeeklyRecord) -> Decimal| -> Vec<SeriesPoint> {
            history
                .iter()
                .map(|r| SeriesPoint::new(r.date, decimal_to_f64(f(r))))
                .collect()
        };
        Self {
            equivalent_cost_history: series(|r| r.equivalent_cost),
            put_protection_history: series(|r| r.put_protection_cost),
            cash_history: series(|r| r.cash),
            shares_history: series(|r| r.shares),
            price_history: series(|r| r.price),
            net_value_history: series(|r| r.net_value),
        }
    }
}

impl BacktestReport {
    pub(crate) fn assemble(
        config: &WheelConfig,
        state: &PortfolioState,
        history: Vec<WeeklyRecord>,
        checkpoints_total: usize,
        prices: &PriceSeries,
        benchmark: &PriceSeries,
    ) -> Self {
        let trading_days: Vec<NaiveDate> = prices.bars().iter().map(|b| b.date).collect();
        let net_values: BTreeMap<NaiveDate, f64> = history
            .iter()
            .map(|r| (r.date, decimal_to_f64(r.net_value)))
            .collect();

        let strategy_returns = cumulative_returns(&forward_fill(&trading_days, &net_values));
        let benchmark_returns = cumulative_returns(&benchmark.closes());
        let max_drawdown = max_drawdown(&strategy_returns);

        let final_value = history
            .last()
            .map(|r| r.net_value)
            .unwrap_or(state.cash);

        Self {
            ticker: prices.ticker().to_string(),
            benchmark_ticker: benchmark.ticker().to_string(),
            config: config.clone(),
            start_date: prices.first_date(),
            end_date: prices.last_date(),
            strategy_returns,
            benchmark_returns,
            equivalent_cost: state.equivalent_cost,
            max_drawdown,
            put_protection_cost: state.put_protection_cost,
            final_cash: state.cash,
            final_shares: state.shares,
            final_value,
            checkpoints_total,
            series: HistorySeries::from_history(&history),
            history,
        }
    }

    pub fn checkpoints_skipped(&self) -> usize {
        self.checkpoints_total.saturating_sub(self.history.len())
    }

    /// Drawdown of the strategy returns at every point.
    pub fn drawdown_series(&self) -> Vec<SeriesPoint> {
        drawdown_series(&self.strategy_returns)
    }

    pub fn drawdown_analysis(&self) -> DrawdownAnalysis {
        DrawdownAnalysis::analyze(&self.strategy_returns)
    }

    pub fn total_return(&self) -> f64 {
        total_return(&self.strategy_returns)
    }

    pub fn benchmark_total_return(&self) -> f64 {
        total_return(&self.benchmark_returns)
    }

    pub fn benchmark_comparison(&self) -> Option<BenchmarkComparison> {
        compare_to_benchmark(&self.strategy_returns, &self.benchmark_returns)
    }

    /// MTD/QTD/YTD strategy performance at `date`.
    pub fn period_to_date(&self, date: NaiveDate) -> PeriodPerformance {
        period_to_date(&self.strategy_returns, date)
    }

    /// Number of weeks in which an option was assigned with a non-zero size.
    pub fn assignments(&self) -> usize {
        self.history
            .iter()
            .filter(|r| !r.assigned_shares.is_zero())
            .count()
    }

    pub fn total_premium(&self) -> Decimal {
        self.history.iter().map(|r| r.premium).sum()
    }

    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }

    /// Generate summary string.
    pub fn summary(&self) -> String {
        let period = match (self.start_date, self.end_date) {
            (Some(start), Some(end)) => format!("{} to {}", start, end),
            _ => "no data".to_string(),
        };
        format!(
            "Wheel Backtest: {} vs {} ({})\n\
             ----------------------------------------\n\
             Total Return: {:.2}%\n\
             Benchmark Return: {:.2}%\n\
             Final Value: ${:.2}\n\
             Max Drawdown: {:.2}%\n\
             \n\
             Checkpoints: {} (skipped: {})\n\
             Assignments: {}\n\
             Premium Collected: ${:.2}\n\
             Put Protection Cost: ${:.2}\n\
             \n\
             Final Cash: ${:.2}\n\
             Final Shares: {:.2}\n\
             Equivalent Cost: ${:.2}",
            self.ticker,
            self.benchmark_ticker,
            period,
            self.total_return() * 100.0,
            self.benchmark_total_return() * 100.0,
            self.final_value,
            self.max_drawdown * 100.0,
            self.checkpoints_total,
            self.checkpoints_skipped(),
            self.assignments(),
            self.total_premium(),
            self.put_protection_cost,
            self.final_cash,
            self.final_shares,
            self.equivalent_cost,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backtest::state::Phase;
    use crate::data::PriceBar;
    use rust_decimal_macros::dec;

    fn date(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 1, d).unwrap()
    }

    fn record(day: u32, net_value: Decimal) -> WeeklyRecord {
        WeeklyRecord {
            date: date(day),
            checkpoint_index: 0,
            phase: Phase::Accumulating,
            price: dec!(100),
            volatility: 0.3,
            strike: dec!(95),
            premium: dec!(1),
            assigned_shares: Decimal::ZERO,
            equivalent_cost: Decimal::ZERO,
            put_protection_cost: dec!(0.4),
            cash: net_value,
            shares: Decimal::ZERO,
            net_value,
        }
    }

    fn series(ticker: &str, days: &[u32], price: Decimal) -> PriceSeries {
        PriceSeries::new(
            ticker,
            days.iter().map(|d| PriceBar::flat(date(*d), price)).collect(),
        )
        .unwrap()
    }

    #[test]
    fn test_strategy_returns_forward_filled() {
        let prices = series("TQQQ", &[4, 5, 8, 9, 12], dec!(100));
        let benchmark = series("SPY", &[4, 5, 8, 9, 12], dec!(300));
        let mut state = PortfolioState::new(dec!(1000));
        state.cash = dec!(1100);
        let history = vec![record(5, dec!(1000)), record(12, dec!(1100))];

        let report = BacktestReport::assemble(
            &WheelConfig::default(),
            &state,
            history,
            2,
            &prices,
            &benchmark,
        );

        let values: Vec<f64> = report.strategy_returns.iter().map(|p| p.value).collect();
        assert_eq!(report.strategy_returns[0].date, date(5));
        assert_eq!(values.len(), 4);
        assert_eq!(values[0], 1.0);
        assert_eq!(values[1], 1.0);
        assert_eq!(values[2], 1.0);
        assert!((values[3] - 1.1).abs() < 1e-12);
        assert_eq!(report.benchmark_returns[0].value, 1.0);
        assert_eq!(report.max_drawdown, 0.0);
        assert_eq!(report.final_value, dec!(1100));
        assert_eq!(report.checkpoints_skipped(), 0);
    }

    #[test]
    fn test_history_series() {
        let prices = series("TQQQ", &[5, 12], dec!(100));
        let benchmark = series("SPY", &[5, 12], dec!(300));
        let state = PortfolioState::new(dec!(1000));
        let history = vec![record(5, dec!(1000)), record(12, dec!(990))];
        let report = BacktestReport::assemble(
            &WheelConfig::default(),
            &state,
            history,
            3,
            &prices,
            &benchmark,
        );

        let series = &report.series;
        assert_eq!(series.put_protection_history.len(), 2);
        assert_eq!(series.put_protection_history[0].value, 0.4);
        assert_eq!(series.price_history[1].value, 100.0);
        assert_eq!(series.cash_history[1].value, 990.0);
        assert_eq!(series.net_value_history[1].value, 990.0);
        assert_eq!(series.net_value_history[1].date, date(12));
        assert_eq!(series.shares_history[0].value, 0.0);
        assert_eq!(series.equivalent_cost_history[0].value, 0.0);
        assert_eq!(report.checkpoints_skipped(), 1);
        assert_eq!(report.total_premium(), dec!(2));
        assert!(report.max_drawdown < 0.0);

        let analysis = report.drawdown_analysis();
        assert!((analysis.max_drawdown - report.max_drawdown).abs() < 1e-12);
        assert_eq!(analysis.peak_date, Some(date(5)));
        assert_eq!(analysis.trough_date, Some(date(12)));
        assert_eq!(analysis.recovery_date, None);
    }

    #[test]
    fn test_summary_and_json() {
        let prices = series("TQQQ", &[5], dec!(100));
        let benchmark = series("SPY", &[5], dec!(300));
        let state = PortfolioState::new(dec!(1000));
        let report = BacktestReport::assemble(
            &WheelConfig::default(),
            &state,
            vec![record(5, dec!(1000))],
            1,
            &prices,
            &benchmark,
        );

        let summary = report.summary();
        assert!(summary.contains("TQQQ vs SPY"));
        assert!(summary.contains("Checkpoints: 1 (skipped: 0)"));

        let json = report.to_json().unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["ticker"], "TQQQ");
        assert_eq!(parsed["max_drawdown"], 0.0);
        assert_eq!(parsed["history"].as_array().map(|h| h.len()), Some(1));
        for key in [
            "equivalent_cost_history",
            "put_protection_history",
            "cash_history",
            "shares_history",
            "price_history",
            "net_value_history",
        ] {
            assert_eq!(parsed[key].as_array().map(|h| h.len()), Some(1), "{}", key);
        }
        assert_eq!(parsed["cash_history"][0]["value"], 1000.0);

        let restored: BacktestReport = serde_json::from_str(&json).unwrap();
        assert_eq!(restored.series, report.series);
    }
}
