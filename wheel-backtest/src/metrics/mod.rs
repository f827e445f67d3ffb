//! Performance metrics module.
//!
//! Provides the calculations behind the report:
//! - Cumulative returns with forward fill
//! - Maximum drawdown and drawdown series
//! - Benchmark excess return and tracking error
//! - Month/quarter/year-to-date performance

pub mod drawdown;
pub mod performance;
pub mod returns;

pub use drawdown::{drawdown_series, max_drawdown, DrawdownAnalysis};
pub use performance::{compare_to_benchmark, period_to_date, BenchmarkComparison, PeriodPerformance};
pub use returns::{cumulative_returns, forward_fill, period_returns, total_return};
