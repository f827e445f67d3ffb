//! Weekly wheel backtesting.
//!
//! This module provides the options-overwriting simulation:
//! - Strategy configuration
//! - Friday checkpoint grid
//! - Synthetic weekly option parameters
//! - Portfolio state and phase decisions
//! - Report assembly and parameter sweeps

pub mod calendar;
pub mod config;
pub mod engine;
pub mod option_params;
pub mod report;
pub mod state;
pub mod sweep;

pub use calendar::weekly_checkpoints;
pub use config::WheelConfig;
pub use engine::{resolve_volatility, BacktestError, WeekOutcome, WheelBacktester};
pub use option_params::{estimate_weekly_option, OptionDirection, OptionQuoteEstimate};
pub use report::{BacktestReport, HistorySeries};
pub use state::{target_shares, Phase, PortfolioState, WeeklyRecord};
pub use sweep::{run_sweep, SweepGrid, SweepResult};
