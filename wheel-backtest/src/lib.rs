pub mod backtest;
pub mod data;
pub mod metrics;

// Re-export commonly used types
pub use backtest::{
    BacktestError, BacktestReport, Phase, PortfolioState, SweepGrid, WeeklyRecord, WheelBacktester,
    WheelConfig,
};
pub use data::{DataLoader, ImpliedVolSource, ImpliedVolTable, NoImpliedVol, PriceBar, PriceSeries};
pub use metrics::{max_drawdown, DrawdownAnalysis};
