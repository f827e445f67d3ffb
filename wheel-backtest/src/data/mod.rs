pub mod implied_vol;
pub mod loader;
pub mod types;
pub mod volatility;

pub use implied_vol::{ImpliedVolSource, ImpliedVolTable, NoImpliedVol};
pub use loader::{DataLoader, LoaderError};
pub use types::{decimal_to_f64, PriceBar, PriceSeries, SeriesError, SeriesPoint};
pub use volatility::{realized_volatility, with_realized_volatility, REALIZED_VOL_WINDOW};
