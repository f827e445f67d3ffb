//! CSV loader for daily price history and implied volatility tables.
//!
//! Price files carry one row per trading day:
//! - date (YYYY-MM-DD), open, high, low, close
//! - adj_close (optional, preferred over close when present)
//!
//! Implied volatility files carry `date, iv`. Empty cells and NaN are kept
//! as unavailable entries rather than rejected.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use polars::prelude::*;
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info};

use super::implied_vol::ImpliedVolTable;
use super::types::{PriceBar, PriceSeries, SeriesError};

/// Optional column used in place of `close`.
pub const ADJ_CLOSE_COLUMN: &str = "adj_close";

#[derive(Error, Debug)]
pub enum LoaderError {
    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("Polars error: {0}")]
    Polars(#[from] PolarsError),

    #[error("Missing column: {0}")]
    MissingColumn(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),

    #[error("Invalid series: {0}")]
    Series(#[from] SeriesError),
}

/// Reads CSV files into resident series.
pub struct DataLoader {
    data_dir: PathBuf,
}

impl DataLoader {
    /// Create a loader resolving relative paths against `data_dir`.
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
        }
    }

    fn resolve(&self, file: &Path) -> PathBuf {
        if file.is_absolute() {
            file.to_path_buf()
        } else {
            self.data_dir.join(file)
        }
    }

    fn read_csv(&self, file: &Path) -> Result<DataFrame, LoaderError> {
        let path = self.resolve(file);
        if !path.exists() {
            return Err(LoaderError::FileNotFound(path.display().to_string()));
        }
        let df = CsvReadOptions::default()
            .with_has_header(true)
            .try_into_reader_with_file_path(Some(path.clone()))?
            .finish()?;
        debug!(path = %path.display(), rows = df.height(), "read csv");
        Ok(df)
    }

    /// Load a daily price series, rows sorted by date.
    pub fn load_prices(&self, ticker: &str, file: &Path) -> Result<PriceSeries, LoaderError> {
        let df = self.read_csv(file)?;

        let dates = date_column(&df, "date")?;
        let open = float_column(&df, "open")?;
        let high = float_column(&df, "high")?;
        let low = float_column(&df, "low")?;
        let close = if df.column(ADJ_CLOSE_COLUMN).is_ok() {
            float_column(&df, ADJ_CLOSE_COLUMN)?
        } else {
            float_column(&df, "close")?
        };

        let mut bars = Vec::with_capacity(df.height());
        for idx in 0..df.height() {
            let date = dates[idx].ok_or_else(|| {
                LoaderError::InvalidData(format!("Row {}: missing or malformed date", idx))
            })?;
            // Rows without a price are not trading days.
            let Some(close_px) = close[idx] else {
                debug!(%date, "skipping row without close");
                continue;
            };
            let close_px = to_decimal(close_px, idx, "close")?;
            let field = |values: &[Option<f64>], name: &str| match values[idx] {
                Some(v) => to_decimal(v, idx, name),
                None => Ok(close_px),
            };
            bars.push(PriceBar {
                date,
                open: field(&open, "open")?,
                high: field(&high, "high")?,
                low: field(&low, "low")?,
                close: close_px,
                realized_vol: None,
            });
        }
        bars.sort_by_key(|b| b.date);

        let series = PriceSeries::new(ticker, bars)?;
        info!(ticker, rows = series.len(), "loaded price series");
        Ok(series)
    }

    /// Load a pre-fetched implied volatility table.
    pub fn load_implied_vol(&self, file: &Path) -> Result<ImpliedVolTable, LoaderError> {
        let df = self.read_csv(file)?;
        let dates = date_column(&df, "date")?;
        let ivs = float_column(&df, "iv")?;

        let table: ImpliedVolTable = dates
            .into_iter()
            .zip(ivs)
            .filter_map(|(date, iv)| date.map(|d| (d, iv.unwrap_or(f64::NAN))))
            .collect();
        info!(rows = table.len(), usable = table.usable_len(), "loaded implied vol table");
        Ok(table)
    }
}

fn column<'a>(df: &'a DataFrame, name: &str) -> Result<&'a Column, LoaderError> {
    df.column(name)
        .map_err(|_| LoaderError::MissingColumn(name.to_string()))
}

fn float_column(df: &DataFrame, name: &str) -> Result<Vec<Option<f64>>, LoaderError> {
    let col = column(df, name)?.cast(&DataType::Float64)?;
    Ok(col.f64()?.into_iter().collect())
}

fn date_column(df: &DataFrame, name: &str) -> Result<Vec<Option<NaiveDate>>, LoaderError> {
    let col = column(df, name)?.cast(&DataType::String)?;
    Ok(col
        .str()?
        .into_iter()
        .map(|s| s.and_then(parse_date))
        .collect())
}

fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    // Accept timestamps such as "2020-01-02 00:00:00" by keeping the date part.
    let date_part = raw.get(..10).unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d").ok()
}

fn to_decimal(value: f64, row: usize, name: &str) -> Result<Decimal, LoaderError> {
    Decimal::try_from(value)
        .map_err(|_| LoaderError::InvalidData(format!("Row {}: {} is not a price ({})", row, name, value)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::implied_vol::ImpliedVolSource;
    use rust_decimal_macros::dec;
    use std::io::Write;

    fn write_file(dir: &tempfile::TempDir, name: &str, contents: &str) -> PathBuf {
        let path = dir.path().join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    #[test]
    fn test_parse_date() {
        assert_eq!(parse_date("2020-01-03"), NaiveDate::from_ymd_opt(2020, 1, 3));
        assert_eq!(
            parse_date("2020-01-03 00:00:00"),
            NaiveDate::from_ymd_opt(2020, 1, 3)
        );
        assert_eq!(parse_date("03/01/2020"), None);
    }

    #[test]
    fn test_missing_file() {
        let loader = DataLoader::new("/nonexistent");
        let err = loader.load_prices("TQQQ", Path::new("tqqq.csv")).unwrap_err();
        assert!(matches!(err, LoaderError::FileNotFound(_)));
    }

    #[test]
    fn test_load_prices_prefers_adj_close() {
        let dir = tempfile::tempdir().unwrap();
        let path = write_file(
            &dir,
            "tqqq.csv",
            "date,open,high,low,close,adj_close\n\
             2020-01-03,10.0,11.0,9.5,10.5,10.25\n\
             2020-01-02,9.0,10.0,8.5,9.5,9.25\n",
        );
        let loader = DataLoader::new(dir.path());
        let series = loader.load_prices("TQQQ", &path).unwrap();

        assert_eq!(series.len(), 2);
        assert_eq!(series.first_date(), NaiveDate::from_ymd_opt(2020, 1, 2));
        let bar = &series.bars()[1];
        assert_eq!(bar.close, dec!(10.25));
        assert_eq!(bar.low, dec!(9.5));
        assert_eq!(bar.high, dec!(11));
    }

    #[test]
    fn test_load_prices_missing_column() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "spy.csv", "date,close\n2020-01-02,300.0\n");
        let loader = DataLoader::new(dir.path());
        let err = loader.load_prices("SPY", Path::new("spy.csv")).unwrap_err();
        assert!(matches!(err, LoaderError::MissingColumn(ref c) if c == "open"));
    }

    #[test]
    fn test_load_implied_vol_keeps_gaps_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        write_file(&dir, "iv.csv", "date,iv\n2020-01-03,0.62\n2020-01-10,\n");
        let loader = DataLoader::new(dir.path());
        let table = loader.load_implied_vol(Path::new("iv.csv")).unwrap();

        assert_eq!(table.len(), 2);
        assert_eq!(
            table.implied_vol(NaiveDate::from_ymd_opt(2020, 1, 3).unwrap()),
            Some(0.62)
        );
        assert_eq!(
            table.implied_vol(NaiveDate::from_ymd_opt(2020, 1, 10).unwrap()),
            None
        );
    }
}
