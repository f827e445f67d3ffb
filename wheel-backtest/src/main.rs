//! Weekly wheel backtester CLI.
//!
//! # Usage
//!
//! ```bash
//! # Run a single backtest
//! wheel-backtest run --prices data/tqqq.csv --benchmark data/spy.csv
//!
//! # Use implied volatility where available and a strategy config
//! wheel-backtest run --prices data/tqqq.csv --benchmark data/spy.csv \
//!     --iv data/tqqq_iv.csv --config config/wheel.toml --output results/report.json
//!
//! # Sweep strategy variants
//! wheel-backtest sweep --prices data/tqqq.csv --benchmark data/spy.csv \
//!     --strike-offsets 0.03,0.05,0.08 --premium-ratios 0.2,0.3
//!
//! # Inspect the realized volatility column
//! wheel-backtest volatility --prices data/tqqq.csv
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

use wheel_backtest::backtest::{run_sweep, SweepGrid};
use wheel_backtest::data::{
    with_realized_volatility, DataLoader, ImpliedVolSource, ImpliedVolTable, NoImpliedVol,
    PriceSeries, REALIZED_VOL_WINDOW,
};
use wheel_backtest::{WheelBacktester, WheelConfig};

const SEPARATOR: &str = "============================================================";

#[derive(Parser)]
#[command(name = "wheel-backtest")]
#[command(about = "Weekly covered-call / cash-secured-put backtester")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct DataArgs {
    /// Daily price CSV of the traded instrument
    #[arg(long)]
    prices: PathBuf,

    /// Daily price CSV of the benchmark
    #[arg(long)]
    benchmark: PathBuf,

    /// Optional implied volatility CSV (date,iv)
    #[arg(long)]
    iv: Option<PathBuf>,

    /// Ticker label of the traded instrument
    #[arg(long, default_value = "TQQQ")]
    ticker: String,

    /// Ticker label of the benchmark
    #[arg(long, default_value = "SPY")]
    benchmark_ticker: String,

    /// Strategy configuration (TOML)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Realized volatility lookback in trading days (at least 2)
    #[arg(long, default_value_t = REALIZED_VOL_WINDOW, value_parser = parse_vol_window)]
    vol_window: usize,
}

#[derive(Subcommand)]
enum Commands {
    /// Run a single backtest
    Run {
        #[command(flatten)]
        data: DataArgs,

        /// Write the full report as JSON
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// Run strategy variants in parallel and rank them
    Sweep {
        #[command(flatten)]
        data: DataArgs,

        /// Comma-separated strike offsets
        #[arg(long, value_delimiter = ',')]
        strike_offsets: Vec<f64>,

        /// Comma-separated base premium ratios
        #[arg(long, value_delimiter = ',')]
        premium_ratios: Vec<f64>,

        /// Comma-separated put protection ratios
        #[arg(long, value_delimiter = ',')]
        protection_ratios: Vec<f64>,

        /// Number of results to print
        #[arg(long, default_value_t = 10)]
        top: usize,
    },

    /// Print the realized volatility column
    Volatility {
        /// Daily price CSV
        #[arg(long)]
        prices: PathBuf,

        /// Lookback in trading days (at least 2)
        #[arg(long, default_value_t = REALIZED_VOL_WINDOW, value_parser = parse_vol_window)]
        window: usize,
    },
}

/// A volatility window needs at least two daily returns.
fn parse_vol_window(raw: &str) -> Result<usize, String> {
    let window: usize = raw
        .parse()
        .map_err(|e| format!("invalid window '{}': {}", raw, e))?;
    if window < 2 {
        return Err(format!("window must be at least 2 (got {})", window));
    }
    Ok(window)
}

struct LoadedData {
    config: WheelConfig,
    prices: PriceSeries,
    benchmark: PriceSeries,
    implied_vol: Option<ImpliedVolTable>,
}

impl LoadedData {
    fn implied_vol(&self) -> &(dyn ImpliedVolSource + Sync) {
        match &self.implied_vol {
            Some(table) => table,
            None => &NoImpliedVol,
        }
    }
}

fn load_data(args: &DataArgs) -> Result<LoadedData> {
    let config = match &args.config {
        Some(path) => WheelConfig::load(path)
            .with_context(|| format!("Failed to load config {}", path.display()))?,
        None => WheelConfig::default(),
    };

    let loader = DataLoader::new(".");
    let prices = loader
        .load_prices(&args.ticker, &args.prices)
        .with_context(|| format!("Failed to load prices {}", args.prices.display()))?;
    let prices = with_realized_volatility(prices, args.vol_window);
    let benchmark = loader
        .load_prices(&args.benchmark_ticker, &args.benchmark)
        .with_context(|| format!("Failed to load benchmark {}", args.benchmark.display()))?;
    let implied_vol = args
        .iv
        .as_deref()
        .map(|path| {
            loader
                .load_implied_vol(path)
                .with_context(|| format!("Failed to load implied vol {}", path.display()))
        })
        .transpose()?;

    Ok(LoadedData {
        config,
        prices,
        benchmark,
        implied_vol,
    })
}

fn cmd_run(data: DataArgs, output: Option<PathBuf>) -> Result<()> {
    let loaded = load_data(&data)?;
    let mut engine = WheelBacktester::new(loaded.config.clone())?;
    let report = engine
        .run(&loaded.prices, &loaded.benchmark, loaded.implied_vol())
        .context("Backtest failed")?;

    println!("{}", SEPARATOR);
    println!("{}", report.summary());
    if let Some(cmp) = report.benchmark_comparison() {
        println!();
        println!("Excess Return (per day): {:.4}%", cmp.excess_return * 100.0);
        println!("Tracking Error (per day): {:.4}%", cmp.tracking_error * 100.0);
    }
    let drawdown = report.drawdown_analysis();
    if let (Some(peak), Some(trough)) = (drawdown.peak_date, drawdown.trough_date) {
        let recovery = drawdown
            .recovery_date
            .map(|d| d.to_string())
            .unwrap_or_else(|| "not recovered".into());
        println!(
            "Worst Drawdown: {:.2}% (peak {}, trough {}, recovery {})",
            drawdown.max_drawdown * 100.0,
            peak,
            trough,
            recovery
        );
    }
    if let Some(end) = report.end_date {
        let perf = report.period_to_date(end);
        let fmt = |v: Option<f64>| v.map(|p| format!("{:.2}%", p)).unwrap_or_else(|| "n/a".into());
        println!(
            "MTD: {}  QTD: {}  YTD: {}",
            fmt(perf.mtd_pct),
            fmt(perf.qtd_pct),
            fmt(perf.ytd_pct)
        );
    }
    println!("{}", SEPARATOR);

    if let Some(path) = output {
        write_output(&path, &report.to_json()?)?;
        info!(path = %path.display(), "wrote report");
    }
    Ok(())
}

fn cmd_sweep(data: DataArgs, grid: SweepGrid, top: usize) -> Result<()> {
    let loaded = load_data(&data)?;
    let configs = grid.configs(&loaded.config);

    let pb = ProgressBar::new(configs.len() as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let results = run_sweep(
        configs,
        &loaded.prices,
        &loaded.benchmark,
        loaded.implied_vol(),
        Some(&pb),
    )?;
    pb.finish_and_clear();

    println!("{}", SEPARATOR);
    println!(
        "{:>8} {:>8} {:>8} {:>14} {:>9} {:>9} {:>6}",
        "offset", "premium", "protect", "final value", "return", "max dd", "assn"
    );
    for result in results.iter().take(top) {
        println!(
            "{:>8.3} {:>8.3} {:>8.3} {:>14.2} {:>8.2}% {:>8.2}% {:>6}",
            result.config.strike_offset,
            result.config.base_premium_ratio,
            result.config.put_protection_ratio,
            result.final_value,
            result.total_return * 100.0,
            result.max_drawdown * 100.0,
            result.assignments,
        );
    }
    println!("{}", SEPARATOR);
    Ok(())
}

fn cmd_volatility(prices: PathBuf, window: usize) -> Result<()> {
    let loader = DataLoader::new(".");
    let series = loader
        .load_prices("PRICES", &prices)
        .with_context(|| format!("Failed to load prices {}", prices.display()))?;
    let series = with_realized_volatility(series, window);

    println!("date,close,realized_vol");
    for bar in series.bars() {
        println!(
            "{},{},{:.6}",
            bar.date,
            bar.close,
            bar.realized_vol.unwrap_or(f64::NAN)
        );
    }
    Ok(())
}

fn write_output(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(path, contents).with_context(|| format!("Failed to write {}", path.display()))
}

fn main() -> Result<()> {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("wheel_backtest=info".parse()?),
        )
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Run { data, output } => cmd_run(data, output)?,
        Commands::Sweep {
            data,
            strike_offsets,
            premium_ratios,
            protection_ratios,
            top,
        } => {
            let grid = SweepGrid {
                strike_offsets,
                premium_ratios,
                protection_ratios,
            };
            cmd_sweep(data, grid, top)?;
        }
        Commands::Volatility { prices, window } => cmd_volatility(prices, window)?,
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vol_window_rejects_short_windows() {
        assert!(parse_vol_window("0").is_err());
        assert!(parse_vol_window("1").is_err());
        assert!(parse_vol_window("x").is_err());
        assert_eq!(parse_vol_window("2"), Ok(2));
        assert_eq!(parse_vol_window("30"), Ok(30));
    }

    #[test]
    fn test_cli_rejects_short_vol_window() {
        let parsed = Cli::try_parse_from([
            "wheel-backtest",
            "volatility",
            "--prices",
            "tqqq.csv",
            "--window",
            "1",
        ]);
        assert!(parsed.is_err());

        let parsed = Cli::try_parse_from([
            "wheel-backtest",
            "run",
            "--prices",
            "tqqq.csv",
            "--benchmark",
            "spy.csv",
        ]);
        match parsed.map(|cli| cli.command) {
            Ok(Commands::Run { data, .. }) => assert_eq!(data.vol_window, REALIZED_VOL_WINDOW),
            _ => panic!("expected run command"),
        }
    }
}
