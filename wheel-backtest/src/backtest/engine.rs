//! Weekly wheel backtesting engine.
//!
//! Runs the simulation loop over a Friday checkpoint grid:
//! 1. Skip checkpoints that are not trading days
//! 2. Resolve volatility (implied, falling back to realized)
//! 3. Compute the share target and the phase
//! 4. Sell a put (accumulating) or a call (distributing)
//! 5. Check assignment against the following week's low/high
//! 6. Refresh the equivalent cost and record the week
//!
//! All data is resident before the loop starts. Nothing inside the loop can
//! fail; missing data is absorbed locally.

use chrono::{Duration, NaiveDate};
use rust_decimal::Decimal;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::data::{ImpliedVolSource, PriceBar, PriceSeries};

use super::calendar::weekly_checkpoints;
use super::config::WheelConfig;
use super::option_params::{estimate_weekly_option, OptionQuoteEstimate};
use super::report::BacktestReport;
use super::state::{target_shares, Phase, PortfolioState, WeeklyRecord};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum BacktestError {
    #[error("Data unavailable: no rows for {series}")]
    DataUnavailable { series: String },

    #[error("Invalid configuration: {0}")]
    Config(String),
}

/// Pick the volatility used for premium estimation.
///
/// Implied volatility wins when present; otherwise the realized value for
/// the same date. Undefined values never get through.
pub fn resolve_volatility(implied: Option<f64>, realized: Option<f64>) -> Option<f64> {
    let usable = |v: &f64| v.is_finite() && *v >= 0.0;
    implied.filter(usable).or_else(|| realized.filter(usable))
}

/// Result of the option sale and assignment for one checkpoint.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WeekOutcome {
    pub quote: OptionQuoteEstimate,
    pub protection_cost: Decimal,
    /// Shares bought (positive) or sold (negative) on assignment.
    pub assigned_shares: Decimal,
    pub assigned: bool,
}

/// The weekly options-overwriting backtester.
pub struct WheelBacktester {
    config: WheelConfig,
    state: PortfolioState,
    history: Vec<WeeklyRecord>,
}

impl WheelBacktester {
    /// Create a backtester after validating the configuration.
    pub fn new(config: WheelConfig) -> Result<Self, BacktestError> {
        config.validate()?;
        let state = PortfolioState::new(config.initial_capital);
        Ok(Self {
            config,
            state,
            history: Vec::new(),
        })
    }

    pub fn config(&self) -> &WheelConfig {
        &self.config
    }

    pub fn state(&self) -> &PortfolioState {
        &self.state
    }

    pub fn history(&self) -> &[WeeklyRecord] {
        &self.history
    }

    /// Reset to initial capital and a flat book.
    pub fn reset(&mut self) {
        self.state = PortfolioState::new(self.config.initial_capital);
        self.history.clear();
    }

    /// Run a full backtest over the pre-fetched series.
    ///
    /// Fails only when the traded or benchmark series is empty.
    pub fn run<S>(
        &mut self,
        prices: &PriceSeries,
        benchmark: &PriceSeries,
        implied_vol: &S,
    ) -> Result<BacktestReport, BacktestError>
    where
        S: ImpliedVolSource + ?Sized,
    {
        let (Some(start), Some(end)) = (prices.first_date(), prices.last_date()) else {
            return Err(BacktestError::DataUnavailable {
                series: prices.ticker().to_string(),
            });
        };
        if benchmark.is_empty() {
            return Err(BacktestError::DataUnavailable {
                series: benchmark.ticker().to_string(),
            });
        }

        self.reset();
        let checkpoints = weekly_checkpoints(start, end);
        info!(
            ticker = prices.ticker(),
            %start,
            %end,
            checkpoints = checkpoints.len(),
            "starting wheel backtest"
        );

        for (idx, date) in checkpoints.iter().enumerate() {
            self.step(idx, *date, prices, implied_vol);
        }

        let report = BacktestReport::assemble(
            &self.config,
            &self.state,
            self.history.clone(),
            checkpoints.len(),
            prices,
            benchmark,
        );
        info!(
            processed = report.history.len(),
            skipped = report.checkpoints_skipped(),
            final_value = %report.final_value,
            max_drawdown = report.max_drawdown,
            "wheel backtest complete"
        );
        Ok(report)
    }

    /// Process one grid checkpoint.
    ///
    /// Returns `None` without touching state when `date` is not a trading day.
    pub fn step<S>(
        &mut self,
        checkpoint_index: usize,
        date: NaiveDate,
        prices: &PriceSeries,
        implied_vol: &S,
    ) -> Option<&WeeklyRecord>
    where
        S: ImpliedVolSource + ?Sized,
    {
        let Some(bar) = prices.get(date) else {
            debug!(%date, checkpoint_index, "no trading day at checkpoint, skipping");
            return None;
        };
        let price = bar.close;
        let available_cash = self.state.available_cash(self.config.risk_reserve);

        let volatility = resolve_volatility(implied_vol.implied_vol(date), bar.realized_vol)
            .unwrap_or_else(|| {
                warn!(%date, "no implied or realized volatility, pricing with zero vol");
                0.0
            });

        let target = target_shares(&self.config, checkpoint_index, price);
        let phase = Phase::determine(self.state.shares, target);
        let next_bar = prices.get(date + Duration::days(7));

        let outcome =
            self.sell_weekly_option(phase, price, volatility, target, available_cash, next_bar);
        self.state.refresh_equivalent_cost();

        debug!(
            %date,
            checkpoint_index,
            ?phase,
            premium = %outcome.quote.premium,
            strike = %outcome.quote.strike,
            assigned = outcome.assigned,
            shares = %self.state.shares,
            cash = %self.state.cash,
            "processed checkpoint"
        );

        self.history.push(WeeklyRecord {
            date,
            checkpoint_index,
            phase,
            price,
            volatility,
            strike: outcome.quote.strike,
            premium: outcome.quote.premium,
            assigned_shares: outcome.assigned_shares,
            equivalent_cost: self.state.equivalent_cost,
            put_protection_cost: outcome.protection_cost,
            cash: self.state.cash,
            shares: self.state.shares,
            net_value: self.state.net_value(price),
        });
        self.history.last()
    }

    /// Sell this week's option for `phase` and settle any assignment.
    ///
    /// `available_cash` is measured before the premium is credited.
    fn sell_weekly_option(
        &mut self,
        phase: Phase,
        price: Decimal,
        volatility: f64,
        target: Decimal,
        available_cash: Decimal,
        next_bar: Option<&PriceBar>,
    ) -> WeekOutcome {
        let quote = estimate_weekly_option(
            price,
            volatility,
            phase.direction(),
            self.config.strike_offset,
            self.config.base_premium_ratio,
        );
        let strike = quote.strike;
        let premium = quote.premium;
        self.state.cash += premium;

        let mut outcome = WeekOutcome {
            quote,
            protection_cost: Decimal::ZERO,
            assigned_shares: Decimal::ZERO,
            assigned: false,
        };

        // Cash-per-strike sizing; a non-positive or unrepresentably small
        // strike cannot be assigned.
        let affordable = if strike > Decimal::ZERO {
            available_cash
                .checked_div(strike)
                .map(|shares| shares.floor())
                .unwrap_or(Decimal::ZERO)
        } else {
            Decimal::ZERO
        };

        match phase {
            Phase::Accumulating => {
                let protection = premium * ratio(self.config.put_protection_ratio);
                self.state.put_protection_cost += protection;
                self.state.cash -= protection;
                outcome.protection_cost = protection;

                if strike > Decimal::ZERO && next_bar.is_some_and(|b| b.low < strike) {
                    let bought = affordable;
                    self.state.shares += bought;
                    self.state.cash -= bought * strike;
                    self.state.total_cost += bought * strike - premium;
                    outcome.assigned_shares = bought;
                    outcome.assigned = true;
                }
            }
            Phase::Distributing => {
                if strike > Decimal::ZERO && next_bar.is_some_and(|b| b.high > strike) {
                    // Capped by the same cash/strike formula as purchases.
                    let sold = (self.state.shares - target).min(affordable).max(Decimal::ZERO);
                    self.state.shares -= sold;
                    self.state.cash += sold * strike;
                    self.state.total_cost -= sold * strike - premium;
                    outcome.assigned_shares = -sold;
                    outcome.assigned = true;
                }
            }
        }

        outcome
    }
}

fn ratio(value: f64) -> Decimal {
    Decimal::try_from(value).unwrap_or(Decimal::ZERO)
}
