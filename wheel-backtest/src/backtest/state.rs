//! Portfolio state threaded through the weekly loop.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::config::WheelConfig;
use super::option_params::OptionDirection;

/// Which half of the wheel a checkpoint runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    /// Below the share target: sell cash-secured puts.
    Accumulating,
    /// At or above the share target: sell covered calls.
    Distributing,
}

impl Phase {
    pub fn determine(shares: Decimal, target_shares: Decimal) -> Self {
        if shares < target_shares {
            Self::Accumulating
        } else {
            Self::Distributing
        }
    }

    pub fn direction(&self) -> OptionDirection {
        match self {
            Self::Accumulating => OptionDirection::Put,
            Self::Distributing => OptionDirection::Call,
        }
    }
}

/// Share target for a checkpoint.
///
/// Grows by `monthly_target` dollars every `weeks_per_month` checkpoints,
/// stops growing after `max_ramp_months`, and is always capped by
/// `target_delta` dollars. A quotient too large to represent saturates
/// at `Decimal::MAX`.
pub fn target_shares(config: &WheelConfig, checkpoint_index: usize, price: Decimal) -> Decimal {
    if price <= Decimal::ZERO {
        return Decimal::ZERO;
    }
    let elapsed_months = (checkpoint_index / config.weeks_per_month.max(1) as usize)
        .min(config.max_ramp_months as usize);
    let ramp = Decimal::from(elapsed_months as u64 + 1)
        .checked_mul(config.monthly_target)
        .and_then(|dollars| dollars.checked_div(price))
        .unwrap_or(Decimal::MAX);
    let ceiling = config.target_delta.checked_div(price).unwrap_or(Decimal::MAX);
    ramp.min(ceiling)
}

/// Mutable account state of one run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PortfolioState {
    pub cash: Decimal,
    pub shares: Decimal,
    /// Net cash laid out for held shares after premium credits.
    pub total_cost: Decimal,
    /// `total_cost / shares`, frozen at its last value while flat.
    pub equivalent_cost: Decimal,
    pub put_protection_cost: Decimal,
}

impl PortfolioState {
    pub fn new(initial_capital: Decimal) -> Self {
        Self {
            cash: initial_capital,
            shares: Decimal::ZERO,
            total_cost: Decimal::ZERO,
            equivalent_cost: Decimal::ZERO,
            put_protection_cost: Decimal::ZERO,
        }
    }

    /// Cash usable for assignment, never negative.
    pub fn available_cash(&self, risk_reserve: Decimal) -> Decimal {
        (self.cash - risk_reserve).max(Decimal::ZERO)
    }

    /// Recompute the per-share cost; a flat book keeps the previous value.
    pub fn refresh_equivalent_cost(&mut self) {
        if self.shares > Decimal::ZERO {
            self.equivalent_cost = self.total_cost / self.shares;
        }
    }

    /// Mark-to-market value. Protective puts carry no value.
    pub fn net_value(&self, price: Decimal) -> Decimal {
        self.shares
            .checked_mul(price)
            .and_then(|held| held.checked_add(self.cash))
            .unwrap_or(Decimal::MAX)
    }
}

/// Snapshot of one processed checkpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeeklyRecord {
    pub date: NaiveDate,
    pub checkpoint_index: usize,
    pub phase: Phase,
    pub price: Decimal,
    pub volatility: f64,
    pub strike: Decimal,
    pub premium: Decimal,
    pub assigned_shares: Decimal,
    pub equivalent_cost: Decimal,
    pub put_protection_cost: Decimal,
    pub cash: Decimal,
    pub shares: Decimal,
    pub net_value: Decimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_phase_boundary() {
        assert_eq!(Phase::determine(dec!(10), dec!(10.5)), Phase::Accumulating);
        assert_eq!(Phase::determine(dec!(10.5), dec!(10.5)), Phase::Distributing);
        assert_eq!(Phase::Accumulating.direction(), OptionDirection::Put);
        assert_eq!(Phase::Distributing.direction(), OptionDirection::Call);
    }

    #[test]
    fn test_target_ramp_first_month() {
        let config = WheelConfig::default();
        for idx in 0..4 {
            assert_eq!(target_shares(&config, idx, dec!(100)), dec!(83.25));
        }
        assert_eq!(target_shares(&config, 4, dec!(100)), dec!(166.5));
    }

    #[test]
    fn test_target_ramp_caps_at_delta_ceiling() {
        let config = WheelConfig::default();
        // 5 * 8325 = 41625 > 33000, so the ceiling binds
        assert_eq!(target_shares(&config, 16, dec!(100)), dec!(330));
        assert_eq!(target_shares(&config, 400, dec!(100)), dec!(330));
        // month 3: 4 * 8325 = 33300 > 33000
        assert_eq!(target_shares(&config, 12, dec!(100)), dec!(330));
        // month 2: 3 * 8325 = 24975
        assert_eq!(target_shares(&config, 8, dec!(100)), dec!(249.75));
    }

    #[test]
    fn test_target_zero_price() {
        let config = WheelConfig::default();
        assert_eq!(target_shares(&config, 0, Decimal::ZERO), Decimal::ZERO);
    }

    #[test]
    fn test_target_saturates_on_tiny_price() {
        let config = WheelConfig::default();
        let tiny = dec!(0.0000000000000000000000001);
        assert_eq!(target_shares(&config, 0, tiny), Decimal::MAX);
        assert_eq!(target_shares(&config, 16, tiny), Decimal::MAX);
    }

    #[test]
    fn test_available_cash_floor() {
        let mut state = PortfolioState::new(dec!(50_000));
        assert_eq!(state.available_cash(dec!(10_000)), dec!(40_000));
        state.cash = dec!(5_000);
        assert_eq!(state.available_cash(dec!(10_000)), Decimal::ZERO);
    }

    #[test]
    fn test_equivalent_cost_frozen_while_flat() {
        let mut state = PortfolioState::new(dec!(50_000));
        state.shares = dec!(100);
        state.total_cost = dec!(9_000);
        state.refresh_equivalent_cost();
        assert_eq!(state.equivalent_cost, dec!(90));

        state.shares = Decimal::ZERO;
        state.total_cost = dec!(-250);
        state.refresh_equivalent_cost();
        assert_eq!(state.equivalent_cost, dec!(90));
    }
}
