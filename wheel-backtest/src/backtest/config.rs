//! Strategy parameters for the weekly wheel.

use std::path::Path;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::engine::BacktestError;

/// Largest dollar amount accepted for any money parameter.
pub const MAX_MONEY: i64 = 1_000_000_000_000;

/// Configuration for a wheel backtest run.
///
/// Every field has a default, so a TOML file only needs to name the
/// parameters it overrides.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WheelConfig {
    /// Starting cash.
    pub initial_capital: Decimal,

    /// Cash that assignment sizing never touches.
    pub risk_reserve: Decimal,

    /// Dollar ceiling on the share target.
    pub target_delta: Decimal,

    /// Dollar amount the share target grows by each ramp month.
    pub monthly_target: Decimal,

    /// Strike distance from spot as a fraction (0.05 = 5%).
    pub strike_offset: f64,

    /// Scale from weekly volatility to weekly premium yield.
    pub base_premium_ratio: f64,

    /// Fraction of each put premium spent on protective puts.
    pub put_protection_ratio: f64,

    /// Checkpoints per ramp month.
    pub weeks_per_month: u32,

    /// Ramp months after which the monthly target stops growing.
    pub max_ramp_months: u32,
}

impl Default for WheelConfig {
    fn default() -> Self {
        Self {
            initial_capital: Decimal::from(50_000),
            risk_reserve: Decimal::from(10_000),
            target_delta: Decimal::from(33_000),
            monthly_target: Decimal::from(8_325),
            strike_offset: 0.05,
            base_premium_ratio: 0.3,
            put_protection_ratio: 0.4,
            weeks_per_month: 4,
            max_ramp_months: 4,
        }
    }
}

impl WheelConfig {
    /// Parse a (possibly partial) TOML document.
    pub fn from_toml_str(raw: &str) -> Result<Self, BacktestError> {
        let config: Self =
            toml::from_str(raw).map_err(|e| BacktestError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn load(path: &Path) -> Result<Self, BacktestError> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| BacktestError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&raw)
    }

    /// Serialize to TOML.
    pub fn to_toml_string(&self) -> Result<String, BacktestError> {
        toml::to_string(self).map_err(|e| BacktestError::Config(e.to_string()))
    }

    /// Reject values the weekly loop cannot work with.
    pub fn validate(&self) -> Result<(), BacktestError> {
        let money = [
            ("initial_capital", self.initial_capital),
            ("risk_reserve", self.risk_reserve),
            ("target_delta", self.target_delta),
            ("monthly_target", self.monthly_target),
        ];
        for (name, value) in money {
            if value < Decimal::ZERO {
                return Err(BacktestError::Config(format!(
                    "{} must not be negative (got {})",
                    name, value
                )));
            }
            if value > Decimal::from(MAX_MONEY) {
                return Err(BacktestError::Config(format!(
                    "{} must not exceed {} (got {})",
                    name, MAX_MONEY, value
                )));
            }
        }

        let ratios = [
            ("strike_offset", self.strike_offset),
            ("base_premium_ratio", self.base_premium_ratio),
            ("put_protection_ratio", self.put_protection_ratio),
        ];
        for (name, value) in ratios {
            if !value.is_finite() || value < 0.0 {
                return Err(BacktestError::Config(format!(
                    "{} must be a finite, non-negative ratio (got {})",
                    name, value
                )));
            }
        }
        if self.strike_offset >= 1.0 {
            return Err(BacktestError::Config(format!(
                "strike_offset must be below 1.0 (got {})",
                self.strike_offset
            )));
        }

        if self.weeks_per_month == 0 {
            return Err(BacktestError::Config(
                "weeks_per_month must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}
