//! Synthetic weekly option parameters.
//!
//! A deliberately crude premium heuristic instead of a full pricing model:
//!
//! - `strike = price * (1 + sign * strike_offset)`
//! - `weekly_rate = annual_vol / sqrt(52) * base_premium_ratio`
//! - `premium = price * weekly_rate`

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Weeks per year used to de-annualize volatility.
pub const WEEKS_PER_YEAR: f64 = 52.0;

/// Which side of spot the sold option sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OptionDirection {
    /// Cash-secured put, strike below spot.
    Put,
    /// Covered call, strike above spot.
    Call,
}

impl OptionDirection {
    pub fn sign(&self) -> f64 {
        match self {
            Self::Put => -1.0,
            Self::Call => 1.0,
        }
    }
}

/// Strike and premium of one synthetic weekly option.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OptionQuoteEstimate {
    pub direction: OptionDirection,
    pub strike: Decimal,
    pub premium: Decimal,
    pub weekly_rate: f64,
}

/// Weekly premium yield for an annualized volatility.
pub fn weekly_premium_rate(annual_vol: f64, base_premium_ratio: f64) -> f64 {
    annual_vol / WEEKS_PER_YEAR.sqrt() * base_premium_ratio
}

/// Estimate strike and premium for selling a weekly option.
///
/// `annual_vol` must already be resolved (implied or realized) and
/// non-negative. Zero volatility yields a zero premium.
pub fn estimate_weekly_option(
    price: Decimal,
    annual_vol: f64,
    direction: OptionDirection,
    strike_offset: f64,
    base_premium_ratio: f64,
) -> OptionQuoteEstimate {
    let strike_factor = to_decimal(1.0 + direction.sign() * strike_offset);
    let weekly_rate = weekly_premium_rate(annual_vol, base_premium_ratio);

    OptionQuoteEstimate {
        direction,
        strike: price * strike_factor,
        premium: price * to_decimal(weekly_rate),
        weekly_rate,
    }
}

fn to_decimal(value: f64) -> Decimal {
    if value.is_finite() {
        Decimal::try_from(value).unwrap_or(Decimal::ZERO)
    } else {
        Decimal::ZERO
    }
}
