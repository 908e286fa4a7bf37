//! Payout arithmetic for American odds.
//!
//! Positive odds state the profit earned on a 100 unit stake; negative odds
//! state the stake required to profit 100 units.

use super::GradeError;

/// Odds used when a pick carries no price (standard -110 vig).
pub const DEFAULT_ODDS: f64 = -110.0;

/// Stake used when a pick carries no stake.
pub const DEFAULT_STAKE: f64 = 1.0;

/// Profit of a winning pick, unrounded.
///
/// Odds of exactly zero are treated as even money.
pub fn calculate_profit(odds: f64, stake: f64) -> Result<f64, GradeError> {
    if !odds.is_finite() {
        return Err(GradeError::InvalidOdds(odds));
    }
    if !stake.is_finite() || stake < 0.0 {
        return Err(GradeError::InvalidStake(stake));
    }

    if stake == 0.0 {
        return Ok(0.0);
    }

    let profit = if odds > 0.0 {
        stake * odds / 100.0
    } else if odds < 0.0 {
        stake * 100.0 / odds.abs()
    } else {
        stake
    };

    Ok(profit)
}

/// Round to two decimals, half away from zero, on the scaled value.
///
/// Negative zero is normalised so a zero-stake loss reports `0`.
pub fn round_cents(value: f64) -> f64 {
    let rounded = (value * 100.0).round() / 100.0;
    if rounded == 0.0 {
        0.0
    } else {
        rounded
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
