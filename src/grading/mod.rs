//! Grading engine: decides the outcome of a pick from a final score.
//!
//! Pure and deterministic. The same terms and score always produce the same
//! outcome, so the engine is shared by the manual grading endpoint, the
//! webhook batch path and the tests without any setup.

pub mod overrides;
pub mod profit;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::types::{PickResult, PickType};
pub use profit::{calculate_profit, round_cents, DEFAULT_ODDS, DEFAULT_STAKE};

/// Tolerance for spread push detection. Absorbs floating-point error from
/// subtracting decimal lines; not a business rule.
pub const PUSH_EPSILON: f64 = 1e-9;

// ---------------------------------------------------------------------------
// Errors
// ---------------------------------------------------------------------------

/// Why a pick could not be graded. All variants are caller errors.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum GradeError {
    #[error("Invalid pick terms: {0}")]
    InvalidTerms(String),

    #[error("Unsupported pick type: {0}")]
    UnsupportedType(String),

    #[error("Odds must be a finite number, got {0}")]
    InvalidOdds(f64),

    #[error("Stake must be a non-negative finite number, got {0}")]
    InvalidStake(f64),
}

impl GradeError {
    /// Machine-checkable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            GradeError::InvalidTerms(_) => "INVALID_TERMS",
            GradeError::UnsupportedType(_) => "UNSUPPORTED_TYPE",
            GradeError::InvalidOdds(_) => "INVALID_ODDS",
            GradeError::InvalidStake(_) => "INVALID_STAKE",
        }
    }
}

// ---------------------------------------------------------------------------
// Inputs / outputs
// ---------------------------------------------------------------------------

/// Fully resolved terms of a single pick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PickTerms {
    pub pick_type: PickType,
    /// Team name, or a string containing "over"/"under" for totals
    pub pick_side: String,
    /// Required for spread and total picks
    pub listed_spread_or_total: Option<f64>,
    /// American odds; `None` means -110
    pub pick_price: Option<f64>,
    /// Units risked; `None` means 1
    pub stake: Option<f64>,
    pub home_team: String,
    pub away_team: String,
}

/// Final score of the event a pick was made on.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub home_score: f64,
    pub away_score: f64,
}

/// Result of grading. `profit` is rounded to two decimals and its sign
/// matches the result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GradeOutcome {
    pub result: PickResult,
    pub profit: f64,
}

impl GradeOutcome {
    fn push() -> Self {
        Self {
            result: PickResult::Push,
            profit: 0.0,
        }
    }
}

// ---------------------------------------------------------------------------
// Grading
// ---------------------------------------------------------------------------

/// Grade a pick against a final score.
pub fn grade(terms: &PickTerms, score: &ScoreSubmission) -> Result<GradeOutcome, GradeError> {
    if !score.home_score.is_finite() || !score.away_score.is_finite() {
        return Err(GradeError::InvalidTerms("scores must be finite numbers".into()));
    }

    let stake = terms.stake.unwrap_or(DEFAULT_STAKE);
    if !stake.is_finite() || stake < 0.0 {
        return Err(GradeError::InvalidStake(stake));
    }
    let odds = terms.pick_price.unwrap_or(DEFAULT_ODDS);

    let outcome = match terms.pick_type {
        PickType::Moneyline => grade_moneyline(terms, score, odds, stake)?,
        PickType::Spread => grade_spread(terms, score, odds, stake)?,
        PickType::Total => grade_total(terms, score, odds, stake)?,
    };

    let outcome = GradeOutcome {
        result: outcome.result,
        profit: round_cents(outcome.profit),
    };

    debug!(
        pick_type = %terms.pick_type,
        side = %terms.pick_side,
        result = %outcome.result,
        profit = outcome.profit,
        "Pick graded"
    );

    Ok(outcome)
}

/// Turn a win/loss decision into an unrounded outcome.
fn settle(won: bool, odds: f64, stake: f64) -> Result<GradeOutcome, GradeError> {
    if won {
        Ok(GradeOutcome {
            result: PickResult::Win,
            profit: calculate_profit(odds, stake)?,
        })
    } else {
        Ok(GradeOutcome {
            result: PickResult::Loss,
            profit: -stake,
        })
    }
}

fn same_name(a: &str, b: &str) -> bool {
    a.to_lowercase() == b.to_lowercase()
}

fn grade_moneyline(
    terms: &PickTerms,
    score: &ScoreSubmission,
    odds: f64,
    stake: f64,
) -> Result<GradeOutcome, GradeError> {
    let winner = if score.home_score > score.away_score {
        &terms.home_team
    } else if score.away_score > score.home_score {
        &terms.away_team
    } else {
        // Ties push; no overtime distinction at this layer.
        return Ok(GradeOutcome::push());
    };

    settle(same_name(winner, &terms.pick_side), odds, stake)
}

fn grade_spread(
    terms: &PickTerms,
    score: &ScoreSubmission,
    odds: f64,
    stake: f64,
) -> Result<GradeOutcome, GradeError> {
    let spread = terms.listed_spread_or_total.ok_or_else(|| {
        GradeError::InvalidTerms("spread picks require the listed spread value".into())
    })?;

    let backing_home = same_name(&terms.pick_side, &terms.home_team);
    let backing_away = same_name(&terms.pick_side, &terms.away_team);
    if !backing_home && !backing_away {
        return Err(GradeError::InvalidTerms(format!(
            "spread pick side '{}' must match '{}' or '{}'",
            terms.pick_side, terms.home_team, terms.away_team
        )));
    }

    let adjusted_margin = if backing_home {
        score.home_score + spread - score.away_score
    } else {
        score.away_score + spread - score.home_score
    };

    if adjusted_margin.abs() < PUSH_EPSILON {
        return Ok(GradeOutcome::push());
    }

    settle(adjusted_margin > 0.0, odds, stake)
}

fn grade_total(
    terms: &PickTerms,
    score: &ScoreSubmission,
    odds: f64,
    stake: f64,
) -> Result<GradeOutcome, GradeError> {
    let line = terms.listed_spread_or_total.ok_or_else(|| {
        GradeError::InvalidTerms("total picks require the listed total value".into())
    })?;

    let total = score.home_score + score.away_score;
    if total == line {
        return Ok(GradeOutcome::push());
    }

    let side = terms.pick_side.to_lowercase();
    let wants_over = side.contains("over");
    let wants_under = side.contains("under");
    if !wants_over && !wants_under {
        return Err(GradeError::InvalidTerms(format!(
            "total pick side '{}' must specify Over or Under",
            terms.pick_side
        )));
    }

    let won = if wants_over { total > line } else { total < line };
    settle(won, odds, stake)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
