//! Field-by-field override of stored pick terms at grading time.
//!
//! A grading request may correct the line, price or stake that were stored
//! when the pick was posted. Each field resolves as "override if present,
//! else stored value". For the nullable fields an explicit `null` is an
//! override too: it clears the stored value.

use serde::{Deserialize, Serialize};

use super::PickTerms;
use crate::types::Pick;

/// Overrides supplied alongside a score.
///
/// Outer `Option` = field supplied; inner `Option` = value or explicit null.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GradeOverrides {
    #[serde(
        default,
        deserialize_with = "crate::types::supplied",
        skip_serializing_if = "Option::is_none"
    )]
    pub listed_spread_or_total: Option<Option<f64>>,

    /// A null price is treated as not supplied.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pick_price: Option<f64>,

    #[serde(
        default,
        deserialize_with = "crate::types::supplied",
        skip_serializing_if = "Option::is_none"
    )]
    pub stake: Option<Option<f64>>,
}

impl GradeOverrides {
    pub fn is_empty(&self) -> bool {
        self.listed_spread_or_total.is_none() && self.pick_price.is_none() && self.stake.is_none()
    }
}

/// Merge stored pick data with request overrides into gradeable terms.
pub fn resolve_terms(pick: &Pick, overrides: &GradeOverrides) -> PickTerms {
    let listed_spread_or_total = match overrides.listed_spread_or_total {
        Some(value) => value,
        None => pick.listed_spread_or_total,
    };

    let pick_price = overrides
        .pick_price
        .unwrap_or_else(|| f64::from(pick.pick_price));

    let stake = match overrides.stake {
        Some(value) => value,
        None => Some(pick.stake.unwrap_or(super::DEFAULT_STAKE)),
    };

    PickTerms {
        pick_type: pick.pick_type,
        pick_side: pick.pick_side.clone(),
        listed_spread_or_total,
        pick_price: Some(pick_price),
        stake,
        home_team: pick.home_team.clone(),
        away_team: pick.away_team.clone(),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
