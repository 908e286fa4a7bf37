//! Leaderboard queries: fetch graded picks, normalise them, aggregate.
//!
//! This module only decides which stored picks qualify and how missing
//! values are filled in. The math lives in `crate::leaderboard`.

use tracing::info;

use super::Result;
use crate::leaderboard::{
    compute_leaderboard, rank_by_profit, LeaderboardOptions, LeaderboardPick, LeaderboardSummary,
};
use crate::storage::{PickFilter, PickRepository};
use crate::types::Pick;

/// Flatten a stored pick for aggregation. `None` for pending picks.
///
/// Missing profit counts as 0; a missing or zero stake counts as 1 unit.
pub fn to_leaderboard_pick(pick: &Pick) -> Option<LeaderboardPick> {
    if !pick.is_graded() {
        return None;
    }
    let stake = match pick.stake {
        Some(s) if s.is_finite() && s != 0.0 => s,
        _ => 1.0,
    };
    Some(LeaderboardPick {
        capper_id: pick.capper_id.to_string(),
        result: pick.result,
        profit: pick.profit.unwrap_or(0.0),
        stake,
        odds: f64::from(pick.pick_price),
        posted_at: pick.posted_at,
    })
}

/// Leaderboard over all graded picks, best profit first.
pub async fn leaderboard_for(
    repo: &dyn PickRepository,
    options: &LeaderboardOptions,
) -> Result<Vec<LeaderboardSummary>> {
    let picks = repo.list_picks(&PickFilter::default()).await?;
    let graded: Vec<LeaderboardPick> = picks.iter().filter_map(to_leaderboard_pick).collect();

    let mut rows = compute_leaderboard(&graded, options);
    rank_by_profit(&mut rows);

    info!(
        window = %options.window,
        graded = graded.len(),
        cappers = rows.len(),
        "Leaderboard computed"
    );

    Ok(rows)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
