//! Leaderboard aggregation over graded picks.
//!
//! Filters a flat list of graded picks down to a time window and folds them
//! into one summary per capper. Pure: the clock is injected through
//! [`LeaderboardOptions::now`] so results are reproducible in tests.

use chrono::{DateTime, Datelike, Duration, FixedOffset, NaiveDate, NaiveTime, Offset, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use tracing::debug;

use crate::grading::round_cents;
use crate::types::PickResult;

// ---------------------------------------------------------------------------
// Window
// ---------------------------------------------------------------------------

/// Time range a leaderboard is computed over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum LeaderboardWindow {
    #[serde(rename = "yesterday")]
    Yesterday,
    #[default]
    #[serde(rename = "7d")]
    Last7Days,
    #[serde(rename = "30d")]
    Last30Days,
    #[serde(rename = "365d")]
    Last365Days,
    #[serde(rename = "ytd")]
    YearToDate,
    #[serde(rename = "all")]
    AllTime,
}

impl LeaderboardWindow {
    pub const ALL: &'static [LeaderboardWindow] = &[
        LeaderboardWindow::Yesterday,
        LeaderboardWindow::Last7Days,
        LeaderboardWindow::Last30Days,
        LeaderboardWindow::Last365Days,
        LeaderboardWindow::YearToDate,
        LeaderboardWindow::AllTime,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LeaderboardWindow::Yesterday => "yesterday",
            LeaderboardWindow::Last7Days => "7d",
            LeaderboardWindow::Last30Days => "30d",
            LeaderboardWindow::Last365Days => "365d",
            LeaderboardWindow::YearToDate => "ytd",
            LeaderboardWindow::AllTime => "all",
        }
    }
}

impl fmt::Display for LeaderboardWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Unknown selectors are rejected rather than treated as all-time.
impl std::str::FromStr for LeaderboardWindow {
    type Err = LeaderboardError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        LeaderboardWindow::ALL
            .iter()
            .copied()
            .find(|w| w.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| LeaderboardError::UnknownWindow(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LeaderboardError {
    #[error(
        "Unknown leaderboard window '{0}' (expected one of yesterday, 7d, 30d, 365d, ytd, all)"
    )]
    UnknownWindow(String),
}

/// Inclusive bounds; `None` means unbounded on that side.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WindowBounds {
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
}

impl WindowBounds {
    /// Boundary timestamps are included on both ends.
    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        if let Some(from) = self.from {
            if at < from {
                return false;
            }
        }
        if let Some(to) = self.to {
            if at > to {
                return false;
            }
        }
        true
    }
}

/// Resolve a window into concrete bounds relative to `now`.
///
/// `day_offset` fixes the local day used by `yesterday`.
pub fn window_bounds(
    window: LeaderboardWindow,
    now: DateTime<Utc>,
    day_offset: FixedOffset,
) -> WindowBounds {
    match window {
        LeaderboardWindow::Yesterday => {
            let end = start_of_local_day(now, day_offset);
            WindowBounds {
                from: Some(end - Duration::days(1)),
                to: Some(end),
            }
        }
        LeaderboardWindow::Last7Days => trailing_days(now, 7),
        LeaderboardWindow::Last30Days => trailing_days(now, 30),
        LeaderboardWindow::Last365Days => trailing_days(now, 365),
        LeaderboardWindow::YearToDate => WindowBounds {
            from: NaiveDate::from_ymd_opt(now.year(), 1, 1)
                .map(|jan1| jan1.and_time(NaiveTime::MIN).and_utc()),
            to: Some(now),
        },
        LeaderboardWindow::AllTime => WindowBounds { from: None, to: None },
    }
}

fn trailing_days(now: DateTime<Utc>, days: i64) -> WindowBounds {
    WindowBounds {
        from: Some(now - Duration::days(days)),
        to: Some(now),
    }
}

fn start_of_local_day(now: DateTime<Utc>, offset: FixedOffset) -> DateTime<Utc> {
    let local_midnight = now.with_timezone(&offset).date_naive().and_time(NaiveTime::MIN);
    let utc_naive = local_midnight - Duration::seconds(i64::from(offset.local_minus_utc()));
    utc_naive.and_utc()
}

// ---------------------------------------------------------------------------
// Inputs / outputs
// ---------------------------------------------------------------------------

/// Flattened view of a graded pick; all aggregation needs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardPick {
    pub capper_id: String,
    pub result: PickResult,
    pub profit: f64,
    pub stake: f64,
    pub odds: f64,
    pub posted_at: DateTime<Utc>,
}

/// Per-capper statistics for a window.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LeaderboardSummary {
    pub capper_id: String,
    /// Rounded to two decimals
    pub profit: f64,
    /// profit / total stake, unrounded
    pub roi: f64,
    pub wins: u32,
    pub losses: u32,
    pub pushes: u32,
    pub average_odds: Option<f64>,
    pub average_stake: Option<f64>,
    pub picks: u32,
}

impl fmt::Display for LeaderboardSummary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} | {:+.2}u | ROI {:.1}% | {}-{}-{} ({} picks)",
            self.capper_id,
            self.profit,
            self.roi * 100.0,
            self.wins,
            self.losses,
            self.pushes,
            self.picks,
        )
    }
}

#[derive(Debug, Clone)]
pub struct LeaderboardOptions {
    pub window: LeaderboardWindow,
    /// Defaults to the current instant
    pub now: Option<DateTime<Utc>>,
    pub day_offset: FixedOffset,
}

impl LeaderboardOptions {
    pub fn new(window: LeaderboardWindow) -> Self {
        Self {
            window,
            now: None,
            day_offset: utc_offset(),
        }
    }

    pub fn at(mut self, now: DateTime<Utc>) -> Self {
        self.now = Some(now);
        self
    }

    pub fn with_day_offset(mut self, offset: FixedOffset) -> Self {
        self.day_offset = offset;
        self
    }
}

fn utc_offset() -> FixedOffset {
    Utc.fix()
}

// ---------------------------------------------------------------------------
// Aggregation
// ---------------------------------------------------------------------------

#[derive(Debug, Default)]
struct Tally {
    picks: u32,
    profit_sum: f64,
    stake_sum: f64,
    odds_sum: f64,
    wins: u32,
    losses: u32,
    pushes: u32,
}

impl Tally {
    fn add(&mut self, pick: &LeaderboardPick) {
        self.picks += 1;
        self.profit_sum += pick.profit;
        self.stake_sum += pick.stake;
        self.odds_sum += pick.odds;
        match pick.result {
            PickResult::Win => self.wins += 1,
            PickResult::Loss => self.losses += 1,
            PickResult::Push => self.pushes += 1,
            PickResult::Pending => {}
        }
    }

    fn summarize(self, capper_id: String) -> LeaderboardSummary {
        let roi = if self.stake_sum > 0.0 {
            self.profit_sum / self.stake_sum
        } else {
            0.0
        };
        let count = f64::from(self.picks);
        LeaderboardSummary {
            capper_id,
            profit: round_cents(self.profit_sum),
            roi,
            wins: self.wins,
            losses: self.losses,
            pushes: self.pushes,
            average_odds: (self.picks > 0).then(|| self.odds_sum / count),
            average_stake: (self.picks > 0).then(|| self.stake_sum / count),
            picks: self.picks,
        }
    }
}

/// Aggregate picks into one summary per capper with at least one pick in
/// the window. Output follows first appearance in the input.
pub fn compute_leaderboard(
    picks: &[LeaderboardPick],
    options: &LeaderboardOptions,
) -> Vec<LeaderboardSummary> {
    let now = options.now.unwrap_or_else(Utc::now);
    let bounds = window_bounds(options.window, now, options.day_offset);

    let mut order: Vec<&str> = Vec::new();
    let mut tallies: HashMap<&str, Tally> = HashMap::new();

    for pick in picks.iter().filter(|p| bounds.contains(p.posted_at)) {
        let tally = tallies.entry(pick.capper_id.as_str()).or_insert_with(|| {
            order.push(pick.capper_id.as_str());
            Tally::default()
        });
        tally.add(pick);
    }

    let summaries: Vec<LeaderboardSummary> = order
        .into_iter()
        .filter_map(|id| tallies.remove(id).map(|t| t.summarize(id.to_string())))
        .collect();

    debug!(
        window = %options.window,
        input = picks.len(),
        cappers = summaries.len(),
        "Leaderboard aggregated"
    );

    summaries
}

/// Aggregate with UTC day boundaries at a fixed instant.
pub fn aggregate(
    picks: &[LeaderboardPick],
    window: LeaderboardWindow,
    now: DateTime<Utc>,
) -> Vec<LeaderboardSummary> {
    compute_leaderboard(picks, &LeaderboardOptions::new(window).at(now))
}

/// Best profit first; ties broken by ROI, then capper id.
pub fn rank_by_profit(summaries: &mut [LeaderboardSummary]) {
    summaries.sort_by(|a, b| {
        b.profit
            .total_cmp(&a.profit)
            .then_with(|| b.roi.total_cmp(&a.roi))
            .then_with(|| a.capper_id.cmp(&b.capper_id))
    });
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
