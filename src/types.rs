//! Shared types for the capper tracker.
//!
//! These types form the stored data model used by the storage, service and
//! API layers. The grading and leaderboard cores define their own narrower
//! input/output structs and never depend on the persisted shapes here.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Enums
// ---------------------------------------------------------------------------

/// The kind of wager a pick represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PickType {
    Spread,
    Moneyline,
    Total,
}

impl PickType {
    pub const ALL: &'static [PickType] = &[PickType::Spread, PickType::Moneyline, PickType::Total];

    pub fn as_str(&self) -> &'static str {
        match self {
            PickType::Spread => "spread",
            PickType::Moneyline => "moneyline",
            PickType::Total => "total",
        }
    }

    /// Whether grading this pick type needs a listed line value.
    pub fn requires_line(&self) -> bool {
        matches!(self, PickType::Spread | PickType::Total)
    }
}

impl fmt::Display for PickType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Case-insensitive parse. Anything outside the closed set is rejected.
impl std::str::FromStr for PickType {
    type Err = crate::grading::GradeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "spread" => Ok(PickType::Spread),
            "moneyline" => Ok(PickType::Moneyline),
            "total" => Ok(PickType::Total),
            _ => Err(crate::grading::GradeError::UnsupportedType(s.to_string())),
        }
    }
}

/// Lifecycle state of a pick. `Pending` is owned by the caller; the
/// grading engine only ever produces the three terminal states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PickResult {
    #[default]
    Pending,
    Win,
    Loss,
    Push,
}

impl PickResult {
    /// Terminal results that count toward a leaderboard.
    pub fn is_graded(&self) -> bool {
        !matches!(self, PickResult::Pending)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            PickResult::Pending => "pending",
            PickResult::Win => "win",
            PickResult::Loss => "loss",
            PickResult::Push => "push",
        }
    }
}

impl fmt::Display for PickResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for PickResult {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Ok(PickResult::Pending),
            "win" => Ok(PickResult::Win),
            "loss" => Ok(PickResult::Loss),
            "push" => Ok(PickResult::Push),
            _ => Err(anyhow::anyhow!("Unknown pick result: {s}")),
        }
    }
}

/// Where a pick or grade came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum PickSource {
    #[default]
    Manual,
    Api,
    Webhook,
}

impl fmt::Display for PickSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PickSource::Manual => write!(f, "manual"),
            PickSource::Api => write!(f, "api"),
            PickSource::Webhook => write!(f, "webhook"),
        }
    }
}

// ---------------------------------------------------------------------------
// Capper
// ---------------------------------------------------------------------------

/// A tipster whose picks are tracked.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Capper {
    pub id: Uuid,
    /// Unique handle, e.g. "sharpjoe"
    pub name: String,
    pub display_name: String,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub join_date: DateTime<Utc>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
}

impl fmt::Display for Capper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (@{})", self.display_name, self.name)?;
        if !self.active {
            write!(f, " [inactive]")?;
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Pick
// ---------------------------------------------------------------------------

/// A stored pick, graded or not.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Pick {
    pub id: Uuid,
    pub capper_id: Uuid,
    pub sport: String,
    pub home_team: String,
    pub away_team: String,
    pub pick_type: PickType,
    /// Team name for spread/moneyline, "Over"/"Under" for totals
    pub pick_side: String,
    /// American odds, e.g. -110 or +150
    pub pick_price: i32,
    pub listed_spread_or_total: Option<f64>,
    pub stake: Option<f64>,
    pub posted_at: DateTime<Utc>,
    pub event_date: DateTime<Utc>,
    pub notes: Option<String>,
    #[serde(default)]
    pub result: PickResult,
    pub profit: Option<f64>,
    pub graded_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub source: PickSource,
}

impl fmt::Display for Pick {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} @ {} | {} {}",
            self.sport, self.away_team, self.home_team, self.pick_type, self.pick_side,
        )?;
        if let Some(line) = self.listed_spread_or_total {
            write!(f, " {line:+}")?;
        }
        write!(f, " ({:+}) -> {}", self.pick_price, self.result)?;
        if let Some(profit) = self.profit {
            write!(f, " {profit:+.2}u")?;
        }
        Ok(())
    }
}

impl Pick {
    /// Whether this pick has a terminal result.
    pub fn is_graded(&self) -> bool {
        self.result.is_graded()
    }
}

// ---------------------------------------------------------------------------
// Grade audit log
// ---------------------------------------------------------------------------

/// Raw grading payload, kept for transparency.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeLogEntry {
    pub id: Uuid,
    pub pick_id: Uuid,
    pub payload: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl GradeLogEntry {
    pub fn new(pick_id: Uuid, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            pick_id,
            payload,
            created_at: Utc::now(),
        }
    }
}

// ---------------------------------------------------------------------------
// Serde helpers
// ---------------------------------------------------------------------------

/// Distinguishes a present-but-null field from a missing one. Use with
/// `#[serde(default, deserialize_with = "...")]` on `Option<Option<T>>`.
pub fn supplied<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: serde::Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
