//! Pick entry and listing.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{check_min_len, check_non_negative, Result, ServiceError};
use crate::storage::{PickFilter, PickRepository};
use crate::types::{GradeLogEntry, Pick, PickResult, PickSource, PickType};

/// Hard cap on a single listing.
pub const MAX_LIST_LIMIT: usize = 100;

/// Body of a pick creation request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewPick {
    pub capper_id: Uuid,
    pub sport: String,
    pub home_team: String,
    pub away_team: String,
    pub pick_type: PickType,
    pub pick_side: String,
    pub pick_price: i32,
    #[serde(default)]
    pub listed_spread_or_total: Option<f64>,
    #[serde(default)]
    pub stake: Option<f64>,
    pub posted_at: DateTime<Utc>,
    pub event_date: DateTime<Utc>,
    #[serde(default)]
    pub notes: Option<String>,
}

/// Partial update of a pick's terms. Results are only set by grading.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PickPatch {
    pub capper_id: Option<Uuid>,
    pub sport: Option<String>,
    pub home_team: Option<String>,
    pub away_team: Option<String>,
    pub pick_type: Option<PickType>,
    pub pick_side: Option<String>,
    pub pick_price: Option<i32>,
    #[serde(default, deserialize_with = "crate::types::supplied")]
    pub listed_spread_or_total: Option<Option<f64>>,
    #[serde(default, deserialize_with = "crate::types::supplied")]
    pub stake: Option<Option<f64>>,
    pub posted_at: Option<DateTime<Utc>>,
    pub event_date: Option<DateTime<Utc>>,
    #[serde(default, deserialize_with = "crate::types::supplied")]
    pub notes: Option<Option<String>>,
}

fn check_line(line: Option<f64>) -> Result<()> {
    match line {
        Some(v) if !v.is_finite() => Err(ServiceError::validation(
            "listed_spread_or_total must be a finite number",
        )),
        _ => Ok(()),
    }
}

impl NewPick {
    pub fn validate(&self) -> Result<()> {
        check_min_len("sport", &self.sport, 1)?;
        check_min_len("home_team", &self.home_team, 1)?;
        check_min_len("away_team", &self.away_team, 1)?;
        check_min_len("pick_side", &self.pick_side, 1)?;
        check_line(self.listed_spread_or_total)?;
        if let Some(stake) = self.stake {
            check_non_negative("stake", stake)?;
        }
        Ok(())
    }
}

impl PickPatch {
    pub fn validate(&self) -> Result<()> {
        for (field, value) in [
            ("sport", &self.sport),
            ("home_team", &self.home_team),
            ("away_team", &self.away_team),
            ("pick_side", &self.pick_side),
        ] {
            if let Some(v) = value {
                check_min_len(field, v, 1)?;
            }
        }
        if let Some(line) = self.listed_spread_or_total {
            check_line(line)?;
        }
        if let Some(Some(stake)) = self.stake {
            check_non_negative("stake", stake)?;
        }
        Ok(())
    }

    fn apply(self, pick: &mut Pick) {
        if let Some(v) = self.capper_id {
            pick.capper_id = v;
        }
        if let Some(v) = self.sport {
            pick.sport = v;
        }
        if let Some(v) = self.home_team {
            pick.home_team = v;
        }
        if let Some(v) = self.away_team {
            pick.away_team = v;
        }
        if let Some(v) = self.pick_type {
            pick.pick_type = v;
        }
        if let Some(v) = self.pick_side {
            pick.pick_side = v;
        }
        if let Some(v) = self.pick_price {
            pick.pick_price = v;
        }
        if let Some(v) = self.listed_spread_or_total {
            pick.listed_spread_or_total = v;
        }
        if let Some(v) = self.stake {
            pick.stake = v;
        }
        if let Some(v) = self.posted_at {
            pick.posted_at = v;
        }
        if let Some(v) = self.event_date {
            pick.event_date = v;
        }
        if let Some(v) = self.notes {
            pick.notes = v;
        }
    }
}

/// Picks matching the filter, newest first, at most [`MAX_LIST_LIMIT`].
pub async fn list_picks(repo: &dyn PickRepository, mut filter: PickFilter) -> Result<Vec<Pick>> {
    filter.limit = Some(filter.limit.unwrap_or(MAX_LIST_LIMIT).min(MAX_LIST_LIMIT));
    Ok(repo.list_picks(&filter).await?)
}

pub async fn get_pick(repo: &dyn PickRepository, id: Uuid) -> Result<Pick> {
    repo.get_pick(id)
        .await?
        .ok_or_else(|| ServiceError::NotFound(format!("Pick {id}")))
}

/// Record a new pending pick.
pub async fn create_pick(repo: &dyn PickRepository, input: NewPick) -> Result<Pick> {
    input.validate()?;
    if repo.get_capper(input.capper_id).await?.is_none() {
        return Err(ServiceError::NotFound(format!("Capper {}", input.capper_id)));
    }

    let pick = Pick {
        id: Uuid::new_v4(),
        capper_id: input.capper_id,
        sport: input.sport,
        home_team: input.home_team,
        away_team: input.away_team,
        pick_type: input.pick_type,
        pick_side: input.pick_side,
        pick_price: input.pick_price,
        listed_spread_or_total: input.listed_spread_or_total,
        stake: input.stake,
        posted_at: input.posted_at,
        event_date: input.event_date,
        notes: input.notes,
        result: PickResult::Pending,
        profit: None,
        graded_at: None,
        source: PickSource::Manual,
    };
    repo.insert_pick(pick.clone()).await?;
    info!(pick_id = %pick.id, capper_id = %pick.capper_id, "{pick}");
    Ok(pick)
}

pub async fn update_pick(repo: &dyn PickRepository, id: Uuid, patch: PickPatch) -> Result<Pick> {
    patch.validate()?;
    if let Some(capper_id) = patch.capper_id {
        if repo.get_capper(capper_id).await?.is_none() {
            return Err(ServiceError::NotFound(format!("Capper {capper_id}")));
        }
    }
    let mut pick = get_pick(repo, id).await?;
    patch.apply(&mut pick);
    if !repo.update_pick(pick).await? {
        return Err(ServiceError::NotFound(format!("Pick {id}")));
    }
    info!(pick_id = %id, "Pick updated");
    // Re-read: the store keeps whatever grade is current
    get_pick(repo, id).await
}

/// Audit trail of every grade applied to a pick, oldest first.
pub async fn grade_history(repo: &dyn PickRepository, id: Uuid) -> Result<Vec<GradeLogEntry>> {
    get_pick(repo, id).await?;
    Ok(repo.grade_logs(id).await?)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
