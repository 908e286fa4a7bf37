//! Grade-and-persist: load a pick, merge request overrides, run the grading
//! engine, write the outcome back with an audit log entry.

use anyhow::Context;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::{Result, ServiceError};
use crate::grading::overrides::{resolve_terms, GradeOverrides};
use crate::grading::{grade, ScoreSubmission};
use crate::storage::PickRepository;
use crate::types::{GradeLogEntry, Pick, PickSource};

/// A final score plus optional corrections to the stored terms.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GradeRequest {
    pub home_score: f64,
    pub away_score: f64,
    #[serde(flatten)]
    pub overrides: GradeOverrides,
}

impl GradeRequest {
    pub fn new(home_score: f64, away_score: f64) -> Self {
        Self {
            home_score,
            away_score,
            overrides: GradeOverrides::default(),
        }
    }

    pub fn score(&self) -> ScoreSubmission {
        ScoreSubmission {
            home_score: self.home_score,
            away_score: self.away_score,
        }
    }
}

/// One entry of a webhook grading batch.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookGrade {
    pub pick_id: Uuid,
    #[serde(flatten)]
    pub request: GradeRequest,
}

/// Attempts before giving up on a pick that keeps changing under us.
const MAX_GRADE_ATTEMPTS: usize = 3;

/// Grade a stored pick and persist the outcome.
///
/// The write only lands if the pick is unchanged since it was read; an edit
/// in between triggers a fresh read and regrade. On any grading error
/// nothing is written.
pub async fn grade_pick_by_id(
    repo: &dyn PickRepository,
    pick_id: Uuid,
    request: &GradeRequest,
    source: PickSource,
) -> Result<Pick> {
    let payload = serde_json::to_value(request).context("Failed to serialise grade payload")?;

    for attempt in 1..=MAX_GRADE_ATTEMPTS {
        let stored = repo
            .get_pick(pick_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Pick {pick_id}")))?;

        let terms = resolve_terms(&stored, &request.overrides);
        let outcome = grade(&terms, &request.score()).map_err(|e| {
            warn!(%pick_id, code = e.code(), error = %e, "Grading rejected");
            e
        })?;

        if stored.is_graded() {
            info!(%pick_id, previous = %stored.result, "Re-grading pick");
        }

        let mut pick = stored.clone();
        pick.result = outcome.result;
        pick.profit = Some(outcome.profit);
        pick.graded_at = Some(Utc::now());
        pick.source = source;

        let log = GradeLogEntry::new(pick_id, payload.clone());
        if repo.record_grade(stored, pick.clone(), log).await? {
            info!(
                %pick_id,
                result = %outcome.result,
                profit = outcome.profit,
                %source,
                "Pick graded"
            );
            return Ok(pick);
        }
        debug!(%pick_id, attempt, "Pick changed while grading, retrying");
    }

    Err(ServiceError::Conflict(format!(
        "Pick {pick_id} kept changing while being graded"
    )))
}

/// Grade a batch in order; stops at the first failure.
///
/// Returns the number of picks updated.
pub async fn grade_batch(repo: &dyn PickRepository, grades: &[WebhookGrade]) -> Result<usize> {
    let mut updated = 0;
    for entry in grades {
        grade_pick_by_id(repo, entry.pick_id, &entry.request, PickSource::Webhook).await?;
        updated += 1;
    }
    info!(updated, "Webhook batch graded");
    Ok(updated)
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
