//! API route handlers.
//!
//! Handlers stay thin: parse, authorise, call into `crate::service`, wrap the
//! result as JSON. State is shared via `Arc<ApiState>`.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    Json,
};
use chrono::{DateTime, FixedOffset, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::warn;
use uuid::Uuid;

use super::error::{ApiError, ApiResult};
use crate::leaderboard::{LeaderboardOptions, LeaderboardSummary, LeaderboardWindow};
use crate::service::cappers::{self, CapperPatch, NewCapper};
use crate::service::picks::{self, NewPick, PickPatch};
use crate::service::{self, GradeRequest, ServiceError, WebhookGrade};
use crate::storage::{PickFilter, PickRepository};
use crate::types::{Capper, GradeLogEntry, Pick, PickResult, PickSource, PickType};

/// Header carrying the shared secret on grading webhooks.
pub const WEBHOOK_SECRET_HEADER: &str = "x-webhook-secret";

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// Shared state accessible by all route handlers.
pub struct ApiState {
    pub repo: Arc<dyn PickRepository>,
    pub owner_token: SecretString,
    pub webhook_secret: SecretString,
    pub default_window: LeaderboardWindow,
    /// Local-day boundary for the `yesterday` window.
    pub day_offset: FixedOffset,
    pub cors_allow_origin: String,
}

pub type AppState = Arc<ApiState>;

impl ApiState {
    fn repo(&self) -> &dyn PickRepository {
        self.repo.as_ref()
    }

    fn require_owner(&self, headers: &HeaderMap) -> ApiResult<()> {
        let token = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "));

        match token {
            Some(t) if !t.is_empty() && t == self.owner_token.expose_secret().as_str() => Ok(()),
            _ => {
                warn!("Rejected owner request: bad or missing bearer token");
                Err(ApiError::Unauthorized)
            }
        }
    }

    fn require_webhook_secret(&self, headers: &HeaderMap) -> ApiResult<()> {
        let supplied = headers
            .get(WEBHOOK_SECRET_HEADER)
            .and_then(|v| v.to_str().ok());

        match supplied {
            Some(s) if !s.is_empty() && s == self.webhook_secret.expose_secret().as_str() => Ok(()),
            _ => {
                warn!("Rejected webhook: bad or missing secret");
                Err(ApiError::Unauthorized)
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// Query string of `GET /api/picks`.
#[derive(Debug, Default, Deserialize)]
pub struct PickQuery {
    pub capper: Option<Uuid>,
    #[serde(rename = "type")]
    pub pick_type: Option<String>,
    pub result: Option<String>,
    pub from: Option<DateTime<Utc>>,
    pub to: Option<DateTime<Utc>>,
    pub limit: Option<usize>,
}

impl PickQuery {
    fn into_filter(self) -> Result<PickFilter, ServiceError> {
        let pick_type = self
            .pick_type
            .map(|t| t.parse::<PickType>())
            .transpose()?;
        let result = self
            .result
            .map(|r| r.parse::<PickResult>())
            .transpose()
            .map_err(|e| ServiceError::validation(e.to_string()))?;

        Ok(PickFilter {
            capper_id: self.capper,
            pick_type,
            result,
            from: self.from,
            to: self.to,
            limit: self.limit,
        })
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct LeaderboardQuery {
    pub window: Option<String>,
}

/// Body of `POST /api/picks/:id/grade`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GradeBody {
    #[serde(flatten)]
    pub request: GradeRequest,
    #[serde(default)]
    pub source: Option<PickSource>,
}

/// Body of `POST /api/webhooks/grade`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WebhookBatch {
    pub grades: Vec<WebhookGrade>,
}

// ---------------------------------------------------------------------------
// Route handlers
// ---------------------------------------------------------------------------

/// GET /health
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// GET /api/cappers
pub async fn list_cappers(State(state): State<AppState>) -> ApiResult<Json<Vec<Capper>>> {
    Ok(Json(cappers::list_cappers(state.repo()).await?))
}

/// GET /api/cappers/:id
pub async fn get_capper(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Capper>> {
    Ok(Json(cappers::get_capper(state.repo(), id).await?))
}

/// POST /api/cappers
pub async fn create_capper(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewCapper>,
) -> ApiResult<(StatusCode, Json<Capper>)> {
    state.require_owner(&headers)?;
    let capper = cappers::create_capper(state.repo(), input).await?;
    Ok((StatusCode::CREATED, Json(capper)))
}

/// PATCH /api/cappers/:id
pub async fn update_capper(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(patch): Json<CapperPatch>,
) -> ApiResult<Json<Capper>> {
    state.require_owner(&headers)?;
    Ok(Json(cappers::update_capper(state.repo(), id, patch).await?))
}

/// DELETE /api/cappers/:id
pub async fn delete_capper(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.require_owner(&headers)?;
    cappers::delete_capper(state.repo(), id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/picks
pub async fn list_picks(
    State(state): State<AppState>,
    Query(query): Query<PickQuery>,
) -> ApiResult<Json<Vec<Pick>>> {
    let filter = query.into_filter()?;
    Ok(Json(picks::list_picks(state.repo(), filter).await?))
}

/// GET /api/picks/:id
pub async fn get_pick(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Pick>> {
    Ok(Json(picks::get_pick(state.repo(), id).await?))
}

/// POST /api/picks
pub async fn create_pick(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(input): Json<NewPick>,
) -> ApiResult<(StatusCode, Json<Pick>)> {
    state.require_owner(&headers)?;
    let pick = picks::create_pick(state.repo(), input).await?;
    Ok((StatusCode::CREATED, Json(pick)))
}

/// PATCH /api/picks/:id
pub async fn update_pick(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(patch): Json<PickPatch>,
) -> ApiResult<Json<Pick>> {
    state.require_owner(&headers)?;
    Ok(Json(picks::update_pick(state.repo(), id, patch).await?))
}

/// POST /api/picks/:id/grade
pub async fn grade_pick(
    State(state): State<AppState>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
    Json(body): Json<GradeBody>,
) -> ApiResult<Json<Pick>> {
    state.require_owner(&headers)?;
    let source = body.source.unwrap_or_default();
    let pick = service::grade_pick_by_id(state.repo(), id, &body.request, source).await?;
    Ok(Json(pick))
}

/// GET /api/picks/:id/grades
pub async fn grade_history(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Vec<GradeLogEntry>>> {
    Ok(Json(picks::grade_history(state.repo(), id).await?))
}

/// GET /api/leaderboards
pub async fn get_leaderboard(
    State(state): State<AppState>,
    Query(query): Query<LeaderboardQuery>,
) -> ApiResult<Json<Vec<LeaderboardSummary>>> {
    let window = match query.window {
        Some(w) => w.parse::<LeaderboardWindow>().map_err(ServiceError::from)?,
        None => state.default_window,
    };
    let options = LeaderboardOptions::new(window).with_day_offset(state.day_offset);
    Ok(Json(service::leaderboard_for(state.repo(), &options).await?))
}

/// POST /api/webhooks/grade
pub async fn webhook_grade(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(batch): Json<WebhookBatch>,
) -> ApiResult<Json<Value>> {
    state.require_webhook_secret(&headers)?;
    let updated = service::grade_batch(state.repo(), &batch.grades).await?;
    Ok(Json(json!({ "updated": updated })))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
