//! Service layer between the HTTP surface, storage and the pure
//! grading/leaderboard cores.
//!
//! Every function takes the repository as `&dyn PickRepository` so the same
//! code runs against the JSON store in production and mocks in tests.

pub mod cappers;
pub mod grading;
pub mod leaderboard;
pub mod picks;

use crate::grading::GradeError;
use crate::leaderboard::LeaderboardError;

pub use grading::{grade_batch, grade_pick_by_id, GradeRequest, WebhookGrade};
pub use leaderboard::leaderboard_for;

/// Errors surfaced by service operations.
#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error(transparent)]
    Grade(#[from] GradeError),

    #[error(transparent)]
    Leaderboard(#[from] LeaderboardError),

    #[error("{0} not found")]
    NotFound(String),

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Storage error: {0:#}")]
    Storage(#[from] anyhow::Error),
}

impl ServiceError {
    /// Machine-checkable reason code.
    pub fn code(&self) -> &'static str {
        match self {
            ServiceError::Grade(e) => e.code(),
            ServiceError::Leaderboard(_) => "INVALID_WINDOW",
            ServiceError::NotFound(_) => "NOT_FOUND",
            ServiceError::Validation(_) => "VALIDATION",
            ServiceError::Conflict(_) => "CONFLICT",
            ServiceError::Storage(_) => "STORAGE",
        }
    }

    pub(crate) fn validation(msg: impl Into<String>) -> Self {
        ServiceError::Validation(msg.into())
    }
}

pub type Result<T> = std::result::Result<T, ServiceError>;

/// Require a finite, non-negative number.
pub(crate) fn check_non_negative(field: &str, value: f64) -> Result<()> {
    if !value.is_finite() || value < 0.0 {
        return Err(ServiceError::validation(format!(
            "{field} must be a non-negative number"
        )));
    }
    Ok(())
}

/// Require at least `min` characters after trimming.
pub(crate) fn check_min_len(field: &str, value: &str, min: usize) -> Result<()> {
    if value.trim().chars().count() < min {
        return Err(ServiceError::validation(format!(
            "{field} must be at least {min} characters"
        )));
    }
    Ok(())
}
