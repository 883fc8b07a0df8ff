// src/error.rs
use uuid::Uuid;

use crate::models::match_record::MatchStatus;

/// Error taxonomy for match management.
///
/// Validation and permission failures are rejected before any persistence
/// attempt. Database errors on operator actions surface to the caller so the
/// action can be retried; checkpoint-save failures are swallowed at the call
/// site instead (the clock must keep ticking).
#[derive(Debug, thiserror::Error)]
pub enum MatchError {
    #[error("{0}")]
    Validation(String),

    #[error("operator is not allowed to manage this match")]
    Forbidden,

    #[error("match {0} not found")]
    MatchNotFound(Uuid),

    #[error("team record {0} not found")]
    TeamRecordMissing(Uuid),

    #[error("invalid transition: match is {current:?}, cannot {action}")]
    InvalidTransition {
        current: MatchStatus,
        action: &'static str,
    },

    #[error("match {0} is not finished, nothing to settle")]
    NotFinished(Uuid),

    #[error("match {0} was already settled")]
    AlreadySettled(Uuid),

    #[error(transparent)]
    Database(#[from] sqlx::Error),
}

impl MatchError {
    /// Safe-to-retry from the operator's point of view.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MatchError::Database(_))
    }
}
