// src/matches/lifecycle.rs
//! Transition rules for the match lifecycle:
//! scheduled -> live (half 1) -> halftime -> live (half 2) -> finished.
//!
//! Validation here is pure; the service layer persists the transition and
//! only advances in-memory state once the write succeeded.

use crate::error::MatchError;
use crate::middleware::auth::Claims;
use crate::models::match_record::{Match, MatchStatus};
use uuid::Uuid;

/// Operator- or clock-initiated lifecycle actions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchAction {
    StartMatch,
    EndFirstHalf,
    StartSecondHalf,
    EndMatch,
}

impl MatchAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchAction::StartMatch => "start the match",
            MatchAction::EndFirstHalf => "end the first half",
            MatchAction::StartSecondHalf => "start the second half",
            MatchAction::EndMatch => "end the match",
        }
    }
}

/// Validate an action against the current `(status, half)` and return the
/// target status.
pub fn validate_transition(
    status: MatchStatus,
    current_half: i16,
    action: MatchAction,
) -> Result<MatchStatus, MatchError> {
    let allowed = match action {
        MatchAction::StartMatch => status == MatchStatus::Scheduled,
        MatchAction::EndFirstHalf => status == MatchStatus::Live && current_half == 1,
        MatchAction::StartSecondHalf => status == MatchStatus::Halftime,
        MatchAction::EndMatch => status == MatchStatus::Live && current_half == 2,
    };
    if !allowed {
        return Err(MatchError::InvalidTransition {
            current: status,
            action: action.as_str(),
        });
    }
    Ok(match action {
        MatchAction::StartMatch | MatchAction::StartSecondHalf => MatchStatus::Live,
        MatchAction::EndFirstHalf => MatchStatus::Halftime,
        MatchAction::EndMatch => MatchStatus::Finished,
    })
}

/// Whether the operator may drive transitions or append events for a match.
/// Administrators and elevated users always may; otherwise the operator must
/// manage the home or away team.
pub fn can_manage_match(claims: &Claims, home_manager_id: Uuid, away_manager_id: Uuid) -> bool {
    if claims.is_administrator() || claims.is_elevated() {
        return true;
    }
    match claims.user_id() {
        Some(user_id) => user_id == home_manager_id || user_id == away_manager_id,
        None => false,
    }
}

/// Convenience guard used by the service layer before any persistence.
pub fn ensure_can_manage(
    claims: &Claims,
    home_manager_id: Uuid,
    away_manager_id: Uuid,
) -> Result<(), MatchError> {
    if can_manage_match(claims, home_manager_id, away_manager_id) {
        Ok(())
    } else {
        Err(MatchError::Forbidden)
    }
}

/// Events may only be appended while the match is live.
pub fn ensure_live(match_record: &Match) -> Result<(), MatchError> {
    if match_record.status == MatchStatus::Live {
        Ok(())
    } else {
        Err(MatchError::InvalidTransition {
            current: match_record.status,
            action: "record an event",
        })
    }
}
