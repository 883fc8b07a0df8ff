// src/models/match_record.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// A scheduled or running match, one row per fixture.
///
/// `home_score`/`away_score` cache the count of goal events in the ledger;
/// every goal append updates them in the same transaction so the cached
/// value never drifts from the ledger.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Match {
    pub id: Uuid,
    pub tournament_id: Uuid,
    pub home_team_id: Uuid,
    pub home_team_name: String,
    pub home_team_logo: Option<String>,
    pub away_team_id: Uuid,
    pub away_team_name: String,
    pub away_team_logo: Option<String>,
    pub home_score: i32,
    pub away_score: i32,
    pub status: MatchStatus,
    pub scheduled_time: DateTime<Utc>,
    pub location: Option<String>,
    pub current_half: i16,
    pub current_minute: i32,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub settled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "varchar", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Scheduled,
    Live,
    Halftime,
    Finished,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Scheduled => "scheduled",
            MatchStatus::Live => "live",
            MatchStatus::Halftime => "halftime",
            MatchStatus::Finished => "finished",
        }
    }
}

impl From<String> for MatchStatus {
    fn from(s: String) -> Self {
        match s.to_lowercase().as_str() {
            "live" => MatchStatus::Live,
            "halftime" => MatchStatus::Halftime,
            "finished" => MatchStatus::Finished,
            _ => MatchStatus::Scheduled,
        }
    }
}

/// One entry in a match's append-only event ledger.
///
/// The envelope carries what every event shares; the type-specific payload
/// lives in [`MatchEventKind`]. Events are never deleted or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchEvent {
    pub id: Uuid,
    pub match_id: Uuid,
    pub team_id: Uuid,
    pub player_id: Uuid,
    pub player_name: String,
    pub minute: i32,
    pub half: i16,
    pub occurred_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: MatchEventKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum MatchEventKind {
    Goal {
        assist_player_id: Option<Uuid>,
        assist_player_name: Option<String>,
    },
    YellowCard,
    RedCard,
    Substitution,
}

impl MatchEventKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchEventKind::Goal { .. } => "goal",
            MatchEventKind::YellowCard => "yellow_card",
            MatchEventKind::RedCard => "red_card",
            MatchEventKind::Substitution => "substitution",
        }
    }
}

impl MatchEvent {
    pub fn is_goal(&self) -> bool {
        matches!(self.kind, MatchEventKind::Goal { .. })
    }
}

/// Event type as submitted by the operator UI.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RequestedEventType {
    Goal,
    YellowCard,
    RedCard,
    Substitution,
}

/// Request to append an event to a live match's ledger.
#[derive(Debug, Deserialize)]
pub struct RecordEventRequest {
    pub event_type: RequestedEventType,
    pub player_id: Option<Uuid>,
    pub assist_player_id: Option<Uuid>,
}

/// One timeline row for display: the event plus the score as it stood
/// immediately after the event.
#[derive(Debug, Clone, Serialize)]
pub struct TimelineEntry {
    pub event: MatchEvent,
    pub home_score: i32,
    pub away_score: i32,
}

/// Current clock reading for a match with a locally running clock.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct ClockReading {
    pub minutes: u32,
    pub seconds: u32,
    pub half: u8,
    pub running: bool,
}

/// Full live-match payload for the operator page.
#[derive(Debug, Serialize)]
pub struct LiveMatchResponse {
    pub match_record: Match,
    pub timeline: Vec<TimelineEntry>,
    pub home_roster: Vec<crate::models::team::RosterPlayer>,
    pub away_roster: Vec<crate::models::team::RosterPlayer>,
    pub clock: Option<ClockReading>,
}
