// src/models/wire_events.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::match_record::MatchStatus;

/// Match events pushed to listener clients over Redis pub/sub.
#[derive(Debug, Serialize, Deserialize, Clone)]
#[serde(tag = "event_type")]
pub enum MatchWireEvent {
    #[serde(rename = "status_changed")]
    StatusChanged {
        match_id: Uuid,
        tournament_id: Uuid,
        status: MatchStatus,
        current_minute: i32,
        current_half: i16,
        changed_at: DateTime<Utc>,
    },

    #[serde(rename = "score_update")]
    ScoreUpdate {
        match_id: Uuid,
        home_team_id: Uuid,
        home_team_name: String,
        away_team_id: Uuid,
        away_team_name: String,
        home_score: i32,
        away_score: i32,
        scorer_id: Uuid,
        scorer_name: String,
        minute: i32,
        half: i16,
        updated_at: DateTime<Utc>,
    },

    #[serde(rename = "match_settled")]
    MatchSettled {
        match_id: Uuid,
        tournament_id: Uuid,
        home_team_id: Uuid,
        away_team_id: Uuid,
        home_score: i32,
        away_score: i32,
        players_updated: usize,
        settled_at: DateTime<Utc>,
    },
}
