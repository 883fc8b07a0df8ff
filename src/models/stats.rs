// src/models/stats.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Accumulated per-tournament statistics for one player.
///
/// Created on the first settlement that references the player, incremented
/// by every settlement after that. Never decremented.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TournamentPlayerStat {
    pub tournament_id: Uuid,
    pub player_id: Uuid,
    pub player_name: String,
    pub goals: i32,
    pub assists: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
    pub matches_played: i32,
    pub updated_at: DateTime<Utc>,
}

/// Accumulated per-tournament standings line for one team.
///
/// Team name, sport and manager are denormalized from the team base record
/// when the row is first created so ranking views need no join.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, FromRow)]
pub struct TournamentTeamStat {
    pub tournament_id: Uuid,
    pub team_id: Uuid,
    pub team_name: String,
    pub sport: String,
    pub manager_id: Uuid,
    pub member_count: i32,
    pub played: i32,
    pub won: i32,
    pub draw: i32,
    pub lost: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub points: i32,
    pub updated_at: DateTime<Utc>,
}
