// src/models/team.rs
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Team base record. Created by the scheduling/registration surface;
/// this service only reads it (manager lookup, settlement seeding).
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Team {
    pub id: Uuid,
    pub team_name: String,
    pub sport: String,
    pub manager_id: Uuid,
    pub member_count: i32,
    pub logo_url: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// One selectable player on a team roster.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct RosterPlayer {
    pub id: Uuid,
    pub team_id: Uuid,
    pub display_name: String,
}
