// src/db/roster_queries.rs
use sqlx::PgPool;
use uuid::Uuid;

use crate::models::team::{RosterPlayer, Team};

/// Read-only access to team base records and rosters (owned by the team
/// management surface; this service never writes them).
#[derive(Debug, Clone)]
pub struct RosterQueries {
    pool: PgPool,
}

impl RosterQueries {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_team(&self, team_id: Uuid) -> Result<Option<Team>, sqlx::Error> {
        sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1")
            .bind(team_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Both rosters in one round trip, split by side afterwards.
    pub async fn get_rosters(
        &self,
        home_team_id: Uuid,
        away_team_id: Uuid,
    ) -> Result<(Vec<RosterPlayer>, Vec<RosterPlayer>), sqlx::Error> {
        let players = sqlx::query_as::<_, RosterPlayer>(
            "SELECT id, team_id, display_name \
             FROM team_members \
             WHERE team_id = ANY($1) \
             ORDER BY display_name",
        )
        .bind(vec![home_team_id, away_team_id])
        .fetch_all(&self.pool)
        .await?;

        let (home, away): (Vec<RosterPlayer>, Vec<RosterPlayer>) = players
            .into_iter()
            .partition(|p| p.team_id == home_team_id);
        Ok((home, away))
    }

    /// Resolve which side an acting player belongs to. None when the player
    /// is on neither roster.
    pub async fn find_player(
        &self,
        home_team_id: Uuid,
        away_team_id: Uuid,
        player_id: Uuid,
    ) -> Result<Option<RosterPlayer>, sqlx::Error> {
        sqlx::query_as::<_, RosterPlayer>(
            "SELECT id, team_id, display_name \
             FROM team_members \
             WHERE id = $1 AND team_id = ANY($2)",
        )
        .bind(player_id)
        .bind(vec![home_team_id, away_team_id])
        .fetch_optional(&self.pool)
        .await
    }
}
