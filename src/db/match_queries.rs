// src/db/match_queries.rs
use sqlx::postgres::PgRow;
use sqlx::{PgConnection, PgPool, Row};
use tracing::debug;
use uuid::Uuid;

use crate::models::match_record::{Match, MatchEvent, MatchEventKind};

/// Queries against the matches table and its event ledger. Transition
/// updates are guarded by the expected `(status, half)` in the WHERE clause,
/// so a lost race shows up as zero rows instead of a silent overwrite.
#[derive(Debug, Clone)]
pub struct MatchQueries {
    pool: PgPool,
}

impl MatchQueries {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn get_match(&self, match_id: Uuid) -> Result<Option<Match>, sqlx::Error> {
        sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE id = $1")
            .bind(match_id)
            .fetch_optional(&self.pool)
            .await
    }

    /// Matches that were live when the process last stopped; used by the
    /// startup resume sweep.
    pub async fn get_live_matches(&self) -> Result<Vec<Match>, sqlx::Error> {
        sqlx::query_as::<_, Match>(
            "SELECT * FROM matches WHERE status = 'live' ORDER BY started_at",
        )
        .fetch_all(&self.pool)
        .await
    }

    pub async fn start_match(&self, match_id: Uuid) -> Result<Option<Match>, sqlx::Error> {
        sqlx::query_as::<_, Match>(
            "UPDATE matches \
             SET status = 'live', current_half = 1, current_minute = 0, \
                 started_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'scheduled' \
             RETURNING *",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// First half over: the persisted minute is pinned to the full half
    /// length whether the clock ran out or the operator cut it short.
    pub async fn move_to_halftime(
        &self,
        match_id: Uuid,
        half_length: i32,
    ) -> Result<Option<Match>, sqlx::Error> {
        sqlx::query_as::<_, Match>(
            "UPDATE matches \
             SET status = 'halftime', current_minute = $2, current_half = 1, updated_at = NOW() \
             WHERE id = $1 AND status = 'live' AND current_half = 1 \
             RETURNING *",
        )
        .bind(match_id)
        .bind(half_length)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn begin_second_half(&self, match_id: Uuid) -> Result<Option<Match>, sqlx::Error> {
        sqlx::query_as::<_, Match>(
            "UPDATE matches \
             SET status = 'live', current_half = 2, current_minute = 0, updated_at = NOW() \
             WHERE id = $1 AND status = 'halftime' \
             RETURNING *",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await
    }

    pub async fn finish_match(&self, match_id: Uuid) -> Result<Option<Match>, sqlx::Error> {
        sqlx::query_as::<_, Match>(
            "UPDATE matches \
             SET status = 'finished', completed_at = NOW(), updated_at = NOW() \
             WHERE id = $1 AND status = 'live' AND current_half = 2 \
             RETURNING *",
        )
        .bind(match_id)
        .fetch_optional(&self.pool)
        .await
    }

    /// Append one event to the ledger. For goals the scoring side's cached
    /// score is incremented in the same transaction, so the score-cache
    /// invariant holds after every append.
    pub async fn append_event(
        &self,
        event: &MatchEvent,
        home_delta: i32,
        away_delta: i32,
    ) -> Result<Match, sqlx::Error> {
        let mut tx = self.pool.begin().await?;

        let (assist_player_id, assist_player_name) = match &event.kind {
            MatchEventKind::Goal {
                assist_player_id,
                assist_player_name,
            } => (*assist_player_id, assist_player_name.clone()),
            _ => (None, None),
        };

        sqlx::query(
            "INSERT INTO match_events ( \
                 id, match_id, event_type, team_id, player_id, player_name, \
                 assist_player_id, assist_player_name, minute, half, occurred_at \
             ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)",
        )
        .bind(event.id)
        .bind(event.match_id)
        .bind(event.kind.as_str())
        .bind(event.team_id)
        .bind(event.player_id)
        .bind(&event.player_name)
        .bind(assist_player_id)
        .bind(assist_player_name)
        .bind(event.minute)
        .bind(event.half)
        .bind(event.occurred_at)
        .execute(&mut *tx)
        .await?;

        let updated = if home_delta != 0 || away_delta != 0 {
            sqlx::query_as::<_, Match>(
                "UPDATE matches \
                 SET home_score = home_score + $2, away_score = away_score + $3, \
                     updated_at = NOW() \
                 WHERE id = $1 \
                 RETURNING *",
            )
            .bind(event.match_id)
            .bind(home_delta)
            .bind(away_delta)
            .fetch_one(&mut *tx)
            .await?
        } else {
            sqlx::query_as::<_, Match>(
                "UPDATE matches SET updated_at = NOW() WHERE id = $1 RETURNING *",
            )
            .bind(event.match_id)
            .fetch_one(&mut *tx)
            .await?
        };

        tx.commit().await?;

        debug!(
            "Appended {} event {} to match {}",
            event.kind.as_str(),
            event.id,
            event.match_id
        );
        Ok(updated)
    }

    pub async fn get_events(&self, match_id: Uuid) -> Result<Vec<MatchEvent>, sqlx::Error> {
        let mut conn = self.pool.acquire().await?;
        fetch_events(&mut conn, match_id).await
    }
}

/// Read a match with a row lock, for use inside the settlement transaction.
pub async fn fetch_match_for_update(
    conn: &mut PgConnection,
    match_id: Uuid,
) -> Result<Option<Match>, sqlx::Error> {
    sqlx::query_as::<_, Match>("SELECT * FROM matches WHERE id = $1 FOR UPDATE")
        .bind(match_id)
        .fetch_optional(conn)
        .await
}

/// Ledger in display order: half, then minute; ties keep insertion order.
pub async fn fetch_events(
    conn: &mut PgConnection,
    match_id: Uuid,
) -> Result<Vec<MatchEvent>, sqlx::Error> {
    let rows = sqlx::query(
        "SELECT id, match_id, event_type, team_id, player_id, player_name, \
                assist_player_id, assist_player_name, minute, half, occurred_at \
         FROM match_events \
         WHERE match_id = $1 \
         ORDER BY half, minute, occurred_at, id",
    )
    .bind(match_id)
    .fetch_all(conn)
    .await?;

    rows.iter().map(event_from_row).collect()
}

fn event_from_row(row: &PgRow) -> Result<MatchEvent, sqlx::Error> {
    let event_type: String = row.try_get("event_type")?;
    let kind = match event_type.as_str() {
        "goal" => MatchEventKind::Goal {
            assist_player_id: row.try_get("assist_player_id")?,
            assist_player_name: row.try_get("assist_player_name")?,
        },
        "yellow_card" => MatchEventKind::YellowCard,
        "red_card" => MatchEventKind::RedCard,
        "substitution" => MatchEventKind::Substitution,
        other => {
            return Err(sqlx::Error::Decode(
                format!("unknown match event type '{other}'").into(),
            ))
        }
    };

    Ok(MatchEvent {
        id: row.try_get("id")?,
        match_id: row.try_get("match_id")?,
        team_id: row.try_get("team_id")?,
        player_id: row.try_get("player_id")?,
        player_name: row.try_get("player_name")?,
        minute: row.try_get("minute")?,
        half: row.try_get("half")?,
        occurred_at: row.try_get("occurred_at")?,
        kind,
    })
}
