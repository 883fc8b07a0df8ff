// src/matches/settlement.rs
//! One-time transactional aggregation of a finished match into tournament
//! player statistics and team standings.
//!
//! The store requires all reads of a transaction to happen before its
//! writes, so the engine is an explicit two-phase protocol:
//! `collect_reads` -> pure `compute_writes` -> `apply_writes`, all inside a
//! single sqlx transaction. A `settled_at` column, checked and set within
//! the same transaction, guards against double-counting on repeated calls.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::future::Future;

use sqlx::{PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crate::db::match_queries;
use crate::error::MatchError;
use crate::models::match_record::{Match, MatchEvent, MatchEventKind, MatchStatus};
use crate::models::stats::{TournamentPlayerStat, TournamentTeamStat};
use crate::models::team::Team;

/// Everything the settlement needs, read under one snapshot.
#[derive(Debug)]
pub struct SettlementReads {
    pub match_record: Match,
    pub events: Vec<MatchEvent>,
    pub home_team: Option<Team>,
    pub away_team: Option<Team>,
    pub existing_player_stats: HashMap<Uuid, TournamentPlayerStat>,
    pub existing_team_stats: HashMap<Uuid, TournamentTeamStat>,
}

/// Per-player increments contributed by this match. `matches_played` is
/// always 1 for a player with at least one ledger contribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerStatDelta {
    pub player_id: Uuid,
    pub player_name: String,
    pub goals: i32,
    pub assists: i32,
    pub yellow_cards: i32,
    pub red_cards: i32,
}

impl PlayerStatDelta {
    fn new(player_id: Uuid, player_name: String) -> Self {
        Self {
            player_id,
            player_name,
            goals: 0,
            assists: 0,
            yellow_cards: 0,
            red_cards: 0,
        }
    }
}

/// One team's standings increment, plus the denormalized seed values used
/// when the aggregate row is created on first settlement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TeamStatUpsert {
    pub team_id: Uuid,
    pub team_name: String,
    pub sport: String,
    pub manager_id: Uuid,
    pub member_count: i32,
    pub won: i32,
    pub draw: i32,
    pub lost: i32,
    pub goals_for: i32,
    pub goals_against: i32,
    pub points: i32,
}

#[derive(Debug)]
pub struct SettlementWrites {
    pub match_id: Uuid,
    pub tournament_id: Uuid,
    pub player_deltas: Vec<PlayerStatDelta>,
    /// How many of the deltas have no aggregate row yet and will create one.
    pub players_created: usize,
    pub home_team: TeamStatUpsert,
    pub away_team: TeamStatUpsert,
}

#[derive(Debug, serde::Serialize)]
pub struct SettlementSummary {
    pub match_id: Uuid,
    pub tournament_id: Uuid,
    pub players_updated: usize,
    pub players_created: usize,
    pub home_points: i32,
    pub away_points: i32,
}

/// Pure computation phase. Rejects matches that are not finished or were
/// already settled, and fails when a team aggregate would have to be created
/// without a base record to seed it from.
pub fn compute_writes(reads: &SettlementReads) -> Result<SettlementWrites, MatchError> {
    let m = &reads.match_record;

    if m.status != MatchStatus::Finished {
        return Err(MatchError::NotFinished(m.id));
    }
    if m.settled_at.is_some() {
        return Err(MatchError::AlreadySettled(m.id));
    }

    let player_deltas = player_deltas(&reads.events);
    let players_created = player_deltas
        .iter()
        .filter(|d| !reads.existing_player_stats.contains_key(&d.player_id))
        .count();

    let (home_points, away_points) = points_for(m.home_score, m.away_score);
    let home_team = team_upsert(
        reads,
        m.home_team_id,
        m.home_score,
        m.away_score,
        home_points,
    )?;
    let away_team = team_upsert(
        reads,
        m.away_team_id,
        m.away_score,
        m.home_score,
        away_points,
    )?;

    Ok(SettlementWrites {
        match_id: m.id,
        tournament_id: m.tournament_id,
        player_deltas,
        players_created,
        home_team,
        away_team,
    })
}

/// Standard result classification: win 3, draw 1 each, loss 0.
pub fn points_for(own_score: i32, opponent_score: i32) -> (i32, i32) {
    if own_score > opponent_score {
        (3, 0)
    } else if opponent_score > own_score {
        (0, 3)
    } else {
        (1, 1)
    }
}

/// Group ledger events into per-player increments. Every player referenced
/// by an event, as actor or assist, gets a delta (and a matches-played
/// credit). Order is deterministic by player id.
pub fn player_deltas(events: &[MatchEvent]) -> Vec<PlayerStatDelta> {
    let mut deltas: BTreeMap<Uuid, PlayerStatDelta> = BTreeMap::new();

    for event in events {
        let actor = deltas
            .entry(event.player_id)
            .or_insert_with(|| PlayerStatDelta::new(event.player_id, event.player_name.clone()));

        match &event.kind {
            MatchEventKind::Goal {
                assist_player_id,
                assist_player_name,
            } => {
                actor.goals += 1;
                if let Some(assist_id) = assist_player_id {
                    let name = assist_player_name.clone().unwrap_or_default();
                    deltas
                        .entry(*assist_id)
                        .or_insert_with(|| PlayerStatDelta::new(*assist_id, name))
                        .assists += 1;
                }
            }
            MatchEventKind::YellowCard => actor.yellow_cards += 1,
            MatchEventKind::RedCard => actor.red_cards += 1,
            MatchEventKind::Substitution => {}
        }
    }

    deltas.into_values().collect()
}

fn team_upsert(
    reads: &SettlementReads,
    team_id: Uuid,
    own_score: i32,
    opponent_score: i32,
    points: i32,
) -> Result<TeamStatUpsert, MatchError> {
    // Seed denormalized fields from the existing aggregate if there is one,
    // otherwise from the team base record. A missing base record on first
    // creation is a data-integrity violation, not something to paper over.
    let (team_name, sport, manager_id, member_count) =
        if let Some(existing) = reads.existing_team_stats.get(&team_id) {
            (
                existing.team_name.clone(),
                existing.sport.clone(),
                existing.manager_id,
                existing.member_count,
            )
        } else {
            let base = [&reads.home_team, &reads.away_team]
                .into_iter()
                .flatten()
                .find(|t| t.id == team_id)
                .ok_or(MatchError::TeamRecordMissing(team_id))?;
            (
                base.team_name.clone(),
                base.sport.clone(),
                base.manager_id,
                base.member_count,
            )
        };

    let (won, draw, lost) = if own_score > opponent_score {
        (1, 0, 0)
    } else if opponent_score > own_score {
        (0, 0, 1)
    } else {
        (0, 1, 0)
    };

    Ok(TeamStatUpsert {
        team_id,
        team_name,
        sport,
        manager_id,
        member_count,
        won,
        draw,
        lost,
        goals_for: own_score,
        goals_against: opponent_score,
        points,
    })
}

/// Storage boundary of the settle protocol. The Postgres implementation
/// wraps one transaction; a staging store in the test suite drives the same
/// protocol and injects write-phase failures.
pub trait SettlementStore: Send {
    fn collect_reads(
        &mut self,
        match_id: Uuid,
    ) -> impl Future<Output = Result<SettlementReads, MatchError>> + Send;

    fn apply_writes(
        &mut self,
        writes: &SettlementWrites,
    ) -> impl Future<Output = Result<(), MatchError>> + Send;

    /// Publish the staged writes. Dropping the store without committing
    /// discards them.
    fn commit(self) -> impl Future<Output = Result<(), MatchError>> + Send;
}

/// The settle protocol against any store. All-or-nothing: any failure before
/// `commit` leaves the match and every aggregate in its pre-settlement state.
pub async fn run_settlement<S: SettlementStore>(
    mut store: S,
    match_id: Uuid,
) -> Result<SettlementSummary, MatchError> {
    let reads = store.collect_reads(match_id).await?;
    let writes = compute_writes(&reads)?;
    store.apply_writes(&writes).await?;
    store.commit().await?;

    Ok(SettlementSummary {
        match_id: writes.match_id,
        tournament_id: writes.tournament_id,
        players_updated: writes.player_deltas.len(),
        players_created: writes.players_created,
        home_points: writes.home_team.points,
        away_points: writes.away_team.points,
    })
}

pub struct PgSettlementStore {
    tx: sqlx::Transaction<'static, sqlx::Postgres>,
}

impl PgSettlementStore {
    pub async fn begin(pool: &PgPool) -> Result<Self, MatchError> {
        Ok(Self {
            tx: pool.begin().await?,
        })
    }
}

impl SettlementStore for PgSettlementStore {
    async fn collect_reads(&mut self, match_id: Uuid) -> Result<SettlementReads, MatchError> {
        collect_reads(&mut self.tx, match_id).await
    }

    async fn apply_writes(&mut self, writes: &SettlementWrites) -> Result<(), MatchError> {
        apply_writes(&mut self.tx, writes).await
    }

    async fn commit(self) -> Result<(), MatchError> {
        self.tx.commit().await?;
        Ok(())
    }
}

/// Runs the full settle protocol for one match.
#[derive(Debug, Clone)]
pub struct SettlementService {
    pool: PgPool,
}

impl SettlementService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn settle(&self, match_id: Uuid) -> Result<SettlementSummary, MatchError> {
        let store = PgSettlementStore::begin(&self.pool).await?;
        let summary = run_settlement(store, match_id).await?;

        info!(
            "Settled match {}: {} player stat lines ({} new), home {} pts / away {} pts",
            match_id,
            summary.players_updated,
            summary.players_created,
            summary.home_points,
            summary.away_points
        );

        Ok(summary)
    }
}

/// Read phase. Must complete in full before any write in the transaction.
async fn collect_reads(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    match_id: Uuid,
) -> Result<SettlementReads, MatchError> {
    let conn: &mut PgConnection = &mut *tx;
    let match_record = match_queries::fetch_match_for_update(conn, match_id)
        .await?
        .ok_or(MatchError::MatchNotFound(match_id))?;

    let events = match_queries::fetch_events(&mut *tx, match_id).await?;

    let home_team = fetch_team(&mut *tx, match_record.home_team_id).await?;
    let away_team = fetch_team(&mut *tx, match_record.away_team_id).await?;

    let mut player_ids: HashSet<Uuid> = HashSet::new();
    for event in &events {
        player_ids.insert(event.player_id);
        if let MatchEventKind::Goal {
            assist_player_id: Some(assist_id),
            ..
        } = &event.kind
        {
            player_ids.insert(*assist_id);
        }
    }
    let player_ids: Vec<Uuid> = player_ids.into_iter().collect();

    let existing_player_stats: HashMap<Uuid, TournamentPlayerStat> =
        sqlx::query_as::<_, TournamentPlayerStat>(
            "SELECT * FROM tournament_player_stats \
             WHERE tournament_id = $1 AND player_id = ANY($2)",
        )
        .bind(match_record.tournament_id)
        .bind(&player_ids)
        .fetch_all(&mut **tx)
        .await?
        .into_iter()
        .map(|s| (s.player_id, s))
        .collect();

    let existing_team_stats: HashMap<Uuid, TournamentTeamStat> =
        sqlx::query_as::<_, TournamentTeamStat>(
            "SELECT * FROM tournament_team_stats \
             WHERE tournament_id = $1 AND team_id = ANY($2)",
        )
        .bind(match_record.tournament_id)
        .bind(vec![match_record.home_team_id, match_record.away_team_id])
        .fetch_all(&mut **tx)
        .await?
        .into_iter()
        .map(|s| (s.team_id, s))
        .collect();

    Ok(SettlementReads {
        match_record,
        events,
        home_team,
        away_team,
        existing_player_stats,
        existing_team_stats,
    })
}

async fn fetch_team(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    team_id: Uuid,
) -> Result<Option<Team>, sqlx::Error> {
    sqlx::query_as::<_, Team>("SELECT * FROM teams WHERE id = $1")
        .bind(team_id)
        .fetch_optional(&mut **tx)
        .await
}

/// Write phase: additive upserts for every aggregate, then the
/// checked-and-set settle marker.
async fn apply_writes(
    tx: &mut sqlx::Transaction<'_, sqlx::Postgres>,
    writes: &SettlementWrites,
) -> Result<(), MatchError> {
    for delta in &writes.player_deltas {
        sqlx::query(
            r#"
            INSERT INTO tournament_player_stats (
                tournament_id, player_id, player_name,
                goals, assists, yellow_cards, red_cards, matches_played, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, 1, NOW())
            ON CONFLICT (tournament_id, player_id) DO UPDATE SET
                goals = tournament_player_stats.goals + EXCLUDED.goals,
                assists = tournament_player_stats.assists + EXCLUDED.assists,
                yellow_cards = tournament_player_stats.yellow_cards + EXCLUDED.yellow_cards,
                red_cards = tournament_player_stats.red_cards + EXCLUDED.red_cards,
                matches_played = tournament_player_stats.matches_played + 1,
                updated_at = NOW()
            "#,
        )
        .bind(writes.tournament_id)
        .bind(delta.player_id)
        .bind(&delta.player_name)
        .bind(delta.goals)
        .bind(delta.assists)
        .bind(delta.yellow_cards)
        .bind(delta.red_cards)
        .execute(&mut **tx)
        .await?;
    }

    for team in [&writes.home_team, &writes.away_team] {
        sqlx::query(
            r#"
            INSERT INTO tournament_team_stats (
                tournament_id, team_id, team_name, sport, manager_id, member_count,
                played, won, draw, lost, goals_for, goals_against, points, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, 1, $7, $8, $9, $10, $11, $12, NOW())
            ON CONFLICT (tournament_id, team_id) DO UPDATE SET
                played = tournament_team_stats.played + 1,
                won = tournament_team_stats.won + EXCLUDED.won,
                draw = tournament_team_stats.draw + EXCLUDED.draw,
                lost = tournament_team_stats.lost + EXCLUDED.lost,
                goals_for = tournament_team_stats.goals_for + EXCLUDED.goals_for,
                goals_against = tournament_team_stats.goals_against + EXCLUDED.goals_against,
                points = tournament_team_stats.points + EXCLUDED.points,
                updated_at = NOW()
            "#,
        )
        .bind(writes.tournament_id)
        .bind(team.team_id)
        .bind(&team.team_name)
        .bind(&team.sport)
        .bind(team.manager_id)
        .bind(team.member_count)
        .bind(team.won)
        .bind(team.draw)
        .bind(team.lost)
        .bind(team.goals_for)
        .bind(team.goals_against)
        .bind(team.points)
        .execute(&mut **tx)
        .await?;
    }

    // Second line of defence against a concurrent settle of the same match.
    let marked = sqlx::query(
        "UPDATE matches SET settled_at = NOW(), updated_at = NOW() \
         WHERE id = $1 AND settled_at IS NULL",
    )
    .bind(writes.match_id)
    .execute(&mut **tx)
    .await?;

    if marked.rows_affected() == 0 {
        return Err(MatchError::AlreadySettled(writes.match_id));
    }

    Ok(())
}
