//! The settle protocol end to end against an in-memory staging store:
//! successful commits, injected write-phase failures, and the
//! already-settled guard. Writes only become visible on commit, matching
//! the transaction the Postgres store wraps.

mod common;

use std::collections::HashMap;

use chrono::Utc;
use common::MatchFixture;
use uuid::Uuid;

use matchday_backend::error::MatchError;
use matchday_backend::matches::settlement::{
    run_settlement, SettlementReads, SettlementStore, SettlementWrites,
};
use matchday_backend::models::match_record::{Match, MatchEvent, MatchStatus};
use matchday_backend::models::stats::{TournamentPlayerStat, TournamentTeamStat};
use matchday_backend::models::team::Team;

#[derive(Clone)]
struct AggregateState {
    match_record: Match,
    events: Vec<MatchEvent>,
    home_team: Team,
    away_team: Team,
    player_stats: HashMap<Uuid, TournamentPlayerStat>,
    team_stats: HashMap<Uuid, TournamentTeamStat>,
}

impl AggregateState {
    fn new(fx: &MatchFixture, home_score: i32, away_score: i32, events: Vec<MatchEvent>) -> Self {
        Self {
            match_record: fx.match_record(MatchStatus::Finished, home_score, away_score),
            events,
            home_team: fx.team(fx.home_team_id, "Rovers"),
            away_team: fx.team(fx.away_team_id, "Wanderers"),
            player_stats: HashMap::new(),
            team_stats: HashMap::new(),
        }
    }
}

/// Applies writes to a staged copy and publishes on commit, so an aborted
/// run never touches the visible state. Can be rigged to fail after the
/// player upserts, mid write phase.
struct StagingStore<'a> {
    committed: &'a mut AggregateState,
    staged: AggregateState,
    fail_after_player_upserts: bool,
}

impl<'a> StagingStore<'a> {
    fn begin(committed: &'a mut AggregateState) -> Self {
        let staged = committed.clone();
        Self {
            committed,
            staged,
            fail_after_player_upserts: false,
        }
    }

    fn failing_after_player_upserts(committed: &'a mut AggregateState) -> Self {
        let mut store = Self::begin(committed);
        store.fail_after_player_upserts = true;
        store
    }
}

impl SettlementStore for StagingStore<'_> {
    async fn collect_reads(&mut self, _match_id: Uuid) -> Result<SettlementReads, MatchError> {
        Ok(SettlementReads {
            match_record: self.staged.match_record.clone(),
            events: self.staged.events.clone(),
            home_team: Some(self.staged.home_team.clone()),
            away_team: Some(self.staged.away_team.clone()),
            existing_player_stats: self.staged.player_stats.clone(),
            existing_team_stats: self.staged.team_stats.clone(),
        })
    }

    async fn apply_writes(&mut self, writes: &SettlementWrites) -> Result<(), MatchError> {
        for delta in &writes.player_deltas {
            let stat = self
                .staged
                .player_stats
                .entry(delta.player_id)
                .or_insert_with(|| TournamentPlayerStat {
                    tournament_id: writes.tournament_id,
                    player_id: delta.player_id,
                    player_name: delta.player_name.clone(),
                    goals: 0,
                    assists: 0,
                    yellow_cards: 0,
                    red_cards: 0,
                    matches_played: 0,
                    updated_at: Utc::now(),
                });
            stat.goals += delta.goals;
            stat.assists += delta.assists;
            stat.yellow_cards += delta.yellow_cards;
            stat.red_cards += delta.red_cards;
            stat.matches_played += 1;
        }

        if self.fail_after_player_upserts {
            return Err(MatchError::Database(sqlx::Error::PoolTimedOut));
        }

        for team in [&writes.home_team, &writes.away_team] {
            let stat = self
                .staged
                .team_stats
                .entry(team.team_id)
                .or_insert_with(|| TournamentTeamStat {
                    tournament_id: writes.tournament_id,
                    team_id: team.team_id,
                    team_name: team.team_name.clone(),
                    sport: team.sport.clone(),
                    manager_id: team.manager_id,
                    member_count: team.member_count,
                    played: 0,
                    won: 0,
                    draw: 0,
                    lost: 0,
                    goals_for: 0,
                    goals_against: 0,
                    points: 0,
                    updated_at: Utc::now(),
                });
            stat.played += 1;
            stat.won += team.won;
            stat.draw += team.draw;
            stat.lost += team.lost;
            stat.goals_for += team.goals_for;
            stat.goals_against += team.goals_against;
            stat.points += team.points;
        }

        if self.staged.match_record.settled_at.is_some() {
            return Err(MatchError::AlreadySettled(writes.match_id));
        }
        self.staged.match_record.settled_at = Some(Utc::now());
        Ok(())
    }

    async fn commit(self) -> Result<(), MatchError> {
        *self.committed = self.staged;
        Ok(())
    }
}

#[tokio::test]
async fn a_successful_settlement_commits_all_aggregates() {
    let fx = MatchFixture::new();
    let scorer = Uuid::new_v4();
    let assistant = Uuid::new_v4();
    let events = vec![
        fx.assisted_goal(fx.home_team_id, scorer, assistant, 10, 1),
        fx.goal(fx.home_team_id, scorer, 30, 2),
        fx.goal(fx.away_team_id, Uuid::new_v4(), 33, 2),
    ];
    let mut state = AggregateState::new(&fx, 2, 1, events);
    let match_id = state.match_record.id;

    let summary = run_settlement(StagingStore::begin(&mut state), match_id)
        .await
        .unwrap();
    assert_eq!(summary.players_updated, 3);
    assert_eq!(summary.players_created, 3);
    assert_eq!((summary.home_points, summary.away_points), (3, 0));

    assert!(state.match_record.settled_at.is_some());
    assert_eq!(state.player_stats[&scorer].goals, 2);
    assert_eq!(state.player_stats[&assistant].assists, 1);
    assert_eq!(state.team_stats[&fx.home_team_id].points, 3);
    assert_eq!(state.team_stats[&fx.away_team_id].lost, 1);
}

#[tokio::test]
async fn a_write_phase_failure_leaves_aggregates_untouched() {
    let fx = MatchFixture::new();
    let scorer = Uuid::new_v4();
    let events = vec![fx.goal(fx.home_team_id, scorer, 5, 1)];
    let mut state = AggregateState::new(&fx, 1, 0, events);
    let match_id = state.match_record.id;

    // Aggregates already carry history from earlier rounds.
    run_settlement(StagingStore::begin(&mut state), match_id)
        .await
        .unwrap();
    state.match_record.settled_at = None;
    let players_before = state.player_stats.clone();
    let teams_before = state.team_stats.clone();

    let err = run_settlement(
        StagingStore::failing_after_player_upserts(&mut state),
        match_id,
    )
    .await
    .unwrap_err();
    assert!(matches!(err, MatchError::Database(_)));
    assert!(err.is_retryable());

    // Nothing the aborted run staged is visible.
    assert_eq!(state.player_stats, players_before);
    assert_eq!(state.team_stats, teams_before);
    assert!(state.match_record.settled_at.is_none());
}

#[tokio::test]
async fn a_second_settlement_is_rejected_and_changes_nothing() {
    let fx = MatchFixture::new();
    let events = vec![fx.goal(fx.away_team_id, Uuid::new_v4(), 12, 1)];
    let mut state = AggregateState::new(&fx, 0, 1, events);
    let match_id = state.match_record.id;

    run_settlement(StagingStore::begin(&mut state), match_id)
        .await
        .unwrap();
    let players_after_first = state.player_stats.clone();
    let teams_after_first = state.team_stats.clone();

    let err = run_settlement(StagingStore::begin(&mut state), match_id)
        .await
        .unwrap_err();
    assert!(matches!(err, MatchError::AlreadySettled(id) if id == match_id));
    assert!(!err.is_retryable());

    assert_eq!(state.player_stats, players_after_first);
    assert_eq!(state.team_stats, teams_after_first);
}

#[tokio::test]
async fn retrying_after_a_failure_settles_cleanly() {
    let fx = MatchFixture::new();
    let events = vec![fx.goal(fx.home_team_id, Uuid::new_v4(), 8, 1)];
    let mut state = AggregateState::new(&fx, 1, 0, events);
    let match_id = state.match_record.id;

    run_settlement(
        StagingStore::failing_after_player_upserts(&mut state),
        match_id,
    )
    .await
    .unwrap_err();

    let summary = run_settlement(StagingStore::begin(&mut state), match_id)
        .await
        .unwrap();
    assert_eq!(summary.players_updated, 1);
    assert!(state.match_record.settled_at.is_some());
    assert_eq!(state.team_stats[&fx.home_team_id].played, 1);
}
