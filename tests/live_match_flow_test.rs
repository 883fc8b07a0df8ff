//! Walks a whole match through the pure layers in one piece: transitions,
//! clock, ledger and settlement computation.

mod common;

use chrono::{DateTime, Duration, TimeZone, Utc};
use common::MatchFixture;
use std::collections::HashMap;
use uuid::Uuid;

use matchday_backend::clock::{ClockState, TickOutcome};
use matchday_backend::matches::ledger::{derived_score, reconstruct_timeline, sort_for_display};
use matchday_backend::matches::lifecycle::{validate_transition, MatchAction};
use matchday_backend::matches::settlement::{compute_writes, SettlementReads};
use matchday_backend::models::match_record::{MatchEvent, MatchStatus};

const HALF_LENGTH: u32 = 20;

fn kickoff() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 9, 6, 16, 0, 0).unwrap()
}

/// Run a clock from a start minute to the end of its half, one tick per
/// second, and return the terminal outcome.
fn run_half(clock: &mut ClockState, from: DateTime<Utc>) -> TickOutcome {
    let mut outcome = TickOutcome::Advanced { crossed_minute: false };
    let mut i = 0;
    while matches!(outcome, TickOutcome::Advanced { .. }) {
        i += 1;
        outcome = clock.tick(from + Duration::seconds(i));
    }
    outcome
}

#[test]
fn a_full_match_from_kickoff_to_settlement() {
    let fx = MatchFixture::new();
    let scorer = Uuid::new_v4();
    let assistant = Uuid::new_v4();
    let away_scorer = Uuid::new_v4();

    // Kick off.
    let mut status = MatchStatus::Scheduled;
    status = validate_transition(status, 1, MatchAction::StartMatch).unwrap();
    assert_eq!(status, MatchStatus::Live);

    let mut clock = ClockState::start(0, 1, HALF_LENGTH, kickoff());
    let mut events: Vec<MatchEvent> = Vec::new();

    // First-half goal at the clock's current minute.
    for i in 1..=600 {
        clock.tick(kickoff() + Duration::seconds(i));
    }
    assert_eq!(clock.minutes, 10);
    events.push(fx.assisted_goal(
        fx.home_team_id,
        scorer,
        assistant,
        clock.minutes as i32,
        1,
    ));

    // The clock runs the half out by itself.
    let outcome = run_half(&mut clock, kickoff() + Duration::seconds(600));
    assert_eq!(outcome, TickOutcome::FirstHalfEnded);
    status = validate_transition(status, 1, MatchAction::EndFirstHalf).unwrap();
    assert_eq!(status, MatchStatus::Halftime);

    // Second half restarts from zero.
    status = validate_transition(status, 1, MatchAction::StartSecondHalf).unwrap();
    let restart = kickoff() + Duration::seconds(3000);
    let mut clock = ClockState::start(0, 2, HALF_LENGTH, restart);

    for i in 1..=300 {
        clock.tick(restart + Duration::seconds(i));
    }
    events.push(fx.goal(fx.away_team_id, away_scorer, clock.minutes as i32, 2));
    events.push(fx.goal(fx.home_team_id, scorer, 15, 2));

    let outcome = run_half(&mut clock, restart + Duration::seconds(300));
    assert_eq!(outcome, TickOutcome::FullTimeReached);
    status = validate_transition(status, 2, MatchAction::EndMatch).unwrap();
    assert_eq!(status, MatchStatus::Finished);

    // Ledger-derived score and the reconstructed timeline agree.
    sort_for_display(&mut events);
    let (home, away) = derived_score(&events, fx.home_team_id);
    assert_eq!((home, away), (2, 1));
    let timeline = reconstruct_timeline(&events, fx.home_team_id);
    let last = timeline.last().unwrap();
    assert_eq!((last.home_score, last.away_score), (home, away));

    // Settlement sees the cached score the ledger produced.
    let mut match_record = fx.match_record(MatchStatus::Finished, home, away);
    match_record.completed_at = Some(restart + Duration::seconds(1500));
    let reads = SettlementReads {
        match_record,
        events,
        home_team: Some(fx.team(fx.home_team_id, "Rovers")),
        away_team: Some(fx.team(fx.away_team_id, "Wanderers")),
        existing_player_stats: HashMap::new(),
        existing_team_stats: HashMap::new(),
    };
    let writes = compute_writes(&reads).unwrap();

    assert_eq!(writes.home_team.points, 3);
    assert_eq!(writes.away_team.points, 0);
    assert_eq!(writes.player_deltas.len(), 3);

    let scorer_delta = writes
        .player_deltas
        .iter()
        .find(|d| d.player_id == scorer)
        .unwrap();
    assert_eq!(scorer_delta.goals, 2);
    let assist_delta = writes
        .player_deltas
        .iter()
        .find(|d| d.player_id == assistant)
        .unwrap();
    assert_eq!(assist_delta.assists, 1);
}
