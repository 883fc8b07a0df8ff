// src/matches/ledger.rs
//! Read-side derivations over the append-only event ledger.
//!
//! The stored `home_score`/`away_score` are caches; everything here
//! recomputes from the events so the two can be checked against each other.

use crate::models::match_record::{MatchEvent, TimelineEntry};
use uuid::Uuid;

/// Display order: half first, then minute. Events sharing `(half, minute)`
/// keep their insertion order (sub-minute precision is not tracked).
pub fn sort_for_display(events: &mut [MatchEvent]) {
    events.sort_by_key(|e| (e.half, e.minute));
}

/// Score derived purely from goal events, `(home, away)`.
pub fn derived_score(events: &[MatchEvent], home_team_id: Uuid) -> (i32, i32) {
    let mut home = 0;
    let mut away = 0;
    for event in events.iter().filter(|e| e.is_goal()) {
        if event.team_id == home_team_id {
            home += 1;
        } else {
            away += 1;
        }
    }
    (home, away)
}

/// Score delta a single event contributes, `(home, away)`.
pub fn goal_increment(event: &MatchEvent, home_team_id: Uuid) -> (i32, i32) {
    if !event.is_goal() {
        return (0, 0);
    }
    if event.team_id == home_team_id {
        (1, 0)
    } else {
        (0, 1)
    }
}

/// Build the timeline with the running score reconstructed at each event.
/// Expects `events` already in chronological display order; after the last
/// entry the reconstructed score equals the derived final score.
pub fn reconstruct_timeline(events: &[MatchEvent], home_team_id: Uuid) -> Vec<TimelineEntry> {
    let mut home = 0;
    let mut away = 0;
    events
        .iter()
        .map(|event| {
            let (dh, da) = goal_increment(event, home_team_id);
            home += dh;
            away += da;
            TimelineEntry {
                event: event.clone(),
                home_score: home,
                away_score: away,
            }
        })
        .collect()
}
