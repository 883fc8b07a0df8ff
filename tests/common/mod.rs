//! Shared builders for the pure-logic test suites. No database required.

use chrono::{TimeZone, Utc};
use uuid::Uuid;

use matchday_backend::models::match_record::{Match, MatchEvent, MatchEventKind, MatchStatus};
use matchday_backend::models::team::Team;

pub struct MatchFixture {
    pub home_team_id: Uuid,
    pub away_team_id: Uuid,
    pub tournament_id: Uuid,
}

impl MatchFixture {
    pub fn new() -> Self {
        Self {
            home_team_id: Uuid::new_v4(),
            away_team_id: Uuid::new_v4(),
            tournament_id: Uuid::new_v4(),
        }
    }

    pub fn match_record(&self, status: MatchStatus, home_score: i32, away_score: i32) -> Match {
        let now = Utc.with_ymd_and_hms(2025, 9, 6, 14, 0, 0).unwrap();
        Match {
            id: Uuid::new_v4(),
            tournament_id: self.tournament_id,
            home_team_id: self.home_team_id,
            home_team_name: "Rovers".to_string(),
            home_team_logo: None,
            away_team_id: self.away_team_id,
            away_team_name: "Wanderers".to_string(),
            away_team_logo: None,
            home_score,
            away_score,
            status,
            scheduled_time: now,
            location: Some("Pitch 2".to_string()),
            current_half: if status == MatchStatus::Scheduled { 1 } else { 2 },
            current_minute: 0,
            started_at: None,
            completed_at: None,
            settled_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn team(&self, team_id: Uuid, name: &str) -> Team {
        let now = Utc.with_ymd_and_hms(2025, 9, 1, 9, 0, 0).unwrap();
        Team {
            id: team_id,
            team_name: name.to_string(),
            sport: "football".to_string(),
            manager_id: Uuid::new_v4(),
            member_count: 11,
            logo_url: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn goal(&self, team_id: Uuid, player_id: Uuid, minute: i32, half: i16) -> MatchEvent {
        self.event(
            team_id,
            player_id,
            minute,
            half,
            MatchEventKind::Goal {
                assist_player_id: None,
                assist_player_name: None,
            },
        )
    }

    pub fn assisted_goal(
        &self,
        team_id: Uuid,
        scorer_id: Uuid,
        assist_id: Uuid,
        minute: i32,
        half: i16,
    ) -> MatchEvent {
        self.event(
            team_id,
            scorer_id,
            minute,
            half,
            MatchEventKind::Goal {
                assist_player_id: Some(assist_id),
                assist_player_name: Some(format!("Player {}", &assist_id.to_string()[..8])),
            },
        )
    }

    pub fn event(
        &self,
        team_id: Uuid,
        player_id: Uuid,
        minute: i32,
        half: i16,
        kind: MatchEventKind,
    ) -> MatchEvent {
        MatchEvent {
            id: Uuid::new_v4(),
            match_id: Uuid::new_v4(),
            team_id,
            player_id,
            player_name: format!("Player {}", &player_id.to_string()[..8]),
            minute,
            half,
            occurred_at: Utc::now(),
            kind,
        }
    }
}
