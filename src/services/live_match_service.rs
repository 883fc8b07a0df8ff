// src/services/live_match_service.rs
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use redis::AsyncCommands;
use sqlx::PgPool;
use tokio::sync::mpsc;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::clock::{ClockManager, ClockSignal, PgCheckpointSink};
use crate::config::settings::MatchPlaySettings;
use crate::db::match_queries::MatchQueries;
use crate::db::roster_queries::RosterQueries;
use crate::error::MatchError;
use crate::matches::ledger;
use crate::matches::lifecycle::{self, MatchAction};
use crate::matches::settlement::{SettlementService, SettlementSummary};
use crate::middleware::auth::Claims;
use crate::models::match_record::{
    LiveMatchResponse, Match, MatchEvent, MatchEventKind, RecordEventRequest, RequestedEventType,
};
use crate::models::wire_events::MatchWireEvent;

pub type AppClockManager = ClockManager<PgCheckpointSink>;

const GLOBAL_CHANNEL: &str = "match:events:global";

/// Result of ending a match: the transition always lands; settlement may
/// fail independently and is reported rather than rolled into the error.
#[derive(Debug, serde::Serialize)]
pub struct MatchCompletion {
    pub match_record: Match,
    pub settlement: Option<SettlementSummary>,
    pub settlement_error: Option<String>,
}

/// Orchestrates the live-match session: lifecycle transitions, the clock,
/// ledger appends and settlement, plus Redis fan-out of every change.
#[derive(Clone)]
pub struct LiveMatchService {
    queries: MatchQueries,
    rosters: RosterQueries,
    settlement: SettlementService,
    clock: Arc<AppClockManager>,
    redis_client: Option<Arc<redis::Client>>,
    timing: MatchPlaySettings,
    signals: mpsc::Sender<ClockSignal>,
}

impl LiveMatchService {
    pub fn new(
        pool: PgPool,
        redis_client: Option<Arc<redis::Client>>,
        timing: MatchPlaySettings,
    ) -> (Self, mpsc::Receiver<ClockSignal>) {
        let (signal_tx, signal_rx) = mpsc::channel(64);
        let clock = Arc::new(ClockManager::new(
            PgCheckpointSink::new(pool.clone()),
            signal_tx.clone(),
            timing.half_length_minutes,
        ));
        let service = Self {
            queries: MatchQueries::new(pool.clone()),
            rosters: RosterQueries::new(pool.clone()),
            settlement: SettlementService::new(pool),
            clock,
            redis_client,
            timing,
            signals: signal_tx,
        };
        (service, signal_rx)
    }

    /// Drain clock signals on a background task. Call once at startup.
    pub fn spawn_signal_listener(&self, mut signal_rx: mpsc::Receiver<ClockSignal>) {
        let service = self.clone();
        tokio::spawn(async move {
            while let Some(signal) = signal_rx.recv().await {
                service.handle_clock_signal(signal).await;
            }
        });
    }

    /// Restart clocks for matches that were live when the process stopped.
    /// Idempotent: already-running clocks are left alone.
    pub async fn resume_live_matches(&self) -> Result<usize, MatchError> {
        let live = self.queries.get_live_matches().await?;
        let mut resumed = 0;
        for m in live {
            if self
                .clock
                .resume(m.id, m.current_minute.max(0) as u32, m.current_half as u8)
                .await
            {
                resumed += 1;
            }
        }
        if resumed > 0 {
            info!("Resumed {} live match clock(s) from checkpoints", resumed);
        }
        Ok(resumed)
    }

    pub async fn start_match(&self, claims: &Claims, match_id: Uuid) -> Result<Match, MatchError> {
        let m = self.authorize(claims, match_id).await?;
        lifecycle::validate_transition(m.status, m.current_half, MatchAction::StartMatch)?;

        let updated = self
            .queries
            .start_match(match_id)
            .await?
            .ok_or(MatchError::InvalidTransition {
                current: m.status,
                action: MatchAction::StartMatch.as_str(),
            })?;

        self.clock.start(match_id, 0, 1).await;
        self.broadcast_status(&updated).await;
        info!(
            "Match {} started: {} vs {}",
            match_id, updated.home_team_name, updated.away_team_name
        );
        Ok(updated)
    }

    pub async fn end_first_half(
        &self,
        claims: &Claims,
        match_id: Uuid,
    ) -> Result<Match, MatchError> {
        let m = self.authorize(claims, match_id).await?;
        lifecycle::validate_transition(m.status, m.current_half, MatchAction::EndFirstHalf)?;

        self.clock.stop(match_id).await;
        let updated = self
            .queries
            .move_to_halftime(match_id, self.timing.half_length_minutes as i32)
            .await?
            .ok_or(MatchError::InvalidTransition {
                current: m.status,
                action: MatchAction::EndFirstHalf.as_str(),
            })?;

        self.schedule_second_half(match_id);
        self.broadcast_status(&updated).await;
        Ok(updated)
    }

    pub async fn start_second_half(
        &self,
        claims: &Claims,
        match_id: Uuid,
    ) -> Result<Match, MatchError> {
        self.authorize(claims, match_id).await?;
        self.begin_second_half(match_id).await
    }

    /// Full time. The match is finished first; settlement runs afterwards
    /// and its failure leaves the match finished-but-unsettled for a manual
    /// retry.
    pub async fn end_match(
        &self,
        claims: &Claims,
        match_id: Uuid,
    ) -> Result<MatchCompletion, MatchError> {
        let m = self.authorize(claims, match_id).await?;
        lifecycle::validate_transition(m.status, m.current_half, MatchAction::EndMatch)?;

        self.clock.stop(match_id).await;
        let updated = self
            .queries
            .finish_match(match_id)
            .await?
            .ok_or(MatchError::InvalidTransition {
                current: m.status,
                action: MatchAction::EndMatch.as_str(),
            })?;
        self.broadcast_status(&updated).await;

        match self.settlement.settle(match_id).await {
            Ok(summary) => {
                self.broadcast_settled(&updated, &summary).await;
                Ok(MatchCompletion {
                    match_record: updated,
                    settlement: Some(summary),
                    settlement_error: None,
                })
            }
            Err(e) => {
                error!(
                    "Settlement failed for match {}: {}. Match stays finished with unsettled aggregates.",
                    match_id, e
                );
                Ok(MatchCompletion {
                    match_record: updated,
                    settlement: None,
                    settlement_error: Some(e.to_string()),
                })
            }
        }
    }

    /// Append an event to a live match's ledger.
    pub async fn record_event(
        &self,
        claims: &Claims,
        match_id: Uuid,
        request: RecordEventRequest,
    ) -> Result<(Match, MatchEvent), MatchError> {
        let m = self.authorize(claims, match_id).await?;
        lifecycle::ensure_live(&m)?;

        let player_id = request.player_id.ok_or_else(|| {
            MatchError::Validation("an acting player must be selected".to_string())
        })?;

        let player = self
            .rosters
            .find_player(m.home_team_id, m.away_team_id, player_id)
            .await?
            .ok_or_else(|| {
                MatchError::Validation("acting player is not on either roster".to_string())
            })?;

        let kind = match request.event_type {
            RequestedEventType::Goal => {
                let assist = match request.assist_player_id {
                    Some(assist_id) => Some(
                        self.rosters
                            .find_player(m.home_team_id, m.away_team_id, assist_id)
                            .await?
                            .ok_or_else(|| {
                                MatchError::Validation(
                                    "assisting player is not on either roster".to_string(),
                                )
                            })?,
                    ),
                    None => None,
                };
                MatchEventKind::Goal {
                    assist_player_id: assist.as_ref().map(|p| p.id),
                    assist_player_name: assist.map(|p| p.display_name),
                }
            }
            RequestedEventType::YellowCard => MatchEventKind::YellowCard,
            RequestedEventType::RedCard => MatchEventKind::RedCard,
            RequestedEventType::Substitution => MatchEventKind::Substitution,
        };

        // Minute and half come from the clock reading, not wall clock; the
        // persisted checkpoint covers the case where no local clock runs.
        let (minute, half) = match self.clock.reading(match_id).await {
            Some(reading) => (reading.minutes as i32, reading.half as i16),
            None => (m.current_minute, m.current_half),
        };

        let event = MatchEvent {
            id: Uuid::new_v4(),
            match_id,
            team_id: player.team_id,
            player_id: player.id,
            player_name: player.display_name.clone(),
            minute,
            half,
            occurred_at: Utc::now(),
            kind,
        };

        let (home_delta, away_delta) = ledger::goal_increment(&event, m.home_team_id);
        let updated = self.queries.append_event(&event, home_delta, away_delta).await?;

        if event.is_goal() {
            self.broadcast_score(&updated, &event).await;
        }
        Ok((updated, event))
    }

    /// Manual settlement retry for a finished match.
    pub async fn settle_match(&self, match_id: Uuid) -> Result<SettlementSummary, MatchError> {
        let m = self.load_match(match_id).await?;
        let summary = self.settlement.settle(match_id).await?;
        self.broadcast_settled(&m, &summary).await;
        Ok(summary)
    }

    /// Everything the live-match page needs in one response.
    pub async fn get_live_match(&self, match_id: Uuid) -> Result<LiveMatchResponse, MatchError> {
        let m = self.load_match(match_id).await?;
        let mut events = self.queries.get_events(match_id).await?;
        ledger::sort_for_display(&mut events);
        let timeline = ledger::reconstruct_timeline(&events, m.home_team_id);
        let (home_roster, away_roster) = self
            .rosters
            .get_rosters(m.home_team_id, m.away_team_id)
            .await?;
        let clock = self.clock.reading(match_id).await;
        Ok(LiveMatchResponse {
            match_record: m,
            timeline,
            home_roster,
            away_roster,
            clock,
        })
    }

    async fn load_match(&self, match_id: Uuid) -> Result<Match, MatchError> {
        self.queries
            .get_match(match_id)
            .await?
            .ok_or(MatchError::MatchNotFound(match_id))
    }

    /// Load the match and reject the call before any write when the
    /// operator may not manage it.
    async fn authorize(&self, claims: &Claims, match_id: Uuid) -> Result<Match, MatchError> {
        let m = self.load_match(match_id).await?;
        let home = self
            .rosters
            .get_team(m.home_team_id)
            .await?
            .ok_or(MatchError::TeamRecordMissing(m.home_team_id))?;
        let away = self
            .rosters
            .get_team(m.away_team_id)
            .await?
            .ok_or(MatchError::TeamRecordMissing(m.away_team_id))?;
        lifecycle::ensure_can_manage(claims, home.manager_id, away.manager_id)?;
        Ok(m)
    }

    /// Clock- and timer-driven transitions. Losing a race against an
    /// operator action is expected and only logged.
    async fn handle_clock_signal(&self, signal: ClockSignal) {
        match signal {
            ClockSignal::FirstHalfEnded { match_id } => {
                self.clock.discard(match_id).await;
                match self
                    .queries
                    .move_to_halftime(match_id, self.timing.half_length_minutes as i32)
                    .await
                {
                    Ok(Some(updated)) => {
                        info!("Match {} reached halftime on the clock", match_id);
                        self.schedule_second_half(match_id);
                        self.broadcast_status(&updated).await;
                    }
                    Ok(None) => debug!("Match {} already past half 1, ignoring clock", match_id),
                    Err(e) => error!("Failed to persist halftime for match {}: {}", match_id, e),
                }
            }
            ClockSignal::FullTimeReached { match_id } => {
                self.clock.discard(match_id).await;
                match self.queries.finish_match(match_id).await {
                    Ok(Some(updated)) => {
                        info!("Match {} reached full time on the clock", match_id);
                        self.broadcast_status(&updated).await;
                        match self.settlement.settle(match_id).await {
                            Ok(summary) => self.broadcast_settled(&updated, &summary).await,
                            Err(e) => error!(
                                "Settlement failed for match {}: {}. Retry via the admin endpoint.",
                                match_id, e
                            ),
                        }
                    }
                    Ok(None) => debug!("Match {} already finished, ignoring clock", match_id),
                    Err(e) => error!("Failed to persist full time for match {}: {}", match_id, e),
                }
            }
            ClockSignal::HalftimeBreakElapsed { match_id } => {
                match self.begin_second_half(match_id).await {
                    Ok(_) => info!("Match {} second half started after the break", match_id),
                    Err(MatchError::InvalidTransition { .. }) => {
                        debug!("Match {} no longer at halftime, break timer ignored", match_id)
                    }
                    Err(e) => error!(
                        "Failed to start second half for match {}: {}",
                        match_id, e
                    ),
                }
            }
        }
    }

    async fn begin_second_half(&self, match_id: Uuid) -> Result<Match, MatchError> {
        let m = self.load_match(match_id).await?;
        lifecycle::validate_transition(m.status, m.current_half, MatchAction::StartSecondHalf)?;

        let updated = self
            .queries
            .begin_second_half(match_id)
            .await?
            .ok_or(MatchError::InvalidTransition {
                current: m.status,
                action: MatchAction::StartSecondHalf.as_str(),
            })?;

        self.clock.start(match_id, 0, 2).await;
        self.broadcast_status(&updated).await;
        Ok(updated)
    }

    fn schedule_second_half(&self, match_id: Uuid) {
        let signals = self.signals.clone();
        let break_minutes = self.timing.halftime_break_minutes;
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(u64::from(break_minutes) * 60)).await;
            let _ = signals
                .send(ClockSignal::HalftimeBreakElapsed { match_id })
                .await;
        });
    }

    pub fn clock(&self) -> &Arc<AppClockManager> {
        &self.clock
    }

    async fn broadcast_status(&self, m: &Match) {
        let event = MatchWireEvent::StatusChanged {
            match_id: m.id,
            tournament_id: m.tournament_id,
            status: m.status,
            current_minute: m.current_minute,
            current_half: m.current_half,
            changed_at: Utc::now(),
        };
        if let Err(e) = self.publish(&event).await {
            error!("Failed to broadcast status change for match {}: {}", m.id, e);
        }
    }

    async fn broadcast_score(&self, m: &Match, scored: &MatchEvent) {
        let event = MatchWireEvent::ScoreUpdate {
            match_id: m.id,
            home_team_id: m.home_team_id,
            home_team_name: m.home_team_name.clone(),
            away_team_id: m.away_team_id,
            away_team_name: m.away_team_name.clone(),
            home_score: m.home_score,
            away_score: m.away_score,
            scorer_id: scored.player_id,
            scorer_name: scored.player_name.clone(),
            minute: scored.minute,
            half: scored.half,
            updated_at: m.updated_at,
        };
        if let Err(e) = self.publish(&event).await {
            error!("Failed to broadcast score update for match {}: {}", m.id, e);
        }
    }

    async fn broadcast_settled(&self, m: &Match, summary: &SettlementSummary) {
        let event = MatchWireEvent::MatchSettled {
            match_id: m.id,
            tournament_id: m.tournament_id,
            home_team_id: m.home_team_id,
            away_team_id: m.away_team_id,
            home_score: m.home_score,
            away_score: m.away_score,
            players_updated: summary.players_updated,
            settled_at: Utc::now(),
        };
        if let Err(e) = self.publish(&event).await {
            error!("Failed to broadcast settlement for match {}: {}", m.id, e);
        }
    }

    async fn publish(
        &self,
        event: &MatchWireEvent,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        let Some(redis_client) = &self.redis_client else {
            return Ok(());
        };
        let mut conn = redis_client.get_async_connection().await?;
        let message = serde_json::to_string(event)?;
        let receivers: i32 = conn.publish(GLOBAL_CHANNEL, message).await?;
        debug!("Published match event to {} subscribers", receivers);
        Ok(())
    }
}
