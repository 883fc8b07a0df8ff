// src/clock/engine.rs
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use sqlx::PgPool;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::clock::state::{ClockCheckpoint, ClockState, TickOutcome};
use crate::error::MatchError;
use crate::models::match_record::ClockReading;

/// Where clock checkpoints are persisted. Injected so the tick loop can be
/// exercised against a recording fake in tests.
pub trait CheckpointSink: Send + Sync + 'static {
    fn save_checkpoint(
        &self,
        match_id: Uuid,
        checkpoint: ClockCheckpoint,
    ) -> impl Future<Output = Result<(), MatchError>> + Send;
}

/// Checkpoint sink backed by the matches table. Partial-field update only;
/// the guard on status keeps a stale tick from touching a finished match.
#[derive(Debug, Clone)]
pub struct PgCheckpointSink {
    pool: PgPool,
}

impl PgCheckpointSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

impl CheckpointSink for PgCheckpointSink {
    async fn save_checkpoint(
        &self,
        match_id: Uuid,
        checkpoint: ClockCheckpoint,
    ) -> Result<(), MatchError> {
        sqlx::query(
            "UPDATE matches \
             SET current_minute = $2, current_half = $3, updated_at = NOW() \
             WHERE id = $1 AND status = 'live'",
        )
        .bind(match_id)
        .bind(checkpoint.minute as i32)
        .bind(checkpoint.half as i16)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Signals the clock raises for the lifecycle layer to act on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClockSignal {
    FirstHalfEnded { match_id: Uuid },
    FullTimeReached { match_id: Uuid },
    HalftimeBreakElapsed { match_id: Uuid },
}

struct RunningClock {
    state: Arc<Mutex<ClockState>>,
    handle: JoinHandle<()>,
}

/// Owns one tick loop per live match. All mutation goes through the per-match
/// `ClockState`; the manager itself only tracks which clocks exist.
pub struct ClockManager<S: CheckpointSink> {
    sink: Arc<S>,
    signals: mpsc::Sender<ClockSignal>,
    clocks: Mutex<HashMap<Uuid, RunningClock>>,
    half_length: u32,
}

impl<S: CheckpointSink> ClockManager<S> {
    pub fn new(sink: S, signals: mpsc::Sender<ClockSignal>, half_length: u32) -> Self {
        Self {
            sink: Arc::new(sink),
            signals,
            clocks: Mutex::new(HashMap::new()),
            half_length,
        }
    }

    /// Start (or restart) the clock for a match. Cancels any loop already
    /// running for it and writes an immediate checkpoint.
    pub async fn start(&self, match_id: Uuid, start_minute: u32, half: u8) {
        let now = Utc::now();
        let mut state = ClockState::start(start_minute, half, self.half_length, now);

        if let Err(e) = self
            .sink
            .save_checkpoint(match_id, state.checkpoint())
            .await
        {
            warn!("Initial checkpoint save failed for match {}: {}", match_id, e);
        }
        state.mark_saved(now);

        let shared = Arc::new(Mutex::new(state));
        let handle = tokio::spawn(run_tick_loop(
            match_id,
            shared.clone(),
            self.sink.clone(),
            self.signals.clone(),
        ));

        let mut clocks = self.clocks.lock().await;
        if let Some(previous) = clocks.insert(match_id, RunningClock { state: shared, handle }) {
            previous.handle.abort();
        }
        info!(
            "Clock started for match {} at minute {} of half {}",
            match_id, start_minute, half
        );
    }

    /// Start the clock from a persisted checkpoint unless one is already
    /// running for this match. Returns true when a clock was started.
    pub async fn resume(&self, match_id: Uuid, minute: u32, half: u8) -> bool {
        {
            let clocks = self.clocks.lock().await;
            if clocks.contains_key(&match_id) {
                debug!("Clock already running for match {}, not resuming", match_id);
                return false;
            }
        }
        self.start(match_id, minute, half).await;
        true
    }

    /// Stop the clock and force a checkpoint write regardless of the
    /// throttle. Returns the final reading, if a clock was running.
    pub async fn stop(&self, match_id: Uuid) -> Option<ClockCheckpoint> {
        let removed = self.clocks.lock().await.remove(&match_id)?;
        removed.handle.abort();

        let checkpoint = {
            let mut state = removed.state.lock().await;
            state.stop();
            state.checkpoint()
        };
        if let Err(e) = self.sink.save_checkpoint(match_id, checkpoint).await {
            warn!("Final checkpoint save failed for match {}: {}", match_id, e);
        }
        info!("Clock stopped for match {} at {:?}", match_id, checkpoint);
        Some(checkpoint)
    }

    /// Drop a clock whose loop already ended. No checkpoint write; the
    /// transition that follows persists the authoritative minute.
    pub async fn discard(&self, match_id: Uuid) {
        if let Some(removed) = self.clocks.lock().await.remove(&match_id) {
            removed.handle.abort();
        }
    }

    pub async fn reading(&self, match_id: Uuid) -> Option<ClockReading> {
        let clocks = self.clocks.lock().await;
        let running = clocks.get(&match_id)?;
        let state = running.state.lock().await;
        Some(ClockReading {
            minutes: state.minutes,
            seconds: state.seconds,
            half: state.half,
            running: state.running,
        })
    }

    pub async fn is_running(&self, match_id: Uuid) -> bool {
        self.clocks.lock().await.contains_key(&match_id)
    }
}

/// One iteration per second. Persistence failures are logged and swallowed
/// so a flaky store never kills the loop; the half-end signal is the only
/// way out besides cancellation.
async fn run_tick_loop<S: CheckpointSink>(
    match_id: Uuid,
    state: Arc<Mutex<ClockState>>,
    sink: Arc<S>,
    signals: mpsc::Sender<ClockSignal>,
) {
    let mut interval = tokio::time::interval(Duration::from_secs(1));
    interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        interval.tick().await;
        let now = Utc::now();

        let (outcome, checkpoint, persist) = {
            let mut state = state.lock().await;
            let outcome = state.tick(now);
            let persist = match outcome {
                TickOutcome::Advanced { crossed_minute } => {
                    (crossed_minute && state.should_persist(now)) || state.background_save_due(now)
                }
                // Half end always flushes, throttle or not.
                _ => true,
            };
            if persist {
                state.mark_saved(now);
            }
            (outcome, state.checkpoint(), persist)
        };

        if persist {
            if let Err(e) = sink.save_checkpoint(match_id, checkpoint).await {
                warn!("Checkpoint save failed for match {}: {}", match_id, e);
            }
        }

        match outcome {
            TickOutcome::Advanced { .. } => {}
            TickOutcome::FirstHalfEnded => {
                let _ = signals.send(ClockSignal::FirstHalfEnded { match_id }).await;
                break;
            }
            TickOutcome::FullTimeReached => {
                let _ = signals
                    .send(ClockSignal::FullTimeReached { match_id })
                    .await;
                break;
            }
        }
    }
}
