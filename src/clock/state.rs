// src/clock/state.rs
use chrono::{DateTime, Duration, Utc};

/// Hard ceiling on how much wall-clock time a single tick may credit.
/// Absorbs tab suspension / system sleep without over-crediting.
pub const MAX_TICK_DELTA_SECONDS: i64 = 10;

/// A checkpoint for the same `(minute, half)` is written at most once per
/// this window.
pub const CHECKPOINT_THROTTLE_SECONDS: i64 = 5;

/// Unconditional background save interval while the clock is running.
pub const BACKGROUND_SAVE_SECONDS: i64 = 30;

pub const DEFAULT_HALF_LENGTH_MINUTES: u32 = 20;
pub const DEFAULT_HALFTIME_BREAK_MINUTES: u32 = 5;

/// The `(minute, half)` snapshot persisted to the match record so a reload
/// resumes at the correct time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ClockCheckpoint {
    pub minute: u32,
    pub half: u8,
}

/// What a single tick produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    /// Clock advanced normally. `crossed_minute` is true when a whole-minute
    /// boundary was passed, which is the cue to persist a checkpoint.
    Advanced { crossed_minute: bool },
    /// Half length reached in half 1. Clock has stopped itself.
    FirstHalfEnded,
    /// Half length reached in half 2. Clock has stopped itself.
    FullTimeReached,
}

/// In-memory state of one match's stopwatch.
///
/// All time arithmetic takes `now` as a parameter so the state can be
/// driven with synthetic timestamps in tests. Minutes are non-decreasing
/// within a half; `start` is the only way to reset them.
#[derive(Debug, Clone)]
pub struct ClockState {
    pub minutes: u32,
    pub seconds: u32,
    pub half: u8,
    pub running: bool,
    half_length: u32,
    last_tick: DateTime<Utc>,
    last_saved: Option<(ClockCheckpoint, DateTime<Utc>)>,
    last_unconditional_save: DateTime<Utc>,
}

impl ClockState {
    pub fn start(start_minute: u32, half: u8, half_length: u32, now: DateTime<Utc>) -> Self {
        Self {
            minutes: start_minute.min(half_length),
            seconds: 0,
            half,
            running: true,
            half_length,
            last_tick: now,
            last_saved: None,
            last_unconditional_save: now,
        }
    }

    /// Advance the clock by the clamped wall-clock delta since the last tick.
    pub fn tick(&mut self, now: DateTime<Utc>) -> TickOutcome {
        if !self.running {
            return TickOutcome::Advanced {
                crossed_minute: false,
            };
        }

        let delta = (now - self.last_tick)
            .num_seconds()
            .clamp(0, MAX_TICK_DELTA_SECONDS) as u32;
        self.last_tick = now;

        let mut crossed_minute = false;
        self.seconds += delta;
        while self.seconds >= 60 {
            self.seconds -= 60;
            self.minutes += 1;
            crossed_minute = true;
        }

        if self.minutes >= self.half_length {
            self.minutes = self.half_length;
            self.seconds = 0;
            self.running = false;
            return if self.half == 1 {
                TickOutcome::FirstHalfEnded
            } else {
                TickOutcome::FullTimeReached
            };
        }

        TickOutcome::Advanced { crossed_minute }
    }

    pub fn stop(&mut self) {
        self.running = false;
    }

    pub fn checkpoint(&self) -> ClockCheckpoint {
        ClockCheckpoint {
            minute: self.minutes,
            half: self.half,
        }
    }

    /// Whether a checkpoint write is allowed right now. Skips the write when
    /// the identical `(minute, half)` was saved within the throttle window.
    pub fn should_persist(&self, now: DateTime<Utc>) -> bool {
        match self.last_saved {
            Some((saved, at)) => {
                saved != self.checkpoint()
                    || now - at >= Duration::seconds(CHECKPOINT_THROTTLE_SECONDS)
            }
            None => true,
        }
    }

    /// Whether the periodic unconditional save is due.
    pub fn background_save_due(&self, now: DateTime<Utc>) -> bool {
        now - self.last_unconditional_save >= Duration::seconds(BACKGROUND_SAVE_SECONDS)
    }

    pub fn mark_saved(&mut self, now: DateTime<Utc>) {
        self.last_saved = Some((self.checkpoint(), now));
        self.last_unconditional_save = now;
    }

    /// Display form, e.g. `07:42`.
    pub fn display(&self) -> String {
        format!("{:02}:{:02}", self.minutes, self.seconds)
    }
}
