pub mod engine;
pub mod state;

pub use engine::{CheckpointSink, ClockManager, ClockSignal, PgCheckpointSink};
pub use state::{ClockCheckpoint, ClockState, TickOutcome};
