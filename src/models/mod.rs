pub mod match_record;
pub mod stats;
pub mod team;
pub mod user;
pub mod wire_events;
