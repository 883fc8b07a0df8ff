pub mod live_match_service;
pub mod telemetry;

pub use live_match_service::LiveMatchService;
