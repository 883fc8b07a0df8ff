pub mod health_handler;
pub mod matches;
