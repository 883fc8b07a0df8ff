pub mod live_match_handler;
