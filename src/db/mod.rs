pub mod match_queries;
pub mod roster_queries;
