pub mod ledger;
pub mod lifecycle;
pub mod settlement;
