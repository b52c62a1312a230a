//! Standings business logic: scoring modes, the result controller and the access policy.

pub mod access;
mod results;
pub mod scoring;
mod standings;

pub use access::{can_create, can_destroy, can_mutate, can_propose, FieldChange, MatchParties};
pub use results::{Caller, ResultController};
pub use scoring::{
    strategy_for, BracketScoring, LadderScoring, LeagueScoring, ScoringStrategy, Sign,
};
pub use standings::{audit, is_frozen, order_table, Standings, StandingsMismatch};
