//! League standings engine: match results applied to contester ledgers for bracket, league
//! and ladder competitions, reversibly.

pub mod logic;
pub mod models;
pub mod services;
pub mod store;

pub use logic::{
    can_create, can_destroy, can_mutate, can_propose, strategy_for, Caller, FieldChange,
    MatchParties, ResultController, ScoringStrategy, Sign, Standings, StandingsMismatch,
};
pub use models::{
    Actor, AppliedSnapshot, Competition, CompetitionId, Contester, ContesterId, Match, MatchId,
    MatchScore, NewMatch, Role, ScoreState, ScoringMode, Side, StandingsError, TeamId, Trend,
    UserId,
};
pub use store::{InMemoryStore, Store, Transaction};
