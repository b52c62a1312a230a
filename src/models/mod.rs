//! Data structures: competitions, contester ledgers, matches and actors.

mod actor;
mod competition;
mod contester;
mod error;
mod game;

pub use actor::{Actor, Role, TeamId, UserId};
pub use competition::{Competition, CompetitionId, ScoringMode};
pub use contester::{Contester, ContesterId, Trend};
pub use error::StandingsError;
pub use game::{
    match_length, AppliedSnapshot, Match, MatchId, MatchScore, NewMatch, ScoreState, Side,
    MATCH_LENGTH_SECS, MAX_SCORE,
};
