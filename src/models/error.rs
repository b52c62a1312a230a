//! Errors raised by the standings engine.

use crate::models::competition::CompetitionId;
use crate::models::contester::ContesterId;
use crate::models::game::{MatchId, ScoreState};

/// Errors that can occur while mutating match results and standings.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum StandingsError {
    /// Malformed or out-of-range input. Rejected before any state change.
    Validation(String),
    /// The access policy denied the requested change.
    Unauthorized,
    /// No recorder could be reserved for the match.
    RecorderUnavailable,
    /// A ledger ended up inconsistent with the matches it has played.
    InvariantViolation(String),
    /// The requested score transition does not start from the match's current state.
    InvalidTransition { from: ScoreState, to: ScoreState },
    CompetitionNotFound(CompetitionId),
    ContesterNotFound(ContesterId),
    MatchNotFound(MatchId),
    /// Persistence layer failure.
    Storage(String),
}

impl std::fmt::Display for StandingsError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StandingsError::Validation(msg) => write!(f, "Invalid input: {}", msg),
            StandingsError::Unauthorized => write!(f, "Not allowed to change this match"),
            StandingsError::RecorderUnavailable => write!(f, "No recorder is available for this match"),
            StandingsError::InvariantViolation(msg) => write!(f, "Standings invariant violated: {}", msg),
            StandingsError::InvalidTransition { from, to } => {
                write!(f, "Cannot move score from {:?} to {:?}", from, to)
            }
            StandingsError::CompetitionNotFound(_) => write!(f, "Competition not found"),
            StandingsError::ContesterNotFound(_) => write!(f, "Contester not found"),
            StandingsError::MatchNotFound(_) => write!(f, "Match not found"),
            StandingsError::Storage(msg) => write!(f, "Storage error: {}", msg),
        }
    }
}

impl std::error::Error for StandingsError {}
