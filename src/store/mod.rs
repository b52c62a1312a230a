//! Persistence contract for competitions, contesters and matches.
//!
//! All reads and writes that touch standings happen inside [`Store::in_transaction`], which is
//! exclusive per competition and all-or-nothing: if the closure returns an error none of its
//! writes are kept.

mod memory;

use crate::models::{
    Competition, CompetitionId, Contester, ContesterId, Match, MatchId, StandingsError,
};

pub use memory::InMemoryStore;

/// Reads and writes scoped to one competition inside one transaction.
pub trait Transaction {
    fn competition(&self) -> &Competition;
    fn load_match(&self, id: MatchId) -> Result<Match, StandingsError>;
    fn save_match(&mut self, game: &Match) -> Result<(), StandingsError>;
    fn remove_match(&mut self, id: MatchId) -> Result<(), StandingsError>;
    fn load_contester(&self, id: ContesterId) -> Result<Contester, StandingsError>;
    fn save_contester(&mut self, contester: &Contester) -> Result<(), StandingsError>;
    fn remove_contester(&mut self, id: ContesterId) -> Result<(), StandingsError>;
    /// Every match of the competition, ordered by scheduled time.
    fn matches(&self) -> Vec<Match>;
    fn contesters(&self) -> Vec<Contester>;
}

/// A transactional store of competitions.
pub trait Store: Send + Sync {
    fn insert_competition(&self, competition: Competition) -> Result<(), StandingsError>;
    fn remove_competition(&self, id: CompetitionId) -> Result<(), StandingsError>;
    /// Run `f` with exclusive access to one competition. Writes are kept only if `f` succeeds.
    fn in_transaction<R, F>(&self, competition: CompetitionId, f: F) -> Result<R, StandingsError>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<R, StandingsError>;
}
