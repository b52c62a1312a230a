//! In-memory store: one mutex per competition, copy-on-write transactions.

use crate::models::{
    Competition, CompetitionId, Contester, ContesterId, Match, MatchId, StandingsError,
};
use crate::store::{Store, Transaction};
use std::collections::HashMap;
use std::sync::{Arc, Mutex, RwLock};

/// Everything owned by one competition.
#[derive(Clone, Debug)]
struct CompetitionData {
    competition: Competition,
    contesters: HashMap<ContesterId, Contester>,
    matches: HashMap<MatchId, Match>,
}

/// Competitions kept in memory. Transactions on different competitions run in parallel.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    competitions: RwLock<HashMap<CompetitionId, Arc<Mutex<CompetitionData>>>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ids of every stored competition.
    pub fn competition_ids(&self) -> Vec<CompetitionId> {
        self.competitions
            .read()
            .map(|g| g.keys().copied().collect())
            .unwrap_or_default()
    }

    fn entry(&self, id: CompetitionId) -> Result<Arc<Mutex<CompetitionData>>, StandingsError> {
        let g = self
            .competitions
            .read()
            .map_err(|_| StandingsError::Storage("store lock poisoned".to_string()))?;
        g.get(&id)
            .cloned()
            .ok_or(StandingsError::CompetitionNotFound(id))
    }
}

impl Store for InMemoryStore {
    fn insert_competition(&self, competition: Competition) -> Result<(), StandingsError> {
        let mut g = self
            .competitions
            .write()
            .map_err(|_| StandingsError::Storage("store lock poisoned".to_string()))?;
        if g.contains_key(&competition.id) {
            return Err(StandingsError::Validation(
                "competition already exists".to_string(),
            ));
        }
        let id = competition.id;
        let data = CompetitionData {
            competition,
            contesters: HashMap::new(),
            matches: HashMap::new(),
        };
        g.insert(id, Arc::new(Mutex::new(data)));
        Ok(())
    }

    fn remove_competition(&self, id: CompetitionId) -> Result<(), StandingsError> {
        let mut g = self
            .competitions
            .write()
            .map_err(|_| StandingsError::Storage("store lock poisoned".to_string()))?;
        g.remove(&id)
            .map(|_| ())
            .ok_or(StandingsError::CompetitionNotFound(id))
    }

    fn in_transaction<R, F>(&self, competition: CompetitionId, f: F) -> Result<R, StandingsError>
    where
        F: FnOnce(&mut dyn Transaction) -> Result<R, StandingsError>,
    {
        let entry = self.entry(competition)?;
        let mut committed = entry
            .lock()
            .map_err(|_| StandingsError::Storage("competition lock poisoned".to_string()))?;
        let mut working = MemoryTransaction {
            data: committed.clone(),
        };
        let out = f(&mut working)?;
        *committed = working.data;
        Ok(out)
    }
}

struct MemoryTransaction {
    data: CompetitionData,
}

impl Transaction for MemoryTransaction {
    fn competition(&self) -> &Competition {
        &self.data.competition
    }

    fn load_match(&self, id: MatchId) -> Result<Match, StandingsError> {
        self.data
            .matches
            .get(&id)
            .cloned()
            .ok_or(StandingsError::MatchNotFound(id))
    }

    fn save_match(&mut self, game: &Match) -> Result<(), StandingsError> {
        if game.competition_id != self.data.competition.id {
            return Err(StandingsError::Validation(
                "match belongs to another competition".to_string(),
            ));
        }
        self.data.matches.insert(game.id, game.clone());
        Ok(())
    }

    fn remove_match(&mut self, id: MatchId) -> Result<(), StandingsError> {
        self.data
            .matches
            .remove(&id)
            .map(|_| ())
            .ok_or(StandingsError::MatchNotFound(id))
    }

    fn load_contester(&self, id: ContesterId) -> Result<Contester, StandingsError> {
        self.data
            .contesters
            .get(&id)
            .cloned()
            .ok_or(StandingsError::ContesterNotFound(id))
    }

    fn save_contester(&mut self, contester: &Contester) -> Result<(), StandingsError> {
        if contester.competition_id != self.data.competition.id {
            return Err(StandingsError::Validation(
                "contester belongs to another competition".to_string(),
            ));
        }
        self.data.contesters.insert(contester.id, contester.clone());
        Ok(())
    }

    fn remove_contester(&mut self, id: ContesterId) -> Result<(), StandingsError> {
        self.data
            .contesters
            .remove(&id)
            .map(|_| ())
            .ok_or(StandingsError::ContesterNotFound(id))
    }

    fn matches(&self) -> Vec<Match> {
        let mut matches: Vec<Match> = self.data.matches.values().cloned().collect();
        matches.sort_by_key(|m| (m.scheduled_time, m.id));
        matches
    }

    fn contesters(&self) -> Vec<Contester> {
        let mut contesters: Vec<Contester> = self.data.contesters.values().cloned().collect();
        contesters.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));
        contesters
    }
}
