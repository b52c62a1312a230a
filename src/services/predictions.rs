//! Score predictions made by users before a match.

use crate::models::{MatchId, MatchScore, UserId};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::RwLock;

/// One user's predicted score for a match.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    pub user: UserId,
    pub score1: u8,
    pub score2: u8,
    /// Set once the match is finished with exactly this score.
    pub correct: bool,
}

/// Stores predictions and marks them against final scores. `mark_result` and `clear_result`
/// must be idempotent.
pub trait PredictionService: Send + Sync {
    /// Record (or replace) a user's prediction for a match.
    fn predict(&self, match_id: MatchId, user: UserId, score: MatchScore);
    fn predictions(&self, match_id: MatchId) -> Vec<Prediction>;
    fn mark_result(&self, match_id: MatchId, score: MatchScore);
    fn clear_result(&self, match_id: MatchId);
}

/// In-memory prediction store.
#[derive(Debug, Default)]
pub struct PredictionBook {
    entries: RwLock<HashMap<MatchId, Vec<Prediction>>>,
}

impl PredictionBook {
    pub fn new() -> Self {
        Self::default()
    }
}

impl PredictionService for PredictionBook {
    fn predict(&self, match_id: MatchId, user: UserId, score: MatchScore) {
        let mut g = match self.entries.write() {
            Ok(guard) => guard,
            Err(_) => {
                log::warn!("Prediction book lock poisoned, dropping prediction");
                return;
            }
        };
        let list = g.entry(match_id).or_default();
        list.retain(|p| p.user != user);
        list.push(Prediction {
            user,
            score1: score.score1,
            score2: score.score2,
            correct: false,
        });
    }

    fn predictions(&self, match_id: MatchId) -> Vec<Prediction> {
        self.entries
            .read()
            .ok()
            .and_then(|g| g.get(&match_id).cloned())
            .unwrap_or_default()
    }

    fn mark_result(&self, match_id: MatchId, score: MatchScore) {
        let Ok(mut g) = self.entries.write() else {
            log::warn!("Prediction book lock poisoned, result for {} not marked", match_id);
            return;
        };
        if let Some(list) = g.get_mut(&match_id) {
            for p in list.iter_mut() {
                p.correct = p.score1 == score.score1 && p.score2 == score.score2;
            }
        }
    }

    fn clear_result(&self, match_id: MatchId) {
        let Ok(mut g) = self.entries.write() else {
            log::warn!("Prediction book lock poisoned, result for {} not cleared", match_id);
            return;
        };
        if let Some(list) = g.get_mut(&match_id) {
            for p in list.iter_mut() {
                p.correct = false;
            }
        }
    }
}
