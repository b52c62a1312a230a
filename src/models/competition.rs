//! Competition and its scoring mode.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a competition.
pub type CompetitionId = Uuid;

/// How match results translate into standings. Fixed for a competition's lifetime.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoringMode {
    /// Elimination bracket: only wins/losses/draws are counted.
    Bracket,
    /// Round-robin league: scores accumulate as points.
    #[default]
    League,
    /// Ranked ladder: upsets and draws exchange ranks.
    Ladder,
}

/// A competition owning contesters and matches.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Competition {
    pub id: CompetitionId,
    pub name: String,
    pub mode: ScoringMode,
}

impl Competition {
    pub fn new(name: impl Into<String>, mode: ScoringMode) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            mode,
        }
    }
}
