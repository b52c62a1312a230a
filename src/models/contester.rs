//! Contester: one entrant's standings ledger within one competition.

use crate::models::actor::TeamId;
use crate::models::competition::CompetitionId;
use crate::models::error::StandingsError;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a contester (used in matches and lookups).
pub type ContesterId = Uuid;

/// Direction of the contester's most recent result.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Trend {
    Up,
    Down,
    #[default]
    Flat,
}

/// A team entered in a competition, with its aggregate standings.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Contester {
    pub id: ContesterId,
    pub competition_id: CompetitionId,
    pub team_id: TeamId,
    pub name: String,
    pub wins: u32,
    pub losses: u32,
    pub draws: u32,
    /// League points total; never pushed below zero by a forward application.
    pub cumulative_score: i32,
    /// Ladder standing. Higher is better; unused outside ladders.
    pub rank: i32,
    pub trend: Trend,
    /// Inactive contesters in a league are frozen out of the standings.
    pub active: bool,
}

impl Contester {
    /// Create an active contester with an empty ledger.
    pub fn new(competition_id: CompetitionId, team_id: TeamId, name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            competition_id,
            team_id,
            name: name.into(),
            wins: 0,
            losses: 0,
            draws: 0,
            cumulative_score: 0,
            rank: 0,
            trend: Trend::Flat,
            active: true,
        }
    }

    /// Same contester starting at the given ladder rank.
    pub fn with_rank(mut self, rank: i32) -> Self {
        self.rank = rank;
        self
    }

    /// Same contester starting with the given cumulative score.
    pub fn with_score(mut self, cumulative_score: i32) -> Self {
        self.cumulative_score = cumulative_score;
        self
    }

    pub fn record_win(&mut self, delta: i32) -> Result<(), StandingsError> {
        self.wins = shift(self.wins, delta, "wins")?;
        Ok(())
    }

    pub fn record_loss(&mut self, delta: i32) -> Result<(), StandingsError> {
        self.losses = shift(self.losses, delta, "losses")?;
        Ok(())
    }

    pub fn record_draw(&mut self, delta: i32) -> Result<(), StandingsError> {
        self.draws = shift(self.draws, delta, "draws")?;
        Ok(())
    }

    /// Add `delta` to the cumulative score, clamping the result at `floor` when given.
    /// Returns the amount actually applied.
    pub fn add_score(&mut self, delta: i32, floor: Option<i32>) -> i32 {
        let before = self.cumulative_score;
        let mut after = before.saturating_add(delta);
        if let Some(floor) = floor {
            after = after.max(floor);
        }
        self.cumulative_score = after;
        after - before
    }

    pub fn set_rank(&mut self, rank: i32) {
        self.rank = rank;
    }

    pub fn set_trend(&mut self, trend: Trend) {
        self.trend = trend;
    }

    /// Total finished matches counted in this ledger.
    pub fn games_played(&self) -> u32 {
        self.wins + self.losses + self.draws
    }
}

fn shift(counter: u32, delta: i32, what: &str) -> Result<u32, StandingsError> {
    counter.checked_add_signed(delta).ok_or_else(|| {
        StandingsError::InvariantViolation(format!("{} would drop below zero", what))
    })
}
