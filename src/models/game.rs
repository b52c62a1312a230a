//! Match, its score, and the values frozen on it when standings are applied.

use crate::models::actor::UserId;
use crate::models::competition::CompetitionId;
use crate::models::contester::{ContesterId, Trend};
use crate::models::error::StandingsError;
use crate::services::RecorderId;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a match.
pub type MatchId = Uuid;

/// Nominal length of a match in seconds. Recorder reservations are spaced by it.
pub const MATCH_LENGTH_SECS: i64 = 7200;

/// Highest score accepted for a single side.
pub const MAX_SCORE: i32 = 99;

/// Side of a match.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Side {
    #[default]
    One,
    Two,
}

/// Whether a match currently carries a score.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ScoreState {
    Unset,
    Set,
}

/// Final score of a finished match. Both sides are always present together.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq, Serialize, Deserialize)]
pub struct MatchScore {
    pub score1: u8,
    pub score2: u8,
}

impl MatchScore {
    /// Validate raw scores (0..=99 each).
    pub fn new(score1: i32, score2: i32) -> Result<Self, StandingsError> {
        Ok(Self {
            score1: checked_score(score1)?,
            score2: checked_score(score2)?,
        })
    }

    /// Build an optional score from two optional halves; one half without the other is rejected.
    pub fn from_parts(score1: Option<i32>, score2: Option<i32>) -> Result<Option<Self>, StandingsError> {
        match (score1, score2) {
            (None, None) => Ok(None),
            (Some(a), Some(b)) => Self::new(a, b).map(Some),
            _ => Err(StandingsError::Validation(
                "score1 and score2 must be set together".to_string(),
            )),
        }
    }

    /// Winning side, `None` on a draw.
    pub fn winner(&self) -> Option<Side> {
        match self.score1.cmp(&self.score2) {
            std::cmp::Ordering::Greater => Some(Side::One),
            std::cmp::Ordering::Less => Some(Side::Two),
            std::cmp::Ordering::Equal => None,
        }
    }
}

fn checked_score(value: i32) -> Result<u8, StandingsError> {
    if (0..=MAX_SCORE).contains(&value) {
        Ok(value as u8)
    } else {
        Err(StandingsError::Validation(format!(
            "score {} is outside 0..={}",
            value, MAX_SCORE
        )))
    }
}

/// What a forward application put into the ledgers. Reversal undoes exactly this, whatever the
/// match's score has become since.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AppliedSnapshot {
    /// The score whose outcome is counted in the ledgers.
    pub score: MatchScore,
    pub trend1: Trend,
    pub trend2: Trend,
    pub rank1: i32,
    pub rank2: i32,
    /// Cumulative score actually added to each side (after the league floor).
    pub score_delta1: i32,
    pub score_delta2: i32,
}

/// A scheduled or completed contest between two contesters of one competition.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Match {
    pub id: MatchId,
    pub competition_id: CompetitionId,
    pub contester1: ContesterId,
    pub contester2: ContesterId,
    pub scheduled_time: DateTime<Utc>,
    /// None if not yet played.
    pub score: Option<MatchScore>,
    pub forfeited: bool,
    /// Ladder: `side2.rank - side1.rank`, frozen at the first forward application.
    pub rank_diff: Option<i32>,
    pub points1: Option<i32>,
    pub points2: Option<i32>,
    pub snapshot: Option<AppliedSnapshot>,
    pub referee: Option<UserId>,
    pub caster: Option<UserId>,
    pub recorder: Option<RecorderId>,
    /// Attached demo file name.
    pub demo: Option<String>,
    pub report: Option<String>,
    pub stream: Option<String>,
}

impl Match {
    pub fn new(
        competition_id: CompetitionId,
        contester1: ContesterId,
        contester2: ContesterId,
        scheduled_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            competition_id,
            contester1,
            contester2,
            scheduled_time,
            score: None,
            forfeited: false,
            rank_diff: None,
            points1: None,
            points2: None,
            snapshot: None,
            referee: None,
            caster: None,
            recorder: None,
            demo: None,
            report: None,
            stream: None,
        }
    }

    pub fn score_state(&self) -> ScoreState {
        if self.score.is_some() {
            ScoreState::Set
        } else {
            ScoreState::Unset
        }
    }

    pub fn is_finished(&self) -> bool {
        self.score.is_some()
    }

    /// Score whose effect is currently in the ledgers, if any.
    pub fn applied_score(&self) -> Option<MatchScore> {
        self.snapshot.map(|s| s.score)
    }

    pub fn involves(&self, contester: ContesterId) -> bool {
        self.contester1 == contester || self.contester2 == contester
    }

    pub fn is_past(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_time < now
    }

    pub fn is_today(&self, now: DateTime<Utc>) -> bool {
        self.scheduled_time.date_naive() == now.date_naive()
    }
}

/// Nominal length of a match.
pub fn match_length() -> Duration {
    Duration::seconds(MATCH_LENGTH_SECS)
}

/// Input for creating a match.
#[derive(Clone, Debug, Deserialize)]
pub struct NewMatch {
    pub contester1: ContesterId,
    pub contester2: ContesterId,
    pub scheduled_time: DateTime<Utc>,
    #[serde(default)]
    pub score1: Option<i32>,
    #[serde(default)]
    pub score2: Option<i32>,
    #[serde(default)]
    pub referee: Option<UserId>,
    /// Pre-assign a free recorder when the match is in the future.
    #[serde(default)]
    pub managed_recording: bool,
}
