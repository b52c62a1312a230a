//! Scoring modes: how one match result moves the two contesters' ledgers.
//!
//! Every strategy must be exactly reversible: `apply(m, Forward)` followed by
//! `apply(m, Reverse)` leaves both ledgers as they were. The forward step freezes on the match
//! everything the reversal needs: the score it counted, the ladder `rank_diff`, pre-match ranks
//! and trends, and the league points actually added. Reversal reads only that snapshot, never
//! the match's current score.

use crate::models::{
    AppliedSnapshot, Contester, Match, MatchScore, ScoringMode, Side, StandingsError, Trend,
};

/// Direction of an application.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum Sign {
    Forward,
    Reverse,
}

impl Sign {
    pub fn delta(self) -> i32 {
        match self {
            Sign::Forward => 1,
            Sign::Reverse => -1,
        }
    }
}

/// Translates a match's score into ledger changes for one scoring mode.
pub trait ScoringStrategy: Send + Sync {
    fn mode(&self) -> ScoringMode;

    /// `Forward` counts `game.score` and records it in `game.snapshot`; an unfinished match is a
    /// no-op. `Reverse` undoes the recorded application; a match with no snapshot is a no-op.
    fn apply(
        &self,
        game: &mut Match,
        side1: &mut Contester,
        side2: &mut Contester,
        sign: Sign,
    ) -> Result<(), StandingsError>;
}

/// Elimination bracket: wins, losses and draws only.
#[derive(Clone, Copy, Debug, Default)]
pub struct BracketScoring;

/// Round-robin league: scores accumulate as points, floored at zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct LeagueScoring;

/// Ranked ladder: upsets and draws exchange ranks.
#[derive(Clone, Copy, Debug, Default)]
pub struct LadderScoring;

/// The strategy for a competition's mode.
pub fn strategy_for(mode: ScoringMode) -> &'static dyn ScoringStrategy {
    match mode {
        ScoringMode::Bracket => &BracketScoring,
        ScoringMode::League => &LeagueScoring,
        ScoringMode::Ladder => &LadderScoring,
    }
}

impl ScoringStrategy for BracketScoring {
    fn mode(&self) -> ScoringMode {
        ScoringMode::Bracket
    }

    fn apply(
        &self,
        game: &mut Match,
        side1: &mut Contester,
        side2: &mut Contester,
        sign: Sign,
    ) -> Result<(), StandingsError> {
        log::debug!("Bracket {:?} for match {}", sign, game.id);
        match sign {
            Sign::Forward => {
                let Some(score) = pending_score(game)? else {
                    return Ok(());
                };
                let snapshot = capture(score, side1, side2);
                apply_outcome(score, side1, side2, sign.delta())?;
                game.snapshot = Some(snapshot);
            }
            Sign::Reverse => {
                let Some(snapshot) = game.snapshot.take() else {
                    return Ok(());
                };
                apply_outcome(snapshot.score, side1, side2, sign.delta())?;
            }
        }
        Ok(())
    }
}

impl ScoringStrategy for LeagueScoring {
    fn mode(&self) -> ScoringMode {
        ScoringMode::League
    }

    fn apply(
        &self,
        game: &mut Match,
        side1: &mut Contester,
        side2: &mut Contester,
        sign: Sign,
    ) -> Result<(), StandingsError> {
        log::debug!("League {:?} for match {}", sign, game.id);
        match sign {
            Sign::Forward => {
                let Some(score) = pending_score(game)? else {
                    return Ok(());
                };
                let points1 = i32::from(score.score1);
                let points2 = i32::from(score.score2);
                let mut snapshot = capture(score, side1, side2);
                apply_outcome(score, side1, side2, sign.delta())?;
                snapshot.score_delta1 = side1.add_score(points1, Some(0));
                snapshot.score_delta2 = side2.add_score(points2, Some(0));
                set_trends(score, side1, side2);
                game.points1 = Some(points1);
                game.points2 = Some(points2);
                game.snapshot = Some(snapshot);
            }
            Sign::Reverse => {
                let Some(snapshot) = game.snapshot.take() else {
                    return Ok(());
                };
                apply_outcome(snapshot.score, side1, side2, sign.delta())?;
                // Subtract exactly what was added; the floor only applies going forward.
                side1.add_score(-snapshot.score_delta1, None);
                side2.add_score(-snapshot.score_delta2, None);
                side1.set_trend(snapshot.trend1);
                side2.set_trend(snapshot.trend2);
                game.points1 = None;
                game.points2 = None;
            }
        }
        Ok(())
    }
}

impl ScoringStrategy for LadderScoring {
    fn mode(&self) -> ScoringMode {
        ScoringMode::Ladder
    }

    fn apply(
        &self,
        game: &mut Match,
        side1: &mut Contester,
        side2: &mut Contester,
        sign: Sign,
    ) -> Result<(), StandingsError> {
        log::debug!("Ladder {:?} for match {}", sign, game.id);
        match sign {
            Sign::Forward => {
                let Some(score) = pending_score(game)? else {
                    return Ok(());
                };
                let rank_diff = *game.rank_diff.get_or_insert(side2.rank - side1.rank);
                let snapshot = capture(score, side1, side2);
                apply_outcome(score, side1, side2, sign.delta())?;
                set_trends(score, side1, side2);
                exchange_ranks(score, rank_diff, side1, side2);
                game.snapshot = Some(snapshot);
            }
            Sign::Reverse => {
                let Some(snapshot) = game.snapshot.take() else {
                    return Ok(());
                };
                apply_outcome(snapshot.score, side1, side2, sign.delta())?;
                side1.set_rank(snapshot.rank1);
                side2.set_rank(snapshot.rank2);
                side1.set_trend(snapshot.trend1);
                side2.set_trend(snapshot.trend2);
            }
        }
        Ok(())
    }
}

/// Ladder rank exchange. `rank_diff > 0` means side 2 was ahead when the match was first
/// applied, `rank_diff < 0` means side 1 was.
///
/// * Draw: the trailing side (side 2 on a tie) moves to one point below the leader.
/// * Upset: the trailing side won, so the two ranks are swapped.
/// * Expected win: nothing moves.
fn exchange_ranks(score: MatchScore, rank_diff: i32, side1: &mut Contester, side2: &mut Contester) {
    match score.winner() {
        None if rank_diff > 0 => side1.set_rank(side2.rank - 1),
        None => side2.set_rank(side1.rank - 1),
        Some(Side::One) if rank_diff > 0 => swap_ranks(side1, side2),
        Some(Side::Two) if rank_diff < 0 => swap_ranks(side1, side2),
        Some(_) => {}
    }
}

fn swap_ranks(side1: &mut Contester, side2: &mut Contester) {
    let rank1 = side1.rank;
    side1.set_rank(side2.rank);
    side2.set_rank(rank1);
}

/// Count the win/loss/draw of `score` on both ledgers, `delta` times.
fn apply_outcome(
    score: MatchScore,
    side1: &mut Contester,
    side2: &mut Contester,
    delta: i32,
) -> Result<(), StandingsError> {
    match score.winner() {
        None => {
            side1.record_draw(delta)?;
            side2.record_draw(delta)?;
        }
        Some(side) => {
            let (winner, loser) = match side {
                Side::One => (side1, side2),
                Side::Two => (side2, side1),
            };
            winner.record_win(delta)?;
            loser.record_loss(delta)?;
        }
    }
    Ok(())
}

fn set_trends(score: MatchScore, side1: &mut Contester, side2: &mut Contester) {
    let (trend1, trend2) = match score.winner() {
        Some(Side::One) => (Trend::Up, Trend::Down),
        Some(Side::Two) => (Trend::Down, Trend::Up),
        None => (Trend::Flat, Trend::Flat),
    };
    side1.set_trend(trend1);
    side2.set_trend(trend2);
}

fn capture(score: MatchScore, side1: &Contester, side2: &Contester) -> AppliedSnapshot {
    AppliedSnapshot {
        score,
        trend1: side1.trend,
        trend2: side2.trend,
        rank1: side1.rank,
        rank2: side2.rank,
        score_delta1: 0,
        score_delta2: 0,
    }
}

/// The score a forward application should count. A match whose effect is already in the
/// ledgers must be reversed first.
fn pending_score(game: &Match) -> Result<Option<MatchScore>, StandingsError> {
    if game.snapshot.is_some() {
        return Err(StandingsError::InvariantViolation(format!(
            "match {} is already applied",
            game.id
        )));
    }
    Ok(game.score)
}
