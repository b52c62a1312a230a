//! Scoring strategies applied directly to ledgers, without a store.

mod common;

use common::{now, score};
use league_standings::{
    strategy_for, Contester, Match, ScoringMode, Sign, StandingsError, Trend,
};
use uuid::Uuid;

fn pair(rank1: i32, rank2: i32) -> (Match, Contester, Contester) {
    let competition = Uuid::new_v4();
    let a = Contester::new(competition, Uuid::new_v4(), "A").with_rank(rank1);
    let b = Contester::new(competition, Uuid::new_v4(), "B").with_rank(rank2);
    let game = Match::new(competition, a.id, b.id, now());
    (game, a, b)
}

#[test]
fn forward_then_reverse_is_a_no_op_in_every_mode() {
    for mode in [ScoringMode::Bracket, ScoringMode::League, ScoringMode::Ladder] {
        for (s1, s2) in [(3, 1), (0, 2), (4, 4)] {
            let (mut game, mut a, mut b) = pair(20, 10);
            a.cumulative_score = 7;
            let (a0, b0) = (a.clone(), b.clone());
            game.score = Some(score(s1, s2));

            let strategy = strategy_for(mode);
            strategy.apply(&mut game, &mut a, &mut b, Sign::Forward).unwrap();
            strategy.apply(&mut game, &mut a, &mut b, Sign::Reverse).unwrap();

            assert_eq!(a, a0, "{:?} {}-{}", mode, s1, s2);
            assert_eq!(b, b0, "{:?} {}-{}", mode, s1, s2);
        }
    }
}

#[test]
fn each_mode_has_its_own_strategy() {
    for mode in [ScoringMode::Bracket, ScoringMode::League, ScoringMode::Ladder] {
        assert_eq!(strategy_for(mode).mode(), mode);
    }
}

#[test]
fn unfinished_match_changes_nothing() {
    for mode in [ScoringMode::Bracket, ScoringMode::League, ScoringMode::Ladder] {
        let (mut game, mut a, mut b) = pair(5, 9);
        let (a0, b0) = (a.clone(), b.clone());
        strategy_for(mode)
            .apply(&mut game, &mut a, &mut b, Sign::Forward)
            .unwrap();
        assert_eq!((a, b), (a0, b0));
        assert!(game.snapshot.is_none());
    }
}

#[test]
fn bracket_counts_results_only() {
    let (mut game, mut a, mut b) = pair(20, 10);
    game.score = Some(score(1, 2));
    strategy_for(ScoringMode::Bracket)
        .apply(&mut game, &mut a, &mut b, Sign::Forward)
        .unwrap();

    assert_eq!((a.wins, a.losses, b.wins, b.losses), (0, 1, 1, 0));
    assert_eq!((a.rank, b.rank), (20, 10));
    assert_eq!((a.cumulative_score, a.trend), (0, Trend::Flat));
    assert_eq!(game.applied_score(), Some(score(1, 2)));
    assert!(game.rank_diff.is_none());
}

#[test]
fn league_adds_points_and_sets_trend() {
    let (mut game, mut a, mut b) = pair(0, 0);
    a.cumulative_score = 10;
    b.cumulative_score = 8;
    game.score = Some(score(3, 2));
    strategy_for(ScoringMode::League)
        .apply(&mut game, &mut a, &mut b, Sign::Forward)
        .unwrap();

    assert_eq!((a.wins, b.losses), (1, 1));
    assert_eq!((a.cumulative_score, b.cumulative_score), (13, 10));
    assert_eq!((a.trend, b.trend), (Trend::Up, Trend::Down));
    assert_eq!((game.points1, game.points2), (Some(3), Some(2)));
}

#[test]
fn league_floor_applies_forward_and_reversal_restores_exactly() {
    let (mut game, mut a, mut b) = pair(0, 0);
    a.cumulative_score = -5;
    game.score = Some(score(2, 0));
    let league = strategy_for(ScoringMode::League);

    league.apply(&mut game, &mut a, &mut b, Sign::Forward).unwrap();
    assert_eq!(a.cumulative_score, 0);
    assert_eq!(game.snapshot.unwrap().score_delta1, 5);

    league.apply(&mut game, &mut a, &mut b, Sign::Reverse).unwrap();
    assert_eq!(a.cumulative_score, -5);
}

#[test]
fn reversal_without_an_applied_result_changes_nothing() {
    for mode in [ScoringMode::Bracket, ScoringMode::League, ScoringMode::Ladder] {
        let (mut game, mut a, mut b) = pair(3, 8);
        a.wins = 1;
        b.losses = 1;
        game.score = Some(score(1, 0));
        let (a0, b0) = (a.clone(), b.clone());
        strategy_for(mode)
            .apply(&mut game, &mut a, &mut b, Sign::Reverse)
            .unwrap();
        assert_eq!((a, b), (a0, b0), "{:?}", mode);
    }
}

#[test]
fn reversal_undoes_the_applied_score_not_the_current_one() {
    for mode in [ScoringMode::Bracket, ScoringMode::League, ScoringMode::Ladder] {
        let (mut game, mut a, mut b) = pair(4, 11);
        a.cumulative_score = 2;
        let (a0, b0) = (a.clone(), b.clone());
        game.score = Some(score(3, 1));
        let strategy = strategy_for(mode);
        strategy.apply(&mut game, &mut a, &mut b, Sign::Forward).unwrap();

        game.score = Some(score(1, 3));
        strategy.apply(&mut game, &mut a, &mut b, Sign::Reverse).unwrap();

        assert_eq!((a, b), (a0, b0), "{:?}", mode);
        assert!(game.snapshot.is_none());
    }
}

#[test]
fn applying_twice_without_reversal_is_refused() {
    let (mut game, mut a, mut b) = pair(0, 0);
    game.score = Some(score(2, 2));
    let league = strategy_for(ScoringMode::League);
    league.apply(&mut game, &mut a, &mut b, Sign::Forward).unwrap();
    let err = league
        .apply(&mut game, &mut a, &mut b, Sign::Forward)
        .unwrap_err();
    assert!(matches!(err, StandingsError::InvariantViolation(_)));
    assert_eq!(a.draws, 1);
}

#[test]
fn ladder_upset_swaps_ranks() {
    // Side 2 is ahead (rank 20 vs 10) and loses.
    let (mut game, mut a, mut b) = pair(10, 20);
    game.score = Some(score(2, 1));
    strategy_for(ScoringMode::Ladder)
        .apply(&mut game, &mut a, &mut b, Sign::Forward)
        .unwrap();

    assert_eq!(game.rank_diff, Some(10));
    assert_eq!((a.rank, b.rank), (20, 10));
    assert_eq!((a.trend, b.trend), (Trend::Up, Trend::Down));
}

#[test]
fn ladder_expected_win_keeps_ranks() {
    let (mut game, mut a, mut b) = pair(10, 20);
    game.score = Some(score(0, 3));
    strategy_for(ScoringMode::Ladder)
        .apply(&mut game, &mut a, &mut b, Sign::Forward)
        .unwrap();

    assert_eq!((a.rank, b.rank), (10, 20));
    assert_eq!((a.losses, b.wins), (1, 1));
}

#[test]
fn ladder_draw_pulls_trailing_side_under_leader() {
    let (mut game, mut a, mut b) = pair(30, 12);
    game.score = Some(score(1, 1));
    strategy_for(ScoringMode::Ladder)
        .apply(&mut game, &mut a, &mut b, Sign::Forward)
        .unwrap();
    assert_eq!((a.rank, b.rank), (30, 29));

    let (mut game, mut a, mut b) = pair(4, 9);
    game.score = Some(score(0, 0));
    strategy_for(ScoringMode::Ladder)
        .apply(&mut game, &mut a, &mut b, Sign::Forward)
        .unwrap();
    assert_eq!((a.rank, b.rank), (8, 9));
}

#[test]
fn ladder_rank_diff_is_frozen_across_reapplication() {
    let (mut game, mut a, mut b) = pair(10, 20);
    game.score = Some(score(2, 1));
    let ladder = strategy_for(ScoringMode::Ladder);
    ladder.apply(&mut game, &mut a, &mut b, Sign::Forward).unwrap();
    ladder.apply(&mut game, &mut a, &mut b, Sign::Reverse).unwrap();

    // Ranks move elsewhere before the match is applied again.
    a.rank = 50;
    ladder.apply(&mut game, &mut a, &mut b, Sign::Forward).unwrap();

    // Still judged an upset by the frozen diff, so ranks swap.
    assert_eq!(game.rank_diff, Some(10));
    assert_eq!((a.rank, b.rank), (20, 50));
}

#[test]
fn ladder_outcome_does_not_depend_on_processing_order() {
    let ladder = strategy_for(ScoringMode::Ladder);
    let run = |draw_first: bool| {
        let competition = Uuid::new_v4();
        let mut a = Contester::new(competition, Uuid::new_v4(), "A").with_rank(10);
        let mut b = Contester::new(competition, Uuid::new_v4(), "B").with_rank(5);
        let mut draw = Match::new(competition, a.id, b.id, now());
        draw.score = Some(score(2, 2));
        let mut upset = Match::new(competition, a.id, b.id, now());
        upset.score = Some(score(0, 1));

        let order = if draw_first {
            [&mut draw, &mut upset]
        } else {
            [&mut upset, &mut draw]
        };
        for game in order {
            ladder.apply(game, &mut a, &mut b, Sign::Forward).unwrap();
        }
        (a.rank, b.rank)
    };

    assert_eq!(run(true), run(false));
    assert_eq!(run(true), (9, 10));
}

#[test]
fn ledger_counters_never_underflow() {
    let (mut game, mut a, mut b) = pair(0, 0);
    game.score = Some(score(1, 0));
    let bracket = strategy_for(ScoringMode::Bracket);
    bracket.apply(&mut game, &mut a, &mut b, Sign::Forward).unwrap();

    // The ledger lost the win some other way.
    a.wins = 0;
    let err = bracket
        .apply(&mut game, &mut a, &mut b, Sign::Reverse)
        .unwrap_err();
    assert!(matches!(err, StandingsError::InvariantViolation(_)));
}
