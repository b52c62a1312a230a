//! Concurrent score edits on one competition.

mod common;

use common::{admin, now, score, Fixture};
use league_standings::{Caller, ContesterId, MatchId, ScoringMode};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::sync::Arc;
use std::thread;

#[test]
fn parallel_edits_keep_the_ledgers_consistent() {
    for mode in [ScoringMode::Bracket, ScoringMode::League, ScoringMode::Ladder] {
        let f = Arc::new(Fixture::new(mode));
        let ids: Vec<ContesterId> = (0..4)
            .map(|i| f.enter_with(&format!("C{i}"), |c| c.with_rank(i)))
            .collect();
        let matches: Arc<Vec<MatchId>> = Arc::new(vec![
            f.add_match(ids[0], ids[1]),
            f.add_match(ids[1], ids[2]),
            f.add_match(ids[2], ids[3]),
            f.add_match(ids[3], ids[0]),
        ]);

        let workers: Vec<_> = (0..8u64)
            .map(|seed| {
                let f = Arc::clone(&f);
                let matches = Arc::clone(&matches);
                thread::spawn(move || {
                    let mut rng = StdRng::seed_from_u64(seed);
                    let actor = admin();
                    for _ in 0..50 {
                        let m = matches[rng.gen_range(0..matches.len())];
                        let next = if rng.gen_bool(0.25) {
                            None
                        } else {
                            Some(score(rng.gen_range(0..3), rng.gen_range(0..3)))
                        };
                        f.controller
                            .apply_score(Caller::new(&actor, now()), f.competition, m, next)
                            .unwrap();
                    }
                })
            })
            .collect();
        for worker in workers {
            worker.join().unwrap();
        }

        assert!(
            f.controller.audit_standings(f.competition).unwrap().is_empty(),
            "{:?}",
            mode
        );
        let finished = matches.iter().filter(|&&m| f.game(m).score.is_some()).count() as u32;
        let played: u32 = f.contesters().iter().map(|c| c.games_played()).sum();
        assert_eq!(played, finished * 2);
    }
}
