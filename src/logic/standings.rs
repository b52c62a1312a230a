//! Standings tables and the recount audit.

use crate::models::{Competition, Contester, ContesterId, Match, ScoringMode};
use serde::Serialize;
use std::cmp::Ordering;
use std::collections::HashMap;

/// A competition with its contesters in table order.
#[derive(Clone, Debug, Serialize)]
pub struct Standings {
    pub competition: Competition,
    pub table: Vec<Contester>,
    pub matches: Vec<Match>,
}

/// A contester whose ledger does not match the finished matches it played.
#[derive(Clone, Debug, Eq, PartialEq, Serialize)]
pub struct StandingsMismatch {
    pub contester: ContesterId,
    pub name: String,
    /// wins + losses + draws in the ledger.
    pub recorded: u32,
    /// Applied matches the contester played.
    pub expected: u32,
}

/// Whether a league match is frozen out of the standings because a side is inactive.
pub fn is_frozen(mode: ScoringMode, side1: &Contester, side2: &Contester) -> bool {
    mode == ScoringMode::League && (!side1.active || !side2.active)
}

/// Sort contesters into table order for `mode`.
pub fn order_table(mode: ScoringMode, contesters: &mut [Contester]) {
    contesters.sort_by(|a, b| compare(mode, a, b).then_with(|| a.name.cmp(&b.name)));
}

fn compare(mode: ScoringMode, a: &Contester, b: &Contester) -> Ordering {
    match mode {
        ScoringMode::Bracket => b.wins.cmp(&a.wins).then(a.losses.cmp(&b.losses)),
        ScoringMode::League => b
            .cumulative_score
            .cmp(&a.cumulative_score)
            .then(b.wins.cmp(&a.wins))
            .then(a.losses.cmp(&b.losses)),
        ScoringMode::Ladder => b.rank.cmp(&a.rank),
    }
}

/// Recount every contester's games from the matches whose result is applied and report the
/// differences.
pub fn audit(contesters: &[Contester], matches: &[Match]) -> Vec<StandingsMismatch> {
    let mut expected: HashMap<ContesterId, u32> = HashMap::new();
    for m in matches.iter().filter(|m| m.snapshot.is_some()) {
        *expected.entry(m.contester1).or_default() += 1;
        *expected.entry(m.contester2).or_default() += 1;
    }

    contesters
        .iter()
        .filter_map(|c| {
            let expected = expected.get(&c.id).copied().unwrap_or(0);
            let recorded = c.games_played();
            (recorded != expected).then(|| StandingsMismatch {
                contester: c.id,
                name: c.name.clone(),
                recorded,
                expected,
            })
        })
        .collect()
}
