//! Shared fixtures for the integration tests.
#![allow(dead_code)]

use chrono::{DateTime, Duration, TimeZone, Utc};
use league_standings::{
    Actor, Caller, CompetitionId, Contester, ContesterId, InMemoryStore, Match, MatchId,
    MatchScore, NewMatch, ResultController, Role, ScoringMode, Store, Trend,
};
use uuid::Uuid;

/// Fixed "current time" used by every test.
pub fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2024, 5, 10, 18, 0, 0).unwrap()
}

pub fn admin() -> Actor {
    Actor::new().with_role(Role::Admin)
}

pub fn score(score1: i32, score2: i32) -> MatchScore {
    MatchScore::new(score1, score2).unwrap()
}

/// Comparable ledger values, without ids.
pub type LedgerView = (String, u32, u32, u32, i32, i32, Trend);

/// A competition in an in-memory store, driven through the controller as an admin.
pub struct Fixture<S: Store = InMemoryStore> {
    pub controller: ResultController<S>,
    pub admin: Actor,
    pub competition: CompetitionId,
}

impl Fixture<InMemoryStore> {
    pub fn new(mode: ScoringMode) -> Self {
        Self::on(ResultController::new(InMemoryStore::new()), mode)
    }
}

impl<S: Store> Fixture<S> {
    pub fn on(controller: ResultController<S>, mode: ScoringMode) -> Self {
        let admin = admin();
        let competition = controller
            .create_competition(Caller::new(&admin, now()), "Test Cup", mode)
            .unwrap()
            .id;
        Self {
            controller,
            admin,
            competition,
        }
    }

    pub fn caller(&self) -> Caller<'_> {
        Caller::new(&self.admin, now())
    }

    pub fn enter(&self, name: &str) -> ContesterId {
        self.enter_with(name, |c| c)
    }

    pub fn enter_with(&self, name: &str, tweak: impl FnOnce(Contester) -> Contester) -> ContesterId {
        let contester = tweak(Contester::new(self.competition, Uuid::new_v4(), name));
        self.controller
            .register_contester(self.caller(), contester)
            .unwrap()
            .id
    }

    /// Unfinished match played yesterday.
    pub fn add_match(&self, side1: ContesterId, side2: ContesterId) -> MatchId {
        self.add_match_at(side1, side2, now() - Duration::days(1))
    }

    pub fn add_match_at(&self, side1: ContesterId, side2: ContesterId, at: DateTime<Utc>) -> MatchId {
        let draft = NewMatch {
            contester1: side1,
            contester2: side2,
            scheduled_time: at,
            score1: None,
            score2: None,
            referee: None,
            managed_recording: false,
        };
        self.controller
            .create_match(self.caller(), self.competition, draft, &[])
            .unwrap()
            .id
    }

    pub fn set(&self, game: MatchId, next: Option<MatchScore>) -> Match {
        self.controller
            .apply_score(self.caller(), self.competition, game, next)
            .unwrap()
    }

    /// Flip a contester's active flag directly in the store.
    pub fn set_active(&self, id: ContesterId, active: bool) {
        self.controller
            .store()
            .in_transaction(self.competition, |tx| {
                let mut contester = tx.load_contester(id)?;
                contester.active = active;
                tx.save_contester(&contester)
            })
            .unwrap()
    }

    pub fn contester(&self, id: ContesterId) -> Contester {
        self.controller
            .store()
            .in_transaction(self.competition, |tx| tx.load_contester(id))
            .unwrap()
    }

    pub fn game(&self, id: MatchId) -> Match {
        self.controller
            .store()
            .in_transaction(self.competition, |tx| tx.load_match(id))
            .unwrap()
    }

    pub fn contesters(&self) -> Vec<Contester> {
        self.controller
            .store()
            .in_transaction(self.competition, |tx| Ok(tx.contesters()))
            .unwrap()
    }

    /// Every ledger by name, for comparing two fixtures built the same way.
    pub fn ledgers(&self) -> Vec<LedgerView> {
        let mut view: Vec<LedgerView> = self
            .contesters()
            .into_iter()
            .map(|c| (c.name, c.wins, c.losses, c.draws, c.cumulative_score, c.rank, c.trend))
            .collect();
        view.sort_by(|a, b| a.0.cmp(&b.0));
        view
    }
}
