//! Match result controller: the only way a score change reaches the standings.
//!
//! Each transition runs in one store transaction: the previous score's effect is reversed,
//! the new score is stored, the new effect is applied and the two ledgers are checked before
//! anything is written. Recorder, notification and prediction calls happen outside that
//! transaction.

use crate::logic::access::{can_create, can_destroy, can_mutate, FieldChange, MatchParties};
use crate::logic::scoring::{strategy_for, Sign};
use crate::logic::standings::{self, is_frozen, Standings, StandingsMismatch};
use crate::models::{
    match_length, Actor, Competition, CompetitionId, Contester, ContesterId, Match, MatchId,
    MatchScore, NewMatch, ScoreState, ScoringMode, StandingsError, UserId,
};
use crate::services::{
    LogNotifier, MatchEvent, Notifier, Prediction, PredictionBook, PredictionService, RecorderHandle,
    RecorderId, RecorderPool, RecorderService, Reservation,
};
use crate::store::{Store, Transaction};
use chrono::{DateTime, Utc};
use std::sync::Arc;

const SCORE_FIELDS: [FieldChange; 2] = [FieldChange::Score1, FieldChange::Score2];

/// Who is asking, and when.
#[derive(Clone, Copy, Debug)]
pub struct Caller<'a> {
    pub actor: &'a Actor,
    pub now: DateTime<Utc>,
}

impl<'a> Caller<'a> {
    pub fn new(actor: &'a Actor, now: DateTime<Utc>) -> Self {
        Self { actor, now }
    }
}

/// Applies match results to contester ledgers on top of a [`Store`].
pub struct ResultController<S> {
    store: S,
    predictions: Arc<dyn PredictionService>,
    notifier: Arc<dyn Notifier>,
    recorders: Arc<dyn RecorderService>,
}

impl<S: Store> ResultController<S> {
    /// Controller with in-memory predictions, log notifications and no recorders.
    pub fn new(store: S) -> Self {
        Self {
            store,
            predictions: Arc::new(PredictionBook::new()),
            notifier: Arc::new(LogNotifier),
            recorders: Arc::new(RecorderPool::default()),
        }
    }

    pub fn with_predictions(mut self, predictions: Arc<dyn PredictionService>) -> Self {
        self.predictions = predictions;
        self
    }

    pub fn with_notifier(mut self, notifier: Arc<dyn Notifier>) -> Self {
        self.notifier = notifier;
        self
    }

    pub fn with_recorders(mut self, recorders: Arc<dyn RecorderService>) -> Self {
        self.recorders = recorders;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Create an empty competition (admin only).
    pub fn create_competition(
        &self,
        caller: Caller<'_>,
        name: &str,
        mode: ScoringMode,
    ) -> Result<Competition, StandingsError> {
        if !can_create(Some(caller.actor)) {
            return Err(StandingsError::Unauthorized);
        }
        let name = name.trim();
        if name.is_empty() {
            return Err(StandingsError::Validation("competition name is empty".to_string()));
        }
        let competition = Competition::new(name, mode);
        self.store.insert_competition(competition.clone())?;
        log::info!("Created {:?} competition {} ({})", mode, competition.name, competition.id);
        Ok(competition)
    }

    /// Enter a contester into its competition (admin only).
    pub fn register_contester(
        &self,
        caller: Caller<'_>,
        contester: Contester,
    ) -> Result<Contester, StandingsError> {
        if !can_create(Some(caller.actor)) {
            return Err(StandingsError::Unauthorized);
        }
        if contester.name.trim().is_empty() {
            return Err(StandingsError::Validation("contester name is empty".to_string()));
        }
        self.store.in_transaction(contester.competition_id, |tx| {
            if tx.load_contester(contester.id).is_ok() {
                return Err(StandingsError::Validation("contester already exists".to_string()));
            }
            tx.save_contester(&contester)?;
            Ok(contester)
        })
    }

    /// Create a match (admin only). A match created with a score is applied immediately.
    /// Subscribers are notified once, after the match is stored.
    pub fn create_match(
        &self,
        caller: Caller<'_>,
        competition: CompetitionId,
        draft: NewMatch,
        subscribers: &[UserId],
    ) -> Result<Match, StandingsError> {
        if !can_create(Some(caller.actor)) {
            return Err(StandingsError::Unauthorized);
        }
        if draft.contester1 == draft.contester2 {
            return Err(StandingsError::Validation(
                "a match needs two different contesters".to_string(),
            ));
        }
        let score = MatchScore::from_parts(draft.score1, draft.score2)?;

        let mut game = Match::new(competition, draft.contester1, draft.contester2, draft.scheduled_time);
        game.referee = draft.referee;
        if draft.managed_recording && game.scheduled_time > caller.now {
            game.recorder = self.hold_recorder(&game);
        }
        let (match_id, held) = (game.id, game.recorder);

        let stored = self.store.in_transaction(competition, move |tx| {
            let mut side1 = tx.load_contester(game.contester1)?;
            let mut side2 = tx.load_contester(game.contester2)?;
            rescore(tx.competition().mode, &mut game, &mut side1, &mut side2, score)?;
            tx.save_contester(&side1)?;
            tx.save_contester(&side2)?;
            tx.save_match(&game)?;
            Ok(game)
        });
        let game = match stored {
            Ok(game) => game,
            Err(e) => {
                self.release_recorder(held, match_id);
                return Err(e);
            }
        };
        log::info!("Created match {} in competition {}", game.id, competition);

        let event = match game.score {
            Some(score) => {
                self.predictions.mark_result(game.id, score);
                MatchEvent::MatchCompleted(game.id)
            }
            None => MatchEvent::MatchScheduled(game.id),
        };
        for &user in subscribers {
            self.notifier.notify(user, event);
        }
        Ok(game)
    }

    /// Unset → Set: record the first score of a match.
    pub fn record_score(
        &self,
        caller: Caller<'_>,
        competition: CompetitionId,
        game: MatchId,
        score: MatchScore,
    ) -> Result<Match, StandingsError> {
        self.transition(caller, competition, game, Some(score), Some(ScoreState::Unset))
    }

    /// Set → Set': correct the score of a finished match.
    pub fn correct_score(
        &self,
        caller: Caller<'_>,
        competition: CompetitionId,
        game: MatchId,
        score: MatchScore,
    ) -> Result<Match, StandingsError> {
        self.transition(caller, competition, game, Some(score), Some(ScoreState::Set))
    }

    /// Set → Unset: withdraw a score. Clearing an unfinished match changes nothing.
    pub fn clear_score(
        &self,
        caller: Caller<'_>,
        competition: CompetitionId,
        game: MatchId,
    ) -> Result<Match, StandingsError> {
        self.transition(caller, competition, game, None, None)
    }

    /// Move the match to `next`, whatever its current state.
    pub fn apply_score(
        &self,
        caller: Caller<'_>,
        competition: CompetitionId,
        game: MatchId,
        next: Option<MatchScore>,
    ) -> Result<Match, StandingsError> {
        self.transition(caller, competition, game, next, None)
    }

    fn transition(
        &self,
        caller: Caller<'_>,
        competition: CompetitionId,
        match_id: MatchId,
        next: Option<MatchScore>,
        expected: Option<ScoreState>,
    ) -> Result<Match, StandingsError> {
        let (game, changed) = self.store.in_transaction(competition, |tx| {
            let mut game = tx.load_match(match_id)?;
            let mut side1 = tx.load_contester(game.contester1)?;
            let mut side2 = tx.load_contester(game.contester2)?;

            let parties = MatchParties {
                game: &game,
                side1: &side1,
                side2: &side2,
            };
            if !can_mutate(Some(caller.actor), &parties, &SCORE_FIELDS, caller.now) {
                return Err(StandingsError::Unauthorized);
            }
            if let Some(from) = expected {
                if game.score_state() != from {
                    return Err(StandingsError::InvalidTransition {
                        from: game.score_state(),
                        to: if next.is_some() { ScoreState::Set } else { ScoreState::Unset },
                    });
                }
            }
            let mode = tx.competition().mode;
            let settled = is_frozen(mode, &side1, &side2) || game.applied_score() == next;
            if game.score == next && settled {
                return Ok((game, false));
            }

            rescore(mode, &mut game, &mut side1, &mut side2, next)?;
            tx.save_contester(&side1)?;
            tx.save_contester(&side2)?;
            tx.save_match(&game)?;
            Ok((game, true))
        })?;

        if changed {
            log::info!("Match {} score is now {:?}", game.id, game.score);
            match game.score {
                Some(score) => self.predictions.mark_result(game.id, score),
                None => self.predictions.clear_result(game.id),
            }
        }
        Ok(game)
    }

    /// Remove a match, reversing its result first (admin only).
    pub fn delete_match(
        &self,
        caller: Caller<'_>,
        competition: CompetitionId,
        match_id: MatchId,
    ) -> Result<Match, StandingsError> {
        if !can_destroy(Some(caller.actor)) {
            return Err(StandingsError::Unauthorized);
        }
        let game = self.store.in_transaction(competition, |tx| {
            let game = tx.load_match(match_id)?;
            evict(tx, game)
        })?;
        self.after_eviction(std::slice::from_ref(&game));
        log::info!("Deleted match {}", game.id);
        Ok(game)
    }

    /// Remove a contester and every match it played, reversing each result (admin only).
    /// Returns the evicted matches.
    pub fn delete_contester(
        &self,
        caller: Caller<'_>,
        competition: CompetitionId,
        contester: ContesterId,
    ) -> Result<Vec<Match>, StandingsError> {
        if !can_destroy(Some(caller.actor)) {
            return Err(StandingsError::Unauthorized);
        }
        let evicted = self.store.in_transaction(competition, |tx| {
            tx.load_contester(contester)?;
            let mut evicted = Vec::new();
            for game in tx.matches().into_iter().filter(|m| m.involves(contester)) {
                evicted.push(evict(tx, game)?);
            }
            tx.remove_contester(contester)?;
            Ok(evicted)
        })?;
        self.after_eviction(&evicted);
        log::info!("Deleted contester {} and {} match(es)", contester, evicted.len());
        Ok(evicted)
    }

    /// Remove a competition with all its matches and contesters (admin only).
    pub fn delete_competition(
        &self,
        caller: Caller<'_>,
        competition: CompetitionId,
    ) -> Result<(), StandingsError> {
        if !can_destroy(Some(caller.actor)) {
            return Err(StandingsError::Unauthorized);
        }
        let evicted = self.store.in_transaction(competition, |tx| {
            let mut evicted = Vec::new();
            for game in tx.matches() {
                evicted.push(evict(tx, game)?);
            }
            for c in tx.contesters() {
                tx.remove_contester(c.id)?;
            }
            Ok(evicted)
        })?;
        self.store.remove_competition(competition)?;
        self.after_eviction(&evicted);
        log::info!("Deleted competition {} and {} match(es)", competition, evicted.len());
        Ok(())
    }

    fn after_eviction(&self, evicted: &[Match]) {
        for game in evicted {
            self.predictions.clear_result(game.id);
            self.release_recorder(game.recorder, game.id);
        }
    }

    /// Set a free recorder aside for a future match.
    fn hold_recorder(&self, game: &Match) -> Option<RecorderId> {
        let handle = self.recorders.find_available_recorder(game.scheduled_time)?;
        match self.recorders.hold(&handle, game.id, game.scheduled_time) {
            Ok(()) => Some(handle.id),
            Err(e) => {
                log::warn!("Could not hold recorder {} for match {}: {}", handle.address, game.id, e);
                None
            }
        }
    }

    /// Drop the match's booking on `recorder`, logging failures.
    fn release_recorder(&self, recorder: Option<RecorderId>, match_id: MatchId) {
        let Some(handle) = recorder.and_then(|id| self.recorders.handle(id)) else {
            return;
        };
        if let Err(e) = self.recorders.release(&handle, match_id) {
            log::warn!("Could not release recorder {}: {}", handle.address, e);
        }
    }

    /// Pre-check for a set of field changes, without changing anything.
    pub fn check_access(
        &self,
        actor: Option<&Actor>,
        competition: CompetitionId,
        match_id: MatchId,
        changes: &[FieldChange],
        now: DateTime<Utc>,
    ) -> Result<bool, StandingsError> {
        self.store.in_transaction(competition, |tx| {
            let game = tx.load_match(match_id)?;
            let side1 = tx.load_contester(game.contester1)?;
            let side2 = tx.load_contester(game.contester2)?;
            let parties = MatchParties {
                game: &game,
                side1: &side1,
                side2: &side2,
            };
            Ok(can_mutate(actor, &parties, changes, now))
        })
    }

    /// Reserve a recorder for a match. Only accepted within ten match lengths of its scheduled
    /// time. The standings are never touched here.
    pub fn request_recording(
        &self,
        caller: Caller<'_>,
        competition: CompetitionId,
        match_id: MatchId,
        address: &str,
        password: &str,
    ) -> Result<RecorderHandle, StandingsError> {
        let game = self.load_for(caller, competition, match_id, FieldChange::Recorder)?;

        let window = match_length() * 10;
        if game.scheduled_time - window > caller.now || game.scheduled_time + window < caller.now {
            return Err(StandingsError::Validation(
                "recording can only be requested within 20 hours of the match".to_string(),
            ));
        }
        if game.recorder.is_some_and(|id| self.recorders.is_recording(id, game.id)) {
            return Err(StandingsError::Validation(
                "match is already being recorded".to_string(),
            ));
        }
        let reservation = Reservation {
            match_id: game.id,
            around: game.scheduled_time,
            address: address.to_string(),
            password: password.to_string(),
        };

        // The recorder held at creation, unless another match has taken it since.
        let held = game.recorder.and_then(|id| self.recorders.handle(id));
        let handle = match held {
            Some(handle) if self.recorders.reserve(&handle, reservation.clone()).is_ok() => handle,
            _ => {
                self.release_recorder(game.recorder, game.id);
                let handle = self
                    .recorders
                    .find_available_recorder(game.scheduled_time)
                    .ok_or_else(|| {
                        log::warn!("No recorder available for match {}", game.id);
                        StandingsError::RecorderUnavailable
                    })?;
                self.recorders.reserve(&handle, reservation)?;
                handle
            }
        };

        let stored = self.store.in_transaction(competition, |tx| {
            let mut game = tx.load_match(match_id)?;
            game.recorder = Some(handle.id);
            tx.save_match(&game)
        });
        if let Err(e) = stored {
            // Do not leave a reservation the match does not know about.
            self.release_recorder(Some(handle.id), match_id);
            return Err(e);
        }
        Ok(handle)
    }

    /// Stop recording a match and free its recorder.
    pub fn release_recording(
        &self,
        caller: Caller<'_>,
        competition: CompetitionId,
        match_id: MatchId,
    ) -> Result<(), StandingsError> {
        let game = self.load_for(caller, competition, match_id, FieldChange::Recorder)?;
        let handle = game
            .recorder
            .and_then(|id| self.recorders.handle(id))
            .ok_or_else(|| StandingsError::Validation("match has no recorder".to_string()))?;
        self.recorders.release(&handle, game.id)?;
        self.store.in_transaction(competition, |tx| {
            let mut game = tx.load_match(match_id)?;
            game.recorder = None;
            tx.save_match(&game)
        })
    }

    fn load_for(
        &self,
        caller: Caller<'_>,
        competition: CompetitionId,
        match_id: MatchId,
        change: FieldChange,
    ) -> Result<Match, StandingsError> {
        self.store.in_transaction(competition, |tx| {
            let game = tx.load_match(match_id)?;
            let side1 = tx.load_contester(game.contester1)?;
            let side2 = tx.load_contester(game.contester2)?;
            let parties = MatchParties {
                game: &game,
                side1: &side1,
                side2: &side2,
            };
            if !can_mutate(Some(caller.actor), &parties, &[change], caller.now) {
                return Err(StandingsError::Unauthorized);
            }
            Ok(game)
        })
    }

    /// Record a user's prediction for a match not played yet. Returns the match's predictions.
    pub fn predict(
        &self,
        competition: CompetitionId,
        match_id: MatchId,
        user: UserId,
        score: MatchScore,
    ) -> Result<Vec<Prediction>, StandingsError> {
        let game = self.store.in_transaction(competition, |tx| tx.load_match(match_id))?;
        if game.is_finished() {
            return Err(StandingsError::Validation(
                "predictions close once the match is finished".to_string(),
            ));
        }
        self.predictions.predict(match_id, user, score);

        // A score recorded meanwhile has already been marked without this prediction.
        let game = self.store.in_transaction(competition, |tx| tx.load_match(match_id))?;
        if let Some(score) = game.score {
            self.predictions.mark_result(match_id, score);
        }
        Ok(self.predictions.predictions(match_id))
    }

    /// Predictions for a match, with `correct` set once it is finished.
    pub fn predictions(
        &self,
        competition: CompetitionId,
        match_id: MatchId,
    ) -> Result<Vec<Prediction>, StandingsError> {
        self.store.in_transaction(competition, |tx| tx.load_match(match_id))?;
        Ok(self.predictions.predictions(match_id))
    }

    /// Contesters in table order with every match of the competition.
    pub fn standings(&self, competition: CompetitionId) -> Result<Standings, StandingsError> {
        self.store.in_transaction(competition, |tx| {
            let competition = tx.competition().clone();
            let mut table = tx.contesters();
            standings::order_table(competition.mode, &mut table);
            Ok(Standings {
                competition,
                table,
                matches: tx.matches(),
            })
        })
    }

    /// Recount every ledger from the applied matches; empty when all agree.
    pub fn audit_standings(
        &self,
        competition: CompetitionId,
    ) -> Result<Vec<StandingsMismatch>, StandingsError> {
        self.store.in_transaction(competition, |tx| {
            Ok(standings::audit(&tx.contesters(), &tx.matches()))
        })
    }
}

/// Reverse whatever the match has applied, store `next`, apply it, and check both ledgers moved
/// by exactly the number of applications that changed. In a league with an inactive side the
/// ledgers are left alone and only the score is stored.
fn rescore(
    mode: ScoringMode,
    game: &mut Match,
    side1: &mut Contester,
    side2: &mut Contester,
    next: Option<MatchScore>,
) -> Result<(), StandingsError> {
    if is_frozen(mode, side1, side2) {
        game.score = next;
        return Ok(());
    }
    let before = (side1.clone(), side2.clone());
    let was_applied = game.snapshot.is_some();

    let strategy = strategy_for(mode);
    strategy.apply(game, side1, side2, Sign::Reverse)?;
    game.score = next;
    strategy.apply(game, side1, side2, Sign::Forward)?;

    if game.applied_score() != game.score {
        return Err(StandingsError::InvariantViolation(format!(
            "match {} applied {:?} but scores {:?}",
            game.id,
            game.applied_score(),
            game.score
        )));
    }
    let expected = i64::from(game.snapshot.is_some()) - i64::from(was_applied);
    verify_ledger(mode, &before.0, side1, expected)?;
    verify_ledger(mode, &before.1, side2, expected)?;
    Ok(())
}

/// Take a match's applied effect out of the ledgers, even while a side is inactive.
fn retract(
    mode: ScoringMode,
    game: &mut Match,
    side1: &mut Contester,
    side2: &mut Contester,
) -> Result<(), StandingsError> {
    let before = (side1.clone(), side2.clone());
    let expected = -i64::from(game.snapshot.is_some());
    strategy_for(mode).apply(game, side1, side2, Sign::Reverse)?;
    verify_ledger(mode, &before.0, side1, expected)?;
    verify_ledger(mode, &before.1, side2, expected)?;
    Ok(())
}

fn verify_ledger(
    mode: ScoringMode,
    before: &Contester,
    after: &Contester,
    expected_games: i64,
) -> Result<(), StandingsError> {
    let moved = i64::from(after.games_played()) - i64::from(before.games_played());
    if moved != expected_games {
        log::warn!(
            "Contester {} moved by {} games, expected {}",
            after.id,
            moved,
            expected_games
        );
        return Err(StandingsError::InvariantViolation(format!(
            "contester {} moved by {} games, expected {}",
            after.id, moved, expected_games
        )));
    }
    let untouched = after.cumulative_score == before.cumulative_score
        && after.rank == before.rank
        && after.trend == before.trend;
    if mode == ScoringMode::Bracket && !untouched {
        log::warn!("Bracket result changed more than the record of {}", after.id);
        return Err(StandingsError::InvariantViolation(format!(
            "bracket result changed score, rank or trend of contester {}",
            after.id
        )));
    }
    Ok(())
}

/// Retract a match's result and remove it.
fn evict(tx: &mut dyn Transaction, mut game: Match) -> Result<Match, StandingsError> {
    let mut side1 = tx.load_contester(game.contester1)?;
    let mut side2 = tx.load_contester(game.contester2)?;
    retract(tx.competition().mode, &mut game, &mut side1, &mut side2)?;
    tx.save_contester(&side1)?;
    tx.save_contester(&side2)?;
    tx.remove_match(game.id)?;
    Ok(game)
}
