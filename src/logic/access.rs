//! Who may change which fields of a match.
//!
//! Rules are checked in order and the first one that allows the change wins, so a referee who
//! also leads one of the teams keeps referee access to the score after it has been set.

use crate::models::{Actor, Contester, Match, Role, UserId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One field a caller wants to change. Slot fields carry the proposed value:
/// `Some(user)` claims the slot, `None` relinquishes it.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(tag = "field", content = "value", rename_all = "snake_case")]
pub enum FieldChange {
    Score1,
    Score2,
    Forfeit,
    Report,
    Demo,
    ManOfTheMatch,
    Roster,
    Server,
    Recorder,
    Stream,
    Referee(Option<UserId>),
    Caster(Option<UserId>),
}

/// The match and both of its contesters, as needed to decide access.
#[derive(Clone, Copy, Debug)]
pub struct MatchParties<'a> {
    pub game: &'a Match,
    pub side1: &'a Contester,
    pub side2: &'a Contester,
}

impl MatchParties<'_> {
    /// Whether `actor` leads either side's team.
    pub fn led_by(&self, actor: &Actor) -> bool {
        actor.is_leader_of(self.side1.team_id) || actor.is_leader_of(self.side2.team_id)
    }
}

/// Decide whether `actor` may apply `changes` to the match at time `now`.
pub fn can_mutate(
    actor: Option<&Actor>,
    parties: &MatchParties<'_>,
    changes: &[FieldChange],
    now: DateTime<Utc>,
) -> bool {
    use FieldChange::*;

    let Some(actor) = actor else {
        return false;
    };
    if actor.is_admin() {
        return true;
    }
    let game = parties.game;

    if actor.has_role(Role::Referee) {
        if game.referee == Some(actor.id) {
            let refereeing = only(changes, |c| {
                matches!(
                    c,
                    Score1 | Score2 | Forfeit | Report | Demo | ManOfTheMatch | Roster | Server
                )
            });
            if refereeing {
                return true;
            }
            if only(changes, |c| matches!(c, Recorder)) && game.demo.is_none() {
                return true;
            }
        }
        let slot = slot_change_allowed(changes, game.referee, actor.id, |c| match c {
            Referee(user) => Some(*user),
            _ => None,
        });
        if slot {
            return true;
        }
    }

    if parties.led_by(actor) {
        if game.is_past(now) {
            let first_report = game.score.is_none() && !game.forfeited;
            if first_report && only(changes, |c| matches!(c, Score1 | Score2)) {
                return true;
            }
            if only(changes, |c| matches!(c, Roster)) {
                return true;
            }
        }
        if game.is_today(now) && only(changes, |c| matches!(c, Stream)) {
            return true;
        }
    }

    if actor.has_role(Role::Caster) {
        let slot = slot_change_allowed(changes, game.caster, actor.id, |c| match c {
            Caster(user) => Some(*user),
            _ => None,
        });
        if slot {
            return true;
        }
    }

    false
}

/// Only admins create matches.
pub fn can_create(actor: Option<&Actor>) -> bool {
    actor.is_some_and(Actor::is_admin)
}

/// Only admins delete matches, contesters and competitions.
pub fn can_destroy(actor: Option<&Actor>) -> bool {
    actor.is_some_and(Actor::is_admin)
}

/// Team leaders of either side may propose a new match time.
pub fn can_propose(actor: Option<&Actor>, parties: &MatchParties<'_>) -> bool {
    actor.is_some_and(|a| parties.led_by(a))
}

/// Non-empty and every change satisfies `allowed`.
fn only(changes: &[FieldChange], allowed: impl Fn(&FieldChange) -> bool) -> bool {
    !changes.is_empty() && changes.iter().all(allowed)
}

/// Every change is a slot change picked by `pick`, and each either claims an empty slot for
/// `actor` or releases the slot `actor` holds.
fn slot_change_allowed(
    changes: &[FieldChange],
    current: Option<UserId>,
    actor: UserId,
    pick: impl Fn(&FieldChange) -> Option<Option<UserId>>,
) -> bool {
    only(changes, |c| match pick(c) {
        Some(Some(user)) => user == actor && current.is_none(),
        Some(None) => current == Some(actor),
        None => false,
    })
}
