//! Match notifications.

use crate::models::{MatchId, UserId};
use serde::Serialize;

/// What happened to a match, as told to a subscriber.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchEvent {
    MatchScheduled(MatchId),
    MatchCompleted(MatchId),
}

/// Fire-and-forget delivery of match events.
pub trait Notifier: Send + Sync {
    fn notify(&self, user: UserId, event: MatchEvent);
}

/// Writes every notification to the log instead of delivering it.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn notify(&self, user: UserId, event: MatchEvent) {
        log::info!("Notify {}: {:?}", user, event);
    }
}
