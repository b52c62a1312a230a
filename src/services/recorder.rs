//! Recording servers that can be reserved to record a match.

use crate::models::{match_length, MatchId, StandingsError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::sync::{Mutex, MutexGuard};
use uuid::Uuid;

/// Unique identifier for a recorder.
pub type RecorderId = Uuid;

/// A recorder that can be reserved.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct RecorderHandle {
    pub id: RecorderId,
    pub address: String,
}

/// A live reservation: which match is recorded and where the game server is.
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct Reservation {
    pub match_id: MatchId,
    /// Scheduled time of the recorded match.
    pub around: DateTime<Utc>,
    /// Game server address the recorder connects to.
    pub address: String,
    pub password: String,
}

/// External recording-server reservation protocol. Every booking belongs to one match, and
/// bookings of one recorder are at least one match length apart.
pub trait RecorderService: Send + Sync {
    /// A recorder with no booking overlapping `around`.
    fn find_available_recorder(&self, around: DateTime<Utc>) -> Option<RecorderHandle>;
    fn handle(&self, id: RecorderId) -> Option<RecorderHandle>;
    /// Set a recorder aside for a match without connecting it yet.
    fn hold(&self, handle: &RecorderHandle, match_id: MatchId, around: DateTime<Utc>) -> Result<(), StandingsError>;
    /// Start recording a match, taking over the match's hold if it has one.
    fn reserve(&self, handle: &RecorderHandle, reservation: Reservation) -> Result<(), StandingsError>;
    /// Drop the match's booking on this recorder. Other matches' bookings are kept.
    fn release(&self, handle: &RecorderHandle, match_id: MatchId) -> Result<(), StandingsError>;
    /// Whether the recorder is live for this match.
    fn is_recording(&self, id: RecorderId, match_id: MatchId) -> bool;
}

/// A match the recorder is set aside for, live once `reservation` is set.
#[derive(Clone, Debug)]
struct Booking {
    match_id: MatchId,
    around: DateTime<Utc>,
    reservation: Option<Reservation>,
}

#[derive(Clone, Debug)]
struct RecorderSlot {
    handle: RecorderHandle,
    bookings: Vec<Booking>,
}

impl RecorderSlot {
    fn free_around(&self, around: DateTime<Utc>, match_id: Option<MatchId>) -> bool {
        self.bookings
            .iter()
            .filter(|b| Some(b.match_id) != match_id)
            .all(|b| (b.around - around).abs() >= match_length())
    }

    fn booking_mut(&mut self, match_id: MatchId, around: DateTime<Utc>) -> &mut Booking {
        let index = match self.bookings.iter().position(|b| b.match_id == match_id) {
            Some(index) => index,
            None => {
                self.bookings.push(Booking {
                    match_id,
                    around,
                    reservation: None,
                });
                self.bookings.len() - 1
            }
        };
        &mut self.bookings[index]
    }
}

/// Fixed in-memory pool of recorders.
#[derive(Debug, Default)]
pub struct RecorderPool {
    slots: Mutex<Vec<RecorderSlot>>,
}

impl RecorderPool {
    /// Pool with one recorder per address.
    pub fn new<I, S>(addresses: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let slots = addresses
            .into_iter()
            .map(|address| RecorderSlot {
                handle: RecorderHandle {
                    id: Uuid::new_v4(),
                    address: address.into(),
                },
                bookings: Vec::new(),
            })
            .collect();
        Self {
            slots: Mutex::new(slots),
        }
    }

    /// The live reservation of `match_id` on this recorder.
    pub fn reservation(&self, id: RecorderId, match_id: MatchId) -> Option<Reservation> {
        let g = self.lock().ok()?;
        g.iter()
            .filter(|s| s.handle.id == id)
            .flat_map(|s| s.bookings.iter())
            .find(|b| b.match_id == match_id)
            .and_then(|b| b.reservation.clone())
    }

    /// Release every booking whose match ended long before `now`. Returns how many.
    pub fn release_expired(&self, now: DateTime<Utc>) -> usize {
        let Ok(mut g) = self.lock() else {
            return 0;
        };
        let mut released = 0;
        for slot in g.iter_mut() {
            let before = slot.bookings.len();
            slot.bookings.retain(|b| b.around + match_length() * 10 >= now);
            released += before - slot.bookings.len();
        }
        released
    }

    fn lock(&self) -> Result<MutexGuard<'_, Vec<RecorderSlot>>, StandingsError> {
        self.slots.lock().map_err(|_| {
            log::warn!("Recorder pool lock poisoned");
            StandingsError::Storage("recorder pool lock poisoned".to_string())
        })
    }

    fn slot<'a>(
        slots: &'a mut [RecorderSlot],
        handle: &RecorderHandle,
    ) -> Result<&'a mut RecorderSlot, StandingsError> {
        slots
            .iter_mut()
            .find(|s| s.handle.id == handle.id)
            .ok_or(StandingsError::RecorderUnavailable)
    }
}

impl RecorderService for RecorderPool {
    fn find_available_recorder(&self, around: DateTime<Utc>) -> Option<RecorderHandle> {
        let g = self.lock().ok()?;
        g.iter()
            .find(|s| s.free_around(around, None))
            .map(|s| s.handle.clone())
    }

    fn handle(&self, id: RecorderId) -> Option<RecorderHandle> {
        let g = self.lock().ok()?;
        g.iter().find(|s| s.handle.id == id).map(|s| s.handle.clone())
    }

    fn hold(&self, handle: &RecorderHandle, match_id: MatchId, around: DateTime<Utc>) -> Result<(), StandingsError> {
        let mut g = self.lock()?;
        let slot = Self::slot(&mut g, handle)?;
        if !slot.free_around(around, Some(match_id)) {
            return Err(StandingsError::RecorderUnavailable);
        }
        slot.booking_mut(match_id, around).around = around;
        log::info!("Recorder {} held for match {}", handle.address, match_id);
        Ok(())
    }

    fn reserve(&self, handle: &RecorderHandle, reservation: Reservation) -> Result<(), StandingsError> {
        let mut g = self.lock()?;
        let slot = Self::slot(&mut g, handle)?;
        if !slot.free_around(reservation.around, Some(reservation.match_id)) {
            return Err(StandingsError::RecorderUnavailable);
        }
        log::info!(
            "Recorder {} reserved for match {} on {}",
            handle.address,
            reservation.match_id,
            reservation.address
        );
        let booking = slot.booking_mut(reservation.match_id, reservation.around);
        booking.around = reservation.around;
        booking.reservation = Some(reservation);
        Ok(())
    }

    fn release(&self, handle: &RecorderHandle, match_id: MatchId) -> Result<(), StandingsError> {
        let mut g = self.lock()?;
        if let Some(slot) = g.iter_mut().find(|s| s.handle.id == handle.id) {
            slot.bookings.retain(|b| b.match_id != match_id);
        }
        Ok(())
    }

    fn is_recording(&self, id: RecorderId, match_id: MatchId) -> bool {
        self.reservation(id, match_id).is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn poisoned_pool_refuses_instead_of_reporting_free() {
        let pool = Arc::new(RecorderPool::new(["10.0.0.1:27020"]));
        let handle = pool.find_available_recorder(Utc::now()).unwrap();
        let poisoner = Arc::clone(&pool);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.slots.lock().unwrap();
            panic!("recorder thread died");
        })
        .join();

        let match_id = Uuid::new_v4();
        assert!(pool.find_available_recorder(Utc::now()).is_none());
        assert!(matches!(
            pool.hold(&handle, match_id, Utc::now()),
            Err(StandingsError::Storage(_))
        ));
        assert!(pool.release(&handle, match_id).is_err());
        assert_eq!(pool.release_expired(Utc::now()), 0);
    }
}
