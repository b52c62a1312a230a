//! Collaborators the engine calls outside the standings transaction: recorder reservation,
//! notifications and prediction scoring. Each comes with an in-memory implementation.

mod notify;
mod predictions;
mod recorder;

pub use notify::{LogNotifier, MatchEvent, Notifier};
pub use predictions::{Prediction, PredictionBook, PredictionService};
pub use recorder::{RecorderHandle, RecorderId, RecorderPool, RecorderService, Reservation};
