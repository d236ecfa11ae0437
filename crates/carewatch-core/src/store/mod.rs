// ── Alarm state ──
//
// Polled alarms, the optimistic overlay and the session journal.

mod alarm_store;
mod journal;
mod overlay;

pub use alarm_store::AlarmStore;
pub use journal::Journal;
pub use overlay::{HandlingClaim, Overlay, OverlayEntry};
