// ── Domain model ──
//
// Display-oriented types the monitor hands to presentation layers.
// Wire types stay in `carewatch_api`; `convert` bridges the two.

pub mod alarm;
pub mod journal;
pub mod staff;

pub use alarm::{Alarm, AlarmKind, AlarmStatus};
pub use journal::{JournalEntry, Resolution, STANDARD_REASONS};
pub use staff::StaffIdentity;
