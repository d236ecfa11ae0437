// carewatch-core: Alarm workflow between carewatch-api and presentation layers.

pub mod config;
pub mod convert;
pub mod error;
pub mod model;
pub mod monitor;
pub mod source;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{AuthCredentials, ClientConfig, MonitorConfig, TlsVerification};
pub use error::CoreError;
pub use monitor::{ActionOutcome, AlarmMonitor, MonitorStatus};
pub use source::{AlertEventSource, connect};
pub use store::{AlarmStore, HandlingClaim, Journal, Overlay, OverlayEntry};
pub use stream::{Snapshot, SnapshotStream};

// Re-export model types at the crate root for ergonomics.
pub use model::{
    Alarm, AlarmKind, AlarmStatus, JournalEntry, Resolution, STANDARD_REASONS, StaffIdentity,
};
