// carewatch-api: Async Rust client for the eldercare monitoring backend

pub mod alert_events;
pub mod auth;
pub mod client;
pub mod error;
pub mod models;
pub mod transport;

pub use auth::{AuthTokens, LoginRequest};
pub use client::CareClient;
pub use error::Error;
pub use models::{AlertEvent, AlertEventQuery, AlertEventStatus, HandlingRequest, ResolveRequest};
pub use transport::{TlsMode, TransportConfig};
