// ── Runtime configuration ──
//
// These types describe how to reach the backend and how the alarm monitor
// behaves. They carry credentials and tuning but never touch disk; the CLI
// builds them (via carewatch-config) and hands them in.

use std::time::Duration;

use chrono::{FixedOffset, Offset, Utc};
use secrecy::SecretString;
use url::Url;

use crate::model::StaffIdentity;

/// How to authenticate with the backend.
#[derive(Debug, Clone)]
pub enum AuthCredentials {
    /// A previously issued bearer token.
    Token(SecretString),
    /// Exchange email + password for a token on connect.
    Login {
        email: String,
        password: SecretString,
    },
    /// Send requests without a token (open development backends).
    Anonymous,
}

/// TLS verification strategy.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TlsVerification {
    /// System CA store (strict).
    #[default]
    SystemDefaults,
    /// Custom CA certificate file.
    CustomCa(std::path::PathBuf),
    /// Skip verification (self-signed staging backends).
    DangerAcceptInvalid,
}

/// Configuration for connecting to a backend.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    /// Server URL; bare origin, `/api` prefix, or full `/api/v2` root.
    pub url: Url,
    pub auth: AuthCredentials,
    pub tls: TlsVerification,
    /// Transport-level request timeout.
    pub timeout: Duration,
}

impl ClientConfig {
    pub fn new(url: Url, auth: AuthCredentials) -> Self {
        Self {
            url,
            auth,
            tls: TlsVerification::default(),
            timeout: Duration::from_secs(10),
        }
    }
}

/// Alarm monitor tuning.
#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// The staff member acting through this monitor.
    pub staff: StaffIdentity,
    /// Background poll period. Zero disables background polling.
    pub poll_interval: Duration,
    /// Upper bound on events fetched per poll.
    pub poll_limit: u32,
    /// Bound on each backend call made by the monitor.
    pub request_timeout: Duration,
    /// How long a degraded-mode warning stays visible.
    pub warning_ttl: Duration,
    /// Offset applied to displayed times, in minutes east of UTC.
    pub utc_offset_minutes: i32,
}

impl Default for MonitorConfig {
    fn default() -> Self {
        Self {
            staff: StaffIdentity::default(),
            poll_interval: Duration::from_secs(15),
            poll_limit: 1000,
            request_timeout: Duration::from_secs(10),
            warning_ttl: Duration::from_secs(6),
            utc_offset_minutes: 0,
        }
    }
}

impl MonitorConfig {
    /// Display offset; out-of-range values fall back to UTC.
    pub fn display_offset(&self) -> FixedOffset {
        self.utc_offset_minutes
            .checked_mul(60)
            .and_then(FixedOffset::east_opt)
            .unwrap_or_else(|| Utc.fix())
    }
}
