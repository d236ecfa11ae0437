// ── Core error types ──
//
// User-facing errors from carewatch-core. Consumers never see raw HTTP
// details; the `From<carewatch_api::Error>` impl translates transport
// failures into the alarm workflow's taxonomy.

use thiserror::Error;

/// Unified error type for the core crate.
#[derive(Debug, Error)]
pub enum CoreError {
    // ── Input errors ─────────────────────────────────────────────────
    /// Rejected before any network call; nothing was changed.
    #[error("Validation failed: {message}")]
    Validation { message: String },

    #[error("Alarm not found: {id}")]
    AlarmNotFound { id: String },

    // ── Backend errors ───────────────────────────────────────────────
    #[error("Authentication required. Please log in again.")]
    AuthenticationRequired { detail: String },

    /// The backend does not implement an endpoint (HTTP 404).
    #[error("Backend does not support {capability}")]
    CapabilityMissing { capability: String },

    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    #[error("Cannot connect to backend at {url}: {reason}")]
    ConnectionFailed { url: String, reason: String },

    #[error("{message}")]
    Api {
        message: String,
        /// HTTP status code (if applicable).
        status: Option<u16>,
    },

    // ── Lifecycle errors ─────────────────────────────────────────────
    /// The monitor was stopped while the request was in flight.
    #[error("Operation cancelled: monitor stopped")]
    Cancelled,

    // ── Configuration errors ─────────────────────────────────────────
    #[error("Configuration error: {message}")]
    Config { message: String },

    // ── Internal errors ──────────────────────────────────────────────
    #[error("Internal error: {0}")]
    Internal(String),
}

impl CoreError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    pub fn is_auth_error(&self) -> bool {
        matches!(self, Self::AuthenticationRequired { .. })
    }

    pub fn is_capability_missing(&self) -> bool {
        matches!(self, Self::CapabilityMissing { .. })
    }

    /// Transient failures the user can safely retry.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout { .. } | Self::ConnectionFailed { .. } => true,
            Self::Api { status, .. } => status.is_none_or(|s| s >= 500),
            _ => false,
        }
    }

    /// Message shown in the dashboard status line.
    ///
    /// Retryable failures are marked as such so they read as a hiccup
    /// rather than a final answer.
    pub fn status_message(&self) -> String {
        if self.is_retryable() {
            format!("{self}. You can try again.")
        } else {
            self.to_string()
        }
    }
}

// ── Conversion from transport-layer errors ───────────────────────────

impl From<carewatch_api::Error> for CoreError {
    fn from(err: carewatch_api::Error) -> Self {
        match err {
            carewatch_api::Error::Authentication { message } => {
                CoreError::AuthenticationRequired { detail: message }
            }
            carewatch_api::Error::NotFound { path } => CoreError::CapabilityMissing { capability: path },
            carewatch_api::Error::Api { status, message } => CoreError::Api {
                message,
                status: Some(status),
            },
            carewatch_api::Error::Transport(ref e) => {
                // Timeouts land here only for clients whose duration is unknown.
                if err.is_transient() {
                    CoreError::ConnectionFailed {
                        url: e
                            .url()
                            .map_or_else(|| "<unknown>".into(), ToString::to_string),
                        reason: e.to_string(),
                    }
                } else if err.is_auth_expired() {
                    CoreError::AuthenticationRequired {
                        detail: e.to_string(),
                    }
                } else if err.is_not_found() {
                    CoreError::CapabilityMissing {
                        capability: e.url().map(|u| u.path().to_owned()).unwrap_or_default(),
                    }
                } else {
                    CoreError::Api {
                        message: e.to_string(),
                        status: err.status(),
                    }
                }
            }
            carewatch_api::Error::InvalidUrl(e) => CoreError::Config {
                message: format!("Invalid URL: {e}"),
            },
            carewatch_api::Error::Timeout { timeout_secs } => CoreError::Timeout { timeout_secs },
            carewatch_api::Error::Tls(msg) => CoreError::ConnectionFailed {
                url: String::new(),
                reason: format!("TLS error: {msg}"),
            },
            carewatch_api::Error::Deserialization { message, body: _ } => {
                CoreError::Internal(format!("Unexpected backend response: {message}"))
            }
        }
    }
}
