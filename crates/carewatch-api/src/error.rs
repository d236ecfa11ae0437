use thiserror::Error;

/// Top-level error type for the `carewatch-api` crate.
///
/// Covers every failure mode of the backend HTTP surface: authentication,
/// transport, HTTP status errors, and payload decoding.
/// `carewatch-core` maps these into the alarm workflow's error taxonomy.
#[derive(Debug, Error)]
pub enum Error {
    // ── Authentication ──────────────────────────────────────────────
    /// The backend rejected the bearer token (HTTP 401) or the login.
    #[error("Authentication failed: {message}")]
    Authentication { message: String },

    // ── HTTP status ─────────────────────────────────────────────────
    /// The endpoint does not exist on this backend (HTTP 404).
    #[error("Endpoint not found: {path}")]
    NotFound { path: String },

    /// Any other non-success HTTP status.
    #[error("Backend error (HTTP {status}): {message}")]
    Api { status: u16, message: String },

    // ── Transport ───────────────────────────────────────────────────
    /// HTTP transport error (connection refused, DNS failure, etc.)
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// URL parsing error.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    /// Request timed out.
    #[error("Request timed out after {timeout_secs}s")]
    Timeout { timeout_secs: u64 },

    /// TLS handshake or certificate error.
    #[error("TLS error: {0}")]
    Tls(String),

    // ── Data ────────────────────────────────────────────────────────
    /// JSON deserialization failed, with the raw body for debugging.
    #[error("Deserialization error: {message}")]
    Deserialization { message: String, body: String },
}

impl Error {
    /// Returns `true` if the bearer token is missing, expired or revoked
    /// and logging in again might resolve it.
    pub fn is_auth_expired(&self) -> bool {
        match self {
            Self::Authentication { .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::UNAUTHORIZED),
            _ => false,
        }
    }

    /// Returns `true` if this is a transient error worth retrying.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Transport(e) => e.is_timeout() || e.is_connect(),
            Self::Timeout { .. } => true,
            Self::Api { status, .. } => *status >= 500,
            _ => false,
        }
    }

    /// Returns `true` if the backend answered with HTTP 404.
    pub fn is_not_found(&self) -> bool {
        match self {
            Self::NotFound { .. } => true,
            Self::Transport(e) => e.status() == Some(reqwest::StatusCode::NOT_FOUND),
            _ => false,
        }
    }

    /// The HTTP status associated with this error, when there is one.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Authentication { .. } => Some(401),
            Self::NotFound { .. } => Some(404),
            Self::Api { status, .. } => Some(*status),
            Self::Transport(e) => e.status().map(|s| s.as_u16()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_http_statuses() {
        let unauthorized = Error::Authentication {
            message: "expired".into(),
        };
        assert!(unauthorized.is_auth_expired());
        assert_eq!(unauthorized.status(), Some(401));

        let missing = Error::NotFound {
            path: "/api/v2/alert-events/a1/release".into(),
        };
        assert!(missing.is_not_found());
        assert!(!missing.is_transient());

        let server = Error::Api {
            status: 503,
            message: "maintenance".into(),
        };
        assert!(server.is_transient());
        assert!(!server.is_not_found());

        let rejected = Error::Api {
            status: 422,
            message: "bad payload".into(),
        };
        assert!(!rejected.is_transient());
    }

    #[test]
    fn timeout_is_transient() {
        assert!(Error::Timeout { timeout_secs: 10 }.is_transient());
        assert!(!Error::Timeout { timeout_secs: 10 }.is_auth_expired());
    }
}
