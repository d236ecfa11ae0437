//! CLI error types with miette diagnostics.
//!
//! Maps `CoreError` and `ConfigError` variants into user-facing errors with
//! actionable help text.

use miette::Diagnostic;
use thiserror::Error;

use carewatch_config::ConfigError;
use carewatch_core::CoreError;

/// Process exit codes.
pub mod exit_code {
    pub const GENERAL: i32 = 1;
    pub const USAGE: i32 = 2;
    pub const AUTH: i32 = 3;
    pub const NOT_FOUND: i32 = 4;
    pub const UNSUPPORTED: i32 = 5;
    pub const CONNECTION: i32 = 7;
    pub const TIMEOUT: i32 = 8;
}

#[derive(Debug, Error, Diagnostic)]
pub enum CliError {
    // ── Connection ───────────────────────────────────────────────────
    #[error("Could not connect to the monitoring backend at {url}")]
    #[diagnostic(
        code(carewatch::connection_failed),
        help(
            "Check that the backend is running and reachable.\n\
             Reason: {reason}\n\
             Self-signed certificate? Try --insecure (-k) or set ca_cert in your profile."
        )
    )]
    ConnectionFailed { url: String, reason: String },

    // ── Authentication ───────────────────────────────────────────────
    #[error("Authentication required. Please log in again.")]
    #[diagnostic(
        code(carewatch::auth_failed),
        help(
            "The backend rejected your credentials ({detail}).\n\
             Pass a fresh token with --token, or run: carewatch config init"
        )
    )]
    AuthFailed { detail: String },

    #[error("No password available for profile '{profile}'")]
    #[diagnostic(
        code(carewatch::no_credentials),
        help(
            "Set CAREWATCH_PASSWORD, store the password with: carewatch config init\n\
             Or pass an access token with --token."
        )
    )]
    NoCredentials { profile: String },

    // ── Alarms ───────────────────────────────────────────────────────
    #[error("Alarm '{id}' not found")]
    #[diagnostic(
        code(carewatch::not_found),
        help("Run: carewatch alarms list to see open alarms")
    )]
    AlarmNotFound { id: String },

    #[error("The backend does not support {capability}")]
    #[diagnostic(
        code(carewatch::unsupported),
        help("Ask your administrator to upgrade the monitoring backend.")
    )]
    Unsupported { capability: String },

    // ── API ──────────────────────────────────────────────────────────
    #[error("Backend error: {message}")]
    #[diagnostic(code(carewatch::api_error))]
    Api { message: String },

    // ── Validation ───────────────────────────────────────────────────
    #[error("Invalid value for {field}: {reason}")]
    #[diagnostic(code(carewatch::validation))]
    Validation { field: String, reason: String },

    // ── Configuration ────────────────────────────────────────────────
    #[error("Profile '{name}' not found in configuration")]
    #[diagnostic(
        code(carewatch::profile_not_found),
        help(
            "Available profiles: {available}\n\
             Create one with: carewatch config init"
        )
    )]
    ProfileNotFound { name: String, available: String },

    #[error("No backend configured")]
    #[diagnostic(
        code(carewatch::no_config),
        help(
            "Create a profile with: carewatch config init\n\
             Or pass --server <URL>. Expected config at: {path}"
        )
    )]
    NoConfig { path: String },

    #[error("Configuration error: {message}")]
    #[diagnostic(code(carewatch::config))]
    Config { message: String },

    // ── Timeout ──────────────────────────────────────────────────────
    #[error("Request timed out after {seconds}s")]
    #[diagnostic(
        code(carewatch::timeout),
        help("Increase the timeout with --timeout or check backend responsiveness.")
    )]
    Timeout { seconds: u64 },

    // ── IO / Interactive ─────────────────────────────────────────────
    #[error("prompt failed: {0}")]
    #[diagnostic(code(carewatch::interactive))]
    Prompt(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    /// Map this error to an exit code for process termination.
    pub fn exit_code(&self) -> i32 {
        match self {
            Self::ConnectionFailed { .. } => exit_code::CONNECTION,
            Self::AuthFailed { .. } | Self::NoCredentials { .. } => exit_code::AUTH,
            Self::AlarmNotFound { .. } | Self::ProfileNotFound { .. } => exit_code::NOT_FOUND,
            Self::Unsupported { .. } => exit_code::UNSUPPORTED,
            Self::Timeout { .. } => exit_code::TIMEOUT,
            Self::Validation { .. } | Self::NoConfig { .. } | Self::Config { .. } => {
                exit_code::USAGE
            }
            Self::Api { .. } | Self::Prompt(_) | Self::Io(_) => exit_code::GENERAL,
        }
    }
}

// ── CoreError → CliError mapping ─────────────────────────────────────

impl From<CoreError> for CliError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::Validation { message } => CliError::Validation {
                field: "input".into(),
                reason: message,
            },
            CoreError::AlarmNotFound { id } => CliError::AlarmNotFound { id },
            CoreError::AuthenticationRequired { detail } => CliError::AuthFailed { detail },
            CoreError::CapabilityMissing { capability } => CliError::Unsupported { capability },
            CoreError::Timeout { timeout_secs } => CliError::Timeout {
                seconds: timeout_secs,
            },
            CoreError::ConnectionFailed { url, reason } => CliError::ConnectionFailed { url, reason },
            CoreError::Api { message, .. } => CliError::Api { message },
            CoreError::Config { message } => CliError::Config { message },
            CoreError::Cancelled => CliError::Api {
                message: "operation cancelled".into(),
            },
            CoreError::Internal(message) => CliError::Api { message },
        }
    }
}

// ── ConfigError → CliError mapping ───────────────────────────────────

impl From<ConfigError> for CliError {
    fn from(err: ConfigError) -> Self {
        match err {
            ConfigError::Validation { field, reason } => CliError::Validation { field, reason },
            ConfigError::NoCredentials { profile } => CliError::NoCredentials { profile },
            ConfigError::ProfileNotFound { name, available } => {
                CliError::ProfileNotFound { name, available }
            }
            ConfigError::Io(e) => CliError::Io(e),
            other => CliError::Config {
                message: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn exit_codes_follow_error_kind() {
        let auth = CliError::from(CoreError::AuthenticationRequired {
            detail: "expired".into(),
        });
        assert_eq!(auth.exit_code(), exit_code::AUTH);
        assert_eq!(
            auth.to_string(),
            "Authentication required. Please log in again."
        );

        let missing = CliError::from(CoreError::AlarmNotFound { id: "a1".into() });
        assert_eq!(missing.exit_code(), exit_code::NOT_FOUND);

        let timeout = CliError::from(CoreError::Timeout { timeout_secs: 10 });
        assert_eq!(timeout.exit_code(), exit_code::TIMEOUT);

        let profile = CliError::from(ConfigError::ProfileNotFound {
            name: "ward".into(),
            available: "(none)".into(),
        });
        assert_eq!(profile.exit_code(), exit_code::NOT_FOUND);
    }
}
