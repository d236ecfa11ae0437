//! Shared configuration for the carewatch tools.
//!
//! TOML profiles, credential resolution (env + keyring + plaintext),
//! and translation to `carewatch_core::ClientConfig` / `MonitorConfig`.
//! The CLI layers its global flags on top of what this crate resolves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use directories::ProjectDirs;
use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use carewatch_core::{AuthCredentials, ClientConfig, MonitorConfig, StaffIdentity, TlsVerification};

/// Service name under which secrets are stored in the system keyring.
pub const KEYRING_SERVICE: &str = "carewatch";

/// Environment variable consulted for the login password.
pub const PASSWORD_ENV: &str = "CAREWATCH_PASSWORD";

// ── Error ───────────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid {field}: {reason}")]
    Validation { field: String, reason: String },

    #[error("no password configured for profile '{profile}'")]
    NoCredentials { profile: String },

    #[error("profile '{name}' not found (available: {available})")]
    ProfileNotFound { name: String, available: String },

    #[error("keyring error: {0}")]
    Keyring(String),

    #[error("failed to serialize config: {0}")]
    Serialization(#[from] toml::ser::Error),

    #[error("config loading failed: {0}")]
    Figment(Box<figment::Error>),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<figment::Error> for ConfigError {
    fn from(err: figment::Error) -> Self {
        Self::Figment(Box::new(err))
    }
}

impl From<keyring::Error> for ConfigError {
    fn from(err: keyring::Error) -> Self {
        Self::Keyring(err.to_string())
    }
}

// ── TOML config structs ─────────────────────────────────────────────

/// Top-level TOML configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    /// Profile used when none is selected explicitly.
    pub default_profile: Option<String>,

    #[serde(default)]
    pub defaults: Defaults,

    /// Named backend profiles.
    #[serde(default)]
    pub profiles: HashMap<String, Profile>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            default_profile: Some("default".into()),
            defaults: Defaults::default(),
            profiles: HashMap::new(),
        }
    }
}

impl Config {
    /// Look up a profile, listing the known names on failure.
    pub fn profile(&self, name: &str) -> Result<&Profile, ConfigError> {
        self.profiles.get(name).ok_or_else(|| ConfigError::ProfileNotFound {
            name: name.into(),
            available: self.profile_names(),
        })
    }

    /// Comma-separated, sorted profile names, or `(none)`.
    pub fn profile_names(&self) -> String {
        let mut names: Vec<&str> = self.profiles.keys().map(String::as_str).collect();
        if names.is_empty() {
            return "(none)".into();
        }
        names.sort_unstable();
        names.join(", ")
    }

    /// A copy safe to print: plaintext secrets are masked.
    pub fn redacted(&self) -> Self {
        let mut copy = self.clone();
        for profile in copy.profiles.values_mut() {
            for secret in [&mut profile.token, &mut profile.password] {
                if secret.is_some() {
                    *secret = Some(REDACTED.into());
                }
            }
        }
        copy
    }
}

const REDACTED: &str = "********";

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Defaults {
    #[serde(default = "default_output")]
    pub output: String,

    #[serde(default = "default_color")]
    pub color: String,

    #[serde(default)]
    pub insecure: bool,

    /// Request timeout in seconds.
    #[serde(default = "default_timeout")]
    pub timeout: u64,

    /// Background poll period in seconds.
    #[serde(default = "default_poll_interval")]
    pub poll_interval: u64,
}

impl Default for Defaults {
    fn default() -> Self {
        Self {
            output: default_output(),
            color: default_color(),
            insecure: false,
            timeout: default_timeout(),
            poll_interval: default_poll_interval(),
        }
    }
}

fn default_output() -> String {
    "table".into()
}
fn default_color() -> String {
    "auto".into()
}
fn default_timeout() -> u64 {
    10
}
fn default_poll_interval() -> u64 {
    15
}

/// A named backend profile.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Profile {
    /// Backend base URL (e.g., "https://care.example.org").
    pub server: String,

    /// Login email. Combined with a password when no token is configured.
    pub email: Option<String>,

    /// Display name used for "handled by" attribution.
    pub staff_name: Option<String>,

    /// Backend user id sent as `handling_by`.
    pub staff_id: Option<String>,

    /// Access token (plaintext -- prefer keyring or env var).
    pub token: Option<String>,

    /// Environment variable name containing the access token.
    pub token_env: Option<String>,

    /// Login password (plaintext -- prefer keyring).
    pub password: Option<String>,

    /// Path to custom CA certificate.
    pub ca_cert: Option<PathBuf>,

    /// Override insecure TLS setting.
    pub insecure: Option<bool>,

    /// Override request timeout (seconds).
    pub timeout: Option<u64>,

    /// Override background poll period (seconds, 0 disables).
    pub poll_interval: Option<u64>,

    /// Offset for displayed times, in minutes east of UTC.
    pub utc_offset_minutes: Option<i32>,
}

// ── Config file path ────────────────────────────────────────────────

/// Resolve the config file path via XDG / platform conventions.
pub fn config_path() -> PathBuf {
    ProjectDirs::from("org", "carewatch", "carewatch").map_or_else(
        || {
            let mut p = dirs_fallback();
            p.push("config.toml");
            p
        },
        |dirs| dirs.config_dir().join("config.toml"),
    )
}

fn dirs_fallback() -> PathBuf {
    let mut p = PathBuf::from(std::env::var("HOME").unwrap_or_else(|_| ".".into()));
    p.push(".config");
    p.push("carewatch");
    p
}

// ── Config loading ──────────────────────────────────────────────────

/// Load the full Config from the canonical file + environment.
pub fn load_config() -> Result<Config, ConfigError> {
    load_config_from(&config_path())
}

/// Load config from `path`, then `CAREWATCH_*` environment overrides.
///
/// Nested keys are separated by a double underscore, e.g.
/// `CAREWATCH_PROFILES__HOME__SERVER`. A missing file is not an error.
pub fn load_config_from(path: &Path) -> Result<Config, ConfigError> {
    let figment = Figment::new()
        .merge(Serialized::defaults(Config::default()))
        .merge(Toml::file(path))
        .merge(Env::prefixed("CAREWATCH_").split("__"));

    let config: Config = figment.extract()?;
    debug!(path = %path.display(), profiles = config.profiles.len(), "config loaded");
    Ok(config)
}

// ── Config saving ───────────────────────────────────────────────────

/// Serialize config to TOML and write it to the canonical config path.
pub fn save_config(cfg: &Config) -> Result<PathBuf, ConfigError> {
    let path = config_path();
    save_config_to(cfg, &path)?;
    Ok(path)
}

pub fn save_config_to(cfg: &Config, path: &Path) -> Result<(), ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let toml_str = toml::to_string_pretty(cfg)?;
    std::fs::write(path, toml_str)?;
    Ok(())
}

// ── Keyring ─────────────────────────────────────────────────────────

/// Which secret a keyring entry holds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretKind {
    Token,
    Password,
}

impl SecretKind {
    fn key(self, profile_name: &str) -> String {
        match self {
            Self::Token => format!("{profile_name}/token"),
            Self::Password => format!("{profile_name}/password"),
        }
    }
}

/// Store a secret for `profile_name` in the system keyring.
pub fn store_secret(profile_name: &str, kind: SecretKind, secret: &str) -> Result<(), ConfigError> {
    let entry = keyring::Entry::new(KEYRING_SERVICE, &kind.key(profile_name))?;
    entry.set_password(secret)?;
    Ok(())
}

/// Read a secret from the system keyring; any failure reads as absent.
pub fn keyring_secret(profile_name: &str, kind: SecretKind) -> Option<String> {
    keyring::Entry::new(KEYRING_SERVICE, &kind.key(profile_name))
        .and_then(|entry| entry.get_password())
        .ok()
}

// ── Credential resolution (without CLI flags) ───────────────────────

/// Resolve the access token: `token_env` variable, then keyring, then
/// plaintext in the profile.
pub fn resolve_token(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    resolve_token_with(profile, profile_name, keyring_secret)
}

/// Resolve the login password: `CAREWATCH_PASSWORD`, then keyring, then
/// plaintext in the profile.
pub fn resolve_password(profile: &Profile, profile_name: &str) -> Option<SecretString> {
    resolve_password_with(profile, profile_name, keyring_secret)
}

/// Resolve `AuthCredentials` for a profile.
///
/// A token wins over email + password. A profile with neither is
/// anonymous; the backend decides whether that is acceptable.
pub fn resolve_auth(profile: &Profile, profile_name: &str) -> Result<AuthCredentials, ConfigError> {
    resolve_auth_with(profile, profile_name, keyring_secret)
}

fn resolve_token_with(
    profile: &Profile,
    profile_name: &str,
    from_keyring: impl Fn(&str, SecretKind) -> Option<String>,
) -> Option<SecretString> {
    // 1. Profile's token_env → env var lookup
    let from_env = profile
        .token_env
        .as_deref()
        .and_then(|name| std::env::var(name).ok());

    from_env
        // 2. System keyring
        .or_else(|| from_keyring(profile_name, SecretKind::Token))
        // 3. Plaintext in config
        .or_else(|| profile.token.clone())
        .filter(|t| !t.is_empty())
        .map(SecretString::from)
}

fn resolve_password_with(
    profile: &Profile,
    profile_name: &str,
    from_keyring: impl Fn(&str, SecretKind) -> Option<String>,
) -> Option<SecretString> {
    std::env::var(PASSWORD_ENV)
        .ok()
        .or_else(|| from_keyring(profile_name, SecretKind::Password))
        .or_else(|| profile.password.clone())
        .filter(|p| !p.is_empty())
        .map(SecretString::from)
}

fn resolve_auth_with(
    profile: &Profile,
    profile_name: &str,
    from_keyring: impl Fn(&str, SecretKind) -> Option<String>,
) -> Result<AuthCredentials, ConfigError> {
    if let Some(token) = resolve_token_with(profile, profile_name, &from_keyring) {
        return Ok(AuthCredentials::Token(token));
    }

    match profile.email.as_deref().filter(|e| !e.trim().is_empty()) {
        Some(email) => {
            let password = resolve_password_with(profile, profile_name, &from_keyring).ok_or_else(|| {
                ConfigError::NoCredentials {
                    profile: profile_name.into(),
                }
            })?;
            Ok(AuthCredentials::Login {
                email: email.trim().to_owned(),
                password,
            })
        }
        None => Ok(AuthCredentials::Anonymous),
    }
}

// ── Translation to core config ──────────────────────────────────────

/// Parse a backend URL, rejecting anything that is not http(s).
pub fn parse_server_url(raw: &str) -> Result<url::Url, ConfigError> {
    let invalid = |reason: String| ConfigError::Validation {
        field: "server".into(),
        reason,
    };
    let url: url::Url = raw
        .trim()
        .parse()
        .map_err(|_| invalid(format!("invalid URL: {raw}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(invalid(format!("unsupported scheme '{other}' in {raw}"))),
    }
}

/// TLS mode for a profile: insecure wins, then a custom CA, then the
/// system roots.
pub fn tls_verification(profile: &Profile, defaults: &Defaults) -> TlsVerification {
    if profile.insecure.unwrap_or(defaults.insecure) {
        TlsVerification::DangerAcceptInvalid
    } else if let Some(ref ca_path) = profile.ca_cert {
        TlsVerification::CustomCa(ca_path.clone())
    } else {
        TlsVerification::SystemDefaults
    }
}

/// Build a `ClientConfig` from a profile -- no CLI flag overrides.
pub fn profile_to_client_config(
    profile: &Profile,
    profile_name: &str,
    defaults: &Defaults,
) -> Result<ClientConfig, ConfigError> {
    let url = parse_server_url(&profile.server)?;
    let auth = resolve_auth(profile, profile_name)?;

    Ok(ClientConfig {
        url,
        auth,
        tls: tls_verification(profile, defaults),
        timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
    })
}

/// The staff member a profile acts as.
pub fn staff_identity(profile: &Profile) -> StaffIdentity {
    let mut staff = StaffIdentity {
        id: profile.staff_id.clone(),
        email: profile.email.clone(),
        ..StaffIdentity::default()
    };
    if let Some(name) = profile.staff_name.as_deref().filter(|n| !n.trim().is_empty()) {
        name.trim().clone_into(&mut staff.name);
    }
    staff
}

/// Build the monitor tuning for a profile.
pub fn monitor_config(profile: &Profile, defaults: &Defaults) -> MonitorConfig {
    MonitorConfig {
        staff: staff_identity(profile),
        poll_interval: Duration::from_secs(profile.poll_interval.unwrap_or(defaults.poll_interval)),
        request_timeout: Duration::from_secs(profile.timeout.unwrap_or(defaults.timeout)),
        utc_offset_minutes: profile.utc_offset_minutes.unwrap_or_default(),
        ..MonitorConfig::default()
    }
}
