//! CLI-side configuration: global flag overrides on top of
//! `carewatch_config` profiles.
//!
//! Core never sees profiles -- it receives a pre-built `ClientConfig` and
//! `MonitorConfig`.

use std::time::Duration;

use secrecy::SecretString;

use carewatch_config::{Config, Profile};
use carewatch_core::{AuthCredentials, ClientConfig, MonitorConfig};

use crate::cli::GlobalOpts;
use crate::error::CliError;

/// Everything a backend-bound command needs.
#[derive(Debug)]
pub struct Resolved {
    pub profile_name: String,
    pub client: ClientConfig,
    pub monitor: MonitorConfig,
}

/// Resolve the active profile name from CLI flags and config.
pub fn active_profile_name(global: &GlobalOpts, config: &Config) -> String {
    global
        .profile
        .clone()
        .or_else(|| config.default_profile.clone())
        .unwrap_or_else(|| "default".into())
}

/// Build client and monitor configuration from the config file, the
/// active profile and CLI overrides (flag > env > profile > defaults).
pub fn resolve(global: &GlobalOpts, cfg: &Config) -> Result<Resolved, CliError> {
    let profile_name = active_profile_name(global, cfg);
    let mut profile = base_profile(global, cfg, &profile_name)?;

    // 1. Flag overrides
    if let Some(ref server) = global.server {
        profile.server.clone_from(server);
    }
    if let Some(ref email) = global.email {
        // An explicit login replaces any stored token.
        profile.email = Some(email.clone());
        profile.token = None;
        profile.token_env = None;
    }
    if let Some(timeout) = global.timeout {
        profile.timeout = Some(timeout);
    }
    if global.insecure {
        profile.insecure = Some(true);
    }

    // 2. Client config; a --token flag bypasses the credential chain
    let client = match global.token.as_deref().filter(|t| !t.is_empty()) {
        Some(token) => ClientConfig {
            url: carewatch_config::parse_server_url(&profile.server)?,
            auth: AuthCredentials::Token(SecretString::from(token.to_owned())),
            tls: carewatch_config::tls_verification(&profile, &cfg.defaults),
            timeout: Duration::from_secs(profile.timeout.unwrap_or(cfg.defaults.timeout)),
        },
        None => carewatch_config::profile_to_client_config(&profile, &profile_name, &cfg.defaults)?,
    };

    // 3. Monitor tuning
    let monitor = carewatch_config::monitor_config(&profile, &cfg.defaults);

    Ok(Resolved {
        profile_name,
        client,
        monitor,
    })
}

/// The named profile, or a blank one when `--server` alone is enough.
fn base_profile(global: &GlobalOpts, cfg: &Config, profile_name: &str) -> Result<Profile, CliError> {
    if let Some(profile) = cfg.profiles.get(profile_name) {
        return Ok(profile.clone());
    }
    if global.server.is_some() {
        return Ok(Profile::default());
    }
    if global.profile.is_some() {
        return Err(CliError::ProfileNotFound {
            name: profile_name.into(),
            available: cfg.profile_names(),
        });
    }
    Err(CliError::NoConfig {
        path: carewatch_config::config_path().display().to_string(),
    })
}
