//! Config subcommand handlers.

use dialoguer::{Input, Password, Select};

use carewatch_config::{Profile, SecretKind};

use crate::cli::{ConfigArgs, ConfigCommand, GlobalOpts};
use crate::config;
use crate::error::CliError;
use crate::output;

/// Map a dialoguer / interactive I/O failure into CliError.
fn prompt_err(e: impl std::fmt::Display) -> CliError {
    CliError::Prompt(e.to_string())
}

// ── Handler ─────────────────────────────────────────────────────────

pub fn handle(args: ConfigArgs, global: &GlobalOpts) -> Result<(), CliError> {
    match args.command {
        ConfigCommand::Init => init(),

        ConfigCommand::Show => {
            let cfg = carewatch_config::load_config()?.redacted();
            let out = output::render_single(
                global.output,
                &cfg,
                |c| toml::to_string_pretty(c).unwrap_or_else(|e| format!("{c:#?}\n({e})")),
                |c| c.profile_names(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        ConfigCommand::Path => {
            println!("{}", carewatch_config::config_path().display());
            Ok(())
        }

        ConfigCommand::Profiles => {
            let cfg = carewatch_config::load_config()?;
            let active = config::active_profile_name(global, &cfg);
            if cfg.profiles.is_empty() {
                eprintln!("No profiles configured. Run: carewatch config init");
                return Ok(());
            }
            let mut names: Vec<&String> = cfg.profiles.keys().collect();
            names.sort();
            for name in names {
                let marker = if *name == active { " *" } else { "" };
                println!("{name}{marker}");
            }
            Ok(())
        }

        ConfigCommand::Use { name } => {
            let mut cfg = carewatch_config::load_config()?;
            cfg.profile(&name)?;
            cfg.default_profile = Some(name.clone());
            carewatch_config::save_config(&cfg)?;
            if !global.quiet {
                eprintln!("✓ Default profile set to '{name}'");
            }
            Ok(())
        }
    }
}

// ── Init: interactive wizard ────────────────────────────────────────

fn init() -> Result<(), CliError> {
    // A config that fails to parse aborts before any prompt.
    let mut cfg = carewatch_config::load_config()?;
    let config_path = carewatch_config::config_path();
    eprintln!("carewatch configuration wizard");
    eprintln!("   Config path: {}\n", config_path.display());

    // 1. Profile name
    let profile_name: String = Input::new()
        .with_prompt("Profile name")
        .default("default".into())
        .interact_text()
        .map_err(prompt_err)?;

    // 2. Backend URL
    let server: String = Input::new()
        .with_prompt("Backend URL")
        .validate_with(|input: &String| {
            carewatch_config::parse_server_url(input)
                .map(|_| ())
                .map_err(|e| e.to_string())
        })
        .interact_text()
        .map_err(prompt_err)?;

    // 3. Attribution
    let staff_name: String = Input::new()
        .with_prompt("Your name (shown as \"handled by\")")
        .allow_empty(true)
        .interact_text()
        .map_err(prompt_err)?;

    let mut profile = Profile {
        server: server.trim().to_owned(),
        staff_name: Some(staff_name.trim().to_owned()).filter(|s| !s.is_empty()),
        ..Profile::default()
    };

    // 4. Credentials
    let auth_choices = &["Email + password", "Access token", "None (open backend)"];
    let auth_selection = Select::new()
        .with_prompt("Authentication method")
        .items(auth_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    match auth_selection {
        0 => {
            let email: String = Input::new()
                .with_prompt("Email")
                .interact_text()
                .map_err(prompt_err)?;
            let password = Password::new()
                .with_prompt("Password")
                .interact()
                .map_err(prompt_err)?;
            profile.email = Some(email.trim().to_owned());
            profile.password = store_or_inline(&profile_name, SecretKind::Password, password)?;
        }
        1 => {
            let token = Password::new()
                .with_prompt("Access token")
                .interact()
                .map_err(prompt_err)?;
            profile.token = store_or_inline(&profile_name, SecretKind::Token, token)?;
        }
        _ => {}
    }

    // 5. Merge into the existing config and write it
    cfg.profiles.insert(profile_name.clone(), profile);
    cfg.default_profile = Some(profile_name.clone());
    let path = carewatch_config::save_config(&cfg)?;

    eprintln!("\n✓ Configuration written to {}", path.display());
    eprintln!("  Active profile: {profile_name}");
    eprintln!("\n  Test it: carewatch alarms list");
    Ok(())
}

/// Offer keyring storage for `secret`. Returns the value to keep in the
/// config file (`None` when it went to the keyring).
fn store_or_inline(
    profile_name: &str,
    kind: SecretKind,
    secret: String,
) -> Result<Option<String>, CliError> {
    if secret.is_empty() {
        return Err(CliError::Validation {
            field: "credentials".into(),
            reason: "value cannot be empty".into(),
        });
    }

    let store_choices = &[
        "Store in system keyring (recommended)",
        "Save to config file (plaintext)",
    ];
    let store_selection = Select::new()
        .with_prompt("Where to store it?")
        .items(store_choices)
        .default(0)
        .interact()
        .map_err(prompt_err)?;

    if store_selection == 0 {
        carewatch_config::store_secret(profile_name, kind, &secret)?;
        eprintln!("   ✓ Stored in system keyring");
        Ok(None)
    } else {
        Ok(Some(secret))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_secret_is_rejected_before_prompting() {
        let err = store_or_inline("default", SecretKind::Token, String::new()).unwrap_err();
        assert!(matches!(err, CliError::Validation { .. }));
    }

    #[test]
    fn prompt_errors_are_wrapped() {
        assert!(matches!(prompt_err("tty closed"), CliError::Prompt(ref m) if m == "tty closed"));
    }
}
