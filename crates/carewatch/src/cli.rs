//! Clap derive structures for the `carewatch` CLI.
//!
//! Defines the complete command tree, global flags, and shared types.

use clap::{Args, Parser, Subcommand, ValueEnum};

// ── Top-Level CLI ────────────────────────────────────────────────────

/// carewatch -- alarm dashboard for eldercare staff
#[derive(Debug, Parser)]
#[command(
    name = "carewatch",
    version,
    about = "Triage eldercare vital-sign and fall alarms from the command line",
    long_about = "Lists alarms raised by the monitoring backend and walks staff through\n\
        claiming, releasing and resolving them.\n\n\
        Resolutions are recorded in the care journal shown by `alarms watch`.",
    propagate_version = true,
    subcommand_required = true,
    arg_required_else_help = true
)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalOpts,

    #[command(subcommand)]
    pub command: Command,
}

// ── Global Options ───────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct GlobalOpts {
    /// Backend profile to use
    #[arg(long, short = 'p', env = "CAREWATCH_PROFILE", global = true)]
    pub profile: Option<String>,

    /// Backend URL (overrides profile)
    #[arg(long, short = 's', env = "CAREWATCH_SERVER", global = true)]
    pub server: Option<String>,

    /// Access token (overrides profile credentials)
    #[arg(long, env = "CAREWATCH_TOKEN", global = true, hide_env_values = true)]
    pub token: Option<String>,

    /// Login email; the password comes from CAREWATCH_PASSWORD or the keyring
    #[arg(long, env = "CAREWATCH_EMAIL", global = true)]
    pub email: Option<String>,

    /// Output format
    #[arg(
        long,
        short = 'o',
        env = "CAREWATCH_OUTPUT",
        default_value = "table",
        global = true
    )]
    pub output: OutputFormat,

    /// When to use color output
    #[arg(long, default_value = "auto", global = true)]
    pub color: ColorMode,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(long, short = 'v', action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Suppress non-error output
    #[arg(long, short = 'q', global = true)]
    pub quiet: bool,

    /// Accept invalid TLS certificates
    #[arg(long, short = 'k', env = "CAREWATCH_INSECURE", global = true)]
    pub insecure: bool,

    /// Request timeout in seconds (overrides profile)
    #[arg(long, env = "CAREWATCH_TIMEOUT", global = true)]
    pub timeout: Option<u64>,
}

// ── Output & Color Enums ─────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Pretty table (default, interactive)
    Table,
    /// Pretty-printed JSON
    Json,
    /// Compact single-line JSON
    JsonCompact,
    /// YAML
    Yaml,
    /// Plain text, one value per line (scripting)
    Plain,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum ColorMode {
    /// Auto-detect (color if terminal is interactive)
    Auto,
    /// Always emit color codes
    Always,
    /// Never emit color codes
    Never,
}

// ── Top-Level Command Enum ───────────────────────────────────────────

#[derive(Debug, Subcommand)]
pub enum Command {
    /// List and handle alarms
    #[command(alias = "a")]
    Alarms(AlarmsArgs),

    /// Manage CLI configuration and profiles
    Config(ConfigArgs),

    /// Generate shell completions
    Completions(CompletionsArgs),
}

// ── Alarms ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct AlarmsArgs {
    #[command(subcommand)]
    pub command: AlarmsCommand,
}

#[derive(Debug, Subcommand)]
pub enum AlarmsCommand {
    /// List open alarms
    #[command(alias = "ls")]
    List {
        /// Hide alarms someone is already handling
        #[arg(long)]
        active: bool,
    },

    /// Mark an alarm as being handled by you
    Claim {
        /// Alarm ID
        id: String,
    },

    /// Give up your claim on an alarm
    Release {
        /// Alarm ID
        id: String,
    },

    /// Resolve an alarm and record it in the care journal
    Resolve {
        /// Alarm ID
        id: String,

        /// Resolution reason (repeatable), e.g. "Nothing to report", "Pain",
        /// "High O2", "High HR", "LOW HR"
        #[arg(long, short = 'r')]
        reason: Vec<String>,

        /// Free-text care note
        #[arg(long, short = 'n')]
        note: Option<String>,
    },

    /// Follow alarms live until Ctrl-C
    #[command(alias = "w")]
    Watch,

    /// Print the standard resolution reasons
    Reasons,
}

// ── Config ───────────────────────────────────────────────────────────

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Create initial config file with guided setup
    Init,

    /// Display the current configuration (secrets redacted)
    Show,

    /// Print the config file location
    Path,

    /// List configured profiles
    Profiles,

    /// Set the default profile
    Use {
        /// Profile name to set as default
        name: String,
    },
}

#[derive(Debug, Args)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    pub shell: clap_complete::Shell,
}
