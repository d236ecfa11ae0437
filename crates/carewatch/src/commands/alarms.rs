//! Alarm command handlers.

use std::io::{self, IsTerminal};
use std::time::Duration;

use owo_colors::OwoColorize;
use tabled::Tabled;
use tracing::debug;

use carewatch_core::{
    ActionOutcome, Alarm, AlarmMonitor, AlarmStatus, JournalEntry, Resolution, STANDARD_REASONS,
};

use crate::cli::{AlarmsArgs, AlarmsCommand, GlobalOpts, OutputFormat};
use crate::config;
use crate::error::CliError;
use crate::output;

// ── Table rows ──────────────────────────────────────────────────────

#[derive(Tabled)]
struct AlarmRow {
    #[tabled(rename = "ID")]
    id: String,
    #[tabled(rename = "Patient")]
    patient: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Time")]
    time: String,
    #[tabled(rename = "Status")]
    status: String,
    #[tabled(rename = "Handled by")]
    handled_by: String,
}

fn alarm_row(a: &Alarm, color: bool) -> AlarmRow {
    AlarmRow {
        id: a.id.clone(),
        patient: a.patient_name.clone(),
        kind: a.type_label().to_owned(),
        value: a.value.clone(),
        time: a.time.clone(),
        status: output::status_label(a.status, color),
        handled_by: a.handled_by.clone().unwrap_or_default(),
    }
}

#[derive(Tabled)]
struct JournalRow {
    #[tabled(rename = "Resolved")]
    resolved_at: String,
    #[tabled(rename = "Patient")]
    patient: String,
    #[tabled(rename = "Type")]
    kind: String,
    #[tabled(rename = "Value")]
    value: String,
    #[tabled(rename = "Handled by")]
    handled_by: String,
    #[tabled(rename = "Reasons")]
    reasons: String,
    #[tabled(rename = "Notes")]
    notes: String,
}

impl From<&JournalEntry> for JournalRow {
    fn from(e: &JournalEntry) -> Self {
        Self {
            resolved_at: e.resolved_at.clone(),
            patient: e.patient_name.clone(),
            kind: e.alarm_type.clone(),
            value: e.alarm_value.clone(),
            handled_by: e.handled_by.clone(),
            reasons: e.selected_options.join(", "),
            notes: e.free_text_notes.clone(),
        }
    }
}

#[derive(Tabled)]
struct ReasonRow {
    #[tabled(rename = "Reason")]
    reason: String,
}

// ── Detail views ────────────────────────────────────────────────────

fn alarm_detail(a: &Alarm, color: bool) -> String {
    let mut fields = vec![
        ("ID", a.id.clone()),
        ("Patient", a.patient_name.clone()),
        ("Type", a.type_label().to_owned()),
        ("Value", a.value.clone()),
        ("Triggered", a.time.clone()),
        ("Status", output::status_label(a.status, color)),
    ];
    if let Some(ref by) = a.handled_by {
        fields.push(("Handled by", by.clone()));
    }
    if let Some(ref at) = a.handled_at {
        fields.push(("Handled at", at.clone()));
    }
    if a.shows_camera() {
        fields.push(("Camera", "available".into()));
    }
    if let Some(ref notes) = a.notes {
        fields.push(("Notes", notes.clone()));
    }
    output::detail_block(&fields)
}

fn journal_detail(e: &JournalEntry) -> String {
    output::detail_block(&[
        ("Alarm", e.alarm_id.clone()),
        ("Patient", e.patient_name.clone()),
        ("Type", e.alarm_type.clone()),
        ("Value", e.alarm_value.clone()),
        ("Detected", e.detected_time.clone()),
        ("Handled by", e.handled_by.clone()),
        ("Handled at", e.handled_at.clone()),
        ("Resolved at", e.resolved_at.clone()),
        ("Reasons", e.selected_options.join(", ")),
        ("Notes", e.free_text_notes.clone()),
    ])
}

// ── Handler ─────────────────────────────────────────────────────────

pub async fn handle(args: AlarmsArgs, global: &GlobalOpts) -> Result<(), CliError> {
    let color = output::should_color(global.color);

    match args.command {
        AlarmsCommand::Reasons => {
            let out = output::render_list(
                global.output,
                STANDARD_REASONS,
                |r| ReasonRow {
                    reason: (*r).to_owned(),
                },
                |r| (*r).to_owned(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AlarmsCommand::List { active } => {
            let monitor = open_monitor(global, true).await?;
            monitor.refresh().await?;
            let alarms: Vec<Alarm> = monitor
                .alarms_snapshot()
                .iter()
                .filter(|a| !active || a.status == AlarmStatus::Active)
                .map(|a| Alarm::clone(a))
                .collect();
            let out = output::render_list(
                global.output,
                &alarms,
                |a| alarm_row(a, color),
                |a| a.id.clone(),
            );
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AlarmsCommand::Claim { id } => {
            let monitor = open_monitor(global, true).await?;
            monitor.refresh().await?;
            let outcome = monitor.claim(&id).await?;
            report_outcome(&outcome, &format!("Alarm {id} marked in progress"), global, color);
            print_alarm(&monitor, &id, global, color);
            Ok(())
        }

        AlarmsCommand::Release { id } => {
            let monitor = open_monitor(global, true).await?;
            monitor.refresh().await?;
            let outcome = monitor.release(&id).await?;
            report_outcome(&outcome, &format!("Alarm {id} released"), global, color);
            print_alarm(&monitor, &id, global, color);
            Ok(())
        }

        AlarmsCommand::Resolve { id, reason, note } => {
            let resolution = Resolution::new(reason, note.unwrap_or_default());
            if !resolution.is_justified() {
                return Err(CliError::Validation {
                    field: "resolution".into(),
                    reason: "pass at least one --reason or a --note".into(),
                });
            }

            let monitor = open_monitor(global, true).await?;
            monitor.refresh().await?;
            let entry = monitor.resolve(&id, resolution).await?;
            if !global.quiet {
                eprintln!("Alarm {id} resolved and added to the care journal");
            }
            let out = output::render_single(global.output, &entry, journal_detail, |e| {
                e.alarm_id.clone()
            });
            output::print_output(&out, global.quiet);
            Ok(())
        }

        AlarmsCommand::Watch => watch(global, color).await,
    }
}

// ── Helpers ─────────────────────────────────────────────────────────

/// Connect with the resolved profile and build a monitor.
///
/// One-shot commands disable background polling.
async fn open_monitor(global: &GlobalOpts, one_shot: bool) -> Result<AlarmMonitor, CliError> {
    let cfg = carewatch_config::load_config()?;
    let resolved = config::resolve(global, &cfg)?;
    let client = carewatch_core::connect(&resolved.client).await?;

    let mut monitor_config = resolved.monitor;
    if one_shot {
        monitor_config.poll_interval = Duration::ZERO;
    }
    debug!(
        profile = %resolved.profile_name,
        api_root = %client.api_root(),
        "connected to backend"
    );
    Ok(AlarmMonitor::new(client, monitor_config))
}

fn report_outcome(outcome: &ActionOutcome, applied: &str, global: &GlobalOpts, color: bool) {
    if global.quiet {
        return;
    }
    match outcome {
        ActionOutcome::Applied => eprintln!("{applied}"),
        ActionOutcome::Degraded { warning } if color => eprintln!("{}", warning.yellow()),
        ActionOutcome::Degraded { warning } => eprintln!("warning: {warning}"),
        ActionOutcome::Ignored => eprintln!("Another claim is still in flight; nothing changed"),
    }
}

fn print_alarm(monitor: &AlarmMonitor, id: &str, global: &GlobalOpts, color: bool) {
    if let Some(alarm) = monitor.alarm(id) {
        let out = output::render_single(
            global.output,
            &alarm,
            |a| alarm_detail(a, color),
            |a| a.id.clone(),
        );
        output::print_output(&out, global.quiet);
    }
}

// ── Watch ───────────────────────────────────────────────────────────

async fn watch(global: &GlobalOpts, color: bool) -> Result<(), CliError> {
    let monitor = open_monitor(global, false).await?;
    let mut alarms = monitor.alarms();
    let mut journal = monitor.journal();
    let mut status = monitor.status();

    // A failed first load is shown on the dashboard; polling continues.
    if let Err(e) = monitor.start().await {
        debug!(error = %e, "initial load failed");
    }
    render_dashboard(&monitor, global, color);

    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => break,
            Some(_) = alarms.changed() => {}
            Some(_) = journal.changed() => {}
            Ok(()) = status.changed() => {}
            else => break,
        }
        render_dashboard(&monitor, global, color);
    }

    monitor.stop().await;
    Ok(())
}

fn render_dashboard(monitor: &AlarmMonitor, global: &GlobalOpts, color: bool) {
    if global.quiet {
        return;
    }
    let alarms = monitor.alarms_snapshot();
    let journal = monitor.journal_snapshot();
    let status = monitor.status_snapshot();

    if global.output != OutputFormat::Table {
        let snapshot = serde_json::json!({
            "alarms": &*alarms,
            "journal": &*journal,
            "warning": status.warning,
            "error": status.error,
            "lastPoll": status.last_poll,
        });
        let out = output::render_single(global.output, &snapshot, ToString::to_string, |_| {
            alarms
                .iter()
                .map(|a| a.id.clone())
                .collect::<Vec<_>>()
                .join("\n")
        });
        output::print_output(&out, false);
        return;
    }

    if io::stdout().is_terminal() {
        // Clear screen, cursor home.
        print!("\x1b[2J\x1b[H");
    }

    let offset = monitor.config().display_offset();
    let last_poll = status.last_poll.map_or_else(
        || "never".to_owned(),
        |at| at.with_timezone(&offset).format("%I:%M:%S %p").to_string(),
    );
    let header = format!(
        "{} open alarm(s)   last poll {last_poll}{}",
        monitor.active_count(),
        if status.loading { "   loading..." } else { "" }
    );
    println!("{}", if color { header.bold().to_string() } else { header });

    let rows: Vec<AlarmRow> = alarms.iter().map(|a| alarm_row(a, color)).collect();
    println!("{}", tabled::Table::new(rows).with(tabled::settings::Style::rounded()));

    if let Some(ref warning) = status.warning {
        let line = format!("! {warning}");
        println!("{}", if color { line.yellow().to_string() } else { line });
    }
    if let Some(ref error) = status.error {
        let line = format!("error: {error}");
        println!("{}", if color { line.red().to_string() } else { line });
    }

    if !journal.is_empty() {
        println!("\nCare journal");
        let rows: Vec<JournalRow> = journal.iter().map(|e| JournalRow::from(&**e)).collect();
        println!("{}", tabled::Table::new(rows).with(tabled::settings::Style::rounded()));
    }
}
