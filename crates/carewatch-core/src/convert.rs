// ── API-to-domain conversions ──
//
// Bridges raw `carewatch_api` alert events into display-ready `Alarm`s and
// builds request bodies and journal entries from domain values. Every
// function here is pure: no clock reads, no I/O.

use chrono::{DateTime, FixedOffset, NaiveDateTime, Offset, Utc};
use serde_json::Value;

use carewatch_api::{AlertEvent, HandlingRequest, ResolveRequest};

use crate::model::{Alarm, AlarmKind, AlarmStatus, JournalEntry, Resolution, StaffIdentity};

/// Placeholder for values and timestamps the backend did not provide.
pub const NOT_AVAILABLE: &str = "N/A";

const UNKNOWN_PATIENT: &str = "Unknown patient";

/// Display format for trigger times: "Nov 7, 08:24 PM".
const DISPLAY_FORMAT: &str = "%b %-d, %I:%M %p";

/// Display format for locally recorded actions: "Nov 7, 2024, 08:24 PM".
const ACTION_FORMAT: &str = "%b %-d, %Y, %I:%M %p";

const AVATAR_BASE: &str = "https://ui-avatars.com/api/";
const AVATAR_BACKGROUND: &str = "0D9488";

// ── Helpers ────────────────────────────────────────────────────────

/// Parse a backend timestamp.
///
/// Accepts RFC 3339, or a naive `YYYY-MM-DD[T ]HH:MM:SS[.fff]` taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<FixedOffset>> {
    let raw = raw.trim();
    if raw.is_empty() {
        return None;
    }
    if let Ok(dt) = DateTime::parse_from_rfc3339(raw) {
        return Some(dt);
    }
    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(raw, fmt).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

/// Format a backend timestamp for display, or `"N/A"` if it is missing or
/// unparseable. Never fails.
pub fn format_display_time(raw: Option<&str>, offset: &FixedOffset) -> String {
    raw.and_then(parse_timestamp).map_or_else(
        || NOT_AVAILABLE.to_owned(),
        |dt| dt.with_timezone(offset).format(DISPLAY_FORMAT).to_string(),
    )
}

/// Format the moment of a local action (claim, resolve).
pub fn format_action_time(at: DateTime<Utc>, offset: &FixedOffset) -> String {
    at.with_timezone(offset).format(ACTION_FORMAT).to_string()
}

/// Stringify a measured value; `"N/A"` when absent or null.
pub fn display_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => NOT_AVAILABLE.to_owned(),
        Some(Value::String(s)) => s.clone(),
        Some(other) => other.to_string(),
    }
}

/// First letter of each whitespace-separated token, uppercased.
/// `"?"` for a blank name.
pub fn patient_initials(name: &str) -> String {
    let initials: String = name
        .split_whitespace()
        .filter_map(|token| token.chars().next())
        .flat_map(char::to_uppercase)
        .collect();
    if initials.is_empty() {
        "?".to_owned()
    } else {
        initials
    }
}

/// Deterministic placeholder avatar built from the patient's initials.
pub fn avatar_url(name: &str) -> String {
    let query = url::form_urlencoded::Serializer::new(String::new())
        .append_pair("name", &patient_initials(name))
        .append_pair("background", AVATAR_BACKGROUND)
        .append_pair("color", "fff")
        .append_pair("size", "100")
        .finish();
    format!("{AVATAR_BASE}?{query}")
}

// ── AlertEvent → Alarm ─────────────────────────────────────────────

/// Map an alert event to an alarm, displaying times in UTC.
pub fn to_alarm(event: &AlertEvent) -> Alarm {
    to_alarm_in(event, &Utc.fix())
}

/// Map an alert event to an alarm, displaying times at `offset`.
///
/// Staff attribution is only carried while the server reports the event
/// as being handled; stale `handlingByName`/`handlingAt` fields are dropped.
pub fn to_alarm_in(event: &AlertEvent, offset: &FixedOffset) -> Alarm {
    let alarm_type = event.alert_type.clone().unwrap_or_default();
    let raw_name = event.patient_name.as_deref().unwrap_or_default();
    let patient_name = if raw_name.trim().is_empty() {
        UNKNOWN_PATIENT.to_owned()
    } else {
        raw_name.to_owned()
    };

    let (handled_by, handled_at) = if event.is_handling {
        (
            event.handling_by_name.clone(),
            event
                .handling_at
                .as_deref()
                .map(|at| format_display_time(Some(at), offset)),
        )
    } else {
        (None, None)
    };

    let resolved_at = if event.is_resolved {
        event
            .resolved_at
            .as_deref()
            .map(|at| format_display_time(Some(at), offset))
    } else {
        None
    };

    Alarm {
        id: event.id.clone(),
        patient_id: event.patient_id.clone(),
        patient_avatar: avatar_url(raw_name),
        patient_name,
        kind: AlarmKind::from_raw(&alarm_type),
        alarm_type,
        value: display_value(event.value.as_ref()),
        time: format_display_time(event.triggered_at.as_deref(), offset),
        handled_by,
        handled_at,
        resolved_at,
        status: AlarmStatus::from_flags(event.is_resolved, event.is_handling),
        notes: event.notes.clone(),
    }
}

// ── Domain → request bodies ────────────────────────────────────────

pub fn handling_request(staff: &StaffIdentity) -> HandlingRequest {
    HandlingRequest {
        handling_by: staff.handling_by().to_owned(),
        handling_by_name: staff.name.clone(),
        handling_by_initials: staff.initials(),
    }
}

pub fn resolve_request(resolution: &Resolution) -> ResolveRequest {
    ResolveRequest {
        resolution_options: resolution.options(),
        resolution_notes: resolution.free_text.trim().to_owned(),
    }
}

/// Build the journal record for an alarm resolved at `resolved_at`.
///
/// Attribution falls back to the acting staff member and the resolution
/// time when the alarm was never claimed.
pub fn to_journal_entry(
    id: u64,
    alarm: &Alarm,
    resolution: &Resolution,
    staff: &StaffIdentity,
    resolved_at: &str,
) -> JournalEntry {
    JournalEntry {
        id,
        alarm_id: alarm.id.clone(),
        patient_id: alarm.patient_id.clone(),
        patient_name: alarm.patient_name.clone(),
        patient_avatar: alarm.patient_avatar.clone(),
        alarm_type: alarm.alarm_type.clone(),
        alarm_value: alarm.value.clone(),
        detected_time: alarm.time.clone(),
        handled_by: alarm
            .handled_by
            .clone()
            .unwrap_or_else(|| staff.name.clone()),
        handled_at: alarm
            .handled_at
            .clone()
            .unwrap_or_else(|| resolved_at.to_owned()),
        resolved_at: resolved_at.to_owned(),
        selected_options: resolution.options(),
        free_text_notes: resolution.free_text.trim().to_owned(),
        alarm_notes: alarm.notes.clone(),
    }
}
