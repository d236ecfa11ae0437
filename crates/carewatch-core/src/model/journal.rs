// ── Care journal types ──

use serde::{Deserialize, Serialize};

/// Structured reasons offered to staff when resolving an alarm.
pub const STANDARD_REASONS: &[&str] = &["Nothing to report", "Pain", "High O2", "High HR", "LOW HR"];

/// What the staff member recorded when closing an alarm.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Resolution {
    pub selected_options: Vec<String>,
    pub free_text: String,
}

impl Resolution {
    pub fn new(selected_options: Vec<String>, free_text: impl Into<String>) -> Self {
        Self {
            selected_options,
            free_text: free_text.into(),
        }
    }

    /// At least one non-blank reason or a non-blank note is required.
    pub fn is_justified(&self) -> bool {
        self.selected_options.iter().any(|o| !o.trim().is_empty())
            || !self.free_text.trim().is_empty()
    }

    /// Reasons with blank entries removed.
    pub fn options(&self) -> Vec<String> {
        self.selected_options
            .iter()
            .filter(|o| !o.trim().is_empty())
            .cloned()
            .collect()
    }
}

/// One resolved alarm in the session's care journal.
///
/// Created exactly once per successful resolve and never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JournalEntry {
    /// Millisecond timestamp, made strictly increasing within a journal.
    pub id: u64,
    pub alarm_id: String,
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub patient_avatar: String,
    pub alarm_type: String,
    pub alarm_value: String,
    pub detected_time: String,
    pub handled_by: String,
    pub handled_at: String,
    pub resolved_at: String,
    pub selected_options: Vec<String>,
    pub free_text_notes: String,
    pub alarm_notes: Option<String>,
}
