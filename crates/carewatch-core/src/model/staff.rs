// ── Acting staff member ──

use serde::{Deserialize, Serialize};

/// The staff member on whose behalf alarms are claimed and resolved.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StaffIdentity {
    /// Backend user id, when known.
    pub id: Option<String>,
    pub email: Option<String>,
    /// Display name used for attribution ("handled by").
    pub name: String,
}

impl Default for StaffIdentity {
    fn default() -> Self {
        Self {
            id: None,
            email: None,
            name: "Staff".into(),
        }
    }
}

impl StaffIdentity {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Identifier sent as `handling_by`: user id, else email, else name.
    pub fn handling_by(&self) -> &str {
        self.id
            .as_deref()
            .filter(|s| !s.is_empty())
            .or_else(|| self.email.as_deref().filter(|s| !s.is_empty()))
            .unwrap_or(&self.name)
    }

    /// Uppercase initials of the display name.
    pub fn initials(&self) -> String {
        crate::convert::patient_initials(&self.name)
    }
}
