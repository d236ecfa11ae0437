// ── Alarm domain types ──

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// Canonical alarm categories.
///
/// Backends report the type as free text with inconsistent casing and
/// spelling; [`AlarmKind::from_raw`] maps every known alias onto a variant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, EnumIter,
)]
pub enum AlarmKind {
    #[serde(rename = "HR")]
    #[strum(serialize = "HR")]
    HeartRate,
    #[serde(rename = "O2")]
    #[strum(serialize = "O2")]
    BloodOxygen,
    #[serde(rename = "RR")]
    #[strum(serialize = "RR")]
    RespirationRate,
    #[serde(rename = "BP")]
    #[strum(serialize = "BP")]
    BloodPressure,
    Fall,
    FallOutOfBed,
    Fire,
}

/// Presentation metadata for one alarm kind.
struct KindInfo {
    label: &'static str,
    short_label: &'static str,
    shows_camera: bool,
}

impl AlarmKind {
    /// Normalize a raw backend type string.
    ///
    /// Matching is case-insensitive after trimming. Unknown strings yield
    /// `None`; callers keep the raw text for display.
    pub fn from_raw(raw: &str) -> Option<Self> {
        match raw.trim().to_lowercase().as_str() {
            "hr" | "heartrate" | "heart rate" => Some(Self::HeartRate),
            "o2" | "oxygen" => Some(Self::BloodOxygen),
            "rr" | "respirationrate" | "respiration rate" | "respiratoryrate"
            | "respiratory rate" => Some(Self::RespirationRate),
            "bp" | "blood pressure" => Some(Self::BloodPressure),
            "fall" | "falldetection" | "fall detection" => Some(Self::Fall),
            "falloutofbed" | "fall out of bed" | "outofbed" => Some(Self::FallOutOfBed),
            "fire" => Some(Self::Fire),
            _ => None,
        }
    }

    fn info(self) -> KindInfo {
        match self {
            Self::HeartRate => KindInfo {
                label: "Heart Rate",
                short_label: "HR",
                shows_camera: false,
            },
            Self::BloodOxygen => KindInfo {
                label: "Blood Oxygen",
                short_label: "O2",
                shows_camera: false,
            },
            Self::RespirationRate => KindInfo {
                label: "Respiration Rate",
                short_label: "RR",
                shows_camera: false,
            },
            Self::BloodPressure => KindInfo {
                label: "Blood Pressure",
                short_label: "BP",
                shows_camera: false,
            },
            Self::Fall => KindInfo {
                label: "Fall Detection",
                short_label: "Fall",
                shows_camera: true,
            },
            Self::FallOutOfBed => KindInfo {
                label: "Out of bed",
                short_label: "Out of Bed",
                shows_camera: true,
            },
            Self::Fire => KindInfo {
                label: "Fire",
                short_label: "Fire",
                shows_camera: true,
            },
        }
    }

    /// Long human-readable label ("Heart Rate").
    pub fn label(self) -> &'static str {
        self.info().label
    }

    /// Badge label ("HR").
    pub fn short_label(self) -> &'static str {
        self.info().short_label
    }

    /// Whether a camera view is relevant for this kind of alarm.
    pub fn shows_camera(self) -> bool {
        self.info().shows_camera
    }
}

/// Display status of an alarm.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString,
)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum AlarmStatus {
    Active,
    InProgress,
    Resolved,
}

impl AlarmStatus {
    /// Derive the status from the server's flags. Resolution wins.
    pub fn from_flags(is_resolved: bool, is_handling: bool) -> Self {
        if is_resolved {
            Self::Resolved
        } else if is_handling {
            Self::InProgress
        } else {
            Self::Active
        }
    }

    /// Active and in-progress alarms still need attention.
    pub fn is_open(self) -> bool {
        !matches!(self, Self::Resolved)
    }
}

/// Display-ready projection of an alert event plus local overlay.
///
/// Rebuilt on every poll and every overlay mutation; never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alarm {
    pub id: String,
    pub patient_id: Option<String>,
    pub patient_name: String,
    pub patient_avatar: String,
    /// Raw type string as reported by the backend.
    #[serde(rename = "type")]
    pub alarm_type: String,
    /// Normalized kind, when the raw type is recognized.
    pub kind: Option<AlarmKind>,
    pub value: String,
    /// Formatted trigger time, or `"N/A"`.
    pub time: String,
    pub handled_by: Option<String>,
    pub handled_at: Option<String>,
    pub resolved_at: Option<String>,
    pub status: AlarmStatus,
    /// Care notes carried on the alert event.
    pub notes: Option<String>,
}

impl Alarm {
    /// Long label, falling back to the raw type for unknown kinds.
    pub fn type_label(&self) -> &str {
        match self.kind {
            Some(kind) => kind.label(),
            None => self.alarm_type.as_str(),
        }
    }

    /// Badge label, falling back to the raw type for unknown kinds.
    pub fn short_label(&self) -> &str {
        match self.kind {
            Some(kind) => kind.short_label(),
            None => self.alarm_type.as_str(),
        }
    }

    pub fn shows_camera(&self) -> bool {
        self.kind.is_some_and(AlarmKind::shows_camera)
    }
}
