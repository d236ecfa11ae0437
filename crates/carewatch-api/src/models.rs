// Alert event wire types
//
// The backend has shipped several serializations of the same record over
// time: camelCase and snake_case keys, numeric and string IDs, and list
// payloads that are either bare arrays or wrapped in `result`/`data`.
// Everything here tolerates all of them; nothing downstream should have to.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

// ── Alert event ──────────────────────────────────────────────────────

/// A server-owned alert event, as returned by `GET /alert-events`.
///
/// The client never mutates these directly; it only asks the backend to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlertEvent {
    #[serde(deserialize_with = "string_or_number")]
    pub id: String,
    #[serde(default, alias = "patient_id", deserialize_with = "opt_string_or_number")]
    pub patient_id: Option<String>,
    #[serde(default, alias = "patient_name")]
    pub patient_name: Option<String>,
    /// Raw alarm type (`"HR"`, `"heart rate"`, `"Fall"`, ...).
    #[serde(default, rename = "type", alias = "alert_type")]
    pub alert_type: Option<String>,
    /// Measured value; a number, a string, or absent.
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default, alias = "triggered_at")]
    pub triggered_at: Option<String>,
    #[serde(default, alias = "is_handling", deserialize_with = "null_as_false")]
    pub is_handling: bool,
    #[serde(default, alias = "handling_by_name")]
    pub handling_by_name: Option<String>,
    #[serde(default, alias = "handling_at")]
    pub handling_at: Option<String>,
    #[serde(default, alias = "is_resolved", deserialize_with = "null_as_false")]
    pub is_resolved: bool,
    #[serde(default, alias = "resolved_at")]
    pub resolved_at: Option<String>,
    /// Free-form care notes attached to the event by other staff.
    #[serde(default)]
    pub notes: Option<String>,
}

/// Server-side filter for the alert event listing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AlertEventStatus {
    Unresolved,
}

impl AlertEventStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unresolved => "unresolved",
        }
    }
}

/// Query parameters for `GET /alert-events`.
#[derive(Debug, Clone, Default)]
pub struct AlertEventQuery {
    pub status: Option<AlertEventStatus>,
    pub limit: Option<u32>,
}

impl AlertEventQuery {
    /// The dashboard query: unresolved events, capped at `limit`.
    pub fn unresolved(limit: u32) -> Self {
        Self {
            status: Some(AlertEventStatus::Unresolved),
            limit: Some(limit),
        }
    }

    pub(crate) fn pairs(&self) -> Vec<(&'static str, String)> {
        let mut pairs = Vec::with_capacity(2);
        if let Some(status) = self.status {
            pairs.push(("status", status.as_str().to_owned()));
        }
        if let Some(limit) = self.limit {
            pairs.push(("limit", limit.to_string()));
        }
        pairs
    }
}

// ── Mutation bodies ──────────────────────────────────────────────────

/// Body of `POST /alert-events/{id}/in-progress`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HandlingRequest {
    /// Staff identifier (user id or email).
    pub handling_by: String,
    pub handling_by_name: String,
    pub handling_by_initials: String,
}

/// Body of `POST /alert-events/{id}/resolve`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ResolveRequest {
    pub resolution_options: Vec<String>,
    pub resolution_notes: String,
}

// ── List envelope ────────────────────────────────────────────────────

/// List payloads come bare or wrapped, depending on the backend build.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub(crate) enum ListEnvelope<T> {
    Bare(Vec<T>),
    Result { result: Vec<T> },
    Data { data: Vec<T> },
}

impl<T> ListEnvelope<T> {
    pub(crate) fn into_vec(self) -> Vec<T> {
        match self {
            Self::Bare(items) | Self::Result { result: items } | Self::Data { data: items } => {
                items
            }
        }
    }
}

// ── Tolerant field decoders ──────────────────────────────────────────

fn scalar_to_string<E: serde::de::Error>(value: Value) -> Result<Option<String>, E> {
    match value {
        Value::Null => Ok(None),
        Value::String(s) => Ok(Some(s)),
        Value::Number(n) => Ok(Some(n.to_string())),
        other => Err(E::custom(format!("expected string or number, got {other}"))),
    }
}

fn string_or_number<'de, D: Deserializer<'de>>(deserializer: D) -> Result<String, D::Error> {
    scalar_to_string(Value::deserialize(deserializer)?)?
        .ok_or_else(|| D::Error::custom("identifier must not be null"))
}

fn opt_string_or_number<'de, D: Deserializer<'de>>(
    deserializer: D,
) -> Result<Option<String>, D::Error> {
    scalar_to_string(Value::deserialize(deserializer)?)
}

fn null_as_false<'de, D: Deserializer<'de>>(deserializer: D) -> Result<bool, D::Error> {
    Ok(Option::<bool>::deserialize(deserializer)?.unwrap_or(false))
}
