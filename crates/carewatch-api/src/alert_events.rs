// Alert event endpoints
//
// Listing plus the three handling transitions. Mutation endpoints are
// optional on older backends; a 404 surfaces as `Error::NotFound` so the
// caller can decide whether the action degrades or aborts.

use tracing::debug;

use crate::client::CareClient;
use crate::error::Error;
use crate::models::{AlertEvent, AlertEventQuery, HandlingRequest, ListEnvelope, ResolveRequest};

impl CareClient {
    /// List alert events matching `query`.
    ///
    /// `GET /alert-events?status=...&limit=...`
    pub async fn list_alert_events(&self, query: &AlertEventQuery) -> Result<Vec<AlertEvent>, Error> {
        let mut url = self.endpoint(&["alert-events"])?;
        let pairs = query.pairs();
        if !pairs.is_empty() {
            url.query_pairs_mut().extend_pairs(pairs);
        }
        debug!(?query, "listing alert events");
        let envelope: ListEnvelope<AlertEvent> = self.get(url).await?;
        Ok(envelope.into_vec())
    }

    /// List unresolved alert events, capped at `limit`.
    pub async fn list_unresolved_alert_events(&self, limit: u32) -> Result<Vec<AlertEvent>, Error> {
        self.list_alert_events(&AlertEventQuery::unresolved(limit)).await
    }

    /// Mark an alert event as being handled.
    ///
    /// `POST /alert-events/{id}/in-progress`
    pub async fn mark_alert_event_in_progress(
        &self,
        id: &str,
        handling: &HandlingRequest,
    ) -> Result<(), Error> {
        let url = self.endpoint(&["alert-events", id, "in-progress"])?;
        debug!(id, handling_by = %handling.handling_by, "marking alert event in progress");
        self.post_action(url, handling).await
    }

    /// Undo a previous claim.
    ///
    /// `POST /alert-events/{id}/release`
    pub async fn release_alert_event(&self, id: &str) -> Result<(), Error> {
        let url = self.endpoint(&["alert-events", id, "release"])?;
        debug!(id, "releasing alert event");
        self.post_action(url, &serde_json::json!({})).await
    }

    /// Resolve an alert event with structured reasons and free text.
    ///
    /// `POST /alert-events/{id}/resolve`
    pub async fn resolve_alert_event(&self, id: &str, resolution: &ResolveRequest) -> Result<(), Error> {
        let url = self.endpoint(&["alert-events", id, "resolve"])?;
        debug!(
            id,
            options = resolution.resolution_options.len(),
            "resolving alert event"
        );
        self.post_action(url, resolution).await
    }
}
