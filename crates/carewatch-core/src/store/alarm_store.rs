// ── Alarm reconciliation store ──
//
// Synchronous state behind the monitor: the last polled alarms, the local
// overlay, alarms resolved during this session, and the care journal.
// All methods are pure state transitions; the monitor owns I/O and locking.

use chrono::{DateTime, FixedOffset, Utc};
use tracing::debug;

use crate::convert::{format_action_time, to_journal_entry};
use crate::model::{Alarm, AlarmStatus, JournalEntry, Resolution, StaffIdentity};

use super::journal::Journal;
use super::overlay::{HandlingClaim, Overlay, OverlayEntry};

#[derive(Debug, Default)]
pub struct AlarmStore {
    polled: Vec<Alarm>,
    overlay: Overlay,
    resolved: Vec<Alarm>,
    journal: Journal,
    last_poll: Option<DateTime<Utc>>,
}

impl AlarmStore {
    pub fn new() -> Self {
        Self::default()
    }

    // ── Polling ──────────────────────────────────────────────────────

    /// Open a poll epoch. See [`Overlay::begin_poll`].
    pub fn begin_poll(&mut self) -> u64 {
        self.overlay.begin_poll()
    }

    /// Replace the polled list and purge overlay entries the server has
    /// made obsolete.
    pub fn apply_poll(&mut self, epoch: u64, alarms: Vec<Alarm>, at: DateTime<Utc>) {
        let purged = self.overlay.reconcile(epoch, &alarms);
        if purged > 0 {
            debug!(purged, "overlay entries superseded by server state");
        }
        self.polled = alarms;
        self.last_poll = Some(at);
    }

    pub fn last_poll(&self) -> Option<DateTime<Utc>> {
        self.last_poll
    }

    // ── Views ────────────────────────────────────────────────────────

    /// Every polled alarm with the overlay applied.
    pub fn merged(&self, current_user: &str) -> Vec<Alarm> {
        self.polled
            .iter()
            .map(|a| self.overlay.apply(a, current_user))
            .collect()
    }

    /// The list shown to staff: open polled alarms followed by alarms
    /// resolved this session.
    ///
    /// Polled alarms already resolved on the server, or resolved locally
    /// this session, are left out of the polled half.
    pub fn display(&self, current_user: &str) -> Vec<Alarm> {
        let mut alarms: Vec<Alarm> = self
            .merged(current_user)
            .into_iter()
            .filter(|a| a.status != AlarmStatus::Resolved)
            .filter(|a| !self.resolved.iter().any(|r| r.id == a.id))
            .collect();
        alarms.extend(self.resolved.iter().cloned());
        alarms
    }

    /// Badge count: displayed alarms that are active or in progress.
    pub fn active_count(&self, current_user: &str) -> usize {
        self.display(current_user)
            .iter()
            .filter(|a| a.status.is_open())
            .count()
    }

    /// Merged view of one polled alarm.
    pub fn find(&self, id: &str, current_user: &str) -> Option<Alarm> {
        self.polled
            .iter()
            .find(|a| a.id == id)
            .map(|a| self.overlay.apply(a, current_user))
    }

    pub fn overlay_entry(&self, id: &str) -> OverlayEntry {
        self.overlay.entry(id)
    }

    pub fn resolved(&self) -> &[Alarm] {
        &self.resolved
    }

    pub fn journal(&self) -> &Journal {
        &self.journal
    }

    // ── Mutations ────────────────────────────────────────────────────

    pub fn record_claim(&mut self, id: &str, claim: HandlingClaim) {
        self.overlay.mark_in_progress(id, claim);
    }

    pub fn record_release(&mut self, id: &str) {
        self.overlay.release(id);
    }

    /// Record a confirmed resolution.
    ///
    /// Journals `alarm` as it looked when resolved, moves it to the session
    /// resolved list (replacing any earlier copy) and drops its overlay.
    pub fn record_resolution(
        &mut self,
        alarm: &Alarm,
        resolution: &Resolution,
        staff: &StaffIdentity,
        now: DateTime<Utc>,
        offset: &FixedOffset,
    ) -> JournalEntry {
        let resolved_at = format_action_time(now, offset);
        let now_ms = u64::try_from(now.timestamp_millis()).unwrap_or_default();
        let id = self.journal.next_id(now_ms);

        let entry = to_journal_entry(id, alarm, resolution, staff, &resolved_at);
        self.journal.prepend(entry.clone());

        let mut resolved = alarm.clone();
        resolved.status = AlarmStatus::Resolved;
        resolved.resolved_at = Some(resolved_at);
        resolved.handled_by = Some(entry.handled_by.clone());
        resolved.handled_at = Some(entry.handled_at.clone());
        self.resolved.retain(|a| a.id != alarm.id);
        self.resolved.insert(0, resolved);

        self.overlay.clear(&alarm.id);
        entry
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::convert::to_alarm;
    use chrono::{Offset, TimeZone};
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn alarm(id: &str, handling: bool, resolved: bool) -> Alarm {
        to_alarm(
            &serde_json::from_value(json!({
                "id": id,
                "isHandling": handling,
                "isResolved": resolved,
                "handlingByName": if handling { Some("Bob") } else { None },
                "patientName": "Jenny Wilson",
                "type": "HR",
                "value": 89
            }))
            .unwrap(),
        )
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, 7, 20, 40, 0).unwrap()
    }

    fn polled(store: &mut AlarmStore, alarms: Vec<Alarm>) {
        let epoch = store.begin_poll();
        store.apply_poll(epoch, alarms, now());
    }

    #[test]
    fn display_excludes_server_resolved_alarms() {
        let mut store = AlarmStore::new();
        polled(
            &mut store,
            vec![alarm("a1", false, false), alarm("a2", false, true)],
        );

        let ids: Vec<String> = store.display("Alice").into_iter().map(|a| a.id).collect();
        assert_eq!(ids, vec!["a1".to_owned()]);
        assert_eq!(store.last_poll(), Some(now()));
    }

    #[test]
    fn active_count_includes_claimed_alarms() {
        let mut store = AlarmStore::new();
        polled(
            &mut store,
            vec![
                alarm("a1", false, false),
                alarm("a2", true, false),
                alarm("a3", false, true),
            ],
        );
        assert_eq!(store.active_count("Alice"), 2);
    }

    #[test]
    fn resolution_moves_alarm_to_session_list() {
        let mut store = AlarmStore::new();
        polled(&mut store, vec![alarm("a1", false, false)]);
        store.record_claim(
            "a1",
            HandlingClaim {
                handled_by: "Alice".into(),
                handled_at: "Nov 7, 2024, 08:30 PM".into(),
            },
        );

        let staff = StaffIdentity::named("Alice");
        let snapshot = store.find("a1", &staff.name).unwrap();
        let entry = store.record_resolution(
            &snapshot,
            &Resolution::new(vec!["Contacted patient".into()], "Fine"),
            &staff,
            now(),
            &Utc.fix(),
        );

        assert_eq!(entry.handled_by, "Alice");
        assert_eq!(entry.handled_at, "Nov 7, 2024, 08:30 PM");
        assert_eq!(entry.resolved_at, "Nov 7, 2024, 08:40 PM");
        assert!(store.overlay_entry("a1").is_empty());

        // A lagging poll still reporting a1 must not duplicate it.
        polled(&mut store, vec![alarm("a1", false, false)]);
        let display = store.display(&staff.name);
        assert_eq!(display.len(), 1);
        assert_eq!(display[0].status, AlarmStatus::Resolved);
        assert_eq!(store.active_count(&staff.name), 0);
    }

    #[test]
    fn resolving_twice_keeps_one_session_copy() {
        let mut store = AlarmStore::new();
        polled(&mut store, vec![alarm("a1", false, false)]);
        let staff = StaffIdentity::named("Alice");
        let snapshot = store.find("a1", &staff.name).unwrap();
        let resolution = Resolution::new(Vec::new(), "Fine");

        let first = store.record_resolution(&snapshot, &resolution, &staff, now(), &Utc.fix());
        let second = store.record_resolution(&snapshot, &resolution, &staff, now(), &Utc.fix());

        assert!(second.id > first.id);
        assert_eq!(store.resolved().len(), 1);
        assert_eq!(store.journal().len(), 2);
    }
}
