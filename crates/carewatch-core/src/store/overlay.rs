// ── Optimistic local overlay ──
//
// Session-scoped memory of the current user's claims and releases, layered
// over server-derived alarms until a poll shows the server has caught up.
//
// Every entry is stamped with the poll epoch current when it was written.
// A poll only purges entries older than its own epoch, so a response that
// was already in flight when the user acted cannot erase the action.

use std::collections::{HashMap, HashSet};

use crate::model::{Alarm, AlarmStatus};

/// Attribution recorded for a local claim.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlingClaim {
    pub handled_by: String,
    pub handled_at: String,
}

/// What the overlay currently holds for one alarm ID.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlayEntry {
    pub marked_in_progress: bool,
    pub released: bool,
    pub claim: Option<HandlingClaim>,
}

impl OverlayEntry {
    pub fn is_empty(&self) -> bool {
        !self.marked_in_progress && !self.released && self.claim.is_none()
    }
}

#[derive(Debug, Clone)]
struct Stamped<T> {
    value: T,
    epoch: u64,
}

#[derive(Debug, Default)]
pub struct Overlay {
    epoch: u64,
    marked_in_progress: HashMap<String, Stamped<()>>,
    released: HashMap<String, Stamped<()>>,
    in_progress: HashMap<String, Stamped<HandlingClaim>>,
}

impl Overlay {
    /// Open a new poll epoch and return it.
    ///
    /// Pass the returned value to [`reconcile`](Self::reconcile) with that
    /// poll's result.
    pub fn begin_poll(&mut self) -> u64 {
        self.epoch += 1;
        self.epoch
    }

    /// Record a claim by the current user.
    pub fn mark_in_progress(&mut self, id: &str, claim: HandlingClaim) {
        let epoch = self.epoch;
        self.released.remove(id);
        self.marked_in_progress
            .insert(id.to_owned(), Stamped { value: (), epoch });
        self.in_progress
            .insert(id.to_owned(), Stamped { value: claim, epoch });
    }

    /// Record a release: force the alarm back to active.
    pub fn release(&mut self, id: &str) {
        let epoch = self.epoch;
        self.marked_in_progress.remove(id);
        self.in_progress.remove(id);
        self.released
            .insert(id.to_owned(), Stamped { value: (), epoch });
    }

    /// Forget everything about an alarm.
    pub fn clear(&mut self, id: &str) {
        self.marked_in_progress.remove(id);
        self.released.remove(id);
        self.in_progress.remove(id);
    }

    /// Purge stale entries after a poll that began at `poll_epoch`.
    ///
    /// An entry is stale when it predates the poll and the server now
    /// reports its alarm as active, or no longer reports it at all.
    /// Returns the number of distinct IDs purged.
    pub fn reconcile(&mut self, poll_epoch: u64, server: &[Alarm]) -> usize {
        let mut purged = HashSet::new();
        purge(&mut self.marked_in_progress, poll_epoch, server, &mut purged);
        purge(&mut self.released, poll_epoch, server, &mut purged);
        purge(&mut self.in_progress, poll_epoch, server, &mut purged);
        purged.len()
    }

    /// Merge the overlay into a server-derived alarm.
    ///
    /// Precedence: released, then marked in progress, then held claim,
    /// then the server value unchanged.
    pub fn apply(&self, alarm: &Alarm, current_user: &str) -> Alarm {
        let mut merged = alarm.clone();
        let claim = self.in_progress.get(&alarm.id).map(|s| &s.value);

        if self.released.contains_key(&alarm.id) {
            merged.status = AlarmStatus::Active;
            merged.handled_by = None;
            merged.handled_at = None;
        } else if self.marked_in_progress.contains_key(&alarm.id) {
            merged.status = AlarmStatus::InProgress;
            if merged.handled_by.is_none() {
                merged.handled_by = Some(current_user.to_owned());
            }
            if merged.handled_at.is_none() {
                merged.handled_at = claim.map(|c| c.handled_at.clone());
            }
        } else if let Some(claim) = claim {
            merged.status = AlarmStatus::InProgress;
            merged.handled_by = Some(claim.handled_by.clone());
            merged.handled_at = Some(claim.handled_at.clone());
        }
        merged
    }

    pub fn entry(&self, id: &str) -> OverlayEntry {
        OverlayEntry {
            marked_in_progress: self.marked_in_progress.contains_key(id),
            released: self.released.contains_key(id),
            claim: self.in_progress.get(id).map(|s| s.value.clone()),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.marked_in_progress.is_empty() && self.released.is_empty() && self.in_progress.is_empty()
    }
}

fn purge<T>(
    entries: &mut HashMap<String, Stamped<T>>,
    poll_epoch: u64,
    server: &[Alarm],
    purged: &mut HashSet<String>,
) {
    entries.retain(|id, stamp| {
        let server_active = server
            .iter()
            .find(|a| a.id == *id)
            .is_none_or(|a| a.status == AlarmStatus::Active);
        let keep = stamp.epoch >= poll_epoch || !server_active;
        if !keep {
            purged.insert(id.clone());
        }
        keep
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::convert::to_alarm;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn alarm(id: &str, handling: bool) -> Alarm {
        let event = serde_json::from_value(json!({
            "id": id,
            "isHandling": handling,
            "handlingByName": if handling { Some("Bob") } else { None },
            "patientName": "Jenny Wilson",
            "type": "HR"
        }))
        .expect("valid event");
        to_alarm(&event)
    }

    fn claim() -> HandlingClaim {
        HandlingClaim {
            handled_by: "Alice".into(),
            handled_at: "Nov 7, 2024, 08:30 PM".into(),
        }
    }

    #[test]
    fn marked_alarm_shows_current_user() {
        let mut overlay = Overlay::default();
        overlay.mark_in_progress("a1", claim());

        let merged = overlay.apply(&alarm("a1", false), "Alice");
        assert_eq!(merged.status, AlarmStatus::InProgress);
        assert_eq!(merged.handled_by.as_deref(), Some("Alice"));
        assert_eq!(merged.handled_at.as_deref(), Some("Nov 7, 2024, 08:30 PM"));
    }

    #[test]
    fn marked_alarm_keeps_server_attribution() {
        let mut overlay = Overlay::default();
        overlay.mark_in_progress("a1", claim());

        let merged = overlay.apply(&alarm("a1", true), "Alice");
        assert_eq!(merged.handled_by.as_deref(), Some("Bob"));
    }

    #[test]
    fn release_wins_over_mark() {
        let mut overlay = Overlay::default();
        overlay.mark_in_progress("a1", claim());
        overlay.release("a1");
        // Force the unusual co-occurrence directly.
        overlay.marked_in_progress.insert(
            "a1".into(),
            Stamped {
                value: (),
                epoch: 0,
            },
        );

        let merged = overlay.apply(&alarm("a1", true), "Alice");
        assert_eq!(merged.status, AlarmStatus::Active);
        assert_eq!(merged.handled_by, None);
        assert_eq!(merged.handled_at, None);
    }

    #[test]
    fn held_claim_applies_its_own_attribution() {
        let mut overlay = Overlay::default();
        overlay.in_progress.insert(
            "a1".into(),
            Stamped {
                value: claim(),
                epoch: 0,
            },
        );

        let merged = overlay.apply(&alarm("a1", false), "Someone else");
        assert_eq!(merged.status, AlarmStatus::InProgress);
        assert_eq!(merged.handled_by.as_deref(), Some("Alice"));
    }

    #[test]
    fn claim_clears_earlier_release() {
        let mut overlay = Overlay::default();
        overlay.release("a1");
        overlay.mark_in_progress("a1", claim());
        assert!(!overlay.entry("a1").released);
        assert!(overlay.entry("a1").marked_in_progress);
    }

    #[test]
    fn active_poll_purges_older_entries() {
        let mut overlay = Overlay::default();
        overlay.mark_in_progress("a1", claim());

        let epoch = overlay.begin_poll();
        let purged = overlay.reconcile(epoch, &[alarm("a1", false)]);

        assert_eq!(purged, 1);
        assert!(overlay.entry("a1").is_empty());
        assert!(overlay.is_empty());
    }

    #[test]
    fn in_flight_poll_cannot_erase_newer_action() {
        let mut overlay = Overlay::default();
        let epoch = overlay.begin_poll();
        // User claims while the poll is outstanding.
        overlay.mark_in_progress("a1", claim());

        let purged = overlay.reconcile(epoch, &[alarm("a1", false)]);
        assert_eq!(purged, 0);
        assert!(overlay.entry("a1").marked_in_progress);

        let next = overlay.begin_poll();
        overlay.reconcile(next, &[alarm("a1", false)]);
        assert!(overlay.entry("a1").is_empty());
    }

    #[test]
    fn handled_poll_keeps_entries() {
        let mut overlay = Overlay::default();
        overlay.mark_in_progress("a1", claim());

        let epoch = overlay.begin_poll();
        overlay.reconcile(epoch, &[alarm("a1", true)]);
        assert!(overlay.entry("a1").marked_in_progress);
    }

    #[test]
    fn vanished_alarm_is_purged() {
        let mut overlay = Overlay::default();
        overlay.release("gone");

        let epoch = overlay.begin_poll();
        overlay.reconcile(epoch, &[]);
        assert!(overlay.entry("gone").is_empty());
    }
}
