// ── Alarm monitor ──
//
// Lifecycle management for the alarm dashboard: foreground load, periodic
// background polling, the claim/release/resolve workflow, and reactive
// publication of alarms, journal entries and status through watch channels.

use std::future::Future;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{FixedOffset, Utc};
use tokio::sync::{Mutex, watch};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use carewatch_api::CareClient;

use crate::config::MonitorConfig;
use crate::convert::{format_action_time, handling_request, resolve_request, to_alarm_in};
use crate::error::CoreError;
use crate::model::{Alarm, JournalEntry, Resolution};
use crate::source::AlertEventSource;
use crate::store::{AlarmStore, HandlingClaim, OverlayEntry};
use crate::stream::SnapshotStream;

// ── Status and outcomes ──────────────────────────────────────────

/// Dashboard status observable by consumers.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MonitorStatus {
    /// A foreground load is in progress.
    pub loading: bool,
    /// Blocking error from the last failed load or action.
    pub error: Option<String>,
    /// Non-fatal, time-boxed notice (degraded-mode actions).
    pub warning: Option<String>,
    pub last_poll: Option<chrono::DateTime<Utc>>,
}

/// How a claim or release ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ActionOutcome {
    /// The backend accepted the change.
    Applied,
    /// Applied locally only; the backend lacks the endpoint.
    Degraded { warning: String },
    /// Dropped because another claim was already in flight.
    Ignored,
}

/// Resets an in-flight flag when dropped.
struct FlightGuard<'a>(&'a AtomicBool);

impl<'a> FlightGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Option<Self> {
        (!flag.swap(true, Ordering::AcqRel)).then_some(Self(flag))
    }
}

impl Drop for FlightGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

// ── AlarmMonitor ─────────────────────────────────────────────────

/// The main entry point for consumers.
///
/// Cheaply cloneable via `Arc<MonitorInner>`. Holds the reconciliation
/// store, drives polling, and mediates every state-changing operation.
pub struct AlarmMonitor<S: AlertEventSource = CareClient> {
    inner: Arc<MonitorInner<S>>,
}

impl<S: AlertEventSource> Clone for AlarmMonitor<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

struct MonitorInner<S> {
    source: S,
    config: MonitorConfig,
    offset: FixedOffset,
    store: std::sync::Mutex<AlarmStore>,
    alarms: watch::Sender<Arc<Vec<Arc<Alarm>>>>,
    journal: watch::Sender<Arc<Vec<Arc<JournalEntry>>>>,
    status: watch::Sender<MonitorStatus>,
    claim_in_flight: AtomicBool,
    poll_in_flight: AtomicBool,
    /// Whether `status.error` was set by a failed load (cleared by the
    /// next successful poll) rather than by a failed action.
    load_failed: AtomicBool,
    warning_seq: AtomicU64,
    cancel: CancellationToken,
    /// Child token for the current run -- cancelled on stop, replaced on
    /// start.
    cancel_child: Mutex<CancellationToken>,
    task_handles: Mutex<Vec<JoinHandle<()>>>,
}

impl<S: AlertEventSource> AlarmMonitor<S> {
    /// Create a monitor. Does NOT poll -- call [`start()`](Self::start) to
    /// load and begin background polling, or [`refresh()`](Self::refresh)
    /// for a single poll.
    pub fn new(source: S, config: MonitorConfig) -> Self {
        let (alarms, _) = watch::channel(Arc::new(Vec::new()));
        let (journal, _) = watch::channel(Arc::new(Vec::new()));
        let (status, _) = watch::channel(MonitorStatus::default());
        let cancel = CancellationToken::new();
        let cancel_child = cancel.child_token();

        Self {
            inner: Arc::new(MonitorInner {
                offset: config.display_offset(),
                source,
                config,
                store: std::sync::Mutex::new(AlarmStore::new()),
                alarms,
                journal,
                status,
                claim_in_flight: AtomicBool::new(false),
                poll_in_flight: AtomicBool::new(false),
                load_failed: AtomicBool::new(false),
                warning_seq: AtomicU64::new(0),
                cancel,
                cancel_child: Mutex::new(cancel_child),
                task_handles: Mutex::new(Vec::new()),
            }),
        }
    }

    pub fn config(&self) -> &MonitorConfig {
        &self.inner.config
    }

    // ── Lifecycle ────────────────────────────────────────────────

    /// Load alarms in the foreground, then poll in the background.
    ///
    /// The background task is spawned even when the initial load fails;
    /// the failure is reported through both the return value and
    /// [`MonitorStatus::error`].
    pub async fn start(&self) -> Result<(), CoreError> {
        let mut handles = self.inner.task_handles.lock().await;
        if !handles.is_empty() {
            debug!("monitor already running");
            return Ok(());
        }

        // Fresh child token for this run (supports restart).
        let child = self.inner.cancel.child_token();
        *self.inner.cancel_child.lock().await = child.clone();

        let result = self.poll(true).await;

        let interval = self.inner.config.poll_interval;
        if interval.is_zero() {
            debug!("background polling disabled");
        } else {
            let monitor = self.clone();
            handles.push(tokio::spawn(poll_task(monitor, interval, child)));
        }

        info!(
            interval_secs = interval.as_secs(),
            loaded = result.is_ok(),
            "alarm monitor started"
        );
        result
    }

    /// Stop background polling and abandon in-flight requests.
    pub async fn stop(&self) {
        // Cancel the child token (not the parent -- allows restart).
        self.inner.cancel_child.lock().await.cancel();

        let mut handles = self.inner.task_handles.lock().await;
        for handle in handles.drain(..) {
            let _ = handle.await;
        }
        debug!("alarm monitor stopped");
    }

    /// Poll once without the loading indicator.
    pub async fn refresh(&self) -> Result<(), CoreError> {
        self.poll(false).await
    }

    async fn poll(&self, foreground: bool) -> Result<(), CoreError> {
        let Some(_flight) = FlightGuard::acquire(&self.inner.poll_in_flight) else {
            debug!("poll already in flight -- skipping");
            return Ok(());
        };

        let epoch = self.lock_store().begin_poll();
        if foreground {
            self.inner.status.send_modify(|s| s.loading = true);
        }

        let limit = self.inner.config.poll_limit;
        match self.call(self.inner.source.list_unresolved(limit)).await {
            Ok(events) => {
                let alarms: Vec<Alarm> = events
                    .iter()
                    .map(|e| to_alarm_in(e, &self.inner.offset))
                    .collect();
                let now = Utc::now();
                {
                    let mut store = self.lock_store();
                    store.apply_poll(epoch, alarms, now);
                    self.publish_alarms(&store);
                }
                let clear_error = self.inner.load_failed.swap(false, Ordering::AcqRel);
                self.inner.status.send_modify(|s| {
                    s.loading = false;
                    s.last_poll = Some(now);
                    if clear_error {
                        s.error = None;
                    }
                });
                debug!(events = events.len(), "poll complete");
                Ok(())
            }
            Err(e) => {
                if foreground {
                    self.inner.load_failed.store(true, Ordering::Release);
                    let message = e.status_message();
                    self.inner.status.send_modify(|s| {
                        s.loading = false;
                        s.error = Some(message);
                    });
                }
                Err(e)
            }
        }
    }

    // ── Workflow operations ──────────────────────────────────────

    /// Claim an alarm for the configured staff member.
    ///
    /// Only one claim runs at a time; a claim attempted while another is
    /// in flight is [`Ignored`](ActionOutcome::Ignored). A missing backend
    /// endpoint degrades to a local-only claim with a warning.
    pub async fn claim(&self, id: &str) -> Result<ActionOutcome, CoreError> {
        let id = validate_id(id)?;
        let Some(_flight) = FlightGuard::acquire(&self.inner.claim_in_flight) else {
            debug!(id, "claim already in flight -- ignoring");
            return Ok(ActionOutcome::Ignored);
        };

        let staff = &self.inner.config.staff;
        let body = handling_request(staff);
        let result = self
            .call(self.inner.source.mark_in_progress(id, &body))
            .await;

        match result {
            Ok(()) => {
                self.apply_claim(id);
                self.dismiss_warning();
                self.clear_error();
                info!(id, "alarm claimed");
                self.repoll().await;
                Ok(ActionOutcome::Applied)
            }
            Err(e) if e.is_capability_missing() => {
                self.apply_claim(id);
                let warning = format!(
                    "Marked in progress on this device only: the backend cannot record claims yet ({e})"
                );
                warn!(id, "claim not persisted: mark-in-progress endpoint missing");
                self.raise_warning(warning.clone());
                Ok(ActionOutcome::Degraded { warning })
            }
            Err(e) => {
                warn!(id, error = %e, "claim failed");
                self.set_error(&e);
                Err(e)
            }
        }
    }

    /// Undo a claim. A missing backend endpoint degrades to a local-only
    /// release with a warning; any other failure aborts.
    pub async fn release(&self, id: &str) -> Result<ActionOutcome, CoreError> {
        let id = validate_id(id)?;
        let result = self.call(self.inner.source.release(id)).await;

        let outcome = match result {
            Ok(()) => {
                self.dismiss_warning();
                self.clear_error();
                ActionOutcome::Applied
            }
            Err(e) if e.is_capability_missing() => {
                let warning = format!(
                    "Released on this device only: the backend cannot record releases yet ({e})"
                );
                warn!(id, "release not persisted: release endpoint missing");
                self.raise_warning(warning.clone());
                ActionOutcome::Degraded { warning }
            }
            Err(e) => {
                warn!(id, error = %e, "release failed");
                self.set_error(&e);
                return Err(e);
            }
        };

        {
            let mut store = self.lock_store();
            store.record_release(id);
            self.publish_alarms(&store);
        }
        info!(id, "alarm released");
        self.repoll().await;
        Ok(outcome)
    }

    /// Resolve an alarm and journal the resolution.
    ///
    /// Requires at least one reason or a note. There is no degraded path:
    /// on any backend failure nothing is journaled and no local state
    /// changes.
    pub async fn resolve(&self, id: &str, resolution: Resolution) -> Result<JournalEntry, CoreError> {
        let id = validate_id(id)?;
        if !resolution.is_justified() {
            return Err(CoreError::validation(
                "select at least one reason or write a note",
            ));
        }

        let staff_name = &self.inner.config.staff.name;
        let snapshot = self
            .lock_store()
            .find(id, staff_name)
            .ok_or_else(|| CoreError::AlarmNotFound { id: id.to_owned() })?;

        let body = resolve_request(&resolution);
        if let Err(e) = self.call(self.inner.source.resolve(id, &body)).await {
            warn!(id, error = %e, "resolve failed");
            self.set_error(&e);
            return Err(e);
        }
        self.clear_error();

        let entry = {
            let mut store = self.lock_store();
            // Prefer the freshest merged view; the alarm may have been
            // updated by a poll while the request was in flight.
            let alarm = store.find(id, staff_name).unwrap_or(snapshot);
            let entry = store.record_resolution(
                &alarm,
                &resolution,
                &self.inner.config.staff,
                Utc::now(),
                &self.inner.offset,
            );
            self.publish_alarms(&store);
            self.publish_journal(&store);
            entry
        };
        info!(id, journal_id = entry.id, "alarm resolved");
        self.repoll().await;
        Ok(entry)
    }

    /// Hide the current warning immediately.
    pub fn dismiss_warning(&self) {
        self.inner.warning_seq.fetch_add(1, Ordering::AcqRel);
        self.inner.status.send_if_modified(|s| s.warning.take().is_some());
    }

    /// Clear the current error.
    pub fn clear_error(&self) {
        self.inner.load_failed.store(false, Ordering::Release);
        self.inner.status.send_if_modified(|s| s.error.take().is_some());
    }

    // ── State observation ────────────────────────────────────────

    /// Subscribe to the displayed alarm list.
    pub fn alarms(&self) -> SnapshotStream<Alarm> {
        SnapshotStream::new(self.inner.alarms.subscribe())
    }

    /// Subscribe to the care journal (newest first).
    pub fn journal(&self) -> SnapshotStream<JournalEntry> {
        SnapshotStream::new(self.inner.journal.subscribe())
    }

    /// Subscribe to status changes.
    pub fn status(&self) -> watch::Receiver<MonitorStatus> {
        self.inner.status.subscribe()
    }

    pub fn alarms_snapshot(&self) -> Arc<Vec<Arc<Alarm>>> {
        self.inner.alarms.borrow().clone()
    }

    pub fn journal_snapshot(&self) -> Arc<Vec<Arc<JournalEntry>>> {
        self.inner.journal.borrow().clone()
    }

    pub fn status_snapshot(&self) -> MonitorStatus {
        self.inner.status.borrow().clone()
    }

    /// Merged view of one alarm, polled or resolved this session.
    pub fn alarm(&self, id: &str) -> Option<Alarm> {
        let store = self.lock_store();
        store
            .find(id, &self.inner.config.staff.name)
            .filter(|_| !store.resolved().iter().any(|a| a.id == id))
            .or_else(|| store.resolved().iter().find(|a| a.id == id).cloned())
    }

    /// Number of displayed alarms that are active or in progress.
    pub fn active_count(&self) -> usize {
        self.lock_store().active_count(&self.inner.config.staff.name)
    }

    /// What the local overlay holds for `id`.
    pub fn overlay_entry(&self, id: &str) -> OverlayEntry {
        self.lock_store().overlay_entry(id)
    }

    // ── Internals ────────────────────────────────────────────────

    fn lock_store(&self) -> MutexGuard<'_, AlarmStore> {
        self.inner
            .store
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Run a backend call bounded by the request timeout and the current
    /// run's cancellation token.
    async fn call<T>(
        &self,
        request: impl Future<Output = Result<T, carewatch_api::Error>>,
    ) -> Result<T, CoreError> {
        let cancel = self.inner.cancel_child.lock().await.clone();
        let timeout = self.inner.config.request_timeout;

        tokio::select! {
            biased;
            () = cancel.cancelled() => Err(CoreError::Cancelled),
            result = tokio::time::timeout(timeout, request) => match result {
                Ok(inner) => inner.map_err(CoreError::from),
                Err(_) => Err(CoreError::Timeout { timeout_secs: timeout.as_secs() }),
            },
        }
    }

    fn apply_claim(&self, id: &str) {
        let claim = HandlingClaim {
            handled_by: self.inner.config.staff.name.clone(),
            handled_at: format_action_time(Utc::now(), &self.inner.offset),
        };
        let mut store = self.lock_store();
        store.record_claim(id, claim);
        self.publish_alarms(&store);
    }

    /// Silent re-poll after a mutation; failures are only logged.
    async fn repoll(&self) {
        if let Err(e) = self.poll(false).await {
            warn!(error = %e, "re-poll after action failed");
        }
    }

    fn publish_alarms(&self, store: &AlarmStore) {
        let display: Vec<Arc<Alarm>> = store
            .display(&self.inner.config.staff.name)
            .into_iter()
            .map(Arc::new)
            .collect();
        self.inner.alarms.send_replace(Arc::new(display));
    }

    fn publish_journal(&self, store: &AlarmStore) {
        let entries: Vec<Arc<JournalEntry>> = store
            .journal()
            .entries()
            .iter()
            .cloned()
            .map(Arc::new)
            .collect();
        self.inner.journal.send_replace(Arc::new(entries));
    }

    fn set_error(&self, err: &CoreError) {
        let message = err.status_message();
        self.inner.load_failed.store(false, Ordering::Release);
        self.inner.status.send_modify(|s| s.error = Some(message));
    }

    /// Show `message` until the configured TTL elapses or another warning
    /// replaces it.
    fn raise_warning(&self, message: String) {
        let seq = self.inner.warning_seq.fetch_add(1, Ordering::AcqRel) + 1;
        self.inner.status.send_modify(|s| s.warning = Some(message));

        let monitor = self.clone();
        let ttl = self.inner.config.warning_ttl;
        tokio::spawn(async move {
            tokio::time::sleep(ttl).await;
            if monitor.inner.warning_seq.load(Ordering::Acquire) == seq {
                monitor.inner.status.send_modify(|s| s.warning = None);
            }
        });
    }
}

fn validate_id(id: &str) -> Result<&str, CoreError> {
    let id = id.trim();
    if id.is_empty() {
        Err(CoreError::validation("alarm id must not be empty"))
    } else {
        Ok(id)
    }
}

// ── Background tasks ─────────────────────────────────────────────

/// Periodically poll the backend until cancelled.
async fn poll_task<S: AlertEventSource>(
    monitor: AlarmMonitor<S>,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await; // consume the immediate first tick

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {
                if let Err(e) = monitor.poll(false).await {
                    warn!(error = %e, "background poll failed");
                }
            }
        }
    }
}
