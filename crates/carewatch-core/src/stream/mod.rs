// ── Snapshot subscriptions ──
//
// Change notification for the lists the monitor publishes (displayed
// alarms, care journal).

use std::sync::Arc;

use tokio::sync::watch;

/// A published list, shared between the monitor and its subscribers.
pub type Snapshot<T> = Arc<Vec<Arc<T>>>;

/// A subscription to one of the monitor's published lists.
pub struct SnapshotStream<T> {
    current: Snapshot<T>,
    receiver: watch::Receiver<Snapshot<T>>,
}

impl<T> SnapshotStream<T> {
    pub(crate) fn new(receiver: watch::Receiver<Snapshot<T>>) -> Self {
        let current = receiver.borrow().clone();
        Self { current, receiver }
    }

    /// The list as of subscription or the last [`changed()`](Self::changed).
    pub fn current(&self) -> &Snapshot<T> {
        &self.current
    }

    /// Wait for the next publication. `None` once the monitor is gone.
    pub async fn changed(&mut self) -> Option<Snapshot<T>> {
        self.receiver.changed().await.ok()?;
        self.current = self.receiver.borrow_and_update().clone();
        Some(Arc::clone(&self.current))
    }
}
