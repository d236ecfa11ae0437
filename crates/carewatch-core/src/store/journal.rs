// ── Care journal accumulator ──

use crate::model::JournalEntry;

/// Append-only, newest-first list of resolution records.
#[derive(Debug, Default)]
pub struct Journal {
    entries: Vec<JournalEntry>,
    last_id: u64,
}

impl Journal {
    /// Allocate the ID for the next entry.
    ///
    /// IDs derive from the wall clock in milliseconds but never repeat or
    /// go backwards, even for two resolutions within the same millisecond.
    pub fn next_id(&mut self, now_ms: u64) -> u64 {
        let id = now_ms.max(self.last_id.saturating_add(1));
        self.last_id = id;
        id
    }

    /// Insert an entry at the front.
    pub fn prepend(&mut self, entry: JournalEntry) {
        self.last_id = self.last_id.max(entry.id);
        self.entries.insert(0, entry);
    }

    pub fn entries(&self) -> &[JournalEntry] {
        &self.entries
    }

    pub fn latest(&self) -> Option<&JournalEntry> {
        self.entries.first()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
