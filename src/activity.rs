use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One line of operator-visible narration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
    pub seq: u64,
    pub text: String,
    pub timestamp: DateTime<Utc>,
}

/// Append-only progress log. Purely observational: nothing reads it to make
/// a control-flow decision. Entries carry a monotonically increasing sequence
/// number so display order stays stable even for same-millisecond appends.
#[derive(Debug, Default)]
pub struct ActivityLog {
    entries: Mutex<Vec<LogEntry>>,
    seq: AtomicU64,
}

impl ActivityLog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append(&self, text: impl Into<String>) {
        let text = text.into();
        log::info!("{}", text);
        let entry = LogEntry {
            seq: self.seq.fetch_add(1, Ordering::Relaxed),
            text,
            timestamp: Utc::now(),
        };
        self.entries.lock().unwrap().push(entry);
    }

    /// Drop all entries. The sequence counter keeps rising across clears.
    pub fn clear(&self) {
        self.entries.lock().unwrap().clear();
    }

    /// Entries in emission order.
    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    /// Entries newest-first, for display.
    pub fn entries_desc(&self) -> Vec<LogEntry> {
        let mut entries = self.entries();
        entries.sort_by(|a, b| b.seq.cmp(&a.seq));
        entries
    }

    pub fn len(&self) -> usize {
        self.entries.lock().unwrap().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
