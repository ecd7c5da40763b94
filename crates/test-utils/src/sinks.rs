//! Test doubles for the core's presentation seams.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use taskbench::executor::ProgressSink;
use taskbench::logbook::{LogEntry, LogLevel, LogSink};

/// A log sink that records every entry it is handed.
///
/// Clone freely; all clones share the same storage.
#[derive(Clone, Default)]
pub struct RecordingSink {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<LogEntry> {
        self.entries.lock().unwrap().clone()
    }

    pub fn messages(&self) -> Vec<String> {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .map(|e| e.message.clone())
            .collect()
    }

    /// Number of recorded entries whose message contains `needle`.
    pub fn count_containing(&self, needle: &str) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.message.contains(needle))
            .count()
    }

    /// Number of recorded entries at `level`.
    pub fn count_at_level(&self, level: LogLevel) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| e.level == level)
            .count()
    }
}

impl LogSink for RecordingSink {
    fn publish(&self, entry: &LogEntry) -> anyhow::Result<()> {
        self.entries.lock().unwrap().push(entry.clone());
        Ok(())
    }
}

/// A log sink that always rejects, for exercising the logbook's fallback.
pub struct FailingSink;

impl LogSink for FailingSink {
    fn publish(&self, _entry: &LogEntry) -> anyhow::Result<()> {
        anyhow::bail!("presentation layer is down")
    }
}

/// A progress sink that counts show/hide transitions and tracks visibility.
#[derive(Clone, Default)]
pub struct CountingProgressSink {
    shows: Arc<AtomicUsize>,
    hides: Arc<AtomicUsize>,
}

impl CountingProgressSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shows(&self) -> usize {
        self.shows.load(Ordering::SeqCst)
    }

    pub fn hides(&self) -> usize {
        self.hides.load(Ordering::SeqCst)
    }

    /// Visible iff there have been more shows than hides.
    pub fn visible(&self) -> bool {
        self.shows() > self.hides()
    }
}

impl ProgressSink for CountingProgressSink {
    fn set_busy(&self, busy: bool) {
        if busy {
            self.shows.fetch_add(1, Ordering::SeqCst);
        } else {
            self.hides.fetch_add(1, Ordering::SeqCst);
        }
    }
}
