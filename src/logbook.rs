// src/logbook.rs

//! The technician-facing log stream.
//!
//! The logbook is the ordered, leveled stream of lines the host shell renders
//! ("Starting: sfc-scan", "[PASS] no integrity violations", ...). It is not
//! `tracing` (see [`crate::logging`] for internal diagnostics): the logbook is
//! part of the product, and its ordering and delivery guarantees are a
//! contract.
//!
//! Guarantees:
//! - concurrent appenders are serialized into one total order; sequence
//!   numbers strictly increase with no gaps;
//! - `append` never fails and never panics: if a sink rejects an entry, or
//!   unwinds (a closed stdout makes `println!` panic), the entry is already
//!   stored and a best-effort stderr write is attempted instead.

use std::io::Write as _;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::Mutex;
use std::time::SystemTime;

use tracing::warn;

/// Presentation level of a logbook entry.
///
/// The shell maps these to colours (neutral/success/caution/error); the core
/// only guarantees the four-level enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Pass,
    Warn,
    Fail,
}

impl LogLevel {
    /// Short uppercase tag used by plain-text sinks.
    pub fn tag(self) -> &'static str {
        match self {
            LogLevel::Info => "INFO",
            LogLevel::Pass => "PASS",
            LogLevel::Warn => "WARN",
            LogLevel::Fail => "FAIL",
        }
    }
}

/// One immutable line in the logbook.
#[derive(Debug, Clone)]
pub struct LogEntry {
    /// Monotonic sequence number, assigned under the logbook lock.
    pub seq: u64,
    pub timestamp: SystemTime,
    pub level: LogLevel,
    pub message: String,
}

/// Receives entries as they are appended (e.g. the shell's console view).
///
/// Delivery happens while the logbook lock is held so entries arrive in
/// sequence order; implementations must not call back into the [`Logbook`].
pub trait LogSink: Send + Sync {
    fn publish(&self, entry: &LogEntry) -> anyhow::Result<()>;
}

#[derive(Default)]
struct Inner {
    next_seq: u64,
    entries: Vec<LogEntry>,
    sinks: Vec<Box<dyn LogSink>>,
}

/// Append-only, concurrency-safe log stream.
#[derive(Default)]
pub struct Logbook {
    inner: Mutex<Inner>,
}

impl Logbook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a sink; it will see entries appended from now on.
    pub fn add_sink(&self, sink: Box<dyn LogSink>) {
        self.lock().sinks.push(sink);
    }

    /// Append one entry and notify all sinks.
    pub fn append(&self, level: LogLevel, message: impl Into<String>) {
        let message = message.into();
        let mut inner = self.lock();

        let entry = LogEntry {
            seq: inner.next_seq,
            timestamp: SystemTime::now(),
            level,
            message,
        };
        inner.next_seq += 1;
        inner.entries.push(entry.clone());

        for sink in inner.sinks.iter() {
            let failure = match catch_unwind(AssertUnwindSafe(|| sink.publish(&entry))) {
                Ok(Ok(())) => continue,
                Ok(Err(err)) => err.to_string(),
                Err(_) => "sink panicked".to_string(),
            };
            // The entry is already stored; fall back to stderr so the line
            // is not lost to the operator. The write itself is best-effort.
            warn!(error = %failure, "log sink failed; falling back to stderr");
            let _ = writeln!(
                std::io::stderr(),
                "[{}] {}",
                entry.level.tag(),
                entry.message
            );
        }
    }

    pub fn info(&self, message: impl Into<String>) {
        self.append(LogLevel::Info, message);
    }

    pub fn pass(&self, message: impl Into<String>) {
        self.append(LogLevel::Pass, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.append(LogLevel::Warn, message);
    }

    pub fn fail(&self, message: impl Into<String>) {
        self.append(LogLevel::Fail, message);
    }

    /// Drop all stored entries in one atomic step.
    ///
    /// Sequence numbering continues from where it was, so readers can tell
    /// pre- and post-clear entries apart. Entries already delivered to a sink
    /// are unaffected.
    pub fn clear(&self) {
        self.lock().entries.clear();
    }

    /// Copy of the stored entries in sequence order.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        self.lock().entries.clone()
    }

    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    // A poisoned lock only means some appender panicked mid-call; the stored
    // entries are still usable, so recover instead of propagating the panic.
    fn lock(&self) -> std::sync::MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RejectingSink;

    impl LogSink for RejectingSink {
        fn publish(&self, _entry: &LogEntry) -> anyhow::Result<()> {
            anyhow::bail!("sink is broken")
        }
    }

    #[test]
    fn sequence_numbers_start_at_zero_and_have_no_gaps() {
        let book = Logbook::new();
        book.info("a");
        book.pass("b");
        book.fail("c");

        let entries = book.snapshot();
        let seqs: Vec<u64> = entries.iter().map(|e| e.seq).collect();
        assert_eq!(seqs, vec![0, 1, 2]);
    }

    #[test]
    fn clear_drops_entries_but_keeps_numbering_monotonic() {
        let book = Logbook::new();
        book.info("before");
        book.clear();
        book.info("after");

        let entries = book.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].seq, 1);
        assert_eq!(entries[0].message, "after");
    }

    #[test]
    fn failing_sink_does_not_lose_the_entry_or_panic() {
        let book = Logbook::new();
        book.add_sink(Box::new(RejectingSink));
        book.warn("still recorded");

        let entries = book.snapshot();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].level, LogLevel::Warn);
    }

    #[test]
    fn level_tags_are_stable() {
        assert_eq!(LogLevel::Info.tag(), "INFO");
        assert_eq!(LogLevel::Pass.tag(), "PASS");
        assert_eq!(LogLevel::Warn.tag(), "WARN");
        assert_eq!(LogLevel::Fail.tag(), "FAIL");
    }
}
