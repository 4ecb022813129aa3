//! Logging facility the interceptor writes breadcrumb lines to.
//!
//! - [`TracingSink`]: forwards to `tracing` under the `breadcrumb` target
//! - [`MemorySink`]: keeps lines in memory, for tests and embedding hosts

use std::sync::Arc;

use parking_lot::Mutex;

/// `tracing` target used for every breadcrumb line.
pub const BREADCRUMB_TARGET: &str = "breadcrumb";

/// Severity of a written line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Severity {
    Debug,
    Info,
    Warn,
}

/// A line-oriented log writer. Implementations must be thread-safe and must
/// not block the caller beyond the write itself.
pub trait LogSink: Send + Sync {
    /// Write one line at the given severity.
    fn write_line(&self, severity: Severity, line: &str);
}

impl<S: LogSink + ?Sized> LogSink for Arc<S> {
    fn write_line(&self, severity: Severity, line: &str) {
        (**self).write_line(severity, line);
    }
}

// ---------------------------------------------------------------------------
// TracingSink
// ---------------------------------------------------------------------------

/// Sink that emits through the global `tracing` subscriber.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl LogSink for TracingSink {
    fn write_line(&self, severity: Severity, line: &str) {
        match severity {
            Severity::Debug => tracing::debug!(target: BREADCRUMB_TARGET, "{line}"),
            Severity::Info => tracing::info!(target: BREADCRUMB_TARGET, "{line}"),
            Severity::Warn => tracing::warn!(target: BREADCRUMB_TARGET, "{line}"),
        }
    }
}

// ---------------------------------------------------------------------------
// MemorySink
// ---------------------------------------------------------------------------

/// Sink that records every line in order.
#[derive(Debug, Default)]
pub struct MemorySink {
    lines: Mutex<Vec<(Severity, String)>>,
}

impl MemorySink {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of all lines written so far.
    #[must_use]
    pub fn lines(&self) -> Vec<(Severity, String)> {
        self.lines.lock().clone()
    }

    /// Lines written at `severity`, in order.
    #[must_use]
    pub fn lines_at(&self, severity: Severity) -> Vec<String> {
        self.lines
            .lock()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, line)| line.clone())
            .collect()
    }

    /// Drops all recorded lines.
    pub fn clear(&self) {
        self.lines.lock().clear();
    }
}

impl LogSink for MemorySink {
    fn write_line(&self, severity: Severity, line: &str) {
        self.lines.lock().push((severity, line.to_string()));
    }
}
