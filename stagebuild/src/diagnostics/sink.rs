//! Report sink trait and implementations.

use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{debug, error, info, warn};

/// Severity of a reported message. Lower is more important.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    /// A fatal problem.
    Error,
    /// A recoverable problem, such as an unreachable stage.
    Warning,
    /// Regular progress output.
    Info,
    /// Detailed decisions, such as rebuild causes.
    Debug,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
        }
    }
}

/// Receives human-readable messages from the orchestrator.
pub trait ReportSink: Send + Sync {
    /// Reports a message. Must never fail.
    fn report(&self, severity: Severity, message: &str);
}

/// A sink that discards everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoOpReportSink;

impl ReportSink for NoOpReportSink {
    fn report(&self, _severity: Severity, _message: &str) {}
}

/// A sink that forwards messages to `tracing`, up to a maximum severity.
#[derive(Debug, Clone)]
pub struct TracingReportSink {
    max_severity: Severity,
}

impl Default for TracingReportSink {
    fn default() -> Self {
        Self {
            max_severity: Severity::Info,
        }
    }
}

impl TracingReportSink {
    /// Creates a sink showing messages up to `max_severity`.
    #[must_use]
    pub fn new(max_severity: Severity) -> Self {
        Self { max_severity }
    }

    /// Creates a sink that shows everything.
    #[must_use]
    pub fn verbose() -> Self {
        Self::new(Severity::Debug)
    }

    /// Returns true if messages of `severity` are shown.
    #[must_use]
    pub fn enabled(&self, severity: Severity) -> bool {
        severity <= self.max_severity
    }
}

impl ReportSink for TracingReportSink {
    fn report(&self, severity: Severity, message: &str) {
        if !self.enabled(severity) {
            return;
        }
        match severity {
            Severity::Error => error!(target: "stagebuild::report", "{message}"),
            Severity::Warning => warn!(target: "stagebuild::report", "{message}"),
            Severity::Info => info!(target: "stagebuild::report", "{message}"),
            Severity::Debug => debug!(target: "stagebuild::report", "{message}"),
        }
    }
}

/// A sink that keeps every message, for tests.
#[derive(Debug, Default)]
pub struct CollectingReportSink {
    messages: RwLock<Vec<(Severity, String)>>,
}

impl CollectingReportSink {
    /// Creates a new collecting sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns all collected messages.
    #[must_use]
    pub fn messages(&self) -> Vec<(Severity, String)> {
        self.messages.read().clone()
    }

    /// Returns the messages of one severity.
    #[must_use]
    pub fn messages_at(&self, severity: Severity) -> Vec<String> {
        self.messages
            .read()
            .iter()
            .filter(|(s, _)| *s == severity)
            .map(|(_, m)| m.clone())
            .collect()
    }

    /// Returns true if any message contains `needle`.
    #[must_use]
    pub fn contains(&self, needle: &str) -> bool {
        self.messages.read().iter().any(|(_, m)| m.contains(needle))
    }

    /// Returns the number of collected messages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.messages.read().len()
    }

    /// Returns true if nothing was collected.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.messages.read().is_empty()
    }

    /// Clears all collected messages.
    pub fn clear(&self) {
        self.messages.write().clear();
    }
}

impl ReportSink for CollectingReportSink {
    fn report(&self, severity: Severity, message: &str) {
        self.messages.write().push((severity, message.to_string()));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_severity_ordering() {
        assert!(Severity::Error < Severity::Warning);
        assert!(Severity::Info < Severity::Debug);
        assert_eq!(Severity::Warning.to_string(), "warning");
    }

    #[test]
    fn test_tracing_sink_gating() {
        let sink = TracingReportSink::default();
        assert!(sink.enabled(Severity::Error));
        assert!(sink.enabled(Severity::Info));
        assert!(!sink.enabled(Severity::Debug));
        assert!(TracingReportSink::verbose().enabled(Severity::Debug));

        sink.report(Severity::Warning, "stage unreachable");
        sink.report(Severity::Debug, "hidden");
    }

    #[test]
    fn test_noop_sink() {
        NoOpReportSink.report(Severity::Error, "discarded");
    }

    #[test]
    fn test_collecting_sink() {
        let sink = CollectingReportSink::new();
        assert!(sink.is_empty());

        sink.report(Severity::Info, "Target bitstream -> top.bit");
        sink.report(Severity::Debug, "eblif is causing rebuild for `pack`");

        assert_eq!(sink.len(), 2);
        assert_eq!(sink.messages_at(Severity::Debug).len(), 1);
        assert_eq!(
            sink.messages()[0],
            (Severity::Info, "Target bitstream -> top.bit".to_string())
        );
        assert!(sink.contains("top.bit"));

        sink.clear();
        assert!(sink.is_empty());
    }
}
