//! Reporting sinks and the planner's diagnostics collector.
//!
//! The orchestrator never formats output for a terminal itself. It hands a
//! severity and a message to a [`ReportSink`] and lets the sink decide what
//! to show.

mod collector;
mod sink;

pub use collector::{Diagnostic, Diagnostics};
pub use sink::{CollectingReportSink, NoOpReportSink, ReportSink, Severity, TracingReportSink};
