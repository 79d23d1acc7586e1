//! Diagnostics gathered while planning a flow.

use super::{ReportSink, Severity};
use std::collections::HashSet;
use std::fmt;

/// A non-fatal finding of the planner.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Diagnostic {
    /// A stage cannot run because a required input is unavailable.
    Unreachable {
        /// The stage that cannot run.
        stage: String,
        /// The missing input.
        artifact: String,
    },
    /// A changed input forces a stage to rebuild.
    RebuildCause {
        /// The changed input.
        artifact: String,
        /// The stage that has to run again.
        stage: String,
    },
}

impl Diagnostic {
    /// Returns the severity the diagnostic is reported with.
    #[must_use]
    pub fn severity(&self) -> Severity {
        match self {
            Self::Unreachable { .. } => Severity::Warning,
            Self::RebuildCause { .. } => Severity::Debug,
        }
    }

    fn dedup_key(&self) -> (u8, String, String) {
        match self {
            Self::Unreachable { stage, artifact } => (0, stage.clone(), artifact.clone()),
            Self::RebuildCause { artifact, .. } => (1, artifact.clone(), String::new()),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unreachable { stage, artifact } => write!(
                f,
                "Stage `{stage}` is unreachable due to unmet dependency `{artifact}`"
            ),
            Self::RebuildCause { artifact, stage } => {
                write!(f, "`{artifact}` is causing rebuild for `{stage}`")
            }
        }
    }
}

/// Collects diagnostics during a pass and reports them once it finishes.
///
/// Rebuild causes are reported once per artifact, unreachable stages once per
/// (stage, input) pair.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
    reported: usize,
}

impl Diagnostics {
    /// Creates an empty collector.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Records an unreachable stage.
    pub fn unreachable(&mut self, stage: impl Into<String>, artifact: impl Into<String>) {
        self.entries.push(Diagnostic::Unreachable {
            stage: stage.into(),
            artifact: artifact.into(),
        });
    }

    /// Records a rebuild cause.
    pub fn rebuild_cause(&mut self, artifact: impl Into<String>, stage: impl Into<String>) {
        self.entries.push(Diagnostic::RebuildCause {
            artifact: artifact.into(),
            stage: stage.into(),
        });
    }

    /// Returns every recorded diagnostic, duplicates included.
    #[must_use]
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Returns the first occurrence of each distinct diagnostic.
    #[must_use]
    pub fn deduplicated(&self) -> Vec<&Diagnostic> {
        self.first_occurrences().map(|(_, d)| d).collect()
    }

    fn first_occurrences(&self) -> impl Iterator<Item = (usize, &Diagnostic)> {
        let mut seen = HashSet::new();
        self.entries
            .iter()
            .enumerate()
            .filter(move |(_, d)| seen.insert(d.dedup_key()))
    }

    /// Reports everything recorded since the last call.
    pub fn finish_pass(&mut self, sink: &dyn ReportSink) {
        for (_, diagnostic) in self
            .first_occurrences()
            .filter(|(index, _)| *index >= self.reported)
        {
            sink.report(diagnostic.severity(), &diagnostic.to_string());
        }
        self.reported = self.entries.len();
    }
}
