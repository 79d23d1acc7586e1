//! Resolution reporting.

use super::Flow;
use crate::diagnostics::Severity;
use crate::paths::PathSet;
use serde::Serialize;
use std::fmt;

/// Where an artifact stands after planning or execution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyStatus {
    /// Resolved to paths that do not exist, with no stage to create them.
    Missing,
    /// Rebuilt during this run, or seen as changed by a consumer.
    Rebuilt,
    /// The provider is scheduled to run.
    Stale {
        /// True if an older version is on disk.
        exists: bool,
    },
    /// A stage produces it but its location could not be resolved.
    Unresolved,
    /// Exists and nothing has to change.
    UpToDate,
}

impl DependencyStatus {
    /// Returns the one-letter marker used in listings.
    #[must_use]
    pub fn marker(self) -> char {
        match self {
            Self::Missing => 'X',
            Self::Rebuilt => 'N',
            Self::Stale { exists: true } => 'R',
            Self::Stale { exists: false } => 'S',
            Self::Unresolved => 'U',
            Self::UpToDate => 'O',
        }
    }
}

/// One line of the resolution report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DependencyReport {
    /// The artifact.
    pub artifact: String,
    /// Its status.
    pub status: DependencyStatus,
    /// The resolved location, if any.
    pub paths: Option<PathSet>,
    /// The providing stage, if any.
    pub provider: Option<String>,
}

impl fmt::Display for DependencyReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "    [{}] {}: ", self.status.marker(), self.artifact)?;
        match (&self.provider, &self.paths) {
            (Some(provider), Some(paths)) if self.status != DependencyStatus::UpToDate => {
                write!(f, "{provider} -> {paths}")
            }
            (_, Some(paths)) => write!(f, "{paths}"),
            (Some(provider), None) => write!(f, "{provider} -> ???"),
            (None, None) => write!(f, "MISSING"),
        }
    }
}

impl Flow {
    /// Classifies every artifact the planner visited, sorted by name.
    #[must_use]
    pub fn resolution_report(&self) -> Vec<DependencyReport> {
        let state = self.state();
        state
            .deps_rebuilds
            .iter()
            .map(|(artifact, &rebuilds)| {
                let provider = self.graph().provider(artifact);
                let paths = state.path(artifact).cloned();
                let status = match (&paths, provider) {
                    (Some(paths), provider) => {
                        let exists = paths.exists();
                        let executed =
                            provider.is_some_and(|stage| state.executed.contains(&stage.name));
                        if provider.is_some_and(|stage| state.is_scheduled(&stage.name)) {
                            DependencyStatus::Stale { exists }
                        } else if !exists {
                            DependencyStatus::Missing
                        } else if rebuilds > 0 || executed {
                            DependencyStatus::Rebuilt
                        } else {
                            DependencyStatus::UpToDate
                        }
                    }
                    (None, Some(_)) => DependencyStatus::Unresolved,
                    (None, None) => DependencyStatus::Missing,
                };
                DependencyReport {
                    artifact: artifact.clone(),
                    status,
                    paths,
                    provider: provider.map(|stage| stage.name.clone()),
                }
            })
            .collect()
    }

    /// Sends the resolution report to the flow's sink.
    pub fn print_resolved_dependencies(&self, severity: Severity) {
        self.cx.sink.report(
            severity,
            &format!("Project status for target `{}`:", self.target()),
        );
        for entry in self.resolution_report() {
            self.cx.sink.report(severity, &entry.to_string());
        }
    }
}
