//! Error types for the stagebuild orchestrator.
//!
//! Every fallible orchestrator call returns [`FlowError`]. Configuration and
//! oracle failures have their own enums and are wrapped through `#[from]`.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for flow construction and execution.
#[derive(Debug, Error)]
pub enum FlowError {
    /// Two stages declare the same output.
    #[error(
        "Dependency `{artifact}` is generated by stage `{first}` and `{second}`. \
         Dependencies can have only one provider at most."
    )]
    DuplicateProvider {
        /// The contested artifact.
        artifact: String,
        /// The stage that claimed the artifact first.
        first: String,
        /// The stage that tried to claim it again.
        second: String,
    },

    /// Two stages share a name.
    #[error("Stage `{stage}` is defined more than once")]
    DuplicateStage {
        /// The repeated stage name.
        stage: String,
    },

    /// The stage graph contains a cycle.
    #[error("{0}")]
    CycleDetected(#[from] CycleDetectedError),

    /// A module's dry-run mapping omitted a required output.
    #[error("Module `{stage}` did not produce a mapping for a required output `{artifact}`")]
    MissingOutputMapping {
        /// The stage whose module is at fault.
        stage: String,
        /// The output missing from the mapping.
        artifact: String,
    },

    /// A stage finished without materialising a required output.
    #[error("Stage `{stage}` did not produce promised dependency `{artifact}`")]
    DependencyNotProduced {
        /// The stage that was executed.
        stage: String,
        /// The artifact that is still missing on disk.
        artifact: String,
    },

    /// A required input of a stage could not be built.
    #[error("Stage `{stage}` cannot run: required dependency `{artifact}` is unavailable")]
    DependencyUnavailable {
        /// The consuming stage.
        stage: String,
        /// The unavailable input.
        artifact: String,
    },

    /// The requested target could not be resolved to any path.
    #[error("Target `{target}` could not be resolved")]
    TargetUnresolved {
        /// The target artifact.
        target: String,
    },

    /// A stage module failed.
    #[error("Stage `{stage}` failed: {source:#}")]
    Module {
        /// The failing stage.
        stage: String,
        /// The module's error.
        #[source]
        source: anyhow::Error,
    },

    /// The staleness oracle failed.
    #[error("{0}")]
    Oracle(#[from] OracleError),

    /// The flow configuration is invalid.
    #[error("{0}")]
    Config(#[from] ConfigError),
}

impl FlowError {
    /// Wraps a module failure with the name of its stage.
    #[must_use]
    pub fn module(stage: impl Into<String>, source: anyhow::Error) -> Self {
        Self::Module {
            stage: stage.into(),
            source,
        }
    }

    /// Returns true for errors caused by the flow definition rather than a run.
    #[must_use]
    pub fn is_configuration_error(&self) -> bool {
        matches!(
            self,
            Self::DuplicateProvider { .. }
                | Self::DuplicateStage { .. }
                | Self::CycleDetected(_)
                | Self::Config(_)
        )
    }
}

/// Error raised when the stage graph contains a dependency cycle.
#[derive(Debug, Clone, Error)]
#[error("Cycle detected in flow: {}", cycle_path.join(" -> "))]
pub struct CycleDetectedError {
    /// The stages forming the cycle, first stage repeated at the end.
    pub cycle_path: Vec<String>,
}

impl CycleDetectedError {
    /// Creates a new cycle detected error.
    #[must_use]
    pub fn new(cycle_path: Vec<String>) -> Self {
        Self { cycle_path }
    }
}

/// Errors raised by staleness oracle implementations.
#[derive(Debug, Error)]
pub enum OracleError {
    /// Reading a tracked file failed.
    #[error("Cannot hash `{}`: {source}", path.display())]
    Hash {
        /// The file being hashed.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Writing the cache file failed.
    #[error("Cannot write cache `{}`: {source}", path.display())]
    Persist {
        /// The cache file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The cache could not be serialized.
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Errors raised while loading a flow configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file could not be read.
    #[error("Cannot read flow configuration `{}`: {source}", path.display())]
    Read {
        /// The configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// The configuration is not valid JSON or has the wrong shape.
    #[error("Invalid flow configuration: {0}")]
    Parse(#[from] serde_json::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_duplicate_provider_message_names_both_stages() {
        let err = FlowError::DuplicateProvider {
            artifact: "eblif".to_string(),
            first: "synth".to_string(),
            second: "resynth".to_string(),
        };

        let msg = err.to_string();
        assert!(msg.contains("`eblif`"));
        assert!(msg.contains("`synth`"));
        assert!(msg.contains("`resynth`"));
        assert!(err.is_configuration_error());
    }

    #[test]
    fn test_cycle_detected_error() {
        let err = CycleDetectedError::new(vec![
            "a".to_string(),
            "b".to_string(),
            "a".to_string(),
        ]);

        assert!(err.to_string().contains("a -> b -> a"));
        assert!(FlowError::from(err).is_configuration_error());
    }

    #[test]
    fn test_module_error_keeps_context() {
        let source = anyhow::anyhow!("yosys exited with 1").context("synthesis failed");
        let err = FlowError::module("synth", source);

        let msg = err.to_string();
        assert!(msg.contains("Stage `synth` failed"));
        assert!(msg.contains("yosys exited with 1"));
        assert!(!err.is_configuration_error());
    }

    #[test]
    fn test_not_produced_message() {
        let err = FlowError::DependencyNotProduced {
            stage: "route".to_string(),
            artifact: "route".to_string(),
        };
        assert_eq!(
            err.to_string(),
            "Stage `route` did not produce promised dependency `route`"
        );
    }
}
