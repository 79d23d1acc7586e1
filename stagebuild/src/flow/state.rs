//! Mutable state of one target's build.

use crate::diagnostics::Diagnostics;
use crate::paths::PathSet;
use serde::Serialize;
use std::collections::{BTreeMap, HashMap, HashSet};

/// Resolved inputs and outputs of a checked stage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StageBindings {
    /// Every declared input and what it resolved to.
    pub takes: BTreeMap<String, Option<PathSet>>,
    /// Every mapped output.
    pub produces: BTreeMap<String, PathSet>,
}

/// State owned by a single flow for the duration of one build.
#[derive(Debug, Default)]
pub struct FlowState {
    pub(crate) dep_paths: HashMap<String, PathSet>,
    pub(crate) run_stages: HashSet<String>,
    pub(crate) deps_rebuilds: BTreeMap<String, usize>,
    pub(crate) stages_checked: HashSet<String>,
    pub(crate) bindings: HashMap<String, StageBindings>,
    pub(crate) executed: Vec<String>,
    pub(crate) diagnostics: Diagnostics,
}

impl FlowState {
    /// Returns the resolved location of `artifact`. Empty sets count as
    /// unresolved.
    #[must_use]
    pub fn path(&self, artifact: &str) -> Option<&PathSet> {
        self.dep_paths.get(artifact).filter(|paths| !paths.is_empty())
    }

    /// Returns every resolved artifact location.
    #[must_use]
    pub fn dep_paths(&self) -> &HashMap<String, PathSet> {
        &self.dep_paths
    }

    /// Returns the stages flagged for execution.
    #[must_use]
    pub fn run_stages(&self) -> &HashSet<String> {
        &self.run_stages
    }

    /// Returns true if `stage` is flagged for execution.
    #[must_use]
    pub fn is_scheduled(&self, stage: &str) -> bool {
        self.run_stages.contains(stage)
    }

    /// Returns how many consumers saw `artifact` as stale.
    #[must_use]
    pub fn rebuild_count(&self, artifact: &str) -> usize {
        self.deps_rebuilds.get(artifact).copied().unwrap_or(0)
    }

    /// Returns true if the planner visited `stage`.
    #[must_use]
    pub fn is_checked(&self, stage: &str) -> bool {
        self.stages_checked.contains(stage)
    }

    /// Returns the bindings recorded for `stage`.
    #[must_use]
    pub fn bindings(&self, stage: &str) -> Option<&StageBindings> {
        self.bindings.get(stage)
    }

    /// Returns the stages executed so far, in execution order.
    #[must_use]
    pub fn executed_stages(&self) -> &[String] {
        &self.executed
    }

    /// Returns the planner's diagnostics.
    #[must_use]
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    pub(crate) fn schedule(&mut self, stage: &str) {
        self.run_stages.insert(stage.to_string());
    }

    pub(crate) fn count_rebuild(&mut self, artifact: &str) {
        *self.deps_rebuilds.entry(artifact.to_string()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_paths_are_unresolved() {
        let mut state = FlowState::default();
        state.dep_paths.insert("a".to_string(), PathSet::List(Vec::new()));
        state.dep_paths.insert("b".to_string(), PathSet::single("b.v"));

        assert!(state.path("a").is_none());
        assert_eq!(state.path("b"), Some(&PathSet::single("b.v")));
        assert!(state.path("c").is_none());
    }

    #[test]
    fn test_schedule_and_count() {
        let mut state = FlowState::default();
        state.schedule("synth");
        state.schedule("synth");
        state.count_rebuild("sources");
        state.count_rebuild("sources");

        assert_eq!(state.run_stages().len(), 1);
        assert!(state.is_scheduled("synth"));
        assert_eq!(state.rebuild_count("sources"), 2);
        assert_eq!(state.rebuild_count("eblif"), 0);
    }
}
