//! The stage graph and its Output-Provider Index.
//!
//! Stages are stored once and addressed by [`StageId`]. Every output is owned
//! by at most one stage; a second claim is a construction-time error.

use crate::errors::{CycleDetectedError, FlowError};
use crate::stages::StageDescriptor;
use std::collections::{HashMap, HashSet};

/// Stable index of a stage within a [`FlowGraph`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StageId(usize);

impl StageId {
    /// Returns the raw index.
    #[must_use]
    pub fn index(self) -> usize {
        self.0
    }
}

/// The stages of a flow and the artifact-to-stage provider index.
#[derive(Debug, Clone)]
pub struct FlowGraph {
    stages: Vec<StageDescriptor>,
    by_name: HashMap<String, StageId>,
    providers: HashMap<String, StageId>,
}

impl FlowGraph {
    /// Builds the graph.
    ///
    /// # Errors
    ///
    /// Returns an error if two stages share a name, two stages produce the
    /// same artifact, or the stages depend on each other in a cycle.
    pub fn new(stages: Vec<StageDescriptor>) -> Result<Self, FlowError> {
        let mut by_name = HashMap::with_capacity(stages.len());
        let mut providers: HashMap<String, StageId> = HashMap::new();

        for (index, stage) in stages.iter().enumerate() {
            let id = StageId(index);
            if by_name.insert(stage.name.clone(), id).is_some() {
                return Err(FlowError::DuplicateStage {
                    stage: stage.name.clone(),
                });
            }
            for output in &stage.produces {
                if let Some(owner) = providers.get(&output.name) {
                    if *owner != id {
                        return Err(FlowError::DuplicateProvider {
                            artifact: output.name.clone(),
                            first: stages[owner.0].name.clone(),
                            second: stage.name.clone(),
                        });
                    }
                } else {
                    providers.insert(output.name.clone(), id);
                }
            }
        }

        let graph = Self {
            stages,
            by_name,
            providers,
        };
        graph.detect_cycles()?;
        Ok(graph)
    }

    /// Returns the number of stages.
    #[must_use]
    pub fn len(&self) -> usize {
        self.stages.len()
    }

    /// Returns true if the graph has no stages.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.stages.is_empty()
    }

    /// Returns a stage by id.
    #[must_use]
    pub fn stage(&self, id: StageId) -> &StageDescriptor {
        &self.stages[id.0]
    }

    /// Returns a stage by name.
    #[must_use]
    pub fn stage_by_name(&self, name: &str) -> Option<&StageDescriptor> {
        self.by_name.get(name).map(|id| &self.stages[id.0])
    }

    /// Iterates over stages in declaration order.
    pub fn stages(&self) -> impl Iterator<Item = &StageDescriptor> {
        self.stages.iter()
    }

    /// Returns the id of the stage producing `artifact`.
    #[must_use]
    pub fn provider_id(&self, artifact: &str) -> Option<StageId> {
        self.providers.get(artifact).copied()
    }

    /// Returns the stage producing `artifact`.
    #[must_use]
    pub fn provider(&self, artifact: &str) -> Option<&StageDescriptor> {
        self.provider_id(artifact).map(|id| self.stage(id))
    }

    /// Returns true if some stage produces `artifact`.
    #[must_use]
    pub fn is_produced(&self, artifact: &str) -> bool {
        self.providers.contains_key(artifact)
    }

    /// Drops `artifact` from the provider index for the rest of the run.
    pub(crate) fn release_output(&mut self, artifact: &str) -> Option<StageId> {
        self.providers.remove(artifact)
    }

    fn detect_cycles(&self) -> Result<(), CycleDetectedError> {
        let mut visited = HashSet::new();
        let mut rec_stack = HashSet::new();
        let mut path = Vec::new();

        for index in 0..self.stages.len() {
            let id = StageId(index);
            if !visited.contains(&id) {
                if let Some(cycle) = self.dfs_cycle(id, &mut visited, &mut rec_stack, &mut path) {
                    return Err(CycleDetectedError::new(cycle));
                }
            }
        }
        Ok(())
    }

    fn dfs_cycle(
        &self,
        node: StageId,
        visited: &mut HashSet<StageId>,
        rec_stack: &mut HashSet<StageId>,
        path: &mut Vec<StageId>,
    ) -> Option<Vec<String>> {
        visited.insert(node);
        rec_stack.insert(node);
        path.push(node);

        for take in &self.stage(node).takes {
            let Some(dep) = self.provider_id(&take.name) else {
                continue;
            };
            if !visited.contains(&dep) {
                if let Some(cycle) = self.dfs_cycle(dep, visited, rec_stack, path) {
                    return Some(cycle);
                }
            } else if rec_stack.contains(&dep) {
                let start = path.iter().position(|n| *n == dep).unwrap_or(0);
                let mut cycle: Vec<String> = path[start..]
                    .iter()
                    .map(|id| self.stage(*id).name.clone())
                    .collect();
                cycle.push(self.stage(dep).name.clone());
                return Some(cycle);
            }
        }

        path.pop();
        rec_stack.remove(&node);
        None
    }
}
