//! The module execution contract.

use crate::paths::PathSet;
use async_trait::async_trait;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::path::PathBuf;

/// Output name to the Path-Set a module produces for it.
pub type OutputMap = BTreeMap<String, PathSet>;

/// Calling context shared by a module's dry run and its execution.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ModuleContext {
    /// The stage being run.
    pub stage: String,
    /// Shared data directory of the toolchain.
    pub share_dir: PathBuf,
    /// Directory holding the toolchain binaries.
    pub bin_dir: PathBuf,
    /// Resolved inputs. Absent optional inputs are omitted.
    pub takes: BTreeMap<String, PathSet>,
    /// Resolved or explicitly requested outputs.
    pub produces: BTreeMap<String, PathSet>,
    /// Stage configuration values.
    pub values: serde_json::Map<String, serde_json::Value>,
}

impl ModuleContext {
    /// Returns a resolved input.
    #[must_use]
    pub fn take(&self, name: &str) -> Option<&PathSet> {
        self.takes.get(name)
    }

    /// Returns a resolved or requested output location.
    #[must_use]
    pub fn produce(&self, name: &str) -> Option<&PathSet> {
        self.produces.get(name)
    }

    /// Returns a configuration value.
    #[must_use]
    pub fn value(&self, name: &str) -> Option<&serde_json::Value> {
        self.values.get(name)
    }

    /// Returns a string configuration value.
    #[must_use]
    pub fn value_str(&self, name: &str) -> Option<&str> {
        self.values.get(name).and_then(serde_json::Value::as_str)
    }
}

/// The work behind a stage.
///
/// [`StageModule::map_outputs`] must not touch the disk; the orchestrator
/// calls it while planning to learn where outputs will land.
/// [`StageModule::execute`] performs the real work and must leave every
/// required output where the mapping promised.
#[async_trait]
pub trait StageModule: Send + Sync + Debug {
    /// Returns the module name.
    fn name(&self) -> &str;

    /// Maps each output to the Path-Set it would be written to.
    fn map_outputs(&self, ctx: &ModuleContext) -> anyhow::Result<OutputMap>;

    /// Runs the stage.
    async fn execute(&self, ctx: &ModuleContext) -> anyhow::Result<()>;
}

/// A module whose mapping is a function and whose execution does nothing.
///
/// Useful for stages that only expose pre-existing files.
pub struct FnModule<F>
where
    F: Fn(&ModuleContext) -> anyhow::Result<OutputMap> + Send + Sync,
{
    name: String,
    map: F,
}

impl<F> FnModule<F>
where
    F: Fn(&ModuleContext) -> anyhow::Result<OutputMap> + Send + Sync,
{
    /// Creates a new function-based module.
    pub fn new(name: impl Into<String>, map: F) -> Self {
        Self {
            name: name.into(),
            map,
        }
    }
}

impl<F> Debug for FnModule<F>
where
    F: Fn(&ModuleContext) -> anyhow::Result<OutputMap> + Send + Sync,
{
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnModule").field("name", &self.name).finish()
    }
}

#[async_trait]
impl<F> StageModule for FnModule<F>
where
    F: Fn(&ModuleContext) -> anyhow::Result<OutputMap> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn map_outputs(&self, ctx: &ModuleContext) -> anyhow::Result<OutputMap> {
        (self.map)(ctx)
    }

    async fn execute(&self, _ctx: &ModuleContext) -> anyhow::Result<()> {
        Ok(())
    }
}
