//! File-writing modules for exercising flows.

use crate::paths::PathSet;
use crate::stages::{ModuleContext, OutputMap, StageModule};
use anyhow::{bail, Context as _};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::{BTreeMap, HashSet};
use std::path::PathBuf;
use std::sync::Arc;

/// Shared, ordered record of stage executions.
#[derive(Debug, Clone, Default)]
pub struct ExecutionLog(Arc<Mutex<Vec<String>>>);

impl ExecutionLog {
    /// Creates an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends an entry.
    pub fn record(&self, stage: impl Into<String>) {
        self.0.lock().push(stage.into());
    }

    /// Returns every entry in order.
    #[must_use]
    pub fn entries(&self) -> Vec<String> {
        self.0.lock().clone()
    }

    /// Returns the number of entries.
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.lock().len()
    }

    /// Returns true if nothing was recorded.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.lock().is_empty()
    }

    /// Forgets every entry.
    pub fn clear(&self) {
        self.0.lock().clear();
    }
}

/// A module that maps each output to a file under a directory and writes
/// fixed content to it when executed.
///
/// Explicitly requested output locations take precedence over the
/// directory. Content is `"<output> from <module>"` unless overridden.
#[derive(Debug)]
pub struct WriteModule {
    name: String,
    dir: PathBuf,
    outputs: BTreeMap<String, Layout>,
    contents: Mutex<BTreeMap<String, String>>,
    skipped: Mutex<HashSet<String>>,
    failure: Mutex<Option<String>>,
    log: ExecutionLog,
    executions: Mutex<usize>,
}

impl WriteModule {
    /// Creates a module writing below `dir`.
    #[must_use]
    pub fn new(name: impl Into<String>, dir: impl Into<PathBuf>) -> Self {
        Self {
            name: name.into(),
            dir: dir.into(),
            outputs: BTreeMap::new(),
            contents: Mutex::new(BTreeMap::new()),
            skipped: Mutex::new(HashSet::new()),
            failure: Mutex::new(None),
            log: ExecutionLog::new(),
            executions: Mutex::new(0),
        }
    }

    /// Maps `output` to `dir/file_name`.
    #[must_use]
    pub fn output(mut self, output: impl Into<String>, file_name: impl Into<String>) -> Self {
        self.outputs
            .insert(output.into(), Layout::File(file_name.into()));
        self
    }

    /// Maps `output` to a list of files under `dir`.
    #[must_use]
    pub fn output_list<'a>(
        mut self,
        output: impl Into<String>,
        file_names: impl IntoIterator<Item = &'a str>,
    ) -> Self {
        let files = file_names.into_iter().map(str::to_string).collect();
        self.outputs.insert(output.into(), Layout::Files(files));
        self
    }

    /// Records executions into a shared log.
    #[must_use]
    pub fn with_log(mut self, log: ExecutionLog) -> Self {
        self.log = log;
        self
    }

    /// Sets the content written for `output`.
    pub fn set_content(&self, output: &str, content: impl Into<String>) {
        self.contents.lock().insert(output.to_string(), content.into());
    }

    /// Keeps `output` mapped but stops writing it.
    pub fn skip_write(&self, output: &str) {
        self.skipped.lock().insert(output.to_string());
    }

    /// Makes every following execution fail with `message`.
    pub fn fail_with(&self, message: impl Into<String>) {
        *self.failure.lock() = Some(message.into());
    }

    /// Returns how many times the module ran.
    #[must_use]
    pub fn executions(&self) -> usize {
        *self.executions.lock()
    }

    /// Returns the location `output` maps to when not requested explicitly.
    #[must_use]
    pub fn default_location(&self, output: &str) -> Option<PathSet> {
        self.outputs.get(output).map(|layout| self.under_dir(layout))
    }

    fn under_dir(&self, layout: &Layout) -> PathSet {
        match layout {
            Layout::File(file) => PathSet::single(self.dir.join(file)),
            Layout::Files(files) => PathSet::list(files.iter().map(|file| self.dir.join(file))),
        }
    }

    fn location(&self, ctx: &ModuleContext, output: &str, layout: &Layout) -> PathSet {
        ctx.produce(output)
            .cloned()
            .unwrap_or_else(|| self.under_dir(layout))
    }
}

#[derive(Debug)]
enum Layout {
    File(String),
    Files(Vec<String>),
}

#[async_trait]
impl StageModule for WriteModule {
    fn name(&self) -> &str {
        &self.name
    }

    fn map_outputs(&self, ctx: &ModuleContext) -> anyhow::Result<OutputMap> {
        Ok(self
            .outputs
            .iter()
            .map(|(output, layout)| (output.clone(), self.location(ctx, output, layout)))
            .collect())
    }

    async fn execute(&self, ctx: &ModuleContext) -> anyhow::Result<()> {
        *self.executions.lock() += 1;
        self.log.record(ctx.stage.clone());
        let failure = self.failure.lock().clone();
        if let Some(message) = failure {
            bail!(message);
        }

        let mut writes: Vec<(PathBuf, String)> = Vec::new();
        {
            let contents = self.contents.lock();
            let skipped = self.skipped.lock();
            for (output, layout) in &self.outputs {
                if skipped.contains(output) {
                    continue;
                }
                let content = contents
                    .get(output)
                    .cloned()
                    .unwrap_or_else(|| format!("{output} from {}", self.name));
                let location = self.location(ctx, output, layout);
                for path in location.paths() {
                    writes.push((path.to_path_buf(), content.clone()));
                }
            }
        }

        for (path, content) in writes {
            if let Some(parent) = path.parent() {
                tokio::fs::create_dir_all(parent)
                    .await
                    .with_context(|| format!("creating {}", parent.display()))?;
            }
            tokio::fs::write(&path, content)
                .await
                .with_context(|| format!("writing {}", path.display()))?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_module_writes_mapped_outputs() {
        let dir = tempfile::tempdir().unwrap();
        let log = ExecutionLog::new();
        let module = WriteModule::new("synth", dir.path())
            .output("eblif", "top.eblif")
            .output("log", "synth.log")
            .with_log(log.clone());
        module.set_content("eblif", "netlist");
        module.skip_write("log");

        let ctx = ModuleContext {
            stage: "synth".to_string(),
            ..ModuleContext::default()
        };
        let outputs = module.map_outputs(&ctx).unwrap();
        assert_eq!(outputs["eblif"], PathSet::single(dir.path().join("top.eblif")));

        module.execute(&ctx).await.unwrap();
        assert_eq!(
            std::fs::read_to_string(dir.path().join("top.eblif")).unwrap(),
            "netlist"
        );
        assert!(!dir.path().join("synth.log").exists());
        assert_eq!(module.executions(), 1);
        assert_eq!(log.entries(), vec!["synth".to_string()]);
    }

    #[tokio::test]
    async fn test_write_module_honours_requested_location() {
        let dir = tempfile::tempdir().unwrap();
        let requested = dir.path().join("out").join("custom.net");
        let module = WriteModule::new("pack", dir.path()).output("net", "top.net");

        let mut ctx = ModuleContext::default();
        ctx.produces
            .insert("net".to_string(), PathSet::single(requested.clone()));

        assert_eq!(
            module.map_outputs(&ctx).unwrap()["net"],
            PathSet::single(requested.clone())
        );
        module.execute(&ctx).await.unwrap();
        assert_eq!(std::fs::read_to_string(requested).unwrap(), "net from pack");
    }

    #[tokio::test]
    async fn test_write_module_failure() {
        let dir = tempfile::tempdir().unwrap();
        let module = WriteModule::new("route", dir.path()).output("route", "top.route");
        module.fail_with("router diverged");

        let err = module.execute(&ModuleContext::default()).await.unwrap_err();
        assert_eq!(err.to_string(), "router diverged");
        assert!(module.default_location("route").is_some_and(|p| !p.exists()));
    }
}
