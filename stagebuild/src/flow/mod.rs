//! The flow orchestrator.
//!
//! A [`Flow`] is built for one target artifact. Construction runs the dry-run
//! planner: every stage the target transitively needs is asked where its
//! outputs would land, and stages with stale inputs or missing outputs are
//! flagged. [`Flow::execute`] then runs the flagged stages in dependency
//! order and records the new baselines with the staleness oracle.
//!
//! ```rust,ignore
//! let mut flow = Flow::builder("bitstream")
//!     .stages(stages)
//!     .config(FlowConfig::from_path("flow.json")?)
//!     .oracle(ContentHashCache::open("build/.symbicache"))
//!     .build()?;
//! flow.print_resolved_dependencies(Severity::Info);
//! let bitstream = flow.execute().await?;
//! ```

mod build;
mod report;
mod resolve;
mod state;


pub use report::{DependencyReport, DependencyStatus};
pub use state::{FlowState, StageBindings};

use crate::config::FlowConfig;
use crate::diagnostics::{ReportSink, Severity, TracingReportSink};
use crate::errors::FlowError;
use crate::graph::FlowGraph;
use crate::oracle::StalenessOracle;
use crate::paths::PathSet;
use crate::stages::{ModuleContext, StageDescriptor};
use std::fmt;
use std::sync::Arc;
use tracing::{debug, info, info_span, Instrument};
use uuid::Uuid;

/// Consumer name under which the final target's baseline is recorded.
pub const FINAL_TARGET_CONSUMER: &str = "__target";

/// Everything the planner and the driver read or update.
pub(crate) struct BuildContext {
    pub(crate) run_id: String,
    pub(crate) config: FlowConfig,
    pub(crate) oracle: Option<Box<dyn StalenessOracle>>,
    pub(crate) sink: Arc<dyn ReportSink>,
    pub(crate) state: FlowState,
}

impl BuildContext {
    /// Builds the calling context of `stage` from the current resolution.
    pub(crate) fn module_context(&self, stage: &StageDescriptor) -> ModuleContext {
        let takes = stage
            .takes
            .iter()
            .filter_map(|take| {
                self.state
                    .path(&take.name)
                    .map(|paths| (take.name.clone(), paths.clone()))
            })
            .collect();
        let produces = stage
            .produces
            .iter()
            .filter_map(|output| {
                self.state
                    .dep_paths
                    .get(&output.name)
                    .or_else(|| self.config.dependency_overrides().get(&output.name))
                    .map(|paths| (output.name.clone(), paths.clone()))
            })
            .collect();

        ModuleContext {
            stage: stage.name.clone(),
            share_dir: self.config.share_dir.clone(),
            bin_dir: self.config.bin_dir.clone(),
            takes,
            produces,
            values: self.config.stage_values(&stage.name),
        }
    }
}

/// Builder for a [`Flow`].
pub struct FlowBuilder {
    target: String,
    stages: Vec<StageDescriptor>,
    config: FlowConfig,
    oracle: Option<Box<dyn StalenessOracle>>,
    sink: Arc<dyn ReportSink>,
}

impl FlowBuilder {
    /// Creates a builder for `target`.
    #[must_use]
    pub fn new(target: impl Into<String>) -> Self {
        Self {
            target: target.into(),
            stages: Vec::new(),
            config: FlowConfig::default(),
            oracle: None,
            sink: Arc::new(TracingReportSink::default()),
        }
    }

    /// Adds a stage.
    #[must_use]
    pub fn stage(mut self, stage: StageDescriptor) -> Self {
        self.stages.push(stage);
        self
    }

    /// Adds several stages.
    #[must_use]
    pub fn stages(mut self, stages: impl IntoIterator<Item = StageDescriptor>) -> Self {
        self.stages.extend(stages);
        self
    }

    /// Sets the configuration.
    #[must_use]
    pub fn config(mut self, config: FlowConfig) -> Self {
        self.config = config;
        self
    }

    /// Enables incremental rebuilds with `oracle`.
    #[must_use]
    pub fn oracle(self, oracle: impl StalenessOracle + 'static) -> Self {
        self.boxed_oracle(Some(Box::new(oracle)))
    }

    /// Sets or clears the staleness oracle.
    #[must_use]
    pub fn boxed_oracle(mut self, oracle: Option<Box<dyn StalenessOracle>>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Sets the report sink.
    #[must_use]
    pub fn sink(mut self, sink: Arc<dyn ReportSink>) -> Self {
        self.sink = sink;
        self
    }

    /// Builds the flow and plans the build of its target.
    ///
    /// # Errors
    ///
    /// Returns an error if the stages do not form a valid graph, a module's
    /// mapping fails or omits a required output, or the oracle fails.
    pub fn build(self) -> Result<Flow, FlowError> {
        Flow::new(self.target, self.stages, self.config, self.oracle, self.sink)
    }
}

/// A planned build of one target.
pub struct Flow {
    target: String,
    run_id: Uuid,
    graph: FlowGraph,
    cx: BuildContext,
}

impl Flow {
    /// Returns a builder for `target`.
    #[must_use]
    pub fn builder(target: impl Into<String>) -> FlowBuilder {
        FlowBuilder::new(target)
    }

    /// Creates a flow and plans the build of `target`.
    ///
    /// Explicit dependency overrides that exist on disk and are not claimed
    /// by any stage seed the resolution. Without an oracle every stage on
    /// the path to the target is considered stale.
    pub fn new(
        target: impl Into<String>,
        stages: Vec<StageDescriptor>,
        config: FlowConfig,
        oracle: Option<Box<dyn StalenessOracle>>,
        sink: Arc<dyn ReportSink>,
    ) -> Result<Self, FlowError> {
        let target = target.into();
        let run_id = Uuid::now_v7();
        let _span = info_span!("flow.plan", target = %target, run_id = %run_id).entered();

        let mut graph = FlowGraph::new(stages)?;
        let mut cx = BuildContext {
            run_id: run_id.to_string(),
            config,
            oracle,
            sink,
            state: FlowState::default(),
        };

        for (artifact, paths) in cx.config.dependency_overrides() {
            if paths.is_empty() || !paths.exists() || graph.is_produced(artifact) {
                continue;
            }
            if let Some(oracle) = cx.oracle.as_deref_mut() {
                paths.register(oracle)?;
            }
            cx.state.dep_paths.insert(artifact.clone(), paths.clone());
        }
        debug!(seeded = cx.state.dep_paths.len(), "Seeded explicit dependencies");

        resolve::resolve(&mut graph, &mut cx, &target)?;
        cx.state.diagnostics.finish_pass(cx.sink.as_ref());
        info!(
            stages = graph.len(),
            scheduled = cx.state.run_stages.len(),
            "Flow planned"
        );

        Ok(Self {
            target,
            run_id,
            graph,
            cx,
        })
    }

    /// Returns the target artifact.
    #[must_use]
    pub fn target(&self) -> &str {
        &self.target
    }

    /// Returns the id of this run.
    #[must_use]
    pub fn run_id(&self) -> Uuid {
        self.run_id
    }

    /// Returns the stage graph. Outputs released during planning are no
    /// longer indexed.
    #[must_use]
    pub fn graph(&self) -> &FlowGraph {
        &self.graph
    }

    /// Returns the build state.
    #[must_use]
    pub fn state(&self) -> &FlowState {
        &self.cx.state
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &FlowConfig {
        &self.cx.config
    }

    /// Returns the resolved location of `artifact`.
    #[must_use]
    pub fn path(&self, artifact: &str) -> Option<&PathSet> {
        self.cx.state.path(artifact)
    }

    /// Returns what `stage`'s inputs and outputs resolved to.
    #[must_use]
    pub fn bindings(&self, stage: &str) -> Option<&StageBindings> {
        self.cx.state.bindings(stage)
    }

    /// Returns the calling context `stage` runs with.
    #[must_use]
    pub fn module_context(&self, stage: &str) -> Option<ModuleContext> {
        self.graph
            .stage_by_name(stage)
            .map(|stage| self.cx.module_context(stage))
    }

    /// Consumes the flow and hands back its oracle for reuse.
    #[must_use]
    pub fn into_oracle(self) -> Option<Box<dyn StalenessOracle>> {
        self.cx.oracle
    }

    /// Makes `artifact` available, running whatever stages it needs.
    ///
    /// Returns `Ok(false)` if the artifact cannot be made available.
    pub async fn build(&mut self, artifact: &str) -> Result<bool, FlowError> {
        let span = info_span!("flow.build", artifact, run_id = %self.run_id);
        build::build(&self.graph, &mut self.cx, artifact)
            .instrument(span)
            .await
    }

    /// Builds the target and records it as the final product.
    ///
    /// # Errors
    ///
    /// Returns [`FlowError::TargetUnresolved`] if the target cannot be
    /// resolved, or the first error raised while building it.
    pub async fn execute(&mut self) -> Result<PathSet, FlowError> {
        let span = info_span!("flow.execute", target = %self.target, run_id = %self.run_id);
        async {
            let built = build::build(&self.graph, &mut self.cx, &self.target).await?;
            let paths = match self.cx.state.path(&self.target) {
                Some(paths) if built => paths.clone(),
                _ => {
                    return Err(FlowError::TargetUnresolved {
                        target: self.target.clone(),
                    })
                }
            };

            if let Some(oracle) = self.cx.oracle.as_deref_mut() {
                paths.register(oracle)?;
                paths.update_status(FINAL_TARGET_CONSUMER, oracle)?;
                oracle.flush()?;
            }

            info!(executed = self.cx.state.executed.len(), "Target built");
            self.cx.sink.report(
                Severity::Info,
                &format!("Target `{}` -> {paths}", self.target),
            );
            Ok(paths)
        }
        .instrument(span)
        .await
    }
}

impl fmt::Debug for Flow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Flow")
            .field("target", &self.target)
            .field("run_id", &self.run_id)
            .field("stages", &self.graph.len())
            .field("run_stages", &self.cx.state.run_stages)
            .field("incremental", &self.cx.oracle.is_some())
            .finish_non_exhaustive()
    }
}
