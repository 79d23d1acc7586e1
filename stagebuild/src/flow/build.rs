//! Execution driver.

use super::BuildContext;
use crate::diagnostics::Severity;
use crate::errors::FlowError;
use crate::graph::FlowGraph;
use crate::observability::{stage_span, StageTimer};
use futures::future::BoxFuture;
use futures::FutureExt;
use tracing::{debug, Instrument};

/// Makes `artifact` available on disk, running its provider and the
/// provider's inputs as needed.
///
/// Returns `Ok(false)` when the artifact cannot be made available and no
/// required input of the caller depends on it.
pub(crate) fn build<'a>(
    graph: &'a FlowGraph,
    cx: &'a mut BuildContext,
    artifact: &'a str,
) -> BoxFuture<'a, Result<bool, FlowError>> {
    async move {
        let Some(paths) = cx.state.path(artifact).cloned() else {
            cx.sink
                .report(Severity::Debug, &format!("Dependency `{artifact}` is unresolved."));
            return Ok(false);
        };

        let provider = graph.provider(artifact);
        let scheduled = provider.is_some_and(|stage| cx.state.is_scheduled(&stage.name));
        if paths.exists() && !scheduled {
            return Ok(true);
        }

        let Some(stage) = provider else {
            cx.sink.report(
                Severity::Warning,
                &format!("Dependency `{artifact}` is missing at {paths} and no stage produces it"),
            );
            return Ok(false);
        };

        let mut any_dep_differ = cx.oracle.is_none();
        let mut available: Vec<&str> = Vec::with_capacity(stage.takes.len());
        for take in &stage.takes {
            if !build(graph, cx, &take.name).await? {
                if take.requirement.is_required() {
                    return Err(FlowError::DependencyUnavailable {
                        stage: stage.name.clone(),
                        artifact: take.name.clone(),
                    });
                }
                continue;
            }
            if let (Some(oracle), Some(take_paths)) =
                (cx.oracle.as_deref(), cx.state.dep_paths.get(&take.name))
            {
                any_dep_differ |= take_paths.differs(&stage.name, oracle)?;
            }
            available.push(&take.name);
        }

        if !any_dep_differ && paths.exists() {
            debug!(stage = %stage.name, artifact, "Inputs unchanged, skipping");
            cx.sink.report(
                Severity::Debug,
                &format!(
                    "Skipping rebuild of `{}` because all of its dependencies remained unchanged",
                    stage.name
                ),
            );
            record_input_baselines(cx, &stage.name, &available)?;
            return Ok(true);
        }

        let ctx = cx.module_context(stage);
        cx.sink
            .report(Severity::Info, &format!("Executing stage `{}`", stage.name));
        let timer = StageTimer::start(&stage.name);
        stage
            .module
            .execute(&ctx)
            .instrument(stage_span(&stage.name, stage.module.name(), &cx.run_id))
            .await
            .map_err(|source| FlowError::module(&stage.name, source))?;
        timer.finish();
        cx.state.run_stages.remove(&stage.name);
        cx.state.executed.push(stage.name.clone());

        for product in &stage.produces {
            match cx.state.path(&product.name) {
                Some(produced) if produced.exists() => {
                    if let Some(oracle) = cx.oracle.as_deref_mut() {
                        produced.register(oracle)?;
                    }
                }
                _ if product.requirement.is_required() => {
                    return Err(FlowError::DependencyNotProduced {
                        stage: stage.name.clone(),
                        artifact: product.name.clone(),
                    });
                }
                _ => {}
            }
        }

        // Input baselines only move after a successful run.
        record_input_baselines(cx, &stage.name, &available)?;
        Ok(true)
    }
    .boxed()
}

/// Records the current content of `takes` as seen by `consumer`.
fn record_input_baselines(
    cx: &mut BuildContext,
    consumer: &str,
    takes: &[&str],
) -> Result<(), FlowError> {
    let Some(oracle) = cx.oracle.as_deref_mut() else {
        return Ok(());
    };
    for take in takes {
        if let Some(paths) = cx.state.dep_paths.get(*take) {
            paths.update_status(consumer, oracle)?;
        }
    }
    Ok(())
}
