//! Dry-run planning.
//!
//! Resolution walks the graph depth-first from the target, asks every
//! provider where its outputs would land, and flags the stages whose inputs
//! or outputs are stale. Nothing is executed here.

use super::{BuildContext, StageBindings};
use crate::errors::FlowError;
use crate::graph::FlowGraph;
use crate::paths::PathSet;
use crate::stages::Requirement;
use tracing::debug;

/// Resolves `artifact` and every dependency it needs.
pub(crate) fn resolve(
    graph: &mut FlowGraph,
    cx: &mut BuildContext,
    artifact: &str,
) -> Result<(), FlowError> {
    cx.state
        .deps_rebuilds
        .entry(artifact.to_string())
        .or_insert(0);

    let Some(provider) = graph.provider_id(artifact) else {
        return Ok(());
    };
    // Owned copy: the graph is borrowed mutably below.
    let stage = graph.stage(provider).clone();
    if cx.state.stages_checked.contains(&stage.name) {
        return Ok(());
    }

    debug!(stage = %stage.name, artifact, "Resolving provider");
    let mut bindings = StageBindings::default();

    for take in &stage.takes {
        resolve(graph, cx, &take.name)?;

        let take_paths = cx.state.path(&take.name).cloned();
        bindings
            .takes
            .insert(take.name.clone(), take_paths.clone());

        let Some(take_paths) = take_paths else {
            if take.requirement.is_required() {
                debug!(stage = %stage.name, dependency = %take.name, "Stage is unreachable");
                cx.state.diagnostics.unreachable(&stage.name, &take.name);
                cx.state.bindings.insert(stage.name.clone(), bindings);
                return Ok(());
            }
            continue;
        };

        let will_differ = if take_paths.exists() {
            dep_will_differ(graph, cx, &take.name, &take_paths, &stage.name)?
        } else {
            true
        };
        if will_differ {
            debug!(stage = %stage.name, dependency = %take.name, "Input is stale");
            cx.state.diagnostics.rebuild_cause(&take.name, &stage.name);
            cx.state.schedule(&stage.name);
            cx.state.count_rebuild(&take.name);
        }
    }

    let ctx = cx.module_context(&stage);
    let outputs = stage
        .module
        .map_outputs(&ctx)
        .map_err(|source| FlowError::module(&stage.name, source))?;

    if let Some(oracle) = cx.oracle.as_deref_mut() {
        for paths in outputs.values().filter(|paths| paths.exists()) {
            paths.register(oracle)?;
        }
    }
    cx.state.stages_checked.insert(stage.name.clone());

    for (name, paths) in &outputs {
        if !paths.exists() {
            debug!(stage = %stage.name, output = %name, "Output is missing");
            cx.state.schedule(&stage.name);
        }
        cx.state.dep_paths.insert(name.clone(), paths.clone());
    }

    for output in &stage.produces {
        if let Some(paths) = outputs.get(&output.name) {
            bindings.produces.insert(output.name.clone(), paths.clone());
            continue;
        }
        let requested = output.requirement == Requirement::OnDemand
            && cx.config.dependency_overrides().contains_key(&output.name);
        if output.requirement.is_required() || requested {
            return Err(FlowError::MissingOutputMapping {
                stage: stage.name.clone(),
                artifact: output.name.clone(),
            });
        }
        debug!(stage = %stage.name, output = %output.name, "Releasing unmapped output");
        graph.release_output(&output.name);
    }

    cx.state.bindings.insert(stage.name.clone(), bindings);
    Ok(())
}

/// Returns true if an existing input would look changed to `consumer`.
fn dep_will_differ(
    graph: &FlowGraph,
    cx: &BuildContext,
    artifact: &str,
    paths: &PathSet,
    consumer: &str,
) -> Result<bool, FlowError> {
    let Some(oracle) = cx.oracle.as_deref() else {
        return Ok(true);
    };
    // A scheduled provider will rewrite the file, so the old content says
    // nothing about the rebuild.
    if graph
        .provider(artifact)
        .is_some_and(|stage| cx.state.is_scheduled(&stage.name))
    {
        return Ok(true);
    }
    Ok(paths.differs(consumer, oracle)?)
}
