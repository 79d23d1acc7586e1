//! # Stagebuild
//!
//! An incremental build orchestrator for multi-stage toolchain flows.
//!
//! A flow is a set of stages, each consuming named artifacts and producing
//! others. Given a target artifact, stagebuild:
//!
//! - **Plans**: asks every stage on the path to the target where its outputs
//!   would land, without running anything
//! - **Detects staleness**: compares inputs against content baselines kept by
//!   a [`oracle::StalenessOracle`]
//! - **Executes minimally**: runs only stages whose inputs changed or whose
//!   outputs are missing, and stops propagating when a rebuilt output comes
//!   out byte-identical
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use stagebuild::prelude::*;
//!
//! let stages = vec![
//!     StageDescriptor::new("synth", synth_module)
//!         .with_takes(["sources", "xdc?"])
//!         .with_produces(["eblif", "synth_log?"]),
//!     StageDescriptor::new("pack", pack_module)
//!         .with_takes(["eblif"])
//!         .with_produces(["net"]),
//! ];
//!
//! let mut flow = Flow::builder("net")
//!     .stages(stages)
//!     .config(FlowConfig::from_path("flow.json")?)
//!     .oracle(ContentHashCache::open("build/.cache.json"))
//!     .build()?;
//! let net = flow.execute().await?;
//! ```

#![forbid(unsafe_code)]
#![warn(
    clippy::all,
    clippy::pedantic,
    missing_docs,
    rust_2018_idioms
)]
#![allow(
    clippy::module_name_repetitions,
    clippy::must_use_candidate,
    clippy::missing_errors_doc,
    clippy::missing_panics_doc
)]

pub mod config;
pub mod diagnostics;
pub mod errors;
pub mod flow;
pub mod graph;
pub mod observability;
pub mod oracle;
pub mod paths;
pub mod stages;
pub mod testing;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::config::{FlowConfig, StageConfig};
    pub use crate::diagnostics::{
        CollectingReportSink, Diagnostic, NoOpReportSink, ReportSink, Severity,
        TracingReportSink,
    };
    pub use crate::errors::{ConfigError, CycleDetectedError, FlowError, OracleError};
    pub use crate::flow::{
        DependencyReport, DependencyStatus, Flow, FlowBuilder, StageBindings,
        FINAL_TARGET_CONSUMER,
    };
    pub use crate::graph::FlowGraph;
    pub use crate::observability::{init_logging, LogFormat};
    pub use crate::oracle::{ContentHashCache, FileStatus, StalenessOracle};
    pub use crate::paths::PathSet;
    pub use crate::stages::{
        DependencySpec, FnModule, ModuleContext, OutputMap, Requirement, StageDescriptor,
        StageModule,
    };
}
