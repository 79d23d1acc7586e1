//! Testing utilities for stagebuild flows.
//!
//! [`WriteModule`] stands in for a real toolchain step: its mapping points
//! outputs into a directory and its execution writes them, recording each
//! run in an [`ExecutionLog`].

mod modules;

pub use modules::{ExecutionLog, WriteModule};
