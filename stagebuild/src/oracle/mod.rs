//! Staleness oracle interface.
//!
//! The orchestrator asks an oracle whether a file changed since a given
//! consumer last observed it. Baselines are kept per (file, consumer) pair,
//! so the same netlist can be fresh for placement and stale for a report.

mod hash_cache;

pub use hash_cache::ContentHashCache;

use crate::errors::OracleError;
use std::fmt;
use std::path::Path;

/// Verdict of a staleness query.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FileStatus {
    /// The file matches the consumer's recorded baseline.
    Same,
    /// The file changed, or no baseline exists for the consumer.
    Differs,
}

impl fmt::Display for FileStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Same => write!(f, "same"),
            Self::Differs => write!(f, "differs"),
        }
    }
}

/// Tracks file contents across builds.
///
/// Implementations only deal with single paths; [`crate::paths::PathSet`]
/// recurses through lists and maps on top of this trait.
#[cfg_attr(test, mockall::automock)]
pub trait StalenessOracle: Send {
    /// Begins tracking `path`, snapshotting its current content.
    fn register(&mut self, path: &Path) -> Result<(), OracleError>;

    /// Compares `path` against the baseline recorded for `consumer`.
    ///
    /// A file without a baseline is reported as [`FileStatus::Differs`].
    fn status(&self, path: &Path, consumer: &str) -> Result<FileStatus, OracleError>;

    /// Records the current content of `path` as the new baseline for
    /// `consumer`. Returns true if it differed from the previous baseline.
    fn record_version(&mut self, path: &Path, consumer: &str) -> Result<bool, OracleError>;

    /// Persists tracked state. The default keeps everything in memory.
    fn flush(&mut self) -> Result<(), OracleError> {
        Ok(())
    }
}
