//! Path-Sets: the on-disk locations backing an artifact.
//!
//! An artifact resolves to a single path, an ordered list, or a name-keyed
//! map. Existence checks, staleness queries and baseline updates all recurse
//! through the same structure.

use crate::errors::OracleError;
use crate::oracle::{FileStatus, StalenessOracle};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};

/// The concrete location(s) of an artifact.
///
/// Deserializes untagged: a JSON string is a single path, an array a list and
/// an object a named map.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PathSet {
    /// One filesystem path.
    Single(PathBuf),
    /// An ordered list of Path-Sets.
    List(Vec<PathSet>),
    /// Path-Sets keyed by name.
    Map(BTreeMap<String, PathSet>),
}

impl PathSet {
    /// Creates a single-path set.
    #[must_use]
    pub fn single(path: impl Into<PathBuf>) -> Self {
        Self::Single(path.into())
    }

    /// Creates a list of single paths.
    #[must_use]
    pub fn list<I, P>(paths: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self::List(paths.into_iter().map(|p| Self::Single(p.into())).collect())
    }

    /// Returns true if the set holds no path at all.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(_) => false,
            Self::List(items) => items.iter().all(Self::is_empty),
            Self::Map(items) => items.values().all(Self::is_empty),
        }
    }

    /// Returns true if every path of the set exists on disk.
    #[must_use]
    pub fn exists(&self) -> bool {
        match self {
            Self::Single(path) => path.exists(),
            Self::List(items) => items.iter().all(Self::exists),
            Self::Map(items) => items.values().all(Self::exists),
        }
    }

    /// Returns every path of the set in order.
    #[must_use]
    pub fn paths(&self) -> Vec<&Path> {
        let mut out = Vec::new();
        self.collect_paths(&mut out);
        out
    }

    fn collect_paths<'a>(&'a self, out: &mut Vec<&'a Path>) {
        match self {
            Self::Single(path) => out.push(path),
            Self::List(items) => items.iter().for_each(|item| item.collect_paths(out)),
            Self::Map(items) => items.values().for_each(|item| item.collect_paths(out)),
        }
    }

    /// Starts tracking every existing path of the set.
    pub fn register(&self, oracle: &mut dyn StalenessOracle) -> Result<(), OracleError> {
        for path in self.paths() {
            if path.exists() {
                oracle.register(path)?;
            }
        }
        Ok(())
    }

    /// Returns true if any path differs from the baseline recorded for
    /// `consumer`. A missing path always differs.
    pub fn differs(&self, consumer: &str, oracle: &dyn StalenessOracle) -> Result<bool, OracleError> {
        for path in self.paths() {
            if !path.exists() || oracle.status(path, consumer)? == FileStatus::Differs {
                return Ok(true);
            }
        }
        Ok(false)
    }

    /// Records the current content of every path as the new baseline for
    /// `consumer`, returning true if any of them changed.
    pub fn update_status(
        &self,
        consumer: &str,
        oracle: &mut dyn StalenessOracle,
    ) -> Result<bool, OracleError> {
        let mut changed = false;
        for path in self.paths() {
            changed |= oracle.record_version(path, consumer)?;
        }
        Ok(changed)
    }
}

impl From<PathBuf> for PathSet {
    fn from(path: PathBuf) -> Self {
        Self::Single(path)
    }
}

impl From<&Path> for PathSet {
    fn from(path: &Path) -> Self {
        Self::Single(path.to_path_buf())
    }
}

impl From<&str> for PathSet {
    fn from(path: &str) -> Self {
        Self::Single(PathBuf::from(path))
    }
}

impl From<Vec<PathBuf>> for PathSet {
    fn from(paths: Vec<PathBuf>) -> Self {
        Self::list(paths)
    }
}

impl fmt::Display for PathSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(path) => write!(f, "{}", path.display()),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(items) => {
                write!(f, "{{")?;
                for (i, (name, item)) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{name}: {item}")?;
                }
                write!(f, "}}")
            }
        }
    }
}
