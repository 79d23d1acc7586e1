//! Content-hash staleness oracle.

use super::{FileStatus, StalenessOracle};
use crate::errors::OracleError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::{BTreeMap, HashMap};
use std::fs::File;
use std::path::{Path, PathBuf};

/// Digest recorded for directories, whose contents are not hashed.
const DIRECTORY_HASH: &str = "0";

const CACHE_FORMAT_VERSION: u32 = 1;

/// A consumer's view of a file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Baseline {
    /// Hex-encoded SHA-256 digest of the file content.
    pub hash: String,
    /// When the baseline was recorded.
    pub recorded_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    version: u32,
    #[serde(default)]
    files: BTreeMap<String, BTreeMap<String, Baseline>>,
}

/// Staleness oracle backed by SHA-256 file digests.
///
/// Baselines are stored per file and per consumer. When opened with a cache
/// path, [`StalenessOracle::flush`] writes them as JSON so the next build
/// starts warm.
#[derive(Debug, Default)]
pub struct ContentHashCache {
    cache_path: Option<PathBuf>,
    baselines: BTreeMap<String, BTreeMap<String, Baseline>>,
    current: HashMap<String, String>,
    dirty: bool,
}

impl ContentHashCache {
    /// Creates a cache that is never persisted.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::default()
    }

    /// Opens the cache stored at `cache_path`.
    ///
    /// A missing, unreadable or incompatible file yields an empty cache.
    #[must_use]
    pub fn open(cache_path: impl Into<PathBuf>) -> Self {
        let cache_path = cache_path.into();
        let baselines = match std::fs::read_to_string(&cache_path) {
            Ok(text) => match serde_json::from_str::<CacheFile>(&text) {
                Ok(file) if file.version == CACHE_FORMAT_VERSION => file.files,
                Ok(file) => {
                    tracing::warn!(
                        path = %cache_path.display(),
                        version = file.version,
                        "Ignoring cache written by an incompatible version"
                    );
                    BTreeMap::new()
                }
                Err(e) => {
                    tracing::warn!(path = %cache_path.display(), error = %e, "Ignoring corrupt cache");
                    BTreeMap::new()
                }
            },
            Err(_) => BTreeMap::new(),
        };

        Self {
            cache_path: Some(cache_path),
            baselines,
            current: HashMap::new(),
            dirty: false,
        }
    }

    /// Returns the cache file location, if persisted.
    #[must_use]
    pub fn cache_path(&self) -> Option<&Path> {
        self.cache_path.as_deref()
    }

    /// Returns the number of files with at least one baseline.
    #[must_use]
    pub fn tracked_files(&self) -> usize {
        self.baselines.len()
    }

    /// Returns the baseline recorded for `consumer`, if any.
    #[must_use]
    pub fn baseline(&self, path: &Path, consumer: &str) -> Option<&Baseline> {
        self.baselines.get(&cache_key(path))?.get(consumer)
    }

    /// Computes the digest of `path`.
    pub fn hash_file(path: &Path) -> Result<String, OracleError> {
        if path.is_dir() {
            return Ok(DIRECTORY_HASH.to_string());
        }
        let hash_err = |source| OracleError::Hash {
            path: path.to_path_buf(),
            source,
        };
        let mut file = File::open(path).map_err(hash_err)?;
        let mut hasher = Sha256::new();
        std::io::copy(&mut file, &mut hasher).map_err(hash_err)?;
        Ok(hex::encode(hasher.finalize()))
    }
}

impl StalenessOracle for ContentHashCache {
    fn register(&mut self, path: &Path) -> Result<(), OracleError> {
        let hash = Self::hash_file(path)?;
        self.current.insert(cache_key(path), hash);
        Ok(())
    }

    fn status(&self, path: &Path, consumer: &str) -> Result<FileStatus, OracleError> {
        let key = cache_key(path);
        let Some(recorded) = self.baselines.get(&key).and_then(|b| b.get(consumer)) else {
            return Ok(FileStatus::Differs);
        };
        let current = match self.current.get(&key) {
            Some(hash) => hash.clone(),
            None if path.exists() => Self::hash_file(path)?,
            None => return Ok(FileStatus::Differs),
        };
        Ok(if current == recorded.hash {
            FileStatus::Same
        } else {
            FileStatus::Differs
        })
    }

    fn record_version(&mut self, path: &Path, consumer: &str) -> Result<bool, OracleError> {
        let key = cache_key(path);
        if !path.exists() {
            self.current.remove(&key);
            if let Some(consumers) = self.baselines.get_mut(&key) {
                self.dirty |= consumers.remove(consumer).is_some();
                if consumers.is_empty() {
                    self.baselines.remove(&key);
                }
            }
            return Ok(true);
        }

        let hash = Self::hash_file(path)?;
        self.current.insert(key.clone(), hash.clone());
        let consumers = self.baselines.entry(key).or_default();
        if consumers.get(consumer).is_some_and(|b| b.hash == hash) {
            return Ok(false);
        }
        consumers.insert(
            consumer.to_string(),
            Baseline {
                hash,
                recorded_at: Utc::now(),
            },
        );
        self.dirty = true;
        Ok(true)
    }

    fn flush(&mut self) -> Result<(), OracleError> {
        let Some(cache_path) = &self.cache_path else {
            return Ok(());
        };
        if !self.dirty {
            return Ok(());
        }

        let persist_err = |source| OracleError::Persist {
            path: cache_path.clone(),
            source,
        };
        if let Some(parent) = cache_path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(persist_err)?;
        }
        let file = CacheFile {
            version: CACHE_FORMAT_VERSION,
            files: self.baselines.clone(),
        };
        let json = serde_json::to_string_pretty(&file)?;
        std::fs::write(cache_path, json).map_err(persist_err)?;

        tracing::debug!(path = %cache_path.display(), files = self.baselines.len(), "Cache flushed");
        self.dirty = false;
        Ok(())
    }
}

fn cache_key(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
