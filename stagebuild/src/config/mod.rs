//! Flow configuration.
//!
//! A flow configuration carries the toolchain directories, global and
//! per-stage values, and explicit dependency overrides. It is usually loaded
//! from JSON:
//!
//! ```json
//! {
//!   "values": { "top": "counter", "part": "xc7a35t" },
//!   "dependencies": { "sources": ["counter.v"], "xdc": "arty.xdc" },
//!   "stages": { "place": { "values": { "seed": 3 } } }
//! }
//! ```

mod values;

pub use values::expand_values;

use crate::errors::ConfigError;
use crate::paths::PathSet;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Per-stage configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StageConfig {
    /// Values overriding the global ones for this stage.
    #[serde(default)]
    pub values: Map<String, Value>,
}

/// Configuration of a complete flow.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowConfig {
    /// Shared data directory passed to modules.
    #[serde(default = "default_dir")]
    pub share_dir: PathBuf,
    /// Toolchain binary directory passed to modules.
    #[serde(default = "default_dir")]
    pub bin_dir: PathBuf,
    /// Values visible to every stage.
    #[serde(default)]
    pub values: Map<String, Value>,
    /// Explicit artifact locations supplied by the user.
    #[serde(default)]
    pub dependencies: BTreeMap<String, PathSet>,
    /// Per-stage configuration, keyed by stage name.
    #[serde(default)]
    pub stages: BTreeMap<String, StageConfig>,
}

fn default_dir() -> PathBuf {
    PathBuf::from(".")
}

impl Default for FlowConfig {
    fn default() -> Self {
        Self {
            share_dir: default_dir(),
            bin_dir: default_dir(),
            values: Map::new(),
            dependencies: BTreeMap::new(),
            stages: BTreeMap::new(),
        }
    }
}

impl FlowConfig {
    /// Creates an empty configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a configuration from JSON text.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    /// Loads a configuration from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// Sets the shared data directory.
    #[must_use]
    pub fn with_share_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.share_dir = dir.into();
        self
    }

    /// Sets the binary directory.
    #[must_use]
    pub fn with_bin_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.bin_dir = dir.into();
        self
    }

    /// Sets a global value.
    #[must_use]
    pub fn with_value(mut self, key: impl Into<String>, value: Value) -> Self {
        self.values.insert(key.into(), value);
        self
    }

    /// Sets a value for a single stage.
    #[must_use]
    pub fn with_stage_value(
        mut self,
        stage: impl Into<String>,
        key: impl Into<String>,
        value: Value,
    ) -> Self {
        self.stages
            .entry(stage.into())
            .or_default()
            .values
            .insert(key.into(), value);
        self
    }

    /// Sets an explicit dependency location.
    #[must_use]
    pub fn with_dependency(mut self, artifact: impl Into<String>, paths: impl Into<PathSet>) -> Self {
        self.dependencies.insert(artifact.into(), paths.into());
        self
    }

    /// Returns the explicit dependency locations.
    #[must_use]
    pub fn dependency_overrides(&self) -> &BTreeMap<String, PathSet> {
        &self.dependencies
    }

    /// Returns the values a stage runs with: global values overlaid with the
    /// stage's own, with `${name}` references expanded.
    #[must_use]
    pub fn stage_values(&self, stage: &str) -> Map<String, Value> {
        let mut merged = self.values.clone();
        if let Some(stage_config) = self.stages.get(stage) {
            merged.extend(stage_config.values.clone());
        }
        expand_values(&merged)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    const SAMPLE: &str = r#"{
        "bin_dir": "/opt/toolchain/bin",
        "values": { "top": "counter", "part": "xc7a35t", "netlist": "${top}.eblif" },
        "dependencies": { "sources": ["counter.v", "uart.v"], "xdc": "arty.xdc" },
        "stages": { "place": { "values": { "seed": 3, "part": "xc7a100t" } } }
    }"#;

    #[test]
    fn test_parse_sample() {
        let config = FlowConfig::from_json_str(SAMPLE).unwrap();

        assert_eq!(config.bin_dir, PathBuf::from("/opt/toolchain/bin"));
        assert_eq!(config.share_dir, PathBuf::from("."));
        assert_eq!(
            config.dependency_overrides()["sources"],
            PathSet::list(["counter.v", "uart.v"])
        );
        assert_eq!(config.dependency_overrides()["xdc"], PathSet::single("arty.xdc"));
    }

    #[test]
    fn test_stage_values_overlay() {
        let config = FlowConfig::from_json_str(SAMPLE).unwrap();

        let place = config.stage_values("place");
        assert_eq!(place["part"], json!("xc7a100t"));
        assert_eq!(place["seed"], json!(3));
        assert_eq!(place["netlist"], json!("counter.eblif"));

        let synth = config.stage_values("synth");
        assert_eq!(synth["part"], json!("xc7a35t"));
        assert!(synth.get("seed").is_none());
    }

    #[test]
    fn test_invalid_dependency_type_rejected() {
        let err = FlowConfig::from_json_str(r#"{ "dependencies": { "sources": 12 } }"#).unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_missing_file() {
        let err = FlowConfig::from_path("/nonexistent/flow.json").unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }

    #[test]
    fn test_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("flow.json");
        std::fs::write(&path, SAMPLE).unwrap();

        let config = FlowConfig::from_path(&path).unwrap();
        assert_eq!(config.stages.len(), 1);
    }

    #[test]
    fn test_builders() {
        let config = FlowConfig::new()
            .with_value("top", json!("blinky"))
            .with_stage_value("route", "effort", json!("high"))
            .with_dependency("sdc", "top.sdc")
            .with_share_dir("/usr/share/toolchain");

        assert_eq!(config.stage_values("route")["effort"], json!("high"));
        assert_eq!(config.stage_values("route")["top"], json!("blinky"));
        assert_eq!(config.dependencies["sdc"], PathSet::single("top.sdc"));
        assert_eq!(config.share_dir, PathBuf::from("/usr/share/toolchain"));
    }
}
