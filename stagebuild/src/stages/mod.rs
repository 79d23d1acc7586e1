//! Stage descriptors and the module execution contract.
//!
//! A stage is static metadata: the artifacts it takes, the artifacts it
//! produces and the module that turns one into the other.

mod module;

pub use module::{FnModule, ModuleContext, OutputMap, StageModule};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

/// How strongly a stage depends on an artifact.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Requirement {
    /// The artifact must be available.
    #[default]
    #[serde(rename = "req")]
    Required,
    /// The artifact is used when available.
    #[serde(rename = "maybe")]
    Optional,
    /// The artifact is only required when explicitly requested through an
    /// override, otherwise it behaves as optional.
    #[serde(rename = "demand")]
    OnDemand,
}

impl Requirement {
    /// Returns true for [`Requirement::Required`].
    #[must_use]
    pub fn is_required(self) -> bool {
        matches!(self, Self::Required)
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Required => write!(f, "req"),
            Self::Optional => write!(f, "maybe"),
            Self::OnDemand => write!(f, "demand"),
        }
    }
}

/// An artifact name paired with a requirement kind.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencySpec {
    /// The artifact name.
    pub name: String,
    /// The requirement kind.
    #[serde(default)]
    pub requirement: Requirement,
}

impl DependencySpec {
    /// Creates a dependency spec.
    #[must_use]
    pub fn new(name: impl Into<String>, requirement: Requirement) -> Self {
        Self {
            name: name.into(),
            requirement,
        }
    }

    /// Creates a required dependency.
    #[must_use]
    pub fn required(name: impl Into<String>) -> Self {
        Self::new(name, Requirement::Required)
    }

    /// Creates an optional dependency.
    #[must_use]
    pub fn optional(name: impl Into<String>) -> Self {
        Self::new(name, Requirement::Optional)
    }

    /// Creates an on-demand dependency.
    #[must_use]
    pub fn on_demand(name: impl Into<String>) -> Self {
        Self::new(name, Requirement::OnDemand)
    }

    /// Parses the suffix notation used in flow definitions:
    /// `name` is required, `name?` optional and `name!` on-demand.
    #[must_use]
    pub fn parse(spec: &str) -> Self {
        if let Some(name) = spec.strip_suffix('?') {
            Self::optional(name)
        } else if let Some(name) = spec.strip_suffix('!') {
            Self::on_demand(name)
        } else {
            Self::required(spec)
        }
    }
}

impl fmt::Display for DependencySpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.requirement {
            Requirement::Required => write!(f, "{}", self.name),
            Requirement::Optional => write!(f, "{}?", self.name),
            Requirement::OnDemand => write!(f, "{}!", self.name),
        }
    }
}

/// Static description of a stage.
///
/// Identity is the name. Descriptors are immutable once the flow is built;
/// per-run state lives in the flow's bindings instead.
#[derive(Debug, Clone)]
pub struct StageDescriptor {
    /// The unique name of the stage.
    pub name: String,
    /// Input artifacts, in declaration order.
    pub takes: Vec<DependencySpec>,
    /// Output artifacts, in declaration order.
    pub produces: Vec<DependencySpec>,
    /// The module that performs the stage's work.
    pub module: Arc<dyn StageModule>,
}

impl StageDescriptor {
    /// Creates a stage with no inputs or outputs.
    #[must_use]
    pub fn new(name: impl Into<String>, module: Arc<dyn StageModule>) -> Self {
        Self {
            name: name.into(),
            takes: Vec::new(),
            produces: Vec::new(),
            module,
        }
    }

    /// Adds an input.
    #[must_use]
    pub fn take(mut self, spec: DependencySpec) -> Self {
        self.takes.push(spec);
        self
    }

    /// Adds an output.
    #[must_use]
    pub fn produce(mut self, spec: DependencySpec) -> Self {
        self.produces.push(spec);
        self
    }

    /// Adds inputs written in suffix notation.
    #[must_use]
    pub fn with_takes<'a>(mut self, specs: impl IntoIterator<Item = &'a str>) -> Self {
        self.takes.extend(specs.into_iter().map(DependencySpec::parse));
        self
    }

    /// Adds outputs written in suffix notation.
    #[must_use]
    pub fn with_produces<'a>(mut self, specs: impl IntoIterator<Item = &'a str>) -> Self {
        self.produces.extend(specs.into_iter().map(DependencySpec::parse));
        self
    }

    /// Looks up a declared output.
    #[must_use]
    pub fn output(&self, name: &str) -> Option<&DependencySpec> {
        self.produces.iter().find(|spec| spec.name == name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn noop() -> Arc<dyn StageModule> {
        Arc::new(FnModule::new("noop", |_ctx| Ok(OutputMap::new())))
    }

    #[test]
    fn test_parse_suffix_notation() {
        assert_eq!(DependencySpec::parse("eblif"), DependencySpec::required("eblif"));
        assert_eq!(DependencySpec::parse("sdc?"), DependencySpec::optional("sdc"));
        assert_eq!(DependencySpec::parse("bitstream!"), DependencySpec::on_demand("bitstream"));
    }

    #[test]
    fn test_display_round_trips_notation() {
        for spec in ["net", "pcf?", "fasm!"] {
            assert_eq!(DependencySpec::parse(spec).to_string(), spec);
        }
    }

    #[test]
    fn test_requirement_serialize() {
        let json = serde_json::to_string(&Requirement::OnDemand).unwrap();
        assert_eq!(json, r#""demand""#);

        let spec: DependencySpec = serde_json::from_str(r#"{"name": "sdc", "requirement": "maybe"}"#).unwrap();
        assert_eq!(spec, DependencySpec::optional("sdc"));

        let spec: DependencySpec = serde_json::from_str(r#"{"name": "net"}"#).unwrap();
        assert!(spec.requirement.is_required());
    }

    #[test]
    fn test_descriptor_builder() {
        let stage = StageDescriptor::new("pack", noop())
            .with_takes(["eblif", "sdc?"])
            .produce(DependencySpec::required("net"))
            .with_produces(["util_rpt!"]);

        assert_eq!(stage.takes.len(), 2);
        assert_eq!(stage.produces.len(), 2);
        assert_eq!(
            stage.output("util_rpt").map(|s| s.requirement),
            Some(Requirement::OnDemand)
        );
        assert!(stage.output("eblif").is_none());
    }
}
