//! `${name}` reference expansion for configuration values.

use regex::{Captures, Regex};
use serde_json::{Map, Value};
use std::sync::LazyLock;

/// Upper bound on nested reference expansion.
const MAX_EXPANSION_PASSES: usize = 8;

#[allow(clippy::expect_used)]
static REFERENCE_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\$\{([A-Za-z0-9_.:-]+)\}").expect("reference pattern is valid")
});

/// Expands `${name}` references in every string of `values`, looking names
/// up in `values` itself. Unknown references are kept verbatim.
#[must_use]
pub fn expand_values(values: &Map<String, Value>) -> Map<String, Value> {
    let mut current = values.clone();
    for _ in 0..MAX_EXPANSION_PASSES {
        let next: Map<String, Value> = current
            .iter()
            .map(|(key, value)| (key.clone(), expand_value(value, &current)))
            .collect();
        if next == current {
            break;
        }
        current = next;
    }
    current
}

fn expand_value(value: &Value, scope: &Map<String, Value>) -> Value {
    match value {
        Value::String(s) => Value::String(expand_str(s, scope)),
        Value::Array(items) => Value::Array(items.iter().map(|v| expand_value(v, scope)).collect()),
        Value::Object(fields) => Value::Object(
            fields
                .iter()
                .map(|(k, v)| (k.clone(), expand_value(v, scope)))
                .collect(),
        ),
        other => other.clone(),
    }
}

fn expand_str(s: &str, scope: &Map<String, Value>) -> String {
    REFERENCE_PATTERN
        .replace_all(s, |caps: &Captures<'_>| {
            scope
                .get(&caps[1])
                .and_then(render)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
}

fn render(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Array(items) => items
            .iter()
            .map(render)
            .collect::<Option<Vec<_>>>()
            .map(|parts| parts.join(" ")),
        Value::Null | Value::Object(_) => None,
    }
}
