//! Circuit descriptions from generative describers.
//!
//! A describer answers with JSON such as
//!
//! ```json
//! {"components": [{"type": "resistor", "name": "R1", "value": "10k", "nodes": ["N1", "N2"]}]}
//! ```
//!
//! Records are checked one by one: a record without a type or without nodes
//! is reported and skipped, the rest still become components. Numbers are
//! accepted for values and node names, and `gnd`/`ground` node names map to
//! the reserved ground net.

use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{CircuitComponent, GROUND_NET};
use crate::config::TypeTable;
use crate::diagnostics::{Diagnostic, Diagnostics, Stage};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ComponentRecord {
    #[serde(default, rename = "type", alias = "component_type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub value: Option<Value>,
    #[serde(default)]
    pub nodes: Vec<Value>,
    #[serde(default)]
    pub model: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CircuitDescription {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default)]
    pub components: Vec<ComponentRecord>,
}

/// Components recovered from a description, plus per-record diagnostics.
#[derive(Debug, Clone, Default)]
pub struct DescribedCircuit {
    pub title: Option<String>,
    pub components: Vec<CircuitComponent>,
    pub diagnostics: Diagnostics,
}

impl CircuitDescription {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn load_file(path: &Path) -> Result<Self, crate::core::CircuitLensError> {
        let content = std::fs::read_to_string(path)?;
        Ok(Self::from_json_str(&content)?)
    }

    pub fn into_components(self, types: &TypeTable) -> DescribedCircuit {
        let mut described = DescribedCircuit {
            title: self.title.filter(|t| !t.trim().is_empty()),
            ..Default::default()
        };

        for (index, record) in self.components.into_iter().enumerate() {
            match record_to_component(index, record, types) {
                Ok(component) => described.components.push(component),
                Err(diagnostic) => described.diagnostics.push(diagnostic),
            }
        }

        tracing::debug!(
            "Description yielded {} components ({} records rejected)",
            described.components.len(),
            described.diagnostics.len()
        );
        described
    }
}

fn record_to_component(
    index: usize,
    record: ComponentRecord,
    types: &TypeTable,
) -> Result<CircuitComponent, Diagnostic> {
    let reject = |code: &str, message: String| {
        Diagnostic::error(Stage::Description, code, message).at(index)
    };

    let label = match record.kind.as_deref().map(str::trim) {
        Some(label) if !label.is_empty() => label.to_string(),
        _ => return Err(reject("missing-type", format!("record {} has no type", index))),
    };
    if record.nodes.is_empty() {
        return Err(reject(
            "missing-nodes",
            format!("record {} ({}) has no nodes", index, label),
        ));
    }

    let mut nodes = Vec::with_capacity(record.nodes.len());
    for node in &record.nodes {
        match scalar_text(node) {
            Some(text) if !text.is_empty() => nodes.push(normalize_node(&text)),
            _ => {
                return Err(reject(
                    "invalid-node",
                    format!("record {} ({}) has an invalid node {}", index, label, node),
                ))
            }
        }
    }

    let canonical_type = types.resolve(&label);
    if canonical_type.is_ground() {
        nodes = vec![GROUND_NET.to_string()];
    }

    let name = record
        .name
        .map(|n| n.trim().to_string())
        .filter(|n| !n.is_empty())
        .unwrap_or_else(|| format!("{}{}", canonical_type.designator(), index + 1));

    let mut component = CircuitComponent::new(name, canonical_type, nodes).with_input_index(index);
    component.value = record.value.as_ref().and_then(scalar_text);
    component.model_ref = record.model.filter(|m| !m.trim().is_empty());
    Ok(component)
}

fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

fn normalize_node(node: &str) -> String {
    if node.eq_ignore_ascii_case("gnd") || node.eq_ignore_ascii_case("ground") {
        GROUND_NET.to_string()
    } else {
        node.to_string()
    }
}
