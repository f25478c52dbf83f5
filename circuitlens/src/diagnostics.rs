//! Diagnostics shared by every pipeline stage.
//!
//! Per-component and per-source problems never abort a run. Each stage
//! records them here and the facade concatenates the lists in stage order.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Error,
    Warning,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Error => write!(f, "error"),
            Severity::Warning => write!(f, "warning"),
        }
    }
}

/// Pipeline stage that produced a diagnostic.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Stage {
    Sources,
    Fusion,
    Assembly,
    Description,
    Compilation,
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Stage::Sources => write!(f, "sources"),
            Stage::Fusion => write!(f, "fusion"),
            Stage::Assembly => write!(f, "assembly"),
            Stage::Description => write!(f, "description"),
            Stage::Compilation => write!(f, "compilation"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub stage: Stage,
    /// Short machine-readable code (e.g. "arity-mismatch", "default-value").
    pub code: String,
    /// Index of the offending item in the input of the stage that raised it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub component_index: Option<usize>,
    pub message: String,
}

impl Diagnostic {
    pub fn error(stage: Stage, code: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Error,
            stage,
            code: code.to_string(),
            component_index: None,
            message: message.into(),
        }
    }

    pub fn warning(stage: Stage, code: &str, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            stage,
            code: code.to_string(),
            component_index: None,
            message: message.into(),
        }
    }

    pub fn at(mut self, index: usize) -> Self {
        self.component_index = Some(index);
        self
    }

    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

impl std::fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.component_index {
            Some(idx) => write!(
                f,
                "[{}] {}/{} (#{}): {}",
                self.severity, self.stage, self.code, idx, self.message
            ),
            None => write!(f, "[{}] {}/{}: {}", self.severity, self.stage, self.code, self.message),
        }
    }
}

/// Ordered collection of diagnostics for one stage run.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(transparent)]
pub struct Diagnostics {
    items: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, diagnostic: Diagnostic) {
        tracing::debug!("{}", diagnostic);
        self.items.push(diagnostic);
    }

    pub fn extend(&mut self, other: Diagnostics) {
        self.items.extend(other.items);
    }

    pub fn iter(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn errors(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| d.is_error())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.items.iter().filter(|d| !d.is_error())
    }

    pub fn has_errors(&self) -> bool {
        self.items.iter().any(|d| d.is_error())
    }

    /// Diagnostics tied to a given input index.
    pub fn for_index(&self, index: usize) -> Vec<&Diagnostic> {
        self.items
            .iter()
            .filter(|d| d.component_index == Some(index))
            .collect()
    }

    pub fn as_slice(&self) -> &[Diagnostic] {
        &self.items
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.items
    }
}

impl IntoIterator for Diagnostics {
    type Item = Diagnostic;
    type IntoIter = std::vec::IntoIter<Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.into_iter()
    }
}

impl<'a> IntoIterator for &'a Diagnostics {
    type Item = &'a Diagnostic;
    type IntoIter = std::slice::Iter<'a, Diagnostic>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_filters_by_severity_and_index() {
        let mut diags = Diagnostics::new();
        diags.push(Diagnostic::error(Stage::Compilation, "arity-mismatch", "bad").at(2));
        diags.push(Diagnostic::warning(Stage::Compilation, "default-value", "meh").at(2));
        diags.push(Diagnostic::warning(Stage::Fusion, "component-cap", "dropped"));

        assert_eq!(diags.len(), 3);
        assert_eq!(diags.errors().count(), 1);
        assert_eq!(diags.warnings().count(), 2);
        assert!(diags.has_errors());
        assert_eq!(diags.for_index(2).len(), 2);
    }

    #[test]
    fn test_display_includes_index() {
        let d = Diagnostic::error(Stage::Compilation, "unsupported-type", "no rule").at(4);
        assert_eq!(d.to_string(), "[error] compilation/unsupported-type (#4): no rule");
    }

    #[test]
    fn test_serializes_lowercase() {
        let d = Diagnostic::warning(Stage::Assembly, "floating-component", "R1 floats");
        let json = serde_json::to_value(&d).unwrap();
        assert_eq!(json["severity"], "warning");
        assert_eq!(json["stage"], "assembly");
        assert!(json.get("component_index").is_none());
    }
}
