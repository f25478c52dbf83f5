//! Netlist compiler
//!
//! Maps canonical components to SPICE statements. Compilation is fail-soft:
//! a component with the wrong node count or an unsupported type is reported
//! in the diagnostics and skipped, the rest of the batch still compiles.
//!
//! Output layout:
//!
//! ```text
//! .title <title>
//!
//! <component statements, input order, transformers expanded inline>
//! <generic model block>
//! <analysis directive>
//! .end
//! ```
//!
//! An empty component list compiles to `.title`, the analysis directive and
//! `.end` only.

use std::collections::{BTreeMap, HashSet};
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::diagnostics::{Diagnostic, Diagnostics, Stage};
use crate::graph::{CanonicalType, CircuitComponent, GROUND_NET};
use crate::netlist::analysis::Analysis;
use crate::netlist::value::{parse_value, Unit};

pub const DIODE_MODEL: &str = "DGENERIC";
pub const BJT_MODEL: &str = "QGENERIC";
pub const MOSFET_MODEL: &str = "MGENERIC";

/// Coupling coefficient used for expanded transformers.
pub const TRANSFORMER_COUPLING: &str = "0.999";

pub const DEFAULT_TITLE: &str = "CircuitLens Generated";

/// Plausible magnitude ranges; values outside produce a warning only.
const RESISTOR_RANGE: (f64, f64) = (1.0, 10e6);
const CAPACITOR_RANGE: (f64, f64) = (1e-12, 1e-2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompileOptions {
    pub title: String,
    pub analysis: Analysis,
}

impl Default for CompileOptions {
    fn default() -> Self {
        Self {
            title: DEFAULT_TITLE.to_string(),
            analysis: Analysis::Op,
        }
    }
}

impl CompileOptions {
    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_analysis(mut self, analysis: Analysis) -> Self {
        self.analysis = analysis;
        self
    }
}

/// One line of the finished netlist.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "statement", rename_all = "snake_case")]
pub enum Statement {
    Title { text: String },
    Blank,
    Element {
        name: String,
        nodes: Vec<String>,
        /// Trailing fields: value, `DC <value>`, model name or gain.
        tail: String,
        /// Index of the input component this statement was compiled from.
        component_index: usize,
    },
    /// Inductor coupling; references element names instead of nodes.
    Coupling {
        name: String,
        first: String,
        second: String,
        coefficient: String,
        component_index: usize,
    },
    Model {
        name: String,
        kind: String,
        params: String,
    },
    Analysis { directive: Analysis },
    End,
}

impl Statement {
    pub fn render(&self) -> String {
        match self {
            Statement::Title { text } => format!(".title {}", text),
            Statement::Blank => String::new(),
            Statement::Element {
                name, nodes, tail, ..
            } => {
                let mut line = name.clone();
                for node in nodes {
                    line.push(' ');
                    line.push_str(node);
                }
                if !tail.is_empty() {
                    line.push(' ');
                    line.push_str(tail);
                }
                line
            }
            Statement::Coupling {
                name,
                first,
                second,
                coefficient,
                ..
            } => format!("{} {} {} {}", name, first, second, coefficient),
            Statement::Model { name, kind, params } => {
                format!(".model {} {}({})", name, kind, params)
            }
            Statement::Analysis { directive } => directive.directive(),
            Statement::End => ".end".to_string(),
        }
    }

    /// Index of the input component behind this statement, if any.
    pub fn component_index(&self) -> Option<usize> {
        match self {
            Statement::Element {
                component_index, ..
            }
            | Statement::Coupling {
                component_index, ..
            } => Some(*component_index),
            _ => None,
        }
    }

    pub fn element_name(&self) -> Option<&str> {
        match self {
            Statement::Element { name, .. } | Statement::Coupling { name, .. } => Some(name),
            _ => None,
        }
    }
}

/// What the validator should expect from the compiled text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetlistExpectations {
    /// At least one input component should have produced a statement.
    pub expects_components: bool,
    /// Some non-ground component declared a node bound to the ground net.
    pub ground_referenced: bool,
}

impl Default for NetlistExpectations {
    fn default() -> Self {
        Self {
            expects_components: true,
            ground_referenced: false,
        }
    }
}

impl NetlistExpectations {
    pub fn from_components(components: &[CircuitComponent]) -> Self {
        let relevant = components.iter().filter(|c| !c.canonical_type.is_ground());
        let mut expects_components = false;
        let mut ground_referenced = false;
        for component in relevant {
            expects_components = true;
            ground_referenced |= component.touches_ground();
        }
        Self {
            expects_components,
            ground_referenced,
        }
    }

    /// Expectations for a circuit with no components at all.
    pub fn empty() -> Self {
        Self {
            expects_components: false,
            ground_referenced: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CompiledNetlist {
    pub statements: Vec<Statement>,
    /// Per-prefix naming counters after compilation (`"R" -> 2`, `"K" -> 1`).
    pub counters: BTreeMap<String, usize>,
    pub diagnostics: Diagnostics,
    pub expectations: NetlistExpectations,
}

impl CompiledNetlist {
    /// Netlist text, one statement per line, newline terminated.
    pub fn render(&self) -> String {
        let mut text = String::new();
        for statement in &self.statements {
            text.push_str(&statement.render());
            text.push('\n');
        }
        text
    }

    pub fn element_count(&self) -> usize {
        self.statements
            .iter()
            .filter(|s| s.component_index().is_some())
            .count()
    }

    /// Statements compiled from the input component at `index`.
    pub fn statements_for(&self, index: usize) -> Vec<&Statement> {
        self.statements
            .iter()
            .filter(|s| s.component_index() == Some(index))
            .collect()
    }
}

/// Naming counters and the set of names already taken.
#[derive(Default)]
struct NameBook {
    counters: BTreeMap<String, usize>,
    used: HashSet<String>,
}

impl NameBook {
    /// Reuse `declared` when it carries the prefix and is free, otherwise
    /// synthesize the next free `<prefix><counter>`.
    fn assign(&mut self, prefix: char, declared: Option<&str>) -> String {
        let counter = self.counters.entry(prefix.to_string()).or_insert(0);
        *counter += 1;

        if let Some(name) = declared.filter(|n| is_reusable_name(n, prefix)) {
            if self.used.insert(name.to_ascii_uppercase()) {
                return name.to_string();
            }
        }

        loop {
            let candidate = format!("{}{}", prefix, counter);
            if self.used.insert(candidate.to_ascii_uppercase()) {
                return candidate;
            }
            *counter += 1;
        }
    }
}

/// A declared name is reused only as `<prefix><suffix>`; a bare prefix is not a name.
fn is_reusable_name(name: &str, prefix: char) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.eq_ignore_ascii_case(&prefix) => {}
        _ => return false,
    }
    let suffix = chars.as_str();
    !suffix.is_empty() && suffix.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn is_valid_node(node: &str) -> bool {
    !node.is_empty() && !node.chars().any(|c| c.is_whitespace())
}

fn is_valid_model_name(name: &str) -> bool {
    !name.is_empty() && name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

fn expected_unit(kind: CanonicalType) -> Option<Unit> {
    match kind {
        CanonicalType::Resistor => Some(Unit::Ohm),
        CanonicalType::Capacitor => Some(Unit::Farad),
        CanonicalType::Inductor | CanonicalType::Transformer => Some(Unit::Henry),
        CanonicalType::VoltageSource => Some(Unit::Volt),
        CanonicalType::CurrentSource => Some(Unit::Ampere),
        _ => None,
    }
}

fn plausible_range(kind: CanonicalType) -> Option<(f64, f64)> {
    match kind {
        CanonicalType::Resistor => Some(RESISTOR_RANGE),
        CanonicalType::Capacitor => Some(CAPACITOR_RANGE),
        _ => None,
    }
}

/// Generic model definitions appended to every non-empty netlist.
pub fn generic_models() -> Vec<Statement> {
    vec![
        Statement::Model {
            name: DIODE_MODEL.to_string(),
            kind: "D".to_string(),
            params: "IS=1e-14 N=1".to_string(),
        },
        Statement::Model {
            name: BJT_MODEL.to_string(),
            kind: "NPN".to_string(),
            params: "BF=100".to_string(),
        },
        Statement::Model {
            name: MOSFET_MODEL.to_string(),
            kind: "NMOS".to_string(),
            params: "VTO=1 KP=2e-5".to_string(),
        },
    ]
}

pub struct NetlistCompiler {
    config: Arc<PipelineConfig>,
}

impl NetlistCompiler {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    pub fn compile(
        &self,
        components: &[CircuitComponent],
        options: &CompileOptions,
    ) -> CompiledNetlist {
        let mut diagnostics = Diagnostics::new();
        let mut names = NameBook::default();
        let mut body = Vec::new();

        for (index, component) in components.iter().enumerate() {
            self.compile_one(index, component, &mut names, &mut body, &mut diagnostics);
        }

        let title = options.title.replace(['\r', '\n'], " ");
        let mut statements = vec![Statement::Title { text: title }];
        if !components.is_empty() {
            statements.push(Statement::Blank);
            statements.extend(body);
            statements.extend(generic_models());
        }
        statements.push(Statement::Analysis {
            directive: options.analysis.clone(),
        });
        statements.push(Statement::End);

        tracing::debug!(
            "Compiled {} components into {} statements ({} diagnostics)",
            components.len(),
            statements.len(),
            diagnostics.len()
        );

        CompiledNetlist {
            statements,
            counters: names.counters,
            diagnostics,
            expectations: NetlistExpectations::from_components(components),
        }
    }

    fn compile_one(
        &self,
        index: usize,
        component: &CircuitComponent,
        names: &mut NameBook,
        out: &mut Vec<Statement>,
        diagnostics: &mut Diagnostics,
    ) {
        let kind = component.canonical_type;
        let reported = component.input_index.unwrap_or(index);

        if matches!(kind, CanonicalType::Unknown | CanonicalType::Wire) {
            diagnostics.push(
                Diagnostic::error(
                    Stage::Compilation,
                    "unsupported-type",
                    format!(
                        "{} ({}) has no compilation rule; skipped",
                        component.name, kind
                    ),
                )
                .at(reported),
            );
            return;
        }

        let arity = kind.arity();
        if !arity.accepts(component.nodes.len()) {
            diagnostics.push(
                Diagnostic::error(
                    Stage::Compilation,
                    "arity-mismatch",
                    format!(
                        "{} ({}) has {} nodes, expected {}; skipped",
                        component.name,
                        kind,
                        component.nodes.len(),
                        arity
                    ),
                )
                .at(reported),
            );
            return;
        }

        if let Some(bad) = component.nodes.iter().find(|n| !is_valid_node(n)) {
            diagnostics.push(
                Diagnostic::error(
                    Stage::Compilation,
                    "invalid-node",
                    format!("{} has an invalid node identifier {:?}; skipped", component.name, bad),
                )
                .at(reported),
            );
            return;
        }

        let declared = Some(component.name.as_str());
        let nodes = component.nodes.clone();

        match kind {
            CanonicalType::Ground => {}
            CanonicalType::Resistor | CanonicalType::Capacitor | CanonicalType::Inductor => {
                let value = self.normalized_value(reported, component, diagnostics);
                out.push(Statement::Element {
                    name: names.assign(kind_prefix(kind), declared),
                    nodes,
                    tail: value,
                    component_index: index,
                });
            }
            CanonicalType::VoltageSource | CanonicalType::CurrentSource => {
                let value = self.normalized_value(reported, component, diagnostics);
                out.push(Statement::Element {
                    name: names.assign(kind_prefix(kind), declared),
                    nodes,
                    tail: format!("DC {}", value),
                    component_index: index,
                });
            }
            CanonicalType::Diode | CanonicalType::Bjt | CanonicalType::Mosfet => {
                let model = self.model_for(reported, component, diagnostics);
                let nodes = if kind == CanonicalType::Mosfet && nodes.len() == 3 {
                    // bulk tied to source
                    let mut full = nodes;
                    full.push(full[2].clone());
                    full
                } else {
                    nodes
                };
                out.push(Statement::Element {
                    name: names.assign(kind_prefix(kind), declared),
                    nodes,
                    tail: model,
                    component_index: index,
                });
            }
            CanonicalType::LogicGate => {
                // last node drives the output, the first input controls it
                let (output, inputs) = match nodes.split_last() {
                    Some((output, inputs)) => (output.clone(), inputs),
                    None => return,
                };
                out.push(Statement::Element {
                    name: names.assign(kind_prefix(kind), declared),
                    nodes: vec![
                        output,
                        GROUND_NET.to_string(),
                        inputs[0].clone(),
                        GROUND_NET.to_string(),
                    ],
                    tail: "1".to_string(),
                    component_index: index,
                });
                let message = if inputs.len() > 1 {
                    format!(
                        "{} (logic_gate) compiled as a unity-gain voltage-controlled source following {}; inputs {} are ignored",
                        component.name,
                        inputs[0],
                        inputs[1..].join(", ")
                    )
                } else {
                    format!(
                        "{} (logic_gate) compiled as a unity-gain voltage-controlled source",
                        component.name
                    )
                };
                diagnostics.push(
                    Diagnostic::warning(Stage::Compilation, "behavioral-stand-in", message)
                        .at(reported),
                );
            }
            CanonicalType::Transformer => {
                let value = self.normalized_value(reported, component, diagnostics);
                let primary = names.assign('L', None);
                let secondary = names.assign('L', None);
                let coupling = names.assign('K', None);
                out.push(Statement::Element {
                    name: primary.clone(),
                    nodes: vec![nodes[0].clone(), nodes[1].clone()],
                    tail: value.clone(),
                    component_index: index,
                });
                out.push(Statement::Element {
                    name: secondary.clone(),
                    nodes: vec![nodes[2].clone(), nodes[3].clone()],
                    tail: value,
                    component_index: index,
                });
                out.push(Statement::Coupling {
                    name: coupling,
                    first: primary,
                    second: secondary,
                    coefficient: TRANSFORMER_COUPLING.to_string(),
                    component_index: index,
                });
            }
            CanonicalType::Unknown | CanonicalType::Wire => {}
        }
    }

    /// Normalized SPICE value text, or the configured default with a warning.
    fn normalized_value(
        &self,
        index: usize,
        component: &CircuitComponent,
        diagnostics: &mut Diagnostics,
    ) -> String {
        let kind = component.canonical_type;
        let fallback = self
            .config
            .defaults()
            .value_for(kind)
            .and_then(|d| parse_value(d).spice_text())
            .unwrap_or_else(|| "1".to_string());

        let raw = component.value.as_deref().unwrap_or("");
        let parsed = parse_value(raw);
        let Some(text) = parsed.spice_text() else {
            let message = if raw.trim().is_empty() {
                format!("{} has no value; using default {}", component.name, fallback)
            } else {
                format!(
                    "{} value {:?} could not be parsed; using default {}",
                    component.name, raw, fallback
                )
            };
            diagnostics.push(Diagnostic::warning(Stage::Compilation, "default-value", message).at(index));
            return fallback;
        };

        if let (Some(found), Some(expected)) = (parsed.unit(), expected_unit(kind)) {
            if found != expected {
                diagnostics.push(
                    Diagnostic::warning(
                        Stage::Compilation,
                        "unit-mismatch",
                        format!(
                            "{} value {:?} carries a {:?} unit, expected {:?}",
                            component.name, raw, found, expected
                        ),
                    )
                    .at(index),
                );
            }
        }

        if let (Some(magnitude), Some((low, high))) = (parsed.magnitude(), plausible_range(kind)) {
            if magnitude < low || magnitude > high {
                diagnostics.push(
                    Diagnostic::warning(
                        Stage::Compilation,
                        "unusual-value",
                        format!(
                            "{} {} value {} is outside the usual range {:e}..{:e}",
                            component.name, kind, text, low, high
                        ),
                    )
                    .at(index),
                );
            }
        }

        text
    }

    /// Model name for a semiconductor: the declared model, else the generic one.
    fn model_for(
        &self,
        index: usize,
        component: &CircuitComponent,
        diagnostics: &mut Diagnostics,
    ) -> String {
        let generic = match component.canonical_type {
            CanonicalType::Bjt => BJT_MODEL,
            CanonicalType::Mosfet => MOSFET_MODEL,
            _ => DIODE_MODEL,
        };

        match component.model_ref.as_deref().map(str::trim) {
            Some(model) if is_valid_model_name(model) => model.to_string(),
            Some(model) => {
                diagnostics.push(
                    Diagnostic::warning(
                        Stage::Compilation,
                        "default-model",
                        format!(
                            "{} model {:?} is not a valid model name; using {}",
                            component.name, model, generic
                        ),
                    )
                    .at(index),
                );
                generic.to_string()
            }
            None => generic.to_string(),
        }
    }
}

fn kind_prefix(kind: CanonicalType) -> char {
    kind.prefix().unwrap_or('X')
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::Severity;
    use crate::graph::taxonomy::MAX_GATE_INPUTS;

    fn compiler() -> NetlistCompiler {
        NetlistCompiler::new(Arc::new(PipelineConfig::default()))
    }

    fn comp(kind: CanonicalType, name: &str, nodes: &[&str], value: Option<&str>) -> CircuitComponent {
        let mut c = CircuitComponent::new(name, kind, nodes.iter().map(|n| n.to_string()).collect());
        c.value = value.map(str::to_string);
        c
    }

    #[test]
    fn test_voltage_divider() {
        let components = vec![
            comp(CanonicalType::VoltageSource, "V1", &["N1", "0"], Some("5V")),
            comp(CanonicalType::Resistor, "R1", &["N1", "N2"], Some("10k")),
            comp(CanonicalType::Resistor, "R2", &["N2", "0"], Some("10k")),
        ];
        let compiled = compiler().compile(&components, &CompileOptions::default());
        let text = compiled.render();

        assert!(text.starts_with(".title CircuitLens Generated\n\n"));
        assert!(text.contains("V1 N1 0 DC 5\n"));
        assert!(text.contains("R1 N1 N2 10k\n"));
        assert!(text.contains("R2 N2 0 10k\n"));
        assert!(text.contains(".model DGENERIC D(IS=1e-14 N=1)\n"));
        assert!(text.ends_with(".op\n.end\n"));
        assert!(compiled.diagnostics.is_empty());
        assert_eq!(compiled.counters.get("R"), Some(&2));
    }

    #[test]
    fn test_empty_input_is_minimal() {
        let compiled = compiler().compile(&[], &CompileOptions::default());
        assert_eq!(compiled.render(), ".title CircuitLens Generated\n.op\n.end\n");
        assert!(!compiled.expectations.expects_components);
    }

    #[test]
    fn test_name_synthesis_and_reuse() {
        let components = vec![
            comp(CanonicalType::Resistor, "load", &["A", "B"], Some("1k")),
            comp(CanonicalType::Resistor, "R1", &["B", "C"], Some("1k")),
            comp(CanonicalType::Capacitor, "R9", &["C", "0"], Some("1u")),
            comp(CanonicalType::Resistor, "r1", &["C", "D"], Some("1k")),
        ];
        let compiled = compiler().compile(&components, &CompileOptions::default());
        let names: Vec<&str> = compiled
            .statements
            .iter()
            .filter_map(|s| s.element_name())
            .collect();
        // "load" lacks the prefix, "R9" has the wrong one, "r1" collides with R1.
        assert_eq!(names, vec!["R1", "R2", "C1", "R3"]);
    }

    #[test]
    fn test_declared_name_conflicting_with_synthesized() {
        let components = vec![
            comp(CanonicalType::Resistor, "", &["A", "B"], Some("1k")),
            comp(CanonicalType::Resistor, "R1", &["B", "0"], Some("1k")),
        ];
        let compiled = compiler().compile(&components, &CompileOptions::default());
        let names: Vec<&str> = compiled
            .statements
            .iter()
            .filter_map(|s| s.element_name())
            .collect();
        assert_eq!(names, vec!["R1", "R2"]);
    }

    #[test]
    fn test_arity_mismatch_skips_and_continues() {
        let components = vec![
            comp(CanonicalType::Resistor, "R1", &["A"], Some("1k")),
            comp(CanonicalType::Capacitor, "C1", &["A", "0"], Some("1u")),
        ];
        let compiled = compiler().compile(&components, &CompileOptions::default());
        assert_eq!(compiled.element_count(), 1);
        let errors: Vec<_> = compiled.diagnostics.errors().collect();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors[0].code, "arity-mismatch");
        assert_eq!(errors[0].component_index, Some(0));
    }

    #[test]
    fn test_sources_and_semiconductors() {
        let components = vec![
            comp(CanonicalType::CurrentSource, "I1", &["A", "0"], None),
            comp(CanonicalType::Diode, "D1", &["A", "B"], None),
            comp(CanonicalType::Bjt, "Q1", &["C", "B", "E"], None),
            comp(CanonicalType::Mosfet, "M1", &["D", "G", "S"], None),
            comp(CanonicalType::Diode, "D2", &["B", "0"], None).with_model("1N4148"),
        ];
        let text = compiler()
            .compile(&components, &CompileOptions::default())
            .render();
        assert!(text.contains("I1 A 0 DC 1m\n"));
        assert!(text.contains("D1 A B DGENERIC\n"));
        assert!(text.contains("Q1 C B E QGENERIC\n"));
        assert!(text.contains("M1 D G S S MGENERIC\n"));
        assert!(text.contains("D2 B 0 1N4148\n"));
    }

    #[test]
    fn test_logic_gate_behavioral() {
        let components = vec![comp(CanonicalType::LogicGate, "U1", &["IN", "OUT"], None)];
        let compiled = compiler().compile(&components, &CompileOptions::default());
        assert!(compiled.render().contains("E1 OUT 0 IN 0 1\n"));
        let warnings: Vec<_> = compiled.diagnostics.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].code, "behavioral-stand-in");
    }

    #[test]
    fn test_multi_input_gate_follows_first_input() {
        let components = vec![comp(CanonicalType::LogicGate, "U1", &["A", "B", "Y"], None)];
        let compiled = compiler().compile(&components, &CompileOptions::default());
        assert!(compiled.render().contains("E1 Y 0 A 0 1
"));
        assert!(!compiled.diagnostics.has_errors());
        let warnings: Vec<_> = compiled.diagnostics.warnings().collect();
        assert_eq!(warnings.len(), 1);
        assert!(warnings[0].message.contains("inputs B are ignored"));

        let wide: Vec<&str> = vec!["I"; MAX_GATE_INPUTS + 2];
        let compiled = compiler().compile(
            &[comp(CanonicalType::LogicGate, "U2", &wide, None)],
            &CompileOptions::default(),
        );
        assert_eq!(compiled.element_count(), 0);
        assert_eq!(compiled.diagnostics.errors().next().unwrap().code, "arity-mismatch");
    }

    #[test]
    fn test_bare_prefix_is_not_reused() {
        let components = vec![
            comp(CanonicalType::Resistor, "R", &["A", "B"], Some("1k")),
            comp(CanonicalType::Capacitor, "c", &["B", "0"], Some("1u")),
        ];
        let compiled = compiler().compile(&components, &CompileOptions::default());
        let names: Vec<&str> = compiled
            .statements
            .iter()
            .filter_map(|s| s.element_name())
            .collect();
        assert_eq!(names, vec!["R1", "C1"]);
    }

    #[test]
    fn test_diagnostics_reference_input_index() {
        let components = vec![
            comp(CanonicalType::Unknown, "X2", &["A", "B"], None).with_input_index(1),
            comp(CanonicalType::Resistor, "R4", &["A", "0"], Some("banana")).with_input_index(3),
        ];
        let compiled = compiler().compile(&components, &CompileOptions::default());
        let found: Vec<(&str, Option<usize>)> = compiled
            .diagnostics
            .iter()
            .map(|d| (d.code.as_str(), d.component_index))
            .collect();
        assert_eq!(found, vec![("unsupported-type", Some(1)), ("default-value", Some(3))]);
        // statements still index the component list
        assert_eq!(compiled.statements_for(1).len(), 1);
    }

    #[test]
    fn test_unit_and_range_warnings() {
        let components = vec![
            comp(CanonicalType::Resistor, "R1", &["A", "B"], Some("10uF")),
            comp(CanonicalType::Capacitor, "C1", &["B", "0"], Some("1k")),
        ];
        let compiled = compiler().compile(&components, &CompileOptions::default());
        let codes: Vec<&str> = compiled.diagnostics.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["unit-mismatch", "unusual-value", "unusual-value"]);
        assert!(compiled
            .diagnostics
            .iter()
            .all(|d| d.severity == Severity::Warning));
    }

    #[test]
    fn test_ground_emits_nothing() {
        let components = vec![
            comp(CanonicalType::Resistor, "R1", &["N1", "N2"], Some("1k")),
            comp(CanonicalType::Ground, "GND1", &["0"], None),
        ];
        let compiled = compiler().compile(&components, &CompileOptions::default());
        assert_eq!(compiled.element_count(), 1);
        assert!(compiled.diagnostics.is_empty());
        assert!(!compiled.expectations.ground_referenced);
    }

    #[test]
    fn test_custom_title_and_analysis() {
        let options = CompileOptions::default()
            .with_title("amp\nstage")
            .with_analysis(Analysis::Tran {
                step: "1u".into(),
                stop: "1m".into(),
            });
        let components = vec![comp(CanonicalType::Resistor, "R1", &["A", "0"], Some("1k"))];
        let text = compiler().compile(&components, &options).render();
        assert!(text.starts_with(".title amp stage\n"));
        assert!(text.ends_with(".tran 1u 1m\n.end\n"));
    }
}
