//! Circuit Graph
//!
//! Bipartite petgraph view of a component list: component nodes and net
//! nodes, with one edge per terminal. Used for net membership queries and
//! for spotting nets that only one terminal connects to.

use std::collections::HashMap;

use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;
use petgraph::Direction;
use serde::{Deserialize, Serialize};

use super::{CanonicalType, CircuitComponent, GROUND_NET};

/// Node type in the circuit graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum CircuitNode {
    Component(CircuitComponent),
    Net(String),
}

impl CircuitNode {
    pub fn as_component(&self) -> Option<&CircuitComponent> {
        match self {
            CircuitNode::Component(c) => Some(c),
            _ => None,
        }
    }

    pub fn as_net(&self) -> Option<&str> {
        match self {
            CircuitNode::Net(n) => Some(n),
            _ => None,
        }
    }
}

/// Edge from a component to a net: the terminal position on the component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalEdge {
    pub terminal: usize,
}

#[derive(Debug, Clone, Default)]
pub struct CircuitGraph {
    graph: DiGraph<CircuitNode, TerminalEdge>,
    component_indices: HashMap<String, NodeIndex>,
    net_indices: HashMap<String, NodeIndex>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitStats {
    pub component_count: usize,
    pub net_count: usize,
    pub connection_count: usize,
    pub dangling_net_count: usize,
    pub grounded: bool,
    pub pattern: CircuitPattern,
}

/// Coarse circuit family guessed from the component mix.
///
/// A tag for summaries only; nets are not inspected.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitPattern {
    VoltageDivider,
    RcFilter,
    Amplifier,
    DigitalLogic,
    Unknown,
}

impl CircuitPattern {
    /// Sources, ground and wires are ignored; the remaining parts decide.
    pub fn classify<'a>(components: impl IntoIterator<Item = &'a CircuitComponent>) -> Self {
        let mut counts: HashMap<CanonicalType, usize> = HashMap::new();
        for component in components {
            match component.canonical_type {
                CanonicalType::VoltageSource
                | CanonicalType::CurrentSource
                | CanonicalType::Ground
                | CanonicalType::Wire => {}
                kind => *counts.entry(kind).or_insert(0) += 1,
            }
        }
        let count = |kind: CanonicalType| counts.get(&kind).copied().unwrap_or(0);
        let parts: usize = counts.values().sum();

        if parts == 2 && count(CanonicalType::Resistor) == 2 {
            CircuitPattern::VoltageDivider
        } else if count(CanonicalType::Resistor) > 0 && count(CanonicalType::Capacitor) > 0 {
            CircuitPattern::RcFilter
        } else if count(CanonicalType::Bjt) + count(CanonicalType::Mosfet) > 0 {
            CircuitPattern::Amplifier
        } else if count(CanonicalType::LogicGate) > 0 {
            CircuitPattern::DigitalLogic
        } else {
            CircuitPattern::Unknown
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CircuitPattern::VoltageDivider => "voltage_divider",
            CircuitPattern::RcFilter => "rc_filter",
            CircuitPattern::Amplifier => "amplifier",
            CircuitPattern::DigitalLogic => "digital_logic",
            CircuitPattern::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for CircuitPattern {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl CircuitGraph {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_components(components: &[CircuitComponent]) -> Self {
        let mut circuit = Self::new();
        for component in components {
            circuit.add_component(component.clone());
        }
        circuit
    }

    /// Add a component and connect it to its nets, creating nets on demand.
    /// A second component with an already used name is ignored.
    pub fn add_component(&mut self, component: CircuitComponent) -> Option<NodeIndex> {
        if self.component_indices.contains_key(&component.name) {
            tracing::debug!("Duplicate component {} left out of the graph", component.name);
            return None;
        }
        let name = component.name.clone();
        let nodes = component.nodes.clone();
        let comp_idx = self.graph.add_node(CircuitNode::Component(component));
        self.component_indices.insert(name, comp_idx);

        for (terminal, net) in nodes.iter().enumerate() {
            let net_idx = self.net_index(net);
            self.graph.add_edge(comp_idx, net_idx, TerminalEdge { terminal });
        }
        Some(comp_idx)
    }

    fn net_index(&mut self, net: &str) -> NodeIndex {
        if let Some(&idx) = self.net_indices.get(net) {
            return idx;
        }
        let idx = self.graph.add_node(CircuitNode::Net(net.to_string()));
        self.net_indices.insert(net.to_string(), idx);
        idx
    }

    pub fn get_component(&self, name: &str) -> Option<&CircuitComponent> {
        self.component_indices
            .get(name)
            .and_then(|&idx| self.graph.node_weight(idx))
            .and_then(|n| n.as_component())
    }

    pub fn components(&self) -> impl Iterator<Item = &CircuitComponent> {
        self.graph.node_weights().filter_map(|n| n.as_component())
    }

    pub fn nets(&self) -> impl Iterator<Item = &str> {
        self.graph.node_weights().filter_map(|n| n.as_net())
    }

    /// Nets of a component in terminal order.
    pub fn nets_for_component(&self, name: &str) -> Vec<&str> {
        let Some(&comp_idx) = self.component_indices.get(name) else {
            return Vec::new();
        };

        let mut edges: Vec<_> = self
            .graph
            .edges_directed(comp_idx, Direction::Outgoing)
            .collect();
        edges.sort_by_key(|e| e.weight().terminal);
        edges
            .into_iter()
            .filter_map(|e| self.graph.node_weight(e.target()).and_then(|n| n.as_net()))
            .collect()
    }

    /// Components with at least one terminal on `net`, in insertion order.
    pub fn components_on_net(&self, net: &str) -> Vec<&CircuitComponent> {
        let Some(&net_idx) = self.net_indices.get(net) else {
            return Vec::new();
        };

        let mut sources: Vec<NodeIndex> = self
            .graph
            .edges_directed(net_idx, Direction::Incoming)
            .map(|e| e.source())
            .collect();
        sources.sort();
        sources.dedup();
        sources
            .into_iter()
            .filter_map(|idx| self.graph.node_weight(idx).and_then(|n| n.as_component()))
            .collect()
    }

    /// Non-ground nets reached by exactly one terminal.
    pub fn dangling_nets(&self) -> Vec<&str> {
        let mut dangling: Vec<&str> = self
            .net_indices
            .iter()
            .filter(|&(name, idx)| {
                name != GROUND_NET
                    && self.graph.edges_directed(*idx, Direction::Incoming).count() == 1
            })
            .map(|(name, _)| name.as_str())
            .collect();
        dangling.sort_unstable();
        dangling
    }

    /// Shortest component/net path between two components, nets in brackets.
    pub fn find_path(&self, from: &str, to: &str) -> Option<Vec<String>> {
        use petgraph::algo::astar;

        let from_idx = *self.component_indices.get(from)?;
        let to_idx = *self.component_indices.get(to)?;

        // walk edges in both directions
        let undirected = self.graph.clone().into_edge_type::<petgraph::Undirected>();
        let (_, path) = astar(&undirected, from_idx, |n| n == to_idx, |_| 1, |_| 0)?;

        Some(
            path.into_iter()
                .filter_map(|idx| match self.graph.node_weight(idx) {
                    Some(CircuitNode::Component(c)) => Some(c.name.clone()),
                    Some(CircuitNode::Net(n)) => Some(format!("[{}]", n)),
                    None => None,
                })
                .collect(),
        )
    }

    pub fn stats(&self) -> CircuitStats {
        CircuitStats {
            component_count: self.component_indices.len(),
            net_count: self.net_indices.len(),
            connection_count: self.graph.edge_count(),
            dangling_net_count: self.dangling_nets().len(),
            grounded: self.net_indices.contains_key(GROUND_NET),
            pattern: CircuitPattern::classify(self.components()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn divider() -> CircuitGraph {
        CircuitGraph::from_components(&[
            CircuitComponent::new("V1", CanonicalType::VoltageSource, vec!["N1".into(), "0".into()]),
            CircuitComponent::new("R1", CanonicalType::Resistor, vec!["N1".into(), "N2".into()]),
            CircuitComponent::new("R2", CanonicalType::Resistor, vec!["N2".into(), "0".into()]),
        ])
    }

    #[test]
    fn test_net_membership() {
        let circuit = divider();
        assert_eq!(circuit.nets_for_component("R1"), vec!["N1", "N2"]);
        assert_eq!(circuit.nets_for_component("missing"), Vec::<&str>::new());

        let on_n2: Vec<&str> = circuit
            .components_on_net("N2")
            .iter()
            .map(|c| c.name.as_str())
            .collect();
        assert_eq!(on_n2, vec!["R1", "R2"]);
    }

    #[test]
    fn test_stats_and_dangling() {
        let circuit = divider();
        let stats = circuit.stats();
        assert_eq!(stats.component_count, 3);
        assert_eq!(stats.net_count, 3);
        assert_eq!(stats.connection_count, 6);
        assert_eq!(stats.dangling_net_count, 0);
        assert!(stats.grounded);

        let chain = CircuitGraph::from_components(&[
            CircuitComponent::new("R1", CanonicalType::Resistor, vec!["N1".into(), "N2".into()]),
            CircuitComponent::new("C1", CanonicalType::Capacitor, vec!["N2".into(), "N3".into()]),
        ]);
        assert_eq!(chain.dangling_nets(), vec!["N1", "N3"]);
        assert!(!chain.stats().grounded);
    }

    #[test]
    fn test_pattern_tags() {
        assert_eq!(divider().stats().pattern, CircuitPattern::VoltageDivider);

        let part = |name: &str, kind| CircuitComponent::new(name, kind, vec!["A".into(), "B".into()]);
        let rc = [part("R1", CanonicalType::Resistor), part("C1", CanonicalType::Capacitor)];
        assert_eq!(CircuitPattern::classify(&rc), CircuitPattern::RcFilter);

        let amp = [
            part("R1", CanonicalType::Resistor),
            CircuitComponent::new("Q1", CanonicalType::Bjt, vec!["C".into(), "B".into(), "E".into()]),
        ];
        assert_eq!(CircuitPattern::classify(&amp), CircuitPattern::Amplifier);
        assert_eq!(
            CircuitPattern::classify(&[part("E1", CanonicalType::LogicGate)]),
            CircuitPattern::DigitalLogic
        );
        assert_eq!(CircuitPattern::classify(&[]), CircuitPattern::Unknown);
        assert_eq!(
            serde_json::to_value(CircuitPattern::RcFilter).unwrap(),
            serde_json::json!("rc_filter")
        );
    }

    #[test]
    fn test_find_path() {
        let circuit = divider();
        let path = circuit.find_path("V1", "R2").unwrap();
        assert_eq!(path.len(), 3);
        assert_eq!(path[0], "V1");
        assert_eq!(path[2], "R2");
        assert_eq!(path[1], "[0]");
    }

    #[test]
    fn test_duplicate_names_are_ignored() {
        let mut circuit = divider();
        let dup = CircuitComponent::new("R1", CanonicalType::Resistor, vec!["X".into(), "Y".into()]);
        assert!(circuit.add_component(dup).is_none());
        assert_eq!(circuit.stats().component_count, 3);
    }
}
