//! Circuit graph assembly
//!
//! Turns fused detections into compilable components. Detection sources
//! cannot tell which wire ends at which terminal, so nets are synthesized
//! from a counter (see [`TopologyMode`]). This does not reconstruct real
//! topology beyond trivial layouts, and [`Assembly::topology_inferred`] is
//! always `false` to say so.
//!
//! Wires are still used for one check: a component with fewer touching
//! wires than terminals is reported as floating.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::{nets_from_components, CanonicalType, CircuitComponent, Net, GROUND_NET};
use crate::config::{PipelineConfig, TopologyMode};
use crate::detection::{BoundingBox, WireSegment};
use crate::diagnostics::{Diagnostic, Diagnostics, Stage};
use crate::fusion::FusedComponent;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Assembly {
    pub components: Vec<CircuitComponent>,
    pub nets: Vec<Net>,
    pub diagnostics: Diagnostics,
    pub topology: TopologyMode,
    /// Whether nets reflect detected wiring. Synthesized nets never do.
    pub topology_inferred: bool,
}

pub struct CircuitGraphAssembler {
    config: Arc<PipelineConfig>,
}

impl CircuitGraphAssembler {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    pub fn assemble(&self, fused: &[FusedComponent], wires: &[WireSegment]) -> Assembly {
        let mut diagnostics = Diagnostics::new();
        let mut all_wires: Vec<WireSegment> = wires.to_vec();
        let mut parts: Vec<(usize, &FusedComponent)> = Vec::new();

        for (index, component) in fused.iter().enumerate() {
            if component.canonical_type != CanonicalType::Wire {
                parts.push((index, component));
                continue;
            }
            match WireSegment::from_bbox_diagonal(&component.bbox, component.confidence) {
                Ok(segment) => {
                    all_wires.push(segment);
                    diagnostics.push(
                        Diagnostic::warning(
                            Stage::Assembly,
                            "wire-detection",
                            format!(
                                "{} ({:?}) is a connection, used as a wire segment",
                                component.id, component.label
                            ),
                        )
                        .at(index),
                    );
                }
                Err(e) => diagnostics.push(
                    Diagnostic::warning(
                        Stage::Assembly,
                        "wire-detection",
                        format!("{} could not be used as a wire: {}", component.id, e),
                    )
                    .at(index),
                ),
            }
        }

        let mut designators: BTreeMap<&'static str, usize> = BTreeMap::new();
        let mut cursor = 1usize;
        let mut components = Vec::with_capacity(parts.len());

        for (index, part) in parts {
            let kind = part.canonical_type;
            if kind == CanonicalType::Unknown {
                diagnostics.push(
                    Diagnostic::warning(
                        Stage::Assembly,
                        "unknown-type",
                        format!("{} label {:?} is not a known component type", part.id, part.label),
                    )
                    .at(index),
                );
            }

            let counter = designators.entry(kind.designator()).or_insert(0);
            *counter += 1;
            let name = format!("{}{}", kind.designator(), counter);

            let terminals = kind.terminal_count();
            let nodes = if kind.is_ground() {
                vec![GROUND_NET.to_string()]
            } else {
                self.synthesize_nodes(terminals, &mut cursor)
            };

            let touching = touching_wires(&part.bbox, &all_wires, self.config.wire_tolerance_px());
            if touching < terminals {
                diagnostics.push(
                    Diagnostic::warning(
                        Stage::Assembly,
                        "floating-component",
                        format!(
                            "{} ({}) touches {} wire(s) but has {} terminal(s)",
                            name, kind, touching, terminals
                        ),
                    )
                    .at(index),
                );
            }

            components.push(
                CircuitComponent::new(name, kind, nodes)
                    .with_origin(part.id.clone())
                    .with_input_index(index),
            );
        }

        let nets = nets_from_components(&components);
        tracing::debug!(
            "Assembled {} components on {} synthesized nets",
            components.len(),
            nets.len()
        );

        Assembly {
            components,
            nets,
            diagnostics,
            topology: self.config.topology(),
            topology_inferred: false,
        }
    }

    fn synthesize_nodes(&self, terminals: usize, cursor: &mut usize) -> Vec<String> {
        let nodes: Vec<String> = (0..terminals)
            .map(|offset| format!("N{}", *cursor + offset))
            .collect();
        *cursor += match self.config.topology() {
            // last terminal is shared with the next component
            TopologyMode::SequentialChain => terminals.saturating_sub(1),
            TopologyMode::PerTerminal => terminals,
        };
        nodes
    }
}

/// Number of wires with at least one endpoint inside the padded box.
fn touching_wires(bbox: &BoundingBox, wires: &[WireSegment], padding: f64) -> usize {
    wires
        .iter()
        .filter(|w| w.endpoints().iter().any(|p| bbox.contains_padded(p, padding)))
        .count()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detection::Point;

    fn fused(id: &str, kind: CanonicalType, corners: [f64; 4]) -> FusedComponent {
        let [x1, y1, x2, y2] = corners;
        FusedComponent {
            id: id.to_string(),
            canonical_type: kind,
            label: kind.to_string(),
            confidence: 0.9,
            bbox: BoundingBox::new(x1, y1, x2, y2).unwrap(),
            provenance: vec!["yolo".to_string()],
        }
    }

    fn wire(x1: f64, y1: f64, x2: f64, y2: f64) -> WireSegment {
        WireSegment::new(Point::new(x1, y1), Point::new(x2, y2), 1.0).unwrap()
    }

    fn assembler(topology: TopologyMode) -> CircuitGraphAssembler {
        CircuitGraphAssembler::new(Arc::new(PipelineConfig::default().with_topology(topology)))
    }

    #[test]
    fn test_sequential_chain_nets() {
        let parts = vec![
            fused("comp_1", CanonicalType::VoltageSource, [0.0, 0.0, 10.0, 10.0]),
            fused("comp_2", CanonicalType::Resistor, [50.0, 0.0, 60.0, 10.0]),
            fused("comp_3", CanonicalType::Bjt, [100.0, 0.0, 110.0, 10.0]),
            fused("comp_4", CanonicalType::Ground, [0.0, 50.0, 10.0, 60.0]),
        ];
        let assembly = assembler(TopologyMode::SequentialChain).assemble(&parts, &[]);

        let nodes: Vec<Vec<String>> = assembly.components.iter().map(|c| c.nodes.clone()).collect();
        assert_eq!(nodes[0], vec!["N1", "N2"]);
        assert_eq!(nodes[1], vec!["N2", "N3"]);
        assert_eq!(nodes[2], vec!["N3", "N4", "N5"]);
        assert_eq!(nodes[3], vec!["0"]);
        assert!(!assembly.topology_inferred);
        assert!(assembly.components.iter().all(|c| c.has_valid_arity()));

        let names: Vec<&str> = assembly.components.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, vec!["V1", "R1", "Q1", "GND1"]);
        assert_eq!(assembly.components[1].origin.as_deref(), Some("comp_2"));
    }

    #[test]
    fn test_per_terminal_nets() {
        let parts = vec![
            fused("comp_1", CanonicalType::Resistor, [0.0, 0.0, 10.0, 10.0]),
            fused("comp_2", CanonicalType::Mosfet, [50.0, 0.0, 60.0, 10.0]),
        ];
        let assembly = assembler(TopologyMode::PerTerminal).assemble(&parts, &[]);
        assert_eq!(assembly.components[0].nodes, vec!["N1", "N2"]);
        assert_eq!(assembly.components[1].nodes, vec!["N3", "N4", "N5", "N6"]);
        assert!(assembly.nets.iter().all(|n| n.members.len() == 1));
    }

    #[test]
    fn test_floating_component_warning() {
        let parts = vec![
            fused("comp_1", CanonicalType::Resistor, [0.0, 0.0, 40.0, 10.0]),
            fused("comp_2", CanonicalType::Capacitor, [100.0, 0.0, 110.0, 20.0]),
        ];
        let wires = vec![wire(-20.0, 5.0, -2.0, 5.0), wire(42.0, 5.0, 98.0, 5.0)];
        let assembly = assembler(TopologyMode::SequentialChain).assemble(&parts, &wires);

        let floating: Vec<_> = assembly
            .diagnostics
            .iter()
            .filter(|d| d.code == "floating-component")
            .collect();
        assert_eq!(floating.len(), 1);
        assert_eq!(floating[0].component_index, Some(1));
    }

    #[test]
    fn test_unknown_is_kept_with_warning() {
        let mut part = fused("comp_1", CanonicalType::Unknown, [0.0, 0.0, 10.0, 10.0]);
        part.label = "flux_capacitor".to_string();
        let assembly = assembler(TopologyMode::SequentialChain).assemble(&[part], &[]);
        assert_eq!(assembly.components.len(), 1);
        assert_eq!(assembly.components[0].name, "X1");
        assert!(assembly.diagnostics.iter().any(|d| d.code == "unknown-type"));
    }

    #[test]
    fn test_wire_detections_become_segments() {
        let parts = vec![
            fused("comp_1", CanonicalType::Resistor, [0.0, 0.0, 40.0, 10.0]),
            fused("comp_2", CanonicalType::Wire, [38.0, 4.0, 80.0, 6.0]),
            fused("comp_3", CanonicalType::Wire, [-30.0, 4.0, 2.0, 6.0]),
        ];
        let assembly = assembler(TopologyMode::SequentialChain).assemble(&parts, &[]);
        assert_eq!(assembly.components.len(), 1);
        let codes: Vec<&str> = assembly.diagnostics.iter().map(|d| d.code.as_str()).collect();
        assert_eq!(codes, vec!["wire-detection", "wire-detection"]);
    }
}
