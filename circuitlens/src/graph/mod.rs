//! Circuit graph: canonical taxonomy, compiled components, nets and assembly.

pub mod assembler;
pub mod circuit;
pub mod describe;
pub mod taxonomy;

use serde::{Deserialize, Serialize};

pub use assembler::{Assembly, CircuitGraphAssembler};
pub use circuit::{CircuitGraph, CircuitPattern, CircuitStats};
pub use describe::{CircuitDescription, ComponentRecord, DescribedCircuit};
pub use taxonomy::{Arity, CanonicalType};

/// Reserved net identifier every ground terminal binds to.
pub const GROUND_NET: &str = "0";

/// One compilable unit of the circuit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CircuitComponent {
    pub name: String,
    pub canonical_type: CanonicalType,
    /// Raw value text as declared or detected; normalized during compilation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<String>,
    pub nodes: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model_ref: Option<String>,
    /// Id of the fused detection this component was assembled from.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub origin: Option<String>,
    /// Position of the fused detection or description record behind this
    /// component. Compile diagnostics point here instead of at the position
    /// in the component list, which shifts when earlier inputs are dropped.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub input_index: Option<usize>,
}

impl CircuitComponent {
    pub fn new(
        name: impl Into<String>,
        canonical_type: CanonicalType,
        nodes: Vec<String>,
    ) -> Self {
        Self {
            name: name.into(),
            canonical_type,
            value: None,
            nodes,
            model_ref: None,
            origin: None,
            input_index: None,
        }
    }

    pub fn with_value(mut self, value: impl Into<String>) -> Self {
        self.value = Some(value.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model_ref = Some(model.into());
        self
    }

    pub fn with_origin(mut self, origin: impl Into<String>) -> Self {
        self.origin = Some(origin.into());
        self
    }

    pub fn with_input_index(mut self, index: usize) -> Self {
        self.input_index = Some(index);
        self
    }

    pub fn has_valid_arity(&self) -> bool {
        self.canonical_type.arity().accepts(self.nodes.len())
    }

    pub fn touches_ground(&self) -> bool {
        self.nodes.iter().any(|n| n == GROUND_NET)
    }
}

/// A component terminal: component name plus zero-based terminal position.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Terminal {
    pub component: String,
    pub terminal: usize,
}

/// Synthetic group of terminals presumed electrically connected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Net {
    pub id: String,
    pub members: Vec<Terminal>,
}

impl Net {
    pub fn is_ground(&self) -> bool {
        self.id == GROUND_NET
    }
}

/// Group component terminals into nets, in first-seen net order.
pub fn nets_from_components(components: &[CircuitComponent]) -> Vec<Net> {
    let mut nets: Vec<Net> = Vec::new();
    for component in components {
        for (terminal, node) in component.nodes.iter().enumerate() {
            let member = Terminal {
                component: component.name.clone(),
                terminal,
            };
            match nets.iter_mut().find(|n| &n.id == node) {
                Some(net) => net.members.push(member),
                None => nets.push(Net {
                    id: node.clone(),
                    members: vec![member],
                }),
            }
        }
    }
    nets
}
