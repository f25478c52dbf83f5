//! Canonical component taxonomy
//!
//! Every label coming out of a detection source or a circuit description is
//! resolved into one of these types before assembly or compilation. The
//! built-in label table covers the vocabularies of shape detectors, the
//! circuit-symbol object detector classes and generative describers.

use serde::{Deserialize, Serialize};

/// Widest gate the behavioral stand-in accepts.
pub const MAX_GATE_INPUTS: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CanonicalType {
    Resistor,
    Capacitor,
    Inductor,
    Diode,
    Bjt,
    Mosfet,
    VoltageSource,
    CurrentSource,
    Ground,
    LogicGate,
    Wire,
    Transformer,
    Unknown,
}

/// Accepted node counts for a canonical type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Arity {
    pub min: usize,
    pub max: usize,
}

impl Arity {
    const fn exact(n: usize) -> Self {
        Self { min: n, max: n }
    }

    const fn range(min: usize, max: usize) -> Self {
        Self { min, max }
    }

    pub fn accepts(&self, nodes: usize) -> bool {
        nodes >= self.min && nodes <= self.max
    }
}

impl std::fmt::Display for Arity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.min == self.max {
            write!(f, "{}", self.min)
        } else if self.max == self.min + 1 {
            write!(f, "{} or {}", self.min, self.max)
        } else {
            write!(f, "{} to {}", self.min, self.max)
        }
    }
}

impl CanonicalType {
    pub const ALL: [CanonicalType; 13] = [
        CanonicalType::Resistor,
        CanonicalType::Capacitor,
        CanonicalType::Inductor,
        CanonicalType::Diode,
        CanonicalType::Bjt,
        CanonicalType::Mosfet,
        CanonicalType::VoltageSource,
        CanonicalType::CurrentSource,
        CanonicalType::Ground,
        CanonicalType::LogicGate,
        CanonicalType::Wire,
        CanonicalType::Transformer,
        CanonicalType::Unknown,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            CanonicalType::Resistor => "resistor",
            CanonicalType::Capacitor => "capacitor",
            CanonicalType::Inductor => "inductor",
            CanonicalType::Diode => "diode",
            CanonicalType::Bjt => "bjt",
            CanonicalType::Mosfet => "mosfet",
            CanonicalType::VoltageSource => "voltage_source",
            CanonicalType::CurrentSource => "current_source",
            CanonicalType::Ground => "ground",
            CanonicalType::LogicGate => "logic_gate",
            CanonicalType::Wire => "wire",
            CanonicalType::Transformer => "transformer",
            CanonicalType::Unknown => "unknown",
        }
    }

    /// Node counts a compiled component of this type must carry.
    ///
    /// `Unknown` is treated as a two-terminal part so it can still be placed
    /// in the graph; it never compiles. Logic gates list their inputs then
    /// the output.
    pub fn arity(&self) -> Arity {
        match self {
            CanonicalType::Ground => Arity::exact(1),
            CanonicalType::Bjt | CanonicalType::Mosfet => Arity::range(3, 4),
            CanonicalType::LogicGate => Arity::range(2, MAX_GATE_INPUTS + 1),
            CanonicalType::Transformer => Arity::exact(4),
            _ => Arity::exact(2),
        }
    }

    /// Terminal count the assembler synthesizes nets for.
    pub fn terminal_count(&self) -> usize {
        match self {
            CanonicalType::Mosfet => 4,
            other => other.arity().min,
        }
    }

    /// Statement prefix for directly emitted types.
    pub fn prefix(&self) -> Option<char> {
        match self {
            CanonicalType::Resistor => Some('R'),
            CanonicalType::Capacitor => Some('C'),
            CanonicalType::Inductor => Some('L'),
            CanonicalType::VoltageSource => Some('V'),
            CanonicalType::CurrentSource => Some('I'),
            CanonicalType::Diode => Some('D'),
            CanonicalType::Bjt => Some('Q'),
            CanonicalType::Mosfet => Some('M'),
            CanonicalType::LogicGate => Some('E'),
            CanonicalType::Ground
            | CanonicalType::Wire
            | CanonicalType::Transformer
            | CanonicalType::Unknown => None,
        }
    }

    /// Reference designator used when naming assembled components.
    pub fn designator(&self) -> &'static str {
        match self {
            CanonicalType::Resistor => "R",
            CanonicalType::Capacitor => "C",
            CanonicalType::Inductor => "L",
            CanonicalType::Diode => "D",
            CanonicalType::Bjt => "Q",
            CanonicalType::Mosfet => "M",
            CanonicalType::VoltageSource => "V",
            CanonicalType::CurrentSource => "I",
            CanonicalType::Ground => "GND",
            CanonicalType::LogicGate => "E",
            CanonicalType::Wire => "W",
            CanonicalType::Transformer => "T",
            CanonicalType::Unknown => "X",
        }
    }

    pub fn is_ground(&self) -> bool {
        matches!(self, CanonicalType::Ground)
    }

    /// Types without a passive equivalent that compile to a behavioral stand-in.
    pub fn is_behavioral(&self) -> bool {
        matches!(self, CanonicalType::LogicGate)
    }

    /// Exact canonical name lookup (`"voltage_source"`, `"bjt"`, ...).
    pub fn from_canonical_name(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|t| t.as_str() == name)
    }
}

impl std::fmt::Display for CanonicalType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Normalize a free-text label for table lookup: lowercase, alphanumerics only.
///
/// `"Capacitor-Polarized"`, `"capacitor_polarized"` and `"capacitor polarized"`
/// all become `"capacitorpolarized"`.
pub fn normalize_label(label: &str) -> String {
    label
        .chars()
        .filter(|c| c.is_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

/// Built-in label vocabulary, keyed by normalized label.
pub const BUILTIN_LABELS: &[(&str, CanonicalType)] = &[
    // Passives
    ("resistor", CanonicalType::Resistor),
    ("r", CanonicalType::Resistor),
    ("res", CanonicalType::Resistor),
    ("resistance", CanonicalType::Resistor),
    ("resistoradjustable", CanonicalType::Resistor),
    ("resistorphoto", CanonicalType::Resistor),
    ("potentiometer", CanonicalType::Resistor),
    ("pot", CanonicalType::Resistor),
    ("thermistor", CanonicalType::Resistor),
    ("varistor", CanonicalType::Resistor),
    ("capacitor", CanonicalType::Capacitor),
    ("c", CanonicalType::Capacitor),
    ("cap", CanonicalType::Capacitor),
    ("capacitorpolarized", CanonicalType::Capacitor),
    ("capacitorunpolarized", CanonicalType::Capacitor),
    ("electrolytic", CanonicalType::Capacitor),
    ("inductor", CanonicalType::Inductor),
    ("l", CanonicalType::Inductor),
    ("coil", CanonicalType::Inductor),
    ("choke", CanonicalType::Inductor),
    // Semiconductors
    ("diode", CanonicalType::Diode),
    ("d", CanonicalType::Diode),
    ("diodelightemitting", CanonicalType::Diode),
    ("led", CanonicalType::Diode),
    ("zener", CanonicalType::Diode),
    ("schottky", CanonicalType::Diode),
    ("rectifier", CanonicalType::Diode),
    ("bjt", CanonicalType::Bjt),
    ("q", CanonicalType::Bjt),
    ("transistor", CanonicalType::Bjt),
    ("transistorphoto", CanonicalType::Bjt),
    ("phototransistor", CanonicalType::Bjt),
    ("npn", CanonicalType::Bjt),
    ("pnp", CanonicalType::Bjt),
    ("mosfet", CanonicalType::Mosfet),
    ("m", CanonicalType::Mosfet),
    ("nmos", CanonicalType::Mosfet),
    ("pmos", CanonicalType::Mosfet),
    ("fet", CanonicalType::Mosfet),
    // Sources
    ("voltagesource", CanonicalType::VoltageSource),
    ("v", CanonicalType::VoltageSource),
    ("voltage", CanonicalType::VoltageSource),
    ("voltagedc", CanonicalType::VoltageSource),
    ("voltagedcac", CanonicalType::VoltageSource),
    ("voltageac", CanonicalType::VoltageSource),
    ("vdc", CanonicalType::VoltageSource),
    ("battery", CanonicalType::VoltageSource),
    ("currentsource", CanonicalType::CurrentSource),
    ("i", CanonicalType::CurrentSource),
    ("current", CanonicalType::CurrentSource),
    ("isource", CanonicalType::CurrentSource),
    // Reference
    ("ground", CanonicalType::Ground),
    ("gnd", CanonicalType::Ground),
    ("agnd", CanonicalType::Ground),
    ("dgnd", CanonicalType::Ground),
    ("earth", CanonicalType::Ground),
    ("vss", CanonicalType::Ground),
    // Logic
    ("logicgate", CanonicalType::LogicGate),
    ("gate", CanonicalType::LogicGate),
    ("and", CanonicalType::LogicGate),
    ("or", CanonicalType::LogicGate),
    ("not", CanonicalType::LogicGate),
    ("nand", CanonicalType::LogicGate),
    ("nor", CanonicalType::LogicGate),
    ("xor", CanonicalType::LogicGate),
    ("xnor", CanonicalType::LogicGate),
    ("inverter", CanonicalType::LogicGate),
    ("buffer", CanonicalType::LogicGate),
    ("schmitttrigger", CanonicalType::LogicGate),
    // Connections
    ("wire", CanonicalType::Wire),
    ("crossover", CanonicalType::Wire),
    ("junction", CanonicalType::Wire),
    ("terminal", CanonicalType::Wire),
    ("connection", CanonicalType::Wire),
    // Magnetics
    ("transformer", CanonicalType::Transformer),
    ("xfmr", CanonicalType::Transformer),
];
