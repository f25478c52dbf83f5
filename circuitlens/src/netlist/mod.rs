//! SPICE netlist synthesis: value lexing, compilation and validation.

pub mod analysis;
pub mod compiler;
pub mod validator;
pub mod value;

pub use analysis::Analysis;
pub use compiler::{
    CompileOptions, CompiledNetlist, NetlistCompiler, NetlistExpectations, Statement,
};
pub use validator::{NetlistValidator, ValidationReport};
pub use value::{parse_value, Multiplier, ParsedValue, Unit};
