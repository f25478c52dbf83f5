//! CircuitLens - circuit-diagram detections to SPICE netlists
//!
//! This library fuses component detections reported by several recognizers
//! for one diagram image, assembles them into a circuit, compiles a SPICE
//! netlist and checks the result. Every stage is fail-soft: problems with one
//! detection or component become diagnostics, the rest of the circuit still
//! compiles.
//!
//! # Quick Start
//!
//! ```no_run
//! use circuitlens::{CircuitLensCore, PipelineOptions, PipelineRequest};
//! use std::path::Path;
//!
//! let core = CircuitLensCore::default();
//! let request = PipelineRequest::load_bundle(Path::new("detections.json")).unwrap();
//! let output = core.run(request, &PipelineOptions::default()).unwrap();
//!
//! print!("{}", output.netlist);
//! for diagnostic in &output.diagnostics {
//!     eprintln!("{}", diagnostic);
//! }
//! ```
//!
//! # Features
//!
//! - **Detection fusion**: IoU deduplication across prioritized sources
//! - **Circuit assembly**: canonical types, names and synthesized nets
//! - **Netlist compilation**: SPICE statements, value normalization, models
//! - **Validation**: structural checks on any netlist text
//! - **Descriptions**: compile describer JSON directly, skipping fusion

pub mod config;
pub mod core;
pub mod detection;
pub mod diagnostics;
pub mod fusion;
pub mod graph;
pub mod netlist;

// Re-export main types
pub use config::{ConfigError, PipelineConfig, SharedConfig, TopologyMode, TypeTable};
pub use crate::core::{
    CircuitLensCore, CircuitLensError, DiagnosticStats, PipelineOptions, PipelineOutput,
    PipelineRequest,
};
pub use detection::{
    BoundingBox, DetectionBundle, DetectionSource, ImageInput, Point, RawDetection, SourceBatch,
    SourceRegistry, WireSegment,
};
pub use diagnostics::{Diagnostic, Diagnostics, Severity, Stage};
pub use fusion::{DetectionSummary, FusedComponent, FusionEngine};
pub use graph::{
    CanonicalType, CircuitComponent, CircuitDescription, CircuitGraph, CircuitPattern, Net,
};
pub use netlist::{Analysis, CompiledNetlist, NetlistCompiler, NetlistValidator, ValidationReport};

/// Compile a circuit description file with the default config (convenience wrapper).
pub fn compile_description_file(
    path: &std::path::Path,
    options: &PipelineOptions,
) -> Result<PipelineOutput, CircuitLensError> {
    let description = CircuitDescription::load_file(path)?;
    CircuitLensCore::default().compile_description(description, options)
}

/// Validate netlist text that did not come from this crate (convenience wrapper).
pub fn validate_netlist(text: &str) -> ValidationReport {
    NetlistValidator::validate(text, &netlist::NetlistExpectations::default())
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        Analysis, CanonicalType, CircuitComponent, CircuitLensCore, CircuitLensError, Diagnostic,
        PipelineConfig, PipelineOptions, PipelineOutput, PipelineRequest, Severity,
        ValidationReport,
    };
}
