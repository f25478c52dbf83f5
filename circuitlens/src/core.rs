//! Pipeline facade shared by the CLI and embedding services.
//! Fusion → assembly → compilation → validation, one request at a time.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use crate::config::{ConfigError, PipelineConfig, SharedConfig};
use crate::detection::{
    CollectedDetections, DetectionBundle, ImageInput, SourceBatch, SourceRegistry, WireSegment,
};
use crate::diagnostics::{Diagnostics, Severity, Stage};
use crate::fusion::{DetectionSummary, FusedComponent, FusionEngine};
use crate::graph::{
    nets_from_components, CircuitComponent, CircuitDescription, CircuitGraph, CircuitGraphAssembler,
    CircuitStats, Net,
};
use crate::netlist::{
    Analysis, CompileOptions, CompiledNetlist, NetlistCompiler, NetlistExpectations,
    NetlistValidator, ValidationReport,
};

#[derive(Debug, thiserror::Error)]
pub enum CircuitLensError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Config error: {0}")]
    Config(#[from] ConfigError),
    /// A stage produced a corrupt intermediate structure.
    #[error("Internal invariant violated: {0}")]
    Invariant(String),
}

/// Per-request options (CLI flags or service parameters).
#[derive(Clone, Debug)]
pub struct PipelineOptions {
    /// Netlist title; a description's own title is used when unset.
    pub title: Option<String>,
    pub analysis: Analysis,
    /// Per-source budget when running a [`SourceRegistry`].
    pub source_timeout: Duration,
}

impl Default for PipelineOptions {
    fn default() -> Self {
        Self {
            title: None,
            analysis: Analysis::Op,
            source_timeout: Duration::from_secs(30),
        }
    }
}

impl PipelineOptions {
    fn compile_options(&self, fallback_title: Option<&str>) -> CompileOptions {
        let mut options = CompileOptions::default().with_analysis(self.analysis.clone());
        if let Some(title) = self.title.as_deref().or(fallback_title) {
            options = options.with_title(title);
        }
        options
    }
}

/// Detections for one image, already collected from the sources.
#[derive(Debug, Clone, Default)]
pub struct PipelineRequest {
    pub batches: Vec<SourceBatch>,
    pub wires: Vec<WireSegment>,
    /// Problems found while collecting or loading the detections.
    pub diagnostics: Diagnostics,
}

impl PipelineRequest {
    pub fn new(batches: Vec<SourceBatch>, wires: Vec<WireSegment>) -> Self {
        Self {
            batches,
            wires,
            diagnostics: Diagnostics::new(),
        }
    }

    pub fn from_bundle(bundle: DetectionBundle) -> Self {
        let contents = bundle.into_contents();
        Self {
            batches: contents.batches,
            wires: contents.wires,
            diagnostics: contents.diagnostics,
        }
    }

    pub fn load_bundle(path: &Path) -> Result<Self, CircuitLensError> {
        let content = std::fs::read_to_string(path)?;
        let bundle = DetectionBundle::from_json_str(&content)?;
        Ok(Self::from_bundle(bundle))
    }

    pub fn detection_count(&self) -> usize {
        self.batches.iter().map(|b| b.len()).sum()
    }
}

impl From<CollectedDetections> for PipelineRequest {
    fn from(collected: CollectedDetections) -> Self {
        Self {
            batches: collected.batches,
            wires: collected.wires,
            diagnostics: collected.diagnostics,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct DiagnosticStats {
    pub errors: usize,
    pub warnings: usize,
    pub sources: usize,
    pub fusion: usize,
    pub assembly: usize,
    pub description: usize,
    pub compilation: usize,
}

impl DiagnosticStats {
    pub fn total(&self) -> usize {
        self.errors + self.warnings
    }
}

fn diagnostics_to_stats(diagnostics: &Diagnostics) -> DiagnosticStats {
    let mut stats = DiagnosticStats::default();
    for d in diagnostics {
        match d.severity {
            Severity::Error => stats.errors += 1,
            Severity::Warning => stats.warnings += 1,
        }
        match d.stage {
            Stage::Sources => stats.sources += 1,
            Stage::Fusion => stats.fusion += 1,
            Stage::Assembly => stats.assembly += 1,
            Stage::Description => stats.description += 1,
            Stage::Compilation => stats.compilation += 1,
        }
    }
    stats
}

/// Everything one request produces.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub request_id: Uuid,
    pub generated_at: DateTime<Utc>,
    /// Fused detections; empty for description input.
    pub fused: Vec<FusedComponent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub summary: Option<DetectionSummary>,
    pub components: Vec<CircuitComponent>,
    pub nets: Vec<Net>,
    /// Always false: nets are synthesized, not read from wiring.
    pub topology_inferred: bool,
    pub circuit: CircuitStats,
    pub netlist: String,
    pub validation: ValidationReport,
    pub diagnostics: Diagnostics,
    pub stats: DiagnosticStats,
    #[serde(skip)]
    pub compiled: CompiledNetlist,
}

impl PipelineOutput {
    pub fn is_valid(&self) -> bool {
        self.validation.valid
    }

    pub fn has_errors(&self) -> bool {
        self.stats.errors > 0
    }

    pub fn has_warnings(&self) -> bool {
        self.stats.warnings > 0
    }
}

/// Core pipeline API used by the CLI.
pub struct CircuitLensCore {
    config: Arc<PipelineConfig>,
}

impl Default for CircuitLensCore {
    fn default() -> Self {
        Self::new(Arc::new(PipelineConfig::default()))
    }
}

impl CircuitLensCore {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    /// Pin the current config of a shared handle for the lifetime of this core.
    pub fn from_shared(shared: &SharedConfig) -> Self {
        Self::new(shared.snapshot())
    }

    pub fn config(&self) -> &Arc<PipelineConfig> {
        &self.config
    }

    /// Run fusion, assembly, compilation and validation on collected detections.
    pub fn run(
        &self,
        request: PipelineRequest,
        options: &PipelineOptions,
    ) -> Result<PipelineOutput, CircuitLensError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("pipeline", request_id = %request_id);
        let _enter = span.enter();

        tracing::info!(
            "Running pipeline on {} detections from {} sources",
            request.detection_count(),
            request.batches.len()
        );

        let mut diagnostics = request.diagnostics;

        let fusion = FusionEngine::new(Arc::clone(&self.config)).fuse(&request.batches);
        diagnostics.extend(fusion.diagnostics);

        let assembly = CircuitGraphAssembler::new(Arc::clone(&self.config))
            .assemble(&fusion.components, &request.wires);
        diagnostics.extend(assembly.diagnostics);
        check_nets(&assembly.nets)?;

        let compiled = NetlistCompiler::new(Arc::clone(&self.config))
            .compile(&assembly.components, &options.compile_options(None));

        self.finish(
            request_id,
            fusion.components,
            Some(fusion.summary),
            assembly.components,
            assembly.nets,
            assembly.topology_inferred,
            compiled,
            diagnostics,
        )
    }

    /// Collect from every registered source, then [`run`](Self::run).
    pub async fn run_sources(
        &self,
        registry: &SourceRegistry,
        image: &ImageInput,
        options: &PipelineOptions,
    ) -> Result<PipelineOutput, CircuitLensError> {
        let collected = registry
            .collect(image, options.source_timeout)
            .instrument(tracing::info_span!("collect", sources = registry.len()))
            .await;
        self.run(PipelineRequest::from(collected), options)
    }

    /// Compile a describer's circuit description, skipping fusion and assembly.
    pub fn compile_description(
        &self,
        description: CircuitDescription,
        options: &PipelineOptions,
    ) -> Result<PipelineOutput, CircuitLensError> {
        let request_id = Uuid::new_v4();
        let span = tracing::info_span!("describe", request_id = %request_id);
        let _enter = span.enter();

        let described = description.into_components(self.config.types());
        let diagnostics = described.diagnostics;

        let compiled = NetlistCompiler::new(Arc::clone(&self.config)).compile(
            &described.components,
            &options.compile_options(described.title.as_deref()),
        );
        let nets = nets_from_components(&described.components);
        check_nets(&nets)?;

        self.finish(
            request_id,
            Vec::new(),
            None,
            described.components,
            nets,
            false,
            compiled,
            diagnostics,
        )
    }

    pub fn validate_text(text: &str, expectations: &NetlistExpectations) -> ValidationReport {
        NetlistValidator::validate(text, expectations)
    }

    #[allow(clippy::too_many_arguments)]
    fn finish(
        &self,
        request_id: Uuid,
        fused: Vec<FusedComponent>,
        summary: Option<DetectionSummary>,
        components: Vec<CircuitComponent>,
        nets: Vec<Net>,
        topology_inferred: bool,
        compiled: CompiledNetlist,
        mut diagnostics: Diagnostics,
    ) -> Result<PipelineOutput, CircuitLensError> {
        check_compiled(&compiled, components.len())?;
        diagnostics.extend(compiled.diagnostics.clone());

        let netlist = compiled.render();
        let validation = NetlistValidator::validate(&netlist, &compiled.expectations);
        if !validation.valid {
            tracing::warn!("Netlist failed validation: {}", validation.reasons.join("; "));
        }

        let circuit = CircuitGraph::from_components(&components).stats();
        let stats = diagnostics_to_stats(&diagnostics);
        tracing::info!(
            "Pipeline finished: {} components, {} statements, {} errors, {} warnings",
            components.len(),
            compiled.statements.len(),
            stats.errors,
            stats.warnings
        );

        Ok(PipelineOutput {
            request_id,
            generated_at: Utc::now(),
            fused,
            summary,
            components,
            nets,
            topology_inferred,
            circuit,
            netlist,
            validation,
            diagnostics,
            stats,
            compiled,
        })
    }
}

fn check_nets(nets: &[Net]) -> Result<(), CircuitLensError> {
    match nets.iter().find(|n| n.members.is_empty()) {
        Some(net) => Err(CircuitLensError::Invariant(format!(
            "net {} has no members",
            net.id
        ))),
        None => Ok(()),
    }
}

fn check_compiled(compiled: &CompiledNetlist, component_count: usize) -> Result<(), CircuitLensError> {
    let mut names = std::collections::HashSet::new();
    for statement in &compiled.statements {
        if let Some(index) = statement.component_index() {
            if index >= component_count {
                return Err(CircuitLensError::Invariant(format!(
                    "statement refers to component {} of {}",
                    index, component_count
                )));
            }
        }
        if let Some(name) = statement.element_name() {
            if !names.insert(name.to_ascii_uppercase()) {
                return Err(CircuitLensError::Invariant(format!(
                    "statement name {} emitted twice",
                    name
                )));
            }
        }
    }
    Ok(())
}
