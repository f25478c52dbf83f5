//! Detection Source capability
//!
//! Shape detectors, object detectors and generative describers all sit behind
//! one trait. The registry runs every source concurrently with a per-source
//! timeout; a source that fails or times out contributes an empty batch and a
//! warning, and the rest of the run proceeds with whatever arrived.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use thiserror::Error;

use super::{RawDetection, SourceBatch, WireSegment};
use crate::diagnostics::{Diagnostic, Diagnostics, Stage};

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Detection failed: {0}")]
    Failed(String),

    #[error("Source unavailable: {0}")]
    Unavailable(String),
}

/// Image handed to every source for one request.
#[derive(Debug, Clone, Default)]
pub struct ImageInput {
    pub path: Option<PathBuf>,
    pub bytes: Arc<Vec<u8>>,
}

impl ImageInput {
    pub fn from_bytes(bytes: Vec<u8>) -> Self {
        Self {
            path: None,
            bytes: Arc::new(bytes),
        }
    }

    pub async fn load(path: &Path) -> Result<Self, SourceError> {
        let bytes = tokio::fs::read(path).await?;
        Ok(Self {
            path: Some(path.to_path_buf()),
            bytes: Arc::new(bytes),
        })
    }

    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }
}

/// Everything one source reports for an image.
#[derive(Debug, Clone, Default)]
pub struct SourceOutput {
    pub detections: Vec<RawDetection>,
    pub wires: Vec<WireSegment>,
}

/// Common trait for all detection sources
#[async_trait]
pub trait DetectionSource: Send + Sync {
    /// Stable identifier recorded in fused provenance.
    fn id(&self) -> &str;

    /// Fusion order; lower values are fused first.
    fn priority(&self) -> u32 {
        100
    }

    async fn detect(&self, image: &ImageInput) -> Result<SourceOutput, SourceError>;
}

/// Replays a fixed set of detections, e.g. loaded from a bundle file.
pub struct StaticSource {
    id: String,
    priority: u32,
    output: SourceOutput,
}

impl StaticSource {
    pub fn new(id: impl Into<String>, priority: u32, detections: Vec<RawDetection>) -> Self {
        Self {
            id: id.into(),
            priority,
            output: SourceOutput {
                detections,
                wires: Vec::new(),
            },
        }
    }

    pub fn with_wires(mut self, wires: Vec<WireSegment>) -> Self {
        self.output.wires = wires;
        self
    }
}

#[async_trait]
impl DetectionSource for StaticSource {
    fn id(&self) -> &str {
        &self.id
    }

    fn priority(&self) -> u32 {
        self.priority
    }

    async fn detect(&self, _image: &ImageInput) -> Result<SourceOutput, SourceError> {
        Ok(self.output.clone())
    }
}

/// Output of [`SourceRegistry::collect`]: one batch per registered source.
#[derive(Debug, Clone, Default)]
pub struct CollectedDetections {
    pub batches: Vec<SourceBatch>,
    pub wires: Vec<WireSegment>,
    pub diagnostics: Diagnostics,
}

/// Registry of detection sources
#[derive(Default)]
pub struct SourceRegistry {
    sources: Vec<Arc<dyn DetectionSource>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, source: Arc<dyn DetectionSource>) {
        tracing::debug!("Registered detection source {}", source.id());
        self.sources.push(source);
    }

    pub fn with_source(mut self, source: Arc<dyn DetectionSource>) -> Self {
        self.register(source);
        self
    }

    pub fn ids(&self) -> Vec<&str> {
        self.sources.iter().map(|s| s.id()).collect()
    }

    pub fn len(&self) -> usize {
        self.sources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sources.is_empty()
    }

    /// Run every source concurrently. Batches come back in registration
    /// order whatever order the sources finish in.
    pub async fn collect(&self, image: &ImageInput, timeout: Duration) -> CollectedDetections {
        let runs = self.sources.iter().map(|source| {
            let source = Arc::clone(source);
            async move {
                let result = tokio::time::timeout(timeout, source.detect(image)).await;
                (source, result)
            }
        });
        let results = join_all(runs).await;

        let mut collected = CollectedDetections::default();
        for (position, (source, result)) in results.into_iter().enumerate() {
            let id = source.id().to_string();
            let priority = source.priority();
            match result {
                Ok(Ok(output)) => {
                    let detections: Vec<RawDetection> = output
                        .detections
                        .into_iter()
                        .map(|d| d.with_source(&id))
                        .collect();
                    tracing::debug!(
                        "Source {} returned {} detections and {} wires",
                        id,
                        detections.len(),
                        output.wires.len()
                    );
                    collected.wires.extend(output.wires);
                    collected
                        .batches
                        .push(SourceBatch::new(id, priority, detections));
                }
                Ok(Err(e)) => {
                    tracing::warn!("Detection source {} failed: {}", id, e);
                    collected.diagnostics.push(
                        Diagnostic::warning(
                            Stage::Sources,
                            "source-failed",
                            format!("source {} contributed nothing: {}", id, e),
                        )
                        .at(position),
                    );
                    collected.batches.push(SourceBatch::empty(id, priority));
                }
                Err(_) => {
                    tracing::warn!("Detection source {} timed out after {:?}", id, timeout);
                    collected.diagnostics.push(
                        Diagnostic::warning(
                            Stage::Sources,
                            "source-timeout",
                            format!("source {} timed out after {:?}", id, timeout),
                        )
                        .at(position),
                    );
                    collected.batches.push(SourceBatch::empty(id, priority));
                }
            }
        }
        collected
    }
}
