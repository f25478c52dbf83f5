//! Detection fusion
//!
//! Deduplicates raw detections from every source into one component list.
//! Detections are visited in source-priority order, then by descending
//! confidence within a source. An incoming detection that overlaps an
//! accepted entry above the IoU threshold replaces it only with strictly
//! higher confidence; the replacement keeps the earlier entry's id and
//! position. Ties keep the entry that was accepted first.

pub mod summary;

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::config::PipelineConfig;
use crate::detection::{BoundingBox, RawDetection, SourceBatch};
use crate::diagnostics::{Diagnostic, Diagnostics, Stage};
use crate::graph::CanonicalType;

pub use summary::{DetectionQuality, DetectionSummary, FusionCounters, TypeSummary};

/// One deduplicated component candidate.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FusedComponent {
    pub id: String,
    pub canonical_type: CanonicalType,
    /// Label of the winning detection as the source reported it.
    pub label: String,
    pub confidence: f64,
    pub bbox: BoundingBox,
    /// Sources that reported this component, winner's source last on replacement.
    pub provenance: Vec<String>,
}

impl FusedComponent {
    fn admit(id: String, detection: &RawDetection, canonical_type: CanonicalType) -> Self {
        Self {
            id,
            canonical_type,
            label: detection.type_label().to_string(),
            confidence: detection.confidence(),
            bbox: *detection.bbox(),
            provenance: vec![detection.source_id().to_string()],
        }
    }

    fn add_provenance(&mut self, source_id: &str) {
        if !self.provenance.iter().any(|s| s == source_id) {
            self.provenance.push(source_id.to_string());
        }
    }

    /// Take over type, confidence and box from a stronger duplicate.
    fn replace_with(&mut self, other: FusedComponent) {
        self.canonical_type = other.canonical_type;
        self.label = other.label;
        self.confidence = other.confidence;
        self.bbox = other.bbox;
        for source in &other.provenance {
            self.add_provenance(source);
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FusionOutcome {
    pub components: Vec<FusedComponent>,
    pub diagnostics: Diagnostics,
    pub summary: DetectionSummary,
}

pub struct FusionEngine {
    config: Arc<PipelineConfig>,
}

impl FusionEngine {
    pub fn new(config: Arc<PipelineConfig>) -> Self {
        Self { config }
    }

    pub fn fuse(&self, batches: &[SourceBatch]) -> FusionOutcome {
        let threshold = self.config.iou_threshold();
        let cap = self.config.max_components();
        let types = self.config.types();

        let mut counters = FusionCounters::default();
        let mut diagnostics = Diagnostics::new();
        let mut accepted: Vec<FusedComponent> = Vec::new();
        let mut next_id = 0usize;

        for detection in ordered_detections(batches) {
            counters.received += 1;
            if detection.confidence() < self.config.min_confidence() {
                counters.filtered += 1;
                continue;
            }

            let canonical_type = types.resolve(detection.type_label());
            let overlap = best_overlap(&accepted, detection.bbox(), threshold);

            match overlap {
                Some(index) => {
                    counters.merged += 1;
                    if detection.confidence() > accepted[index].confidence {
                        let challenger = FusedComponent::admit(String::new(), detection, canonical_type);
                        accepted[index].replace_with(challenger);
                        settle(&mut accepted, index, threshold, &mut counters);
                    } else {
                        accepted[index].add_provenance(detection.source_id());
                    }
                }
                None if accepted.len() >= cap => {
                    counters.dropped_by_cap += 1;
                }
                None => {
                    next_id += 1;
                    accepted.push(FusedComponent::admit(
                        format!("comp_{}", next_id),
                        detection,
                        canonical_type,
                    ));
                }
            }
        }

        if counters.dropped_by_cap > 0 {
            tracing::warn!(
                "Component cap of {} reached; {} detections dropped",
                cap,
                counters.dropped_by_cap
            );
            diagnostics.push(Diagnostic::warning(
                Stage::Fusion,
                "component-cap",
                format!(
                    "{} detections dropped after reaching the cap of {} components",
                    counters.dropped_by_cap, cap
                ),
            ));
        }

        tracing::debug!(
            "Fused {} of {} detections into {} components",
            counters.received - counters.filtered,
            counters.received,
            accepted.len()
        );

        let summary = DetectionSummary::build(batches, &accepted, counters);
        FusionOutcome {
            components: accepted,
            diagnostics,
            summary,
        }
    }
}

/// Source-priority order (stable on input position), then descending
/// confidence within each source (stable on detection order).
fn ordered_detections(batches: &[SourceBatch]) -> Vec<&RawDetection> {
    let mut order: Vec<&SourceBatch> = batches.iter().collect();
    order.sort_by_key(|b| b.priority);

    let mut detections = Vec::new();
    for batch in order {
        let mut within: Vec<&RawDetection> = batch.detections.iter().collect();
        within.sort_by(|a, b| b.confidence().total_cmp(&a.confidence()));
        detections.extend(within);
    }
    detections
}

/// Accepted entry with the highest IoU strictly above `threshold`; earliest wins ties.
fn best_overlap(accepted: &[FusedComponent], bbox: &BoundingBox, threshold: f64) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (index, entry) in accepted.iter().enumerate() {
        let iou = entry.bbox.iou(bbox);
        if iou > threshold && best.map_or(true, |(_, b)| iou > b) {
            best = Some((index, iou));
        }
    }
    best.map(|(index, _)| index)
}

/// A replaced entry can grow into a neighbor. Merge such pairs until no two
/// entries overlap above the threshold; the higher confidence survives and
/// equal confidence keeps the earlier position.
fn settle(
    accepted: &mut Vec<FusedComponent>,
    mut index: usize,
    threshold: f64,
    counters: &mut FusionCounters,
) {
    loop {
        let clash = accepted.iter().enumerate().find_map(|(j, other)| {
            (j != index && other.bbox.iou(&accepted[index].bbox) > threshold).then_some(j)
        });
        let Some(j) = clash else {
            return;
        };

        let (keep, lose) = {
            let a = &accepted[index];
            let b = &accepted[j];
            let first = index.min(j);
            let second = index.max(j);
            if a.confidence == b.confidence {
                (first, second)
            } else if a.confidence > b.confidence {
                (index, j)
            } else {
                (j, index)
            }
        };

        let loser = accepted.remove(lose);
        let keep = if lose < keep { keep - 1 } else { keep };
        for source in &loser.provenance {
            accepted[keep].add_provenance(source);
        }
        counters.merged += 1;
        index = keep;
    }
}
