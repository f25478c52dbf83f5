//! Detection records
//!
//! Raw observations handed in by detection sources: one [`RawDetection`] per
//! component candidate and one [`WireSegment`] per wire stroke. Records are
//! validated when constructed, so fusion and assembly never see a NaN box or
//! a confidence outside `[0, 1]`.
//!
//! Input files use [`DetectionBundle`]; malformed records in a bundle are
//! dropped with a warning instead of failing the whole file.

pub mod geometry;
pub mod source;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::diagnostics::{Diagnostic, Diagnostics, Stage};

pub use geometry::{BoundingBox, Point};
pub use source::{
    CollectedDetections, DetectionSource, ImageInput, SourceError, SourceOutput, SourceRegistry,
    StaticSource,
};

/// Rejection of a malformed record at the construction boundary.
#[derive(Debug, Error, PartialEq)]
pub enum DetectionError {
    #[error("source id is empty")]
    EmptySourceId,

    #[error("type label is empty")]
    EmptyLabel,

    #[error("confidence {0} is not in [0, 1]")]
    Confidence(f64),

    #[error("bounding box has non-finite coordinates")]
    BoundingBox,

    #[error("wire endpoints are not finite")]
    WireEndpoints,
}

fn check_confidence(confidence: f64) -> Result<f64, DetectionError> {
    if (0.0..=1.0).contains(&confidence) {
        Ok(confidence)
    } else {
        Err(DetectionError::Confidence(confidence))
    }
}

/// One component candidate from one source.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RawDetection {
    source_id: String,
    type_label: String,
    confidence: f64,
    bbox: BoundingBox,
    center: Point,
}

impl RawDetection {
    pub fn new(
        source_id: impl Into<String>,
        type_label: impl Into<String>,
        confidence: f64,
        bbox: BoundingBox,
    ) -> Result<Self, DetectionError> {
        let source_id = source_id.into();
        if source_id.trim().is_empty() {
            return Err(DetectionError::EmptySourceId);
        }
        let type_label = type_label.into();
        if type_label.trim().is_empty() {
            return Err(DetectionError::EmptyLabel);
        }
        Ok(Self {
            source_id,
            type_label,
            confidence: check_confidence(confidence)?,
            center: bbox.center(),
            bbox,
        })
    }

    /// Convenience constructor from raw corner coordinates.
    pub fn from_corners(
        source_id: impl Into<String>,
        type_label: impl Into<String>,
        confidence: f64,
        corners: [f64; 4],
    ) -> Result<Self, DetectionError> {
        let [x1, y1, x2, y2] = corners;
        let bbox = BoundingBox::new(x1, y1, x2, y2).ok_or(DetectionError::BoundingBox)?;
        Self::new(source_id, type_label, confidence, bbox)
    }

    /// Use a source-reported center instead of the box center.
    pub fn with_center(mut self, center: Point) -> Self {
        if center.is_finite() {
            self.center = center;
        }
        self
    }

    /// Re-attribute the detection to another source.
    pub fn with_source(mut self, source_id: &str) -> Self {
        if !source_id.trim().is_empty() {
            self.source_id = source_id.to_string();
        }
        self
    }

    pub fn source_id(&self) -> &str {
        &self.source_id
    }

    pub fn type_label(&self) -> &str {
        &self.type_label
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn bbox(&self) -> &BoundingBox {
        &self.bbox
    }

    pub fn center(&self) -> Point {
        self.center
    }
}

/// One detected wire stroke.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct WireSegment {
    start: Point,
    end: Point,
    length: f64,
    /// Degrees from the positive x axis, in `(-180, 180]`.
    angle: f64,
    confidence: f64,
}

impl WireSegment {
    pub fn new(start: Point, end: Point, confidence: f64) -> Result<Self, DetectionError> {
        if !start.is_finite() || !end.is_finite() {
            return Err(DetectionError::WireEndpoints);
        }
        let dx = end.x - start.x;
        let dy = end.y - start.y;
        Ok(Self {
            start,
            end,
            length: dx.hypot(dy),
            angle: dy.atan2(dx).to_degrees(),
            confidence: check_confidence(confidence)?,
        })
    }

    /// Wire spanning the diagonal of a detected box.
    pub fn from_bbox_diagonal(bbox: &BoundingBox, confidence: f64) -> Result<Self, DetectionError> {
        Self::new(
            Point::new(bbox.x1, bbox.y1),
            Point::new(bbox.x2, bbox.y2),
            confidence,
        )
    }

    pub fn start(&self) -> Point {
        self.start
    }

    pub fn end(&self) -> Point {
        self.end
    }

    pub fn length(&self) -> f64 {
        self.length
    }

    pub fn angle(&self) -> f64 {
        self.angle
    }

    pub fn confidence(&self) -> f64 {
        self.confidence
    }

    pub fn endpoints(&self) -> [Point; 2] {
        [self.start, self.end]
    }
}

/// All detections one source produced for one image.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SourceBatch {
    pub source_id: String,
    /// Lower values are fused first.
    pub priority: u32,
    pub detections: Vec<RawDetection>,
}

impl SourceBatch {
    pub fn new(source_id: impl Into<String>, priority: u32, detections: Vec<RawDetection>) -> Self {
        Self {
            source_id: source_id.into(),
            priority,
            detections,
        }
    }

    pub fn empty(source_id: impl Into<String>, priority: u32) -> Self {
        Self::new(source_id, priority, Vec::new())
    }

    pub fn len(&self) -> usize {
        self.detections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.detections.is_empty()
    }
}

/// Box as written in input files: `[x1, y1, x2, y2]` or `{x1, y1, x2, y2}`.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum BoxRecord {
    Corners([f64; 4]),
    Fields { x1: f64, y1: f64, x2: f64, y2: f64 },
}

impl BoxRecord {
    fn corners(&self) -> [f64; 4] {
        match self {
            BoxRecord::Corners(c) => *c,
            BoxRecord::Fields { x1, y1, x2, y2 } => [*x1, *y1, *x2, *y2],
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DetectionRecord {
    #[serde(rename = "type", alias = "type_label", alias = "class_name", alias = "label")]
    pub type_label: String,
    pub confidence: f64,
    pub bbox: BoxRecord,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub center: Option<Point>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SourceRecord {
    pub source_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub priority: Option<u32>,
    #[serde(default)]
    pub detections: Vec<DetectionRecord>,
}

fn default_wire_confidence() -> f64 {
    1.0
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct WireRecord {
    pub start: Point,
    pub end: Point,
    #[serde(default = "default_wire_confidence")]
    pub confidence: f64,
}

/// Detections for one image as stored in a JSON file.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct DetectionBundle {
    #[serde(default)]
    pub sources: Vec<SourceRecord>,
    #[serde(default)]
    pub wires: Vec<WireRecord>,
}

/// Validated content of a [`DetectionBundle`].
#[derive(Debug, Clone, Default)]
pub struct BundleContents {
    pub batches: Vec<SourceBatch>,
    pub wires: Vec<WireSegment>,
    pub diagnostics: Diagnostics,
}

impl DetectionBundle {
    pub fn from_json_str(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Validate every record. Sources without a `priority` take their list position.
    pub fn into_contents(self) -> BundleContents {
        let mut contents = BundleContents::default();

        for (position, source) in self.sources.into_iter().enumerate() {
            let priority = source.priority.unwrap_or(position as u32);
            let mut detections = Vec::with_capacity(source.detections.len());
            for (index, record) in source.detections.into_iter().enumerate() {
                let built = RawDetection::from_corners(
                    source.source_id.as_str(),
                    record.type_label,
                    record.confidence,
                    record.bbox.corners(),
                );
                match built {
                    Ok(detection) => detections.push(match record.center {
                        Some(center) => detection.with_center(center),
                        None => detection,
                    }),
                    Err(e) => contents.diagnostics.push(
                        Diagnostic::warning(
                            Stage::Sources,
                            "malformed-detection",
                            format!("source {:?} detection {} rejected: {}", source.source_id, index, e),
                        )
                        .at(index),
                    ),
                }
            }
            contents
                .batches
                .push(SourceBatch::new(source.source_id, priority, detections));
        }

        for (index, wire) in self.wires.into_iter().enumerate() {
            match WireSegment::new(wire.start, wire.end, wire.confidence) {
                Ok(segment) => contents.wires.push(segment),
                Err(e) => contents.diagnostics.push(
                    Diagnostic::warning(
                        Stage::Sources,
                        "malformed-wire",
                        format!("wire {} rejected: {}", index, e),
                    )
                    .at(index),
                ),
            }
        }

        contents
    }
}
