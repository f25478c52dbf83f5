//! Per-request detection statistics.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::FusedComponent;
use crate::detection::SourceBatch;
use crate::graph::CanonicalType;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DetectionQuality {
    High,
    Medium,
    Low,
    #[default]
    None,
}

impl DetectionQuality {
    /// `high` above 0.8 mean confidence, `medium` above 0.6, otherwise `low`.
    pub fn from_mean(mean: Option<f64>) -> Self {
        match mean {
            None => DetectionQuality::None,
            Some(m) if m > 0.8 => DetectionQuality::High,
            Some(m) if m > 0.6 => DetectionQuality::Medium,
            Some(_) => DetectionQuality::Low,
        }
    }
}

impl std::fmt::Display for DetectionQuality {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DetectionQuality::High => write!(f, "high"),
            DetectionQuality::Medium => write!(f, "medium"),
            DetectionQuality::Low => write!(f, "low"),
            DetectionQuality::None => write!(f, "none"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct FusionCounters {
    pub received: usize,
    /// Below the minimum confidence.
    pub filtered: usize,
    /// Absorbed into an already accepted component.
    pub merged: usize,
    pub dropped_by_cap: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeSummary {
    pub count: usize,
    pub mean_confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DetectionSummary {
    pub counters: FusionCounters,
    pub fused: usize,
    /// Raw detection count per source id.
    pub per_source: BTreeMap<String, usize>,
    pub by_type: BTreeMap<CanonicalType, TypeSummary>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub mean_confidence: Option<f64>,
    pub quality: DetectionQuality,
}

impl DetectionSummary {
    pub fn build(
        batches: &[SourceBatch],
        components: &[FusedComponent],
        counters: FusionCounters,
    ) -> Self {
        let mut per_source = BTreeMap::new();
        for batch in batches {
            *per_source.entry(batch.source_id.clone()).or_insert(0) += batch.len();
        }

        let mut sums: BTreeMap<CanonicalType, (usize, f64)> = BTreeMap::new();
        for component in components {
            let entry = sums.entry(component.canonical_type).or_insert((0, 0.0));
            entry.0 += 1;
            entry.1 += component.confidence;
        }
        let by_type = sums
            .into_iter()
            .map(|(kind, (count, total))| {
                (
                    kind,
                    TypeSummary {
                        count,
                        mean_confidence: total / count as f64,
                    },
                )
            })
            .collect();

        let mean_confidence = if components.is_empty() {
            None
        } else {
            Some(components.iter().map(|c| c.confidence).sum::<f64>() / components.len() as f64)
        };

        Self {
            counters,
            fused: components.len(),
            per_source,
            by_type,
            mean_confidence,
            quality: DetectionQuality::from_mean(mean_confidence),
        }
    }

    pub fn count_of(&self, kind: CanonicalType) -> usize {
        self.by_type.get(&kind).map_or(0, |t| t.count)
    }
}
