//! Pipeline configuration
//!
//! Read-only settings shared by every request: the label → canonical type
//! table, per-type default values, the fusion IoU threshold and the
//! component cap. A config is validated as it is built and then handed to
//! the stages as `Arc<PipelineConfig>`. Reloading swaps a whole new `Arc`.

use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::{Arc, RwLock};

use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

use crate::graph::taxonomy::{normalize_label, CanonicalType, BUILTIN_LABELS};
use crate::netlist::value::parse_value;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    OutOfRange { field: &'static str, reason: String },

    #[error("Default value {value:?} for {component} does not parse")]
    InvalidDefault { component: &'static str, value: String },

    #[error("Alias {0:?} is empty after normalization")]
    EmptyAlias(String),
}

/// How the assembler synthesizes nets when no wire-to-terminal mapping exists.
///
/// Neither mode reconstructs real topology.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TopologyMode {
    /// Consecutive components share a net: `N1 N2`, then `N2 N3`, ...
    #[default]
    SequentialChain,
    /// Every terminal gets its own fresh net.
    PerTerminal,
}

/// Values substituted when a component value fails to normalize.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultValues {
    pub resistor: String,
    pub capacitor: String,
    pub inductor: String,
    pub voltage_source: String,
    pub current_source: String,
}

impl Default for DefaultValues {
    fn default() -> Self {
        Self {
            resistor: "1k".to_string(),
            capacitor: "1u".to_string(),
            inductor: "1m".to_string(),
            voltage_source: "5".to_string(),
            current_source: "1m".to_string(),
        }
    }
}

impl DefaultValues {
    /// Default value for types that carry a numeric value.
    ///
    /// Transformers reuse the inductor default since they compile to inductors.
    pub fn value_for(&self, kind: CanonicalType) -> Option<&str> {
        match kind {
            CanonicalType::Resistor => Some(&self.resistor),
            CanonicalType::Capacitor => Some(&self.capacitor),
            CanonicalType::Inductor | CanonicalType::Transformer => Some(&self.inductor),
            CanonicalType::VoltageSource => Some(&self.voltage_source),
            CanonicalType::CurrentSource => Some(&self.current_source),
            _ => None,
        }
    }

    fn validate(&self) -> Result<(), ConfigError> {
        let entries: [(&'static str, &str); 5] = [
            ("resistor", &self.resistor),
            ("capacitor", &self.capacitor),
            ("inductor", &self.inductor),
            ("voltage_source", &self.voltage_source),
            ("current_source", &self.current_source),
        ];
        for (component, value) in entries {
            if !parse_value(value).is_parsed() {
                return Err(ConfigError::InvalidDefault {
                    component,
                    value: value.to_string(),
                });
            }
        }
        Ok(())
    }
}

/// Label → canonical type lookup. Immutable once built.
#[derive(Debug, Clone)]
pub struct TypeTable {
    entries: HashMap<String, CanonicalType>,
}

impl TypeTable {
    /// Table containing only the built-in vocabulary.
    pub fn builtin() -> Self {
        let entries = BUILTIN_LABELS
            .iter()
            .map(|(label, kind)| (label.to_string(), *kind))
            .collect();
        Self { entries }
    }

    /// Built-in vocabulary with extra aliases layered on top.
    pub fn with_aliases(aliases: &BTreeMap<String, CanonicalType>) -> Result<Self, ConfigError> {
        let mut table = Self::builtin();
        for (label, kind) in aliases {
            table.insert_alias(label, *kind)?;
        }
        Ok(table)
    }

    fn insert_alias(&mut self, label: &str, kind: CanonicalType) -> Result<(), ConfigError> {
        let key = normalize_label(label);
        if key.is_empty() {
            return Err(ConfigError::EmptyAlias(label.to_string()));
        }
        self.entries.insert(key, kind);
        Ok(())
    }

    /// Resolve a free-text label. Unrecognized labels resolve to `Unknown`.
    pub fn resolve(&self, label: &str) -> CanonicalType {
        let key = normalize_label(label);
        if let Some(kind) = self.entries.get(&key) {
            return *kind;
        }
        CanonicalType::from_canonical_name(label.trim()).unwrap_or(CanonicalType::Unknown)
    }

    pub fn contains(&self, label: &str) -> bool {
        self.entries.contains_key(&normalize_label(label))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Labels that resolve to `kind`, sorted.
    pub fn labels_for(&self, kind: CanonicalType) -> Vec<&str> {
        let mut labels: Vec<&str> = self
            .entries
            .iter()
            .filter(|(_, k)| **k == kind)
            .map(|(label, _)| label.as_str())
            .collect();
        labels.sort_unstable();
        labels
    }
}

impl Default for TypeTable {
    fn default() -> Self {
        Self::builtin()
    }
}

/// On-disk shape of a config file. Missing fields take their defaults.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
struct ConfigFile {
    iou_threshold: f64,
    max_components: usize,
    min_confidence: f64,
    wire_tolerance_px: f64,
    topology: TopologyMode,
    defaults: DefaultValues,
    type_aliases: BTreeMap<String, CanonicalType>,
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            iou_threshold: 0.5,
            max_components: 50,
            min_confidence: 0.0,
            wire_tolerance_px: 5.0,
            topology: TopologyMode::SequentialChain,
            defaults: DefaultValues::default(),
            type_aliases: BTreeMap::new(),
        }
    }
}

/// Validated pipeline settings.
///
/// Every constructor and builder checks its input, so a `PipelineConfig`
/// handed to the stages is always in range and its type table always
/// includes the configured aliases.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineConfig {
    iou_threshold: f64,
    max_components: usize,
    min_confidence: f64,
    wire_tolerance_px: f64,
    topology: TopologyMode,
    defaults: DefaultValues,
    type_aliases: BTreeMap<String, CanonicalType>,
    #[serde(skip)]
    types: TypeTable,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        let file = ConfigFile::default();
        Self {
            iou_threshold: file.iou_threshold,
            max_components: file.max_components,
            min_confidence: file.min_confidence,
            wire_tolerance_px: file.wire_tolerance_px,
            topology: file.topology,
            defaults: file.defaults,
            type_aliases: file.type_aliases,
            types: TypeTable::builtin(),
        }
    }
}

impl<'de> Deserialize<'de> for PipelineConfig {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let file = ConfigFile::deserialize(deserializer)?;
        PipelineConfig::from_file(file).map_err(serde::de::Error::custom)
    }
}

impl PipelineConfig {
    fn from_file(file: ConfigFile) -> Result<Self, ConfigError> {
        check_iou_threshold(file.iou_threshold)?;
        check_max_components(file.max_components)?;
        check_min_confidence(file.min_confidence)?;
        check_wire_tolerance(file.wire_tolerance_px)?;
        file.defaults.validate()?;
        let types = TypeTable::with_aliases(&file.type_aliases)?;
        Ok(Self {
            iou_threshold: file.iou_threshold,
            max_components: file.max_components,
            min_confidence: file.min_confidence,
            wire_tolerance_px: file.wire_tolerance_px,
            topology: file.topology,
            defaults: file.defaults,
            type_aliases: file.type_aliases,
            types,
        })
    }
}

fn check_iou_threshold(value: f64) -> Result<(), ConfigError> {
    if value > 0.0 && value <= 1.0 {
        return Ok(());
    }
    Err(ConfigError::OutOfRange {
        field: "iou_threshold",
        reason: format!("{} is not in (0, 1]", value),
    })
}

fn check_max_components(value: usize) -> Result<(), ConfigError> {
    if value >= 1 {
        return Ok(());
    }
    Err(ConfigError::OutOfRange {
        field: "max_components",
        reason: "must be at least 1".to_string(),
    })
}

fn check_min_confidence(value: f64) -> Result<(), ConfigError> {
    if (0.0..=1.0).contains(&value) {
        return Ok(());
    }
    Err(ConfigError::OutOfRange {
        field: "min_confidence",
        reason: format!("{} is not in [0, 1]", value),
    })
}

fn check_wire_tolerance(value: f64) -> Result<(), ConfigError> {
    if value >= 0.0 && value.is_finite() {
        return Ok(());
    }
    Err(ConfigError::OutOfRange {
        field: "wire_tolerance_px",
        reason: format!("{} is not a finite, non-negative padding", value),
    })
}

impl PipelineConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse and validate a JSON config. Missing fields take their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let file: ConfigFile = serde_json::from_str(json)?;
        Self::from_file(file)
    }

    pub fn load_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&content)?;
        tracing::info!(
            "Loaded pipeline config from {} ({} type labels)",
            path.display(),
            config.types.len()
        );
        Ok(config)
    }

    pub fn with_iou_threshold(mut self, threshold: f64) -> Result<Self, ConfigError> {
        check_iou_threshold(threshold)?;
        self.iou_threshold = threshold;
        Ok(self)
    }

    pub fn with_max_components(mut self, cap: usize) -> Result<Self, ConfigError> {
        check_max_components(cap)?;
        self.max_components = cap;
        Ok(self)
    }

    pub fn with_min_confidence(mut self, min: f64) -> Result<Self, ConfigError> {
        check_min_confidence(min)?;
        self.min_confidence = min;
        Ok(self)
    }

    pub fn with_wire_tolerance(mut self, padding_px: f64) -> Result<Self, ConfigError> {
        check_wire_tolerance(padding_px)?;
        self.wire_tolerance_px = padding_px;
        Ok(self)
    }

    pub fn with_topology(mut self, topology: TopologyMode) -> Self {
        self.topology = topology;
        self
    }

    pub fn with_defaults(mut self, defaults: DefaultValues) -> Result<Self, ConfigError> {
        defaults.validate()?;
        self.defaults = defaults;
        Ok(self)
    }

    /// Layer one more label over the type table; it resolves immediately.
    pub fn with_alias(
        mut self,
        label: impl Into<String>,
        kind: CanonicalType,
    ) -> Result<Self, ConfigError> {
        let label = label.into();
        self.types.insert_alias(&label, kind)?;
        self.type_aliases.insert(label, kind);
        Ok(self)
    }

    /// Fusion IoU threshold τ; overlaps strictly above it are duplicates.
    pub fn iou_threshold(&self) -> f64 {
        self.iou_threshold
    }

    /// Maximum number of fused components retained per request.
    pub fn max_components(&self) -> usize {
        self.max_components
    }

    /// Detections below this confidence are dropped before fusion (0 disables).
    pub fn min_confidence(&self) -> f64 {
        self.min_confidence
    }

    /// Padding in pixels when attributing wire endpoints to a component box.
    pub fn wire_tolerance_px(&self) -> f64 {
        self.wire_tolerance_px
    }

    pub fn topology(&self) -> TopologyMode {
        self.topology
    }

    pub fn defaults(&self) -> &DefaultValues {
        &self.defaults
    }

    pub fn types(&self) -> &TypeTable {
        &self.types
    }

    pub fn type_aliases(&self) -> &BTreeMap<String, CanonicalType> {
        &self.type_aliases
    }

    pub fn into_shared(self) -> Arc<PipelineConfig> {
        Arc::new(self)
    }
}

/// Process-wide config handle with atomic whole-table replacement.
///
/// Requests take a [`snapshot`](SharedConfig::snapshot) at their start and
/// keep it; a concurrent [`replace`](SharedConfig::replace) never changes a
/// config a request already holds.
#[derive(Debug)]
pub struct SharedConfig {
    current: RwLock<Arc<PipelineConfig>>,
}

impl SharedConfig {
    pub fn new(config: PipelineConfig) -> Self {
        Self {
            current: RwLock::new(Arc::new(config)),
        }
    }

    pub fn snapshot(&self) -> Arc<PipelineConfig> {
        let guard = self.current.read().unwrap_or_else(|e| e.into_inner());
        Arc::clone(&guard)
    }

    /// Install a new config, returning the previous one.
    pub fn replace(&self, config: PipelineConfig) -> Arc<PipelineConfig> {
        let mut guard = self.current.write().unwrap_or_else(|e| e.into_inner());
        std::mem::replace(&mut *guard, Arc::new(config))
    }

    /// Load, validate and install a config file. On error the current config stays.
    pub fn reload_from(&self, path: &Path) -> Result<Arc<PipelineConfig>, ConfigError> {
        let config = PipelineConfig::load_file(path)?;
        Ok(self.replace(config))
    }
}

impl Default for SharedConfig {
    fn default() -> Self {
        Self::new(PipelineConfig::default())
    }
}
