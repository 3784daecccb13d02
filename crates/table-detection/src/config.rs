//! Detection configuration
//!
//! Replaces module-level model constants with one value that is passed to the
//! detector and the pipeline. Loadable from YAML; every field is optional in
//! the file and falls back to [`TableDetectionConfig::default`].

use crate::{DetectionError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Label emitted by TableBank-style models for table regions
pub const DEFAULT_BLOCK_TYPE: &str = "Table";

/// Configuration for the layout model and the two-pass pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableDetectionConfig {
    /// ONNX model file (None = must be supplied by the caller)
    pub model_path: Option<PathBuf>,
    /// Model class index to label
    pub label_map: BTreeMap<u32, String>,
    /// Minimum confidence kept by the model itself (0.0-1.0)
    pub model_score_threshold: f32,
    /// `IoU` threshold for per-label non-maximum suppression (0.0-1.0)
    pub iou_threshold: f32,
    /// Square model input size in pixels
    pub input_size: u32,
    /// Maximum number of regions returned per detector call
    pub max_detections: usize,
    /// Second-pass detections must score strictly above this (0.0-1.0)
    pub score_threshold: f32,
    /// Pixels added around each candidate block before cropping
    pub margin_px: u32,
    /// Label of the first-pass regions that become candidate blocks
    pub block_type: String,
}

impl Default for TableDetectionConfig {
    fn default() -> Self {
        Self {
            model_path: None,
            label_map: BTreeMap::from([(0, DEFAULT_BLOCK_TYPE.to_string())]),
            model_score_threshold: 0.05,
            iou_threshold: 0.5,
            input_size: 640,
            max_detections: 100,
            score_threshold: 0.5,
            margin_px: 0,
            block_type: DEFAULT_BLOCK_TYPE.to_string(),
        }
    }
}

impl TableDetectionConfig {
    /// Only keep high-confidence second-pass detections
    #[must_use]
    pub fn strict() -> Self {
        Self {
            score_threshold: 0.8,
            ..Default::default()
        }
    }

    /// Wider crops and a lower bar, for faint or borderless tables
    #[must_use]
    pub fn recall() -> Self {
        Self {
            score_threshold: 0.3,
            margin_px: 16,
            ..Default::default()
        }
    }

    /// Load configuration from a YAML file
    pub fn from_yaml(yaml_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_path = yaml_path.as_ref();
        let contents = std::fs::read_to_string(yaml_path).map_err(|e| {
            DetectionError::Config(format!("Failed to read {}: {e}", yaml_path.display()))
        })?;
        let config = Self::from_yaml_str(&contents)?;
        debug!("Loaded detection config from {}", yaml_path.display());
        Ok(config)
    }

    /// Parse and validate configuration from YAML text
    pub fn from_yaml_str(contents: &str) -> Result<Self> {
        let config: Self = serde_yaml::from_str(contents)
            .map_err(|e| DetectionError::Config(format!("Failed to parse YAML: {e}")))?;
        config.validate()?;
        Ok(config)
    }

    /// Check value ranges
    pub fn validate(&self) -> Result<()> {
        for (name, value) in [
            ("model_score_threshold", self.model_score_threshold),
            ("iou_threshold", self.iou_threshold),
            ("score_threshold", self.score_threshold),
        ] {
            if !(0.0..=1.0).contains(&value) {
                return Err(DetectionError::Config(format!(
                    "{name} must be within 0.0-1.0, got {value}"
                )));
            }
        }
        if self.input_size == 0 {
            return Err(DetectionError::Config("input_size must be positive".to_string()));
        }
        if self.label_map.is_empty() {
            return Err(DetectionError::Config("label_map is empty".to_string()));
        }
        if self.block_type.is_empty() {
            return Err(DetectionError::Config("block_type is empty".to_string()));
        }
        Ok(())
    }

    /// Label for a model class index
    #[must_use]
    pub fn label_for(&self, class_id: u32) -> Option<&str> {
        self.label_map.get(&class_id).map(String::as_str)
    }
}
