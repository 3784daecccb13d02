//! Two-pass table detection on document images
//!
//! A layout model is run once over the full page to find candidate table
//! blocks. Each block is cropped (with an optional margin) and run through
//! the model again; the refined detections are projected back into page
//! coordinates and collected into a [`BoundingBoxes`] set, ready for
//! [`BoundingBoxes::merge_intersection`].
//!
//! The model is reached only through the [`LayoutDetector`] trait.
//! [`OnnxLayoutDetector`] is the bundled implementation for layout models
//! exported to ONNX.
//!
//! # Example
//! ```no_run
//! use table_extract_detection::{OnnxLayoutDetector, TableDetectionConfig, TablePipeline};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = TableDetectionConfig::default();
//! let mut detector = OnnxLayoutDetector::new("models/table_layout.onnx", config.clone())?;
//!
//! let page = image::open("page.png")?.to_rgb8();
//! let tables = TablePipeline::new(config).extract(&mut detector, &page)?;
//!
//! for (i, table) in tables.iter().enumerate() {
//!     println!("table {}: {}", i + 1, table);
//! }
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod detector;
pub mod onnx;
pub mod pipeline;

pub use config::TableDetectionConfig;
pub use detector::{DetectedRegion, LayoutDetector, LayoutRegion};
pub use onnx::OnnxLayoutDetector;
pub use pipeline::{
    detect_candidate_blocks, get_all_tables, second_pass_detect, second_pass_detect_parallel,
    CandidateBlock, TablePipeline,
};
pub use table_extract_geometry::{BoundingBox, BoundingBoxes, GeometryError};

use thiserror::Error;

/// Error types for table detection
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Failed to load model: {0}")]
    ModelLoad(String),

    #[error("Inference error: {0}")]
    Inference(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Invalid geometry: {0}")]
    Geometry(#[from] GeometryError),

    #[error("ONNX Runtime error: {0}")]
    OnnxRuntime(#[from] ort::Error),
}

/// Result type for detection operations
pub type Result<T> = std::result::Result<T, DetectionError>;
