//! Bounding-box algebra for detected table regions
//!
//! This crate holds the geometric core of the table extraction pipeline:
//! an integer, axis-aligned [`BoundingBox`] carrying a confidence score, and
//! a [`BoundingBoxes`] collection that collapses overlapping detections into
//! a set of disjoint regions.
//!
//! # Example
//! ```
//! use table_extract_geometry::{BoundingBox, BoundingBoxes};
//!
//! # fn main() -> Result<(), table_extract_geometry::GeometryError> {
//! let mut boxes = BoundingBoxes::new();
//! boxes.add_box(BoundingBox::new(0, 0, 10, 10)?.with_score(0.7));
//! boxes.add_box(BoundingBox::new(5, 5, 15, 15)?.with_score(0.9));
//! boxes.add_box(BoundingBox::new(40, 40, 50, 50)?);
//!
//! boxes.merge_intersection();
//!
//! assert_eq!(boxes.len(), 2);
//! assert_eq!(boxes.boxes()[0].to_list(), [0, 0, 15, 15]);
//! assert_eq!(boxes.boxes()[0].score(), 0.9);
//! # Ok(())
//! # }
//! ```

mod bounding_box;
mod collection;

pub use bounding_box::BoundingBox;
pub use collection::BoundingBoxes;

use thiserror::Error;

/// Errors raised when constructing boxes
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GeometryError {
    #[error("Inverted box coordinates: ({x1}, {y1}, {x2}, {y2}) requires x1 <= x2 and y1 <= y2")]
    InvertedCoordinates { x1: i32, y1: i32, x2: i32, y2: i32 },

    #[error("Block coordinates need at least an (x, y) origin, got {0} values")]
    MissingOrigin(usize),
}

/// Result type for geometry operations
pub type Result<T> = std::result::Result<T, GeometryError>;
