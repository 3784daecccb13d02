//! Capability interface the pipeline needs from a layout model

use crate::Result;
use image::RgbImage;
use serde::{Deserialize, Serialize};

/// One region reported by a layout model
pub trait LayoutRegion {
    /// Class label, e.g. `"Table"`
    fn label(&self) -> &str;

    /// Confidence score (0-1)
    fn score(&self) -> f32;

    /// `[x1, y1, x2, y2]` in pixels of the image the detector was given
    fn coordinates(&self) -> [f32; 4];
}

/// A layout model that finds labelled regions in an image
pub trait LayoutDetector {
    type Region: LayoutRegion;

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Self::Region>>;
}

impl<D: LayoutDetector + ?Sized> LayoutDetector for Box<D> {
    type Region = D::Region;

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<Self::Region>> {
        (**self).detect(image)
    }
}

/// Plain layout region, as produced by [`crate::OnnxLayoutDetector`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DetectedRegion {
    pub label: String,
    pub score: f32,
    /// `[x1, y1, x2, y2]` in image pixels
    pub bbox: [f32; 4],
}

impl DetectedRegion {
    #[must_use]
    pub fn new(label: impl Into<String>, score: f32, bbox: [f32; 4]) -> Self {
        Self {
            label: label.into(),
            score,
            bbox,
        }
    }

    #[must_use]
    #[inline]
    pub fn area(&self) -> f32 {
        let [x1, y1, x2, y2] = self.bbox;
        (x2 - x1).max(0.0) * (y2 - y1).max(0.0)
    }

    /// Intersection over Union with another region
    #[must_use]
    #[inline]
    pub fn iou(&self, other: &DetectedRegion) -> f32 {
        let x1 = self.bbox[0].max(other.bbox[0]);
        let y1 = self.bbox[1].max(other.bbox[1]);
        let x2 = self.bbox[2].min(other.bbox[2]);
        let y2 = self.bbox[3].min(other.bbox[3]);

        let intersection_area = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
        let union_area = self.area() + other.area() - intersection_area;

        if union_area > 0.0 {
            intersection_area / union_area
        } else {
            0.0
        }
    }
}

impl LayoutRegion for DetectedRegion {
    fn label(&self) -> &str {
        &self.label
    }

    fn score(&self) -> f32 {
        self.score
    }

    fn coordinates(&self) -> [f32; 4] {
        self.bbox
    }
}
