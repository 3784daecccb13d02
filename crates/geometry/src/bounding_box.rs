use crate::{GeometryError, Result};
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Axis-aligned box in integer pixel coordinates with a confidence score
///
/// `(x1, y1)` is the top-left corner and `(x2, y2)` the bottom-right one.
/// Coordinates may be negative (margin arithmetic can push a box past the
/// image origin); they are only clamped when cropping.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "BoxRepr", into = "BoxRepr")]
pub struct BoundingBox {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    score: f32,
}

/// Wire form, validated on the way in
#[derive(Serialize, Deserialize)]
struct BoxRepr {
    x1: i32,
    y1: i32,
    x2: i32,
    y2: i32,
    #[serde(default)]
    score: f32,
}

impl TryFrom<BoxRepr> for BoundingBox {
    type Error = GeometryError;

    fn try_from(repr: BoxRepr) -> Result<Self> {
        Ok(Self::new(repr.x1, repr.y1, repr.x2, repr.y2)?.with_score(repr.score))
    }
}

impl From<BoundingBox> for BoxRepr {
    fn from(b: BoundingBox) -> Self {
        Self {
            x1: b.x1,
            y1: b.y1,
            x2: b.x2,
            y2: b.y2,
            score: b.score,
        }
    }
}

impl BoundingBox {
    /// Create a box with a zero score
    ///
    /// Fails when `x1 > x2` or `y1 > y2`. Zero-width and zero-height boxes
    /// are accepted.
    pub fn new(x1: i32, y1: i32, x2: i32, y2: i32) -> Result<Self> {
        if x1 > x2 || y1 > y2 {
            return Err(GeometryError::InvertedCoordinates { x1, y1, x2, y2 });
        }
        Ok(Self {
            x1,
            y1,
            x2,
            y2,
            score: 0.0,
        })
    }

    /// Build a box from a detector's floating-point coordinates
    ///
    /// Rounds outward: the top-left corner is floored and the bottom-right
    /// corner is ceiled, so the integer box always covers the detection.
    pub fn from_detection(coords: [f32; 4], score: f32) -> Result<Self> {
        let [x1, y1, x2, y2] = coords;
        Ok(Self::new(
            x1.floor() as i32,
            y1.floor() as i32,
            x2.ceil() as i32,
            y2.ceil() as i32,
        )?
        .with_score(score))
    }

    /// Convert a box found inside a cropped block into full-image coordinates
    ///
    /// `local` is `[x1, y1, x2, y2]` relative to the block's top-left corner.
    /// `block` is the block's absolute position, either `[x, y]` or
    /// `[x1, y1, x2, y2]`; only its first two values are used.
    pub fn from_relative(local: [i32; 4], block: &[i32], score: f32) -> Result<Self> {
        let (bx, by) = match block {
            [bx, by, ..] => (*bx, *by),
            _ => return Err(GeometryError::MissingOrigin(block.len())),
        };
        let [rx1, ry1, rx2, ry2] = local;
        Ok(Self::new(rx1, ry1, rx2, ry2)?
            .translate(bx, by)
            .with_score(score))
    }

    /// Return a copy carrying `score`
    #[must_use]
    pub fn with_score(mut self, score: f32) -> Self {
        self.score = score;
        self
    }

    #[must_use]
    #[inline]
    pub fn x1(&self) -> i32 {
        self.x1
    }

    #[must_use]
    #[inline]
    pub fn y1(&self) -> i32 {
        self.y1
    }

    #[must_use]
    #[inline]
    pub fn x2(&self) -> i32 {
        self.x2
    }

    #[must_use]
    #[inline]
    pub fn y2(&self) -> i32 {
        self.y2
    }

    /// Detection confidence (0 when the box did not come from a detector)
    #[must_use]
    #[inline]
    pub fn score(&self) -> f32 {
        self.score
    }

    #[must_use]
    pub fn width(&self) -> u32 {
        self.x2.abs_diff(self.x1)
    }

    #[must_use]
    pub fn height(&self) -> u32 {
        self.y2.abs_diff(self.y1)
    }

    #[must_use]
    pub fn area(&self) -> u64 {
        u64::from(self.width()) * u64::from(self.height())
    }

    /// Coordinates as `[x1, y1, x2, y2]`
    #[must_use]
    pub fn to_list(&self) -> [i32; 4] {
        [self.x1, self.y1, self.x2, self.y2]
    }

    /// Shift the box by `(dx, dy)`, keeping its score
    #[must_use]
    pub fn translate(&self, dx: i32, dy: i32) -> Self {
        Self {
            x1: self.x1.saturating_add(dx),
            y1: self.y1.saturating_add(dy),
            x2: self.x2.saturating_add(dx),
            y2: self.y2.saturating_add(dy),
            score: self.score,
        }
    }

    /// Grow the box by `margin` pixels on every side
    #[must_use]
    pub fn expand(&self, margin: u32) -> Self {
        let m = i32::try_from(margin).unwrap_or(i32::MAX);
        Self {
            x1: self.x1.saturating_sub(m),
            y1: self.y1.saturating_sub(m),
            x2: self.x2.saturating_add(m),
            y2: self.y2.saturating_add(m),
            score: self.score,
        }
    }

    /// Clamp the box into `[0, width] x [0, height]`
    #[must_use]
    pub fn clamp_to(&self, width: u32, height: u32) -> Self {
        let w = i32::try_from(width).unwrap_or(i32::MAX);
        let h = i32::try_from(height).unwrap_or(i32::MAX);
        Self {
            x1: self.x1.clamp(0, w),
            y1: self.y1.clamp(0, h),
            x2: self.x2.clamp(0, w),
            y2: self.y2.clamp(0, h),
            score: self.score,
        }
    }

    /// Whether two boxes overlap or touch
    ///
    /// Boxes sharing only an edge or a corner count as intersecting.
    #[must_use]
    #[inline]
    pub fn intersects(&self, other: &BoundingBox) -> bool {
        !(self.x2 < other.x1 || self.x1 > other.x2 || self.y2 < other.y1 || self.y1 > other.y2)
    }

    /// Smallest box enclosing both inputs, scored with the higher confidence
    #[must_use]
    pub fn merge(&self, other: &BoundingBox) -> Self {
        Self {
            x1: self.x1.min(other.x1),
            y1: self.y1.min(other.y1),
            x2: self.x2.max(other.x2),
            y2: self.y2.max(other.y2),
            score: self.score.max(other.score),
        }
    }

    /// Cut this box out of `image`
    ///
    /// The box is clamped to the image first, so boxes that start at a
    /// negative offset or run past the right/bottom edge still crop cleanly.
    /// A box lying fully outside the image yields an empty image.
    #[must_use]
    pub fn crop_image(&self, image: &RgbImage) -> RgbImage {
        let (width, height) = image.dimensions();
        let clamped = self.clamp_to(width, height);
        let (w, h) = (clamped.width(), clamped.height());
        if w == 0 || h == 0 {
            return RgbImage::new(w, h);
        }
        image::imageops::crop_imm(image, clamped.x1 as u32, clamped.y1 as u32, w, h).to_image()
    }
}

impl fmt::Display for BoundingBox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "BoundingBox(x1={}, y1={}, x2={}, y2={}, score={})",
            self.x1, self.y1, self.x2, self.y2, self.score
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    fn bbox(x1: i32, y1: i32, x2: i32, y2: i32) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2).unwrap()
    }

    #[test]
    fn test_new_rejects_inverted() {
        assert_eq!(
            BoundingBox::new(10, 0, 5, 5),
            Err(GeometryError::InvertedCoordinates {
                x1: 10,
                y1: 0,
                x2: 5,
                y2: 5
            })
        );
        assert!(BoundingBox::new(0, 10, 5, 5).is_err());
        // Degenerate boxes are allowed
        assert!(BoundingBox::new(3, 3, 3, 3).is_ok());
    }

    #[test]
    fn test_to_list_order() {
        assert_eq!(bbox(1, 2, 3, 4).to_list(), [1, 2, 3, 4]);
    }

    #[test]
    fn test_translate_keeps_score() {
        let b = bbox(1, 2, 3, 4).with_score(0.4);
        let moved = b.translate(10, -2);
        assert_eq!(moved.to_list(), [11, 0, 13, 2]);
        assert_eq!(moved.score(), 0.4);
        // Source value untouched
        assert_eq!(b.to_list(), [1, 2, 3, 4]);
    }

    #[test]
    fn test_translate_composes() {
        let b = bbox(5, 6, 20, 30).with_score(0.2);
        assert_eq!(b.translate(3, -4).translate(-7, 9), b.translate(-4, 5));
    }

    #[test]
    fn test_from_relative_two_element_origin() {
        let b = BoundingBox::from_relative([2, 3, 10, 12], &[100, 200], 0.9).unwrap();
        assert_eq!(b, bbox(102, 203, 110, 212).with_score(0.9));
    }

    #[test]
    fn test_from_relative_uses_only_block_origin() {
        let b = BoundingBox::from_relative([0, 0, 5, 5], &[40, 50, 400, 500], 0.0).unwrap();
        assert_eq!(b.to_list(), [40, 50, 45, 55]);
    }

    #[test]
    fn test_from_relative_missing_origin() {
        assert_eq!(
            BoundingBox::from_relative([0, 0, 1, 1], &[7], 0.5),
            Err(GeometryError::MissingOrigin(1))
        );
    }

    #[test]
    fn test_from_detection_rounds_outward() {
        let b = BoundingBox::from_detection([1.7, 2.2, 9.1, 11.0], 0.8).unwrap();
        assert_eq!(b.to_list(), [1, 2, 10, 11]);
        assert_eq!(b.score(), 0.8);

        let neg = BoundingBox::from_detection([-0.5, -1.5, 3.2, 4.0], 0.1).unwrap();
        assert_eq!(neg.to_list(), [-1, -2, 4, 4]);
    }

    #[test]
    fn test_intersects_overlap_and_disjoint() {
        let a = bbox(0, 0, 10, 10);
        assert!(a.intersects(&bbox(5, 5, 15, 15)));
        assert!(a.intersects(&bbox(2, 2, 3, 3)));
        assert!(!a.intersects(&bbox(11, 0, 20, 10)));
        assert!(!a.intersects(&bbox(0, 11, 10, 20)));
    }

    #[test]
    fn test_intersects_touching() {
        // Single shared corner
        assert!(bbox(0, 0, 5, 5).intersects(&bbox(5, 5, 10, 10)));
        // Shared edge
        assert!(bbox(0, 0, 5, 5).intersects(&bbox(5, 0, 10, 5)));
        // One pixel gap
        assert!(!bbox(0, 0, 5, 5).intersects(&bbox(6, 0, 10, 5)));
    }

    #[test]
    fn test_intersects_is_symmetric() {
        let a = bbox(0, 0, 4, 4);
        let b = bbox(4, 2, 8, 3);
        assert_eq!(a.intersects(&b), b.intersects(&a));
    }

    #[test]
    fn test_merge_encloses_and_takes_max_score() {
        let a = bbox(0, 5, 10, 10).with_score(0.3);
        let b = bbox(4, 0, 12, 8).with_score(0.95);
        let m = a.merge(&b);
        assert_eq!(m.to_list(), [0, 0, 12, 10]);
        assert_eq!(m.score(), 0.95);
        assert_eq!(b.merge(&a), m);
    }

    #[test]
    fn test_expand_and_clamp() {
        let b = bbox(2, 3, 20, 30).with_score(0.5);
        let grown = b.expand(5);
        assert_eq!(grown.to_list(), [-3, -2, 25, 35]);
        assert_eq!(grown.score(), 0.5);

        let clamped = grown.clamp_to(22, 40);
        assert_eq!(clamped.to_list(), [0, 0, 22, 35]);
    }

    #[test]
    fn test_clamp_box_outside_image() {
        let clamped = bbox(50, 50, 60, 60).clamp_to(40, 40);
        assert_eq!(clamped.to_list(), [40, 40, 40, 40]);
        assert_eq!(clamped.area(), 0);
    }

    #[test]
    fn test_dimensions() {
        let b = bbox(-4, 2, 6, 7);
        assert_eq!(b.width(), 10);
        assert_eq!(b.height(), 5);
        assert_eq!(b.area(), 50);
    }

    #[test]
    fn test_crop_image_inside() {
        let img = RgbImage::from_fn(8, 6, |x, y| Rgb([x as u8, y as u8, 0]));
        let crop = bbox(2, 1, 5, 4).crop_image(&img);
        assert_eq!(crop.dimensions(), (3, 3));
        assert_eq!(crop.get_pixel(0, 0), &Rgb([2, 1, 0]));
        assert_eq!(crop.get_pixel(2, 2), &Rgb([4, 3, 0]));
    }

    #[test]
    fn test_crop_image_clamps_out_of_bounds() {
        let (w, h) = (30u32, 20u32);
        let img = RgbImage::from_fn(w, h, |x, y| Rgb([x as u8, y as u8, 7]));
        let crop = bbox(-5, 0, w as i32 + 5, h as i32).crop_image(&img);
        assert_eq!(crop.dimensions(), (w, h));
        assert_eq!(crop.get_pixel(0, 0), &Rgb([0, 0, 7]));
        assert_eq!(crop.get_pixel(w - 1, h - 1), &Rgb([29, 19, 7]));
    }

    #[test]
    fn test_crop_image_outside_is_empty() {
        let img = RgbImage::new(10, 10);
        let crop = bbox(20, 20, 30, 30).crop_image(&img);
        assert_eq!(crop.width() * crop.height(), 0);
    }

    #[test]
    fn test_display() {
        let b = bbox(1, 2, 3, 4).with_score(0.5);
        assert_eq!(
            b.to_string(),
            "BoundingBox(x1=1, y1=2, x2=3, y2=4, score=0.5)"
        );
    }
}
