use crate::BoundingBox;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::debug;

/// Ordered collection of boxes gathered across detection passes
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct BoundingBoxes {
    boxes: Vec<BoundingBox>,
}

impl BoundingBoxes {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a box to the end of the collection
    pub fn add_box(&mut self, bbox: BoundingBox) {
        self.boxes.push(bbox);
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.boxes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.boxes.is_empty()
    }

    /// Current boxes, in insertion order until merged
    #[must_use]
    pub fn boxes(&self) -> &[BoundingBox] {
        &self.boxes
    }

    #[must_use]
    pub fn into_boxes(self) -> Vec<BoundingBox> {
        self.boxes
    }

    pub fn iter(&self) -> std::slice::Iter<'_, BoundingBox> {
        self.boxes.iter()
    }

    /// Collapse every chain of intersecting boxes into its enclosing box
    ///
    /// Afterwards no two boxes in the collection intersect. Each merged box
    /// keeps the highest score of the boxes it absorbed. Output order follows
    /// processing order (first box of each group), not spatial order.
    pub fn merge_intersection(&mut self) {
        let input_len = self.boxes.len();
        let mut passes = 0usize;

        loop {
            passes += 1;
            let before = self.boxes.len();
            self.boxes = merge_pass(std::mem::take(&mut self.boxes));
            // A pass that merged nothing has compared every remaining pair
            if self.boxes.len() == before {
                break;
            }
        }

        debug!(
            "Merged {} boxes into {} in {} pass(es)",
            input_len,
            self.boxes.len(),
            passes
        );
    }
}

/// One sweep over the arena: every seed absorbs all pending boxes that touch
/// its growing accumulator, rescanning until the accumulator stops growing.
fn merge_pass(arena: Vec<BoundingBox>) -> Vec<BoundingBox> {
    let mut pending: Vec<Option<BoundingBox>> = arena.into_iter().map(Some).collect();
    let mut resolved = Vec::with_capacity(pending.len());

    for seed_idx in 0..pending.len() {
        let Some(mut acc) = pending[seed_idx].take() else {
            continue;
        };

        loop {
            let mut grew = false;
            for slot in pending.iter_mut().skip(seed_idx + 1) {
                if let Some(candidate) = *slot {
                    if acc.intersects(&candidate) {
                        acc = acc.merge(&candidate);
                        *slot = None;
                        grew = true;
                    }
                }
            }
            if !grew {
                break;
            }
        }

        resolved.push(acc);
    }

    resolved
}

impl From<Vec<BoundingBox>> for BoundingBoxes {
    fn from(boxes: Vec<BoundingBox>) -> Self {
        Self { boxes }
    }
}

impl FromIterator<BoundingBox> for BoundingBoxes {
    fn from_iter<I: IntoIterator<Item = BoundingBox>>(iter: I) -> Self {
        Self {
            boxes: iter.into_iter().collect(),
        }
    }
}

impl Extend<BoundingBox> for BoundingBoxes {
    fn extend<I: IntoIterator<Item = BoundingBox>>(&mut self, iter: I) {
        self.boxes.extend(iter);
    }
}

impl IntoIterator for BoundingBoxes {
    type Item = BoundingBox;
    type IntoIter = std::vec::IntoIter<BoundingBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.boxes.into_iter()
    }
}

impl<'a> IntoIterator for &'a BoundingBoxes {
    type Item = &'a BoundingBox;
    type IntoIter = std::slice::Iter<'a, BoundingBox>;

    fn into_iter(self) -> Self::IntoIter {
        self.boxes.iter()
    }
}

impl fmt::Display for BoundingBoxes {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "BoundingBoxes({} boxes)", self.boxes.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bbox(x1: i32, y1: i32, x2: i32, y2: i32) -> BoundingBox {
        BoundingBox::new(x1, y1, x2, y2).unwrap()
    }

    fn assert_disjoint(boxes: &BoundingBoxes) {
        let all = boxes.boxes();
        for (i, a) in all.iter().enumerate() {
            for b in &all[i + 1..] {
                assert!(!a.intersects(b), "{a} still intersects {b}");
            }
        }
    }

    #[test]
    fn test_add_box_appends() {
        let mut boxes = BoundingBoxes::new();
        assert!(boxes.is_empty());
        boxes.add_box(bbox(0, 0, 1, 1));
        boxes.add_box(bbox(5, 5, 6, 6));
        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes.boxes()[1].to_list(), [5, 5, 6, 6]);
    }

    #[test]
    fn test_merge_empty_and_single() {
        let mut empty = BoundingBoxes::new();
        empty.merge_intersection();
        assert!(empty.is_empty());

        let single_box = bbox(3, 4, 5, 6).with_score(0.4);
        let mut single = BoundingBoxes::from(vec![single_box]);
        single.merge_intersection();
        assert_eq!(single.boxes(), &[single_box]);
    }

    #[test]
    fn test_merge_chain_through_grown_box() {
        // Third box only touches the union of the first two
        let mut boxes = BoundingBoxes::from(vec![
            bbox(0, 0, 10, 10),
            bbox(5, 5, 15, 15),
            bbox(12, 12, 20, 20),
        ]);
        boxes.merge_intersection();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes.boxes()[0].to_list(), [0, 0, 20, 20]);
    }

    #[test]
    fn test_merge_rescans_earlier_candidates() {
        // (30,0,40,5) sits before the box that grows the seed to reach it
        let mut boxes = BoundingBoxes::from(vec![
            bbox(0, 0, 10, 10),
            bbox(30, 0, 40, 5),
            bbox(8, 0, 30, 3),
        ]);
        boxes.merge_intersection();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes.boxes()[0].to_list(), [0, 0, 40, 10]);
    }

    #[test]
    fn test_merge_later_group_swallowing_resolved_box() {
        // The last two boxes combine into one covering the first
        let mut boxes = BoundingBoxes::from(vec![
            bbox(5, 5, 6, 6).with_score(0.2),
            bbox(0, 0, 4, 12).with_score(0.6),
            bbox(0, 10, 12, 12).with_score(0.4),
        ]);
        boxes.merge_intersection();
        assert_eq!(boxes.len(), 1);
        assert_eq!(boxes.boxes()[0].to_list(), [0, 0, 12, 12]);
        assert_eq!(boxes.boxes()[0].score(), 0.6);
    }

    #[test]
    fn test_merge_keeps_disjoint_groups_in_processing_order() {
        let mut boxes = BoundingBoxes::from(vec![
            bbox(100, 100, 120, 120).with_score(0.7),
            bbox(0, 0, 10, 10).with_score(0.5),
            bbox(110, 110, 130, 130).with_score(0.9),
            bbox(5, 5, 12, 12).with_score(0.6),
        ]);
        boxes.merge_intersection();

        assert_eq!(boxes.len(), 2);
        assert_eq!(boxes.boxes()[0].to_list(), [100, 100, 130, 130]);
        assert_eq!(boxes.boxes()[0].score(), 0.9);
        assert_eq!(boxes.boxes()[1].to_list(), [0, 0, 12, 12]);
        assert_eq!(boxes.boxes()[1].score(), 0.6);
        assert_disjoint(&boxes);
    }

    #[test]
    fn test_merge_touching_boxes() {
        let mut boxes = BoundingBoxes::from(vec![bbox(0, 0, 5, 5), bbox(5, 5, 10, 10)]);
        boxes.merge_intersection();
        assert_eq!(boxes.boxes(), &[bbox(0, 0, 10, 10)]);
    }

    #[test]
    fn test_merge_is_idempotent() {
        let mut boxes = BoundingBoxes::from(vec![
            bbox(0, 0, 10, 10),
            bbox(20, 20, 30, 30),
            bbox(9, 9, 21, 21),
            bbox(50, 0, 60, 5),
        ]);
        boxes.merge_intersection();
        let once = boxes.clone();
        boxes.merge_intersection();
        assert_eq!(boxes, once);
    }

    #[test]
    fn test_iteration_and_collect() {
        let boxes: BoundingBoxes = (0..3).map(|i| bbox(i * 10, 0, i * 10 + 5, 5)).collect();
        assert_eq!(boxes.iter().count(), 3);
        assert_eq!((&boxes).into_iter().map(BoundingBox::x1).sum::<i32>(), 30);

        let mut extended = boxes.clone();
        extended.extend(vec![bbox(100, 100, 101, 101)]);
        assert_eq!(extended.len(), 4);
        assert_eq!(extended.into_boxes().len(), 4);
        assert_eq!(boxes.to_string(), "BoundingBoxes(3 boxes)");
    }
}
