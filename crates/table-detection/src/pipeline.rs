//! Two-pass detection: full page, then each candidate block on its own
//!
//! Second-pass boxes are found in the block's local coordinates and are
//! projected back with [`BoundingBox::from_relative`], anchored at the
//! block's top-left corner in the page.

use crate::detector::{LayoutDetector, LayoutRegion};
use crate::{Result, TableDetectionConfig};
use image::RgbImage;
use rayon::prelude::*;
use std::time::Instant;
use table_extract_geometry::{BoundingBox, BoundingBoxes};
use tracing::{debug, info, warn};

/// A first-pass region cropped out of the page
#[derive(Debug, Clone)]
pub struct CandidateBlock {
    /// Pixels of the block (margin included)
    pub image: RgbImage,
    /// Where the crop sits in the page
    pub bbox: BoundingBox,
}

/// Run the detector over the whole page and crop every `block_type` region
///
/// Each region is rounded outward to whole pixels, grown by `margin_px` on
/// all sides and clamped to the page before cropping. Regions with another
/// label, or that end up empty after clamping, are dropped.
pub fn detect_candidate_blocks<D: LayoutDetector + ?Sized>(
    detector: &mut D,
    image: &RgbImage,
    margin_px: u32,
    block_type: &str,
) -> Result<Vec<CandidateBlock>> {
    let (width, height) = image.dimensions();
    let regions = detector.detect(image)?;
    let total = regions.len();

    let mut blocks = Vec::new();
    for region in regions {
        if region.label() != block_type {
            continue;
        }

        let bbox = match BoundingBox::from_detection(region.coordinates(), region.score()) {
            Ok(b) => b.expand(margin_px).clamp_to(width, height),
            Err(e) => {
                warn!("Skipping malformed {} region: {}", region.label(), e);
                continue;
            }
        };
        if bbox.area() == 0 {
            debug!("Skipping {} region outside the page: {}", block_type, bbox);
            continue;
        }

        blocks.push(CandidateBlock {
            image: bbox.crop_image(image),
            bbox,
        });
    }

    info!(
        "First pass: {} of {} regions kept as '{}' candidate blocks",
        blocks.len(),
        total,
        block_type
    );
    Ok(blocks)
}

/// Re-run the detector on every candidate block
///
/// Detections scoring at or below `score_threshold` are discarded; the rest
/// are converted to page coordinates. Nothing is deduplicated here. A block
/// whose detector call fails is logged and contributes no boxes.
pub fn second_pass_detect<D: LayoutDetector + ?Sized>(
    detector: &mut D,
    blocks: &[CandidateBlock],
    score_threshold: f32,
) -> BoundingBoxes {
    let mut all_boxes = BoundingBoxes::new();
    for (idx, block) in blocks.iter().enumerate() {
        all_boxes.extend(detect_in_block(detector, idx, block, score_threshold));
    }

    info!(
        "Second pass: {} boxes from {} candidate blocks",
        all_boxes.len(),
        blocks.len()
    );
    all_boxes
}

/// [`second_pass_detect`] with blocks spread over the rayon pool
///
/// `make_detector` is called once per worker so no detector is shared
/// between threads. Results are concatenated in block order, matching the
/// sequential version. An error from `make_detector` is returned unchanged.
pub fn second_pass_detect_parallel<D, F>(
    make_detector: F,
    blocks: &[CandidateBlock],
    score_threshold: f32,
) -> Result<BoundingBoxes>
where
    D: LayoutDetector,
    F: Fn() -> Result<D> + Sync + Send,
{
    // Each worker builds its detector on first use; a failed build is
    // retried on the worker's next block
    let per_block = blocks
        .par_iter()
        .enumerate()
        .map_init(
            || None,
            |slot: &mut Option<D>, (idx, block)| -> Result<Vec<BoundingBox>> {
                let detector = match slot {
                    Some(detector) => detector,
                    None => slot.insert(make_detector()?),
                };
                Ok(detect_in_block(detector, idx, block, score_threshold))
            },
        )
        .collect::<Result<Vec<Vec<BoundingBox>>>>()?;

    let all_boxes: BoundingBoxes = per_block.into_iter().flatten().collect();
    info!(
        "Second pass (parallel): {} boxes from {} candidate blocks",
        all_boxes.len(),
        blocks.len()
    );
    Ok(all_boxes)
}

fn detect_in_block<D: LayoutDetector + ?Sized>(
    detector: &mut D,
    idx: usize,
    block: &CandidateBlock,
    score_threshold: f32,
) -> Vec<BoundingBox> {
    let regions = match detector.detect(&block.image) {
        Ok(regions) => regions,
        Err(e) => {
            warn!("Detection failed on candidate block {} ({}): {}", idx, block.bbox, e);
            return Vec::new();
        }
    };

    let origin = block.bbox.to_list();
    let mut boxes = Vec::new();
    for region in regions.iter().filter(|r| r.score() > score_threshold) {
        let projected = BoundingBox::from_detection(region.coordinates(), region.score())
            .and_then(|local| BoundingBox::from_relative(local.to_list(), &origin, local.score()));
        match projected {
            Ok(b) => boxes.push(b),
            Err(e) => warn!("Skipping malformed detection in block {}: {}", idx, e),
        }
    }

    debug!(
        "Block {}: {} of {} detections above {}",
        idx,
        boxes.len(),
        regions.len(),
        score_threshold
    );
    boxes
}

/// Both passes over one page; the result still needs `merge_intersection`
///
/// A failure of the full-page detector call is returned to the caller.
pub fn get_all_tables<D: LayoutDetector + ?Sized>(
    detector: &mut D,
    image: &RgbImage,
    score_threshold: f32,
    margin_px: u32,
    block_type: &str,
) -> Result<BoundingBoxes> {
    let blocks = detect_candidate_blocks(detector, image, margin_px, block_type)?;
    Ok(second_pass_detect(detector, &blocks, score_threshold))
}

/// Configured two-pass extraction that returns merged, disjoint table boxes
#[derive(Debug, Clone, Default)]
pub struct TablePipeline {
    config: TableDetectionConfig,
}

impl TablePipeline {
    #[must_use]
    pub fn new(config: TableDetectionConfig) -> Self {
        Self { config }
    }

    #[must_use]
    pub fn config(&self) -> &TableDetectionConfig {
        &self.config
    }

    /// Detect, project and merge the tables on one page
    pub fn extract<D: LayoutDetector + ?Sized>(
        &self,
        detector: &mut D,
        image: &RgbImage,
    ) -> Result<BoundingBoxes> {
        let start = Instant::now();
        let mut tables = get_all_tables(
            detector,
            image,
            self.config.score_threshold,
            self.config.margin_px,
            &self.config.block_type,
        )?;
        tables.merge_intersection();

        info!(
            "Extracted {} tables in {:.2?}",
            tables.len(),
            start.elapsed()
        );
        Ok(tables)
    }

    /// Like [`TablePipeline::extract`], with the second pass run in parallel
    pub fn extract_parallel<D, F>(&self, make_detector: F, image: &RgbImage) -> Result<BoundingBoxes>
    where
        D: LayoutDetector,
        F: Fn() -> Result<D> + Sync + Send,
    {
        let start = Instant::now();
        let mut first_pass = make_detector()?;
        let blocks = detect_candidate_blocks(
            &mut first_pass,
            image,
            self.config.margin_px,
            &self.config.block_type,
        )?;
        drop(first_pass);

        let mut tables =
            second_pass_detect_parallel(make_detector, &blocks, self.config.score_threshold)?;
        tables.merge_intersection();

        info!(
            "Extracted {} tables in {:.2?}",
            tables.len(),
            start.elapsed()
        );
        Ok(tables)
    }
}
