//! Writing merged tables to disk

use anyhow::{Context as _, Result};
use image::RgbImage;
use std::path::{Path, PathBuf};
use table_extract_common::save_image;
use table_extract_geometry::BoundingBoxes;
use tracing::{info, warn};

/// File name for the `index`-th table (1-based)
pub fn table_file_name(index: usize) -> String {
    format!("cropped_table_{index}.jpg")
}

/// Crop every box out of `image` and save it under `output_dir`
///
/// Boxes whose crop is empty (entirely outside the page) are skipped with a
/// warning; numbering still follows the box position.
pub fn save_tables(
    tables: &BoundingBoxes,
    image: &RgbImage,
    output_dir: &Path,
) -> Result<Vec<PathBuf>> {
    let mut saved = Vec::with_capacity(tables.len());

    for (i, table) in tables.iter().enumerate() {
        let index = i + 1;
        info!("BoundingBox {}: {}", index, table);

        let cropped = table.crop_image(image);
        if cropped.width() == 0 || cropped.height() == 0 {
            warn!(
                "Table {} lies outside the {}x{} page, not saved",
                index,
                image.width(),
                image.height()
            );
            continue;
        }

        let output_path = output_dir.join(table_file_name(index));
        save_image(&cropped, &output_path)
            .with_context(|| format!("Failed to save table {index} to {}", output_path.display()))?;
        info!("Saved cropped table {} to {}", index, output_path.display());
        saved.push(output_path);
    }

    Ok(saved)
}
