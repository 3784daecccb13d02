/// Common types and utilities for table extraction
use image::RgbImage;
use std::path::Path;
use thiserror::Error;
use tracing::debug;

/// Processing errors
#[derive(Debug, Error)]
pub enum ProcessingError {
    #[error("Unsupported format: {0}")]
    UnsupportedFormat(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Image processing error: {0}")]
    ImageError(String),
}

impl From<image::ImageError> for ProcessingError {
    fn from(err: image::ImageError) -> Self {
        ProcessingError::ImageError(err.to_string())
    }
}

/// Result type for processing operations
pub type Result<T> = std::result::Result<T, ProcessingError>;

/// Load an image from disk and convert it to 8-bit RGB
pub fn load_image<P: AsRef<Path>>(path: P) -> Result<RgbImage> {
    let path = path.as_ref();
    if !path.is_file() {
        return Err(ProcessingError::IoError(std::io::Error::new(
            std::io::ErrorKind::NotFound,
            format!("{} is not a readable file", path.display()),
        )));
    }

    let img = image::open(path)?.to_rgb8();
    debug!(
        "Loaded {}x{} image from {}",
        img.width(),
        img.height(),
        path.display()
    );
    Ok(img)
}

/// Save an RGB image, picking the encoder from the file extension
///
/// Zero-sized images cannot be encoded by the JPEG/PNG writers and are
/// rejected up front.
pub fn save_image<P: AsRef<Path>>(image: &RgbImage, path: P) -> Result<()> {
    let path = path.as_ref();
    if image.width() == 0 || image.height() == 0 {
        return Err(ProcessingError::ImageError(format!(
            "refusing to write empty {}x{} image to {}",
            image.width(),
            image.height(),
            path.display()
        )));
    }

    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_lowercase)
        .unwrap_or_default();
    if !matches!(extension.as_str(), "jpg" | "jpeg" | "png") {
        return Err(ProcessingError::UnsupportedFormat(extension));
    }

    image.save(path)?;
    debug!("Wrote {}x{} image to {}", image.width(), image.height(), path.display());
    Ok(())
}

/// Create `dir` (and parents) when it does not exist yet
pub fn ensure_dir<P: AsRef<Path>>(dir: P) -> Result<()> {
    let dir = dir.as_ref();
    if !dir.exists() {
        std::fs::create_dir_all(dir)?;
        debug!("Created output directory {}", dir.display());
    }
    Ok(())
}
