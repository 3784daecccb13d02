//! Layout detector backed by ONNX Runtime
//!
//! Expects a single-output model in YOLO layout: `(1, 4 + classes, anchors)`
//! where the first four features are `[x_center, y_center, width, height]`
//! in model-input pixels and the rest are per-class scores. Class indices
//! are mapped to labels through [`TableDetectionConfig::label_map`].

use crate::detector::{DetectedRegion, LayoutDetector};
use crate::{DetectionError, Result, TableDetectionConfig};
use image::RgbImage;
use ndarray::Array;
use ort::{
    session::{Session, SessionOutputs},
    value::TensorRef,
};
use std::path::Path;
use tracing::{debug, info};

/// Layout model session plus the configuration it decodes with
pub struct OnnxLayoutDetector {
    session: Session,
    config: TableDetectionConfig,
}

impl OnnxLayoutDetector {
    /// Create a detector from an ONNX model file
    pub fn new<P: AsRef<Path>>(model_path: P, config: TableDetectionConfig) -> Result<Self> {
        config.validate()?;
        info!("Loading layout model from {:?}", model_path.as_ref());

        let session = Session::builder()
            .map_err(|e| DetectionError::ModelLoad(e.to_string()))?
            .commit_from_file(model_path)
            .map_err(|e| DetectionError::ModelLoad(e.to_string()))?;

        info!("Layout model loaded successfully");

        Ok(Self { session, config })
    }

    /// Create a detector from `config.model_path`
    pub fn from_config(config: TableDetectionConfig) -> Result<Self> {
        let model_path = config
            .model_path
            .clone()
            .ok_or_else(|| DetectionError::Config("model_path is not set".to_string()))?;
        Self::new(model_path, config)
    }

    #[must_use]
    pub fn config(&self) -> &TableDetectionConfig {
        &self.config
    }

    /// Detect layout regions using a pre-loaded ONNX session
    pub fn detect_with_session(
        session: &mut Session,
        image: &RgbImage,
        config: &TableDetectionConfig,
    ) -> Result<Vec<DetectedRegion>> {
        debug!(
            "Running layout detection on {}x{} image",
            image.width(),
            image.height()
        );
        if image.width() == 0 || image.height() == 0 {
            return Ok(Vec::new());
        }

        let input_array = Self::preprocess_image(image, config.input_size);
        let outputs = Self::run_inference(session, &input_array)?;
        let regions = Self::postprocess_outputs(&outputs, image.width(), image.height(), config)?;

        debug!("Detected {} layout regions", regions.len());

        Ok(regions)
    }

    /// Resize to the model input and convert to normalized CHW `(1, 3, H, W)`
    fn preprocess_image(image: &RgbImage, input_size: u32) -> Array<f32, ndarray::Dim<[usize; 4]>> {
        let resized = image::imageops::resize(
            image,
            input_size,
            input_size,
            image::imageops::FilterType::Triangle,
        );

        let size = input_size as usize;
        let mut input_array = Array::zeros((1, 3, size, size));
        for (x, y, pixel) in resized.enumerate_pixels() {
            let (x, y) = (x as usize, y as usize);
            input_array[[0, 0, y, x]] = f32::from(pixel[0]) / 255.0;
            input_array[[0, 1, y, x]] = f32::from(pixel[1]) / 255.0;
            input_array[[0, 2, y, x]] = f32::from(pixel[2]) / 255.0;
        }

        input_array
    }

    fn run_inference<'a>(
        session: &'a mut Session,
        input: &Array<f32, ndarray::Dim<[usize; 4]>>,
    ) -> Result<SessionOutputs<'a>> {
        let input_tensor = TensorRef::from_array_view(input.view())
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        let outputs = session
            .run(ort::inputs![input_tensor])
            .map_err(|e| DetectionError::Inference(e.to_string()))?;

        Ok(outputs)
    }

    fn postprocess_outputs(
        outputs: &SessionOutputs,
        image_width: u32,
        image_height: u32,
        config: &TableDetectionConfig,
    ) -> Result<Vec<DetectedRegion>> {
        let output = &outputs[0];
        let (shape, data) = output.try_extract_tensor::<f32>().map_err(|e| {
            DetectionError::Inference(format!("Failed to extract tensor: {e}"))
        })?;

        debug!("ONNX output shape: {:?}", shape);

        let dims = shape.as_ref();
        if dims.len() != 3 || dims[1] <= 4 || dims[2] < 0 {
            return Err(DetectionError::Inference(format!(
                "Expected (1, 4 + classes, anchors) output, got {dims:?}"
            )));
        }

        let num_features = dims[1] as usize;
        let num_anchors = dims[2] as usize;
        let raw = decode_predictions(
            data,
            num_features,
            num_anchors,
            (image_width, image_height),
            config,
        )?;
        debug!("Raw regions before NMS: {}", raw.len());

        let mut regions = apply_nms(raw, config.iou_threshold);
        regions.truncate(config.max_detections);
        Ok(regions)
    }
}

impl LayoutDetector for OnnxLayoutDetector {
    type Region = DetectedRegion;

    fn detect(&mut self, image: &RgbImage) -> Result<Vec<DetectedRegion>> {
        Self::detect_with_session(&mut self.session, image, &self.config)
    }
}

/// Decode a `[features, anchors]` prediction block into image-space regions
///
/// Anchor `i`'s feature `f` lives at `data[f * num_anchors + i]`. Fails
/// when `data` holds fewer than `num_features * num_anchors` values.
pub(crate) fn decode_predictions(
    data: &[f32],
    num_features: usize,
    num_anchors: usize,
    (image_width, image_height): (u32, u32),
    config: &TableDetectionConfig,
) -> Result<Vec<DetectedRegion>> {
    let expected = num_features.checked_mul(num_anchors);
    if expected.map_or(true, |expected| data.len() < expected) {
        return Err(DetectionError::Inference(format!(
            "Output holds {} values, expected {} features x {} anchors",
            data.len(),
            num_features,
            num_anchors
        )));
    }

    let num_classes = num_features.saturating_sub(4);
    let input_size = config.input_size as f32;
    let scale_x = image_width as f32 / input_size;
    let scale_y = image_height as f32 / input_size;
    let (max_x, max_y) = (image_width as f32, image_height as f32);

    let mut regions = Vec::new();
    for anchor_idx in 0..num_anchors {
        let get_feature = |feature_idx: usize| data[feature_idx * num_anchors + anchor_idx];

        let mut max_prob = 0.0f32;
        let mut max_class_id = 0usize;
        for class_id in 0..num_classes {
            let prob = get_feature(4 + class_id);
            if prob > max_prob {
                max_prob = prob;
                max_class_id = class_id;
            }
        }

        if max_prob < config.model_score_threshold {
            continue;
        }
        let Some(label) = config.label_for(max_class_id as u32) else {
            continue;
        };

        let (x_center, y_center) = (get_feature(0), get_feature(1));
        let (width, height) = (get_feature(2), get_feature(3));
        let bbox = [
            ((x_center - width / 2.0) * scale_x).clamp(0.0, max_x),
            ((y_center - height / 2.0) * scale_y).clamp(0.0, max_y),
            ((x_center + width / 2.0) * scale_x).clamp(0.0, max_x),
            ((y_center + height / 2.0) * scale_y).clamp(0.0, max_y),
        ];

        regions.push(DetectedRegion::new(label, max_prob, bbox));
    }

    Ok(regions)
}

/// Per-label non-maximum suppression, highest score first
pub(crate) fn apply_nms(mut regions: Vec<DetectedRegion>, iou_threshold: f32) -> Vec<DetectedRegion> {
    regions.sort_by(|a, b| b.score.total_cmp(&a.score));

    let mut keep: Vec<DetectedRegion> = Vec::with_capacity(regions.len());
    for region in regions {
        let suppressed = keep
            .iter()
            .any(|kept| kept.label == region.label && kept.iou(&region) >= iou_threshold);
        if !suppressed {
            keep.push(region);
        }
    }

    debug!("Regions after NMS: {}", keep.len());
    keep
}
