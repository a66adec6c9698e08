// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Single-image detection pipeline
//!
//! decode -> detect -> confidence filter -> annotate -> JPEG data URI

use std::time::Instant;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use super::annotation::Annotator;
use super::bounding_box::BoundingBox;
use super::detector::{label_for, ObjectDetector};
use super::image_utils::{decode_frame, encode_jpeg, jpeg_data_uri, ImageError};

/// Detections at or below this confidence are dropped from image results
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;

/// Every Nth decoded video frame (1-based) goes through the detector
pub const FRAME_SAMPLE_INTERVAL: u64 = 10;

/// Errors raised by the vision pipelines
#[derive(Debug, Error)]
pub enum DetectionError {
    #[error("Model not loaded")]
    ModelUnavailable,

    #[error(transparent)]
    Image(#[from] ImageError),

    #[error("Inference failed: {0:#}")]
    Inference(anyhow::Error),

    #[error("Video processing failed: {0:#}")]
    Video(anyhow::Error),
}

/// A labelled detection returned to clients
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Detection {
    #[serde(rename = "class")]
    pub class_name: String,
    pub confidence: f32,
    #[serde(with = "bbox_array")]
    pub bbox: BoundingBox,
}

/// Result of running [`detect_objects`] on one image
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceResult {
    pub detections: Vec<Detection>,
    /// Seconds spent inside the detector call
    pub inference_time: f64,
    /// `data:image/jpeg;base64,...`
    pub annotated_image: String,
    pub total_objects: usize,
}

// `bbox` travels as `[x1, y1, x2, y2]`
mod bbox_array {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use crate::vision::bounding_box::BoundingBox;

    pub fn serialize<S: Serializer>(bbox: &BoundingBox, serializer: S) -> Result<S::Ok, S::Error> {
        bbox.to_array().serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<BoundingBox, D::Error> {
        let [x1, y1, x2, y2] = <[f32; 4]>::deserialize(deserializer)?;
        Ok(BoundingBox::new(x1, y1, x2, y2))
    }
}

/// Run the detector over an encoded image and render the kept detections
pub fn detect_objects(
    detector: &dyn ObjectDetector,
    annotator: &Annotator,
    image_bytes: &[u8],
) -> Result<InferenceResult, DetectionError> {
    let (frame, info) = decode_frame(image_bytes)?;
    debug!(
        "Decoded {:?} image {}x{} ({} bytes)",
        info.format, info.width, info.height, info.size_bytes
    );

    let start = Instant::now();
    let boxes = detector.detect(&frame).map_err(DetectionError::Inference)?;
    let inference_time = start.elapsed().as_secs_f64();

    let class_names = detector.class_names();
    let detections: Vec<Detection> = boxes
        .into_iter()
        .filter(|b| b.confidence > CONFIDENCE_THRESHOLD)
        .map(|b| Detection {
            class_name: label_for(class_names, b.class_id),
            confidence: b.confidence,
            bbox: b.bbox,
        })
        .collect();

    let annotated = annotator.annotate(&frame, &detections);
    let jpeg = encode_jpeg(&annotated)?;

    Ok(InferenceResult {
        total_objects: detections.len(),
        detections,
        inference_time,
        annotated_image: jpeg_data_uri(&jpeg),
    })
}
