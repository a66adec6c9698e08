// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Vision processing module for CPU-based object detection
//!
//! This module provides:
//! - YOLOv8 object detection via ONNX Runtime
//! - Box annotation and JPEG encoding of results
//! - Sampled detection over video files decoded by ffmpeg
//!
//! Inference runs on CPU only.

pub mod annotation;
pub mod bounding_box;
pub mod detection;
pub mod detector;
pub mod frame;
pub mod image_utils;
pub mod model_manager;
pub mod video;

pub use annotation::Annotator;
pub use bounding_box::{non_maximum_suppression, BoundingBox, ScoredBox};
pub use detection::{
    detect_objects, Detection, DetectionError, InferenceResult, CONFIDENCE_THRESHOLD,
    FRAME_SAMPLE_INTERVAL,
};
pub use detector::{DetectorLoader, ObjectDetector, YoloConfig, YoloDetector, YoloLoader};
pub use frame::{Frame, PixelLayout};
pub use image_utils::{decode_frame, decode_image_bytes, detect_format, ImageError, ImageInfo};
pub use model_manager::{ModelMetadata, ModelRegistry, ModelRegistryConfig};
pub use video::{detect_video, FfmpegDecoder, FrameReader, VideoDecoder, VideoSummary};
