// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detectors
//!
//! - `yolo` - YOLOv8 running under ONNX Runtime on CPU
//! - `labels` - class name tables

pub mod labels;
pub mod yolo;

use std::sync::Arc;

use anyhow::Result;

use super::bounding_box::ScoredBox;
use super::frame::Frame;

pub use labels::{coco_labels, label_for, load_labels, COCO_CLASSES};
pub use yolo::{YoloConfig, YoloDetector, YoloLoader};

/// An inference function over decoded frames
///
/// Implementations receive frames in BGR (or gray) order and return boxes in
/// the frame's pixel coordinates. `detect` is blocking and CPU-bound.
pub trait ObjectDetector: Send + Sync {
    /// Class names indexed by `ScoredBox::class_id`
    fn class_names(&self) -> &[String];

    fn detect(&self, frame: &Frame) -> Result<Vec<ScoredBox>>;
}

/// Builds a detector on demand; used by the model registry for lazy loading
pub trait DetectorLoader: Send + Sync {
    fn load(&self) -> Result<Arc<dyn ObjectDetector>>;
}
