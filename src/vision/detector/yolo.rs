// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! YOLOv8 object detection via ONNX Runtime
//!
//! Expects an Ultralytics export (`yolo export format=onnx`) with a single
//! `[1, 3, S, S]` input and a `[1, 4 + classes, anchors]` output.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{anyhow, Context, Result};
use image::{imageops, imageops::FilterType, Rgb, RgbImage};
use ndarray::{Array4, ArrayViewD};
use ort::execution_providers::CPUExecutionProvider;
use ort::session::builder::GraphOptimizationLevel;
use ort::session::Session;
use ort::value::Value;
use tracing::{debug, info};

use super::labels::{coco_labels, load_labels};
use super::{DetectorLoader, ObjectDetector};
use crate::vision::bounding_box::{non_maximum_suppression, BoundingBox, ScoredBox};
use crate::vision::frame::Frame;

/// Square input resolution of the nano checkpoint
pub const YOLO_INPUT_SIZE: u32 = 640;

/// Letterbox padding value
const PAD_VALUE: u8 = 114;

/// Detector settings
#[derive(Debug, Clone)]
pub struct YoloConfig {
    /// Path to the `.onnx` weights
    pub model_path: PathBuf,
    /// Optional newline-separated class list; COCO when absent
    pub labels_path: Option<PathBuf>,
    pub input_size: u32,
    /// Minimum class score for a box to leave the detector
    pub score_threshold: f32,
    /// IoU above which same-class boxes are suppressed
    pub iou_threshold: f32,
    pub intra_threads: usize,
}

impl Default for YoloConfig {
    fn default() -> Self {
        Self {
            model_path: PathBuf::from("./models/yolov8n.onnx"),
            labels_path: None,
            input_size: YOLO_INPUT_SIZE,
            score_threshold: 0.25,
            iou_threshold: 0.7,
            intra_threads: 4,
        }
    }
}

/// Geometry of a letterbox transform, used to map boxes back to the source frame
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Letterbox {
    pub scale: f32,
    pub pad_x: f32,
    pub pad_y: f32,
}

impl Letterbox {
    fn unmap(&self, bbox: BoundingBox) -> BoundingBox {
        BoundingBox::new(
            (bbox.x1 - self.pad_x) / self.scale,
            (bbox.y1 - self.pad_y) / self.scale,
            (bbox.x2 - self.pad_x) / self.scale,
            (bbox.y2 - self.pad_y) / self.scale,
        )
    }
}

/// Resize with preserved aspect ratio, pad to `size x size` and build an NCHW RGB tensor in `[0, 1]`
pub fn letterbox(frame: &Frame, size: u32) -> (Array4<f32>, Letterbox) {
    let rgb = frame.to_rgb_image();
    let (w, h) = rgb.dimensions();

    let scale = (size as f32 / w.max(1) as f32).min(size as f32 / h.max(1) as f32);
    let new_w = ((w as f32 * scale).round() as u32).clamp(1, size);
    let new_h = ((h as f32 * scale).round() as u32).clamp(1, size);
    let pad_x = (size - new_w) / 2;
    let pad_y = (size - new_h) / 2;

    let resized = imageops::resize(&rgb, new_w, new_h, FilterType::Triangle);
    let mut canvas = RgbImage::from_pixel(size, size, Rgb([PAD_VALUE; 3]));
    imageops::replace(&mut canvas, &resized, pad_x as i64, pad_y as i64);

    let side = size as usize;
    let mut tensor = Array4::zeros((1, 3, side, side));
    for (x, y, pixel) in canvas.enumerate_pixels() {
        for c in 0..3 {
            tensor[[0, c, y as usize, x as usize]] = pixel[c] as f32 / 255.0;
        }
    }

    (
        tensor,
        Letterbox {
            scale,
            pad_x: pad_x as f32,
            pad_y: pad_y as f32,
        },
    )
}

/// Turn raw head output into boxes in source-frame coordinates
///
/// Accepts `[1, 4 + nc, anchors]` or the transposed `[1, anchors, 4 + nc]`.
pub fn decode_output(
    output: ArrayViewD<f32>,
    geometry: Letterbox,
    frame_width: u32,
    frame_height: u32,
    score_threshold: f32,
    iou_threshold: f32,
) -> Result<Vec<ScoredBox>> {
    let shape = output.shape();
    if shape.len() != 3 || shape[0] != 1 {
        anyhow::bail!("Unexpected detection output shape: {:?}", shape);
    }

    let transposed = shape[1] > shape[2];
    let (attrs, anchors) = if transposed {
        (shape[2], shape[1])
    } else {
        (shape[1], shape[2])
    };
    if attrs < 5 {
        anyhow::bail!("Detection output has no class scores: {:?}", shape);
    }

    let at = |attr: usize, anchor: usize| -> f32 {
        if transposed {
            output[[0, anchor, attr]]
        } else {
            output[[0, attr, anchor]]
        }
    };

    let mut candidates = Vec::new();
    for anchor in 0..anchors {
        let (class_id, score) = (4..attrs)
            .map(|attr| (attr - 4, at(attr, anchor)))
            .fold((0usize, f32::MIN), |best, cur| if cur.1 > best.1 { cur } else { best });

        if !score.is_finite() || score < score_threshold {
            continue;
        }

        let letterboxed =
            BoundingBox::from_center(at(0, anchor), at(1, anchor), at(2, anchor), at(3, anchor));
        if !letterboxed.is_finite() {
            continue;
        }
        let bbox = geometry
            .unmap(letterboxed)
            .clamp_to(frame_width as f32, frame_height as f32);

        candidates.push(ScoredBox {
            bbox,
            confidence: score.clamp(0.0, 1.0),
            class_id,
        });
    }

    Ok(non_maximum_suppression(candidates, iou_threshold))
}

/// YOLOv8 detector backed by an ONNX Runtime session
///
/// Runs on CPU only.
pub struct YoloDetector {
    session: Arc<Mutex<Session>>,
    input_name: String,
    class_names: Vec<String>,
    config: YoloConfig,
}

impl std::fmt::Debug for YoloDetector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("YoloDetector")
            .field("input_name", &self.input_name)
            .field("classes", &self.class_names.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl YoloDetector {
    /// Load the model and label set described by `config`
    ///
    /// # Errors
    /// Returns error if:
    /// - Model file not found
    /// - ONNX Runtime initialization fails
    /// - The label file cannot be read
    pub fn new(config: YoloConfig) -> Result<Self> {
        let model_path: &Path = &config.model_path;
        if !model_path.exists() {
            anyhow::bail!("Detection model not found: {}", model_path.display());
        }

        info!("Loading detection model from {}", model_path.display());

        let session = Session::builder()
            .context("Failed to create session builder")?
            .with_execution_providers([CPUExecutionProvider::default().build()])
            .context("Failed to set CPU execution provider")?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .context("Failed to set optimization level")?
            .with_intra_threads(config.intra_threads)
            .context("Failed to set intra threads")?
            .commit_from_file(model_path)
            .context(format!(
                "Failed to load detection model from {}",
                model_path.display()
            ))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .unwrap_or_else(|| "images".to_string());

        let class_names = match &config.labels_path {
            Some(path) => load_labels(path)?,
            None => coco_labels(),
        };

        info!(
            "✅ Detection model loaded ({} classes, input: {})",
            class_names.len(),
            input_name
        );

        Ok(Self {
            session: Arc::new(Mutex::new(session)),
            input_name,
            class_names,
            config,
        })
    }
}

impl ObjectDetector for YoloDetector {
    fn class_names(&self) -> &[String] {
        &self.class_names
    }

    fn detect(&self, frame: &Frame) -> Result<Vec<ScoredBox>> {
        if frame.is_empty() {
            return Ok(Vec::new());
        }

        let (input, geometry) = letterbox(frame, self.config.input_size);
        let input_value = Value::from_array(input).context("Failed to create input tensor")?;

        let mut session = self
            .session
            .lock()
            .map_err(|_| anyhow!("Detection session lock poisoned"))?;

        let outputs = session
            .run(ort::inputs![&self.input_name => input_value])
            .context("Detection inference failed")?;

        let output = outputs[0]
            .try_extract_array::<f32>()
            .context("Failed to extract output tensor")?;

        let boxes = decode_output(
            output.view(),
            geometry,
            frame.width,
            frame.height,
            self.config.score_threshold,
            self.config.iou_threshold,
        )?;

        debug!("Detector produced {} boxes", boxes.len());
        Ok(boxes)
    }
}

/// Loads a [`YoloDetector`] from a fixed configuration
#[derive(Debug, Clone)]
pub struct YoloLoader {
    config: YoloConfig,
}

impl YoloLoader {
    pub fn new(config: YoloConfig) -> Self {
        Self { config }
    }
}

impl DetectorLoader for YoloLoader {
    fn load(&self) -> Result<Arc<dyn ObjectDetector>> {
        Ok(Arc::new(YoloDetector::new(self.config.clone())?))
    }
}
