// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! Shared fixtures for API tests: stub detector, fake video decoder,
//! multipart bodies and app construction.

#![allow(dead_code)]

use anyhow::Result;
use axum::{body::Body, http::Response};
use cv_detection_api::{
    api::http_server::AppState,
    storage::SqliteUserStore,
    vision::{
        bounding_box::{BoundingBox, ScoredBox},
        detector::{DetectorLoader, ObjectDetector},
        frame::{Frame, PixelLayout},
        video::{FrameReader, VideoDecoder},
        Annotator, ModelRegistry,
    },
};
use image::{DynamicImage, ImageFormat, RgbImage};
use std::io::Cursor;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tempfile::TempDir;

pub const BOUNDARY: &str = "X-TEST-BOUNDARY";

/// Returns the same boxes for every frame
pub struct StubDetector {
    pub names: Vec<String>,
    pub boxes: Vec<ScoredBox>,
}

impl ObjectDetector for StubDetector {
    fn class_names(&self) -> &[String] {
        &self.names
    }

    fn detect(&self, _frame: &Frame) -> Result<Vec<ScoredBox>> {
        Ok(self.boxes.clone())
    }
}

pub fn scored(x1: f32, y1: f32, x2: f32, y2: f32, confidence: f32, class_id: usize) -> ScoredBox {
    ScoredBox {
        bbox: BoundingBox::new(x1, y1, x2, y2),
        confidence,
        class_id,
    }
}

/// One confident person and one low-confidence bicycle
pub fn default_detector() -> StubDetector {
    StubDetector {
        names: vec!["person".to_string(), "bicycle".to_string()],
        boxes: vec![
            scored(10.0, 20.0, 40.0, 60.0, 0.91, 0),
            scored(5.0, 5.0, 15.0, 15.0, 0.3, 1),
        ],
    }
}

pub struct StaticLoader(pub Arc<dyn ObjectDetector>);

impl DetectorLoader for StaticLoader {
    fn load(&self) -> Result<Arc<dyn ObjectDetector>> {
        Ok(Arc::clone(&self.0))
    }
}

pub struct MissingWeightsLoader;

impl DetectorLoader for MissingWeightsLoader {
    fn load(&self) -> Result<Arc<dyn ObjectDetector>> {
        anyhow::bail!("Detection model not found: /nowhere/yolov8n.onnx")
    }
}

/// Decoder for test "videos": the first byte of the file is the frame count
///
/// Frames are yielded slowly so concurrent requests interleave.
#[derive(Default)]
pub struct ByteCountDecoder {
    pub opened: Mutex<Vec<PathBuf>>,
}

struct CountedFrames {
    remaining: usize,
}

impl FrameReader for CountedFrames {
    fn next_frame(&mut self) -> Result<Option<Frame>> {
        if self.remaining == 0 {
            return Ok(None);
        }
        self.remaining -= 1;
        std::thread::sleep(Duration::from_millis(1));
        Ok(Frame::from_raw(2, 2, PixelLayout::Bgr8, vec![0; 12]))
    }
}

impl VideoDecoder for ByteCountDecoder {
    fn open(&self, path: &Path) -> Result<Box<dyn FrameReader>> {
        let bytes = std::fs::read(path)?;
        let count = *bytes
            .first()
            .ok_or_else(|| anyhow::anyhow!("empty video file"))? as usize;
        self.opened
            .lock()
            .map_err(|_| anyhow::anyhow!("poisoned"))?
            .push(path.to_path_buf());
        Ok(Box::new(CountedFrames { remaining: count }))
    }
}

pub struct TestApp {
    pub state: Arc<AppState>,
    pub decoder: Arc<ByteCountDecoder>,
    pub upload_dir: TempDir,
}

pub async fn build_app_with(loader: Arc<dyn DetectorLoader>, max_upload_bytes: usize) -> TestApp {
    let upload_dir = tempfile::tempdir().unwrap();
    let decoder = Arc::new(ByteCountDecoder::default());
    let store = SqliteUserStore::in_memory().await.unwrap();

    let state = AppState::new(
        Arc::new(ModelRegistry::new(loader)),
        decoder.clone(),
        Arc::new(store),
        Arc::new(Annotator::new().unwrap()),
    )
    .with_upload_dir(upload_dir.path())
    .with_max_upload_bytes(max_upload_bytes);

    TestApp {
        state: Arc::new(state),
        decoder,
        upload_dir,
    }
}

pub async fn build_app() -> TestApp {
    build_app_with(
        Arc::new(StaticLoader(Arc::new(default_detector()))),
        10 * 1024 * 1024,
    )
    .await
}

pub fn png_bytes(width: u32, height: u32) -> Vec<u8> {
    let img = DynamicImage::ImageRgb8(RgbImage::new(width, height));
    let mut out = Cursor::new(Vec::new());
    img.write_to(&mut out, ImageFormat::Png).unwrap();
    out.into_inner()
}

pub fn multipart_content_type() -> String {
    format!("multipart/form-data; boundary={}", BOUNDARY)
}

/// Single-part multipart body; `file_name: None` makes a plain form field
pub fn multipart_body(field: &str, file_name: Option<&str>, data: &[u8]) -> Vec<u8> {
    let mut body = Vec::new();
    body.extend_from_slice(format!("--{}\r\n", BOUNDARY).as_bytes());
    match file_name {
        Some(name) => body.extend_from_slice(
            format!(
                "Content-Disposition: form-data; name=\"{}\"; filename=\"{}\"\r\n\
                 Content-Type: application/octet-stream\r\n\r\n",
                field, name
            )
            .as_bytes(),
        ),
        None => body.extend_from_slice(
            format!("Content-Disposition: form-data; name=\"{}\"\r\n\r\n", field).as_bytes(),
        ),
    }
    body.extend_from_slice(data);
    body.extend_from_slice(format!("\r\n--{}--\r\n", BOUNDARY).as_bytes());
    body
}

pub fn multipart_request(uri: &str, body: Vec<u8>) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", multipart_content_type())
        .body(Body::from(body))
        .unwrap()
}

pub fn json_request(method: &str, uri: &str, body: serde_json::Value) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .header("content-type", "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

pub fn empty_request(method: &str, uri: &str) -> axum::http::Request<Body> {
    axum::http::Request::builder()
        .method(method)
        .uri(uri)
        .body(Body::empty())
        .unwrap()
}

pub async fn body_bytes(response: Response<Body>) -> Vec<u8> {
    axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap()
        .to_vec()
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    serde_json::from_slice(&body_bytes(response).await).unwrap()
}
