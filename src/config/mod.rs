// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Service configuration loaded from environment variables

use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::vision::YoloConfig;

pub const DEFAULT_LISTEN_ADDR: &str = "0.0.0.0:5000";
pub const DEFAULT_MODEL_PATH: &str = "./models/yolov8n.onnx";
pub const DEFAULT_DATABASE_URL: &str = "sqlite://app.db";
pub const DEFAULT_MAX_UPLOAD_BYTES: usize = 100 * 1024 * 1024;
pub const DEFAULT_DETECTION_THREADS: usize = 4;

#[derive(Debug, Clone, PartialEq)]
pub struct ServiceConfig {
    /// Socket address the HTTP server binds
    pub listen_addr: String,
    /// YOLOv8 ONNX weights
    pub model_path: PathBuf,
    /// Optional newline-separated label file; COCO names when unset
    pub labels_path: Option<PathBuf>,
    pub database_url: String,
    /// Directory for temporary video uploads
    pub upload_dir: PathBuf,
    /// Request body limit in bytes
    pub max_upload_bytes: usize,
    pub ffmpeg_path: PathBuf,
    pub ffprobe_path: PathBuf,
    /// ONNX Runtime intra-op threads
    pub detection_threads: usize,
}

fn env_parse<T: std::str::FromStr>(key: &str) -> Option<T> {
    env::var(key).ok().and_then(|v| v.parse().ok())
}

impl ServiceConfig {
    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            listen_addr: env::var("LISTEN_ADDR").unwrap_or(defaults.listen_addr),
            model_path: env::var("DETECTION_MODEL_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.model_path),
            labels_path: env::var("DETECTION_LABELS_PATH")
                .ok()
                .filter(|v| !v.is_empty())
                .map(PathBuf::from),
            database_url: env::var("DATABASE_URL").unwrap_or(defaults.database_url),
            upload_dir: env::var("UPLOAD_TEMP_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.upload_dir),
            max_upload_bytes: env_parse("MAX_UPLOAD_BYTES").unwrap_or(defaults.max_upload_bytes),
            ffmpeg_path: env::var("FFMPEG_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffmpeg_path),
            ffprobe_path: env::var("FFPROBE_PATH")
                .map(PathBuf::from)
                .unwrap_or(defaults.ffprobe_path),
            detection_threads: env_parse("DETECTION_THREADS")
                .unwrap_or(defaults.detection_threads),
        }
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.listen_addr.parse::<SocketAddr>().is_err() {
            return Err(format!("Invalid listen address: {}", self.listen_addr));
        }
        if self.max_upload_bytes == 0 {
            return Err("Upload limit must be greater than 0".to_string());
        }
        if self.detection_threads == 0 {
            return Err("Detection threads must be greater than 0".to_string());
        }
        if self.database_url.is_empty() {
            return Err("Database URL must not be empty".to_string());
        }
        Ok(())
    }

    /// Detector settings derived from this configuration
    pub fn yolo_config(&self) -> YoloConfig {
        YoloConfig {
            model_path: self.model_path.clone(),
            labels_path: self.labels_path.clone(),
            intra_threads: self.detection_threads,
            ..YoloConfig::default()
        }
    }
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            listen_addr: DEFAULT_LISTEN_ADDR.to_string(),
            model_path: PathBuf::from(DEFAULT_MODEL_PATH),
            labels_path: None,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            upload_dir: env::temp_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            detection_threads: DEFAULT_DETECTION_THREADS,
        }
    }
}
