// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::path::PathBuf;

use clap::Parser;

use crate::config::ServiceConfig;

/// CV Detection API server
#[derive(Parser, Debug, Default)]
#[command(name = "cv-detection-api")]
#[command(version = crate::version::VERSION_NUMBER)]
#[command(about = "Object detection and user records over HTTP", long_about = None)]
pub struct Cli {
    /// Address to bind, e.g. 0.0.0.0:5000
    #[arg(long, env = "LISTEN_ADDR")]
    pub listen_addr: Option<String>,

    /// YOLOv8 ONNX weights
    #[arg(long, env = "DETECTION_MODEL_PATH")]
    pub model_path: Option<PathBuf>,

    /// Newline-separated class names (defaults to COCO)
    #[arg(long, env = "DETECTION_LABELS_PATH")]
    pub labels_path: Option<PathBuf>,

    #[arg(long, env = "DATABASE_URL")]
    pub database_url: Option<String>,

    /// Directory for temporary video uploads
    #[arg(long, env = "UPLOAD_TEMP_DIR")]
    pub upload_dir: Option<PathBuf>,

    #[arg(long, env = "MAX_UPLOAD_BYTES")]
    pub max_upload_bytes: Option<usize>,

    #[arg(long, env = "FFMPEG_PATH")]
    pub ffmpeg_path: Option<PathBuf>,

    #[arg(long, env = "FFPROBE_PATH")]
    pub ffprobe_path: Option<PathBuf>,

    /// ONNX Runtime intra-op threads
    #[arg(long, env = "DETECTION_THREADS")]
    pub detection_threads: Option<usize>,
}

impl Cli {
    /// Overlay flags that were given onto `config`
    pub fn apply(self, mut config: ServiceConfig) -> ServiceConfig {
        if let Some(v) = self.listen_addr {
            config.listen_addr = v;
        }
        if let Some(v) = self.model_path {
            config.model_path = v;
        }
        if let Some(v) = self.labels_path {
            config.labels_path = Some(v);
        }
        if let Some(v) = self.database_url {
            config.database_url = v;
        }
        if let Some(v) = self.upload_dir {
            config.upload_dir = v;
        }
        if let Some(v) = self.max_upload_bytes {
            config.max_upload_bytes = v;
        }
        if let Some(v) = self.ffmpeg_path {
            config.ffmpeg_path = v;
        }
        if let Some(v) = self.ffprobe_path {
            config.ffprobe_path = v;
        }
        if let Some(v) = self.detection_threads {
            config.detection_threads = v;
        }
        config
    }
}
