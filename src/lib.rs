// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod api;
pub mod cli;
pub mod config;
pub mod storage;
pub mod version;
pub mod vision;

// Re-export main types
pub use api::{create_app, ApiError, AppState};
pub use config::ServiceConfig;
pub use storage::{SqliteUserStore, User, UserStore};
pub use vision::{
    Annotator, Detection, DetectionError, FfmpegDecoder, InferenceResult, ModelRegistry,
    ObjectDetector, VideoSummary, YoloLoader,
};
