// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Object detection API endpoints
//!
//! Provides POST /detect for images and POST /detect_video for video files.

pub mod handler;

pub use handler::{detect_handler, detect_video_handler};
