// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Detection endpoint handlers

use std::sync::Arc;

use axum::{extract::State, Json};
use axum_extra::extract::Multipart;
use tracing::{debug, info};

use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::api::upload::{persist_upload, take_file_field};
use crate::vision::{detect_objects, detect_video, InferenceResult, VideoSummary};

/// POST /detect - Detect objects in an uploaded image
///
/// # Request
/// multipart/form-data with a file part named `image`
///
/// # Response
/// - `detections`: `{class, confidence, bbox: [x1, y1, x2, y2]}` with confidence > 0.5
/// - `inference_time`: seconds spent in the detector
/// - `annotated_image`: JPEG data URI with boxes drawn
/// - `total_objects`: number of detections
///
/// # Errors
/// - 400 Bad Request: no `image` part, or an empty filename
/// - 500 Internal Server Error: model not loaded or processing failed
pub async fn detect_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<InferenceResult>, ApiError> {
    let upload = take_file_field(&mut multipart, "image").await?;
    let detector = state.model_registry.detector().await?;
    let annotator = Arc::clone(&state.annotator);

    let result = tokio::task::spawn_blocking(move || {
        detect_objects(detector.as_ref(), &annotator, &upload.bytes)
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("Detection task failed: {}", e)))??;

    info!(
        "Detection complete: {} objects in {:.3}s",
        result.total_objects, result.inference_time
    );

    Ok(Json(result))
}

/// POST /detect_video - Run sampled detection over an uploaded video
///
/// Every tenth frame is passed to the detector. The upload is written to a
/// per-request temp file that is removed before the response is sent.
///
/// # Errors
/// - 400 Bad Request: no `video` part, or an empty filename
/// - 500 Internal Server Error: model not loaded or processing failed
pub async fn detect_video_handler(
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> Result<Json<VideoSummary>, ApiError> {
    let upload = take_file_field(&mut multipart, "video").await?;
    let detector = state.model_registry.detector().await?;
    let decoder = Arc::clone(&state.video_decoder);
    let upload_dir = state.upload_dir.clone();

    let summary = tokio::task::spawn_blocking(move || {
        let file = persist_upload(&upload_dir, &upload)
            .map_err(|e| ApiError::InternalError(format!("Failed to store upload: {}", e)))?;
        debug!("Video stored at {}", file.path().display());

        let summary = detect_video(detector.as_ref(), decoder.as_ref(), file.path())?;
        drop(file);
        Ok::<_, ApiError>(summary)
    })
    .await
    .map_err(|e| ApiError::InternalError(format!("Video task failed: {}", e)))??;

    info!(
        "Video complete: {} frames, {} processed, {} detections",
        summary.total_frames, summary.processed_frames, summary.total_detections
    );

    Ok(Json(summary))
}
