// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /detect_video endpoint tests
//!
//! These tests verify that:
//! - Every tenth frame is processed and all its boxes are counted
//! - Short videos report zero processed frames and zero fps
//! - Temp uploads are unique per request and removed afterwards
//! - Concurrent uploads do not see each other's frames

use super::support::*;
use axum::http::StatusCode;
use cv_detection_api::api::http_server::create_app;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

/// Fake video whose first byte is its frame count
fn fake_video(frames: u8) -> Vec<u8> {
    vec![frames, 0xAB, 0xCD]
}

/// Test 1: Sampled frames and unfiltered detection count
#[tokio::test]
async fn test_detect_video_summary() {
    let app = build_app().await;
    let router = create_app(app.state.clone());

    let body = multipart_body("video", Some("clip.mp4"), &fake_video(25));
    let response = router
        .oneshot(multipart_request("/detect_video", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    assert_eq!(json["total_frames"], 25);
    assert_eq!(json["processed_frames"], 2);
    // Two boxes per processed frame, including the low-confidence one
    assert_eq!(json["total_detections"], 4);
    assert!(json["avg_processing_time"].as_f64().unwrap() >= 0.0);
    assert!(json["fps"].is_number());
}

/// Test 2: Fewer than ten frames
#[tokio::test]
async fn test_detect_video_short_clip() {
    let app = build_app().await;
    let router = create_app(app.state.clone());

    let body = multipart_body("video", Some("clip.mp4"), &fake_video(9));
    let response = router
        .oneshot(multipart_request("/detect_video", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;
    assert_eq!(json["total_frames"], 9);
    assert_eq!(json["processed_frames"], 0);
    assert_eq!(json["avg_processing_time"], 0.0);
    assert_eq!(json["fps"], 0.0);
}

/// Test 3: Missing and unnamed video uploads
#[tokio::test]
async fn test_detect_video_input_errors() {
    let app = build_app().await;

    let body = multipart_body("image", Some("clip.mp4"), &fake_video(10));
    let response = create_app(app.state.clone())
        .oneshot(multipart_request("/detect_video", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No video provided");

    let body = multipart_body("video", Some(""), b"");
    let response = create_app(app.state.clone())
        .oneshot(multipart_request("/detect_video", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No video selected");
}

/// Test 4: Temp file is removed after a successful request
#[tokio::test]
async fn test_detect_video_cleans_up_temp_file() {
    let app = build_app().await;
    let router = create_app(app.state.clone());

    let body = multipart_body("video", Some("clip.mp4"), &fake_video(12));
    let response = router
        .oneshot(multipart_request("/detect_video", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let opened = app.decoder.opened.lock().unwrap().clone();
    assert_eq!(opened.len(), 1);
    assert!(opened[0].starts_with(app.upload_dir.path()));
    assert!(!opened[0].exists());
    assert_eq!(std::fs::read_dir(app.upload_dir.path()).unwrap().count(), 0);
}

/// Test 5: Temp file is removed when decoding fails
#[tokio::test]
async fn test_detect_video_cleans_up_on_error() {
    let app = build_app().await;
    let router = create_app(app.state.clone());

    // Zero-length upload makes the fake decoder fail to open it
    let body = multipart_body("video", Some("empty.mp4"), b"");
    let response = router
        .oneshot(multipart_request("/detect_video", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Failed to process video");
    assert_eq!(std::fs::read_dir(app.upload_dir.path()).unwrap().count(), 0);
}

/// Test 6: Concurrent uploads keep independent frame counts
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_video_uploads_are_isolated() {
    let app = build_app().await;

    let counts: Vec<u8> = vec![25, 47, 13, 60];
    let requests = counts.iter().map(|&frames| {
        let router = create_app(app.state.clone());
        let body = multipart_body("video", Some("clip.mp4"), &fake_video(frames));
        async move {
            let response = router
                .oneshot(multipart_request("/detect_video", body))
                .await
                .unwrap();
            assert_eq!(response.status(), StatusCode::OK);
            body_json(response).await
        }
    });

    let results = futures_util::future::join_all(requests).await;

    for (frames, json) in counts.iter().zip(results) {
        let frames = *frames as u64;
        assert_eq!(json["total_frames"], frames);
        assert_eq!(json["processed_frames"], frames / 10);
        assert_eq!(json["total_detections"], (frames / 10) * 2);
    }

    let mut opened = app.decoder.opened.lock().unwrap().clone();
    assert_eq!(opened.len(), counts.len());
    opened.sort();
    opened.dedup();
    assert_eq!(opened.len(), counts.len(), "temp paths must be unique");
    assert!(opened.iter().all(|p| !p.exists()));
}

/// Test 7: Unavailable model
#[tokio::test]
async fn test_detect_video_without_model() {
    let app = build_app_with(Arc::new(MissingWeightsLoader), 1024 * 1024).await;
    let router = create_app(app.state.clone());

    let body = multipart_body("video", Some("clip.mp4"), &fake_video(10));
    let response = router
        .oneshot(multipart_request("/detect_video", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert_eq!(body_json(response).await["error"], "Model not loaded");
}

/// Test 8: Missing video is a 400 even without a model
#[tokio::test]
async fn test_detect_video_input_error_without_model() {
    let app = build_app_with(Arc::new(MissingWeightsLoader), 1024 * 1024).await;
    let router = create_app(app.state.clone());

    let body = multipart_body("file", Some("clip.mp4"), &fake_video(10));
    let response = router
        .oneshot(multipart_request("/detect_video", body))
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No video provided");
}
