// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1

//! POST /detect endpoint tests
//!
//! These tests verify that:
//! - Detections are filtered at confidence 0.5 and well formed
//! - `total_objects` matches the detection list
//! - The annotated image is a decodable JPEG data URI
//! - Missing or unnamed uploads are rejected with 400
//! - An unloadable model yields 500 "Model not loaded"

use super::support::*;
use axum::http::StatusCode;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use cv_detection_api::api::http_server::create_app;
use std::sync::Arc;
use tower::util::ServiceExt; // for `oneshot`

/// Test 1: Valid image returns filtered detections
#[tokio::test]
async fn test_detect_returns_confident_detections() {
    let app = build_app().await;
    let router = create_app(app.state.clone());

    let body = multipart_body("image", Some("street.png"), &png_bytes(64, 64));
    let response = router.oneshot(multipart_request("/detect", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::OK);
    let json = body_json(response).await;

    let detections = json["detections"].as_array().unwrap();
    assert_eq!(detections.len(), 1);
    assert_eq!(json["total_objects"], detections.len());
    assert_eq!(detections[0]["class"], "person");
    assert_eq!(
        detections[0]["bbox"],
        serde_json::json!([10.0, 20.0, 40.0, 60.0])
    );

    for detection in detections {
        assert!(detection["confidence"].as_f64().unwrap() > 0.5);
        let bbox: Vec<f64> = detection["bbox"]
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v.as_f64().unwrap())
            .collect();
        assert!(bbox[0] <= bbox[2] && bbox[1] <= bbox[3]);
    }
    assert!(json["inference_time"].as_f64().unwrap() >= 0.0);
}

/// Test 2: Annotated image decodes as a JPEG of the input size
#[tokio::test]
async fn test_detect_annotated_image_is_jpeg() {
    let app = build_app().await;
    let router = create_app(app.state.clone());

    let body = multipart_body("image", Some("frame.png"), &png_bytes(80, 48));
    let response = router.oneshot(multipart_request("/detect", body)).await.unwrap();
    let json = body_json(response).await;

    let uri = json["annotated_image"].as_str().unwrap();
    let encoded = uri.strip_prefix("data:image/jpeg;base64,").unwrap();
    let jpeg = STANDARD.decode(encoded).unwrap();
    let decoded = image::load_from_memory_with_format(&jpeg, image::ImageFormat::Jpeg).unwrap();

    assert_eq!(decoded.width(), 80);
    assert_eq!(decoded.height(), 48);
}

/// Test 3: Missing image part
#[tokio::test]
async fn test_detect_without_image_field() {
    let app = build_app().await;
    let router = create_app(app.state.clone());

    let body = multipart_body("file", Some("street.png"), &png_bytes(8, 8));
    let response = router.oneshot(multipart_request("/detect", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let json = body_json(response).await;
    assert_eq!(json["error"], "No image provided");
    assert_eq!(json["error_type"], "invalid_request");
    assert!(json["request_id"].is_string());
}

/// Test 4: Form field named "image" without a filename is not a file upload
#[tokio::test]
async fn test_detect_with_plain_form_field() {
    let app = build_app().await;
    let router = create_app(app.state.clone());

    let body = multipart_body("image", None, b"hello");
    let response = router.oneshot(multipart_request("/detect", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No image provided");
}

/// Test 5: Empty filename
#[tokio::test]
async fn test_detect_with_empty_filename() {
    let app = build_app().await;
    let router = create_app(app.state.clone());

    let body = multipart_body("image", Some(""), b"");
    let response = router.oneshot(multipart_request("/detect", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No image selected");
}

/// Test 6: Undecodable bytes are a sanitized 500
#[tokio::test]
async fn test_detect_with_corrupt_image() {
    let app = build_app().await;
    let router = create_app(app.state.clone());

    let body = multipart_body("image", Some("broken.png"), b"\x89PNG\r\n\x1a\nnot really");
    let response = router.oneshot(multipart_request("/detect", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Failed to process image");
    assert_eq!(json["error_type"], "processing_error");
}

/// Test 7: Model cannot be loaded
#[tokio::test]
async fn test_detect_without_model() {
    let app = build_app_with(Arc::new(MissingWeightsLoader), 1024 * 1024).await;
    let router = create_app(app.state.clone());

    let body = multipart_body("image", Some("street.png"), &png_bytes(8, 8));
    let response = router.oneshot(multipart_request("/detect", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    let json = body_json(response).await;
    assert_eq!(json["error"], "Model not loaded");
    assert!(!json.to_string().contains("/nowhere"));
}

/// Test 8: Bodies over the configured limit are refused
#[tokio::test]
async fn test_detect_rejects_oversized_upload() {
    let app = build_app_with(
        Arc::new(StaticLoader(Arc::new(default_detector()))),
        1024,
    )
    .await;
    let router = create_app(app.state.clone());

    let body = multipart_body("image", Some("huge.png"), &vec![0u8; 8 * 1024]);
    let response = router.oneshot(multipart_request("/detect", body)).await.unwrap();

    assert_eq!(response.status(), StatusCode::PAYLOAD_TOO_LARGE);
}

/// Test 9: Upload errors are reported before the model is loaded
#[tokio::test]
async fn test_detect_input_error_takes_precedence_over_missing_model() {
    let app = build_app_with(Arc::new(MissingWeightsLoader), 1024 * 1024).await;

    let body = multipart_body("file", Some("street.png"), &png_bytes(8, 8));
    let response = create_app(app.state.clone())
        .oneshot(multipart_request("/detect", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No image provided");

    let body = multipart_body("image", Some(""), b"");
    let response = create_app(app.state.clone())
        .oneshot(multipart_request("/detect", body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_json(response).await["error"], "No image selected");

    assert!(!app.state.model_registry.is_loaded().await);
}
