// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;

use crate::storage::StoreError;
use crate::vision::DetectionError;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ErrorResponse {
    /// Public message, safe to show to clients
    pub error: String,
    pub error_type: String,
    pub request_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<HashMap<String, serde_json::Value>>,
}

#[derive(Debug, Clone)]
pub enum ApiError {
    NotFound(String),
    InvalidRequest(String),
    ValidationError {
        field: String,
        message: String,
    },
    Conflict(String),
    PayloadTooLarge(String),
    ModelUnavailable,
    /// `message` is returned to the client, `detail` is only logged
    ProcessingError {
        message: String,
        detail: String,
    },
    /// Carries internal detail; clients see a generic message
    InternalError(String),
}

impl ApiError {
    pub fn processing(message: impl Into<String>, detail: impl fmt::Display) -> Self {
        ApiError::ProcessingError {
            message: message.into(),
            detail: detail.to_string(),
        }
    }

    pub fn to_response(&self, request_id: Option<String>) -> ErrorResponse {
        let (error_type, message, details) = match self {
            ApiError::NotFound(msg) => ("not_found", msg.clone(), None),
            ApiError::InvalidRequest(msg) => ("invalid_request", msg.clone(), None),
            ApiError::ValidationError { field, message } => {
                let mut details = HashMap::new();
                details.insert(
                    "field".to_string(),
                    serde_json::Value::String(field.clone()),
                );
                ("validation_error", message.clone(), Some(details))
            }
            ApiError::Conflict(msg) => ("conflict", msg.clone(), None),
            ApiError::PayloadTooLarge(msg) => ("payload_too_large", msg.clone(), None),
            ApiError::ModelUnavailable => {
                ("model_unavailable", "Model not loaded".to_string(), None)
            }
            ApiError::ProcessingError { message, .. } => {
                ("processing_error", message.clone(), None)
            }
            ApiError::InternalError(_) => {
                ("internal_error", "Internal server error".to_string(), None)
            }
        };

        ErrorResponse {
            error: message,
            error_type: error_type.to_string(),
            request_id,
            details,
        }
    }

    pub fn status_code(&self) -> u16 {
        match self {
            ApiError::NotFound(_) => 404,
            ApiError::InvalidRequest(_) | ApiError::ValidationError { .. } => 400,
            ApiError::Conflict(_) => 409,
            ApiError::PayloadTooLarge(_) => 413,
            ApiError::ModelUnavailable
            | ApiError::ProcessingError { .. }
            | ApiError::InternalError(_) => 500,
        }
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::InvalidRequest(msg) => write!(f, "Invalid request: {}", msg),
            ApiError::ValidationError { field, message } => {
                write!(f, "Validation error for {}: {}", field, message)
            }
            ApiError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            ApiError::PayloadTooLarge(msg) => write!(f, "Payload too large: {}", msg),
            ApiError::ModelUnavailable => write!(f, "Model not loaded"),
            ApiError::ProcessingError { message, detail } => write!(f, "{}: {}", message, detail),
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let request_id = uuid::Uuid::new_v4().to_string();
        let status =
            StatusCode::from_u16(self.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            tracing::error!(request_id = %request_id, "{}", self);
        } else {
            tracing::debug!(request_id = %request_id, "{}", self);
        }

        (status, Json(self.to_response(Some(request_id)))).into_response()
    }
}

impl From<DetectionError> for ApiError {
    fn from(err: DetectionError) -> Self {
        match err {
            DetectionError::ModelUnavailable => ApiError::ModelUnavailable,
            DetectionError::Image(e) => ApiError::processing("Failed to process image", e),
            DetectionError::Inference(e) => {
                ApiError::processing("Object detection failed", format!("{:#}", e))
            }
            DetectionError::Video(e) => {
                ApiError::processing("Failed to process video", format!("{:#}", e))
            }
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::NotFound(_) => ApiError::NotFound("User not found".to_string()),
            StoreError::Conflict(_) => ApiError::Conflict(
                "A user with this username or email already exists".to_string(),
            ),
            StoreError::Database(e) => ApiError::InternalError(e.to_string()),
        }
    }
}
