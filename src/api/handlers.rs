// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use std::sync::Arc;

use axum::{extract::State, Json};
use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::vision::ModelMetadata;

pub const SERVICE_NAME: &str = "CV Detection API";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub service: String,
}

impl Default for HealthResponse {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
            service: SERVICE_NAME.to_string(),
        }
    }
}

/// GET /health
pub async fn health_handler() -> Json<HealthResponse> {
    Json(HealthResponse::default())
}

/// GET /model_info - loads the model on first call
pub async fn model_info_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<ModelMetadata>, ApiError> {
    let info = state.model_registry.info().await?;
    Ok(Json(info))
}
