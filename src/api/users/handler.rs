// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! User CRUD handlers

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection},
        Path, State,
    },
    http::StatusCode,
    Json,
};
use tracing::info;

use super::request::{CreateUserRequest, UpdateUserRequest};
use crate::api::errors::ApiError;
use crate::api::http_server::AppState;
use crate::storage::User;

fn json_body<T>(payload: Result<Json<T>, JsonRejection>) -> Result<T, ApiError> {
    payload
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::InvalidRequest(rejection.body_text()))
}

// Non-integer ids cannot match any row
fn user_id(path: Result<Path<i64>, PathRejection>) -> Result<i64, ApiError> {
    path.map(|Path(id)| id)
        .map_err(|_| ApiError::NotFound("User not found".to_string()))
}

/// GET /users
pub async fn list_users_handler(
    State(state): State<Arc<AppState>>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(state.user_store.list().await?))
}

/// POST /users - 201 with the created row
pub async fn create_user_handler(
    State(state): State<Arc<AppState>>,
    payload: Result<Json<CreateUserRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let new_user = json_body(payload)?.validate()?;
    let user = state.user_store.create(new_user).await?;
    info!("Created user {} ({})", user.id, user.username);
    Ok((StatusCode::CREATED, Json(user)))
}

/// GET /users/{id}
pub async fn get_user_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<Json<User>, ApiError> {
    let id = user_id(path)?;
    Ok(Json(state.user_store.get(id).await?))
}

/// PUT /users/{id} - partial update
pub async fn update_user_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
    payload: Result<Json<UpdateUserRequest>, JsonRejection>,
) -> Result<Json<User>, ApiError> {
    let id = user_id(path)?;
    let changes = json_body(payload)?.validate()?;
    let user = state.user_store.update(id, changes).await?;
    info!("Updated user {}", id);
    Ok(Json(user))
}

/// DELETE /users/{id} - 204 with an empty body
pub async fn delete_user_handler(
    State(state): State<Arc<AppState>>,
    path: Result<Path<i64>, PathRejection>,
) -> Result<StatusCode, ApiError> {
    let id = user_id(path)?;
    state.user_store.delete(id).await?;
    info!("Deleted user {}", id);
    Ok(StatusCode::NO_CONTENT)
}
