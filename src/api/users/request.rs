// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! User request types and validation

use serde::{Deserialize, Serialize};

use crate::api::errors::ApiError;
use crate::storage::{NewUser, UserChanges};

fn required(field: &str, value: Option<String>) -> Result<String, ApiError> {
    match value {
        Some(v) if !v.trim().is_empty() => Ok(v),
        Some(_) => Err(ApiError::ValidationError {
            field: field.to_string(),
            message: format!("{} must not be empty", field),
        }),
        None => Err(ApiError::ValidationError {
            field: field.to_string(),
            message: format!("{} is required", field),
        }),
    }
}

fn non_empty(field: &str, value: Option<String>) -> Result<Option<String>, ApiError> {
    match value {
        None => Ok(None),
        some => required(field, some).map(Some),
    }
}

/// Body of `POST /users`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl CreateUserRequest {
    pub fn validate(self) -> Result<NewUser, ApiError> {
        Ok(NewUser {
            username: required("username", self.username)?,
            email: required("email", self.email)?,
        })
    }
}

/// Body of `PUT /users/{id}`; absent fields are left unchanged
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateUserRequest {
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

impl UpdateUserRequest {
    pub fn validate(self) -> Result<UserChanges, ApiError> {
        Ok(UserChanges {
            username: non_empty("username", self.username)?,
            email: non_empty("email", self.email)?,
        })
    }
}
