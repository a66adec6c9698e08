// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! User resource endpoints
//!
//! Provides CRUD over `/users` and `/users/{id}`.

pub mod handler;
pub mod request;

pub use handler::{
    create_user_handler, delete_user_handler, get_user_handler, list_users_handler,
    update_user_handler,
};
pub use request::{CreateUserRequest, UpdateUserRequest};
