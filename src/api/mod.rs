// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
pub mod detect;
pub mod errors;
pub mod handlers;
pub mod http_server;
pub mod upload;
pub mod users;

pub use detect::{detect_handler, detect_video_handler};
pub use errors::{ApiError, ErrorResponse};
pub use handlers::{health_handler, model_info_handler, HealthResponse};
pub use http_server::{create_app, start_server, AppState};
pub use upload::{persist_upload, take_file_field, UploadedFile};
pub use users::{CreateUserRequest, UpdateUserRequest};
