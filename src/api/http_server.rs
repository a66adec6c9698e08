// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use std::{future::Future, net::SocketAddr, path::PathBuf, sync::Arc};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use super::detect::{detect_handler, detect_video_handler};
use super::handlers::{health_handler, model_info_handler};
use super::users::{
    create_user_handler, delete_user_handler, get_user_handler, list_users_handler,
    update_user_handler,
};
use crate::config::DEFAULT_MAX_UPLOAD_BYTES;
use crate::storage::UserStore;
use crate::vision::{Annotator, ModelRegistry, VideoDecoder};

/// Shared handler state
pub struct AppState {
    pub model_registry: Arc<ModelRegistry>,
    pub video_decoder: Arc<dyn VideoDecoder>,
    pub user_store: Arc<dyn UserStore>,
    pub annotator: Arc<Annotator>,
    /// Directory for per-request video temp files
    pub upload_dir: PathBuf,
    pub max_upload_bytes: usize,
}

impl AppState {
    pub fn new(
        model_registry: Arc<ModelRegistry>,
        video_decoder: Arc<dyn VideoDecoder>,
        user_store: Arc<dyn UserStore>,
        annotator: Arc<Annotator>,
    ) -> Self {
        Self {
            model_registry,
            video_decoder,
            user_store,
            annotator,
            upload_dir: std::env::temp_dir(),
            max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
        }
    }

    pub fn with_upload_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.upload_dir = dir.into();
        self
    }

    pub fn with_max_upload_bytes(mut self, limit: usize) -> Self {
        self.max_upload_bytes = limit;
        self
    }
}

pub fn create_app(state: Arc<AppState>) -> Router {
    let body_limit = state.max_upload_bytes;

    Router::new()
        // Detection
        .route("/detect", post(detect_handler))
        .route("/detect_video", post(detect_video_handler))
        .route("/model_info", get(model_info_handler))
        // Health check
        .route("/health", get(health_handler))
        // Users
        .route("/users", get(list_users_handler).post(create_user_handler))
        .route(
            "/users/:id",
            get(get_user_handler)
                .put(update_user_handler)
                .delete(delete_user_handler),
        )
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

/// Serve until `shutdown` resolves
pub async fn start_server<F>(state: Arc<AppState>, addr: SocketAddr, shutdown: F) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_app(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;

    tracing::info!("API server listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
