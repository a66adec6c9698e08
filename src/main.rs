// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use anyhow::{anyhow, Context, Result};
use clap::Parser;
use cv_detection_api::{
    api::{start_server, AppState},
    cli::Cli,
    config::ServiceConfig,
    storage::SqliteUserStore,
    vision::{Annotator, FfmpegDecoder, ModelRegistry, YoloLoader},
};
use std::{net::SocketAddr, sync::Arc};
use tokio::signal;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    // Initialize tracing subscriber for logging
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    tracing::info!(
        "🚀 Starting {}",
        cv_detection_api::version::get_version_string()
    );

    let config = Cli::parse().apply(ServiceConfig::from_env());
    config.validate().map_err(|e| anyhow!(e))?;
    let addr: SocketAddr = config
        .listen_addr
        .parse()
        .with_context(|| format!("Invalid listen address {}", config.listen_addr))?;

    std::fs::create_dir_all(&config.upload_dir).with_context(|| {
        format!("Failed to create upload dir {}", config.upload_dir.display())
    })?;

    let user_store = SqliteUserStore::connect(&config.database_url)
        .await
        .context("Failed to open user store")?;

    // Weights load on the first detection request
    let model_registry = ModelRegistry::new(Arc::new(YoloLoader::new(config.yolo_config())));
    if !config.model_path.exists() {
        tracing::warn!(
            "⚠️ Detection model not found at {}; detection endpoints will fail until it is present",
            config.model_path.display()
        );
    }

    let annotator = Annotator::new().map_err(|e| anyhow!("Failed to load label font: {}", e))?;
    let decoder = FfmpegDecoder::new(&config.ffmpeg_path, &config.ffprobe_path);

    let state = AppState::new(
        Arc::new(model_registry),
        Arc::new(decoder),
        Arc::new(user_store),
        Arc::new(annotator),
    )
    .with_upload_dir(&config.upload_dir)
    .with_max_upload_bytes(config.max_upload_bytes);

    tracing::info!("Model:        {}", config.model_path.display());
    tracing::info!("Database:     {}", config.database_url);
    tracing::info!("Upload limit: {} bytes", config.max_upload_bytes);

    start_server(Arc::new(state), addr, async {
        if let Err(e) = signal::ctrl_c().await {
            tracing::error!("Failed to listen for shutdown signal: {}", e);
        }
        tracing::info!("⏹️  Shutting down...");
    })
    .await?;

    tracing::info!("👋 Goodbye!");
    Ok(())
}
