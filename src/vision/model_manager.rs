// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Lazily loaded detection model registry

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::vision::detection::DetectionError;
use crate::vision::detector::{DetectorLoader, ObjectDetector};

/// Static description of the served model
#[derive(Debug, Clone)]
pub struct ModelRegistryConfig {
    pub model_name: String,
    pub model_size: String,
}

impl Default for ModelRegistryConfig {
    fn default() -> Self {
        Self {
            model_name: "YOLOv8n".to_string(),
            model_size: "nano (lightweight)".to_string(),
        }
    }
}

/// Metadata reported by `/model_info`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelMetadata {
    pub model_name: String,
    pub classes: Vec<String>,
    pub num_classes: usize,
    pub model_size: String,
}

/// Holds at most one detector instance, built on first use
///
/// Construction runs under the registry lock, so concurrent first callers
/// wait for a single load. A failed load leaves the registry empty and the
/// next caller tries again.
pub struct ModelRegistry {
    loader: Arc<dyn DetectorLoader>,
    handle: Mutex<Option<Arc<dyn ObjectDetector>>>,
    config: ModelRegistryConfig,
}

impl ModelRegistry {
    pub fn new(loader: Arc<dyn DetectorLoader>) -> Self {
        Self::with_config(loader, ModelRegistryConfig::default())
    }

    pub fn with_config(loader: Arc<dyn DetectorLoader>, config: ModelRegistryConfig) -> Self {
        Self {
            loader,
            handle: Mutex::new(None),
            config,
        }
    }

    /// Return the cached detector, loading it if needed
    pub async fn load(&self) -> Option<Arc<dyn ObjectDetector>> {
        let mut handle = self.handle.lock().await;
        if let Some(detector) = handle.as_ref() {
            return Some(Arc::clone(detector));
        }

        let loader = Arc::clone(&self.loader);
        match tokio::task::spawn_blocking(move || loader.load()).await {
            Ok(Ok(detector)) => {
                tracing::info!(
                    "✅ {} loaded with {} classes",
                    self.config.model_name,
                    detector.class_names().len()
                );
                *handle = Some(Arc::clone(&detector));
                Some(detector)
            }
            Ok(Err(e)) => {
                tracing::warn!("⚠️ Failed to load {}: {:#}", self.config.model_name, e);
                None
            }
            Err(e) => {
                tracing::error!("Model loading task failed: {}", e);
                None
            }
        }
    }

    /// Like [`load`](Self::load) but maps an empty registry to `ModelUnavailable`
    pub async fn detector(&self) -> Result<Arc<dyn ObjectDetector>, DetectionError> {
        self.load().await.ok_or(DetectionError::ModelUnavailable)
    }

    pub async fn is_loaded(&self) -> bool {
        self.handle.lock().await.is_some()
    }

    pub async fn info(&self) -> Result<ModelMetadata, DetectionError> {
        let detector = self.detector().await?;
        let classes = detector.class_names().to_vec();
        Ok(ModelMetadata {
            model_name: self.config.model_name.clone(),
            num_classes: classes.len(),
            classes,
            model_size: self.config.model_size.clone(),
        })
    }
}
