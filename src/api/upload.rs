// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
//! Multipart upload helpers

use std::io::Write;
use std::path::Path;

use axum::http::StatusCode;
use axum_extra::extract::{multipart::MultipartError, Multipart};
use bytes::Bytes;
use tempfile::NamedTempFile;
use tracing::debug;

use crate::api::errors::ApiError;

/// A file part pulled out of a multipart form
#[derive(Debug, Clone)]
pub struct UploadedFile {
    pub file_name: String,
    pub bytes: Bytes,
}

fn multipart_error(context: &str, err: MultipartError) -> ApiError {
    let message = format!("{}: {}", context, err.body_text());
    if err.status() == StatusCode::PAYLOAD_TOO_LARGE {
        ApiError::PayloadTooLarge(message)
    } else {
        ApiError::InvalidRequest(message)
    }
}

/// Find the file part called `field` and read it fully
///
/// Parts without a filename are not file uploads and are skipped.
/// Returns `"No {field} provided"` when no such part exists and
/// `"No {field} selected"` when its filename is empty.
pub async fn take_file_field(multipart: &mut Multipart, field: &str) -> Result<UploadedFile, ApiError> {
    loop {
        let part = multipart
            .next_field()
            .await
            .map_err(|e| multipart_error("Invalid multipart body", e))?;

        let Some(part) = part else {
            return Err(ApiError::InvalidRequest(format!("No {} provided", field)));
        };

        if part.name() != Some(field) {
            continue;
        }
        let Some(file_name) = part.file_name().map(str::to_string) else {
            continue;
        };
        if file_name.is_empty() {
            return Err(ApiError::InvalidRequest(format!("No {} selected", field)));
        }

        let bytes = part
            .bytes()
            .await
            .map_err(|e| multipart_error(&format!("Failed to read {}", field), e))?;

        debug!("Received {} '{}' ({} bytes)", field, file_name, bytes.len());
        return Ok(UploadedFile {
            file_name,
            bytes,
        });
    }
}

/// Write an upload to a fresh temp file in `dir`
///
/// The file is unique per call and removed when the returned handle drops,
/// including during unwinding.
pub fn persist_upload(dir: &Path, upload: &UploadedFile) -> std::io::Result<NamedTempFile> {
    let suffix = Path::new(&upload.file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| format!(".{}", ext))
        .unwrap_or_default();

    let mut file = tempfile::Builder::new()
        .prefix("upload-")
        .suffix(&suffix)
        .tempfile_in(dir)?;
    file.write_all(&upload.bytes)?;
    file.flush()?;
    Ok(file)
}
