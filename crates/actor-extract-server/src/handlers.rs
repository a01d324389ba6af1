//! API endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{multipart::MultipartRejection, Multipart, Query, State},
    Json,
};
use tracing::debug;

use crate::error::ApiError;
use crate::types::{HealthResponse, UploadQuery, UploadResponse};
use crate::ApiState;

/// Multipart field carrying the archive.
pub const UPLOAD_FIELD: &str = "file";

/// Health check endpoint
pub async fn health_check(State(state): State<ApiState>) -> Json<HealthResponse> {
    let config = state.extractor.config();
    Json(HealthResponse {
        status: "healthy".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        max_workers: config.max_workers,
        max_file_size: config.max_file_size,
    })
}

/// Archive upload endpoint
///
/// Reads the `file` field into memory and runs extraction on a blocking
/// thread. The field's own content type is what gets validated.
pub async fn upload_archive(
    State(state): State<ApiState>,
    Query(query): Query<UploadQuery>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<UploadResponse>, ApiError> {
    let mut multipart = multipart?;

    let mut upload = None;
    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(UPLOAD_FIELD) {
            continue;
        }
        let content_type = field.content_type().unwrap_or_default().to_string();
        let file_name = field.file_name().unwrap_or_default().to_string();
        let bytes = field.bytes().await?;
        debug!(
            "Received upload '{file_name}' ({} bytes, content type '{content_type}')",
            bytes.len()
        );
        upload = Some((content_type, bytes));
        break;
    }

    let Some((content_type, bytes)) = upload else {
        return Err(ApiError::BadRequest(format!(
            "Missing '{UPLOAD_FIELD}' field in multipart form"
        )));
    };

    let extractor = Arc::clone(&state.extractor);
    let result = tokio::task::spawn_blocking(move || extractor.process(&bytes, &content_type))
        .await
        .map_err(|e| ApiError::Internal(format!("Extraction task failed: {e}")))??;

    Ok(Json(UploadResponse::new(result, query.diagnostics)))
}
