//! API request and response types

use actor_extract_core::{AggregateResult, EntryReport};
use serde::{Deserialize, Serialize};

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HealthResponse {
    /// Service status
    pub status: String,
    /// Service version
    pub version: String,
    /// Worker threads in the decode pool
    pub max_workers: usize,
    /// Upload size limit in bytes
    pub max_file_size: u64,
}

/// Error body returned for every non-2xx response
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ErrorResponse {
    pub detail: String,
}

/// Query parameters accepted by the upload endpoint
#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct UploadQuery {
    /// Include per-entry reports in the response
    #[serde(default)]
    pub diagnostics: bool,
}

/// Upload endpoint response
#[derive(Debug, Serialize)]
pub struct UploadResponse {
    #[serde(flatten)]
    pub result: AggregateResult,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entries: Option<Vec<EntryReport>>,
}

impl UploadResponse {
    #[must_use]
    pub fn new(result: AggregateResult, diagnostics: bool) -> Self {
        let entries = diagnostics.then(|| result.entries().to_vec());
        Self { result, entries }
    }
}
