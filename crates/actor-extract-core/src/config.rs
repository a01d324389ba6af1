//! Processing configuration.
//!
//! Built once at startup and shared read-only by every component.

use actor_extract_archive::{
    ArchivePolicy, DEFAULT_CONTENT_TYPE, DEFAULT_JSON_SUFFIX, DEFAULT_MAX_FILE_SIZE,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Queue slots per worker when `queue_capacity` is not set.
pub const DEFAULT_QUEUE_SLOTS_PER_WORKER: usize = 4;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("max_workers must be at least 1")]
    NoWorkers,
    #[error("queue_capacity must be at least 1")]
    NoQueueCapacity,
    #[error("max_file_size must be greater than zero")]
    ZeroMaxFileSize,
    #[error("allowed_content_types must not be empty")]
    NoContentTypes,
    #[error("json_suffix must not be empty")]
    EmptySuffix,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessorConfig {
    /// Maximum upload size in bytes; also caps the uncompressed total.
    pub max_file_size: u64,
    /// Worker threads in the shared decode pool.
    pub max_workers: usize,
    /// Pending decode jobs the pool queues before submitters block.
    pub queue_capacity: usize,
    pub allowed_content_types: Vec<String>,
    pub json_suffix: String,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self::with_workers(num_cpus::get().max(1))
    }
}

impl ProcessorConfig {
    /// Default config sized for `max_workers` threads.
    #[must_use]
    pub fn with_workers(max_workers: usize) -> Self {
        Self {
            max_file_size: DEFAULT_MAX_FILE_SIZE,
            max_workers,
            queue_capacity: max_workers.saturating_mul(DEFAULT_QUEUE_SLOTS_PER_WORKER),
            allowed_content_types: vec![DEFAULT_CONTENT_TYPE.to_string()],
            json_suffix: DEFAULT_JSON_SUFFIX.to_string(),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_workers == 0 {
            return Err(ConfigError::NoWorkers);
        }
        if self.queue_capacity == 0 {
            return Err(ConfigError::NoQueueCapacity);
        }
        if self.max_file_size == 0 {
            return Err(ConfigError::ZeroMaxFileSize);
        }
        if self.allowed_content_types.is_empty() {
            return Err(ConfigError::NoContentTypes);
        }
        if self.json_suffix.is_empty() {
            return Err(ConfigError::EmptySuffix);
        }
        Ok(())
    }

    /// Archive limits derived from this config.
    #[must_use]
    pub fn archive_policy(&self) -> ArchivePolicy {
        ArchivePolicy {
            max_archive_size: self.max_file_size,
            max_uncompressed_size: self.max_file_size,
            allowed_content_types: self.allowed_content_types.clone(),
            json_suffix: self.json_suffix.clone(),
        }
    }
}
