//! Error types for archive validation

use std::fmt;

use thiserror::Error;

/// Which quantity tripped a size limit.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SizeLimit {
    /// Raw length of the uploaded buffer, checked before parsing
    Upload,
    /// Sum of declared uncompressed member sizes (decompression-bomb check)
    DeclaredUncompressed,
    /// Bytes actually produced while inflating members
    Inflated,
}

impl fmt::Display for SizeLimit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Upload => write!(f, "File size"),
            Self::DeclaredUncompressed => write!(f, "Total uncompressed file size"),
            Self::Inflated => write!(f, "Decompressed data size"),
        }
    }
}

/// Reasons an uploaded archive is rejected before any entry is dispatched.
///
/// Every variant renders a human-readable reason suitable for returning to
/// the uploader.
#[derive(Error, Debug)]
pub enum ValidationError {
    /// Declared content type is not in the accepted set
    #[error("File must be one of {allowed:?} (got '{content_type}')")]
    UnsupportedMediaType {
        /// Content type the caller declared
        content_type: String,
        /// Accepted content types
        allowed: Vec<String>,
    },

    /// Upload or its decompressed contents exceed the configured maximum
    #[error("{what} exceeds the limit of {max} bytes ({size} bytes)")]
    SizeLimitExceeded {
        /// Which size was measured
        what: SizeLimit,
        /// Measured size in bytes
        size: u64,
        /// Configured maximum in bytes
        max: u64,
    },

    /// Buffer is not a readable zip container
    #[error("Invalid zip file: {0}")]
    MalformedArchive(String),

    /// Archive holds no member with the recognized suffix
    #[error("No {suffix} files found in the uploaded archive")]
    NoQualifyingEntries {
        /// Suffix entries were filtered on
        suffix: String,
    },
}

impl From<zip::result::ZipError> for ValidationError {
    fn from(err: zip::result::ZipError) -> Self {
        ValidationError::MalformedArchive(err.to_string())
    }
}

impl From<std::io::Error> for ValidationError {
    fn from(err: std::io::Error) -> Self {
        ValidationError::MalformedArchive(err.to_string())
    }
}
