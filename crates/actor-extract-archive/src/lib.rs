//! Upload archive validation for actor-extract
//!
//! This crate turns an uploaded byte buffer into the list of archive members
//! that will be decoded for events. It owns every check that must happen
//! before decoding starts:
//!
//! - **Content type**: the declared type must be in the configured allow-set
//! - **Upload size**: the raw buffer is measured before it is parsed
//! - **Decompression bombs**: the sum of declared uncompressed member sizes is
//!   checked from central-directory metadata before any member is inflated,
//!   and inflation itself is capped in case the metadata lies
//! - **Entry filtering**: only non-directory members with the JSON suffix
//!   (case-insensitive) are returned
//!
//! Qualifying members that are themselves zips are unwrapped one layer deep
//! ([`unwrap_nested`]), charged to the same uncompressed budget.
//!
//! # Usage
//!
//! ```no_run
//! use actor_extract_archive::{validate_archive, ArchivePolicy};
//!
//! let upload = std::fs::read("events.zip").unwrap();
//! let policy = ArchivePolicy::with_max_size(100 * 1024 * 1024);
//! match validate_archive(&upload, "application/zip", &policy) {
//!     Ok(entries) => println!("{} entries to decode", entries.len()),
//!     Err(e) => eprintln!("rejected: {e}"),
//! }
//! ```

pub mod error;
pub mod zip;

// =============================================================================
// Defaults
// =============================================================================

/// Default maximum upload size, also used for the uncompressed total (100 MiB).
pub const DEFAULT_MAX_FILE_SIZE: u64 = 100 * 1024 * 1024;

/// Content type accepted when no allow-set is configured.
pub const DEFAULT_CONTENT_TYPE: &str = "application/zip";

/// Member name suffix that marks an entry as event JSON.
pub const DEFAULT_JSON_SUFFIX: &str = ".json";

pub use error::{SizeLimit, ValidationError};
pub use crate::zip::{
    has_suffix, list_entries, unwrap_nested, validate_archive, ArchivePolicy, Entry, EntryInfo,
    EntrySource, NestedArchive,
};
