//! ZIP upload validation and member extraction
//!
//! Everything here works on an in-memory buffer. Limits are enforced in a
//! fixed order so that no member is inflated until the archive's declared
//! uncompressed total has been checked against the policy.

use crate::error::{SizeLimit, ValidationError};
use crate::{DEFAULT_CONTENT_TYPE, DEFAULT_JSON_SUFFIX, DEFAULT_MAX_FILE_SIZE};
use std::io::{Cursor, Read};
use tracing::{debug, warn};
use zip::ZipArchive;

/// Limits and filters applied to an uploaded archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArchivePolicy {
    /// Maximum raw upload length in bytes
    pub max_archive_size: u64,
    /// Maximum sum of member sizes once decompressed
    pub max_uncompressed_size: u64,
    /// Accepted declared content types (compared case-insensitively)
    pub allowed_content_types: Vec<String>,
    /// Member name suffix that marks an entry for decoding
    pub json_suffix: String,
}

impl ArchivePolicy {
    /// Policy with the same limit for the upload and its uncompressed contents
    #[must_use]
    pub fn with_max_size(max_size: u64) -> Self {
        Self {
            max_archive_size: max_size,
            max_uncompressed_size: max_size,
            ..Self::default()
        }
    }

    fn accepts_content_type(&self, content_type: &str) -> bool {
        let essence = content_type.split(';').next().unwrap_or_default().trim();
        self.allowed_content_types
            .iter()
            .any(|allowed| allowed.trim().eq_ignore_ascii_case(essence))
    }
}

impl Default for ArchivePolicy {
    fn default() -> Self {
        Self {
            max_archive_size: DEFAULT_MAX_FILE_SIZE,
            max_uncompressed_size: DEFAULT_MAX_FILE_SIZE,
            allowed_content_types: vec![DEFAULT_CONTENT_TYPE.to_string()],
            json_suffix: DEFAULT_JSON_SUFFIX.to_string(),
        }
    }
}

/// One qualifying member of a validated archive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Entry {
    /// Member name as stored in the archive (may include directories)
    pub name: String,
    /// Compressed size from the central directory
    pub compressed_size: u64,
    /// Uncompressed size the archive claims for this member
    pub declared_uncompressed_size: u64,
    /// Bytes handed to the decoder (see [`EntrySource`])
    pub raw_bytes: Vec<u8>,
    pub source: EntrySource,
}

/// Where an entry's `raw_bytes` came from
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum EntrySource {
    /// The member's own inflated contents
    #[default]
    Member,
    /// The member was itself a zip; bytes are its first qualifying inner member
    Nested {
        /// Inner member name
        inner: String,
    },
    /// The member was a zip without a usable inner member; bytes are empty
    NestedRejected {
        /// Human-readable reason
        reason: String,
    },
}

/// Metadata for a member, read without decompressing it
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct EntryInfo {
    /// Member name within the archive
    pub name: String,
    /// Declared uncompressed size
    pub size: u64,
    /// Compressed size
    pub compressed_size: u64,
    /// Whether the member is a directory
    pub is_dir: bool,
    /// Whether the member is encrypted
    pub is_encrypted: bool,
}

/// Result of probing an entry's bytes for one more archive layer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NestedArchive {
    /// Bytes are not a zip container; decode them as they are
    NotArchive,
    /// First qualifying member of the inner archive
    Member {
        /// Inner member name
        name: String,
        /// Inflated inner member contents
        bytes: Vec<u8>,
    },
    /// Inner archive parsed but holds no qualifying member
    NoQualifyingMember,
    /// Inner member exists but could not be read
    Rejected(String),
    /// Inner member declares or inflates to more than the allowed size
    OverLimit {
        /// Declared size, or bytes produced before reading stopped
        size: u64,
    },
}

/// Case-insensitive suffix match on a member name.
#[inline]
pub fn has_suffix(name: &str, suffix: &str) -> bool {
    let (name, suffix) = (name.as_bytes(), suffix.as_bytes());
    name.len() >= suffix.len() && name[name.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

/// Validate an uploaded archive and return its qualifying entries.
///
/// Checks run in this order, each before any more expensive work:
///
/// 1. declared content type against the allow-set
/// 2. raw buffer length against `max_archive_size`
/// 3. the buffer parses as a zip container
/// 4. the sum of every member's declared uncompressed size against
///    `max_uncompressed_size` (read from metadata only)
/// 5. at least one non-directory member ends in the JSON suffix
///
/// Only then are qualifying members inflated, with the running total of
/// produced bytes capped at `max_uncompressed_size` in case the declared
/// sizes lie. A qualifying member that is itself a zip is unwrapped here
/// (one layer, see [`unwrap_nested`]) and its inner member is charged to
/// the same running total.
///
/// # Errors
///
/// Returns the first [`ValidationError`] hit by the checks above. A
/// qualifying member that cannot be inflated (encrypted, unsupported
/// method, corrupt data) makes the whole archive `MalformedArchive`. An
/// unusable inner archive only affects its own entry
/// ([`EntrySource::NestedRejected`]).
///
/// # Examples
///
/// ```no_run
/// use actor_extract_archive::{validate_archive, ArchivePolicy};
///
/// let upload = std::fs::read("events.zip").unwrap();
/// let entries = validate_archive(&upload, "application/zip", &ArchivePolicy::default()).unwrap();
/// for entry in entries {
///     println!("{} ({} bytes)", entry.name, entry.raw_bytes.len());
/// }
/// ```
pub fn validate_archive(
    bytes: &[u8],
    content_type: &str,
    policy: &ArchivePolicy,
) -> Result<Vec<Entry>, ValidationError> {
    if !policy.accepts_content_type(content_type) {
        return Err(ValidationError::UnsupportedMediaType {
            content_type: content_type.to_string(),
            allowed: policy.allowed_content_types.clone(),
        });
    }

    let upload_size = bytes.len() as u64;
    if upload_size > policy.max_archive_size {
        return Err(ValidationError::SizeLimitExceeded {
            what: SizeLimit::Upload,
            size: upload_size,
            max: policy.max_archive_size,
        });
    }

    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut declared_total: u64 = 0;
    let mut qualifying = Vec::new();
    for index in 0..archive.len() {
        let member = archive.by_index_raw(index)?;
        if member.is_dir() {
            continue;
        }
        declared_total = declared_total.saturating_add(member.size());
        if has_suffix(member.name(), &policy.json_suffix) {
            qualifying.push(index);
        }
    }

    if declared_total > policy.max_uncompressed_size {
        return Err(ValidationError::SizeLimitExceeded {
            what: SizeLimit::DeclaredUncompressed,
            size: declared_total,
            max: policy.max_uncompressed_size,
        });
    }

    if qualifying.is_empty() {
        return Err(ValidationError::NoQualifyingEntries {
            suffix: policy.json_suffix.clone(),
        });
    }

    debug!(
        "Archive holds {} members, {} qualifying, {declared_total} bytes declared",
        archive.len(),
        qualifying.len()
    );

    let mut inflated: u64 = 0;
    let mut entries = Vec::with_capacity(qualifying.len());
    for index in qualifying {
        let mut member = archive.by_index(index)?;
        let name = member.name().to_string();
        let declared = member.size();
        let compressed_size = member.compressed_size();

        let budget = policy.max_uncompressed_size.saturating_sub(inflated);
        let mut raw_bytes = Vec::with_capacity(usize::try_from(declared.min(budget)).unwrap_or(0));
        member
            .by_ref()
            .take(budget.saturating_add(1))
            .read_to_end(&mut raw_bytes)
            .map_err(|e| ValidationError::MalformedArchive(format!("{name}: {e}")))?;

        inflated = inflated.saturating_add(raw_bytes.len() as u64);
        if inflated > policy.max_uncompressed_size {
            warn!("Member {name} inflated past its declared size ({declared} bytes declared)");
            return Err(ValidationError::SizeLimitExceeded {
                what: SizeLimit::Inflated,
                size: inflated,
                max: policy.max_uncompressed_size,
            });
        }

        let budget = policy.max_uncompressed_size - inflated;
        let (raw_bytes, source) = match unwrap_nested(&raw_bytes, &policy.json_suffix, budget) {
            NestedArchive::NotArchive => (raw_bytes, EntrySource::Member),
            NestedArchive::Member {
                name: inner,
                bytes,
            } => {
                debug!("Member {name} is an archive, using inner member {inner}");
                inflated += bytes.len() as u64;
                (bytes, EntrySource::Nested { inner })
            }
            NestedArchive::NoQualifyingMember => {
                warn!("Member {name} is an archive without a {} member", policy.json_suffix);
                let reason = format!("no {} member", policy.json_suffix);
                (Vec::new(), EntrySource::NestedRejected { reason })
            }
            NestedArchive::Rejected(reason) => {
                warn!("Member {name} nested archive rejected: {reason}");
                (Vec::new(), EntrySource::NestedRejected { reason })
            }
            NestedArchive::OverLimit { size } => {
                warn!("Member {name} holds an inner archive member of at least {size} bytes");
                return Err(ValidationError::SizeLimitExceeded {
                    what: SizeLimit::Inflated,
                    size: inflated.saturating_add(size),
                    max: policy.max_uncompressed_size,
                });
            }
        };

        entries.push(Entry {
            name,
            compressed_size,
            declared_uncompressed_size: declared,
            raw_bytes,
            source,
        });
    }

    Ok(entries)
}

/// List members of a zip buffer without decompressing them.
///
/// # Errors
///
/// Returns `MalformedArchive` if the buffer is not a readable zip container.
pub fn list_entries(bytes: &[u8]) -> Result<Vec<EntryInfo>, ValidationError> {
    let mut archive = ZipArchive::new(Cursor::new(bytes))?;

    let mut entries = Vec::with_capacity(archive.len());
    for index in 0..archive.len() {
        let member = archive.by_index_raw(index)?;
        entries.push(EntryInfo {
            name: member.name().to_string(),
            size: member.size(),
            compressed_size: member.compressed_size(),
            is_dir: member.is_dir(),
            is_encrypted: member.encrypted(),
        });
    }

    Ok(entries)
}

/// Unwrap one archive layer from an entry's bytes.
///
/// Used for archives-of-archives: when an entry is itself a zip container,
/// its first member ending in `json_suffix` (in archive order) stands in for
/// the entry. Only one layer is ever unwrapped. At most `max_size` bytes are
/// inflated; [`validate_archive`] passes what is left of the request's
/// uncompressed budget.
pub fn unwrap_nested(bytes: &[u8], json_suffix: &str, max_size: u64) -> NestedArchive {
    let Ok(mut archive) = ZipArchive::new(Cursor::new(bytes)) else {
        return NestedArchive::NotArchive;
    };

    let mut target = None;
    for index in 0..archive.len() {
        match archive.by_index_raw(index) {
            Ok(member) if !member.is_dir() && has_suffix(member.name(), json_suffix) => {
                target = Some(index);
                break;
            }
            Ok(_) => {}
            Err(e) => return NestedArchive::Rejected(format!("unreadable inner member: {e}")),
        }
    }

    let Some(index) = target else {
        return NestedArchive::NoQualifyingMember;
    };

    let mut member = match archive.by_index(index) {
        Ok(member) => member,
        Err(e) => return NestedArchive::Rejected(format!("unreadable inner member: {e}")),
    };
    let name = member.name().to_string();
    if member.size() > max_size {
        return NestedArchive::OverLimit {
            size: member.size(),
        };
    }

    let mut contents = Vec::new();
    if let Err(e) = member
        .by_ref()
        .take(max_size.saturating_add(1))
        .read_to_end(&mut contents)
    {
        return NestedArchive::Rejected(format!("inner member {name}: {e}"));
    }
    if contents.len() as u64 > max_size {
        return NestedArchive::OverLimit {
            size: contents.len() as u64,
        };
    }

    NestedArchive::Member {
        name,
        bytes: contents,
    }
}
