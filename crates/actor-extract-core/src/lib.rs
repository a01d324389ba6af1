//! Actor extraction from uploaded event archives
//!
//! Given a zip upload whose members hold JSON event records, this crate
//! returns every event's `actor` sub-record as one flat list.
//!
//! The pipeline, leaves first:
//!
//! 1. **Validation** ([`actor_extract_archive`]): content type, size limits,
//!    decompression-bomb check, JSON member filtering
//! 2. **Decoding** ([`decoder`]): per entry, an ordered cascade of text
//!    encodings and parse strategies; the first combination yielding actors
//!    wins and failures degrade to an empty result
//! 3. **Dispatch** ([`dispatcher`], [`pool`]): one task per entry on a
//!    long-lived bounded worker pool, with panics isolated per task
//! 4. **Aggregation** ([`aggregate`]): concatenation in completion order
//!
//! # Usage
//!
//! ```no_run
//! use actor_extract_core::{ActorExtractor, ProcessorConfig};
//!
//! let extractor = ActorExtractor::new(ProcessorConfig::default()).unwrap();
//! let upload = std::fs::read("events.zip").unwrap();
//! let result = extractor.process(&upload, "application/zip").unwrap();
//! println!("{} actors from {} files", result.total_actors, result.files_processed);
//! ```

pub mod aggregate;
pub mod config;
pub mod decoder;
pub mod dispatcher;
pub mod error;
pub mod extractor;
pub mod pool;

pub use actor_extract_archive::{EntrySource, SizeLimit, ValidationError};
pub use aggregate::{AggregateResult, Aggregator, EntryReport};
pub use config::{ConfigError, ProcessorConfig};
pub use decoder::{
    decode_entry, DecodeOutcome, EntryStatus, ParseStrategy, TextEncoding, ENCODING_ORDER,
    STRATEGY_ORDER,
};
pub use dispatcher::{Batch, DecodeFn, Dispatcher, EntryOutcome};
pub use error::{ExtractError, PoolError, Result};
pub use extractor::ActorExtractor;
pub use pool::WorkerPool;
