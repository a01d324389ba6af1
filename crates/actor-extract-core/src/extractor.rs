//! Request-level entry point combining validation, dispatch and aggregation.

use std::sync::Arc;
use std::time::Instant;

use actor_extract_archive::{validate_archive, ArchivePolicy};
use tracing::{info, info_span, warn};

use crate::aggregate::{AggregateResult, Aggregator};
use crate::config::ProcessorConfig;
use crate::dispatcher::{DecodeFn, Dispatcher};
use crate::error::Result;
use crate::pool::WorkerPool;

/// Turns uploaded archives into [`AggregateResult`]s.
///
/// Build one per process: it owns the worker pool every request shares.
/// `process` blocks the calling thread until every entry has been decoded,
/// so async callers should run it on a blocking thread.
#[derive(Debug)]
pub struct ActorExtractor {
    config: Arc<ProcessorConfig>,
    policy: ArchivePolicy,
    dispatcher: Dispatcher,
}

impl ActorExtractor {
    /// Validate `config` and start the worker pool.
    pub fn new(config: ProcessorConfig) -> Result<Self> {
        Self::build(config, None)
    }

    /// Like [`ActorExtractor::new`] with a custom per-entry decode step.
    pub fn with_decoder(config: ProcessorConfig, decode: DecodeFn) -> Result<Self> {
        Self::build(config, Some(decode))
    }

    fn build(config: ProcessorConfig, decode: Option<DecodeFn>) -> Result<Self> {
        config.validate()?;
        let policy = config.archive_policy();
        let dispatcher = match decode {
            Some(decode) => Dispatcher::with_decoder(&config, decode)?,
            None => Dispatcher::new(&config)?,
        };
        let config = Arc::new(config);

        info!(
            "Actor extractor ready: {} workers, queue capacity {}, max file size {} bytes",
            config.max_workers, config.queue_capacity, config.max_file_size
        );

        Ok(Self {
            config,
            policy,
            dispatcher,
        })
    }

    /// Effective configuration, for health and readiness reporting.
    #[must_use]
    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        self.dispatcher.pool()
    }

    /// Validate an upload, decode its entries in parallel and aggregate the actors.
    ///
    /// # Errors
    ///
    /// - [`crate::ExtractError::Validation`] when the upload is rejected; no
    ///   entry is decoded in that case
    /// - [`crate::ExtractError::Internal`] when the pool cannot accept or
    ///   complete the work
    ///
    /// Entries that fail to decode are not errors: they contribute no
    /// actors and are reported in [`AggregateResult::entries`].
    pub fn process(&self, bytes: &[u8], content_type: &str) -> Result<AggregateResult> {
        let span = info_span!("process_upload", bytes = bytes.len(), content_type);
        let _guard = span.enter();
        let start = Instant::now();

        let entries = validate_archive(bytes, content_type, &self.policy)
            .inspect_err(|e| warn!("Upload rejected: {e}"))?;

        let batch = self.dispatcher.dispatch(entries)?;
        let result = Aggregator::collect(batch)?;

        info!(
            "Processed {} files, {} actors in {:.2?}",
            result.files_processed,
            result.total_actors,
            start.elapsed()
        );
        Ok(result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ConfigError;
    use crate::error::ExtractError;

    #[test]
    fn test_rejects_invalid_config() {
        let config = ProcessorConfig {
            queue_capacity: 0,
            ..ProcessorConfig::with_workers(1)
        };
        let err = ActorExtractor::new(config).expect_err("invalid config");
        assert!(matches!(
            err,
            ExtractError::Config(ConfigError::NoQueueCapacity)
        ));
    }

    #[test]
    fn test_exposes_effective_config() {
        let extractor =
            ActorExtractor::new(ProcessorConfig::with_workers(3)).expect("extractor");
        assert_eq!(extractor.config().max_workers, 3);
        assert_eq!(extractor.pool().size(), 3);
        assert_eq!(extractor.pool().queue_capacity(), 12);
    }
}
