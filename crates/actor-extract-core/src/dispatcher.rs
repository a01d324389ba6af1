//! Fan-out of validated entries onto the worker pool.

use std::panic::{self, AssertUnwindSafe};

use actor_extract_archive::{Entry, EntrySource};
use crossbeam_channel::{unbounded, Receiver};
use serde_json::Value;
use tracing::{debug, error, warn};

use crate::config::ProcessorConfig;
use crate::decoder::{decode_entry, DecodeOutcome, EntryStatus};
use crate::error::Result;
use crate::pool::{panic_message, WorkerPool};

/// Signature of the per-entry decode step run on the pool.
pub type DecodeFn = fn(&str, &[u8]) -> DecodeOutcome;

/// What one entry's task reported back
#[derive(Debug, Clone, PartialEq)]
pub struct EntryOutcome {
    pub name: String,
    pub actors: Vec<Value>,
    pub status: EntryStatus,
}

/// Completion stream for one request's entries.
///
/// Outcomes arrive in the order tasks finish, not the order they were
/// submitted.
#[derive(Debug)]
pub struct Batch {
    receiver: Receiver<EntryOutcome>,
    dispatched: usize,
}

impl Batch {
    /// Number of tasks submitted for this batch.
    #[must_use]
    pub fn dispatched(&self) -> usize {
        self.dispatched
    }

    /// Block until the next task finishes; `None` once every task reported
    /// or the remaining tasks can no longer report.
    pub fn next_outcome(&self) -> Option<EntryOutcome> {
        self.receiver.recv().ok()
    }
}

impl Iterator for Batch {
    type Item = EntryOutcome;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_outcome()
    }
}

pub struct Dispatcher {
    pool: WorkerPool,
    decode: DecodeFn,
}

impl Dispatcher {
    /// Build the shared pool sized from `config`.
    pub fn new(config: &ProcessorConfig) -> Result<Self> {
        Self::with_decoder(config, decode_entry)
    }

    /// Like [`Dispatcher::new`] with a custom decode step.
    pub fn with_decoder(config: &ProcessorConfig, decode: DecodeFn) -> Result<Self> {
        let pool = WorkerPool::new(config.max_workers, config.queue_capacity)?;
        Ok(Self { pool, decode })
    }

    #[must_use]
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Submit one decode task per entry.
    ///
    /// Blocks while the shared queue is full. Each task owns its entry. A
    /// task that panics reports an empty [`EntryStatus::Fault`] outcome
    /// instead of taking down its siblings.
    ///
    /// # Errors
    ///
    /// Fails with an internal fault if the pool is closed. Tasks submitted
    /// before the failure still run; their outcomes are discarded.
    pub fn dispatch(&self, entries: Vec<Entry>) -> Result<Batch> {
        let (sender, receiver) = unbounded();
        let dispatched = entries.len();

        for entry in entries {
            let sender = sender.clone();
            let decode = self.decode;
            self.pool.submit(move || {
                let outcome = run_entry(entry, decode);
                // The request may have given up; nobody left to tell.
                let _ = sender.send(outcome);
            })?;
        }

        debug!("Dispatched {dispatched} entries");
        Ok(Batch {
            receiver,
            dispatched,
        })
    }
}

impl std::fmt::Debug for Dispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dispatcher")
            .field("pool", &self.pool)
            .finish_non_exhaustive()
    }
}

fn run_entry(entry: Entry, decode: DecodeFn) -> EntryOutcome {
    let Entry {
        name,
        raw_bytes,
        source,
        ..
    } = entry;

    match source {
        EntrySource::Member => {}
        EntrySource::Nested { inner } => debug!("Entry {name}: decoding nested member {inner}"),
        EntrySource::NestedRejected { reason } => {
            warn!("Skipping nested archive {name}: {reason}");
            return EntryOutcome {
                name,
                actors: Vec::new(),
                status: EntryStatus::NestedArchiveRejected { reason },
            };
        }
    }

    match panic::catch_unwind(AssertUnwindSafe(|| decode(&name, &raw_bytes))) {
        Ok(DecodeOutcome { actors, status }) => EntryOutcome {
            name,
            actors,
            status,
        },
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!("Task processing error for entry {name}: {message}");
            EntryOutcome {
                name,
                actors: Vec::new(),
                status: EntryStatus::Fault { message },
            }
        }
    }
}
