//! Long-lived worker pool with a bounded job queue.
//!
//! One pool is built at startup and shared by every request. Submitters
//! block while the queue is full, so concurrent uploads cannot spawn more
//! decode work than `max_workers` threads and `queue_capacity` pending jobs.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::{debug, error};

use crate::error::PoolError;

type Job = Box<dyn FnOnce() + Send + 'static>;

pub struct WorkerPool {
    sender: Option<Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
    queue_capacity: usize,
}

impl WorkerPool {
    /// Start `size` worker threads sharing a queue of `queue_capacity` jobs.
    ///
    /// # Errors
    ///
    /// Returns [`PoolError::Spawn`] if the OS refuses a thread. Workers
    /// already started exit once the partially built pool is dropped.
    pub fn new(size: usize, queue_capacity: usize) -> Result<Self, PoolError> {
        let (sender, receiver) = bounded::<Job>(queue_capacity);

        let mut workers = Vec::with_capacity(size);
        for index in 0..size {
            let receiver = receiver.clone();
            let handle = thread::Builder::new()
                .name(format!("actor-extract-worker-{index}"))
                .spawn(move || worker_loop(&receiver))
                .map_err(|e| PoolError::Spawn(e.to_string()))?;
            workers.push(handle);
        }

        debug!("Started {size} workers (queue capacity {queue_capacity})");

        Ok(Self {
            sender: Some(sender),
            workers,
            queue_capacity,
        })
    }

    /// Queue a job, waiting for a free slot if the queue is full.
    pub fn submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(PoolError::Closed)?;
        sender.send(Box::new(job)).map_err(|_| PoolError::Closed)
    }

    /// Queue a job without waiting; fails with [`PoolError::Saturated`] when full.
    pub fn try_submit<F>(&self, job: F) -> Result<(), PoolError>
    where
        F: FnOnce() + Send + 'static,
    {
        let sender = self.sender.as_ref().ok_or(PoolError::Closed)?;
        match sender.try_send(Box::new(job)) {
            Ok(()) => Ok(()),
            Err(TrySendError::Full(_)) => Err(PoolError::Saturated),
            Err(TrySendError::Disconnected(_)) => Err(PoolError::Closed),
        }
    }

    #[must_use]
    pub fn size(&self) -> usize {
        self.workers.len()
    }

    #[must_use]
    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }

    /// Jobs waiting for a worker.
    #[must_use]
    pub fn queued(&self) -> usize {
        self.sender.as_ref().map_or(0, Sender::len)
    }

    /// Stop accepting jobs, let queued jobs finish, and join the workers.
    pub fn shutdown(&mut self) {
        if self.sender.take().is_none() {
            return;
        }
        for worker in self.workers.drain(..) {
            if worker.join().is_err() {
                error!("Worker thread exited abnormally");
            }
        }
        debug!("Worker pool shut down");
    }
}

impl Drop for WorkerPool {
    fn drop(&mut self) {
        self.shutdown();
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("size", &self.workers.len())
            .field("queue_capacity", &self.queue_capacity)
            .field("closed", &self.sender.is_none())
            .finish()
    }
}

fn worker_loop(receiver: &Receiver<Job>) {
    for job in receiver {
        if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
            error!("Worker job panicked: {}", panic_message(payload.as_ref()));
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        (*message).to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    #[test]
    fn test_runs_every_job() {
        let counter = Arc::new(AtomicUsize::new(0));
        let pool = WorkerPool::new(4, 8).expect("pool");
        assert_eq!(pool.size(), 4);

        for _ in 0..100 {
            let counter = Arc::clone(&counter);
            pool.submit(move || {
                counter.fetch_add(1, Ordering::SeqCst);
            })
            .expect("submit");
        }
        drop(pool);

        assert_eq!(counter.load(Ordering::SeqCst), 100);
    }

    #[test]
    fn test_worker_survives_panicking_job() {
        let pool = WorkerPool::new(1, 2).expect("pool");
        let (tx, rx) = crossbeam_channel::unbounded();

        pool.submit(|| panic!("boom")).expect("submit");
        pool.submit(move || tx.send(42).expect("send")).expect("submit");

        assert_eq!(rx.recv_timeout(Duration::from_secs(5)), Ok(42));
    }

    #[test]
    fn test_try_submit_reports_saturation() {
        let pool = WorkerPool::new(1, 1).expect("pool");
        let (started_tx, started_rx) = crossbeam_channel::bounded(0);
        let (release_tx, release_rx) = crossbeam_channel::bounded::<()>(0);

        pool.submit(move || {
            started_tx.send(()).expect("signal start");
            let _ = release_rx.recv();
        })
        .expect("submit blocker");
        started_rx
            .recv_timeout(Duration::from_secs(5))
            .expect("blocker started");

        pool.try_submit(|| {}).expect("one queue slot free");
        assert_eq!(pool.queued(), 1);
        assert_eq!(pool.try_submit(|| {}), Err(PoolError::Saturated));

        release_tx.send(()).expect("release blocker");
    }

    #[test]
    fn test_submit_after_shutdown_fails() {
        let mut pool = WorkerPool::new(2, 2).expect("pool");
        pool.shutdown();
        assert_eq!(pool.submit(|| {}), Err(PoolError::Closed));
        assert_eq!(pool.try_submit(|| {}), Err(PoolError::Closed));
        assert_eq!(pool.size(), 0);
    }

    #[test]
    fn test_panic_message_extracts_text() {
        let payload: Box<dyn Any + Send> = Box::new("static message");
        assert_eq!(panic_message(payload.as_ref()), "static message");
        let payload: Box<dyn Any + Send> = Box::new(String::from("owned"));
        assert_eq!(panic_message(payload.as_ref()), "owned");
    }
}
