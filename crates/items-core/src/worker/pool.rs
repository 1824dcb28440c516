//! Bounded worker pool for per-item tasks
//!
//! Tasks are dispatched onto the tokio runtime straight away and each one
//! waits for a semaphore permit before it runs, so no more than
//! `max_concurrency` of them execute at any moment.

use std::future::Future;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;
use tracing::debug;

/// Worker pool configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Maximum concurrent task executions
    pub max_concurrency: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
        }
    }
}

impl WorkerPoolConfig {
    /// Set maximum concurrency
    pub fn with_max_concurrency(mut self, max: usize) -> Self {
        self.max_concurrency = max.max(1);
        self
    }
}

/// Worker pool errors
#[derive(Debug, thiserror::Error)]
pub enum WorkerPoolError {
    /// The pool was closed before the task obtained a slot
    #[error("worker pool is closed")]
    Closed,
}

/// Fixed-size pool of execution slots.
///
/// Cloning is cheap and yields a handle to the same slots, so every clone
/// shares one concurrency limit.
///
/// # Example
///
/// ```ignore
/// use items_core::worker::{WorkerPool, WorkerPoolConfig};
///
/// let pool = WorkerPool::new(WorkerPoolConfig::default().with_max_concurrency(4));
/// let handle = pool.spawn(async { 21 * 2 });
/// assert_eq!(handle.await??, 42);
/// ```
#[derive(Clone)]
pub struct WorkerPool {
    config: WorkerPoolConfig,
    permits: Arc<Semaphore>,
    active: Arc<AtomicUsize>,
}

impl WorkerPool {
    /// Create a new worker pool
    pub fn new(config: WorkerPoolConfig) -> Self {
        let config = WorkerPoolConfig::default().with_max_concurrency(config.max_concurrency);
        Self {
            permits: Arc::new(Semaphore::new(config.max_concurrency)),
            active: Arc::new(AtomicUsize::new(0)),
            config,
        }
    }

    /// Create a pool with the given number of slots
    pub fn with_max_concurrency(max: usize) -> Self {
        Self::new(WorkerPoolConfig::default().with_max_concurrency(max))
    }

    /// Dispatch a task.
    ///
    /// The task is detached from the caller: dropping the returned handle
    /// does not cancel it.
    pub fn spawn<F, T>(&self, task: F) -> JoinHandle<Result<T, WorkerPoolError>>
    where
        F: Future<Output = T> + Send + 'static,
        T: Send + 'static,
    {
        let permits = Arc::clone(&self.permits);
        let active = Arc::clone(&self.active);

        tokio::spawn(async move {
            let _permit = permits
                .acquire_owned()
                .await
                .map_err(|_| WorkerPoolError::Closed)?;

            active.fetch_add(1, Ordering::SeqCst);
            let _active = ActiveGuard(active);

            Ok(task.await)
        })
    }

    /// Stop admitting tasks. Tasks already holding a slot finish normally;
    /// tasks still waiting for one resolve to [`WorkerPoolError::Closed`].
    pub fn close(&self) {
        debug!(active = self.active_tasks(), "Closing worker pool");
        self.permits.close();
    }

    pub fn is_closed(&self) -> bool {
        self.permits.is_closed()
    }

    pub fn max_concurrency(&self) -> usize {
        self.config.max_concurrency
    }

    /// Slots currently free
    pub fn available_permits(&self) -> usize {
        self.permits.available_permits()
    }

    /// Tasks currently running (holding a slot)
    pub fn active_tasks(&self) -> usize {
        self.active.load(Ordering::SeqCst)
    }
}

impl Default for WorkerPool {
    fn default() -> Self {
        Self::new(WorkerPoolConfig::default())
    }
}

/// Decrements the active counter when a task finishes or unwinds
struct ActiveGuard(Arc<AtomicUsize>);

impl Drop for ActiveGuard {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}
