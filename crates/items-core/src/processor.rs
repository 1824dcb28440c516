//! Batch status processor
//!
//! Marks every stored item as `PROCESSED`. One task per item id is
//! dispatched to the processor's [`WorkerPool`]; each task re-fetches its
//! item, runs the injected [`ItemWork`], then writes only the new status
//! so edits made to other fields while the work ran are kept.
//!
//! Tasks report their outcome over a channel and the calling task is the
//! only collector, so aggregation needs no shared list. A failing or
//! panicking task is recorded in [`BatchOutcome::failed`] and never stops
//! its siblings: a batch always returns every outcome it observed.

use std::collections::HashSet;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

use crate::item::{Item, ItemStatus};
use crate::store::{ItemStore, StoreError};
use crate::worker::{WorkerPool, WorkerPoolConfig};

/// Errors raised by per-item work
#[derive(Debug, thiserror::Error)]
pub enum WorkError {
    /// Work was interrupted before it finished
    #[error("work interrupted: {0}")]
    Interrupted(String),

    /// Work ran and failed
    #[error("work failed: {0}")]
    Failed(String),
}

/// Errors that abort a whole batch
#[derive(Debug, thiserror::Error)]
pub enum ProcessError {
    /// The id set could not be read, nothing was dispatched
    #[error("failed to list item ids: {0}")]
    ListIds(#[source] StoreError),
}

/// Failure inside a single item's task
#[derive(Debug, thiserror::Error)]
enum TaskError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error(transparent)]
    Work(#[from] WorkError),
}

/// Unit of work performed on each item before its status is flipped
#[async_trait]
pub trait ItemWork: Send + Sync {
    async fn perform(&self, item: &Item) -> Result<(), WorkError>;
}

/// Stand-in for real work: waits a fixed delay
#[derive(Debug, Clone)]
pub struct SimulatedWork {
    pub delay: Duration,
}

impl SimulatedWork {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl Default for SimulatedWork {
    fn default() -> Self {
        Self::new(Duration::from_millis(100))
    }
}

#[async_trait]
impl ItemWork for SimulatedWork {
    async fn perform(&self, _item: &Item) -> Result<(), WorkError> {
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        Ok(())
    }
}

/// Work that does nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopWork;

#[async_trait]
impl ItemWork for NoopWork {
    async fn perform(&self, _item: &Item) -> Result<(), WorkError> {
        Ok(())
    }
}

/// An item whose task failed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub id: i64,
    pub error: String,
}

/// Everything one batch observed
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchOutcome {
    pub run_id: Uuid,
    /// Items saved as `PROCESSED`, in completion order
    pub processed: Vec<Item>,
    /// Ids that no longer matched an item when their task ran
    pub skipped: Vec<i64>,
    pub failed: Vec<ItemFailure>,
}

impl BatchOutcome {
    fn new(run_id: Uuid) -> Self {
        Self {
            run_id,
            processed: Vec::new(),
            skipped: Vec::new(),
            failed: Vec::new(),
        }
    }

    /// True when no task failed
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn processed_count(&self) -> usize {
        self.processed.len()
    }

    pub fn into_processed(self) -> Vec<Item> {
        self.processed
    }
}

enum TaskOutcome {
    Processed(Item),
    Skipped(i64),
    Failed(ItemFailure),
}

impl TaskOutcome {
    fn id(&self) -> Option<i64> {
        match self {
            TaskOutcome::Processed(item) => item.id,
            TaskOutcome::Skipped(id) => Some(*id),
            TaskOutcome::Failed(failure) => Some(failure.id),
        }
    }
}

/// Processor configuration
#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Worker pool size
    pub workers: usize,
    /// Simulated per-item work
    pub item_delay: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            workers: 10,
            item_delay: Duration::from_millis(100),
        }
    }
}

impl ProcessorConfig {
    /// Create configuration from environment variables
    ///
    /// - `PROCESS_WORKERS`: worker pool size (default 10)
    /// - `PROCESS_ITEM_DELAY_MS`: simulated work per item (default 100)
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build configuration from an arbitrary key lookup
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let defaults = Self::default();
        Self {
            workers: parse_or(&lookup, "PROCESS_WORKERS", defaults.workers),
            item_delay: Duration::from_millis(parse_or(
                &lookup,
                "PROCESS_ITEM_DELAY_MS",
                defaults.item_delay.as_millis() as u64,
            )),
        }
    }
}

fn parse_or<T>(lookup: &impl Fn(&str) -> Option<String>, key: &str, default: T) -> T
where
    T: std::str::FromStr + std::fmt::Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default = %default, "Ignoring unparsable setting");
            default
        }),
        None => default,
    }
}

/// Concurrent status processor.
///
/// Owns its worker pool, so every batch run through the same processor
/// shares one concurrency limit.
///
/// # Example
///
/// ```ignore
/// use items_core::{BatchProcessor, InMemoryItemStore, NoopWork, WorkerPool};
///
/// let store = Arc::new(InMemoryItemStore::new());
/// let processor = BatchProcessor::new(store, WorkerPool::with_max_concurrency(4), Arc::new(NoopWork));
///
/// let outcome = processor.process_all().await?;
/// println!("processed {} items", outcome.processed_count());
/// ```
pub struct BatchProcessor {
    store: Arc<dyn ItemStore>,
    pool: WorkerPool,
    work: Arc<dyn ItemWork>,
    processed_total: Arc<AtomicU64>,
}

impl BatchProcessor {
    pub fn new(store: Arc<dyn ItemStore>, pool: WorkerPool, work: Arc<dyn ItemWork>) -> Self {
        Self {
            store,
            pool,
            work,
            processed_total: Arc::new(AtomicU64::new(0)),
        }
    }

    /// Build a processor with a fresh pool and simulated work
    pub fn from_config(store: Arc<dyn ItemStore>, config: &ProcessorConfig) -> Self {
        Self::new(
            store,
            WorkerPool::new(WorkerPoolConfig::default().with_max_concurrency(config.workers)),
            Arc::new(SimulatedWork::new(config.item_delay)),
        )
    }

    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Items processed by this processor since it was created
    pub fn processed_total(&self) -> u64 {
        self.processed_total.load(Ordering::Relaxed)
    }

    /// Mark every item stored at call time as `PROCESSED`.
    ///
    /// Returns once every dispatched task has reported.
    #[instrument(skip(self), fields(run_id = tracing::field::Empty))]
    pub async fn process_all(&self) -> Result<BatchOutcome, ProcessError> {
        let run_id = Uuid::now_v7();
        tracing::Span::current().record("run_id", tracing::field::display(run_id));

        let ids = self
            .store
            .list_item_ids()
            .await
            .map_err(ProcessError::ListIds)?;

        let mut outcome = BatchOutcome::new(run_id);
        if ids.is_empty() {
            debug!("No items to process");
            return Ok(outcome);
        }

        debug!(
            count = ids.len(),
            workers = self.pool.max_concurrency(),
            "Dispatching item tasks"
        );

        let (tx, mut rx) = mpsc::channel::<TaskOutcome>(ids.len());
        let mut pending: HashSet<i64> = HashSet::with_capacity(ids.len());

        for &id in &ids {
            pending.insert(id);

            let tx = tx.clone();
            let store = Arc::clone(&self.store);
            let work = Arc::clone(&self.work);
            let processed_total = Arc::clone(&self.processed_total);

            // Detached: the task finishes even if this batch stops waiting.
            self.pool.spawn(async move {
                let outcome = AssertUnwindSafe(process_one(store.as_ref(), work.as_ref(), id))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        TaskOutcome::Failed(ItemFailure {
                            id,
                            error: format!("task panicked: {}", panic_message(panic.as_ref())),
                        })
                    });

                if matches!(outcome, TaskOutcome::Processed(_)) {
                    processed_total.fetch_add(1, Ordering::Relaxed);
                }

                let _ = tx.send(outcome).await;
            });
        }
        drop(tx);

        while let Some(task) = rx.recv().await {
            if let Some(id) = task.id() {
                pending.remove(&id);
            }
            match task {
                TaskOutcome::Processed(item) => outcome.processed.push(item),
                TaskOutcome::Skipped(id) => {
                    debug!(id, "Item vanished before processing, skipped");
                    outcome.skipped.push(id);
                }
                TaskOutcome::Failed(failure) => {
                    warn!(id = failure.id, error = %failure.error, "Item processing failed");
                    outcome.failed.push(failure);
                }
            }
        }

        // Tasks refused by a closed pool never report.
        let mut unreported: Vec<i64> = pending.into_iter().collect();
        unreported.sort_unstable();
        for id in unreported {
            warn!(id, "Item task did not report an outcome");
            outcome.failed.push(ItemFailure {
                id,
                error: "task did not run to completion".to_string(),
            });
        }

        info!(
            processed = outcome.processed.len(),
            skipped = outcome.skipped.len(),
            failed = outcome.failed.len(),
            total_processed = self.processed_total(),
            "Batch processing finished"
        );

        Ok(outcome)
    }
}

async fn process_one(store: &dyn ItemStore, work: &dyn ItemWork, id: i64) -> TaskOutcome {
    match mark_processed(store, work, id).await {
        Ok(Some(item)) => TaskOutcome::Processed(item),
        // Missing on fetch, or deleted while the work ran
        Ok(None) => TaskOutcome::Skipped(id),
        Err(TaskError::Store(StoreError::ItemNotFound(_))) => TaskOutcome::Skipped(id),
        Err(e) => TaskOutcome::Failed(ItemFailure {
            id,
            error: e.to_string(),
        }),
    }
}

async fn mark_processed(
    store: &dyn ItemStore,
    work: &dyn ItemWork,
    id: i64,
) -> Result<Option<Item>, TaskError> {
    let Some(item) = store.find_item(id).await? else {
        return Ok(None);
    };

    work.perform(&item).await?;

    Ok(store.set_status(id, ItemStatus::PROCESSED).await?)
}

fn panic_message(panic: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = panic.downcast_ref::<&str>() {
        msg.to_string()
    } else if let Some(msg) = panic.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}
