//! # Items core
//!
//! Storage-agnostic building blocks of the item service.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      BatchProcessor                          │
//! │  (lists ids, dispatches one task per item, collects results) │
//! └─────────────────────────────────────────────────────────────┘
//!                │                               │
//!                ▼                               ▼
//! ┌──────────────────────────────┐  ┌───────────────────────────┐
//! │          WorkerPool           │  │        ItemStore          │
//! │  (semaphore-bounded slots)    │  │  (in-memory / Postgres)   │
//! └──────────────────────────────┘  └───────────────────────────┘
//! ```

pub mod item;
pub mod memory;
pub mod processor;
pub mod store;
pub mod worker;

pub use item::{is_valid_email, FieldViolation, Item, ItemInput, ItemStatus, ValidationError};
pub use memory::InMemoryItemStore;
pub use processor::{
    BatchOutcome, BatchProcessor, ItemFailure, ItemWork, NoopWork, ProcessError, ProcessorConfig,
    SimulatedWork, WorkError,
};
pub use store::{ItemStore, StoreError};
pub use worker::{WorkerPool, WorkerPoolConfig, WorkerPoolError};
