//! Worker pool for item tasks
//!
//! This module provides:
//! - [`WorkerPool`] - bounded pool of execution slots, owned by whoever runs batches
//! - [`WorkerPoolConfig`] - pool sizing
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                       WorkerPool                             │
//! │                                                              │
//! │   spawn(task) ──► tokio::spawn ──► wait for permit ──► run   │
//! │                                                              │
//! │  ┌─────────────────────────────────────────────────────┐    │
//! │  │         Semaphore (max_concurrency permits)         │    │
//! │  │  [Task 1] [Task 2] [Task 3] ... [Task N]            │    │
//! │  └─────────────────────────────────────────────────────┘    │
//! └─────────────────────────────────────────────────────────────┘
//! ```

mod pool;

pub use pool::{WorkerPool, WorkerPoolConfig, WorkerPoolError};
