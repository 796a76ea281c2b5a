//! Chunk job execution
//!
//! This module provides:
//! - `ChunkTaskExecutor`: one job through oracle, merge and store, with retries
//! - `RetryPolicy`: exponential backoff with jitter and a soft attempt limit
//! - `WorkerPool`: bounded-concurrency consumer of queue deliveries

mod executor;
mod pool;
mod retry;

pub use executor::{AttemptStep, ChunkTaskExecutor, JobOutcome};
pub use pool::WorkerPool;
pub use retry::RetryPolicy;
