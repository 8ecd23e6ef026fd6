//! Worker pool and per-job results
//!
//! This module provides:
//! - [`WorkerPool`] - fixed-size pool sharing one async handler
//! - [`WorkerSlot`] - a reserved execution slot
//! - [`WorkerResult`] - outcome of one handler invocation
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────┐
//! │                    WorkerPool                        │
//! │  ┌───────────────────────────────────────────────┐  │
//! │  │       Semaphore (size permits = slots)        │  │
//! │  └───────────────────────────────────────────────┘  │
//! │         │ reserve()            │ execute(slot, job)  │
//! │         ▼                      ▼                     │
//! │  [slot 1] [slot 2] ... [slot N] ──► Handler(job)     │
//! │                                        │             │
//! │                                        ▼             │
//! │                                   WorkerResult       │
//! └─────────────────────────────────────────────────────┘
//! ```

mod pool;
mod result;

pub use pool::{
    Handler, HandlerResult, WorkerPool, WorkerPoolConfig, WorkerSlot, DEFAULT_POOL_SIZE,
};
pub use result::WorkerResult;
