//! Job orchestration
//!
//! This module provides:
//! - [`Orchestrator`] - queue owner with blocking and streaming run modes
//! - [`JobQueue`] - internally synchronized FIFO of pending jobs
//! - [`RunSummary`] - per-run outcome counters
//!
//! # Run lifecycle
//!
//! ```text
//!  add_job_to_queue ──► JobQueue ──drain──► dispatch loop
//!                                               │ reserve slot (≤ pool size)
//!                                               ▼
//!                                     WorkerPool::execute
//!                                               │
//!                        ┌──────────────────────┴─────────────────────┐
//!                        ▼                                            ▼
//!          start(): slot vector (submission order)    start_async(): mpsc (completion order)
//! ```

mod coordinator;
mod dispatch;
mod queue;
mod summary;

pub use coordinator::Orchestrator;
pub use queue::JobQueue;
pub use summary::RunSummary;
