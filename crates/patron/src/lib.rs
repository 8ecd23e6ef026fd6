//! # Patron
//!
//! A bounded worker-pool job orchestrator.
//!
//! Callers enqueue [`Job`]s carrying keyed JSON payloads; a fixed-size
//! [`WorkerPool`] runs one shared async handler against each job, at most
//! `size` at a time. The [`Orchestrator`] drains its queue in one of two
//! modes:
//!
//! - **Blocking** ([`Orchestrator::start`]): returns every [`WorkerResult`]
//!   once all jobs are done, in submission order
//! - **Streaming** ([`Orchestrator::start_async`]): returns at once and sends
//!   each result on a channel as soon as its job finishes
//!
//! ## Failure isolation
//!
//! A failing, panicking or cancelled job never affects its siblings. Each
//! job reports exactly one result, and a missing payload key surfaces as
//! [`JobError::PayloadNotFound`].
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      Orchestrator                            │
//! │  (FIFO JobQueue, single-run guard, dispatch loop)           │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                      WorkerPool                              │
//! │  (semaphore-bounded slots, shared handler, panic capture)   │
//! └─────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 Handler(Job) -> Result<(), JobError>         │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use patron::prelude::*;
//!
//! # async fn run() -> Result<(), OrchestratorError> {
//! let pool = WorkerPool::new(
//!     |job: Job| async move {
//!         let name = job.get_payload("name")?;
//!         tracing::info!(job_id = %job.id, %name, "job completed");
//!         Ok(())
//!     },
//!     5,
//! );
//! let orchestrator = Orchestrator::new(pool);
//!
//! orchestrator.add_job_to_queue(Job::new(10).with_payload("name", "HTTP Request"));
//! orchestrator.add_job_to_queue(Job::new(11).with_payload("name", "HTTP Request"));
//!
//! let results = orchestrator.start(CancellationToken::new()).await?;
//! assert!(results.iter().all(WorkerResult::is_success));
//! # Ok(())
//! # }
//! ```

pub mod config;
pub mod error;
pub mod job;
pub mod orchestrator;
pub mod worker;

/// Prelude for common imports
pub mod prelude {
    pub use crate::config::OrchestratorConfig;
    pub use crate::error::{JobError, OrchestratorError};
    pub use crate::job::{Job, JobContext, JobId, Payload};
    pub use crate::orchestrator::{Orchestrator, RunSummary};
    pub use crate::worker::{HandlerResult, WorkerPool, WorkerPoolConfig, WorkerResult};
    pub use tokio_util::sync::CancellationToken;
}

// Re-export key types at crate root
pub use config::OrchestratorConfig;
pub use error::{JobError, OrchestratorError};
pub use job::{Job, JobContext, JobId, Payload};
pub use orchestrator::{JobQueue, Orchestrator, RunSummary};
pub use tokio_util::sync::CancellationToken;
pub use worker::{Handler, HandlerResult, WorkerPool, WorkerPoolConfig, WorkerResult, WorkerSlot};
