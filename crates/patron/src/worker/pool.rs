//! Worker pool for job execution
//!
//! Bounds concurrent handler invocations with a semaphore and isolates
//! handler failures per job.

use std::any::Any;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use futures::future::BoxFuture;
use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio::time::Instant;
use tracing::{debug, error, warn};

use super::WorkerResult;
use crate::error::JobError;
use crate::job::Job;

/// Default number of concurrent workers
pub const DEFAULT_POOL_SIZE: usize = 5;

/// Handler execution result
pub type HandlerResult = Result<(), JobError>;

/// Handler function type
pub type Handler = Arc<dyn Fn(Job) -> BoxFuture<'static, HandlerResult> + Send + Sync>;

/// Worker pool configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Pool name, used in logs
    pub name: String,

    /// Maximum concurrent handler executions
    pub size: usize,
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            size: DEFAULT_POOL_SIZE,
        }
    }
}

impl WorkerPoolConfig {
    /// Create a configuration with the given size
    pub fn new(size: usize) -> Self {
        Self::default().with_size(size)
    }

    /// Set the pool name
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the pool size (at least 1)
    pub fn with_size(mut self, size: usize) -> Self {
        if size == 0 {
            warn!(pool = %self.name, "Worker pool size 0 raised to 1");
        }
        self.size = size.max(1);
        self
    }
}

/// A reserved execution slot
///
/// Holding a slot counts against the pool size. The slot is released when
/// dropped.
#[derive(Debug)]
pub struct WorkerSlot {
    _permit: OwnedSemaphorePermit,
}

/// Fixed-size pool of workers sharing one handler
///
/// The pool does not own tasks; callers drive it from as many tasks as they
/// like and the semaphore keeps at most `size` handlers running.
///
/// # Example
///
/// ```ignore
/// use patron::{Job, JobError, WorkerPool};
///
/// let pool = WorkerPool::new(
///     |job: Job| async move {
///         let name = job.get_payload("name")?;
///         tracing::info!(%name, "processing");
///         Ok(())
///     },
///     5,
/// );
///
/// let result = pool.run(Job::new(1).with_payload("name", "hello")).await;
/// assert!(result.is_success());
/// ```
pub struct WorkerPool {
    config: WorkerPoolConfig,
    handler: Option<Handler>,
    slots: Arc<Semaphore>,
}

impl WorkerPool {
    /// Create a pool of `size` workers running `handler`
    ///
    /// A size of zero is raised to one.
    pub fn new<F, Fut>(handler: F, size: usize) -> Self
    where
        F: Fn(Job) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        Self::with_config(
            handler,
            WorkerPoolConfig {
                size,
                ..WorkerPoolConfig::default()
            },
        )
    }

    /// Create a pool from a configuration
    pub fn with_config<F, Fut>(handler: F, config: WorkerPoolConfig) -> Self
    where
        F: Fn(Job) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = HandlerResult> + Send + 'static,
    {
        let handler: Handler = Arc::new(move |job| Box::pin(handler(job)));
        Self::from_parts(Some(handler), config)
    }

    /// Create a pool with no handler
    ///
    /// Every job run on this pool fails with [`JobError::NoHandler`].
    pub fn without_handler(size: usize) -> Self {
        Self::from_parts(
            None,
            WorkerPoolConfig {
                size,
                ..WorkerPoolConfig::default()
            },
        )
    }

    /// Create a pool from an optional, already boxed handler
    pub fn from_parts(handler: Option<Handler>, mut config: WorkerPoolConfig) -> Self {
        if config.size == 0 {
            warn!(pool = %config.name, "Worker pool size 0 raised to 1");
            config.size = 1;
        }
        if handler.is_none() {
            warn!(pool = %config.name, "Worker pool created without a handler");
        }

        Self {
            slots: Arc::new(Semaphore::new(config.size)),
            handler,
            config,
        }
    }

    /// Pool name
    pub fn name(&self) -> &str {
        &self.config.name
    }

    /// Number of concurrent workers
    pub fn size(&self) -> usize {
        self.config.size
    }

    pub fn has_handler(&self) -> bool {
        self.handler.is_some()
    }

    /// Number of slots currently held
    pub fn active_workers(&self) -> usize {
        self.config.size - self.slots.available_permits()
    }

    /// Stop handing out slots
    ///
    /// Handlers already running finish normally. Every later or pending
    /// [`reserve`](Self::reserve) fails with [`JobError::PoolClosed`].
    pub fn close(&self) {
        debug!(pool = %self.config.name, "Closing worker pool");
        self.slots.close();
    }

    pub fn is_closed(&self) -> bool {
        self.slots.is_closed()
    }

    /// Wait for a free slot
    ///
    /// Cancel-safe: dropping the future before it resolves reserves nothing.
    pub async fn reserve(&self) -> Result<WorkerSlot, JobError> {
        match Arc::clone(&self.slots).acquire_owned().await {
            Ok(permit) => Ok(WorkerSlot { _permit: permit }),
            Err(_) => {
                error!(pool = %self.config.name, "Worker pool is closed");
                Err(JobError::PoolClosed)
            }
        }
    }

    /// Run the handler for `job` on an already reserved slot
    ///
    /// Panics inside the handler are caught and reported as
    /// [`JobError::Panicked`]. A job timeout starts counting here. The slot
    /// is released on return.
    pub async fn execute(&self, slot: WorkerSlot, mut job: Job) -> WorkerResult {
        let job_id = job.id;
        let started = Instant::now();
        job.context.start_timeout(started);

        let outcome = match &self.handler {
            None => Err(JobError::NoHandler),
            Some(handler) => {
                let handler = Arc::clone(handler);
                match AssertUnwindSafe(async move { handler(job).await })
                    .catch_unwind()
                    .await
                {
                    Ok(outcome) => outcome,
                    Err(panic) => {
                        let message = panic_message(panic.as_ref());
                        warn!(pool = %self.config.name, %job_id, %message, "Job handler panicked");
                        Err(JobError::Panicked { message })
                    }
                }
            }
        };
        drop(slot);

        let elapsed = started.elapsed();
        match outcome {
            Ok(()) => {
                let elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);
                debug!(pool = %self.config.name, %job_id, elapsed_ms, "Job completed");
                WorkerResult::success(job_id, elapsed)
            }
            Err(error) => {
                debug!(pool = %self.config.name, %job_id, %error, "Job failed");
                WorkerResult::failure(job_id, error, elapsed)
            }
        }
    }

    /// Reserve a slot, then run the handler for `job`
    pub async fn run(&self, job: Job) -> WorkerResult {
        match self.reserve().await {
            Ok(slot) => self.execute(slot, job).await,
            Err(error) => WorkerResult::not_run(job.id, error),
        }
    }
}

impl std::fmt::Debug for WorkerPool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WorkerPool")
            .field("config", &self.config)
            .field("has_handler", &self.handler.is_some())
            .field("active_workers", &self.active_workers())
            .finish()
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::job::JobId;

    #[test]
    fn test_default_config() {
        let config = WorkerPoolConfig::default();
        assert_eq!(config.name, "default");
        assert_eq!(config.size, DEFAULT_POOL_SIZE);
    }

    #[test]
    fn test_config_builder() {
        let config = WorkerPoolConfig::new(0).with_name("http");
        assert_eq!(config.name, "http");
        assert_eq!(config.size, 1);
    }

    #[test]
    fn test_zero_size_is_clamped() {
        let pool = WorkerPool::new(|_job: Job| async { Ok(()) }, 0);
        assert_eq!(pool.size(), 1);
        assert_eq!(pool.active_workers(), 0);
    }

    #[test]
    fn test_without_handler_does_not_panic() {
        let pool = WorkerPool::without_handler(1);
        assert!(!pool.has_handler());
        assert_eq!(pool.size(), 1);
    }

    #[tokio::test]
    async fn test_run_without_handler_fails() {
        let pool = WorkerPool::without_handler(1);

        let result = pool.run(Job::new(3)).await;

        assert_eq!(result.job_id.0, 3);
        assert!(matches!(result.error, Some(JobError::NoHandler)));
    }

    #[tokio::test]
    async fn test_run_propagates_payload_error() {
        let pool = WorkerPool::new(
            |job: Job| async move {
                job.get_payload("name")?;
                Ok(())
            },
            2,
        );

        let ok = pool.run(Job::new(1).with_payload("name", "a")).await;
        let missing = pool.run(Job::new(2)).await;

        assert!(ok.is_success());
        assert!(missing
            .error
            .as_ref()
            .is_some_and(JobError::is_payload_not_found));
    }

    #[tokio::test]
    async fn test_handler_panic_is_isolated() {
        let pool = WorkerPool::new(
            |job: Job| async move {
                if job.id.0 == 1 {
                    panic!("boom");
                }
                Ok(())
            },
            1,
        );

        let panicked = pool.run(Job::new(1)).await;
        let fine = pool.run(Job::new(2)).await;

        assert!(matches!(
            panicked.error,
            Some(JobError::Panicked { ref message }) if message == "boom"
        ));
        assert!(fine.is_success());
        assert_eq!(pool.active_workers(), 0);
    }

    #[tokio::test]
    async fn test_closed_pool_rejects_jobs() {
        let pool = WorkerPool::new(|_job: Job| async { Ok(()) }, 2);
        assert!(!pool.is_closed());

        pool.close();
        let result = pool.run(Job::new(4)).await;

        assert!(pool.is_closed());
        assert_eq!(result.job_id, JobId(4));
        assert!(matches!(result.error, Some(JobError::PoolClosed)));
        assert_eq!(result.elapsed, Duration::ZERO);
    }

    #[tokio::test(start_paused = true)]
    async fn test_close_wakes_waiting_reserve() {
        let pool = Arc::new(WorkerPool::new(|_job: Job| async { Ok(()) }, 1));
        let held = pool.reserve().await.unwrap();

        let waiter = {
            let pool = Arc::clone(&pool);
            tokio::spawn(async move { pool.reserve().await.map(drop) })
        };
        tokio::task::yield_now().await;
        pool.close();

        assert!(matches!(waiter.await.unwrap(), Err(JobError::PoolClosed)));
        drop(held);
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_counts_from_execution_start() {
        let pool = WorkerPool::new(
            |job: Job| async move {
                tokio::select! {
                    _ = tokio::time::sleep(Duration::from_secs(1)) => Ok(()),
                    _ = job.context.done() => Err(JobError::Cancelled),
                }
            },
            1,
        );
        let job = Job::new(1).with_timeout(Duration::from_secs(2));

        // Queue wait longer than the budget
        tokio::time::sleep(Duration::from_secs(5)).await;
        let result = pool.run(job).await;

        assert!(result.is_success());
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrency_is_bounded() {
        let running = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let pool = {
            let running = Arc::clone(&running);
            let peak = Arc::clone(&peak);
            Arc::new(WorkerPool::new(
                move |_job: Job| {
                    let running = Arc::clone(&running);
                    let peak = Arc::clone(&peak);
                    async move {
                        let now = running.fetch_add(1, Ordering::SeqCst) + 1;
                        peak.fetch_max(now, Ordering::SeqCst);
                        tokio::time::sleep(Duration::from_millis(50)).await;
                        running.fetch_sub(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
                2,
            ))
        };

        let handles: Vec<_> = (0..6)
            .map(|i| {
                let pool = Arc::clone(&pool);
                tokio::spawn(async move { pool.run(Job::new(i)).await })
            })
            .collect();

        for handle in handles {
            assert!(handle.await.unwrap().is_success());
        }

        assert_eq!(peak.load(Ordering::SeqCst), 2);
    }
}
