//! Orchestrator: pending queue plus dispatch onto a worker pool

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, info_span, instrument, Instrument};

use super::dispatch::{drive, ResultSink};
use super::{JobQueue, RunSummary};
use crate::error::OrchestratorError;
use crate::job::Job;
use crate::worker::{WorkerPool, WorkerResult};

/// Owns a FIFO job queue and runs it through a [`WorkerPool`]
///
/// Two run modes:
/// - [`Orchestrator::start`] waits for every job and returns results in
///   submission order
/// - [`Orchestrator::start_async`] returns immediately and streams results
///   in completion order
///
/// Only one run may be active at a time; a second call while a run is
/// draining fails with [`OrchestratorError::AlreadyRunning`]. Jobs added
/// during a run wait for the next one.
///
/// # Example
///
/// ```ignore
/// use patron::prelude::*;
///
/// let orchestrator = Orchestrator::new(WorkerPool::new(
///     |job: Job| async move {
///         job.get_payload("name")?;
///         Ok(())
///     },
///     5,
/// ));
///
/// orchestrator.add_job_to_queue(Job::new(10).with_payload("name", "HTTP Request"));
/// orchestrator.add_job_to_queue(Job::new(11));
///
/// let results = orchestrator.start(CancellationToken::new()).await?;
/// assert!(results[0].is_success());
/// assert!(results[1].error.as_ref().unwrap().is_payload_not_found());
/// ```
pub struct Orchestrator {
    pool: Arc<WorkerPool>,
    queue: JobQueue,
    running: Arc<AtomicBool>,
}

impl Orchestrator {
    /// Create an orchestrator around a worker pool
    pub fn new(pool: WorkerPool) -> Self {
        Self::with_shared_pool(Arc::new(pool))
    }

    /// Create an orchestrator around a pool shared with other owners
    pub fn with_shared_pool(pool: Arc<WorkerPool>) -> Self {
        Self {
            pool,
            queue: JobQueue::new(),
            running: Arc::new(AtomicBool::new(false)),
        }
    }

    /// The worker pool
    pub fn pool(&self) -> &WorkerPool {
        &self.pool
    }

    /// Append a job to the tail of the queue
    pub fn add_job_to_queue(&self, job: Job) {
        self.queue.push(job);
    }

    /// Number of jobs not yet dispatched
    pub fn queue_length(&self) -> usize {
        self.queue.len()
    }

    /// Whether a run is currently draining
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    /// Run every queued job and wait for all of them
    ///
    /// Result `i` belongs to the `i`-th job in the queue when the call was
    /// made, whatever order the jobs finish in.
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::AlreadyRunning`] if another run is active.
    #[instrument(skip(self, cancel), fields(pool = %self.pool.name()))]
    pub async fn start(
        &self,
        cancel: CancellationToken,
    ) -> Result<Vec<WorkerResult>, OrchestratorError> {
        let _guard = RunGuard::acquire(&self.running)?;
        let jobs = self.queue.drain();

        info!(
            jobs = jobs.len(),
            workers = self.pool.size(),
            "Starting run"
        );

        let mut sink = ResultSink::ordered(jobs.len());
        let summary = drive(Arc::clone(&self.pool), jobs, cancel, &mut sink).await;
        summary.log(self.pool.name());

        Ok(sink.into_ordered())
    }

    /// Run every queued job in the background, streaming results to `results`
    ///
    /// Returns as soon as the queue is drained into the run. Each result is
    /// sent when its job finishes. The channel closes once every job of the
    /// run has been reported, so consumers can read until `recv` yields
    /// `None`. Must be called from within a Tokio runtime.
    ///
    /// The returned handle resolves to the run's [`RunSummary`].
    ///
    /// # Errors
    ///
    /// Returns [`OrchestratorError::AlreadyRunning`] if another run is active.
    pub fn start_async(
        &self,
        cancel: CancellationToken,
        results: mpsc::Sender<WorkerResult>,
    ) -> Result<JoinHandle<RunSummary>, OrchestratorError> {
        let guard = RunGuard::acquire(&self.running)?;
        let jobs = self.queue.drain();
        let pool = Arc::clone(&self.pool);

        let span = info_span!("start_async", pool = %pool.name());
        span.in_scope(|| {
            info!(
                jobs = jobs.len(),
                workers = pool.size(),
                "Starting streaming run"
            )
        });

        let handle = tokio::spawn(
            async move {
                let _guard = guard;
                let mut sink = ResultSink::Stream(results);
                let summary = drive(Arc::clone(&pool), jobs, cancel, &mut sink).await;
                summary.log(pool.name());
                summary
            }
            .instrument(span),
        );

        Ok(handle)
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("pool", &self.pool)
            .field("queue_length", &self.queue.len())
            .field("running", &self.is_running())
            .finish()
    }
}

/// Marks a run as active until dropped
struct RunGuard {
    running: Arc<AtomicBool>,
}

impl RunGuard {
    fn acquire(running: &Arc<AtomicBool>) -> Result<Self, OrchestratorError> {
        running
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| OrchestratorError::AlreadyRunning)?;
        Ok(Self {
            running: Arc::clone(running),
        })
    }
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        self.running.store(false, Ordering::Release);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_run_guard_is_exclusive() {
        let running = Arc::new(AtomicBool::new(false));

        let guard = RunGuard::acquire(&running).unwrap();
        assert!(matches!(
            RunGuard::acquire(&running),
            Err(OrchestratorError::AlreadyRunning)
        ));

        drop(guard);
        assert!(RunGuard::acquire(&running).is_ok());
    }

    #[test]
    fn test_new_with_handlerless_pool() {
        let orchestrator = Orchestrator::new(WorkerPool::without_handler(1));
        assert_eq!(orchestrator.queue_length(), 0);
        assert!(!orchestrator.is_running());
        assert!(!orchestrator.pool().has_handler());
    }
}
