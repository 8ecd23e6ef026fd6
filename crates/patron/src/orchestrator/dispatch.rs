//! Dispatch loop shared by blocking and streaming runs

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::{JoinError, JoinSet};
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use super::RunSummary;
use crate::error::JobError;
use crate::job::{Job, JobId};
use crate::worker::{WorkerPool, WorkerResult};

/// Where finished results go
pub(crate) enum ResultSink {
    /// One slot per drained job, filled by submission index
    Ordered(Vec<Option<WorkerResult>>),
    /// Forward results as they complete
    Stream(mpsc::Sender<WorkerResult>),
}

impl ResultSink {
    pub(crate) fn ordered(len: usize) -> Self {
        Self::Ordered((0..len).map(|_| None).collect())
    }

    async fn accept(&mut self, index: usize, result: WorkerResult) {
        match self {
            Self::Ordered(slots) => slots[index] = Some(result),
            Self::Stream(tx) => {
                if let Err(mpsc::error::SendError(result)) = tx.send(result).await {
                    debug!(job_id = %result.job_id, "Result receiver dropped, discarding result");
                }
            }
        }
    }

    /// Ordered results; empty for streaming sinks
    pub(crate) fn into_ordered(self) -> Vec<WorkerResult> {
        match self {
            Self::Ordered(slots) => slots.into_iter().flatten().collect(),
            Self::Stream(_) => Vec::new(),
        }
    }
}

/// Bookkeeping for one run
struct Run<'a> {
    sink: &'a mut ResultSink,
    summary: RunSummary,
    /// Job id per submission index, cleared once reported
    outstanding: Vec<Option<JobId>>,
}

impl<'a> Run<'a> {
    fn new(sink: &'a mut ResultSink, jobs: &[Job]) -> Self {
        Self {
            sink,
            summary: RunSummary::new(jobs.len()),
            outstanding: jobs.iter().map(|job| Some(job.id)).collect(),
        }
    }

    async fn report(&mut self, index: usize, result: WorkerResult) {
        self.outstanding[index] = None;
        self.summary.record(&result);
        self.sink.accept(index, result).await;
    }

    async fn joined(&mut self, joined: Result<(usize, WorkerResult), JoinError>) {
        match joined {
            Ok((index, result)) => self.report(index, result).await,
            // Index is recovered from `outstanding` once all workers finish
            Err(e) => error!(error = %e, "Worker task ended abnormally"),
        }
    }

    /// Report every job that never produced a result as lost
    async fn finish(mut self, started: Instant) -> RunSummary {
        let lost: Vec<(usize, JobId)> = self
            .outstanding
            .iter()
            .enumerate()
            .filter_map(|(index, id)| id.map(|id| (index, id)))
            .collect();
        for (index, job_id) in lost {
            warn!(%job_id, "Worker lost, reporting job as failed");
            self.report(index, WorkerResult::not_run(job_id, JobError::WorkerLost))
                .await;
        }

        self.summary.elapsed = started.elapsed();
        self.summary
    }
}

/// Drain `jobs` through `pool`, reporting every job exactly once to `sink`
///
/// Jobs are dispatched in submission order, at most `pool.size()` at a time.
/// Once `cancel` fires no further job is dispatched; the remaining ones are
/// reported as [`JobError::Cancelled`]. Jobs already running keep going
/// until their handler returns.
pub(crate) async fn drive(
    pool: Arc<WorkerPool>,
    jobs: Vec<Job>,
    cancel: CancellationToken,
    sink: &mut ResultSink,
) -> RunSummary {
    let started = Instant::now();
    let mut run = Run::new(sink, &jobs);
    let mut workers: JoinSet<(usize, WorkerResult)> = JoinSet::new();
    let mut pending = jobs.into_iter().enumerate();
    let mut next = pending.next();

    while let Some((index, mut job)) = next.take() {
        if cancel.is_cancelled() {
            let skipped = std::iter::once((index, job)).chain(pending.by_ref());
            for (index, job) in skipped {
                debug!(job_id = %job.id, "Run cancelled before dispatch");
                run.report(index, WorkerResult::not_run(job.id, JobError::Cancelled))
                    .await;
            }
            break;
        }

        tokio::select! {
            biased;

            _ = cancel.cancelled() => {
                next = Some((index, job));
            }
            Some(joined) = workers.join_next(), if !workers.is_empty() => {
                run.joined(joined).await;
                next = Some((index, job));
            }
            reserved = pool.reserve() => {
                match reserved {
                    Ok(slot) => {
                        job.context.attach_run(&cancel);
                        debug!(job_id = %job.id, index, "Dispatching job");
                        let pool = Arc::clone(&pool);
                        workers.spawn(async move { (index, pool.execute(slot, job).await) });
                    }
                    Err(error) => run.report(index, WorkerResult::not_run(job.id, error)).await,
                }
                next = pending.next();
            }
        }
    }

    while let Some(joined) = workers.join_next().await {
        run.joined(joined).await;
    }

    run.finish(started).await
}
