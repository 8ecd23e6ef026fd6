//! Per-job outcome

use std::time::Duration;

use crate::error::JobError;
use crate::job::JobId;

/// Outcome of one job's handler invocation
///
/// Produced exactly once per job. `error` is `None` on success.
#[derive(Debug)]
pub struct WorkerResult {
    /// Identifier copied from the originating job
    pub job_id: JobId,

    /// Failure, if any
    pub error: Option<JobError>,

    /// Time spent in the handler (zero for jobs that never ran)
    pub elapsed: Duration,
}

impl WorkerResult {
    /// Successful outcome
    pub fn success(job_id: JobId, elapsed: Duration) -> Self {
        Self {
            job_id,
            error: None,
            elapsed,
        }
    }

    /// Failed outcome
    pub fn failure(job_id: JobId, error: JobError, elapsed: Duration) -> Self {
        Self {
            job_id,
            error: Some(error),
            elapsed,
        }
    }

    /// Outcome for a job that was never handed to a worker
    pub(crate) fn not_run(job_id: JobId, error: JobError) -> Self {
        Self::failure(job_id, error, Duration::ZERO)
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    /// Whether the job was cancelled before or during execution
    pub fn is_cancelled(&self) -> bool {
        self.error.as_ref().is_some_and(JobError::is_cancelled)
    }

    /// Convert into a plain `Result`
    pub fn into_result(self) -> Result<JobId, (JobId, JobError)> {
        match self.error {
            None => Ok(self.job_id),
            Some(err) => Err((self.job_id, err)),
        }
    }
}
