//! Error types for jobs and orchestration runs

use thiserror::Error;

/// Per-job failure
///
/// Every failure a job can have is carried as a [`JobError`] inside its
/// [`WorkerResult`](crate::worker::WorkerResult). None of these abort a run;
/// sibling jobs always report their own outcome.
#[derive(Debug, Error)]
pub enum JobError {
    /// A payload key requested by the handler is absent
    #[error("job payload not found: {key}")]
    PayloadNotFound { key: String },

    /// A payload value exists but does not have the requested shape
    #[error("job payload {key} has unexpected type: {reason}")]
    PayloadType { key: String, reason: String },

    /// The pool was built without a handler
    #[error("no handler configured for worker pool")]
    NoHandler,

    /// The run was cancelled before the job was dispatched, or the handler
    /// gave up after observing cancellation
    #[error("job cancelled")]
    Cancelled,

    /// The handler panicked while processing the job
    #[error("job handler panicked: {message}")]
    Panicked { message: String },

    /// The pool was closed before a slot could be reserved for the job
    #[error("worker pool is closed")]
    PoolClosed,

    /// The worker task ended without reporting a result
    #[error("worker exited without reporting a result")]
    WorkerLost,

    /// Error returned by the handler, passed through verbatim
    #[error(transparent)]
    Handler(#[from] anyhow::Error),
}

impl JobError {
    /// Wrap any error returned by handler code
    pub fn handler<E>(err: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Handler(anyhow::Error::new(err))
    }

    /// Whether this is a missing payload key
    pub fn is_payload_not_found(&self) -> bool {
        matches!(self, Self::PayloadNotFound { .. })
    }

    /// Whether the job was cancelled
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

/// Orchestrator-level errors
///
/// These reject a run before any job is dispatched.
#[derive(Debug, Error)]
pub enum OrchestratorError {
    /// Another run is already draining this orchestrator
    #[error("orchestrator is already running")]
    AlreadyRunning,

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_payload_not_found_display() {
        let err = JobError::PayloadNotFound {
            key: "name".to_string(),
        };
        assert_eq!(err.to_string(), "job payload not found: name");
        assert!(err.is_payload_not_found());
        assert!(!err.is_cancelled());
    }

    #[test]
    fn test_handler_error_is_transparent() {
        let err = JobError::from(anyhow::anyhow!("connection refused"));
        assert_eq!(err.to_string(), "connection refused");
        assert!(matches!(err, JobError::Handler(_)));
    }

    #[test]
    fn test_handler_wraps_std_error() {
        let io = std::io::Error::new(std::io::ErrorKind::TimedOut, "timed out");
        let err = JobError::handler(io);
        assert_eq!(err.to_string(), "timed out");
    }
}
