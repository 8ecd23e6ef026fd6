//! Jobs: the units of work fed to the worker pool
//!
//! A [`Job`] carries a caller-assigned [`JobId`], a [`JobContext`] for
//! cancellation, and a [`Payload`] the handler reads with
//! [`Job::get_payload`].

mod context;
mod payload;

use std::fmt;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::time::Instant;

pub use context::JobContext;
pub use payload::Payload;

use crate::error::JobError;

/// Caller-assigned job identifier
///
/// Uniqueness within a run is up to the caller; the orchestrator does not
/// check it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub u64);

impl From<u64> for JobId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A unit of work
///
/// # Example
///
/// ```
/// use patron::Job;
///
/// let job = Job::new(10)
///     .with_payload("name", "HTTP Request")
///     .with_payload("dest_url", "http://localhost:8080/");
///
/// assert_eq!(job.get_payload("name").unwrap(), "HTTP Request");
/// assert!(job.get_payload("missing").is_err());
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    /// Job identifier
    pub id: JobId,

    /// Cancellation/deadline context passed through to the handler
    #[serde(skip)]
    pub context: JobContext,

    /// Keyed payload data
    #[serde(default)]
    pub payload: Payload,
}

impl Job {
    /// Create a job with an empty payload and a fresh context
    pub fn new(id: u64) -> Self {
        Self {
            id: JobId(id),
            context: JobContext::new(),
            payload: Payload::new(),
        }
    }

    /// Add a payload entry
    pub fn with_payload(mut self, key: impl Into<String>, value: impl Into<Value>) -> Self {
        self.payload.insert(key, value);
        self
    }

    /// Replace the whole payload
    pub fn with_payload_map(mut self, payload: impl Into<Payload>) -> Self {
        self.payload = payload.into();
        self
    }

    /// Replace the context
    pub fn with_context(mut self, context: JobContext) -> Self {
        self.context = context;
        self
    }

    /// Set a deadline on the current context
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.context = self.context.with_deadline(deadline);
        self
    }

    /// Set a time budget counted from the moment a worker picks the job up
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.context = self.context.with_timeout(timeout);
        self
    }

    /// Look up a payload value
    ///
    /// # Errors
    ///
    /// Returns [`JobError::PayloadNotFound`] if `key` is absent.
    pub fn get_payload(&self, key: &str) -> Result<&Value, JobError> {
        self.payload
            .get(key)
            .ok_or_else(|| JobError::PayloadNotFound {
                key: key.to_string(),
            })
    }

    /// Look up a payload value and deserialize it
    ///
    /// # Errors
    ///
    /// Returns [`JobError::PayloadNotFound`] if `key` is absent and
    /// [`JobError::PayloadType`] if the value does not fit `T`.
    pub fn get_payload_as<T: DeserializeOwned>(&self, key: &str) -> Result<T, JobError> {
        let value = self.get_payload(key)?;
        T::deserialize(value).map_err(|e| JobError::PayloadType {
            key: key.to_string(),
            reason: e.to_string(),
        })
    }
}
