//! Per-run outcome counters

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::info;

use crate::worker::WorkerResult;

/// Counts for one orchestration run
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct RunSummary {
    /// Jobs drained from the queue
    pub total: usize,
    /// Jobs whose handler succeeded
    pub succeeded: usize,
    /// Jobs that failed, excluding cancellations
    pub failed: usize,
    /// Jobs reported as cancelled
    pub cancelled: usize,
    /// Wall-clock duration of the run
    #[serde(with = "duration_millis")]
    pub elapsed: Duration,
}

impl RunSummary {
    pub(crate) fn new(total: usize) -> Self {
        Self {
            total,
            ..Self::default()
        }
    }

    /// Tally a finished set of results
    pub fn from_results(results: &[WorkerResult], elapsed: Duration) -> Self {
        let mut summary = Self::new(results.len());
        for result in results {
            summary.record(result);
        }
        summary.elapsed = elapsed;
        summary
    }

    /// Count one result
    pub fn record(&mut self, result: &WorkerResult) {
        match &result.error {
            None => self.succeeded += 1,
            Some(err) if err.is_cancelled() => self.cancelled += 1,
            Some(_) => self.failed += 1,
        }
    }

    /// Number of results recorded so far
    pub fn reported(&self) -> usize {
        self.succeeded + self.failed + self.cancelled
    }

    pub(crate) fn log(&self, pool: &str) {
        info!(
            pool,
            total = self.total,
            succeeded = self.succeeded,
            failed = self.failed,
            cancelled = self.cancelled,
            elapsed_ms = duration_millis::as_u64(&self.elapsed),
            "Run finished"
        );
    }
}

/// Serde support for Duration as milliseconds
mod duration_millis {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    /// Whole milliseconds, saturating at `u64::MAX`
    pub fn as_u64(duration: &Duration) -> u64 {
        u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
    }

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        as_u64(duration).serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
