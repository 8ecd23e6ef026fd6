//! Environment-driven configuration

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::OrchestratorError;
use crate::worker::{WorkerPoolConfig, DEFAULT_POOL_SIZE};

/// Environment variable for the worker count
pub const ENV_WORKER_COUNT: &str = "PATRON_WORKER_COUNT";
/// Environment variable for the pool name
pub const ENV_POOL_NAME: &str = "PATRON_POOL_NAME";
/// Environment variable for the streaming channel capacity
pub const ENV_RESULT_BUFFER: &str = "PATRON_RESULT_BUFFER";

const DEFAULT_RESULT_BUFFER: usize = 64;

/// Orchestrator settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Worker pool settings
    pub pool: WorkerPoolConfig,

    /// Capacity of the result channel used by streaming consumers
    pub result_buffer: usize,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            pool: WorkerPoolConfig::default(),
            result_buffer: DEFAULT_RESULT_BUFFER,
        }
    }
}

impl OrchestratorConfig {
    /// Load from `PATRON_*` environment variables
    ///
    /// Missing or unparsable values fall back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load using an arbitrary key lookup
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();

        let size = parse_or(&lookup, ENV_WORKER_COUNT, DEFAULT_POOL_SIZE);
        let name = lookup(ENV_POOL_NAME).unwrap_or(defaults.pool.name);
        let result_buffer = parse_or(&lookup, ENV_RESULT_BUFFER, defaults.result_buffer);

        Self {
            pool: WorkerPoolConfig::new(size).with_name(name),
            result_buffer,
        }
    }

    /// Set the worker count
    pub fn with_workers(mut self, size: usize) -> Self {
        self.pool = self.pool.with_size(size);
        self
    }

    /// Set the result channel capacity
    pub fn with_result_buffer(mut self, capacity: usize) -> Self {
        self.result_buffer = capacity;
        self
    }

    /// Validate the configuration
    ///
    /// Worker counts are clamped on construction, so only the result buffer
    /// can be out of range.
    pub fn validate(&self) -> Result<(), OrchestratorError> {
        if self.result_buffer == 0 {
            return Err(OrchestratorError::Config(
                "result buffer must be at least 1".into(),
            ));
        }
        Ok(())
    }
}

fn parse_or<F>(lookup: &F, key: &str, default: usize) -> usize
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => default,
        Some(raw) => match raw.trim().parse::<usize>() {
            Ok(value) => value,
            Err(e) => {
                warn!(key, value = %raw, error = %e, "Invalid number, using default");
                default
            }
        },
    }
}
