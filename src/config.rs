//! Worker pool configuration.
//!
//! [`ExecutorConfig`] deserializes with serde (every field optional) and can be overlaid
//! from `TASKWEAVE_*` environment variables.

use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DagError, DagResult};

pub const ENV_WORKER_THREADS: &str = "TASKWEAVE_WORKER_THREADS";
pub const ENV_MAX_BLOCKING_THREADS: &str = "TASKWEAVE_MAX_BLOCKING_THREADS";
pub const ENV_SHUTDOWN_TIMEOUT_MS: &str = "TASKWEAVE_SHUTDOWN_TIMEOUT_MS";

/// Settings for the [`Executor`](crate::Executor)'s worker pool.
///
/// # Examples
///
/// ```
/// use taskweave::ExecutorConfig;
///
/// let config = ExecutorConfig {
///     worker_threads: 4,
///     ..ExecutorConfig::default()
/// };
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ExecutorConfig {
    /// Threads driving branches. Must cover the widest fan-out you want to run in
    /// parallel.
    pub worker_threads: usize,
    /// Cap on tokio's blocking-thread pool, which takes over a worker slot while an
    /// action blocks in place. It does not limit how many actions run at once; that is
    /// bounded by `worker_threads`.
    pub max_blocking_threads: usize,
    pub thread_name: String,
    pub thread_stack_size: Option<usize>,
    /// How long [`Executor::shutdown`](crate::Executor::shutdown) waits for in-flight
    /// actions.
    pub shutdown_timeout_ms: u64,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        let parallelism = std::thread::available_parallelism().map_or(2, |n| n.get());
        Self {
            worker_threads: parallelism.max(2),
            max_blocking_threads: 512,
            thread_name: "taskweave-worker".to_string(),
            thread_stack_size: None,
            shutdown_timeout_ms: 5_000,
        }
    }
}

impl ExecutorConfig {
    /// Defaults overlaid with the `TASKWEAVE_*` environment variables.
    ///
    /// # Errors
    ///
    /// Returns `DagError::InvalidConfig` if a variable is set but cannot be parsed.
    pub fn from_env() -> DagResult<Self> {
        Self::default().overlay(|key| std::env::var(key).ok())
    }

    /// Overlay values returned by `lookup` for each `TASKWEAVE_*` key.
    pub(crate) fn overlay<F>(mut self, lookup: F) -> DagResult<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(threads) = parse_var(&lookup, ENV_WORKER_THREADS)? {
            self.worker_threads = threads;
        }
        if let Some(threads) = parse_var(&lookup, ENV_MAX_BLOCKING_THREADS)? {
            self.max_blocking_threads = threads;
        }
        if let Some(ms) = parse_var(&lookup, ENV_SHUTDOWN_TIMEOUT_MS)? {
            self.shutdown_timeout_ms = ms;
        }
        Ok(self)
    }

    pub fn validate(&self) -> DagResult<()> {
        if self.worker_threads == 0 {
            return Err(DagError::InvalidConfig(
                "worker_threads must be at least 1".to_string(),
            ));
        }
        if self.max_blocking_threads == 0 {
            return Err(DagError::InvalidConfig(
                "max_blocking_threads must be at least 1".to_string(),
            ));
        }
        if self.thread_stack_size == Some(0) {
            return Err(DagError::InvalidConfig(
                "thread_stack_size must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_millis(self.shutdown_timeout_ms)
    }
}

fn parse_var<T, F>(lookup: &F, key: &str) -> DagResult<Option<T>>
where
    T: FromStr,
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| DagError::InvalidConfig(format!("{key}={raw:?} is not a valid number"))),
    }
}
