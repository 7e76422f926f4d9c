// Copyright (c) 2025 Erick Bourgeois, firestoned
// SPDX-License-Identifier: MIT

//! Worker configuration.
//!
//! [`WorkerConfig`] is read once at service start (from YAML) and validated.
//! Every task receives an immutable [`TaskConfig`] snapshot derived from it;
//! there is no global configuration state.
//!
//! # Example
//!
//! ```rust
//! use zone_worker::config::{TaskConfig, WorkerConfig};
//!
//! let config = WorkerConfig::from_yaml_str("threshold_percentage: 80\npoll_max_retries: 3\n").unwrap();
//! let task_config = TaskConfig::from(&config);
//! assert_eq!(task_config.threshold_percentage, 80);
//! assert_eq!(task_config.max_retries, 3);
//! ```

use crate::constants::{
    DEFAULT_POLL_DELAY_SECS, DEFAULT_POLL_MAX_RETRIES, DEFAULT_POLL_RETRY_INTERVAL_SECS,
    DEFAULT_POLL_TIMEOUT_SECS, DEFAULT_POOL_LOAD_RETRY_INTERVAL_SECS,
    DEFAULT_RECOVERY_INTERVAL_SECS, DEFAULT_THRESHOLD_PERCENTAGE, DEFAULT_WORKER_THREADS,
    MAX_SHARD, MIN_SHARD,
};
use crate::errors::WorkerError;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Worker service configuration. Durations are in whole seconds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkerConfig {
    /// Percentage of targets/nameservers that must succeed (0-100)
    pub threshold_percentage: u8,

    /// Timeout of a single SOA query or NOTIFY
    pub poll_timeout: u64,

    /// Sleep between backend action attempts and between poll rounds
    pub poll_retry_interval: u64,

    /// Maximum backend action attempts and poll rounds
    pub poll_max_retries: u32,

    /// Wait after pushing to targets before the first poll round
    pub poll_delay: u64,

    /// Master switch for sending NOTIFY messages
    pub notify: bool,

    /// Export zones synchronously
    pub export_synchronous: bool,

    /// Size of the executor's worker pool
    pub threads: usize,

    /// Interval of the periodic shard recovery sweep
    pub recovery_interval: u64,

    /// First shard (inclusive) this worker recovers
    pub shard_begin: u16,

    /// Last shard (inclusive) this worker recovers
    pub shard_end: u16,

    /// Upper bound of the back-off between attempts to load a pool
    pub pool_load_retry_interval: u64,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            threshold_percentage: DEFAULT_THRESHOLD_PERCENTAGE,
            poll_timeout: DEFAULT_POLL_TIMEOUT_SECS,
            poll_retry_interval: DEFAULT_POLL_RETRY_INTERVAL_SECS,
            poll_max_retries: DEFAULT_POLL_MAX_RETRIES,
            poll_delay: DEFAULT_POLL_DELAY_SECS,
            notify: true,
            export_synchronous: true,
            threads: DEFAULT_WORKER_THREADS,
            recovery_interval: DEFAULT_RECOVERY_INTERVAL_SECS,
            shard_begin: MIN_SHARD,
            shard_end: MAX_SHARD,
            pool_load_retry_interval: DEFAULT_POOL_LOAD_RETRY_INTERVAL_SECS,
        }
    }
}

impl WorkerConfig {
    /// Parse and validate a YAML document. Missing keys take their defaults.
    ///
    /// # Errors
    ///
    /// Returns an error if the YAML is malformed or the values fail [`validate`](Self::validate).
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(yaml).context("Failed to parse worker configuration")?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a YAML configuration file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, parsed, or validated.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read configuration file {}", path.display()))?;
        Self::from_yaml_str(&raw)
            .with_context(|| format!("Invalid configuration file {}", path.display()))
    }

    /// Check value ranges.
    ///
    /// # Errors
    ///
    /// Returns [`WorkerError::InvalidConfig`] when the threshold exceeds 100, the
    /// pool has no threads, the shard range is empty or out of bounds, or the
    /// poll timings add up to more than a [`Duration`] can hold.
    pub fn validate(&self) -> Result<(), WorkerError> {
        if self.threshold_percentage > 100 {
            return Err(WorkerError::InvalidConfig(format!(
                "threshold_percentage must be between 0 and 100, got {}",
                self.threshold_percentage
            )));
        }
        if self.threads == 0 {
            return Err(WorkerError::InvalidConfig(
                "threads must be at least 1".to_string(),
            ));
        }
        if self.shard_end > MAX_SHARD || self.shard_begin > self.shard_end {
            return Err(WorkerError::InvalidConfig(format!(
                "shard range [{}, {}] must be ordered and within [{MIN_SHARD}, {MAX_SHARD}]",
                self.shard_begin, self.shard_end
            )));
        }
        if TaskConfig::from(self).checked_max_prop_time().is_none() {
            return Err(WorkerError::InvalidConfig(format!(
                "poll timings overflow: ({} + {}) * {} + {} seconds",
                self.poll_timeout, self.poll_retry_interval, self.poll_max_retries, self.poll_delay
            )));
        }
        Ok(())
    }
}

/// Immutable snapshot of the tunables a task needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskConfig {
    pub threshold_percentage: u8,
    /// Per-query / per-NOTIFY timeout
    pub timeout: Duration,
    pub retry_interval: Duration,
    pub max_retries: u32,
    /// Wait between push and first poll
    pub delay: Duration,
    pub notify: bool,
    pub export_synchronous: bool,
}

impl TaskConfig {
    /// Upper bound on how long a zone action may take before it is considered stuck.
    ///
    /// `timeout * max_retries + retry_interval * max_retries + delay`,
    /// saturating at [`Duration::MAX`].
    #[must_use]
    pub fn max_prop_time(&self) -> Duration {
        self.checked_max_prop_time().unwrap_or(Duration::MAX)
    }

    /// [`max_prop_time`](Self::max_prop_time), or `None` on overflow.
    #[must_use]
    pub fn checked_max_prop_time(&self) -> Option<Duration> {
        self.timeout
            .checked_add(self.retry_interval)?
            .checked_mul(self.max_retries)?
            .checked_add(self.delay)
    }

    /// Number of attempts a retry loop makes: `max_retries`, but at least one.
    #[must_use]
    pub fn attempts(&self) -> u32 {
        self.max_retries.max(1)
    }
}

impl Default for TaskConfig {
    fn default() -> Self {
        Self::from(&WorkerConfig::default())
    }
}

impl From<&WorkerConfig> for TaskConfig {
    fn from(config: &WorkerConfig) -> Self {
        Self {
            threshold_percentage: config.threshold_percentage,
            timeout: Duration::from_secs(config.poll_timeout),
            retry_interval: Duration::from_secs(config.poll_retry_interval),
            max_retries: config.poll_max_retries,
            delay: Duration::from_secs(config.poll_delay),
            notify: config.notify,
            export_synchronous: config.export_synchronous,
        }
    }
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod config_tests;
