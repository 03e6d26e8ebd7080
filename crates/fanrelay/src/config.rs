//! Pipeline configuration.
//!
//! Controls how long the producer runs, how many relay workers share its
//! output, how slow each worker is, and how much buffering sits between the
//! stages. Capacities must be at least 1: the channels used here have no
//! rendezvous mode, so a capacity of 1 is the closest to a hand-off.

use crate::{Error, Result};
use core::time::Duration;

/// Default run length before the producer is cancelled.
pub const DEFAULT_DEADLINE: Duration = Duration::from_millis(1000);

/// Default number of relay workers.
pub const DEFAULT_NUM_WORKERS: usize = 5;

/// Default artificial delay a worker sleeps after relaying each value.
pub const DEFAULT_RELAY_DELAY: Duration = Duration::from_millis(1);

/// Default capacity of the shared producer channel.
pub const DEFAULT_SOURCE_BUFFER_SIZE: usize = 1;

/// Default capacity of each worker's private output channel.
pub const DEFAULT_LANE_BUFFER_SIZE: usize = 1;

/// Settings for a single pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// Time after which the producer is cancelled.
    pub deadline: Duration,
    /// Number of relay workers (and collectors).
    pub num_workers: usize,
    /// Sleep after each relayed value.
    pub relay_delay: Duration,
    /// Capacity of the shared producer channel.
    pub source_buffer_size: usize,
    /// Capacity of each worker's private output channel.
    pub lane_buffer_size: usize,
    /// Capacity of the merge channel. `None` means one slot per worker.
    pub merge_buffer_size: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            deadline: DEFAULT_DEADLINE,
            num_workers: DEFAULT_NUM_WORKERS,
            relay_delay: DEFAULT_RELAY_DELAY,
            source_buffer_size: DEFAULT_SOURCE_BUFFER_SIZE,
            lane_buffer_size: DEFAULT_LANE_BUFFER_SIZE,
            merge_buffer_size: None,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub const fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = deadline;
        self
    }

    #[must_use]
    pub const fn with_num_workers(mut self, num_workers: usize) -> Self {
        self.num_workers = num_workers;
        self
    }

    #[must_use]
    pub const fn with_relay_delay(mut self, relay_delay: Duration) -> Self {
        self.relay_delay = relay_delay;
        self
    }

    /// Effective merge channel capacity.
    pub fn merge_capacity(&self) -> usize {
        self.merge_buffer_size.unwrap_or(self.num_workers)
    }

    /// Checks every value before anything is spawned.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if the worker count or any channel
    /// capacity is zero.
    pub fn validate(&self) -> Result<()> {
        if self.num_workers == 0 {
            return Err(invalid("num_workers must be greater than 0"));
        }
        if self.source_buffer_size == 0 {
            return Err(invalid("source_buffer_size must be greater than 0"));
        }
        if self.lane_buffer_size == 0 {
            return Err(invalid("lane_buffer_size must be greater than 0"));
        }
        if self.merge_capacity() == 0 {
            return Err(invalid("merge_buffer_size must be greater than 0"));
        }
        Ok(())
    }
}

fn invalid(reason: &str) -> Error {
    Error::InvalidConfig {
        reason: reason.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_are_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.merge_capacity(), DEFAULT_NUM_WORKERS);
    }

    #[test]
    fn rejects_zero_workers_and_capacities() {
        let err = PipelineConfig::default()
            .with_num_workers(0)
            .validate()
            .unwrap_err();
        assert!(err.is_configuration());

        let config = PipelineConfig {
            lane_buffer_size: 0,
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());

        let config = PipelineConfig {
            merge_buffer_size: Some(0),
            ..PipelineConfig::default()
        };
        assert!(config.validate().is_err());
    }
}
