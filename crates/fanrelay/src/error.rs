//! Error types for the relay pipeline.
//!
//! Every failure in the pipeline is a defect, never a transient condition, so
//! nothing here is retried. Errors fall into two groups:
//!
//! ## Configuration errors
//! - `MissingChannel`: a component was built without one of its channels.
//! - `InvalidConfig`: a [`PipelineConfig`](crate::PipelineConfig) value is out
//!   of range (for example zero workers).
//!
//! Both are reported before any task is spawned.
//!
//! ## Consistency violations
//! - `CountMismatch`, `SumMismatch`: the producer and the aggregator disagree.
//! - `PartitionMismatch`: the per-worker split does not add up to the producer
//!   count.
//! - `SeriesMismatch`: the producer sum is not `count * (count + 1) / 2`.
//! - `ChannelClosed`: a value was written to a channel after it was closed.
//! - `StageOrder`: the pipeline tried to skip a stage.
//! - `TaskFailed`: a pipeline task panicked or was aborted.

use crate::{Sequence, Stage};

pub type Result<T> = core::result::Result<T, Error>;

/// Unified error type for the relay pipeline.
#[derive(Clone, thiserror::Error, Debug, PartialEq, Eq)]
pub enum Error {
    /// A component was constructed without a required channel.
    #[error("{component}: channel `{channel}` must be provided")]
    MissingChannel {
        component: &'static str,
        channel: &'static str,
    },

    /// A configuration value is outside of its allowed range.
    #[error("Invalid config: {reason}")]
    InvalidConfig { reason: String },

    /// A write was attempted on a channel that had already been closed.
    #[error("Channel closed: {context}")]
    ChannelClosed { context: String },

    /// The number of values seen by the aggregator differs from the producer.
    #[error("value counts differ: produced {produced} != aggregated {aggregated}")]
    CountMismatch {
        produced: Sequence,
        aggregated: Sequence,
    },

    /// The sum of values seen by the aggregator differs from the producer.
    #[error("value sums differ: produced {produced} != aggregated {aggregated}")]
    SumMismatch {
        produced: Sequence,
        aggregated: Sequence,
    },

    /// Some values were routed to no worker, or to more than one.
    #[error("worker split is wrong: produced {produced}, routed {routed}")]
    PartitionMismatch { produced: Sequence, routed: Sequence },

    /// The producer's sum is not the arithmetic series of its count.
    #[error("producer sum {sum} is not the series 1..={count} (expected {expected})")]
    SeriesMismatch {
        count: Sequence,
        sum: Sequence,
        expected: Sequence,
    },

    /// The pipeline attempted a stage transition that skips a stage.
    #[error("stage transition {from:?} -> {to:?} is not allowed")]
    StageOrder { from: Stage, to: Stage },

    /// A spawned pipeline task did not run to completion.
    #[error("Task failed: {context}")]
    TaskFailed { context: String },
}

impl Error {
    /// Returns `true` for wiring mistakes detected before the pipeline starts.
    pub const fn is_configuration(&self) -> bool {
        matches!(self, Self::MissingChannel { .. } | Self::InvalidConfig { .. })
    }

    pub(crate) fn task_failed(task: &str, err: &tokio::task::JoinError) -> Self {
        Self::TaskFailed {
            context: format!("{task}: {err}"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_configuration_errors() {
        let missing = Error::MissingChannel {
            component: "producer",
            channel: "output",
        };
        assert!(missing.is_configuration());
        assert_eq!(
            missing.to_string(),
            "producer: channel `output` must be provided"
        );

        let invalid = Error::InvalidConfig {
            reason: "num_workers must be greater than 0".to_string(),
        };
        assert!(invalid.is_configuration());

        let mismatch = Error::CountMismatch {
            produced: 3,
            aggregated: 2,
        };
        assert!(!mismatch.is_configuration());
        assert_eq!(
            mismatch.to_string(),
            "value counts differ: produced 3 != aggregated 2"
        );
    }
}
