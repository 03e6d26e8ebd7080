//! Pipeline lifecycle tracking.
//!
//! A run moves strictly forward through
//! `Running -> Draining -> Merging -> Aggregating -> Verified | Failed`.
//! The current [`Stage`] is published on a [`watch`] channel so that callers
//! can follow a run while it is in flight.

use crate::{Error, Result};
use tokio::sync::watch;

/// Lifecycle stage of a pipeline run.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Stage {
    /// The producer is emitting and workers are draining the source.
    Running,
    /// The producer has stopped and closed the source; workers finish
    /// in-flight values.
    Draining,
    /// Every worker has closed its lane; collectors are finishing and the
    /// completion barrier is awaited.
    Merging,
    /// The merge channel is closed; the aggregator drains what is left.
    Aggregating,
    /// All consistency checks passed.
    Verified,
    /// A consistency check failed or a task died.
    Failed,
}

impl Stage {
    /// Returns `true` for `Verified` and `Failed`.
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Verified | Self::Failed)
    }

    const fn may_advance_to(self, next: Self) -> bool {
        matches!(
            (self, next),
            (Self::Running, Self::Draining)
                | (Self::Draining, Self::Merging)
                | (Self::Merging, Self::Aggregating)
                | (Self::Aggregating, Self::Verified | Self::Failed)
        )
    }
}

/// Owner of the stage watch channel. Only the pipeline driver advances it.
#[derive(Debug)]
pub struct StageTracker {
    tx: watch::Sender<Stage>,
}

impl Default for StageTracker {
    fn default() -> Self {
        Self::new()
    }
}

impl StageTracker {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(Stage::Running);
        Self { tx }
    }

    pub fn current(&self) -> Stage {
        *self.tx.borrow()
    }

    /// Returns a receiver that observes every subsequent transition.
    pub fn subscribe(&self) -> watch::Receiver<Stage> {
        self.tx.subscribe()
    }

    /// Moves to `next`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::StageOrder`] if `next` is not the immediate successor
    /// of the current stage. The stage is left unchanged in that case.
    pub fn advance(&self, next: Stage) -> Result<()> {
        let mut result = Ok(());
        self.tx.send_if_modified(|current| {
            if current.may_advance_to(next) {
                #[cfg(feature = "tracing")]
                tracing::debug!("Pipeline stage {:?} -> {:?}", current, next);
                *current = next;
                true
            } else {
                result = Err(Error::StageOrder {
                    from: *current,
                    to: next,
                });
                false
            }
        });
        result
    }

    /// Forces the terminal `Failed` stage from anywhere in the lifecycle.
    ///
    /// Used when a task dies before the run reaches `Aggregating`. A run that
    /// already reached a terminal stage is left as is.
    pub fn fail(&self) {
        self.tx.send_if_modified(|current| {
            if current.is_terminal() {
                return false;
            }
            #[cfg(feature = "tracing")]
            tracing::debug!("Pipeline stage {:?} -> Failed", current);
            *current = Stage::Failed;
            true
        });
    }
}
