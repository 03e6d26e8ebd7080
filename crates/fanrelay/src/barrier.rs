//! Completion barrier for the fan-in stage.
//!
//! Collectors share the merge channel as writers, so none of them may close
//! it. The [`CompletionBarrier`] owns the closing side instead: it spawns and
//! tracks every collector, waits until all of them have returned, and only
//! then closes the merge channel. This keeps "who writes last" apart from
//! "who is allowed to close".

use crate::{
    Error, Result, Sequence, WorkerSplit,
    channel::{CloseOnDrop, LaneReceiver, MergeSender},
    collector::collect,
};
use futures::future::join_all;
use tokio::task::JoinHandle;

/// Spawns collectors and closes the merge channel once they have all finished.
pub struct CompletionBarrier {
    merge: CloseOnDrop<Sequence>,
    collectors: Vec<JoinHandle<Result<Sequence>>>,
}

impl CompletionBarrier {
    pub fn new(merge: MergeSender) -> Self {
        Self {
            merge: CloseOnDrop::new(merge, "merge"),
            collectors: Vec::new(),
        }
    }

    /// Spawns a collector for `lane` and registers it with the barrier.
    ///
    /// Collectors are indexed in registration order; register lane `i` as the
    /// `i`-th call so that the returned [`WorkerSplit`] lines up with worker
    /// ids.
    pub fn register(&mut self, lane: LaneReceiver) {
        let worker_id = self.collectors.len();
        let merge = self.merge.sender().clone();
        self.collectors
            .push(tokio::spawn(collect(worker_id, lane, merge)));
    }

    /// Number of registered collectors.
    pub fn parties(&self) -> usize {
        self.collectors.len()
    }

    /// Waits for every collector, then closes the merge channel.
    ///
    /// The merge channel is closed on every path, including when a collector
    /// failed, so the aggregator always sees end-of-stream.
    ///
    /// # Errors
    ///
    /// Returns the first collector error in registration order, or
    /// [`Error::TaskFailed`] if a collector panicked.
    pub async fn wait(self) -> Result<WorkerSplit> {
        let Self { merge, collectors } = self;
        let parties = collectors.len();

        let joined = join_all(collectors).await;

        #[cfg(feature = "tracing")]
        tracing::debug!("All {} collectors finished, closing merge channel", parties);
        drop(merge);

        let mut counts = Vec::with_capacity(parties);
        for (worker_id, result) in joined.into_iter().enumerate() {
            let collected = result
                .map_err(|e| Error::task_failed(&format!("collector {worker_id}"), &e))??;
            counts.push(collected);
        }

        Ok(WorkerSplit::new(counts))
    }
}
