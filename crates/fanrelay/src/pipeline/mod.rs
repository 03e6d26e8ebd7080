//! Wiring and driving a full fan-out/fan-in run.
//!
//! ```text
//!             ┌─> worker 0 ─> lane 0 ─> collector 0 ─┐
//! producer ─> source ─> ...                         ├─> merge ─> aggregator ─> verify
//!             └─> worker N ─> lane N ─> collector N ─┘
//! ```
//!
//! All stages run as independent Tokio tasks. The only shutdown signal is the
//! producer's cancellation token; after it fires, closing channels carries the
//! shutdown downstream:
//!
//! 1. The producer stops and closes the source.
//! 2. Each worker drains what is left of the source and closes its lane.
//! 3. Each collector drains its lane and returns.
//! 4. The completion barrier sees every collector return and closes merge.
//! 5. The aggregator drains merge and returns.
//!
//! The driver awaits these in order and advances the [`Stage`] at each step.

mod report;
#[cfg(test)]
mod tests;

pub use report::RunReport;

use crate::{
    CompletionBarrier, Error, PipelineConfig, ProducerStats, RelayWorker, Result, Sequence, Stage,
    StageTracker, Totals, aggregate, channel, deadline_token, producer::Producer, verify,
};
use futures::future::join_all;
use std::sync::Arc;
use tokio::{
    sync::watch,
    task::{AbortHandle, JoinHandle},
    time::Instant,
};
use tokio_util::sync::CancellationToken;

/// A single, validated pipeline run.
///
/// Construct with [`Pipeline::new`], optionally [`subscribe`] to stage
/// changes, then consume it with [`run`] or [`run_until`].
///
/// [`subscribe`]: Pipeline::subscribe
/// [`run`]: Pipeline::run
/// [`run_until`]: Pipeline::run_until
#[derive(Debug)]
pub struct Pipeline {
    config: PipelineConfig,
    stage: StageTracker,
}

impl Pipeline {
    /// # Errors
    ///
    /// Returns [`Error::InvalidConfig`] if `config` does not validate.
    pub fn new(config: PipelineConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            config,
            stage: StageTracker::new(),
        })
    }

    pub const fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Observes stage transitions of this run.
    pub fn subscribe(&self) -> watch::Receiver<Stage> {
        self.stage.subscribe()
    }

    /// Runs with a token that cancels the producer after the configured
    /// deadline.
    ///
    /// # Errors
    ///
    /// See [`run_until`](Self::run_until).
    pub async fn run(self) -> Result<RunReport> {
        let cancel = deadline_token(self.config.deadline);
        self.run_until(cancel).await
    }

    /// Runs until `cancel` fires and the pipeline has fully drained.
    ///
    /// Consistency failures do not make this return `Err`; they are carried in
    /// [`RunReport::verdict`] so that the numbers can still be reported.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingChannel`] if wiring fails (before any task starts).
    /// - [`Error::ChannelClosed`] if a stage wrote to a closed channel.
    /// - [`Error::TaskFailed`] if a stage panicked.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "pipeline", skip_all, fields(num_workers = self.config.num_workers)))]
    pub async fn run_until(self, cancel: CancellationToken) -> Result<RunReport> {
        let Self { config, stage } = self;

        let wiring = wire(&config)?;

        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting pipeline with {} workers (relay delay {:?})",
            config.num_workers,
            config.relay_delay
        );

        let start = Instant::now();
        let running = wiring.spawn(cancel);
        let aborts = running.abort_handles();

        match running.drive(&stage).await {
            Ok(mut report) => {
                report.elapsed = start.elapsed();
                stage.advance(report.stage())?;

                #[cfg(feature = "tracing")]
                match &report.verdict {
                    Ok(()) => tracing::info!(
                        "Pipeline verified {} values in {:?}",
                        report.produced.count,
                        report.elapsed
                    ),
                    Err(e) => tracing::error!("Pipeline verification failed: {}", e),
                }

                Ok(report)
            }
            Err(e) => {
                #[cfg(feature = "tracing")]
                tracing::error!("Pipeline aborted: {}", e);

                // Stop the producer and workers; closing their channels
                // unwinds the collectors and the aggregator.
                for task in aborts {
                    task.abort();
                }
                stage.fail();
                Err(e)
            }
        }
    }
}

/// Every component built and connected, nothing spawned yet.
struct Wiring<F> {
    stats: Arc<ProducerStats>,
    producer: Producer<F>,
    workers: Vec<RelayWorker>,
    lanes: Vec<channel::LaneReceiver>,
    barrier: CompletionBarrier,
    merge: channel::MergeReceiver,
}

/// Builds every component. Any wiring error is returned here, before a
/// single task exists.
fn wire(config: &PipelineConfig) -> Result<Wiring<impl FnMut(Sequence) + Send + 'static>> {
    let stats = Arc::new(ProducerStats::new());
    let (source_tx, source_rx) = channel::source(config.source_buffer_size);
    let (merge_tx, merge_rx) = channel::merge(config.merge_capacity());

    let observed = Arc::clone(&stats);
    let producer = Producer::builder(move |value| observed.record(value))
        .output(source_tx)
        .build()?;

    let mut workers = Vec::with_capacity(config.num_workers);
    let mut lanes = Vec::with_capacity(config.num_workers);
    for worker_id in 0..config.num_workers {
        let (lane_tx, lane_rx) = channel::lane(config.lane_buffer_size);
        workers.push(
            RelayWorker::builder(worker_id)
                .input(source_rx.clone())
                .output(lane_tx)
                .delay(config.relay_delay)
                .build()?,
        );
        lanes.push(lane_rx);
    }

    Ok(Wiring {
        stats,
        producer,
        workers,
        lanes,
        barrier: CompletionBarrier::new(merge_tx),
        merge: merge_rx,
    })
}

impl<F> Wiring<F>
where
    F: FnMut(Sequence) + Send + 'static,
{
    /// Spawns downstream stages first so that nothing upstream blocks on a
    /// stage that does not exist yet.
    fn spawn(self, cancel: CancellationToken) -> Running {
        let Self {
            stats,
            producer,
            workers,
            lanes,
            mut barrier,
            merge,
        } = self;

        let aggregator = tokio::spawn(aggregate(merge));
        // Lane `i` belongs to worker `i`, so registration order matches ids.
        for lane in lanes {
            barrier.register(lane);
        }
        let workers = workers
            .into_iter()
            .map(|worker| tokio::spawn(worker.run()))
            .collect();
        let producer = tokio::spawn(producer.run(cancel));

        Running {
            stats,
            producer,
            workers,
            barrier,
            aggregator,
        }
    }
}

/// Handles of a pipeline in flight.
struct Running {
    stats: Arc<ProducerStats>,
    producer: JoinHandle<Result<Sequence>>,
    workers: Vec<JoinHandle<Result<Sequence>>>,
    barrier: CompletionBarrier,
    aggregator: JoinHandle<Totals>,
}

impl Running {
    fn abort_handles(&self) -> Vec<AbortHandle> {
        core::iter::once(self.producer.abort_handle())
            .chain(self.workers.iter().map(JoinHandle::abort_handle))
            .collect()
    }

    /// Awaits each stage in shutdown order. The returned report has a zero
    /// `elapsed`; the caller fills it in.
    async fn drive(self, stage: &StageTracker) -> Result<RunReport> {
        let Self {
            stats,
            producer,
            workers,
            barrier,
            aggregator,
        } = self;

        let _emitted = producer
            .await
            .map_err(|e| Error::task_failed("producer", &e))??;
        #[cfg(feature = "tracing")]
        tracing::debug!("Producer closed the source after {} values", _emitted);
        stage.advance(Stage::Draining)?;

        for (worker_id, joined) in join_all(workers).await.into_iter().enumerate() {
            joined.map_err(|e| Error::task_failed(&format!("worker {worker_id}"), &e))??;
        }
        stage.advance(Stage::Merging)?;

        let split = barrier.wait().await?;
        stage.advance(Stage::Aggregating)?;

        let aggregated = aggregator
            .await
            .map_err(|e| Error::task_failed("aggregator", &e))?;
        let produced = stats.snapshot();

        let verdict = verify(produced, aggregated, &split);

        Ok(RunReport {
            produced,
            aggregated,
            split,
            elapsed: core::time::Duration::ZERO,
            verdict,
        })
    }
}
