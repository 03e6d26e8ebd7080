use crate::{
    CompletionBarrier, Pipeline, PipelineConfig, Producer, ProducerStats, RelayWorker, Sequence,
    Stage, Totals, channel, deadline_token, series_sum, verify,
};
use core::time::Duration;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

fn quick_config(num_workers: usize) -> PipelineConfig {
    PipelineConfig::default()
        .with_deadline(Duration::from_millis(30))
        .with_num_workers(num_workers)
        .with_relay_delay(Duration::ZERO)
}

fn assert_conserved(report: &crate::RunReport) {
    assert_eq!(report.verdict, Ok(()));
    assert_eq!(report.produced, report.aggregated);
    assert_eq!(report.split.total(), report.produced.count);
    assert_eq!(report.produced.sum, series_sum(report.produced.count));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn zero_deadline_moves_nothing() {
    let config = PipelineConfig::default().with_deadline(Duration::ZERO);
    let report = Pipeline::new(config).unwrap().run().await.unwrap();

    assert_eq!(report.produced, Totals::default());
    assert_eq!(report.aggregated, Totals::default());
    assert_eq!(report.split.counts(), &[0; 5]);
    assert!(report.is_verified());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn one_second_five_workers_one_ms_delay() {
    let config = PipelineConfig::default()
        .with_deadline(Duration::from_millis(1000))
        .with_num_workers(5)
        .with_relay_delay(Duration::from_millis(1));
    let report = Pipeline::new(config).unwrap().run().await.unwrap();

    assert_conserved(&report);
    assert_eq!(report.split.len(), 5);
    // Five workers sleeping ~1ms per value cannot get anywhere near this.
    assert!(report.produced.count > 0);
    assert!(report.produced.count < 1_000_000);
    assert!(report.elapsed >= Duration::from_millis(900));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn conserves_totals_for_any_worker_count() {
    for num_workers in [1, 2, 3, 8, 32] {
        let report = Pipeline::new(quick_config(num_workers))
            .unwrap()
            .run()
            .await
            .unwrap();
        assert_conserved(&report);
        assert_eq!(report.split.len(), num_workers);
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn deep_buffers_still_drain_completely() {
    let config = PipelineConfig {
        source_buffer_size: 64,
        lane_buffer_size: 64,
        merge_buffer_size: Some(256),
        ..quick_config(4)
    };
    let report = Pipeline::new(config).unwrap().run().await.unwrap();
    assert_conserved(&report);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn manual_cancel_stops_the_run() {
    let config = PipelineConfig::default()
        .with_deadline(Duration::from_secs(3600))
        .with_relay_delay(Duration::ZERO);
    let cancel = CancellationToken::new();

    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(20)).await;
        trigger.cancel();
    });

    let report = tokio::time::timeout(
        Duration::from_secs(10),
        Pipeline::new(config).unwrap().run_until(cancel),
    )
    .await
    .expect("cancelled pipeline should drain")
    .unwrap();

    assert_conserved(&report);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn stages_are_observed_in_order() {
    let pipeline = Pipeline::new(quick_config(3)).unwrap();
    let mut rx = pipeline.subscribe();
    assert_eq!(*rx.borrow(), Stage::Running);

    let watcher = tokio::spawn(async move {
        let mut seen = vec![*rx.borrow_and_update()];
        while rx.changed().await.is_ok() {
            let stage = *rx.borrow_and_update();
            seen.push(stage);
            if stage.is_terminal() {
                break;
            }
        }
        seen
    });

    let report = pipeline.run().await.unwrap();
    assert!(report.is_verified());

    let seen = watcher.await.unwrap();
    let order = [
        Stage::Running,
        Stage::Draining,
        Stage::Merging,
        Stage::Aggregating,
        Stage::Verified,
    ];
    // A watch receiver may miss intermediate values, but never sees them
    // out of order, and always sees the last one.
    let positions: Vec<usize> = seen
        .iter()
        .map(|s| order.iter().position(|o| o == s).unwrap())
        .collect();
    assert!(positions.windows(2).all(|w| w[0] < w[1]), "{seen:?}");
    assert_eq!(seen.last(), Some(&Stage::Verified));
}

#[test]
fn invalid_config_is_rejected_before_running() {
    let err = Pipeline::new(PipelineConfig::default().with_num_workers(0)).unwrap_err();
    assert!(err.is_configuration());
}

/// Wires the stages by hand with a recording aggregator so that the exact set
/// of merged values can be checked, not only their count and sum.
#[tokio::test(flavor = "multi_thread", worker_threads = 8)]
async fn merged_values_are_exactly_one_through_count() {
    const WORKERS: usize = 6;

    let stats = Arc::new(ProducerStats::new());
    let (source_tx, source_rx) = channel::source(1);
    let (merge_tx, merge_rx) = channel::merge(WORKERS);

    let recorder = tokio::spawn(async move {
        let mut values = Vec::new();
        while let Ok(v) = merge_rx.recv().await {
            values.push(v);
        }
        values
    });

    let mut barrier = CompletionBarrier::new(merge_tx);
    let mut workers = Vec::new();
    for worker_id in 0..WORKERS {
        let (lane_tx, lane_rx) = channel::lane(1);
        barrier.register(lane_rx);
        let worker = RelayWorker::builder(worker_id)
            .input(source_rx.clone())
            .output(lane_tx)
            .build()
            .unwrap();
        workers.push(tokio::spawn(worker.run()));
    }
    drop(source_rx);

    let observed = Arc::clone(&stats);
    let producer = Producer::builder(move |v| observed.record(v))
        .output(source_tx)
        .build()
        .unwrap();
    let emitted = producer
        .run(deadline_token(Duration::from_millis(30)))
        .await
        .unwrap();

    for worker in workers {
        worker.await.unwrap().unwrap();
    }
    let split = barrier.wait().await.unwrap();
    let mut values = recorder.await.unwrap();

    let produced = stats.snapshot();
    assert_eq!(produced.count, emitted);

    values.sort_unstable();
    let expected: Vec<Sequence> = (1..=emitted).collect();
    assert_eq!(values, expected);

    let aggregated = values
        .iter()
        .fold(Totals::default(), |totals, &v| totals.add(v));
    assert_eq!(verify(produced, aggregated, &split), Ok(()));
}
