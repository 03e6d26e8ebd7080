//! The sequence producer.
//!
//! Emits `1, 2, 3, ...` onto the shared source channel until its cancellation
//! token fires. Each accepted value is reported to an observer before the
//! counter advances; the pipeline uses this to keep [`ProducerStats`].
//!
//! [`ProducerStats`]: crate::ProducerStats

use crate::{
    Error, Result, Sequence,
    channel::{CloseOnDrop, SourceSender},
};
use tokio_util::sync::CancellationToken;

/// Builder for [`Producer`].
///
/// The observer is required up front; the output channel is supplied
/// separately so that a missing channel is caught by [`build`] as a typed
/// configuration error instead of surfacing after tasks have started.
///
/// [`build`]: ProducerBuilder::build
pub struct ProducerBuilder<F> {
    output: Option<SourceSender>,
    observer: F,
}

impl<F> ProducerBuilder<F>
where
    F: FnMut(Sequence) + Send,
{
    #[must_use]
    pub fn output(mut self, output: SourceSender) -> Self {
        self.output = Some(output);
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::MissingChannel`] if no output channel was set.
    pub fn build(self) -> Result<Producer<F>> {
        let output = self.output.ok_or(Error::MissingChannel {
            component: "producer",
            channel: "output",
        })?;

        Ok(Producer {
            output: CloseOnDrop::new(output, "source"),
            observer: self.observer,
        })
    }
}

/// Single writer of the shared source channel.
///
/// The output channel is closed exactly once when the producer is dropped,
/// which covers cancellation, errors and panics in the observer alike.
pub struct Producer<F> {
    output: CloseOnDrop<Sequence>,
    observer: F,
}

impl<F> Producer<F>
where
    F: FnMut(Sequence) + Send,
{
    pub const fn builder(observer: F) -> ProducerBuilder<F> {
        ProducerBuilder {
            output: None,
            observer,
        }
    }

    /// Emits values until `cancel` fires and returns how many were accepted.
    ///
    /// Cancellation is checked before every send, and with priority over a
    /// send that is ready at the same time, so a token that is already
    /// cancelled yields zero emissions. A value whose send is interrupted by
    /// cancellation is never emitted and never observed.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the source was closed underneath
    /// the producer (every worker went away) before cancellation.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "producer", skip_all))]
    pub async fn run(self, cancel: CancellationToken) -> Result<Sequence> {
        let Self {
            output,
            mut observer,
        } = self;
        let mut next: Sequence = 1;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => {
                    #[cfg(feature = "tracing")]
                    tracing::debug!("Producer cancelled after {} values", next - 1);
                    break;
                }
                sent = output.sender().send(next) => {
                    if sent.is_err() {
                        return Err(Error::ChannelClosed {
                            context: format!("producer: source closed before value {next}"),
                        });
                    }
                    observer(next);
                    next += 1;
                }
            }
        }

        // `output` drops here and closes the source.
        Ok(next - 1)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::channel;
    use core::time::Duration;

    #[test]
    fn missing_output_is_a_configuration_error() {
        let err = Producer::builder(|_| {}).build().err().unwrap();
        assert_eq!(
            err,
            Error::MissingChannel {
                component: "producer",
                channel: "output",
            }
        );
        assert!(err.is_configuration());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn cancelled_token_emits_nothing_and_closes_output() {
        let (tx, rx) = channel::source(1);
        let mut observed = Vec::new();
        let cancel = CancellationToken::new();
        cancel.cancel();

        let emitted = Producer::builder(|v| observed.push(v))
            .output(tx)
            .build()
            .unwrap()
            .run(cancel)
            .await
            .unwrap();

        assert_eq!(emitted, 0);
        assert!(observed.is_empty());
        assert!(rx.is_closed());
        assert!(rx.recv().await.is_err());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn emits_contiguous_sequence_observed_in_order() {
        let (tx, rx) = channel::source(1);
        let cancel = CancellationToken::new();
        let (seen_tx, mut seen_rx) = tokio::sync::mpsc::unbounded_channel();

        let producer = Producer::builder(move |v| {
            let _ = seen_tx.send(v);
        })
        .output(tx)
        .build()
        .unwrap();
        let handle = tokio::spawn(producer.run(cancel.clone()));

        let mut received = Vec::new();
        while received.len() < 100 {
            received.push(rx.recv().await.unwrap());
        }
        cancel.cancel();
        // Drain whatever was accepted before the cancel was noticed.
        while let Ok(v) = rx.recv().await {
            received.push(v);
        }

        let emitted = handle.await.unwrap().unwrap();
        let expected: Vec<Sequence> = (1..=emitted).collect();
        assert_eq!(received, expected);

        let mut observed = Vec::new();
        while let Ok(v) = seen_rx.try_recv() {
            observed.push(v);
        }
        assert_eq!(observed, expected);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn closed_source_is_reported() {
        let (tx, rx) = channel::source(1);
        drop(rx);

        let result = Producer::builder(|_| {})
            .output(tx)
            .build()
            .unwrap()
            .run(CancellationToken::new())
            .await;

        assert!(matches!(result, Err(Error::ChannelClosed { .. })));
    }

    #[tokio::test(start_paused = true)]
    async fn deadline_stops_a_blocked_producer() {
        // Nobody reads, so the producer parks on its second send until the
        // deadline fires.
        let (tx, rx) = channel::source(1);
        let cancel = crate::deadline_token(Duration::from_millis(10));

        let emitted = Producer::builder(|_| {})
            .output(tx)
            .build()
            .unwrap()
            .run(cancel)
            .await
            .unwrap();

        assert_eq!(emitted, 1);
        assert_eq!(rx.recv().await, Ok(1));
        assert!(rx.recv().await.is_err());
    }
}
