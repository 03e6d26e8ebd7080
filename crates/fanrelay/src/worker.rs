use crate::{
    Error, Result, Sequence,
    channel::{LaneSender, SourceReceiver},
};
use core::time::Duration;

/// Builder for [`RelayWorker`].
///
/// Both channels are mandatory; [`build`](RelayWorkerBuilder::build) reports
/// whichever one is missing.
pub struct RelayWorkerBuilder {
    worker_id: usize,
    input: Option<SourceReceiver>,
    output: Option<LaneSender>,
    delay: Duration,
}

impl RelayWorkerBuilder {
    #[must_use]
    pub fn input(mut self, input: SourceReceiver) -> Self {
        self.input = Some(input);
        self
    }

    #[must_use]
    pub fn output(mut self, output: LaneSender) -> Self {
        self.output = Some(output);
        self
    }

    #[must_use]
    pub const fn delay(mut self, delay: Duration) -> Self {
        self.delay = delay;
        self
    }

    /// # Errors
    ///
    /// Returns [`Error::MissingChannel`] if the input or output channel was
    /// not set. The output is checked first.
    pub fn build(self) -> Result<RelayWorker> {
        let output = self.output.ok_or(Error::MissingChannel {
            component: "relay worker",
            channel: "output",
        })?;
        let input = self.input.ok_or(Error::MissingChannel {
            component: "relay worker",
            channel: "input",
        })?;

        Ok(RelayWorker {
            worker_id: self.worker_id,
            input,
            output,
            delay: self.delay,
        })
    }
}

/// Relays values from the shared source onto one private lane.
///
/// Several workers read the same source concurrently. Each value is taken by
/// exactly one of them; which one is up to the scheduler.
///
/// The worker is the only writer of its lane. The lane closes when the worker
/// returns, whatever the reason, because the sole [`LaneSender`] is dropped.
pub struct RelayWorker {
    worker_id: usize,
    input: SourceReceiver,
    output: LaneSender,
    delay: Duration,
}

impl RelayWorker {
    pub const fn builder(worker_id: usize) -> RelayWorkerBuilder {
        RelayWorkerBuilder {
            worker_id,
            input: None,
            output: None,
            delay: Duration::ZERO,
        }
    }

    pub const fn worker_id(&self) -> usize {
        self.worker_id
    }

    /// Relays until the source is closed and empty, then closes the lane.
    ///
    /// Returns the number of values relayed. With a zero delay the worker
    /// yields to the scheduler between values instead of arming a timer.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ChannelClosed`] if the lane was closed by its reader
    /// while the worker still had a value to write.
    #[cfg_attr(feature = "tracing", tracing::instrument(name = "relay_worker", skip_all, fields(worker_id = self.worker_id)))]
    pub async fn run(self) -> Result<Sequence> {
        #[cfg(feature = "tracing")]
        tracing::trace!("Worker {} started", self.worker_id);

        let mut relayed: Sequence = 0;

        while let Ok(value) = self.input.recv().await {
            if self.output.send(value).await.is_err() {
                return Err(Error::ChannelClosed {
                    context: format!(
                        "worker {}: lane closed before value {value} was written",
                        self.worker_id
                    ),
                });
            }
            relayed += 1;

            if self.delay.is_zero() {
                tokio::task::yield_now().await;
            } else {
                tokio::time::sleep(self.delay).await;
            }
        }

        #[cfg(feature = "tracing")]
        tracing::trace!(
            "Worker {} stopped after relaying {} values",
            self.worker_id,
            relayed
        );

        Ok(relayed)
    }
}
