//! Channel flavors used between the pipeline stages.
//!
//! | Channel | Writers       | Readers        | Flavor                      | Closed by          |
//! |---------|---------------|----------------|-----------------------------|--------------------|
//! | source  | producer      | all workers    | [`async_channel`] (MPMC)    | producer           |
//! | lane    | one worker    | one collector  | [`tokio::sync::mpsc`]       | its worker         |
//! | merge   | all collectors| aggregator     | [`async_channel`] (MPMC)    | completion barrier |
//!
//! The source needs competing consumers, which `tokio::sync::mpsc` cannot
//! provide. The merge channel needs an explicit close by a party that does not
//! write to it, which `async_channel::Sender::close` provides.

use crate::Sequence;
use tokio::sync::mpsc;

pub type SourceSender = async_channel::Sender<Sequence>;
pub type SourceReceiver = async_channel::Receiver<Sequence>;
pub type LaneSender = mpsc::Sender<Sequence>;
pub type LaneReceiver = mpsc::Receiver<Sequence>;
pub type MergeSender = async_channel::Sender<Sequence>;
pub type MergeReceiver = async_channel::Receiver<Sequence>;

/// Creates the shared producer channel. `capacity` must be non-zero.
pub fn source(capacity: usize) -> (SourceSender, SourceReceiver) {
    async_channel::bounded(capacity)
}

/// Creates one worker's private output channel. `capacity` must be non-zero.
pub fn lane(capacity: usize) -> (LaneSender, LaneReceiver) {
    mpsc::channel(capacity)
}

/// Creates the merge channel. `capacity` must be non-zero.
pub fn merge(capacity: usize) -> (MergeSender, MergeReceiver) {
    async_channel::bounded(capacity)
}

/// Closes the wrapped channel when dropped, on every exit path.
///
/// Closing through the guard closes the channel for every clone of the
/// sender, not only this one.
#[derive(Debug)]
pub(crate) struct CloseOnDrop<T> {
    tx: async_channel::Sender<T>,
    #[cfg_attr(not(feature = "tracing"), allow(dead_code))]
    name: &'static str,
}

impl<T> CloseOnDrop<T> {
    pub(crate) const fn new(tx: async_channel::Sender<T>, name: &'static str) -> Self {
        Self { tx, name }
    }

    pub(crate) const fn sender(&self) -> &async_channel::Sender<T> {
        &self.tx
    }
}

impl<T> Drop for CloseOnDrop<T> {
    fn drop(&mut self) {
        // `close` returns `false` if the channel was already closed, e.g. all
        // receivers went away first.
        let _closed = self.tx.close();
        #[cfg(feature = "tracing")]
        tracing::trace!("{} channel closed (first close: {})", self.name, _closed);
    }
}
