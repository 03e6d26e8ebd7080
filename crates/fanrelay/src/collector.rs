use crate::{
    Error, Result, Sequence,
    channel::{LaneReceiver, MergeSender},
};

/// Drains one worker lane into the shared merge channel.
///
/// Counts every value it forwards; the count is owned by this task alone and
/// handed back on return. The collector never closes the merge channel, that
/// is the completion barrier's job.
///
/// # Errors
///
/// Returns [`Error::ChannelClosed`] if the merge channel was closed while the
/// collector still had values to forward.
#[cfg_attr(feature = "tracing", tracing::instrument(name = "collector", skip(lane, merge)))]
pub async fn collect(
    worker_id: usize,
    mut lane: LaneReceiver,
    merge: MergeSender,
) -> Result<Sequence> {
    let mut collected: Sequence = 0;

    while let Some(value) = lane.recv().await {
        collected += 1;
        if merge.send(value).await.is_err() {
            return Err(Error::ChannelClosed {
                context: format!("collector {worker_id}: merge closed before value {value}"),
            });
        }
    }

    #[cfg(feature = "tracing")]
    tracing::trace!("Collector {} drained {} values", worker_id, collected);

    Ok(collected)
}
