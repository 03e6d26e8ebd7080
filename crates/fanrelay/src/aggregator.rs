use crate::{Totals, channel::MergeReceiver};
use futures::StreamExt;

/// Drains the merge channel until it is closed and returns count and sum.
///
/// Arrival order on the merge channel is arbitrary; the result does not
/// depend on it.
#[cfg_attr(feature = "tracing", tracing::instrument(name = "aggregator", skip_all))]
pub async fn aggregate(merge: MergeReceiver) -> Totals {
    let totals = merge
        .fold(Totals::default(), |totals, value| async move {
            totals.add(value)
        })
        .await;

    #[cfg(feature = "tracing")]
    tracing::debug!(
        "Merge channel closed after {} values (sum {})",
        totals.count,
        totals.sum
    );

    totals
}
