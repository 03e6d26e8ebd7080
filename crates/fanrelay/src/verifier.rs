//! End-of-run consistency checks.
//!
//! Runs once the aggregator has returned. Every check compares two numbers
//! that a correct pipeline must keep equal; any difference means a value was
//! lost, duplicated, or misrouted.

use crate::{Error, Result, Totals, WorkerSplit, series_sum};

/// Checks the producer's totals against the aggregator's and the worker split.
///
/// Checks run in this order and the first failure is returned:
/// 1. producer count == aggregator count
/// 2. producer sum == aggregator sum
/// 3. producer count == sum of per-worker counters
/// 4. producer sum == `count * (count + 1) / 2`
///
/// # Errors
///
/// Returns [`Error::CountMismatch`], [`Error::SumMismatch`],
/// [`Error::PartitionMismatch`] or [`Error::SeriesMismatch`].
pub fn verify(produced: Totals, aggregated: Totals, split: &WorkerSplit) -> Result<()> {
    if produced.count != aggregated.count {
        return Err(Error::CountMismatch {
            produced: produced.count,
            aggregated: aggregated.count,
        });
    }

    if produced.sum != aggregated.sum {
        return Err(Error::SumMismatch {
            produced: produced.sum,
            aggregated: aggregated.sum,
        });
    }

    let routed = split.total();
    if produced.count - routed != 0 {
        return Err(Error::PartitionMismatch {
            produced: produced.count,
            routed,
        });
    }

    let expected = series_sum(produced.count);
    if produced.sum != expected {
        return Err(Error::SeriesMismatch {
            count: produced.count,
            sum: produced.sum,
            expected,
        });
    }

    Ok(())
}
