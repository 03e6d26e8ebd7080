//! # Shared value and statistics types
//!
//! - [`Sequence`] - The integer type carried through every channel
//! - [`ProducerStats`] - Atomic count/sum recorded by the producer's observer
//! - [`Totals`] - A plain count/sum pair (snapshot or aggregator result)
//! - [`WorkerSplit`] - Per-worker counters, ordered by worker index

use core::fmt;
use portable_atomic::{AtomicI64, Ordering};

/// A value emitted by the producer. Starts at 1 and increases by one per
/// emission.
pub type Sequence = i64;

/// Sum of the arithmetic series `1..=count`.
///
/// Saturates instead of overflowing; no deadline-bounded run gets close.
pub const fn series_sum(count: Sequence) -> Sequence {
    if count <= 0 {
        return 0;
    }
    // One of `count` and `count + 1` is even, so halve that one first.
    if count % 2 == 0 {
        (count / 2).saturating_mul(count.saturating_add(1))
    } else {
        count.saturating_mul(count.saturating_add(1) / 2)
    }
}

/// Count and sum of emitted values, updated from the producer's observer.
///
/// Both counters only ever grow. They are read once the pipeline has fully
/// drained, so `Relaxed` ordering is enough; the task joins provide the
/// happens-before edge.
#[derive(Debug, Default)]
pub struct ProducerStats {
    count: AtomicI64,
    sum: AtomicI64,
}

impl ProducerStats {
    pub const fn new() -> Self {
        Self {
            count: AtomicI64::new(0),
            sum: AtomicI64::new(0),
        }
    }

    /// Records one emitted value.
    pub fn record(&self, value: Sequence) {
        self.sum.fetch_add(value, Ordering::Relaxed);
        self.count.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> Totals {
        Totals {
            count: self.count.load(Ordering::Relaxed),
            sum: self.sum.load(Ordering::Relaxed),
        }
    }
}

/// A count/sum pair.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Totals {
    pub count: Sequence,
    pub sum: Sequence,
}

impl Totals {
    /// Folds one value into the totals.
    pub const fn add(mut self, value: Sequence) -> Self {
        self.count += 1;
        self.sum += value;
        self
    }
}

/// How many values each worker relayed, indexed by worker id.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct WorkerSplit(Vec<Sequence>);

impl WorkerSplit {
    pub const fn new(counts: Vec<Sequence>) -> Self {
        Self(counts)
    }

    pub fn counts(&self) -> &[Sequence] {
        &self.0
    }

    pub fn total(&self) -> Sequence {
        self.0.iter().sum()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for WorkerSplit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[")?;
        for (i, count) in self.0.iter().enumerate() {
            if i > 0 {
                write!(f, " ")?;
            }
            write!(f, "{count}")?;
        }
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn series_sum_matches_naive_sum() {
        for count in 0..200 {
            let naive: Sequence = (1..=count).sum();
            assert_eq!(series_sum(count), naive, "count = {count}");
        }
        assert_eq!(series_sum(-5), 0);
    }

    #[test]
    fn producer_stats_accumulate() {
        let stats = ProducerStats::new();
        for v in 1..=10 {
            stats.record(v);
        }
        assert_eq!(stats.snapshot(), Totals { count: 10, sum: 55 });
    }

    #[test]
    fn worker_split_totals_and_display() {
        let split = WorkerSplit::new(vec![3, 0, 7]);
        assert_eq!(split.total(), 10);
        assert_eq!(split.len(), 3);
        assert_eq!(split.to_string(), "[3 0 7]");
        assert!(WorkerSplit::default().is_empty());
    }
}
