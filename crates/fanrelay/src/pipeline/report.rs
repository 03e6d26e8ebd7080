use crate::{Result, Stage, Totals, WorkerSplit};
use core::{fmt, time::Duration};

/// Outcome of one pipeline run.
///
/// The report is produced whether or not verification passed, so callers can
/// print the numbers before acting on [`verdict`](Self::verdict).
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Count and sum as seen by the producer's observer.
    pub produced: Totals,
    /// Count and sum as seen by the aggregator.
    pub aggregated: Totals,
    /// Values relayed per worker.
    pub split: WorkerSplit,
    /// Wall time from spawning the first task to the end of aggregation.
    pub elapsed: Duration,
    /// Result of the consistency checks.
    pub verdict: Result<()>,
}

impl RunReport {
    pub const fn is_verified(&self) -> bool {
        self.verdict.is_ok()
    }

    /// Terminal stage this run ended in.
    pub const fn stage(&self) -> Stage {
        if self.is_verified() {
            Stage::Verified
        } else {
            Stage::Failed
        }
    }

    /// Returns the verification error, if any.
    ///
    /// # Errors
    ///
    /// Returns a clone of the first failed consistency check.
    pub fn check(&self) -> Result<()> {
        self.verdict.clone()
    }
}

/// Three lines: counts compared, sums compared, per-worker split.
impl fmt::Display for RunReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "Value count: {} {}",
            self.produced.count, self.aggregated.count
        )?;
        writeln!(f, "Value sum: {} {}", self.produced.sum, self.aggregated.sum)?;
        write!(f, "Split by worker: {}", self.split)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn renders_three_lines() {
        let report = RunReport {
            produced: Totals { count: 3, sum: 6 },
            aggregated: Totals { count: 3, sum: 6 },
            split: WorkerSplit::new(vec![1, 2]),
            elapsed: Duration::from_millis(5),
            verdict: Ok(()),
        };
        assert_eq!(
            report.to_string(),
            "Value count: 3 3\nValue sum: 6 6\nSplit by worker: [1 2]"
        );
        assert_eq!(report.stage(), Stage::Verified);
    }

    #[test]
    fn failed_report_keeps_its_error() {
        let err = Error::PartitionMismatch {
            produced: 3,
            routed: 2,
        };
        let report = RunReport {
            produced: Totals { count: 3, sum: 6 },
            aggregated: Totals { count: 3, sum: 6 },
            split: WorkerSplit::new(vec![2]),
            elapsed: Duration::ZERO,
            verdict: Err(err.clone()),
        };
        assert!(!report.is_verified());
        assert_eq!(report.stage(), Stage::Failed);
        assert_eq!(report.check(), Err(err));
    }
}
