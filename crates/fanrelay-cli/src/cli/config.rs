use anyhow::bail;
use clap::Parser;
use core::time::Duration;
use fanrelay::PipelineConfig;

/// Upper bound on relay workers. Each worker costs two tasks and a channel;
/// beyond this the run measures the scheduler more than the pipeline.
pub const MAX_WORKERS: usize = 65_536;

/// Runtime configuration for the `fanrelay` binary.
///
/// All values are parsed from CLI arguments or environment variables. The
/// defaults give the canonical run: one second, five workers, one
/// millisecond of relay delay.
#[derive(Parser, Debug, Clone)]
#[command(
    name = "fanrelay",
    version,
    about = "Runs a deadline-bounded fan-out/fan-in pipeline and verifies its totals"
)]
pub struct CliArgs {
    /// How long the producer runs before it is cancelled, in milliseconds.
    ///
    /// Zero cancels the producer before it emits anything.
    ///
    /// Environment variable: `DEADLINE_MS`
    #[arg(long, env = "DEADLINE_MS", default_value_t = 1000)]
    pub deadline_ms: u64,

    /// Number of relay workers competing for the producer's output.
    ///
    /// Environment variable: `NUM_WORKERS`
    #[arg(long, env = "NUM_WORKERS", default_value_t = 5)]
    pub num_workers: usize,

    /// Delay each worker sleeps after relaying a value, in milliseconds.
    ///
    /// Environment variable: `RELAY_DELAY_MS`
    #[arg(long, env = "RELAY_DELAY_MS", default_value_t = 1)]
    pub relay_delay_ms: u64,

    /// Capacity of the shared producer channel.
    ///
    /// Environment variable: `SOURCE_BUFFER_SIZE`
    #[arg(long, env = "SOURCE_BUFFER_SIZE", default_value_t = 1)]
    pub source_buffer_size: usize,

    /// Capacity of each worker's private output channel.
    ///
    /// Environment variable: `LANE_BUFFER_SIZE`
    #[arg(long, env = "LANE_BUFFER_SIZE", default_value_t = 1)]
    pub lane_buffer_size: usize,

    /// Capacity of the merge channel. Defaults to the number of workers.
    ///
    /// Environment variable: `MERGE_BUFFER_SIZE`
    #[arg(long, env = "MERGE_BUFFER_SIZE")]
    pub merge_buffer_size: Option<usize>,
}

impl TryFrom<CliArgs> for PipelineConfig {
    type Error = anyhow::Error;

    fn try_from(args: CliArgs) -> Result<Self, Self::Error> {
        if args.num_workers > MAX_WORKERS {
            bail!(
                "NUM_WORKERS ({}) exceeds the supported maximum ({})",
                args.num_workers,
                MAX_WORKERS
            );
        }

        let config = Self {
            deadline: Duration::from_millis(args.deadline_ms),
            num_workers: args.num_workers,
            relay_delay: Duration::from_millis(args.relay_delay_ms),
            source_buffer_size: args.source_buffer_size,
            lane_buffer_size: args.lane_buffer_size,
            merge_buffer_size: args.merge_buffer_size,
        };
        config.validate()?;

        Ok(config)
    }
}
