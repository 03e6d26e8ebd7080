#![doc = include_str!("../README.md")]

mod cli;

use clap::Parser;
use cli::config::CliArgs;
use cli::telemetry::{init_telemetry, record_run, shutdown_telemetry};
use fanrelay::{Pipeline, PipelineConfig, deadline_token};
use tokio::signal;
use tokio_util::sync::CancellationToken;

// Using mimalloc for better performance under contention, especially in musl
// environments.
#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load from .env
    let _ = dotenvy::dotenv();
    let args = CliArgs::parse();
    let config = PipelineConfig::try_from(args)?;

    let providers = init_telemetry()?;
    log_startup_info(&config);

    let pipeline = Pipeline::new(config)?;
    let cancel = deadline_token(pipeline.config().deadline);
    tokio::spawn(cancel_on_signal(cancel.clone()));

    let result = pipeline.run_until(cancel).await;
    if let Ok(report) = &result {
        println!("{report}");
        record_run(report);
    }

    shutdown_telemetry(providers);

    // A failed consistency check still prints the numbers above, then exits
    // non-zero.
    result?.check()?;
    Ok(())
}

fn log_startup_info(_config: &PipelineConfig) {
    if cfg!(debug_assertions) {
        #[cfg(feature = "tracing")]
        tracing::info!("Starting fanrelay with full config: {:#?}", _config);
    } else {
        #[cfg(feature = "tracing")]
        tracing::info!(
            "Starting fanrelay with {} workers for {:?}",
            _config.num_workers,
            _config.deadline
        );
    }
}

/// Cancels the run early on Ctrl+C or SIGTERM. Returns quietly once the
/// deadline has fired on its own.
async fn cancel_on_signal(cancel: CancellationToken) {
    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(_e) => {
                #[cfg(feature = "tracing")]
                tracing::warn!("Failed to install SIGTERM handler: {}", _e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    let ctrl_c = async {
        if let Err(_e) = signal::ctrl_c().await {
            #[cfg(feature = "tracing")]
            tracing::warn!("Failed to install Ctrl+C handler: {}", _e);
            std::future::pending::<()>().await;
        }
    };

    tokio::select! {
        () = cancel.cancelled() => return,
        () = ctrl_c => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received Ctrl+C signal");
        },
        () = terminate => {
            #[cfg(feature = "tracing")]
            tracing::info!("Received SIGTERM signal");
        },
    }

    #[cfg(feature = "tracing")]
    tracing::info!("Cancelling the producer early, draining in-flight values...");
    cancel.cancel();
}
