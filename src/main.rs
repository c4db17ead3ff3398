#![forbid(unsafe_code)]

//! `ktm-dashboard` — publishes live KTM train positions into a
//! persistent Taskade dashboard task.
//!
//! One invocation is one stateless fetch-render-publish cycle. Exit
//! codes: 0 success (including the documented degraded outcomes), 2 for
//! missing or invalid configuration, 1 for any other failure.

use std::process::ExitCode;

use clap::{Parser, ValueEnum};
use tracing::{error, info};
use tracing_subscriber::{fmt, EnvFilter};

use ktm_dashboard::{orchestrator, AppError, Result, RunConfig};

#[derive(Debug, Copy, Clone, Eq, PartialEq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Debug, Parser)]
#[command(
    name = "ktm-dashboard",
    about = "Sync the KTM train status dashboard task",
    version,
    long_about = None
)]
struct Cli {
    /// Log output format (text or json).
    #[arg(long, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,
}

fn main() -> ExitCode {
    let args = Cli::parse();
    if let Err(err) = init_tracing(args.log_format) {
        eprintln!("{err}");
        return ExitCode::from(err.exit_code());
    }

    match run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            match &err {
                AppError::Unexpected(_) => error!(%err, detail = ?err, "run failed"),
                _ => error!(%err, "run failed"),
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn run() -> Result<()> {
    // Configuration is validated before any network call so that a
    // missing token exits 2 without touching the feed or the API.
    let config = RunConfig::from_env()?;
    info!("configuration loaded");

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .map_err(|err| AppError::Unexpected(format!("failed to build tokio runtime: {err}")))?;

    runtime.block_on(orchestrator::run(&config))?;
    Ok(())
}

fn init_tracing(log_format: LogFormat) -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let subscriber = fmt().with_env_filter(env_filter).with_writer(std::io::stderr);

    match log_format {
        LogFormat::Text => subscriber
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
        LogFormat::Json => subscriber
            .json()
            .try_init()
            .map_err(|err| AppError::Config(format!("failed to init tracing: {err}")))?,
    }

    Ok(())
}
