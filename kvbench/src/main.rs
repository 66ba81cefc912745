use std::path::PathBuf;

use rama::{error::BoxError, graceful};

#[cfg(target_family = "unix")]
use rama::error::ErrorContext as _;

use clap::Parser;
use kvbench::{cmd::run::RunCommand, utils};

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// Sweep a key/value service with synthetic traffic over increasing
/// concurrency levels and report throughput and mean latency per level.
#[derive(Debug, Clone, Parser)]
#[command(name = "kvbench")]
#[command(bin_name = "kvbench")]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(flatten)]
    run: RunCommand,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", default_value_t = 0.)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,

    #[cfg(target_family = "unix")]
    /// Set the limit of max open file descriptors for this process and its children.
    #[arg(long, value_name = "N", default_value_t = 262_144)]
    pub ulimit: utils::os::rlim_t,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(utils::telemetry::TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    })?;

    #[cfg(target_family = "unix")]
    utils::os::raise_nofile(args.ulimit).context("set file descriptor limit")?;

    let graceful_timeout = utils::graceful::graceful_timeout_from_secs(args.graceful);
    let run_args = args.run;

    if let Err(err) = utils::graceful::run_command(
        graceful::default_signal(),
        graceful_timeout,
        move |guard| kvbench::cmd::run::exec(guard, run_args),
    )
    .await
    {
        eprintln!("🚩 exit with error: {err}");
        std::process::exit(1);
    }

    Ok(())
}
