use std::path::PathBuf;

use rama::{error::BoxError, graceful};

use clap::Parser;
use kvbench::{cmd::mock::MockCommand, utils};

#[cfg(target_family = "unix")]
#[global_allocator]
static ALLOC: jemallocator::Jemalloc = jemallocator::Jemalloc;

#[cfg(target_os = "windows")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

/// In-memory key/value server speaking the kvbench request protocol.
#[derive(Debug, Clone, Parser)]
#[command(name = "kvbench-mock")]
#[command(bin_name = "kvbench-mock")]
#[command(version, about, long_about = None)]
pub struct Args {
    #[clap(flatten)]
    mock: MockCommand,

    /// debug logging as default instead of Info; use RUST_LOG env for more options
    #[arg(long, short = 'v', default_value_t = false)]
    pub verbose: bool,

    /// enable pretty logging (format for humans)
    #[arg(long, default_value_t = false)]
    pub pretty: bool,

    /// write the tracing output to the provided (log) file instead of stderr
    #[arg(long, short = 'o')]
    pub output: Option<PathBuf>,

    #[arg(long, value_name = "SECONDS", default_value_t = 1.)]
    /// the graceful shutdown timeout (<= 0.0 = no timeout)
    pub graceful: f64,
}

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    let args = Args::parse();

    utils::telemetry::init_tracing(utils::telemetry::TelemetryConfig {
        verbose: args.verbose,
        pretty: args.pretty,
        output: args.output.as_deref(),
    })?;

    let graceful_timeout = utils::graceful::graceful_timeout_from_secs(args.graceful);
    let mock_args = args.mock;

    if let Err(err) = utils::graceful::run_command(
        graceful::default_signal(),
        graceful_timeout,
        move |guard| kvbench::cmd::mock::exec(guard, mock_args),
    )
    .await
    {
        eprintln!("🚩 exit with error: {err}");
        std::process::exit(1);
    }

    Ok(())
}
