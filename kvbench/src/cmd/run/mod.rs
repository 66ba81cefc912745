use std::{net::SocketAddr, num::NonZeroUsize, time::Duration};

use clap::Args;
use rama::{
    error::{ErrorContext as _, OpaqueError},
    graceful::ShutdownGuard,
    telemetry::tracing,
};

use crate::config::{ConnectionMode, KeySpace, SweepConfig, WorkloadMode, normalise_levels};

pub mod coordinator;
pub mod payload;
pub mod reporter;
pub mod sweep;
pub mod worker;

use self::reporter::{HumanReporter, JsonlReporter, Reporter};

#[derive(Debug, Clone, Args)]
/// sweep concurrency levels against a key/value service
pub struct RunCommand {
    /// workload mode: GET_POPULAR, GET_ALL, PUT_ALL or GET_PUT_MIX
    #[arg(value_enum, ignore_case = true, value_name = "WORKLOAD")]
    pub workload: WorkloadMode,

    /// connection mode: KEEP_ALIVE or CLOSE
    #[arg(value_enum, ignore_case = true, value_name = "CONNECTION")]
    pub connection: ConnectionMode,

    /// host of the target service
    #[arg(long, default_value = "127.0.0.1")]
    pub host: String,

    /// port of the target service
    #[arg(long, short = 'p', default_value_t = 6969)]
    pub port: u16,

    /// duration of a single concurrency level
    #[arg(long, value_name = "SECONDS", default_value = "30", value_parser = parse_secs)]
    pub duration: Duration,

    /// comma separated concurrency levels to sweep
    #[arg(
        long,
        short = 'c',
        value_name = "N,...",
        value_delimiter = ',',
        default_value = "1,2,4,8,16,32,40,45,50"
    )]
    pub clients: Vec<NonZeroUsize>,

    /// pause between two concurrency levels to let the server settle
    #[arg(long, value_name = "SECONDS", default_value = "2", value_parser = parse_secs)]
    pub settle: Duration,

    /// bound on each connect, send and receive
    #[arg(long, value_name = "SECONDS", default_value = "2", value_parser = parse_secs)]
    pub timeout: Duration,

    /// maximum response bytes read per request
    #[arg(long, value_name = "BYTES", default_value_t = 4096)]
    pub read_buffer: usize,

    #[clap(flatten)]
    pub keyspace: KeySpace,

    /// skip pre-loading the hot keys for GET_POPULAR
    #[arg(long, default_value_t = false)]
    pub no_warmup: bool,

    /// report json lines instead of a human-friendly table
    #[arg(long, default_value_t = false)]
    pub json: bool,
}

fn parse_secs(input: &str) -> Result<Duration, String> {
    let secs: f64 = input.parse().map_err(|err| format!("{err}"))?;
    if secs <= 0. {
        return Err(format!("expected a positive number of seconds, got {secs}"));
    }
    Duration::try_from_secs_f64(secs).map_err(|err| err.to_string())
}

pub async fn exec(guard: ShutdownGuard, args: RunCommand) -> Result<(), OpaqueError> {
    let target = resolve_target(&args.host, args.port).await?;
    let cfg = sweep_config(target, args.clone());

    tracing::info!(
        %target,
        workload = %cfg.workload,
        connection = %cfg.connection,
        duration = ?cfg.duration,
        levels = ?cfg.levels,
        "sweep config ready",
    );

    let mut reporter: Box<dyn Reporter> = if args.json {
        Box::new(JsonlReporter::new())
    } else {
        Box::new(HumanReporter::new())
    };

    let results = self::sweep::run_sweep(
        &cfg,
        reporter.as_mut(),
        guard.clone_weak().into_cancelled(),
    )
    .await?;

    tracing::debug!("sweep done after {} levels", results.len());
    Ok(())
}

async fn resolve_target(host: &str, port: u16) -> Result<SocketAddr, OpaqueError> {
    tokio::net::lookup_host((host, port))
        .await
        .with_context(|| format!("resolve target '{host}:{port}'"))?
        .next()
        .with_context(|| format!("no address found for target '{host}:{port}'"))
}

fn sweep_config(target: SocketAddr, args: RunCommand) -> SweepConfig {
    let mut levels = normalise_levels(args.clients.clone());
    if levels.is_empty() {
        tracing::info!("no concurrency levels defined, use defaults");
        levels = SweepConfig::new(target, args.workload, args.connection).levels;
    } else if levels != args.clients {
        tracing::info!("concurrency levels sorted and de-duplicated: {levels:?}");
    }

    let workload = args.workload;
    let mut cfg = SweepConfig::new(target, workload, args.connection);
    cfg.duration = args.duration;
    cfg.levels = levels;
    cfg.settle = args.settle;
    cfg.io_timeout = args.timeout;
    cfg.read_buffer_size = args.read_buffer.max(1);
    cfg.keyspace = args.keyspace;
    cfg.warmup = !args.no_warmup;

    if args.no_warmup && workload.wants_warmup() {
        tracing::info!("warmup disabled by cli flag");
    }

    cfg
}
