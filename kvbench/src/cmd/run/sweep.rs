use std::pin::pin;

use rama::{
    error::{ErrorContext as _, OpaqueError},
    telemetry::tracing,
};
use tokio::time::Instant;

use crate::{
    config::{ConnectionMode, SweepConfig},
    protocol::KvRequest,
};

use super::{
    coordinator::{RunCoordinator, RunResult},
    reporter::{Reporter, WarmupReport},
    worker::{Exchange, connect, exchange},
};

/// Value written to every hot key during warmup.
const WARMUP_VALUE: &str = "warm";

/// Run one coordinator per concurrency level, in order, pausing in between.
///
/// Resolving `shutdown` stops the sweep before the next level starts.
/// A level that is already running is always completed.
pub async fn run_sweep<F>(
    cfg: &SweepConfig,
    reporter: &mut dyn Reporter,
    shutdown: F,
) -> Result<Vec<RunResult>, OpaqueError>
where
    F: Future,
{
    let mut shutdown = pin!(shutdown);

    reporter.on_start(cfg).context("report sweep start")?;

    if cfg.warmup && cfg.workload.wants_warmup() {
        let report = warmup(cfg).await;
        if !report.is_complete() {
            tracing::warn!(
                keys_loaded = report.keys_loaded,
                keys_total = report.keys_total,
                "warmup incomplete: continue sweep anyway",
            );
        }
        reporter.on_warmup(&report).context("report warmup")?;
    }

    let coordinator = RunCoordinator::new(cfg);
    let mut results = Vec::with_capacity(cfg.levels.len());

    for (i, clients) in cfg.levels.iter().copied().enumerate() {
        if i > 0 {
            tokio::select! {
                _ = shutdown.as_mut() => {
                    tracing::info!("shutdown requested: stop sweep before {clients} clients");
                    break;
                }
                _ = tokio::time::sleep(cfg.settle) => (),
            }
        }

        tracing::info!(clients = clients.get(), "run concurrency level");
        let result = coordinator.run(cfg.workload, cfg.connection, clients).await;
        reporter.on_run(&result).context("report run result")?;
        results.push(result);
    }

    reporter.finish().context("report sweep end")?;
    Ok(results)
}

/// Pre-load the hot key range over a single connection.
///
/// Never fails: the report tells how many keys made it.
pub async fn warmup(cfg: &SweepConfig) -> WarmupReport {
    let start = Instant::now();
    let keys_total = cfg.keyspace.hot_keys;

    let keys_loaded = match warmup_inner(cfg).await {
        Ok(loaded) => loaded,
        Err((loaded, err)) => {
            tracing::warn!("warmup aborted after {loaded} keys: {err}");
            loaded
        }
    };

    WarmupReport {
        keys_loaded,
        keys_total,
        elapsed: start.elapsed(),
    }
}

async fn warmup_inner(cfg: &SweepConfig) -> Result<u64, (u64, OpaqueError)> {
    let mut stream = connect(cfg.target, cfg.io_timeout)
        .await
        .map_err(|err| (0, err))?;
    let mut buf = vec![0; cfg.read_buffer_size.max(1)];
    let directive = ConnectionMode::KeepAlive.directive();

    for key in 1..=cfg.keyspace.hot_keys {
        let payload = KvRequest::set(key, WARMUP_VALUE).encode(directive);
        match exchange(&mut stream, &payload, &mut buf, cfg.io_timeout).await {
            Ok(Exchange::Response(_)) => (),
            Ok(Exchange::Closed) => {
                return Err((
                    key - 1,
                    OpaqueError::from_display("connection closed by peer"),
                ));
            }
            Err(err) => return Err((key - 1, err)),
        }
    }

    Ok(cfg.keyspace.hot_keys)
}

#[cfg(test)]
mod tests {
    use std::{num::NonZeroUsize, time::Duration};

    use rama::telemetry::tracing;
    use tracing_test::traced_test;

    use super::*;
    use crate::{
        cmd::run::reporter::JsonlReporter,
        config::{KeySpace, ServerConfig, WorkloadMode},
        test,
    };

    fn sweep_config(
        target: std::net::SocketAddr,
        workload: WorkloadMode,
        connection: ConnectionMode,
        levels: &[usize],
    ) -> SweepConfig {
        let mut cfg = SweepConfig::new(target, workload, connection);
        cfg.duration = Duration::from_millis(200);
        cfg.settle = Duration::from_millis(20);
        cfg.levels = levels
            .iter()
            .map(|l| NonZeroUsize::new(*l).unwrap())
            .collect();
        cfg.keyspace = KeySpace {
            hot_keys: 10,
            cold_keys: 1_000,
            value_size: 16,
        };
        cfg
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sweep_against_mock_server() {
        let addr = test::spawn_mock_server(ServerConfig::default()).await;
        let cfg = sweep_config(addr, WorkloadMode::GetPopular, ConnectionMode::KeepAlive, &[1, 2]);

        let mut reporter = JsonlReporter::with_writer(Vec::new());
        let results = run_sweep(&cfg, &mut reporter, std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(results.len(), 2);
        assert_eq!(results[0].clients.get(), 1);
        assert_eq!(results[1].clients.get(), 2);
        assert!(results.iter().all(|r| r.total_requests > 0), "{results:?}");

        let output = String::from_utf8(reporter.into_inner()).unwrap();
        let types: Vec<String> = output
            .lines()
            .map(|line| {
                let v: serde_json::Value = serde_json::from_str(line).unwrap();
                v["type"].as_str().unwrap().to_owned()
            })
            .collect();
        assert_eq!(types, ["start", "warmup", "run", "run", "final"]);
        assert!(output.contains(r#""keys_loaded":10"#), "{output}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sweep_close_mode_against_mock_server() {
        let addr = test::spawn_mock_server(ServerConfig::default()).await;
        let cfg = sweep_config(addr, WorkloadMode::GetPutMix, ConnectionMode::Close, &[2]);

        let mut reporter = JsonlReporter::with_writer(Vec::new());
        let results = run_sweep(&cfg, &mut reporter, std::future::pending::<()>())
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        assert!(results[0].total_requests > 0, "{results:?}");
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_sweep_stops_between_levels_on_shutdown() {
        let addr = test::spawn_fixed_responder(b"0123456789", None).await;
        let cfg = sweep_config(addr, WorkloadMode::GetAll, ConnectionMode::KeepAlive, &[1, 2, 4]);

        let mut reporter = JsonlReporter::with_writer(Vec::new());
        let results = run_sweep(&cfg, &mut reporter, std::future::ready(()))
            .await
            .unwrap();

        assert_eq!(results.len(), 1);
        let output = String::from_utf8(reporter.into_inner()).unwrap();
        assert!(output.lines().last().unwrap().contains(r#""type":"final""#));
    }

    #[tokio::test]
    async fn test_warmup_unreachable_target() {
        let addr = test::refused_addr().await;
        let cfg = sweep_config(addr, WorkloadMode::GetPopular, ConnectionMode::KeepAlive, &[1]);

        let report = warmup(&cfg).await;
        assert_eq!(report.keys_loaded, 0);
        assert_eq!(report.keys_total, 10);
        assert!(!report.is_complete());
    }

    #[tokio::test]
    #[traced_test]
    async fn test_warmup_partial_when_server_hangs_up() {
        let addr = test::spawn_fixed_responder(b"OK", Some(4)).await;
        let cfg = sweep_config(addr, WorkloadMode::GetPopular, ConnectionMode::KeepAlive, &[1]);

        let report = warmup(&cfg).await;
        assert_eq!(report.keys_loaded, 4);
        assert!(!report.is_complete());
        assert!(logs_contain("warmup aborted after 4 keys"));
    }
}
