use std::{num::NonZeroUsize, sync::Arc, time::Duration};

use rama::telemetry::tracing;
use tokio::time::Instant;

use crate::config::{ConnectionMode, SweepConfig, WorkloadMode};

use super::{
    payload::PayloadGenerator,
    worker::{WorkerResult, WorkerSettings, run_ephemeral, run_persistent},
};

/// Aggregate outcome of one concurrency level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunResult {
    pub clients: NonZeroUsize,
    pub total_requests: u64,
    /// Wall clock time from launching the first worker until the last one joined.
    pub actual_duration: Duration,
    /// Requests per second over `actual_duration`.
    pub throughput: f64,
    pub mean_latency_ms: f64,
}

impl RunResult {
    /// Reduce the result slots of a run.
    ///
    /// A run without a single successful exchange reports zero
    /// throughput and latency.
    pub fn aggregate(
        clients: NonZeroUsize,
        slots: &[WorkerResult],
        actual_duration: Duration,
    ) -> Self {
        let total_requests: u64 = slots.iter().map(|slot| slot.request_count).sum();
        let total_latency: f64 = slots.iter().map(WorkerResult::latency_sum_secs).sum();

        let (throughput, mean_latency_ms) = if total_requests == 0 {
            (0.0, 0.0)
        } else {
            let secs = actual_duration.as_secs_f64();
            let throughput = if secs > 0.0 {
                total_requests as f64 / secs
            } else {
                0.0
            };
            (throughput, (total_latency / total_requests as f64) * 1000.0)
        };

        Self {
            clients,
            total_requests,
            actual_duration,
            throughput,
            mean_latency_ms,
        }
    }
}

/// Launches the workers of one concurrency level and reduces their results.
#[derive(Debug, Clone)]
pub struct RunCoordinator {
    target: std::net::SocketAddr,
    duration: Duration,
    io_timeout: Duration,
    read_buffer_size: usize,
    generator: Arc<PayloadGenerator>,
}

impl RunCoordinator {
    pub fn new(cfg: &SweepConfig) -> Self {
        Self {
            target: cfg.target,
            duration: cfg.duration,
            io_timeout: cfg.io_timeout,
            read_buffer_size: cfg.read_buffer_size,
            generator: Arc::new(PayloadGenerator::new(cfg.keyspace)),
        }
    }

    /// Run `num_clients` fresh workers in parallel and wait for all of them.
    ///
    /// Every worker owns exactly one result slot, indexed by its position,
    /// which is filled in once it has joined.
    pub async fn run(
        &self,
        mode: WorkloadMode,
        connection: ConnectionMode,
        num_clients: NonZeroUsize,
    ) -> RunResult {
        let mut slots = vec![WorkerResult::default(); num_clients.get()];

        let settings = WorkerSettings {
            target: self.target,
            workload: mode,
            duration: self.duration,
            io_timeout: self.io_timeout,
            read_buffer_size: self.read_buffer_size,
            generator: self.generator.clone(),
        };

        tracing::debug!(
            %mode,
            %connection,
            clients = num_clients.get(),
            "launch run workers",
        );

        let start = Instant::now();

        let handles: Vec<_> = (0..num_clients.get())
            .map(|index| {
                let settings = settings.clone();
                match connection {
                    ConnectionMode::KeepAlive => tokio::spawn(run_persistent(index, settings)),
                    ConnectionMode::Close => tokio::spawn(run_ephemeral(index, settings)),
                }
            })
            .collect();

        for (index, (slot, handle)) in slots.iter_mut().zip(handles).enumerate() {
            match handle.await {
                Ok(result) => *slot = result,
                Err(err) => {
                    tracing::error!(
                        worker.index = index,
                        "worker task failed, keep empty slot: {err}",
                    );
                }
            }
        }

        let actual_duration = start.elapsed();
        let result = RunResult::aggregate(num_clients, &slots, actual_duration);

        tracing::debug!(
            clients = num_clients.get(),
            total_requests = result.total_requests,
            actual_duration = ?result.actual_duration,
            "run finished",
        );

        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{config::KeySpace, test};

    fn nz(n: usize) -> NonZeroUsize {
        NonZeroUsize::new(n).unwrap()
    }

    fn coordinator(target: std::net::SocketAddr, duration: Duration) -> RunCoordinator {
        let mut cfg = SweepConfig::new(target, WorkloadMode::GetAll, ConnectionMode::KeepAlive);
        cfg.duration = duration;
        cfg.keyspace = KeySpace::DEFAULT;
        RunCoordinator::new(&cfg)
    }

    #[test]
    fn test_aggregate_without_requests() {
        let slots = vec![WorkerResult::default(); 4];
        let result = RunResult::aggregate(nz(4), &slots, Duration::from_secs(1));
        assert_eq!(result.total_requests, 0);
        assert_eq!(result.throughput, 0.0);
        assert_eq!(result.mean_latency_ms, 0.0);
    }

    #[test]
    fn test_aggregate_sums_slots() {
        let slots = [
            WorkerResult {
                request_count: 100,
                latency_sum: Duration::from_millis(200),
            },
            WorkerResult::default(),
            WorkerResult {
                request_count: 300,
                latency_sum: Duration::from_millis(600),
            },
        ];
        let result = RunResult::aggregate(nz(3), &slots, Duration::from_secs(2));
        assert_eq!(result.total_requests, 400);
        assert!((result.throughput - 200.0).abs() < 1e-9);
        assert!((result.mean_latency_ms - 2.0).abs() < 1e-9);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_single_client_throughput_uses_actual_duration() {
        let addr = test::spawn_fixed_responder(b"0123456789", None).await;

        let result = coordinator(addr, Duration::from_millis(300))
            .run(WorkloadMode::GetAll, ConnectionMode::KeepAlive, nz(1))
            .await;

        assert!(result.total_requests > 0);
        assert!(result.actual_duration >= Duration::from_millis(300));
        assert_eq!(
            result.throughput,
            result.total_requests as f64 / result.actual_duration.as_secs_f64()
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_unreachable_target_reports_zero() {
        let addr = test::refused_addr().await;
        let coordinator = coordinator(addr, Duration::from_millis(200));

        for connection in [ConnectionMode::KeepAlive, ConnectionMode::Close] {
            let result = coordinator
                .run(WorkloadMode::GetPutMix, connection, nz(3))
                .await;
            assert_eq!(result.total_requests, 0, "{connection}");
            assert_eq!((result.throughput, result.mean_latency_ms), (0.0, 0.0));
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_four_persistent_clients_against_echo_stub() {
        let addr = test::spawn_fixed_responder(b"0123456789", None).await;

        let result = coordinator(addr, Duration::from_secs(1))
            .run(WorkloadMode::GetAll, ConnectionMode::KeepAlive, nz(4))
            .await;

        assert!(result.total_requests > 0);
        assert!(result.mean_latency_ms > 0.0);
        // local stub: round trips are far below the receive timeout
        assert!(result.mean_latency_ms < 100.0, "{result:?}");
        assert!(result.actual_duration >= Duration::from_secs(1));
        assert!(result.actual_duration < Duration::from_secs(3), "{result:?}");
        assert!(
            (result.throughput - result.total_requests as f64).abs()
                <= result.total_requests as f64 * 0.5,
            "{result:?}"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn test_run_close_mode_against_echo_stub() {
        let addr = test::spawn_fixed_responder(b"0123456789", None).await;

        let result = coordinator(addr, Duration::from_millis(300))
            .run(WorkloadMode::PutAll, ConnectionMode::Close, nz(2))
            .await;

        assert!(result.total_requests > 0);
        assert_eq!(result.clients, nz(2));
    }
}
