use rama::telemetry::tracing;
use tokio::time::Instant;

use crate::config::ConnectionMode;

use super::{Exchange, WorkerResult, WorkerSettings, connect, exchange};

/// Issue requests over a single long lived connection until
/// `settings.duration` has elapsed.
///
/// A failed connect yields an empty result. The first empty response or
/// I/O error ends the loop, keeping whatever was measured until then.
pub async fn run_persistent(index: usize, settings: WorkerSettings) -> WorkerResult {
    let mut result = WorkerResult::default();

    let mut stream = match connect(settings.target, settings.io_timeout).await {
        Ok(stream) => stream,
        Err(err) => {
            tracing::debug!(worker.index = index, "persistent worker could not connect: {err}");
            return result;
        }
    };

    let mut buf = settings.new_read_buffer();
    let directive = ConnectionMode::KeepAlive.directive();

    let start = Instant::now();
    while start.elapsed() < settings.duration {
        let payload = settings.generator.generate(settings.workload, directive);

        match exchange(&mut stream, &payload, &mut buf, settings.io_timeout).await {
            Ok(Exchange::Response(latency)) => result.record(latency),
            Ok(Exchange::Closed) => {
                tracing::debug!(
                    worker.index = index,
                    requests = result.request_count,
                    "connection closed by peer: stop persistent worker early",
                );
                break;
            }
            Err(err) => {
                tracing::debug!(
                    worker.index = index,
                    requests = result.request_count,
                    "exchange failed: stop persistent worker early: {err}",
                );
                break;
            }
        }
    }

    drop(stream);

    tracing::trace!(
        worker.index = index,
        requests = result.request_count,
        "persistent worker done",
    );
    result
}

#[cfg(test)]
mod tests {
    use std::{sync::Arc, time::Duration};

    use rama::telemetry::tracing;
    use tracing_test::traced_test;

    use super::*;
    use crate::{cmd::run::payload::PayloadGenerator, config::WorkloadMode, test};

    fn settings(target: std::net::SocketAddr, duration: Duration) -> WorkerSettings {
        WorkerSettings {
            target,
            workload: WorkloadMode::GetAll,
            duration,
            io_timeout: Duration::from_secs(2),
            read_buffer_size: 4096,
            generator: Arc::new(PayloadGenerator::default()),
        }
    }

    #[tokio::test]
    async fn test_persistent_worker_counts_exchanges() {
        let addr = test::spawn_fixed_responder(b"0123456789", None).await;

        let result = run_persistent(0, settings(addr, Duration::from_millis(300))).await;
        assert!(result.request_count > 0);
        assert!(result.latency_sum > Duration::ZERO);
        assert!(result.latency_sum <= Duration::from_millis(300) + Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_persistent_worker_stops_when_server_closes() {
        const N: usize = 3;
        let addr = test::spawn_fixed_responder(b"0123456789", Some(N)).await;

        let start = Instant::now();
        let result = run_persistent(0, settings(addr, Duration::from_secs(5))).await;

        assert!(result.request_count <= N as u64, "{result:?}");
        assert!(result.request_count > 0, "{result:?}");
        assert!(start.elapsed() < Duration::from_secs(5));
    }

    #[tokio::test]
    #[traced_test]
    async fn test_persistent_worker_unreachable_target() {
        let addr = test::refused_addr().await;

        let result = run_persistent(0, settings(addr, Duration::from_secs(5))).await;
        assert_eq!(result, WorkerResult::default());
        assert!(logs_contain("persistent worker could not connect"));
    }

    #[tokio::test]
    async fn test_persistent_worker_stops_on_receive_timeout() {
        let addr = test::spawn_silent_server().await;

        let mut settings = settings(addr, Duration::from_secs(5));
        settings.io_timeout = Duration::from_millis(100);

        let start = Instant::now();
        let result = run_persistent(0, settings).await;
        assert_eq!(result.request_count, 0);
        assert!(start.elapsed() < Duration::from_secs(2));
    }
}
