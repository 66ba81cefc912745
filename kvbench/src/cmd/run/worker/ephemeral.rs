use rama::{error::OpaqueError, telemetry::tracing};
use tokio::time::Instant;

use crate::config::ConnectionMode;

use super::{Exchange, WorkerResult, WorkerSettings, connect, exchange};

/// Open a fresh connection for every request until `settings.duration`
/// has elapsed.
///
/// Failed iterations (refused connect, timeout, reset, empty response) are
/// not counted and are retried immediately, without backoff.
pub async fn run_ephemeral(index: usize, settings: WorkerSettings) -> WorkerResult {
    let mut result = WorkerResult::default();
    let mut failures: u64 = 0;

    let mut buf = settings.new_read_buffer();

    let start = Instant::now();
    while start.elapsed() < settings.duration {
        match exchange_once(&settings, &mut buf).await {
            Ok(Exchange::Response(latency)) => result.record(latency),
            Ok(Exchange::Closed) => failures += 1,
            Err(err) => {
                failures += 1;
                tracing::trace!(worker.index = index, "ephemeral exchange failed: {err}");
            }
        }
    }

    tracing::debug!(
        worker.index = index,
        requests = result.request_count,
        failures,
        "ephemeral worker done",
    );
    result
}

/// One connect, send, receive cycle. The connection is dropped on every path.
async fn exchange_once(
    settings: &WorkerSettings,
    buf: &mut [u8],
) -> Result<Exchange, OpaqueError> {
    let mut stream = connect(settings.target, settings.io_timeout).await?;
    let payload = settings
        .generator
        .generate(settings.workload, ConnectionMode::Close.directive());
    exchange(&mut stream, &payload, buf, settings.io_timeout).await
}
