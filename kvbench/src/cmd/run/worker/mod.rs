//! The two client strategies driving the target.
//!
//! A worker never fails: connection and exchange errors are folded into
//! the control flow of its loop and only the final [`WorkerResult`]
//! leaves the worker.

use std::{net::SocketAddr, sync::Arc, time::Duration};

use rama::error::{ErrorContext as _, OpaqueError};
use tokio::{
    io::{AsyncReadExt as _, AsyncWriteExt as _},
    net::TcpStream,
    time::{Instant, timeout},
};

use crate::{config::WorkloadMode, protocol::RequestPayload};

use super::payload::PayloadGenerator;

mod ephemeral;
mod persistent;

pub use self::{ephemeral::run_ephemeral, persistent::run_persistent};

/// Final counters of a single worker.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct WorkerResult {
    /// Successful request/response exchanges.
    pub request_count: u64,
    /// Sum of the latencies of those exchanges.
    pub latency_sum: Duration,
}

impl WorkerResult {
    pub(crate) fn record(&mut self, latency: Duration) {
        self.request_count += 1;
        self.latency_sum += latency;
    }

    pub fn latency_sum_secs(&self) -> f64 {
        self.latency_sum.as_secs_f64()
    }
}

/// Parameters shared by all workers of one run.
#[derive(Debug, Clone)]
pub struct WorkerSettings {
    pub target: SocketAddr,
    pub workload: WorkloadMode,
    pub duration: Duration,
    pub io_timeout: Duration,
    pub read_buffer_size: usize,
    pub generator: Arc<PayloadGenerator>,
}

impl WorkerSettings {
    fn new_read_buffer(&self) -> Vec<u8> {
        vec![0; self.read_buffer_size.max(1)]
    }
}

/// Outcome of a completed request/response exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Exchange {
    /// Non-empty response received after the given latency.
    Response(Duration),
    /// Peer closed the connection instead of responding.
    Closed,
}

pub(crate) async fn connect(
    target: SocketAddr,
    io_timeout: Duration,
) -> Result<TcpStream, OpaqueError> {
    let stream = timeout(io_timeout, TcpStream::connect(target))
        .await
        .context("connect timed out")?
        .with_context(|| format!("connect to {target}"))?;
    stream.set_nodelay(true).context("set TCP_NODELAY")?;
    Ok(stream)
}

/// Send the full payload and wait for the first chunk of the response.
///
/// Latency is measured from just before the send until that chunk arrived.
pub(crate) async fn exchange(
    stream: &mut TcpStream,
    payload: &RequestPayload,
    buf: &mut [u8],
    io_timeout: Duration,
) -> Result<Exchange, OpaqueError> {
    let start = Instant::now();

    timeout(io_timeout, stream.write_all(payload.as_bytes()))
        .await
        .context("send timed out")?
        .context("send request")?;

    let n = timeout(io_timeout, stream.read(buf))
        .await
        .context("receive timed out")?
        .context("receive response")?;

    let latency = start.elapsed();

    Ok(if n == 0 {
        Exchange::Closed
    } else {
        Exchange::Response(latency)
    })
}
