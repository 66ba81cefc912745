use std::{net::SocketAddr, pin::pin, sync::Arc, time::Duration};

use clap::Args;
use rama::{
    error::{ErrorContext as _, OpaqueError},
    graceful::ShutdownGuard,
    telemetry::tracing,
};
use tokio::{
    io::{AsyncReadExt as _, AsyncWriteExt as _},
    net::{TcpListener, TcpStream},
};

use crate::{config::ServerConfig, protocol::HEAD_TERMINATOR};

pub mod protocol;
pub mod store;

use self::{
    protocol::{Status, encode_response, parse_request_head},
    store::MockKvStore,
};

/// Request heads larger than this are rejected.
const MAX_HEAD_SIZE: usize = 16 * 1024;
/// Connections without any traffic for this long are dropped.
const IDLE_TIMEOUT: Duration = Duration::from_secs(60);

const USAGE: &str = "Usage: /set, /get, /delete\n";

#[derive(Debug, Clone, Args)]
/// run the mock key/value server
pub struct MockCommand {
    #[clap(flatten)]
    pub config: ServerConfig,

    /// socket address to bind to
    #[arg(
        long,
        short = 'b',
        value_name = "ADDRESS",
        default_value = "127.0.0.1:6969"
    )]
    pub bind: SocketAddr,
}

pub async fn exec(guard: ShutdownGuard, args: MockCommand) -> Result<(), OpaqueError> {
    let listener = TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("bind mock server to {}", args.bind))?;
    let addr = listener
        .local_addr()
        .context("get bound address for mock server")?;

    tracing::info!(
        %addr,
        cache_size = args.config.cache_size,
        base_latency = ?args.config.base_latency,
        jitter = ?args.config.jitter,
        "mock key/value server listening",
    );

    Arc::new(MockServer::try_new(args.config)?)
        .serve(listener, guard.clone_weak().into_cancelled())
        .await;

    Ok(())
}

#[derive(Debug)]
pub struct MockServer {
    store: MockKvStore,
    base_latency: f64,
    jitter: f64,
}

impl MockServer {
    pub fn try_new(cfg: ServerConfig) -> Result<Self, OpaqueError> {
        let base_latency = cfg.base_latency.unwrap_or_default();
        let jitter = cfg.jitter.unwrap_or_default();
        if !base_latency.is_finite() || !jitter.is_finite() {
            return Err(OpaqueError::from_display(
                "base_latency and jitter must be finite numbers",
            ));
        }

        Ok(Self {
            store: MockKvStore::new(cfg.cache_size),
            base_latency,
            jitter,
        })
    }

    /// Accept connections until `shutdown` resolves, one task per connection.
    pub async fn serve<F>(self: Arc<Self>, listener: TcpListener, shutdown: F)
    where
        F: Future,
    {
        let mut shutdown = pin!(shutdown);
        loop {
            let (stream, peer) = tokio::select! {
                _ = shutdown.as_mut() => {
                    tracing::debug!("exit mock server accept loop: shutdown");
                    return;
                }
                result = listener.accept() => match result {
                    Ok(accepted) => accepted,
                    Err(err) => {
                        tracing::debug!("accept failed: {err}");
                        continue;
                    }
                },
            };

            let server = self.clone();
            tokio::spawn(async move {
                if let Err(err) = server.serve_connection(stream).await {
                    tracing::debug!(%peer, "mock connection closed with error: {err}");
                }
            });
        }
    }

    async fn serve_connection(&self, mut stream: TcpStream) -> Result<(), OpaqueError> {
        stream.set_nodelay(true).context("set TCP_NODELAY")?;

        let mut pending = Vec::with_capacity(1024);
        let mut chunk = vec![0u8; 4096];

        loop {
            let head_len = loop {
                if let Some(pos) = find_head_end(&pending) {
                    break pos;
                }
                if pending.len() > MAX_HEAD_SIZE {
                    let response =
                        encode_response(Status::BadRequest, "Error: Request Too Large", false);
                    stream.write_all(&response).await.context("write response")?;
                    return Ok(());
                }
                let n = tokio::time::timeout(IDLE_TIMEOUT, stream.read(&mut chunk))
                    .await
                    .context("idle connection")?
                    .context("read request")?;
                if n == 0 {
                    return Ok(());
                }
                pending.extend_from_slice(&chunk[..n]);
            };

            let head: Vec<u8> = pending.drain(..head_len).collect();

            let delay = self.compute_delay();
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }

            let (response, keep_alive) = self.respond(&head);
            stream.write_all(&response).await.context("write response")?;

            if !keep_alive {
                return Ok(());
            }
        }
    }

    fn respond(&self, head: &[u8]) -> (Vec<u8>, bool) {
        let head = match parse_request_head(head) {
            Ok(head) => head,
            Err(err) => {
                tracing::debug!("malformed request: {err}");
                return (
                    encode_response(Status::BadRequest, "Error: Malformed Request", false),
                    false,
                );
            }
        };

        let (status, body) = match head.route.as_ref() {
            Some(route) => self.store.apply(route),
            None if crate::protocol::KvOperation::from_path(&head.path).is_some() => (
                Status::BadRequest,
                format!("Error missing parameter for /{}.", head.path),
            ),
            None => (Status::BadRequest, USAGE.to_owned()),
        };

        (encode_response(status, &body, head.keep_alive), head.keep_alive)
    }

    fn compute_delay(&self) -> Duration {
        let base = self.base_latency.max(0.0);
        let jitter = self.jitter.max(0.0);

        if jitter == 0.0 {
            return Duration::from_secs_f64(base);
        }

        let u: f64 = rand::random();
        let delta = (u * jitter * 2.0) - jitter;
        Duration::from_secs_f64((base + delta).max(0.0))
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_TERMINATOR.len())
        .position(|w| w == HEAD_TERMINATOR)
        .map(|pos| pos + HEAD_TERMINATOR.len())
}
