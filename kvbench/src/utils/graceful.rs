use std::{
    sync::{
        Arc,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use rama::{
    error::{BoxError, OpaqueError},
    graceful::{self, ShutdownGuard},
    telemetry::tracing,
};

/// Run a command as a graceful task until it returns or
/// `base_shutdown_signal` fires, whichever comes first.
///
/// An error returned by the command triggers the shutdown as well and
/// is reported back as an error once the shutdown completed.
/// `graceful_timeout` bounds the wait for remaining tasks (`None` = no limit).
pub async fn run_command<S, F, Fut>(
    base_shutdown_signal: S,
    graceful_timeout: Option<Duration>,
    command: F,
) -> Result<(), BoxError>
where
    S: Future<Output: Send + 'static> + Send + 'static,
    F: FnOnce(ShutdownGuard) -> Fut + Send + 'static,
    Fut: Future<Output = Result<(), OpaqueError>> + Send + 'static,
{
    let (error_tx, error_rx) = tokio::sync::oneshot::channel::<OpaqueError>();
    let graceful = graceful::Shutdown::new(new_shutdown_signal(error_rx, base_shutdown_signal));

    let failed = Arc::new(AtomicBool::new(false));

    graceful.spawn_task_fn({
        let failed = failed.clone();
        async move |guard| {
            if let Err(err) = command(guard).await {
                failed.store(true, Ordering::Release);
                let _ = error_tx.send(err);
            }
        }
    });

    let delay = match graceful_timeout {
        Some(duration) => graceful.shutdown_with_limit(duration).await?,
        None => graceful.shutdown().await,
    };

    tracing::debug!("gracefully shutdown with a delay of: {delay:?}");

    if failed.load(Ordering::Acquire) {
        return Err("command exited with an error".into());
    }
    Ok(())
}

/// Convert the `--graceful` cli value, where `<= 0.0` means no limit.
pub fn graceful_timeout_from_secs(secs: f64) -> Option<Duration> {
    (secs > 0.).then(|| Duration::from_secs_f64(secs))
}

fn new_shutdown_signal(
    error_rx: tokio::sync::oneshot::Receiver<OpaqueError>,
    base_shutdown_signal: impl Future<Output: Send + 'static> + Send + 'static,
) -> impl Future + Send + 'static {
    async move {
        tokio::select! {
            _ = base_shutdown_signal => {
                tracing::debug!("default signal triggered: init graceful shutdown");
            }
            result = error_rx => {
                match result {
                    Ok(err) => {
                        tracing::error!("fatal err received: {err}; abort");
                    },
                    Err(_) => {
                        tracing::debug!("command is finished without error, return control");
                    },
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_run_command_ok() {
        let result = run_command(std::future::pending::<()>(), None, |_guard| async {
            Ok(())
        })
        .await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_run_command_err_is_reported() {
        let result = run_command(
            std::future::pending::<()>(),
            Some(Duration::from_secs(1)),
            |_guard| async { Err(OpaqueError::from_display("boom")) },
        )
        .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_graceful_timeout_from_secs() {
        assert_eq!(graceful_timeout_from_secs(0.), None);
        assert_eq!(graceful_timeout_from_secs(-1.), None);
        assert_eq!(
            graceful_timeout_from_secs(1.5),
            Some(Duration::from_millis(1500))
        );
    }
}
