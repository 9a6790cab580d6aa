//! Bridges OS stop signals to the run's cancellation token

use crate::{
    error::{AppError, Result},
    logging::Logger,
};
use std::future::Future;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Listen for Ctrl-C (and SIGTERM on Unix) and cancel `cancel` on the first one.
///
/// The task also ends once `cancel` is cancelled by someone else.
pub fn spawn_signal_bridge(cancel: CancellationToken, logger: Logger) -> JoinHandle<()> {
    tokio::spawn(bridge(wait_for_stop_signal(), cancel, logger))
}

/// Cancel `cancel` once `signal` resolves
pub async fn bridge<F>(signal: F, cancel: CancellationToken, logger: Logger)
where
    F: Future<Output = Result<&'static str>>,
{
    tokio::select! {
        _ = cancel.cancelled() => {}
        received = signal => match received {
            Ok(name) => {
                logger.info("stop signal received, stopping...")
                    .field("signal", name)
                    .log()
                    .await;
                cancel.cancel();
            }
            Err(e) => {
                // Without a listener the run simply cannot be interrupted
                logger.error("cannot listen for stop signals")
                    .error_info(&e)
                    .log()
                    .await;
            }
        },
    }
}

#[cfg(unix)]
async fn wait_for_stop_signal() -> Result<&'static str> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut terminate = signal(SignalKind::terminate())
        .map_err(|e| AppError::internal(format!("failed to install SIGTERM handler: {}", e)))?;

    tokio::select! {
        received = tokio::signal::ctrl_c() => {
            received.map_err(|e| AppError::internal(format!("failed to listen for ctrl-c: {}", e)))?;
            Ok("SIGINT")
        }
        _ = terminate.recv() => Ok("SIGTERM"),
    }
}

#[cfg(not(unix))]
async fn wait_for_stop_signal() -> Result<&'static str> {
    tokio::signal::ctrl_c()
        .await
        .map_err(|e| AppError::internal(format!("failed to listen for ctrl-c: {}", e)))?;
    Ok("ctrl-c")
}
