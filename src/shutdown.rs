//! Interrupt handling: turns SIGINT/SIGTERM into a cancellation signal.

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Cancel `token` on the first interrupt or terminate signal.
///
/// The watcher exits quietly if the token is cancelled by other means first.
/// Must be called from within a tokio runtime.
pub fn cancel_on_interrupt(token: CancellationToken) -> JoinHandle<()> {
    tokio::spawn(async move {
        tokio::select! {
            _ = token.cancelled() => {}
            signal = wait_for_signal() => {
                warn!(signal, "received shutdown signal, cancelling outstanding work");
                token.cancel();
            }
        }
    })
}

/// Resolve with the name of the first shutdown signal received.
pub async fn wait_for_signal() -> &'static str {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => tokio::select! {
                _ = tokio::signal::ctrl_c() => "SIGINT",
                _ = term.recv() => "SIGTERM",
            },
            Err(_) => ctrl_c().await,
        }
    }
    #[cfg(not(unix))]
    {
        ctrl_c().await
    }
}

async fn ctrl_c() -> &'static str {
    match tokio::signal::ctrl_c().await {
        Ok(()) => "SIGINT",
        // no handler could be installed; never resolve
        Err(_) => std::future::pending().await,
    }
}
