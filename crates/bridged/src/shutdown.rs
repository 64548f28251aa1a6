//! Process-level cancellation.

use tokio::signal::ctrl_c;
#[cfg(unix)]
use tokio::signal::unix;
use tracing::{error, info};

/// Resolves on Ctrl-C or SIGTERM.
///
/// If a handler cannot be installed that branch never resolves, so the agent
/// keeps running until killed instead of stopping right away.
pub async fn shutdown_signal() {
    let interrupt = async {
        match ctrl_c().await {
            Ok(()) => info!("received Ctrl-C, stopping after the current cycle"),
            Err(e) => {
                error!(error = %e, "failed to install Ctrl-C handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match unix::signal(unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
                info!("received SIGTERM, stopping after the current cycle");
            }
            Err(e) => {
                error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = interrupt => {},
        () = terminate => {},
    }
}
