//! OS signal handling.

use crate::lifecycle::Shutdown;

/// Trigger `shutdown` on the first Ctrl-C.
///
/// Returns once the signal arrives, the shutdown fires for another reason,
/// or signal handling is unavailable.
pub async fn shutdown_on_ctrl_c(shutdown: Shutdown) {
    let mut already = shutdown.subscribe();
    if shutdown.is_triggered() {
        return;
    }
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            match result {
                Ok(()) => {
                    tracing::info!("Interrupt received, shutting down");
                    shutdown.trigger();
                }
                Err(e) => tracing::error!(error = %e, "Failed to listen for interrupt"),
            }
        }
        _ = already.recv() => {}
    }
}
