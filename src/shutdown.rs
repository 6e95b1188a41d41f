use tokio_util::sync::CancellationToken;

/// Cancel the returned token on Ctrl-C, or on SIGTERM where available.
///
/// The poller and both listeners watch the token; once they have stopped the
/// yard snapshot is written.
pub fn install_shutdown_handler() -> CancellationToken {
    let token = CancellationToken::new();
    let trigger = token.clone();

    tokio::spawn(async move {
        tokio::select! {
            result = tokio::signal::ctrl_c() => match result {
                Ok(()) => tracing::info!("Received Ctrl-C, shutting down"),
                Err(e) => tracing::error!(error = %e, "Ctrl-C handler failed, shutting down"),
            },
            _ = terminate() => tracing::info!("Received SIGTERM, shutting down"),
        }
        trigger.cancel();
    });

    token
}

#[cfg(unix)]
async fn terminate() {
    use tokio::signal::unix::{signal, SignalKind};

    match signal(SignalKind::terminate()) {
        Ok(mut sigterm) => {
            sigterm.recv().await;
        }
        Err(e) => {
            tracing::warn!(error = %e, "SIGTERM handler unavailable");
            std::future::pending::<()>().await;
        }
    }
}

#[cfg(not(unix))]
async fn terminate() {
    std::future::pending::<()>().await;
}
