//! Server runner: bind, serve, and shut down gracefully.

use tokio::net::TcpListener;
use tracing::info;

use mailroom_core::error::AppError;

use crate::router::build_router;
use crate::state::AppState;

/// Serve until interrupted, then drain: stop accepting connections, give
/// in-flight handlers a grace period, drain the write queue with a final
/// checkpoint, and close.
pub async fn run(state: AppState) -> Result<(), AppError> {
    let addr = format!("{}:{}", state.config.app_host, state.config.app_port);
    let listener = TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;
    info!(addr = %addr, "Listening");

    let app = build_router(state.clone());

    // Stops accepting on the shutdown signal, then lets in-flight handlers
    // finish. Each request carries its own deadline, so the wait is bounded.
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|e| AppError::internal(format!("Server error: {e}")))?;

    info!("Server stopped accepting connections; draining writes");
    state.shutdown();
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        let _ = tokio::signal::ctrl_c().await;
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(_) => std::future::pending::<()>().await,
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }
    info!("Shutdown signal received");
}
