use std::net::SocketAddr;

use axum::{Router, routing::get, routing::post};
use tokio::net::TcpListener;
use tower_http::decompression::RequestDecompressionLayer;
use tracing::info;

use super::{
    services::{download_videos, get_task, health},
    state::AppState,
};

type AnyError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// All intake routes over `state`
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/download-videos", post(download_videos))
        .route("/tasks/{task_id}", get(get_task))
        .route("/health", get(health))
        .with_state(state)
        // Content-Encoding: gzip bodies are inflated before reaching handlers
        .layer(RequestDecompressionLayer::new())
}

/// Serve the API until a shutdown signal arrives
pub async fn serve(address: SocketAddr, state: AppState) -> Result<(), AnyError> {
    let app = router(state);

    let listener = TcpListener::bind(address).await?;
    info!(%address, "ZipBox API listening");

    axum::serve(listener, app.into_make_service())
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        let mut sigterm = signal(SignalKind::terminate())
            .expect("failed to install signal handler");
        sigterm.recv().await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received");
}
