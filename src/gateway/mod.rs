//! HTTP dispatch layer for the balance engine

pub mod handlers;
pub mod state;
pub mod types;

use std::future::{Future, IntoFuture};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use axum::{
    Router,
    routing::{get, post},
};
use tokio::net::TcpListener;
use tokio::sync::watch;

use crate::config::GatewayConfig;
use crate::wallet::LedgerStore;
use state::AppState;

/// Build the wallet API router
pub fn router<S: LedgerStore>(state: Arc<AppState<S>>) -> Router {
    Router::new()
        .route("/api/v1/health", get(handlers::health_check::<S>))
        .route("/api/v1/wallet", post(handlers::operate::<S>))
        .route("/api/v1/wallets/{id}", get(handlers::get_balance::<S>))
        .with_state(state)
}

/// Serve until SIGINT/SIGTERM, then drain in-flight requests for at most
/// `shutdown_timeout`.
pub async fn run_server<S: LedgerStore>(
    config: &GatewayConfig,
    state: Arc<AppState<S>>,
) -> anyhow::Result<()> {
    let addr = format!("{}:{}", config.host, config.port);
    let listener = TcpListener::bind(&addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    tracing::info!(addr = %addr, "swift_wallet listening");

    serve(
        listener,
        router(state),
        shutdown_signal(),
        config.shutdown_timeout(),
    )
    .await
}

/// Serve `app` on `listener` until `shutdown` resolves.
pub async fn serve<F>(
    listener: TcpListener,
    app: Router,
    shutdown: F,
    shutdown_timeout: Duration,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let (stop_tx, stop_rx) = watch::channel(false);
    tokio::spawn(async move {
        shutdown.await;
        tracing::info!("shutdown initiated");
        stop_tx.send_replace(true);
    });

    let mut graceful_rx = stop_rx.clone();
    let server = axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            let _ = graceful_rx.changed().await;
        })
        .into_future();

    let mut drain_rx = stop_rx;
    let drain_deadline = async move {
        let _ = drain_rx.changed().await;
        tokio::time::sleep(shutdown_timeout).await;
    };

    tokio::select! {
        res = server => res.context("server error")?,
        _ = drain_deadline => {
            tracing::warn!(
                timeout_ms = shutdown_timeout.as_millis() as u64,
                "graceful shutdown timed out, dropping in-flight requests"
            );
        }
    }

    tracing::info!("server stopped");
    Ok(())
}

/// Waits for SIGINT (Ctrl+C) or SIGTERM, whichever comes first.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{SignalKind, signal};
        match signal(SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
}
