// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook HTTP server built on axum.
//!
//! Sets up routes, middleware, and shared state, and runs until the
//! cancellation token fires. A background task sweeps stale rate-limit
//! windows while the server is up.

use std::net::SocketAddr;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use recado_core::RecadoError;
use tokio_util::sync::CancellationToken;
use tower_http::trace::TraceLayer;

use crate::handlers::{self, WebhookState};

/// Webhook server bind configuration.
#[derive(Debug, Clone)]
pub struct WebhookServerConfig {
    pub host: String,
    pub port: u16,
}

/// Build the webhook router.
pub fn router(state: WebhookState) -> Router {
    Router::new()
        .route("/webhooks/whatsapp", post(handlers::post_whatsapp_webhook))
        .route("/health", get(handlers::get_health))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

/// Start the webhook server and serve until `cancel` fires.
pub async fn start_server(
    config: &WebhookServerConfig,
    state: WebhookState,
    cancel: CancellationToken,
) -> Result<(), RecadoError> {
    // Sweep stale rate-limit windows for as long as the server runs.
    let limiter = state.limiter.clone();
    let sweep_cancel = cancel.clone();
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(60));
        interval.tick().await;
        loop {
            tokio::select! {
                _ = interval.tick() => limiter.sweep(),
                _ = sweep_cancel.cancelled() => break,
            }
        }
    });

    let app = router(state);
    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| RecadoError::Internal(format!("failed to bind webhook server to {addr}: {e}")))?;

    tracing::info!("webhook server listening on {addr}");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(async move { cancel.cancelled().await })
    .await
    .map_err(|e| RecadoError::Internal(format!("webhook server error: {e}")))?;

    Ok(())
}
