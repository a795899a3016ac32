// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers for the webhook ingestion endpoint.
//!
//! Contract: once authentication and rate limiting pass, the endpoint acks
//! 200 for every expected outcome -- idempotent replays, unknown correlation
//! ids, malformed payloads -- so the provider never retry-storms us. Only a
//! genuine persistence failure surfaces as a 5xx, because there a provider
//! retry is exactly what we want.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::{
    body::Bytes,
    extract::{ConnectInfo, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use tracing::{debug, error, warn};

use recado_core::RecadoError;
use recado_engine::InteractionLifecycle;

use crate::guard::SignatureGuard;
use crate::limiter::RateLimiter;
use crate::payload::{strip_channel_prefix, WebhookKind, WebhookPayload};

/// Header carrying the provider's hex HMAC signature.
pub const SIGNATURE_HEADER: &str = "x-webhook-signature";

/// Shared state for the webhook handlers.
#[derive(Clone)]
pub struct WebhookState {
    pub lifecycle: Arc<InteractionLifecycle>,
    pub guard: Arc<SignatureGuard>,
    pub limiter: Arc<RateLimiter>,
    /// The public URL the provider signs (scheme + host + path).
    pub signed_url: String,
}

/// Trivial acknowledgement body.
#[derive(Debug, Serialize)]
pub struct AckResponse {
    pub status: &'static str,
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: String,
}

/// Health response body.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

fn ack(status: &'static str) -> Response {
    (StatusCode::OK, Json(AckResponse { status })).into_response()
}

/// Rate-limit key: first `x-forwarded-for` value when present, otherwise
/// the socket address.
fn client_key(headers: &HeaderMap, addr: SocketAddr) -> String {
    headers
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
        .unwrap_or_else(|| addr.ip().to_string())
}

/// POST /webhooks/whatsapp
///
/// Signature guard first, rate limiter second, then payload classification
/// and delegation to the lifecycle service.
pub async fn post_whatsapp_webhook(
    State(state): State<WebhookState>,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok());
    if let Err(e) = state.guard.verify(&state.signed_url, &body, signature) {
        warn!(error = %e, "webhook rejected by signature guard");
        return (
            StatusCode::UNAUTHORIZED,
            Json(ErrorResponse {
                error: e.to_string(),
            }),
        )
            .into_response();
    }

    let key = client_key(&headers, addr);
    if let Err(e) = state.limiter.check(&key) {
        let retry_after_secs = match e {
            RecadoError::RateLimited { retry_after_secs } => retry_after_secs,
            _ => 1,
        };
        warn!(client = key.as_str(), retry_after_secs, "webhook rate limited");
        return (
            StatusCode::TOO_MANY_REQUESTS,
            [("retry-after", retry_after_secs.to_string())],
            Json(ErrorResponse {
                error: format!("rate limited, retry after {retry_after_secs}s"),
            }),
        )
            .into_response();
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            warn!(error = %e, "malformed webhook payload, ignoring");
            return ack("ignored");
        }
    };

    match payload.kind() {
        WebhookKind::StatusUpdate { message_id, status } => {
            match state.lifecycle.apply_status_update(message_id, status).await {
                Ok(outcome) => {
                    debug!(message_id, status, ?outcome, "status update handled");
                    ack("ok")
                }
                Err(e) => {
                    error!(message_id, error = %e, "status update failed");
                    internal_error()
                }
            }
        }
        WebhookKind::Inbound {
            message_id,
            from,
            body,
        } => {
            let from = strip_channel_prefix(from);
            match state.lifecycle.process_inbound(from, body, message_id).await {
                Ok(outcome) => {
                    debug!(message_id, ?outcome, "inbound message handled");
                    ack("ok")
                }
                Err(e) => {
                    error!(message_id, error = %e, "inbound processing failed");
                    internal_error()
                }
            }
        }
        WebhookKind::Unknown => {
            warn!("webhook payload matched no known case, ignoring");
            ack("ignored")
        }
    }
}

fn internal_error() -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(ErrorResponse {
            error: "internal error".to_string(),
        }),
    )
        .into_response()
}

/// GET /health
pub async fn get_health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}
