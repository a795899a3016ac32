// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `recado serve` command implementation.
//!
//! Composition root: opens storage, builds the Twilio gateway and the
//! marketplace collaborator clients, wires the lifecycle service, spawns
//! the three periodic workers, and runs the webhook server in the
//! foreground until shutdown.

use std::sync::Arc;
use std::time::Duration;

use recado_config::RecadoConfig;
use recado_core::{
    InteractionStore, MessagingGateway, RecadoError, RecipientDirectory, RequestDirectory,
};
use recado_engine::{
    DispatchWorker, FollowUpEngine, InteractionLifecycle, ReconcileWorker, ResponseHandler,
};
use recado_storage::SqliteInteractionStore;
use recado_webhook::{RateLimiter, SignatureGuard, WebhookServerConfig, WebhookState};
use recado_whatsapp::TwilioWhatsAppGateway;
use tracing::{error, info, warn};

use crate::collaborators::HttpMarketplaceClient;
use crate::shutdown;

/// Runs the `recado serve` command.
pub async fn run_serve(config: RecadoConfig) -> Result<(), RecadoError> {
    init_tracing(&config.service.log_level);
    info!("starting recado serve");

    // Storage.
    let store: Arc<dyn InteractionStore> =
        Arc::new(SqliteInteractionStore::open(&config.storage).await?);
    info!(path = config.storage.database_path.as_str(), "storage ready");

    // Messaging gateway.
    let gateway: Arc<dyn MessagingGateway> = Arc::new(
        TwilioWhatsAppGateway::new(&config.whatsapp).map_err(|e| {
            error!(error = %e, "failed to initialize WhatsApp gateway");
            eprintln!(
                "error: Twilio credentials required. Set whatsapp.account_sid, \
                 whatsapp.auth_token and whatsapp.from_number via config or RECADO_WHATSAPP_* env vars."
            );
            e
        })?,
    );

    // Marketplace collaborators: one HTTP client serves both narrow ports.
    let marketplace = Arc::new(HttpMarketplaceClient::new(&config.marketplace)?);
    let requests: Arc<dyn RequestDirectory> = marketplace.clone();
    let recipients: Arc<dyn RecipientDirectory> = marketplace;

    // Core services.
    let responder = Arc::new(ResponseHandler::new(requests.clone()));
    let lifecycle = Arc::new(InteractionLifecycle::new(store.clone(), responder));
    let follow_up = Arc::new(FollowUpEngine::new(
        &config.followup,
        store.clone(),
        requests.clone(),
        recipients.clone(),
        lifecycle.clone(),
    )?);
    let dispatcher = Arc::new(DispatchWorker::new(
        &config.dispatch,
        &config.whatsapp,
        store.clone(),
        gateway.clone(),
        recipients.clone(),
    ));
    let reconciler = Arc::new(ReconcileWorker::new(
        &config.reconcile,
        store.clone(),
        gateway.clone(),
        lifecycle.clone(),
    ));

    let cancel = shutdown::install_signal_handler();

    // Periodic workers. The first immediate interval tick is skipped so a
    // restart loop cannot hammer the collaborators.
    {
        let engine = follow_up.clone();
        let worker_cancel = cancel.clone();
        let interval_secs = config.followup.interval_secs;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => { engine.tick().await; }
                    _ = worker_cancel.cancelled() => {
                        info!("follow-up worker shutting down");
                        break;
                    }
                }
            }
        });
        info!(interval_secs, enabled = config.followup.enabled, "follow-up worker started");
    }

    {
        let worker = dispatcher.clone();
        let worker_cancel = cancel.clone();
        let interval_secs = config.dispatch.interval_secs;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => { worker.tick().await; }
                    _ = worker_cancel.cancelled() => {
                        info!("dispatch worker shutting down");
                        break;
                    }
                }
            }
        });
        info!(interval_secs, "dispatch worker started");
    }

    {
        let worker = reconciler.clone();
        let worker_cancel = cancel.clone();
        let interval_secs = config.reconcile.interval_secs;
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));
            interval.tick().await;
            loop {
                tokio::select! {
                    _ = interval.tick() => { worker.tick().await; }
                    _ = worker_cancel.cancelled() => {
                        info!("reconciliation worker shutting down");
                        break;
                    }
                }
            }
        });
        info!(interval_secs, "reconciliation worker started");
    }

    // Webhook server runs in the foreground until shutdown.
    let signed_url = config.webhook.public_url.clone().unwrap_or_else(|| {
        format!(
            "http://{}:{}/webhooks/whatsapp",
            config.webhook.host, config.webhook.port
        )
    });
    if config.webhook.public_url.is_none() {
        warn!(
            signed_url = signed_url.as_str(),
            "webhook.public_url not set; signatures are computed over the local bind address"
        );
    }
    let state = WebhookState {
        lifecycle,
        guard: Arc::new(SignatureGuard::new(config.webhook.signature_secret.clone())),
        limiter: Arc::new(RateLimiter::new(
            config.webhook.rate_limit_max_requests,
            Duration::from_secs(config.webhook.rate_limit_window_secs),
        )),
        signed_url,
    };
    let server_config = WebhookServerConfig {
        host: config.webhook.host.clone(),
        port: config.webhook.port,
    };
    recado_webhook::start_server(&server_config, state, cancel).await?;

    info!("recado serve shutdown complete");
    Ok(())
}

/// Initializes the tracing subscriber with the given log level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
