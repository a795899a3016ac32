// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dispatch worker: turns PENDING interactions into provider-sent messages.
//!
//! Each due interaction is claimed (`pending -> sending`) before the gateway
//! call, so two workers racing on the same batch send every message at most
//! once. Transient failures release the claim for a later tick; permanent
//! failures close the interaction as FAILED.

use std::sync::Arc;
use std::time::Duration;

use recado_config::model::{DispatchConfig, WhatsAppConfig};
use recado_core::time::now_ts;
use recado_core::types::Interaction;
use recado_core::{InteractionStore, MessagingGateway, RecadoError, RecipientDirectory};
use tracing::{debug, error, info, warn};

/// Counters for one dispatch tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DispatchTickSummary {
    pub sent: usize,
    pub failed: usize,
    /// Transient failures: claim released, will retry on a later tick.
    pub retried: usize,
    /// Lost claim races and other non-actions.
    pub skipped: usize,
}

enum ItemOutcome {
    Sent,
    Failed,
    Retried,
    Skipped,
}

/// Periodic job sending due interactions through the gateway port.
pub struct DispatchWorker {
    store: Arc<dyn InteractionStore>,
    gateway: Arc<dyn MessagingGateway>,
    recipients: Arc<dyn RecipientDirectory>,
    batch_size: i64,
    send_timeout: Duration,
}

impl DispatchWorker {
    pub fn new(
        config: &DispatchConfig,
        whatsapp: &WhatsAppConfig,
        store: Arc<dyn InteractionStore>,
        gateway: Arc<dyn MessagingGateway>,
        recipients: Arc<dyn RecipientDirectory>,
    ) -> Self {
        Self {
            store,
            gateway,
            recipients,
            batch_size: config.batch_size,
            send_timeout: Duration::from_secs(whatsapp.send_timeout_secs),
        }
    }

    /// Run one dispatch tick. Never returns an error: each item is handled
    /// independently and a failure on one does not affect the others.
    pub async fn tick(&self) -> DispatchTickSummary {
        let mut summary = DispatchTickSummary::default();

        let due = match self.store.find_due(&now_ts(), self.batch_size).await {
            Ok(due) => due,
            Err(e) => {
                error!(error = %e, "failed to fetch due interactions");
                return summary;
            }
        };
        if due.is_empty() {
            return summary;
        }
        debug!(count = due.len(), "dispatching due interactions");

        for interaction in &due {
            match self.dispatch_one(interaction).await {
                Ok(ItemOutcome::Sent) => summary.sent += 1,
                Ok(ItemOutcome::Failed) => summary.failed += 1,
                Ok(ItemOutcome::Retried) => summary.retried += 1,
                Ok(ItemOutcome::Skipped) => summary.skipped += 1,
                Err(e) => {
                    error!(
                        interaction_id = interaction.id.as_str(),
                        error = %e,
                        "dispatch item failed"
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            sent = summary.sent,
            failed = summary.failed,
            retried = summary.retried,
            skipped = summary.skipped,
            "dispatch tick complete"
        );
        summary
    }

    async fn dispatch_one(&self, interaction: &Interaction) -> Result<ItemOutcome, RecadoError> {
        if !self.store.claim(&interaction.id).await? {
            // A concurrent worker owns it, or a webhook advanced it.
            return Ok(ItemOutcome::Skipped);
        }

        let phone = match self
            .recipients
            .verified_phone(&interaction.request_id, interaction.direction)
            .await
        {
            Ok(Some(phone)) => phone,
            Ok(None) => {
                warn!(
                    interaction_id = interaction.id.as_str(),
                    request_id = interaction.request_id.as_str(),
                    "no verified phone, failing interaction"
                );
                self.store
                    .mark_failed(&interaction.id, "no verified phone for recipient")
                    .await?;
                return Ok(ItemOutcome::Failed);
            }
            Err(e) => {
                // Resolution hiccup is transient: release and retry later.
                warn!(
                    interaction_id = interaction.id.as_str(),
                    error = %e,
                    "recipient resolution failed, releasing claim"
                );
                self.store.release_claim(&interaction.id).await?;
                return Ok(ItemOutcome::Retried);
            }
        };

        let send = self.gateway.send(&phone, &interaction.message_content);
        match tokio::time::timeout(self.send_timeout, send).await {
            Ok(Ok(provider_message_id)) => {
                self.store
                    .mark_sent(&interaction.id, &provider_message_id, &phone, &now_ts())
                    .await?;
                info!(
                    interaction_id = interaction.id.as_str(),
                    provider_message_id = provider_message_id.as_str(),
                    "interaction sent"
                );
                Ok(ItemOutcome::Sent)
            }
            Ok(Err(e)) if e.is_permanent_send_failure() => {
                warn!(
                    interaction_id = interaction.id.as_str(),
                    error = %e,
                    "permanent send failure"
                );
                self.store.mark_failed(&interaction.id, &e.to_string()).await?;
                Ok(ItemOutcome::Failed)
            }
            Ok(Err(e)) => {
                warn!(
                    interaction_id = interaction.id.as_str(),
                    error = %e,
                    "transient send failure, releasing claim"
                );
                self.store.release_claim(&interaction.id).await?;
                Ok(ItemOutcome::Retried)
            }
            Err(_) => {
                warn!(
                    interaction_id = interaction.id.as_str(),
                    timeout_secs = self.send_timeout.as_secs(),
                    "send timed out, releasing claim"
                );
                self.store.release_claim(&interaction.id).await?;
                Ok(ItemOutcome::Retried)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recado_core::time::now_ts;
    use recado_core::types::{Direction, InteractionStatus};
    use recado_test_utils::{temp_store, MockGateway, MockRecipientDirectory, SendOutcome};

    struct Fixture {
        worker: DispatchWorker,
        store: Arc<dyn InteractionStore>,
        gateway: Arc<MockGateway>,
        recipients: Arc<MockRecipientDirectory>,
        _dir: tempfile::TempDir,
    }

    async fn setup() -> Fixture {
        let (store, dir) = temp_store().await;
        let store: Arc<dyn InteractionStore> = Arc::new(store);
        let gateway = Arc::new(MockGateway::new());
        let recipients = Arc::new(MockRecipientDirectory::new());
        let worker = DispatchWorker::new(
            &DispatchConfig::default(),
            &WhatsAppConfig::default(),
            store.clone(),
            gateway.clone(),
            recipients.clone(),
        );
        Fixture {
            worker,
            store,
            gateway,
            recipients,
            _dir: dir,
        }
    }

    async fn seed_pending(store: &Arc<dyn InteractionStore>, id: &str, request_id: &str) {
        let now = now_ts();
        let interaction = Interaction {
            id: id.to_string(),
            request_id: request_id.to_string(),
            direction: Direction::ToClient,
            status: InteractionStatus::Pending,
            message_template: "follow_up_3_days".to_string(),
            message_content: "Hola!".to_string(),
            recipient: None,
            scheduled_for: now.clone(),
            sent_at: None,
            delivered_at: None,
            provider_message_id: None,
            provider_status: None,
            metadata: None,
            created_at: now.clone(),
            updated_at: now,
        };
        assert!(store.insert(&interaction).await.unwrap());
    }

    #[tokio::test]
    async fn due_pending_interaction_is_sent() {
        let f = setup().await;
        seed_pending(&f.store, "i-1", "req-1").await;
        f.recipients.set_phone("req-1", "+5491122334455").await;

        let summary = f.worker.tick().await;
        assert_eq!(summary.sent, 1);

        let i = f.store.get("i-1").await.unwrap().unwrap();
        assert_eq!(i.status, InteractionStatus::Sent);
        assert!(i.provider_message_id.is_some());
        assert_eq!(i.recipient.as_deref(), Some("+5491122334455"));
        assert!(i.sent_at.is_some());
        assert_eq!(f.gateway.sent_count().await, 1);
    }

    #[tokio::test]
    async fn transient_failure_leaves_the_interaction_pending() {
        let f = setup().await;
        seed_pending(&f.store, "i-1", "req-1").await;
        f.recipients.set_phone("req-1", "+5491122334455").await;
        f.gateway
            .push_outcome(SendOutcome::Transient("provider 503".into()))
            .await;

        let summary = f.worker.tick().await;
        assert_eq!(summary.retried, 1);
        assert_eq!(summary.sent, 0);

        let i = f.store.get("i-1").await.unwrap().unwrap();
        assert_eq!(i.status, InteractionStatus::Pending, "claim released for retry");

        // The next tick retries and succeeds.
        let summary = f.worker.tick().await;
        assert_eq!(summary.sent, 1);
    }

    #[tokio::test]
    async fn permanent_failure_marks_failed_without_retry() {
        let f = setup().await;
        seed_pending(&f.store, "i-1", "req-1").await;
        f.recipients.set_phone("req-1", "+5491122334455").await;
        f.gateway
            .push_outcome(SendOutcome::Permanent("number does not exist".into()))
            .await;

        let summary = f.worker.tick().await;
        assert_eq!(summary.failed, 1);

        let i = f.store.get("i-1").await.unwrap().unwrap();
        assert_eq!(i.status, InteractionStatus::Failed);
        assert!(i.metadata.unwrap().contains("number does not exist"));

        // Nothing left to do.
        assert_eq!(f.worker.tick().await, DispatchTickSummary::default());
    }

    #[tokio::test]
    async fn missing_phone_is_a_permanent_failure() {
        let f = setup().await;
        seed_pending(&f.store, "i-1", "req-1").await;
        // No phone registered for req-1.

        let summary = f.worker.tick().await;
        assert_eq!(summary.failed, 1);
        assert_eq!(
            f.store.get("i-1").await.unwrap().unwrap().status,
            InteractionStatus::Failed
        );
        assert_eq!(f.gateway.sent_count().await, 0);
    }

    #[tokio::test]
    async fn one_bad_item_does_not_stop_the_batch() {
        let f = setup().await;
        seed_pending(&f.store, "i-1", "req-1").await;
        seed_pending(&f.store, "i-2", "req-2").await;
        f.recipients.set_phone("req-2", "+5491166778899").await;
        // req-1 has no phone and fails; req-2 must still go out.

        let summary = f.worker.tick().await;
        assert_eq!(summary.failed, 1);
        assert_eq!(summary.sent, 1);
        assert_eq!(
            f.store.get("i-2").await.unwrap().unwrap().status,
            InteractionStatus::Sent
        );
    }

    #[tokio::test]
    async fn claimed_interactions_are_not_double_sent() {
        let f = setup().await;
        seed_pending(&f.store, "i-1", "req-1").await;
        f.recipients.set_phone("req-1", "+5491122334455").await;

        // Another worker instance claimed the row between find_due and claim.
        assert!(f.store.claim("i-1").await.unwrap());

        let summary = f.worker.tick().await;
        assert_eq!(summary.skipped, 0, "sending rows are not even fetched");
        assert_eq!(summary.sent, 0);
        assert_eq!(f.gateway.sent_count().await, 0);
    }
}
