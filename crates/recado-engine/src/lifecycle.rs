// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interaction lifecycle service: the single place that mutates interaction
//! state. All idempotency guarantees live here.
//!
//! Expected outcomes (idempotent replays, already-open follow-ups, unmatched
//! correlation ids) are returned as typed data so callers branch on values,
//! not on error-message text.

use std::sync::Arc;

use recado_core::time::now_ts;
use recado_core::types::{
    Direction, FollowUpOutcome, InboundOutcome, Interaction, InteractionStatus, LedgerKind,
    StatusOutcome,
};
use recado_core::{InteractionStore, RecadoError};
use tracing::{debug, info, warn};

use crate::classifier;
use crate::response::ResponseHandler;

/// Core aggregate operations over interactions.
pub struct InteractionLifecycle {
    store: Arc<dyn InteractionStore>,
    responder: Arc<ResponseHandler>,
}

impl InteractionLifecycle {
    pub fn new(store: Arc<dyn InteractionStore>, responder: Arc<ResponseHandler>) -> Self {
        Self { store, responder }
    }

    /// Create a new follow-up interaction in PENDING.
    ///
    /// Re-validates the "no open follow-up" invariant; under a concurrent
    /// race the storage uniqueness constraint rejects the second insert and
    /// the outcome is [`FollowUpOutcome::AlreadyOpen`] either way.
    pub async fn create_follow_up(
        &self,
        request_id: &str,
        direction: Direction,
        template: &str,
        content: &str,
        scheduled_for: &str,
        metadata: serde_json::Value,
    ) -> Result<FollowUpOutcome, RecadoError> {
        if self.store.has_open_follow_up(request_id, direction).await? {
            debug!(request_id, %direction, "follow-up already open, not creating");
            return Ok(FollowUpOutcome::AlreadyOpen);
        }

        let now = now_ts();
        let interaction = Interaction {
            id: uuid::Uuid::new_v4().to_string(),
            request_id: request_id.to_string(),
            direction,
            status: InteractionStatus::Pending,
            message_template: template.to_string(),
            message_content: content.to_string(),
            recipient: None,
            scheduled_for: scheduled_for.to_string(),
            sent_at: None,
            delivered_at: None,
            provider_message_id: None,
            provider_status: None,
            metadata: Some(metadata.to_string()),
            created_at: now.clone(),
            updated_at: now,
        };

        if !self.store.insert(&interaction).await? {
            debug!(request_id, %direction, "concurrent follow-up insert lost the race");
            return Ok(FollowUpOutcome::AlreadyOpen);
        }

        info!(
            request_id,
            interaction_id = interaction.id.as_str(),
            template,
            "follow-up created"
        );
        Ok(FollowUpOutcome::Created(interaction))
    }

    /// Apply a provider status callback, keyed by provider message id.
    ///
    /// Transitions are monotonic: a callback reporting a status equal or
    /// earlier than the current one is an idempotent replay, answered with
    /// [`StatusOutcome::AlreadyApplied`] and no mutation.
    pub async fn apply_status_update(
        &self,
        provider_message_id: &str,
        raw_status: &str,
    ) -> Result<StatusOutcome, RecadoError> {
        let Some(interaction) = self
            .store
            .find_by_provider_message_id(provider_message_id)
            .await?
        else {
            warn!(provider_message_id, raw_status, "status update for unknown message");
            return Ok(StatusOutcome::NotFound);
        };

        let Some(target) = InteractionStatus::from_provider(raw_status) else {
            warn!(
                provider_message_id,
                raw_status, "unmapped provider status, ignoring"
            );
            return Ok(StatusOutcome::AlreadyApplied);
        };

        if target.ordinal() <= interaction.status.ordinal() {
            debug!(
                provider_message_id,
                current = %interaction.status,
                reported = %target,
                "stale or replayed status callback, no-op"
            );
            return Ok(StatusOutcome::AlreadyApplied);
        }

        self.store
            .apply_status(&interaction.id, target, raw_status, &now_ts())
            .await?;
        info!(
            interaction_id = interaction.id.as_str(),
            provider_message_id,
            from = %interaction.status,
            to = %target,
            "interaction status advanced"
        );
        Ok(StatusOutcome::Applied { status: target })
    }

    /// Process an inbound reply.
    ///
    /// The dedupe ledger gates everything: a provider message id seen before
    /// returns [`InboundOutcome::AlreadyProcessed`] without touching state.
    /// The ledger entry is written after the interaction mutation, so a
    /// crash in between causes at worst a harmless reprocessing, never a
    /// missed one.
    pub async fn process_inbound(
        &self,
        from: &str,
        body: &str,
        provider_message_id: &str,
    ) -> Result<InboundOutcome, RecadoError> {
        if self.store.ledger_seen(provider_message_id).await? {
            debug!(provider_message_id, "inbound already processed");
            return Ok(InboundOutcome::AlreadyProcessed);
        }

        let Some(interaction) = self.store.find_most_recent_for_recipient(from).await? else {
            warn!(from, provider_message_id, "inbound from unmatched sender");
            return Ok(InboundOutcome::NoMatch);
        };

        let classification = classifier::classify(body);

        let mut metadata: serde_json::Value = interaction
            .metadata
            .as_deref()
            .and_then(|m| serde_json::from_str(m).ok())
            .unwrap_or_else(|| serde_json::json!({}));
        metadata["classification"] = serde_json::json!({
            "intent": classification.intent,
            "matched": classification.matched.clone(),
        });
        metadata["reply"] = serde_json::json!({
            "provider_message_id": provider_message_id,
            "body": body,
        });

        self.store
            .mark_responded(&interaction.id, &metadata.to_string())
            .await?;
        self.store
            .ledger_record(provider_message_id, LedgerKind::Inbound)
            .await?;

        info!(
            interaction_id = interaction.id.as_str(),
            request_id = interaction.request_id.as_str(),
            intent = %classification.intent,
            "inbound reply recorded"
        );

        // The reply itself is already durable; a transition failure must not
        // fail the inbound unit (the provider would replay into the ledger).
        if let Err(e) = self
            .responder
            .handle(&interaction.request_id, &classification)
            .await
        {
            warn!(
                request_id = interaction.request_id.as_str(),
                error = %e,
                "request transition failed after reply"
            );
        }

        Ok(InboundOutcome::Processed {
            request_id: interaction.request_id,
            interaction_id: interaction.id,
            classification,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recado_core::types::Intent;
    use recado_test_utils::{temp_store, MockRequestDirectory};

    async fn setup() -> (
        InteractionLifecycle,
        Arc<dyn InteractionStore>,
        Arc<MockRequestDirectory>,
        tempfile::TempDir,
    ) {
        let (store, dir) = temp_store().await;
        let store: Arc<dyn InteractionStore> = Arc::new(store);
        let requests = Arc::new(MockRequestDirectory::new());
        let responder = Arc::new(ResponseHandler::new(requests.clone()));
        let lifecycle = InteractionLifecycle::new(store.clone(), responder);
        (lifecycle, store, requests, dir)
    }

    async fn create_and_send(
        lifecycle: &InteractionLifecycle,
        store: &Arc<dyn InteractionStore>,
        request_id: &str,
        pmid: &str,
        recipient: &str,
    ) -> Interaction {
        let outcome = lifecycle
            .create_follow_up(
                request_id,
                Direction::ToClient,
                "follow_up_3_days",
                "Hola!",
                &now_ts(),
                serde_json::json!({"rule": "follow_up_3_days"}),
            )
            .await
            .unwrap();
        let FollowUpOutcome::Created(interaction) = outcome else {
            panic!("expected creation");
        };
        store.claim(&interaction.id).await.unwrap();
        store
            .mark_sent(&interaction.id, pmid, recipient, &now_ts())
            .await
            .unwrap();
        interaction
    }

    #[tokio::test]
    async fn second_follow_up_is_already_open() {
        let (lifecycle, _store, _requests, _dir) = setup().await;

        let first = lifecycle
            .create_follow_up(
                "req-1",
                Direction::ToClient,
                "follow_up_3_days",
                "Hola!",
                &now_ts(),
                serde_json::json!({}),
            )
            .await
            .unwrap();
        assert!(matches!(first, FollowUpOutcome::Created(_)));

        let second = lifecycle
            .create_follow_up(
                "req-1",
                Direction::ToClient,
                "follow_up_3_days",
                "Hola!",
                &now_ts(),
                serde_json::json!({}),
            )
            .await
            .unwrap();
        assert_eq!(second, FollowUpOutcome::AlreadyOpen);
    }

    #[tokio::test]
    async fn status_update_is_idempotent() {
        let (lifecycle, store, _requests, _dir) = setup().await;
        create_and_send(&lifecycle, &store, "req-1", "SM1", "+549111").await;

        let first = lifecycle.apply_status_update("SM1", "delivered").await.unwrap();
        assert_eq!(
            first,
            StatusOutcome::Applied {
                status: InteractionStatus::Delivered
            }
        );
        let delivered_at = store
            .find_by_provider_message_id("SM1")
            .await
            .unwrap()
            .unwrap()
            .delivered_at;

        // Exact replay: success, no mutation, timestamp untouched.
        let replay = lifecycle.apply_status_update("SM1", "delivered").await.unwrap();
        assert_eq!(replay, StatusOutcome::AlreadyApplied);
        let after = store
            .find_by_provider_message_id("SM1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(after.delivered_at, delivered_at);
    }

    #[tokio::test]
    async fn out_of_order_status_does_not_regress() {
        let (lifecycle, store, _requests, _dir) = setup().await;
        create_and_send(&lifecycle, &store, "req-1", "SM1", "+549111").await;

        for raw in ["sent", "delivered", "sent"] {
            lifecycle.apply_status_update("SM1", raw).await.unwrap();
        }

        let i = store
            .find_by_provider_message_id("SM1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(i.status, InteractionStatus::Delivered);
    }

    #[tokio::test]
    async fn unknown_provider_message_id_is_not_found() {
        let (lifecycle, _store, _requests, _dir) = setup().await;
        let outcome = lifecycle.apply_status_update("SM-nope", "delivered").await.unwrap();
        assert_eq!(outcome, StatusOutcome::NotFound);
    }

    #[tokio::test]
    async fn unmapped_raw_status_is_a_no_op() {
        let (lifecycle, store, _requests, _dir) = setup().await;
        create_and_send(&lifecycle, &store, "req-1", "SM1", "+549111").await;

        let outcome = lifecycle.apply_status_update("SM1", "warming_up").await.unwrap();
        assert_eq!(outcome, StatusOutcome::AlreadyApplied);
        let i = store
            .find_by_provider_message_id("SM1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(i.status, InteractionStatus::Sent);
    }

    #[tokio::test]
    async fn inbound_reply_is_processed_once() {
        let (lifecycle, store, requests, _dir) = setup().await;
        create_and_send(&lifecycle, &store, "req-1", "SM1", "+549111").await;

        let first = lifecycle
            .process_inbound("+549111", "si confirmo", "SM-in-1")
            .await
            .unwrap();
        let InboundOutcome::Processed {
            request_id,
            classification,
            ..
        } = first
        else {
            panic!("expected processed");
        };
        assert_eq!(request_id, "req-1");
        assert_eq!(classification.intent, Intent::Confirm);

        // Exactly one request transition so far.
        assert_eq!(requests.transitions().await.len(), 1);

        // Replay: no second transition, no error.
        let replay = lifecycle
            .process_inbound("+549111", "si confirmo", "SM-in-1")
            .await
            .unwrap();
        assert_eq!(replay, InboundOutcome::AlreadyProcessed);
        assert_eq!(requests.transitions().await.len(), 1);
    }

    #[tokio::test]
    async fn inbound_from_stranger_is_no_match() {
        let (lifecycle, _store, requests, _dir) = setup().await;
        let outcome = lifecycle
            .process_inbound("+549999", "hola", "SM-in-9")
            .await
            .unwrap();
        assert_eq!(outcome, InboundOutcome::NoMatch);
        assert!(requests.transitions().await.is_empty());

        // NoMatch is not ledgered: the same id can be retried later.
        let again = lifecycle
            .process_inbound("+549999", "hola", "SM-in-9")
            .await
            .unwrap();
        assert_eq!(again, InboundOutcome::NoMatch);
    }

    #[tokio::test]
    async fn inbound_classification_lands_in_metadata() {
        let (lifecycle, store, _requests, _dir) = setup().await;
        let interaction = create_and_send(&lifecycle, &store, "req-1", "SM1", "+549111").await;

        lifecycle
            .process_inbound("+549111", "no gracias", "SM-in-1")
            .await
            .unwrap();

        let i = store.get(&interaction.id).await.unwrap().unwrap();
        assert_eq!(i.status, InteractionStatus::Responded);
        let meta: serde_json::Value = serde_json::from_str(i.metadata.as_deref().unwrap()).unwrap();
        assert_eq!(meta["classification"]["intent"], "decline");
        assert_eq!(meta["classification"]["matched"], "no gracias");
        assert_eq!(meta["reply"]["provider_message_id"], "SM-in-1");
        // Original creation metadata survives the merge.
        assert_eq!(meta["rule"], "follow_up_3_days");
    }
}
