// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Persistence port for interactions and the webhook dedupe ledger.

use async_trait::async_trait;

use crate::error::RecadoError;
use crate::types::{Direction, Interaction, InteractionStatus, LedgerKind};

/// Storage contract for interaction records and the dedupe ledger.
///
/// Interactions are append-and-transition only; nothing here deletes.
#[async_trait]
pub trait InteractionStore: Send + Sync {
    /// Insert a new interaction.
    ///
    /// Returns `false` when the open-follow-up uniqueness constraint
    /// rejects the row (another pending/sending/sent interaction already
    /// exists for the same `(request, direction)`), which callers map to
    /// an already-open outcome rather than an error.
    async fn insert(&self, interaction: &Interaction) -> Result<bool, RecadoError>;

    async fn get(&self, id: &str) -> Result<Option<Interaction>, RecadoError>;

    /// Look up the interaction correlated with a provider message id.
    async fn find_by_provider_message_id(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<Interaction>, RecadoError>;

    /// Whether an interaction in {pending, sending, sent} exists for the
    /// given `(request, direction)`.
    async fn has_open_follow_up(
        &self,
        request_id: &str,
        direction: Direction,
    ) -> Result<bool, RecadoError>;

    /// Most recent interaction for a request regardless of status or
    /// direction, by creation time.
    async fn find_most_recent(&self, request_id: &str)
        -> Result<Option<Interaction>, RecadoError>;

    /// Most recent sent/delivered/read interaction dispatched to the given
    /// recipient address. Used to resolve inbound replies to their request.
    async fn find_most_recent_for_recipient(
        &self,
        recipient: &str,
    ) -> Result<Option<Interaction>, RecadoError>;

    /// Pending interactions whose `scheduled_for` is at or before `now`,
    /// oldest first, capped at `limit`.
    async fn find_due(&self, now: &str, limit: i64) -> Result<Vec<Interaction>, RecadoError>;

    /// Claim an interaction for dispatch: conditional `pending -> sending`.
    ///
    /// Returns `false` when the row was not pending anymore, meaning a
    /// concurrent worker won the claim and this one must skip the item.
    async fn claim(&self, id: &str) -> Result<bool, RecadoError>;

    /// Release a dispatch claim after a transient failure: `sending -> pending`.
    async fn release_claim(&self, id: &str) -> Result<(), RecadoError>;

    /// Record a successful send: status `sent`, provider message id,
    /// resolved recipient address, and `sent_at`.
    async fn mark_sent(
        &self,
        id: &str,
        provider_message_id: &str,
        recipient: &str,
        sent_at: &str,
    ) -> Result<(), RecadoError>;

    /// Record a permanent send failure.
    async fn mark_failed(&self, id: &str, reason: &str) -> Result<(), RecadoError>;

    /// Apply a provider-reported status transition.
    ///
    /// Writes the lifecycle status, the raw provider string for audit, and
    /// the transition timestamp into `sent_at`/`delivered_at` -- each set
    /// at most once.
    async fn apply_status(
        &self,
        id: &str,
        status: InteractionStatus,
        raw_status: &str,
        at: &str,
    ) -> Result<(), RecadoError>;

    /// Terminal transition from an inbound reply: status `responded`,
    /// metadata replaced with the enriched JSON object.
    async fn mark_responded(&self, id: &str, metadata: &str) -> Result<(), RecadoError>;

    /// Interactions stuck in `sent` since before `cutoff`, for the
    /// reconciliation worker.
    async fn find_stuck_sent(
        &self,
        cutoff: &str,
        limit: i64,
    ) -> Result<Vec<Interaction>, RecadoError>;

    // --- Dedupe ledger ---

    /// Whether an inbound provider message id was already processed.
    async fn ledger_seen(&self, provider_message_id: &str) -> Result<bool, RecadoError>;

    /// Append a ledger entry. Idempotent: re-recording an existing id is a no-op.
    async fn ledger_record(
        &self,
        provider_message_id: &str,
        kind: LedgerKind,
    ) -> Result<(), RecadoError>;
}
