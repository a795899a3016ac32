// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared across the Recado workspace.
//!
//! All timestamps are RFC 3339 UTC strings with millisecond precision
//! (`2026-01-01T00:00:00.000Z`). The format is lexicographically ordered,
//! so SQL range comparisons over TEXT columns are correct.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

/// Which party a message flows toward.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    /// Toward the service provider (specialist or company).
    ToProvider,
    /// Toward the requesting client.
    ToClient,
}

/// Delivery lifecycle of an interaction.
///
/// `pending -> sending -> sent -> {delivered, read, failed} -> responded`.
/// `sending` is the dispatch claim state: exactly one worker owns the
/// interaction between claiming and the gateway call resolving.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum InteractionStatus {
    Pending,
    Sending,
    Sent,
    Delivered,
    Read,
    Failed,
    Responded,
}

impl InteractionStatus {
    /// Position along the state machine, used for the monotonicity guard.
    ///
    /// A provider callback only transitions an interaction when the target
    /// ordinal is strictly greater than the current one; anything else is an
    /// idempotent replay. `failed` ranks above `read` so a definitive
    /// failure report is never masked by an earlier delivery receipt.
    pub fn ordinal(self) -> u8 {
        match self {
            InteractionStatus::Pending => 0,
            InteractionStatus::Sending => 1,
            InteractionStatus::Sent => 2,
            InteractionStatus::Delivered => 3,
            InteractionStatus::Read => 4,
            InteractionStatus::Failed => 5,
            InteractionStatus::Responded => 6,
        }
    }

    /// Whether the interaction still counts as an in-flight follow-up for
    /// the "at most one open per (request, direction)" invariant.
    pub fn is_open(self) -> bool {
        matches!(
            self,
            InteractionStatus::Pending | InteractionStatus::Sending | InteractionStatus::Sent
        )
    }

    /// Map a raw provider status string to a lifecycle status.
    ///
    /// Fixed table: `accepted|queued -> pending`, `sending -> sending`,
    /// `sent -> sent`, `delivered -> delivered`, `read -> read`,
    /// `failed|undelivered -> failed`. Unknown strings return `None` and
    /// are logged by the caller.
    pub fn from_provider(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "accepted" | "queued" => Some(InteractionStatus::Pending),
            "sending" => Some(InteractionStatus::Sending),
            "sent" => Some(InteractionStatus::Sent),
            "delivered" => Some(InteractionStatus::Delivered),
            "read" => Some(InteractionStatus::Read),
            "failed" | "undelivered" => Some(InteractionStatus::Failed),
            _ => None,
        }
    }
}

/// One outbound or inbound message tied to a marketplace request.
///
/// Interactions are an audit trail: they are created, transitioned, and
/// never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Interaction {
    pub id: String,
    /// Owning marketplace request. Many interactions per request over time.
    pub request_id: String,
    pub direction: Direction,
    pub status: InteractionStatus,
    /// Name of the template the content was rendered from.
    pub message_template: String,
    /// Rendered message payload.
    pub message_content: String,
    /// E.164 address the message was dispatched to. Set when sent.
    pub recipient: Option<String>,
    /// Earliest dispatch time.
    pub scheduled_for: String,
    pub sent_at: Option<String>,
    pub delivered_at: Option<String>,
    /// External correlation id, unique and immutable once assigned.
    /// Idempotency key for status-update webhooks.
    pub provider_message_id: Option<String>,
    /// Last raw status string reported by the provider, kept for audit.
    pub provider_status: Option<String>,
    /// Open JSON object: rule name, elapsed days, classification result.
    pub metadata: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A request that has sat in one status long enough to match a follow-up rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StaleRequest {
    pub id: String,
    pub status: String,
    pub updated_at: String,
}

/// Coarse intent derived from a free-text inbound reply.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    Confirm,
    Decline,
    Unknown,
}

/// Classifier output: the intent plus the keyword that matched, for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Classification {
    pub intent: Intent,
    pub matched: Option<String>,
}

/// Request-state transition issued to the external request collaborator
/// in reaction to a classified reply.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum RequestTransition {
    Confirm,
    Cancel,
}

/// Outcome of a follow-up creation attempt.
#[derive(Debug, Clone, PartialEq)]
pub enum FollowUpOutcome {
    Created(Interaction),
    /// An interaction in {pending, sending, sent} already exists for this
    /// `(request, direction)` -- either seen up front or surfaced by the
    /// storage uniqueness constraint under a concurrent race.
    AlreadyOpen,
}

/// Outcome of applying a provider status callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusOutcome {
    Applied { status: InteractionStatus },
    /// The reported status is equal or earlier than the current one, or the
    /// raw string is outside the mapping table: an idempotent no-op.
    AlreadyApplied,
    /// No interaction carries this provider message id.
    NotFound,
}

/// Outcome of processing an inbound reply.
#[derive(Debug, Clone, PartialEq)]
pub enum InboundOutcome {
    Processed {
        request_id: String,
        interaction_id: String,
        classification: Classification,
    },
    /// The provider message id is already in the dedupe ledger.
    AlreadyProcessed,
    /// The sender address matches no recent outbound interaction.
    NoMatch,
}

/// Kind of entry in the dedupe ledger.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LedgerKind {
    Inbound,
    Status,
}
