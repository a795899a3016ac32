// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Messaging gateway port over the external WhatsApp provider.

use async_trait::async_trait;

use crate::error::RecadoError;

/// Send/receive contract over the external messaging provider.
///
/// Resolved once at composition time; a test double substitutes in the
/// same slot. The provider delivers at-least-once, so everything on the
/// receiving side of this port must be idempotent.
#[async_trait]
pub trait MessagingGateway: Send + Sync {
    /// Send a message to an E.164 recipient address.
    ///
    /// Returns the provider-assigned message id used to correlate later
    /// status callbacks. Errors distinguish transient failures
    /// ([`RecadoError::Gateway`], retried by dispatch) from permanent ones
    /// ([`RecadoError::InvalidRecipient`], never retried).
    async fn send(&self, recipient: &str, body: &str) -> Result<String, RecadoError>;

    /// Re-query the provider for the current raw status of a sent message.
    ///
    /// Used by the reconciliation worker for interactions whose terminal
    /// status callback never arrived.
    async fn fetch_status(&self, provider_message_id: &str) -> Result<String, RecadoError>;
}
