// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook payload shape and case classification.
//!
//! The provider posts a single payload shape for two cases, distinguished
//! only by which fields are present: a status field makes it a status
//! update, a body field makes it an inbound message, anything else is
//! unknown and ignored.

use serde::Deserialize;

/// Generic provider callback payload.
///
/// Field names are camelCase; the PascalCase aliases accept the provider's
/// native form-style naming when it posts JSON directly.
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct WebhookPayload {
    #[serde(alias = "MessageSid")]
    pub message_id: Option<String>,
    #[serde(alias = "MessageStatus")]
    pub status: Option<String>,
    #[serde(alias = "From")]
    pub from: Option<String>,
    #[serde(alias = "Body")]
    pub body: Option<String>,
    #[serde(alias = "ErrorCode")]
    pub error_code: Option<i64>,
    #[serde(alias = "ErrorMessage")]
    pub error_message: Option<String>,
    #[serde(alias = "MediaUrl")]
    pub media_url: Option<String>,
}

/// Which processing case a payload falls into.
#[derive(Debug, PartialEq, Eq)]
pub enum WebhookKind<'a> {
    StatusUpdate {
        message_id: &'a str,
        status: &'a str,
    },
    Inbound {
        message_id: &'a str,
        from: &'a str,
        body: &'a str,
    },
    Unknown,
}

impl WebhookPayload {
    /// Classify the payload by field presence. A status field wins over a
    /// body field when both are present.
    pub fn kind(&self) -> WebhookKind<'_> {
        match (
            self.message_id.as_deref(),
            self.status.as_deref(),
            self.from.as_deref(),
            self.body.as_deref(),
        ) {
            (Some(message_id), Some(status), _, _) => WebhookKind::StatusUpdate {
                message_id,
                status,
            },
            (Some(message_id), None, Some(from), Some(body)) => WebhookKind::Inbound {
                message_id,
                from,
                body,
            },
            _ => WebhookKind::Unknown,
        }
    }
}

/// Strip the provider's channel prefix from a sender address
/// (`whatsapp:+549... -> +549...`).
pub fn strip_channel_prefix(address: &str) -> &str {
    address.strip_prefix("whatsapp:").unwrap_or(address)
}
