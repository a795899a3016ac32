// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Recado messaging pipeline.

use thiserror::Error;

/// The primary error type used across all Recado ports and core operations.
///
/// Expected processing outcomes (idempotent replays, already-open follow-ups)
/// are NOT errors -- they are typed outcomes returned by the lifecycle
/// service. This enum covers genuine failures only.
#[derive(Debug, Error)]
pub enum RecadoError {
    /// Configuration errors (invalid TOML, missing required fields, bad rule table).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, migration).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Transient messaging-gateway errors (network failure, provider 5xx).
    ///
    /// Dispatch leaves the interaction PENDING so a later tick retries.
    #[error("gateway error: {message}")]
    Gateway {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Permanent send failure: the recipient address is invalid or blocked.
    ///
    /// Dispatch marks the interaction FAILED and never retries.
    #[error("invalid recipient: {0}")]
    InvalidRecipient(String),

    /// A correlation lookup found nothing (unknown provider message id,
    /// unmatched inbound sender).
    #[error("{what} not found: {id}")]
    NotFound { what: &'static str, id: String },

    /// Webhook authentication failure (missing or invalid signature).
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// Webhook rate limit exceeded for a client key.
    #[error("rate limited, retry after {retry_after_secs}s")]
    RateLimited { retry_after_secs: u64 },

    /// External collaborator errors (request directory, recipient resolution).
    #[error("collaborator error: {message}")]
    Collaborator {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RecadoError {
    /// Whether a dispatch send failure should be retried on a later tick.
    ///
    /// Only [`RecadoError::InvalidRecipient`] is permanent; everything else
    /// that can surface from a send (network, timeout, provider 5xx) is
    /// treated as transient.
    pub fn is_permanent_send_failure(&self) -> bool {
        matches!(self, RecadoError::InvalidRecipient(_))
    }
}
