// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP webhook ingestion for provider delivery callbacks and inbound
//! replies.
//!
//! The endpoint is protected by a signature guard and a per-client rate
//! limiter, and delegates every classified payload to the interaction
//! lifecycle service. Processing is idempotent end to end, so the
//! provider's at-least-once delivery is safe to absorb.

pub mod guard;
pub mod handlers;
pub mod limiter;
pub mod payload;
pub mod server;

pub use guard::SignatureGuard;
pub use handlers::{WebhookState, SIGNATURE_HEADER};
pub use limiter::RateLimiter;
pub use payload::{WebhookKind, WebhookPayload};
pub use server::{router, start_server, WebhookServerConfig};
