// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Narrow collaborator contracts consumed from the marketplace backend.
//!
//! The profile/company/request services of the surrounding system
//! reference each other freely; the pipeline deliberately does not. It
//! consumes exactly two thin lookup/update contracts, composed at
//! startup against HTTP clients in production and against in-memory
//! doubles in tests.

use async_trait::async_trait;

use crate::error::RecadoError;
use crate::types::{Direction, RequestTransition, StaleRequest};

/// Resolves the verified phone number of a message recipient.
#[async_trait]
pub trait RecipientDirectory: Send + Sync {
    /// The verified E.164 phone number for the intended recipient of a
    /// message on the given request, or `None` when no verified number
    /// exists (the follow-up is skipped, never sent unverified).
    async fn verified_phone(
        &self,
        request_id: &str,
        direction: Direction,
    ) -> Result<Option<String>, RecadoError>;
}

/// Read/transition contract over marketplace requests.
#[async_trait]
pub trait RequestDirectory: Send + Sync {
    /// Requests sitting in `status` whose last update is at or before
    /// `cutoff` (RFC 3339). Follow-up rule candidates.
    async fn find_stale(
        &self,
        status: &str,
        cutoff: &str,
    ) -> Result<Vec<StaleRequest>, RecadoError>;

    /// Ask the request service to apply a state transition in reaction to
    /// a classified reply.
    async fn apply_transition(
        &self,
        request_id: &str,
        transition: RequestTransition,
    ) -> Result<(), RecadoError>;
}
