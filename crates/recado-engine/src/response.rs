// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Reaction to classified inbound replies.
//!
//! Maps a reply intent to a request-state transition issued to the external
//! request collaborator, keeping messaging concerns decoupled from request
//! business rules.

use std::sync::Arc;

use recado_core::types::{Classification, Intent, RequestTransition};
use recado_core::{RecadoError, RequestDirectory};
use tracing::{debug, info};

/// Handles "interaction responded" outcomes from the lifecycle service.
pub struct ResponseHandler {
    requests: Arc<dyn RequestDirectory>,
}

impl ResponseHandler {
    pub fn new(requests: Arc<dyn RequestDirectory>) -> Self {
        Self { requests }
    }

    /// The transition an intent maps to, if any. UNKNOWN performs no
    /// transition; only the audit trail is kept.
    pub fn transition_for(intent: Intent) -> Option<RequestTransition> {
        match intent {
            Intent::Confirm => Some(RequestTransition::Confirm),
            Intent::Decline => Some(RequestTransition::Cancel),
            Intent::Unknown => None,
        }
    }

    /// React to a classified reply on a request.
    ///
    /// Returns the transition that was applied, or `None` when the intent
    /// carries no transition.
    pub async fn handle(
        &self,
        request_id: &str,
        classification: &Classification,
    ) -> Result<Option<RequestTransition>, RecadoError> {
        let Some(transition) = Self::transition_for(classification.intent) else {
            debug!(request_id, "reply intent unknown, no request transition");
            return Ok(None);
        };

        self.requests.apply_transition(request_id, transition).await?;
        info!(
            request_id,
            intent = %classification.intent,
            transition = %transition,
            "request transition applied from reply"
        );
        Ok(Some(transition))
    }
}
