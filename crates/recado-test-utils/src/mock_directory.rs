// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-memory mock implementations of the marketplace collaborator ports.

use std::collections::HashMap;

use async_trait::async_trait;

use recado_core::types::{Direction, RequestTransition, StaleRequest};
use recado_core::{RecadoError, RecipientDirectory, RequestDirectory};
use tokio::sync::Mutex;

/// In-memory request directory.
///
/// Seed requests with [`add_request`](MockRequestDirectory::add_request);
/// transitions issued by the response handler are captured for assertion.
pub struct MockRequestDirectory {
    requests: Mutex<Vec<StaleRequest>>,
    transitions: Mutex<Vec<(String, RequestTransition)>>,
}

impl MockRequestDirectory {
    pub fn new() -> Self {
        Self {
            requests: Mutex::new(Vec::new()),
            transitions: Mutex::new(Vec::new()),
        }
    }

    pub async fn add_request(&self, id: &str, status: &str, updated_at: &str) {
        self.requests.lock().await.push(StaleRequest {
            id: id.to_string(),
            status: status.to_string(),
            updated_at: updated_at.to_string(),
        });
    }

    /// All transitions applied through the port, in order.
    pub async fn transitions(&self) -> Vec<(String, RequestTransition)> {
        self.transitions.lock().await.clone()
    }
}

impl Default for MockRequestDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RequestDirectory for MockRequestDirectory {
    async fn find_stale(
        &self,
        status: &str,
        cutoff: &str,
    ) -> Result<Vec<StaleRequest>, RecadoError> {
        Ok(self
            .requests
            .lock()
            .await
            .iter()
            .filter(|r| r.status == status && r.updated_at.as_str() <= cutoff)
            .cloned()
            .collect())
    }

    async fn apply_transition(
        &self,
        request_id: &str,
        transition: RequestTransition,
    ) -> Result<(), RecadoError> {
        self.transitions
            .lock()
            .await
            .push((request_id.to_string(), transition));
        Ok(())
    }
}

/// In-memory recipient directory keyed by request id.
pub struct MockRecipientDirectory {
    phones: Mutex<HashMap<String, String>>,
}

impl MockRecipientDirectory {
    pub fn new() -> Self {
        Self {
            phones: Mutex::new(HashMap::new()),
        }
    }

    /// Register a verified phone for a request. Requests without an entry
    /// resolve to `None`.
    pub async fn set_phone(&self, request_id: &str, phone: &str) {
        self.phones
            .lock()
            .await
            .insert(request_id.to_string(), phone.to_string());
    }
}

impl Default for MockRecipientDirectory {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RecipientDirectory for MockRecipientDirectory {
    async fn verified_phone(
        &self,
        request_id: &str,
        _direction: Direction,
    ) -> Result<Option<String>, RecadoError> {
        Ok(self.phones.lock().await.get(request_id).cloned())
    }
}
