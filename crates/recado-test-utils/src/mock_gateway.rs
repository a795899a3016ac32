// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock messaging gateway for deterministic testing.
//!
//! `MockGateway` implements `MessagingGateway` with scripted send outcomes
//! and captured sent messages for assertion in tests.

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::Mutex;

use recado_core::{MessagingGateway, RecadoError};

/// A message captured by [`MockGateway::send`].
#[derive(Debug, Clone, PartialEq)]
pub struct SentMessage {
    pub recipient: String,
    pub body: String,
    pub provider_message_id: String,
}

/// Scripted outcome for the next send call.
#[derive(Debug, Clone)]
pub enum SendOutcome {
    /// Succeed with a generated provider message id.
    Succeed,
    /// Fail with a transient gateway error.
    Transient(String),
    /// Fail with a permanent invalid-recipient error.
    Permanent(String),
}

/// A mock messaging gateway.
///
/// Sends succeed by default with generated `SM-mock-N` ids. Outcomes can be
/// scripted per call via [`push_outcome`](MockGateway::push_outcome), and
/// provider statuses for `fetch_status` set via
/// [`set_status`](MockGateway::set_status).
pub struct MockGateway {
    sent: Mutex<Vec<SentMessage>>,
    script: Mutex<VecDeque<SendOutcome>>,
    statuses: Mutex<HashMap<String, String>>,
    counter: AtomicU64,
}

impl MockGateway {
    pub fn new() -> Self {
        Self {
            sent: Mutex::new(Vec::new()),
            script: Mutex::new(VecDeque::new()),
            statuses: Mutex::new(HashMap::new()),
            counter: AtomicU64::new(0),
        }
    }

    /// Queue an outcome for the next unscripted send call.
    pub async fn push_outcome(&self, outcome: SendOutcome) {
        self.script.lock().await.push_back(outcome);
    }

    /// Set the raw status returned by `fetch_status` for a message id.
    pub async fn set_status(&self, provider_message_id: &str, raw_status: &str) {
        self.statuses
            .lock()
            .await
            .insert(provider_message_id.to_string(), raw_status.to_string());
    }

    /// All messages that were sent successfully.
    pub async fn sent_messages(&self) -> Vec<SentMessage> {
        self.sent.lock().await.clone()
    }

    pub async fn sent_count(&self) -> usize {
        self.sent.lock().await.len()
    }
}

impl Default for MockGateway {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl MessagingGateway for MockGateway {
    async fn send(&self, recipient: &str, body: &str) -> Result<String, RecadoError> {
        let outcome = self
            .script
            .lock()
            .await
            .pop_front()
            .unwrap_or(SendOutcome::Succeed);
        match outcome {
            SendOutcome::Succeed => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst);
                let id = format!("SM-mock-{n}");
                self.sent.lock().await.push(SentMessage {
                    recipient: recipient.to_string(),
                    body: body.to_string(),
                    provider_message_id: id.clone(),
                });
                Ok(id)
            }
            SendOutcome::Transient(message) => Err(RecadoError::Gateway {
                message,
                source: None,
            }),
            SendOutcome::Permanent(message) => Err(RecadoError::InvalidRecipient(message)),
        }
    }

    async fn fetch_status(&self, provider_message_id: &str) -> Result<String, RecadoError> {
        self.statuses
            .lock()
            .await
            .get(provider_message_id)
            .cloned()
            .ok_or_else(|| RecadoError::NotFound {
                what: "provider message",
                id: provider_message_id.to_string(),
            })
    }
}
