// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the InteractionStore port.

use async_trait::async_trait;

use recado_config::model::StorageConfig;
use recado_core::time::now_ts;
use recado_core::types::{Direction, Interaction, InteractionStatus, LedgerKind};
use recado_core::{InteractionStore, RecadoError};

use crate::database::Database;
use crate::queries;

/// SQLite-backed interaction store.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules.
pub struct SqliteInteractionStore {
    db: Database,
}

impl SqliteInteractionStore {
    /// Open the database at the configured path and run migrations.
    pub async fn open(config: &StorageConfig) -> Result<Self, RecadoError> {
        let db = Database::open(&config.database_path).await?;
        Ok(Self { db })
    }

    /// Wrap an already-open database. Used by tests.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Checkpoint and close the underlying database.
    pub async fn close(&self) -> Result<(), RecadoError> {
        self.db.close().await
    }
}

#[async_trait]
impl InteractionStore for SqliteInteractionStore {
    async fn insert(&self, interaction: &Interaction) -> Result<bool, RecadoError> {
        queries::interactions::insert(&self.db, interaction).await
    }

    async fn get(&self, id: &str) -> Result<Option<Interaction>, RecadoError> {
        queries::interactions::get(&self.db, id).await
    }

    async fn find_by_provider_message_id(
        &self,
        provider_message_id: &str,
    ) -> Result<Option<Interaction>, RecadoError> {
        queries::interactions::find_by_provider_message_id(&self.db, provider_message_id).await
    }

    async fn has_open_follow_up(
        &self,
        request_id: &str,
        direction: Direction,
    ) -> Result<bool, RecadoError> {
        queries::interactions::has_open_follow_up(&self.db, request_id, direction).await
    }

    async fn find_most_recent(
        &self,
        request_id: &str,
    ) -> Result<Option<Interaction>, RecadoError> {
        queries::interactions::find_most_recent(&self.db, request_id).await
    }

    async fn find_most_recent_for_recipient(
        &self,
        recipient: &str,
    ) -> Result<Option<Interaction>, RecadoError> {
        queries::interactions::find_most_recent_for_recipient(&self.db, recipient).await
    }

    async fn find_due(&self, now: &str, limit: i64) -> Result<Vec<Interaction>, RecadoError> {
        queries::interactions::find_due(&self.db, now, limit).await
    }

    async fn claim(&self, id: &str) -> Result<bool, RecadoError> {
        queries::interactions::claim(&self.db, id, &now_ts()).await
    }

    async fn release_claim(&self, id: &str) -> Result<(), RecadoError> {
        queries::interactions::release_claim(&self.db, id, &now_ts()).await
    }

    async fn mark_sent(
        &self,
        id: &str,
        provider_message_id: &str,
        recipient: &str,
        sent_at: &str,
    ) -> Result<(), RecadoError> {
        queries::interactions::mark_sent(&self.db, id, provider_message_id, recipient, sent_at)
            .await
    }

    async fn mark_failed(&self, id: &str, reason: &str) -> Result<(), RecadoError> {
        queries::interactions::mark_failed(&self.db, id, reason, &now_ts()).await
    }

    async fn apply_status(
        &self,
        id: &str,
        status: InteractionStatus,
        raw_status: &str,
        at: &str,
    ) -> Result<(), RecadoError> {
        queries::interactions::apply_status(&self.db, id, status, raw_status, at).await
    }

    async fn mark_responded(&self, id: &str, metadata: &str) -> Result<(), RecadoError> {
        queries::interactions::mark_responded(&self.db, id, metadata, &now_ts()).await
    }

    async fn find_stuck_sent(
        &self,
        cutoff: &str,
        limit: i64,
    ) -> Result<Vec<Interaction>, RecadoError> {
        queries::interactions::find_stuck_sent(&self.db, cutoff, limit).await
    }

    async fn ledger_seen(&self, provider_message_id: &str) -> Result<bool, RecadoError> {
        queries::ledger::seen(&self.db, provider_message_id).await
    }

    async fn ledger_record(
        &self,
        provider_message_id: &str,
        kind: LedgerKind,
    ) -> Result<(), RecadoError> {
        queries::ledger::record(&self.db, provider_message_id, kind, &now_ts()).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_config(path: &str) -> StorageConfig {
        StorageConfig {
            database_path: path.to_string(),
        }
    }

    fn make_interaction(id: &str, request_id: &str) -> Interaction {
        let now = now_ts();
        Interaction {
            id: id.to_string(),
            request_id: request_id.to_string(),
            direction: Direction::ToClient,
            status: InteractionStatus::Pending,
            message_template: "follow_up_3_days".to_string(),
            message_content: "Hola!".to_string(),
            recipient: None,
            scheduled_for: now.clone(),
            sent_at: None,
            delivered_at: None,
            provider_message_id: None,
            provider_status: None,
            metadata: None,
            created_at: now.clone(),
            updated_at: now,
        }
    }

    #[tokio::test]
    async fn full_dispatch_lifecycle_through_the_port() {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("store.db");
        let store = SqliteInteractionStore::open(&make_config(db_path.to_str().unwrap()))
            .await
            .unwrap();

        assert!(store.insert(&make_interaction("i-1", "req-1")).await.unwrap());
        assert!(
            store
                .has_open_follow_up("req-1", Direction::ToClient)
                .await
                .unwrap()
        );

        let due = store.find_due(&now_ts(), 10).await.unwrap();
        assert_eq!(due.len(), 1);

        assert!(store.claim("i-1").await.unwrap());
        store
            .mark_sent("i-1", "SM1", "+5491122334455", &now_ts())
            .await
            .unwrap();

        let sent = store
            .find_by_provider_message_id("SM1")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(sent.status, InteractionStatus::Sent);

        store.ledger_record("SM-in-1", LedgerKind::Inbound).await.unwrap();
        assert!(store.ledger_seen("SM-in-1").await.unwrap());

        store.close().await.unwrap();
    }
}
