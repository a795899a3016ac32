// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dedupe ledger operations.
//!
//! The ledger is the idempotency gate for inbound webhook processing: an
//! entry's existence means the provider message id has already caused its
//! one allowed state transition.

use recado_core::types::LedgerKind;
use recado_core::RecadoError;
use rusqlite::params;

use crate::database::Database;

/// Whether a provider message id is already in the ledger.
pub async fn seen(db: &Database, provider_message_id: &str) -> Result<bool, RecadoError> {
    let pmid = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(SELECT 1 FROM processed_messages WHERE provider_message_id = ?1)",
                params![pmid],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Append a ledger entry. Re-recording an existing id is a no-op.
pub async fn record(
    db: &Database,
    provider_message_id: &str,
    kind: LedgerKind,
    processed_at: &str,
) -> Result<(), RecadoError> {
    let pmid = provider_message_id.to_string();
    let kind = kind.to_string();
    let processed_at = processed_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "INSERT OR IGNORE INTO processed_messages (provider_message_id, kind, processed_at)
                 VALUES (?1, ?2, ?3)",
                params![pmid, kind, processed_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}
