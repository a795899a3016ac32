// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Interaction query operations: creation, dispatch claiming, and status
//! transitions.

use recado_core::types::{Direction, Interaction, InteractionStatus};
use recado_core::RecadoError;
use rusqlite::params;

use crate::database::Database;

const COLUMNS: &str = "id, request_id, direction, status, message_template, message_content, \
     recipient, scheduled_for, sent_at, delivered_at, provider_message_id, provider_status, \
     metadata, created_at, updated_at";

fn conversion_err(
    idx: usize,
    e: impl std::error::Error + Send + Sync + 'static,
) -> rusqlite::Error {
    rusqlite::Error::FromSqlConversionFailure(idx, rusqlite::types::Type::Text, Box::new(e))
}

fn row_to_interaction(row: &rusqlite::Row<'_>) -> Result<Interaction, rusqlite::Error> {
    let direction: String = row.get(2)?;
    let status: String = row.get(3)?;
    Ok(Interaction {
        id: row.get(0)?,
        request_id: row.get(1)?,
        direction: direction
            .parse::<Direction>()
            .map_err(|e| conversion_err(2, e))?,
        status: status
            .parse::<InteractionStatus>()
            .map_err(|e| conversion_err(3, e))?,
        message_template: row.get(4)?,
        message_content: row.get(5)?,
        recipient: row.get(6)?,
        scheduled_for: row.get(7)?,
        sent_at: row.get(8)?,
        delivered_at: row.get(9)?,
        provider_message_id: row.get(10)?,
        provider_status: row.get(11)?,
        metadata: row.get(12)?,
        created_at: row.get(13)?,
        updated_at: row.get(14)?,
    })
}

/// Insert a new interaction.
///
/// Returns `false` when the partial unique index on open follow-ups rejects
/// the row, i.e. another pending/sending/sent interaction already exists for
/// the same `(request_id, direction)`.
pub async fn insert(db: &Database, interaction: &Interaction) -> Result<bool, RecadoError> {
    let i = interaction.clone();
    db.connection()
        .call(move |conn| {
            let result = conn.execute(
                "INSERT INTO interactions (id, request_id, direction, status, message_template, \
                 message_content, recipient, scheduled_for, sent_at, delivered_at, \
                 provider_message_id, provider_status, metadata, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15)",
                params![
                    i.id,
                    i.request_id,
                    i.direction.to_string(),
                    i.status.to_string(),
                    i.message_template,
                    i.message_content,
                    i.recipient,
                    i.scheduled_for,
                    i.sent_at,
                    i.delivered_at,
                    i.provider_message_id,
                    i.provider_status,
                    i.metadata,
                    i.created_at,
                    i.updated_at,
                ],
            );
            match result {
                Ok(_) => Ok(true),
                Err(rusqlite::Error::SqliteFailure(e, _))
                    if e.code == rusqlite::ErrorCode::ConstraintViolation =>
                {
                    Ok(false)
                }
                Err(e) => Err(e),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch a single interaction by id.
pub async fn get(db: &Database, id: &str) -> Result<Option<Interaction>, RecadoError> {
    let id = id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM interactions WHERE id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![id], row_to_interaction)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Fetch the interaction correlated with a provider message id.
pub async fn find_by_provider_message_id(
    db: &Database,
    provider_message_id: &str,
) -> Result<Option<Interaction>, RecadoError> {
    let pmid = provider_message_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM interactions WHERE provider_message_id = ?1"
            ))?;
            let mut rows = stmt.query_map(params![pmid], row_to_interaction)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Whether an open (pending/sending/sent) follow-up exists for the pair.
pub async fn has_open_follow_up(
    db: &Database,
    request_id: &str,
    direction: Direction,
) -> Result<bool, RecadoError> {
    let request_id = request_id.to_string();
    let direction = direction.to_string();
    db.connection()
        .call(move |conn| {
            let exists: bool = conn.query_row(
                "SELECT EXISTS(
                     SELECT 1 FROM interactions
                     WHERE request_id = ?1 AND direction = ?2
                       AND status IN ('pending', 'sending', 'sent'))",
                params![request_id, direction],
                |row| row.get(0),
            )?;
            Ok(exists)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent interaction for a request, by creation time.
pub async fn find_most_recent(
    db: &Database,
    request_id: &str,
) -> Result<Option<Interaction>, RecadoError> {
    let request_id = request_id.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM interactions
                 WHERE request_id = ?1
                 ORDER BY created_at DESC LIMIT 1"
            ))?;
            let mut rows = stmt.query_map(params![request_id], row_to_interaction)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Most recent sent/delivered/read interaction dispatched to a recipient
/// address. Resolves inbound replies back to their request.
pub async fn find_most_recent_for_recipient(
    db: &Database,
    recipient: &str,
) -> Result<Option<Interaction>, RecadoError> {
    let recipient = recipient.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM interactions
                 WHERE recipient = ?1 AND status IN ('sent', 'delivered', 'read')
                 ORDER BY COALESCE(sent_at, created_at) DESC LIMIT 1"
            ))?;
            let mut rows = stmt.query_map(params![recipient], row_to_interaction)?;
            match rows.next() {
                Some(row) => Ok(Some(row?)),
                None => Ok(None),
            }
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Pending interactions due for dispatch, oldest schedule first.
pub async fn find_due(
    db: &Database,
    now: &str,
    limit: i64,
) -> Result<Vec<Interaction>, RecadoError> {
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM interactions
                 WHERE status = 'pending' AND scheduled_for <= ?1
                 ORDER BY scheduled_for ASC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![now, limit], row_to_interaction)?;
            let mut due = Vec::new();
            for row in rows {
                due.push(row?);
            }
            Ok(due)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Conditional dispatch claim: `pending -> sending`.
///
/// Returns `false` when the row was no longer pending (a concurrent worker
/// already claimed it, or a webhook advanced it).
pub async fn claim(db: &Database, id: &str, now: &str) -> Result<bool, RecadoError> {
    let id = id.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            let changed = conn.execute(
                "UPDATE interactions SET status = 'sending', updated_at = ?2
                 WHERE id = ?1 AND status = 'pending'",
                params![id, now],
            )?;
            Ok(changed == 1)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Release a dispatch claim after a transient failure: `sending -> pending`.
pub async fn release_claim(db: &Database, id: &str, now: &str) -> Result<(), RecadoError> {
    let id = id.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE interactions SET status = 'pending', updated_at = ?2
                 WHERE id = ?1 AND status = 'sending'",
                params![id, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a successful send.
pub async fn mark_sent(
    db: &Database,
    id: &str,
    provider_message_id: &str,
    recipient: &str,
    sent_at: &str,
) -> Result<(), RecadoError> {
    let id = id.to_string();
    let pmid = provider_message_id.to_string();
    let recipient = recipient.to_string();
    let sent_at = sent_at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE interactions SET status = 'sent', provider_message_id = ?2,
                 recipient = ?3, sent_at = ?4, updated_at = ?4
                 WHERE id = ?1",
                params![id, pmid, recipient, sent_at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Record a permanent send failure. The reason lands in metadata for audit.
pub async fn mark_failed(
    db: &Database,
    id: &str,
    reason: &str,
    now: &str,
) -> Result<(), RecadoError> {
    let id = id.to_string();
    let reason = reason.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE interactions SET status = 'failed',
                 metadata = json_patch(COALESCE(metadata, '{}'), json_object('failure_reason', ?2)),
                 updated_at = ?3
                 WHERE id = ?1",
                params![id, reason, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Apply a provider-reported status transition.
///
/// `sent_at` and `delivered_at` are each written at most once: a replayed
/// callback cannot move a timestamp.
pub async fn apply_status(
    db: &Database,
    id: &str,
    status: InteractionStatus,
    raw_status: &str,
    at: &str,
) -> Result<(), RecadoError> {
    let id = id.to_string();
    let status = status.to_string();
    let raw_status = raw_status.to_string();
    let at = at.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE interactions SET
                     status = ?2,
                     provider_status = ?3,
                     sent_at = CASE WHEN ?2 = 'sent'
                         THEN COALESCE(sent_at, ?4) ELSE sent_at END,
                     delivered_at = CASE WHEN ?2 IN ('delivered', 'read')
                         THEN COALESCE(delivered_at, ?4) ELSE delivered_at END,
                     updated_at = ?4
                 WHERE id = ?1",
                params![id, status, raw_status, at],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Terminal transition from an inbound reply.
pub async fn mark_responded(
    db: &Database,
    id: &str,
    metadata: &str,
    now: &str,
) -> Result<(), RecadoError> {
    let id = id.to_string();
    let metadata = metadata.to_string();
    let now = now.to_string();
    db.connection()
        .call(move |conn| {
            conn.execute(
                "UPDATE interactions SET status = 'responded', metadata = ?2, updated_at = ?3
                 WHERE id = ?1",
                params![id, metadata, now],
            )?;
            Ok(())
        })
        .await
        .map_err(crate::database::map_tr_err)
}

/// Interactions stuck in `sent` since before `cutoff`, for reconciliation.
pub async fn find_stuck_sent(
    db: &Database,
    cutoff: &str,
    limit: i64,
) -> Result<Vec<Interaction>, RecadoError> {
    let cutoff = cutoff.to_string();
    db.connection()
        .call(move |conn| {
            let mut stmt = conn.prepare(&format!(
                "SELECT {COLUMNS} FROM interactions
                 WHERE status = 'sent' AND provider_message_id IS NOT NULL
                   AND sent_at <= ?1
                 ORDER BY sent_at ASC LIMIT ?2"
            ))?;
            let rows = stmt.query_map(params![cutoff, limit], row_to_interaction)?;
            let mut stuck = Vec::new();
            for row in rows {
                stuck.push(row?);
            }
            Ok(stuck)
        })
        .await
        .map_err(crate::database::map_tr_err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    async fn setup_db() -> (Database, tempfile::TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    fn make_interaction(id: &str, request_id: &str) -> Interaction {
        Interaction {
            id: id.to_string(),
            request_id: request_id.to_string(),
            direction: Direction::ToClient,
            status: InteractionStatus::Pending,
            message_template: "follow_up_3_days".to_string(),
            message_content: "Hola!".to_string(),
            recipient: None,
            scheduled_for: "2026-03-01T10:00:00.000Z".to_string(),
            sent_at: None,
            delivered_at: None,
            provider_message_id: None,
            provider_status: None,
            metadata: None,
            created_at: "2026-03-01T10:00:00.000Z".to_string(),
            updated_at: "2026-03-01T10:00:00.000Z".to_string(),
        }
    }

    #[tokio::test]
    async fn insert_and_get_round_trip() {
        let (db, _dir) = setup_db().await;
        let i = make_interaction("i-1", "req-1");
        assert!(insert(&db, &i).await.unwrap());

        let fetched = get(&db, "i-1").await.unwrap().unwrap();
        assert_eq!(fetched, i);

        assert!(get(&db, "nope").await.unwrap().is_none());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn second_open_follow_up_is_rejected_by_constraint() {
        let (db, _dir) = setup_db().await;
        assert!(insert(&db, &make_interaction("i-1", "req-1")).await.unwrap());
        // Same (request, direction) while the first is still pending.
        assert!(!insert(&db, &make_interaction("i-2", "req-1")).await.unwrap());

        // A different direction is allowed.
        let mut other = make_interaction("i-3", "req-1");
        other.direction = Direction::ToProvider;
        assert!(insert(&db, &other).await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn closed_follow_up_frees_the_slot() {
        let (db, _dir) = setup_db().await;
        assert!(insert(&db, &make_interaction("i-1", "req-1")).await.unwrap());
        mark_failed(&db, "i-1", "invalid recipient", "2026-03-01T11:00:00.000Z")
            .await
            .unwrap();
        // The partial index no longer covers the failed row.
        assert!(insert(&db, &make_interaction("i-2", "req-1")).await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn has_open_follow_up_tracks_status() {
        let (db, _dir) = setup_db().await;
        assert!(
            !has_open_follow_up(&db, "req-1", Direction::ToClient)
                .await
                .unwrap()
        );
        insert(&db, &make_interaction("i-1", "req-1")).await.unwrap();
        assert!(
            has_open_follow_up(&db, "req-1", Direction::ToClient)
                .await
                .unwrap()
        );
        // Delivered is not open.
        apply_status(
            &db,
            "i-1",
            InteractionStatus::Delivered,
            "delivered",
            "2026-03-01T11:00:00.000Z",
        )
        .await
        .unwrap();
        assert!(
            !has_open_follow_up(&db, "req-1", Direction::ToClient)
                .await
                .unwrap()
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn find_due_respects_schedule_and_limit() {
        let (db, _dir) = setup_db().await;
        let mut early = make_interaction("i-1", "req-1");
        early.scheduled_for = "2026-03-01T09:00:00.000Z".to_string();
        let mut late = make_interaction("i-2", "req-2");
        late.scheduled_for = "2026-03-01T12:00:00.000Z".to_string();
        insert(&db, &early).await.unwrap();
        insert(&db, &late).await.unwrap();

        let due = find_due(&db, "2026-03-01T10:00:00.000Z", 10).await.unwrap();
        assert_eq!(due.len(), 1);
        assert_eq!(due[0].id, "i-1");

        let due = find_due(&db, "2026-03-01T13:00:00.000Z", 1).await.unwrap();
        assert_eq!(due.len(), 1, "limit caps the batch");
        assert_eq!(due[0].id, "i-1", "oldest schedule first");
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn claim_is_exclusive() {
        let (db, _dir) = setup_db().await;
        insert(&db, &make_interaction("i-1", "req-1")).await.unwrap();

        assert!(claim(&db, "i-1", "2026-03-01T10:01:00.000Z").await.unwrap());
        // Second claim loses the race.
        assert!(!claim(&db, "i-1", "2026-03-01T10:01:00.000Z").await.unwrap());

        // Released claims can be claimed again.
        release_claim(&db, "i-1", "2026-03-01T10:02:00.000Z")
            .await
            .unwrap();
        assert!(claim(&db, "i-1", "2026-03-01T10:03:00.000Z").await.unwrap());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_sent_records_correlation() {
        let (db, _dir) = setup_db().await;
        insert(&db, &make_interaction("i-1", "req-1")).await.unwrap();
        claim(&db, "i-1", "2026-03-01T10:01:00.000Z").await.unwrap();
        mark_sent(&db, "i-1", "SM123", "+5491122334455", "2026-03-01T10:01:05.000Z")
            .await
            .unwrap();

        let i = find_by_provider_message_id(&db, "SM123")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(i.id, "i-1");
        assert_eq!(i.status, InteractionStatus::Sent);
        assert_eq!(i.recipient.as_deref(), Some("+5491122334455"));
        assert_eq!(i.sent_at.as_deref(), Some("2026-03-01T10:01:05.000Z"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn apply_status_sets_each_timestamp_once() {
        let (db, _dir) = setup_db().await;
        insert(&db, &make_interaction("i-1", "req-1")).await.unwrap();
        claim(&db, "i-1", "t").await.unwrap();
        mark_sent(&db, "i-1", "SM123", "+549111", "2026-03-01T10:01:05.000Z")
            .await
            .unwrap();

        apply_status(
            &db,
            "i-1",
            InteractionStatus::Delivered,
            "delivered",
            "2026-03-01T10:02:00.000Z",
        )
        .await
        .unwrap();
        // A later read receipt must not move delivered_at.
        apply_status(
            &db,
            "i-1",
            InteractionStatus::Read,
            "read",
            "2026-03-01T10:05:00.000Z",
        )
        .await
        .unwrap();

        let i = get(&db, "i-1").await.unwrap().unwrap();
        assert_eq!(i.status, InteractionStatus::Read);
        assert_eq!(i.provider_status.as_deref(), Some("read"));
        assert_eq!(i.delivered_at.as_deref(), Some("2026-03-01T10:02:00.000Z"));
        assert_eq!(i.sent_at.as_deref(), Some("2026-03-01T10:01:05.000Z"));
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn recipient_lookup_finds_latest_sent() {
        let (db, _dir) = setup_db().await;
        for (id, req, sent_at) in [
            ("i-1", "req-1", "2026-03-01T10:00:00.000Z"),
            ("i-2", "req-2", "2026-03-02T10:00:00.000Z"),
        ] {
            insert(&db, &make_interaction(id, req)).await.unwrap();
            claim(&db, id, sent_at).await.unwrap();
            mark_sent(&db, id, &format!("SM-{id}"), "+549111", sent_at)
                .await
                .unwrap();
        }

        let latest = find_most_recent_for_recipient(&db, "+549111")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(latest.id, "i-2");
        assert!(
            find_most_recent_for_recipient(&db, "+549999")
                .await
                .unwrap()
                .is_none()
        );
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn stuck_sent_lookup_uses_cutoff() {
        let (db, _dir) = setup_db().await;
        insert(&db, &make_interaction("i-1", "req-1")).await.unwrap();
        claim(&db, "i-1", "t").await.unwrap();
        mark_sent(&db, "i-1", "SM1", "+549111", "2026-03-01T10:00:00.000Z")
            .await
            .unwrap();

        let stuck = find_stuck_sent(&db, "2026-03-01T11:00:00.000Z", 10)
            .await
            .unwrap();
        assert_eq!(stuck.len(), 1);

        let fresh = find_stuck_sent(&db, "2026-03-01T09:00:00.000Z", 10)
            .await
            .unwrap();
        assert!(fresh.is_empty());
        db.close().await.unwrap();
    }

    #[tokio::test]
    async fn mark_responded_replaces_metadata() {
        let (db, _dir) = setup_db().await;
        insert(&db, &make_interaction("i-1", "req-1")).await.unwrap();
        mark_responded(
            &db,
            "i-1",
            r#"{"classification":{"intent":"confirm","matched":"si"}}"#,
            "2026-03-01T12:00:00.000Z",
        )
        .await
        .unwrap();

        let i = get(&db, "i-1").await.unwrap().unwrap();
        assert_eq!(i.status, InteractionStatus::Responded);
        assert!(i.metadata.unwrap().contains("confirm"));
        db.close().await.unwrap();
    }
}
