// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Status reconciliation worker.
//!
//! Safety net for interactions whose terminal status callback never arrived
//! (provider outage, dropped webhook). Re-queries the provider and feeds the
//! result through the same `apply_status_update` path used by webhooks, so
//! there is a single code path for status transitions regardless of source.

use std::sync::Arc;

use chrono::{Duration, Utc};
use recado_config::model::ReconcileConfig;
use recado_core::time::format_ts;
use recado_core::types::StatusOutcome;
use recado_core::{InteractionStore, MessagingGateway};
use tracing::{debug, error, info, warn};

use crate::lifecycle::InteractionLifecycle;

/// Counters for one reconciliation tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ReconcileTickSummary {
    pub applied: usize,
    pub unchanged: usize,
    pub failed: usize,
}

/// Periodic job re-querying the provider for stuck interactions.
pub struct ReconcileWorker {
    store: Arc<dyn InteractionStore>,
    gateway: Arc<dyn MessagingGateway>,
    lifecycle: Arc<InteractionLifecycle>,
    stuck_after_secs: i64,
    batch_size: i64,
}

impl ReconcileWorker {
    pub fn new(
        config: &ReconcileConfig,
        store: Arc<dyn InteractionStore>,
        gateway: Arc<dyn MessagingGateway>,
        lifecycle: Arc<InteractionLifecycle>,
    ) -> Self {
        Self {
            store,
            gateway,
            lifecycle,
            stuck_after_secs: config.stuck_after_secs,
            batch_size: config.batch_size,
        }
    }

    /// Run one reconciliation tick. Per-item failures are logged and
    /// counted; the tick itself never errors.
    pub async fn tick(&self) -> ReconcileTickSummary {
        let mut summary = ReconcileTickSummary::default();
        let cutoff = format_ts(Utc::now() - Duration::seconds(self.stuck_after_secs));

        let stuck = match self.store.find_stuck_sent(&cutoff, self.batch_size).await {
            Ok(stuck) => stuck,
            Err(e) => {
                error!(error = %e, "failed to fetch stuck interactions");
                return summary;
            }
        };
        if stuck.is_empty() {
            return summary;
        }
        debug!(count = stuck.len(), "reconciling stuck interactions");

        for interaction in &stuck {
            // The query only returns rows with a provider message id.
            let Some(pmid) = interaction.provider_message_id.as_deref() else {
                continue;
            };
            match self.gateway.fetch_status(pmid).await {
                Ok(raw_status) => {
                    match self.lifecycle.apply_status_update(pmid, &raw_status).await {
                        Ok(StatusOutcome::Applied { status }) => {
                            info!(
                                interaction_id = interaction.id.as_str(),
                                provider_message_id = pmid,
                                status = %status,
                                "reconciled stuck interaction"
                            );
                            summary.applied += 1;
                        }
                        Ok(_) => summary.unchanged += 1,
                        Err(e) => {
                            warn!(
                                provider_message_id = pmid,
                                error = %e,
                                "reconciliation status apply failed"
                            );
                            summary.failed += 1;
                        }
                    }
                }
                Err(e) => {
                    warn!(
                        provider_message_id = pmid,
                        error = %e,
                        "provider status fetch failed"
                    );
                    summary.failed += 1;
                }
            }
        }

        info!(
            applied = summary.applied,
            unchanged = summary.unchanged,
            failed = summary.failed,
            "reconciliation tick complete"
        );
        summary
    }
}
