// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Follow-up rule engine.
//!
//! Translates "a request has sat in status X for N days with no recent
//! contact" into a scheduled interaction. Runs as a periodic job; every
//! failure is contained at the candidate or rule boundary so a tick can
//! never throw.

use std::str::FromStr;
use std::sync::Arc;

use chrono::{Duration, Utc};
use recado_config::model::{FollowUpRuleConfig, FollowupConfig};
use recado_core::time::format_ts;
use recado_core::types::{Direction, FollowUpOutcome, StaleRequest};
use recado_core::{InteractionStore, RecadoError, RecipientDirectory, RequestDirectory};
use tracing::{debug, error, info, warn};

use crate::lifecycle::InteractionLifecycle;

/// A validated follow-up rule.
#[derive(Debug, Clone)]
pub struct FollowUpRule {
    pub request_status: String,
    pub elapsed_days: i64,
    pub template: String,
    pub direction: Direction,
}

impl FollowUpRule {
    /// Parse and validate a configured rule. Fails fast at startup on an
    /// unknown direction or a non-positive day count.
    pub fn from_config(config: &FollowUpRuleConfig) -> Result<Self, RecadoError> {
        let direction = Direction::from_str(&config.direction).map_err(|_| {
            RecadoError::Config(format!(
                "rule '{}': unknown direction '{}'",
                config.template, config.direction
            ))
        })?;
        if config.elapsed_days <= 0 {
            return Err(RecadoError::Config(format!(
                "rule '{}': elapsed_days must be positive, got {}",
                config.template, config.elapsed_days
            )));
        }
        Ok(Self {
            request_status: config.request_status.clone(),
            elapsed_days: config.elapsed_days,
            template: config.template.clone(),
            direction,
        })
    }
}

/// Render the message body for a template name.
///
/// The marketplace operates in Spanish; replies are classified by the
/// keyword sets in [`crate::classifier`].
pub fn render_template(template: &str) -> String {
    match template {
        "follow_up_3_days" => {
            "¡Hola! ¿Pudiste coordinar el servicio que solicitaste? \
             Respondé SI para confirmar o NO para cancelar la solicitud."
        }
        "follow_up_7_days" => {
            "¡Hola! Hace una semana solicitaste un servicio y todavía figura pendiente. \
             ¿Seguís interesado? Respondé SI para confirmar o NO para cancelar."
        }
        _ => {
            "¡Hola! Tenés una solicitud de servicio pendiente. \
             Respondé SI para confirmar o NO para cancelar."
        }
    }
    .to_string()
}

/// Counters for one scheduler tick.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct FollowUpTickSummary {
    pub created: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Periodic job that evaluates the rule table and creates follow-ups.
pub struct FollowUpEngine {
    store: Arc<dyn InteractionStore>,
    requests: Arc<dyn RequestDirectory>,
    recipients: Arc<dyn RecipientDirectory>,
    lifecycle: Arc<InteractionLifecycle>,
    rules: Vec<FollowUpRule>,
    enabled: bool,
    quiet_period_hours: i64,
}

enum CandidateOutcome {
    Created,
    Skipped(&'static str),
}

impl FollowUpEngine {
    pub fn new(
        config: &FollowupConfig,
        store: Arc<dyn InteractionStore>,
        requests: Arc<dyn RequestDirectory>,
        recipients: Arc<dyn RecipientDirectory>,
        lifecycle: Arc<InteractionLifecycle>,
    ) -> Result<Self, RecadoError> {
        let rules = config
            .rules
            .iter()
            .map(FollowUpRule::from_config)
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self {
            store,
            requests,
            recipients,
            lifecycle,
            rules,
            enabled: config.enabled,
            quiet_period_hours: config.quiet_period_hours,
        })
    }

    /// Run one scheduler tick. Never returns an error: rule and candidate
    /// failures are logged and counted.
    pub async fn tick(&self) -> FollowUpTickSummary {
        let mut summary = FollowUpTickSummary::default();
        if !self.enabled {
            debug!("follow-up engine disabled, tick is a no-op");
            return summary;
        }

        for rule in &self.rules {
            match self.run_rule(rule).await {
                Ok(rule_summary) => {
                    summary.created += rule_summary.created;
                    summary.skipped += rule_summary.skipped;
                    summary.failed += rule_summary.failed;
                }
                Err(e) => {
                    error!(template = rule.template.as_str(), error = %e, "rule evaluation failed");
                    summary.failed += 1;
                }
            }
        }

        info!(
            created = summary.created,
            skipped = summary.skipped,
            failed = summary.failed,
            "follow-up tick complete"
        );
        summary
    }

    async fn run_rule(&self, rule: &FollowUpRule) -> Result<FollowUpTickSummary, RecadoError> {
        let mut summary = FollowUpTickSummary::default();
        let cutoff = format_ts(Utc::now() - Duration::days(rule.elapsed_days));
        let candidates = self
            .requests
            .find_stale(&rule.request_status, &cutoff)
            .await?;
        debug!(
            template = rule.template.as_str(),
            candidates = candidates.len(),
            "rule candidates fetched"
        );

        for request in &candidates {
            match self.evaluate_candidate(rule, request).await {
                Ok(CandidateOutcome::Created) => summary.created += 1,
                Ok(CandidateOutcome::Skipped(reason)) => {
                    debug!(
                        request_id = request.id.as_str(),
                        template = rule.template.as_str(),
                        reason,
                        "candidate skipped"
                    );
                    summary.skipped += 1;
                }
                Err(e) => {
                    warn!(
                        request_id = request.id.as_str(),
                        template = rule.template.as_str(),
                        error = %e,
                        "candidate evaluation failed"
                    );
                    summary.failed += 1;
                }
            }
        }
        Ok(summary)
    }

    /// Apply the skip checks in order, short-circuiting on the first reason.
    async fn evaluate_candidate(
        &self,
        rule: &FollowUpRule,
        request: &StaleRequest,
    ) -> Result<CandidateOutcome, RecadoError> {
        if self
            .store
            .has_open_follow_up(&request.id, rule.direction)
            .await?
        {
            return Ok(CandidateOutcome::Skipped("follow-up already in flight"));
        }

        if let Some(recent) = self.store.find_most_recent(&request.id).await? {
            let quiet_cutoff = format_ts(Utc::now() - Duration::hours(self.quiet_period_hours));
            if recent.created_at > quiet_cutoff {
                return Ok(CandidateOutcome::Skipped("contacted within quiet period"));
            }
        }

        if self
            .recipients
            .verified_phone(&request.id, rule.direction)
            .await?
            .is_none()
        {
            return Ok(CandidateOutcome::Skipped("no verified phone"));
        }

        let now = format_ts(Utc::now());
        let metadata = serde_json::json!({
            "rule": rule.template,
            "elapsed_days": rule.elapsed_days,
            "request_status": rule.request_status,
        });
        let outcome = self
            .lifecycle
            .create_follow_up(
                &request.id,
                rule.direction,
                &rule.template,
                &render_template(&rule.template),
                &now,
                metadata,
            )
            .await?;

        match outcome {
            FollowUpOutcome::Created(_) => Ok(CandidateOutcome::Created),
            FollowUpOutcome::AlreadyOpen => {
                Ok(CandidateOutcome::Skipped("follow-up already in flight"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use recado_core::time::now_ts;
    use recado_core::types::InteractionStatus;
    use recado_test_utils::{temp_store, MockRecipientDirectory, MockRequestDirectory};

    use crate::response::ResponseHandler;

    struct Fixture {
        engine: FollowUpEngine,
        store: Arc<dyn InteractionStore>,
        requests: Arc<MockRequestDirectory>,
        recipients: Arc<MockRecipientDirectory>,
        _dir: tempfile::TempDir,
    }

    async fn setup(config: FollowupConfig) -> Fixture {
        let (store, dir) = temp_store().await;
        let store: Arc<dyn InteractionStore> = Arc::new(store);
        let requests = Arc::new(MockRequestDirectory::new());
        let recipients = Arc::new(MockRecipientDirectory::new());
        let responder = Arc::new(ResponseHandler::new(requests.clone()));
        let lifecycle = Arc::new(InteractionLifecycle::new(store.clone(), responder));
        let engine = FollowUpEngine::new(
            &config,
            store.clone(),
            requests.clone(),
            recipients.clone(),
            lifecycle,
        )
        .unwrap();
        Fixture {
            engine,
            store,
            requests,
            recipients,
            _dir: dir,
        }
    }

    fn days_ago(days: i64) -> String {
        format_ts(Utc::now() - Duration::days(days))
    }

    fn hours_ago(hours: i64) -> String {
        format_ts(Utc::now() - Duration::hours(hours))
    }

    #[tokio::test]
    async fn stale_accepted_request_gets_a_three_day_follow_up() {
        let f = setup(FollowupConfig::default()).await;
        f.requests.add_request("req-1", "accepted", &days_ago(4)).await;
        f.recipients.set_phone("req-1", "+5491122334455").await;

        let summary = f.engine.tick().await;
        assert_eq!(summary.created, 1);
        assert_eq!(summary.failed, 0);

        let i = f.store.find_most_recent("req-1").await.unwrap().unwrap();
        assert_eq!(i.status, InteractionStatus::Pending);
        assert_eq!(i.message_template, "follow_up_3_days");
        assert_eq!(i.direction, Direction::ToClient);
        assert!(i.scheduled_for <= now_ts());
        let meta: serde_json::Value = serde_json::from_str(i.metadata.as_deref().unwrap()).unwrap();
        assert_eq!(meta["elapsed_days"], 3);
    }

    #[tokio::test]
    async fn repeated_ticks_never_duplicate_follow_ups() {
        let f = setup(FollowupConfig::default()).await;
        f.requests.add_request("req-1", "accepted", &days_ago(8)).await;
        f.recipients.set_phone("req-1", "+5491122334455").await;

        // Eight days stale matches both rules, across three ticks. Only one
        // interaction may ever be in flight.
        assert_eq!(f.engine.tick().await.created, 1);
        for _ in 0..2 {
            let summary = f.engine.tick().await;
            assert_eq!(summary.created, 0);
        }
    }

    #[tokio::test]
    async fn recent_contact_suppresses_the_follow_up() {
        let f = setup(FollowupConfig::default()).await;
        f.requests.add_request("req-1", "accepted", &days_ago(4)).await;
        f.recipients.set_phone("req-1", "+5491122334455").await;

        // A responded interaction from 12 hours ago: not "open", but recent.
        let prior = recado_core::types::Interaction {
            id: "i-prior".to_string(),
            request_id: "req-1".to_string(),
            direction: Direction::ToClient,
            status: InteractionStatus::Responded,
            message_template: "follow_up_3_days".to_string(),
            message_content: "Hola!".to_string(),
            recipient: Some("+5491122334455".to_string()),
            scheduled_for: hours_ago(12),
            sent_at: Some(hours_ago(12)),
            delivered_at: None,
            provider_message_id: Some("SM-prior".to_string()),
            provider_status: None,
            metadata: None,
            created_at: hours_ago(12),
            updated_at: hours_ago(12),
        };
        f.store.insert(&prior).await.unwrap();

        let summary = f.engine.tick().await;
        assert_eq!(summary.created, 0);
        assert!(summary.skipped >= 1);
    }

    #[tokio::test]
    async fn unverified_recipient_is_skipped() {
        let f = setup(FollowupConfig::default()).await;
        f.requests.add_request("req-1", "accepted", &days_ago(4)).await;
        // No phone registered.

        let summary = f.engine.tick().await;
        assert_eq!(summary.created, 0);
        assert!(summary.skipped >= 1);
    }

    #[tokio::test]
    async fn disabled_engine_ticks_are_no_ops() {
        let config = FollowupConfig {
            enabled: false,
            ..FollowupConfig::default()
        };
        let f = setup(config).await;
        f.requests.add_request("req-1", "accepted", &days_ago(4)).await;
        f.recipients.set_phone("req-1", "+5491122334455").await;

        assert_eq!(f.engine.tick().await, FollowUpTickSummary::default());
    }

    #[tokio::test]
    async fn fresh_requests_are_not_candidates() {
        let f = setup(FollowupConfig::default()).await;
        f.requests.add_request("req-1", "accepted", &days_ago(1)).await;
        f.recipients.set_phone("req-1", "+5491122334455").await;

        let summary = f.engine.tick().await;
        assert_eq!(summary.created, 0);
        assert_eq!(summary.skipped, 0, "not even fetched as a candidate");
    }

    #[test]
    fn invalid_rule_direction_fails_fast() {
        let config = FollowUpRuleConfig {
            request_status: "accepted".to_string(),
            elapsed_days: 3,
            template: "x".to_string(),
            direction: "sideways".to_string(),
        };
        assert!(matches!(
            FollowUpRule::from_config(&config),
            Err(RecadoError::Config(_))
        ));
    }
}
