// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Recado messaging pipeline.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};

/// Top-level Recado configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable
/// overrides. All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct RecadoConfig {
    /// Service-wide settings.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// WhatsApp gateway (Twilio) settings.
    #[serde(default)]
    pub whatsapp: WhatsAppConfig,

    /// Webhook ingestion endpoint settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Follow-up rule engine settings.
    #[serde(default)]
    pub followup: FollowupConfig,

    /// Dispatch worker settings.
    #[serde(default)]
    pub dispatch: DispatchConfig,

    /// Status reconciliation worker settings.
    #[serde(default)]
    pub reconcile: ReconcileConfig,

    /// Marketplace backend collaborator settings.
    #[serde(default)]
    pub marketplace: MarketplaceConfig,
}

/// Service-wide configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|d| d.join("recado/recado.db").to_string_lossy().into_owned())
        .unwrap_or_else(|| "recado.db".to_string())
}

/// WhatsApp gateway (Twilio) configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WhatsAppConfig {
    /// Twilio account SID.
    #[serde(default)]
    pub account_sid: Option<String>,

    /// Twilio auth token.
    #[serde(default)]
    pub auth_token: Option<String>,

    /// Sender phone number in E.164 form (without the `whatsapp:` prefix).
    #[serde(default)]
    pub from_number: Option<String>,

    /// API base URL. Overridable for tests against a local mock server.
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Per-send timeout in seconds.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,
}

impl Default for WhatsAppConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            from_number: None,
            api_base_url: default_api_base_url(),
            send_timeout_secs: default_send_timeout_secs(),
        }
    }
}

fn default_api_base_url() -> String {
    "https://api.twilio.com".to_string()
}

fn default_send_timeout_secs() -> u64 {
    15
}

/// Webhook ingestion endpoint configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Host address to bind.
    #[serde(default = "default_webhook_host")]
    pub host: String,

    /// Port to bind.
    #[serde(default = "default_webhook_port")]
    pub port: u16,

    /// Public URL of the webhook endpoint as registered with the provider.
    /// Signatures are computed over this URL plus the raw request body.
    #[serde(default)]
    pub public_url: Option<String>,

    /// Shared secret for signature validation. When unset, validation is
    /// skipped with a loud warning -- non-production mode only.
    #[serde(default)]
    pub signature_secret: Option<String>,

    /// Maximum requests per client key per window.
    #[serde(default = "default_rate_limit_max_requests")]
    pub rate_limit_max_requests: u32,

    /// Rate-limit window length in seconds.
    #[serde(default = "default_rate_limit_window_secs")]
    pub rate_limit_window_secs: u64,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            host: default_webhook_host(),
            port: default_webhook_port(),
            public_url: None,
            signature_secret: None,
            rate_limit_max_requests: default_rate_limit_max_requests(),
            rate_limit_window_secs: default_rate_limit_window_secs(),
        }
    }
}

fn default_webhook_host() -> String {
    "127.0.0.1".to_string()
}

fn default_webhook_port() -> u16 {
    8090
}

fn default_rate_limit_max_requests() -> u32 {
    100
}

fn default_rate_limit_window_secs() -> u64 {
    60
}

/// One follow-up rule: requests sitting in `request_status` for
/// `elapsed_days` get a message rendered from `template`.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FollowUpRuleConfig {
    pub request_status: String,
    pub elapsed_days: i64,
    pub template: String,
    /// `to_provider` or `to_client`. Parsed and validated by the engine.
    pub direction: String,
}

/// Follow-up rule engine configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct FollowupConfig {
    /// Feature flag: when disabled, scheduler ticks are no-ops.
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Tick interval in seconds.
    #[serde(default = "default_followup_interval_secs")]
    pub interval_secs: u64,

    /// Minimum hours since the last interaction on a request before a new
    /// follow-up may be created.
    #[serde(default = "default_quiet_period_hours")]
    pub quiet_period_hours: i64,

    /// The rule table, evaluated in order on each tick.
    #[serde(default = "default_rules")]
    pub rules: Vec<FollowUpRuleConfig>,
}

impl Default for FollowupConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            interval_secs: default_followup_interval_secs(),
            quiet_period_hours: default_quiet_period_hours(),
            rules: default_rules(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_followup_interval_secs() -> u64 {
    3600
}

fn default_quiet_period_hours() -> i64 {
    24
}

fn default_rules() -> Vec<FollowUpRuleConfig> {
    vec![
        FollowUpRuleConfig {
            request_status: "accepted".to_string(),
            elapsed_days: 3,
            template: "follow_up_3_days".to_string(),
            direction: "to_client".to_string(),
        },
        FollowUpRuleConfig {
            request_status: "accepted".to_string(),
            elapsed_days: 7,
            template: "follow_up_7_days".to_string(),
            direction: "to_client".to_string(),
        },
    ]
}

/// Dispatch worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct DispatchConfig {
    /// Tick interval in seconds.
    #[serde(default = "default_dispatch_interval_secs")]
    pub interval_secs: u64,

    /// Maximum due interactions processed per tick.
    #[serde(default = "default_dispatch_batch_size")]
    pub batch_size: i64,
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_dispatch_interval_secs(),
            batch_size: default_dispatch_batch_size(),
        }
    }
}

fn default_dispatch_interval_secs() -> u64 {
    60
}

fn default_dispatch_batch_size() -> i64 {
    25
}

/// Status reconciliation worker configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ReconcileConfig {
    /// Tick interval in seconds.
    #[serde(default = "default_reconcile_interval_secs")]
    pub interval_secs: u64,

    /// An interaction still `sent` after this many seconds is considered
    /// stuck and re-queried against the provider.
    #[serde(default = "default_stuck_after_secs")]
    pub stuck_after_secs: i64,

    /// Maximum stuck interactions re-queried per tick.
    #[serde(default = "default_reconcile_batch_size")]
    pub batch_size: i64,
}

impl Default for ReconcileConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_reconcile_interval_secs(),
            stuck_after_secs: default_stuck_after_secs(),
            batch_size: default_reconcile_batch_size(),
        }
    }
}

fn default_reconcile_interval_secs() -> u64 {
    900
}

fn default_stuck_after_secs() -> i64 {
    3600
}

fn default_reconcile_batch_size() -> i64 {
    50
}

/// Marketplace backend collaborator configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct MarketplaceConfig {
    /// Base URL of the marketplace backend's internal API.
    #[serde(default = "default_marketplace_base_url")]
    pub base_url: String,

    /// Bearer token for the internal API.
    #[serde(default)]
    pub api_token: Option<String>,
}

impl Default for MarketplaceConfig {
    fn default() -> Self {
        Self {
            base_url: default_marketplace_base_url(),
            api_token: None,
        }
    }
}

fn default_marketplace_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}
