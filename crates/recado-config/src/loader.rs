// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./recado.toml` > `~/.config/recado/recado.toml` >
//! `/etc/recado/recado.toml` with environment variable overrides via the
//! `RECADO_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::Path;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};

use crate::model::RecadoConfig;

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/recado/recado.toml` (system-wide)
/// 3. `~/.config/recado/recado.toml` (user XDG config)
/// 4. `./recado.toml` (local directory)
/// 5. `RECADO_*` environment variables
pub fn load_config() -> Result<RecadoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RecadoConfig::default()))
        .merge(Toml::file("/etc/recado/recado.toml"))
        .merge(Toml::file(
            dirs::config_dir()
                .map(|d| d.join("recado/recado.toml"))
                .unwrap_or_default(),
        ))
        .merge(Toml::file("recado.toml"))
        .merge(env_provider())
        .extract()
}

/// Load configuration from a TOML string only (no XDG lookup).
///
/// Used for testing and explicit config specification.
pub fn load_config_from_str(toml_content: &str) -> Result<RecadoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RecadoConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<RecadoConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(RecadoConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Create the environment variable provider using explicit `map()` for
/// section-to-dot mapping.
///
/// Uses `Env::map()` NOT `Env::split("_")` to avoid ambiguity with
/// underscore-containing key names: `RECADO_WHATSAPP_AUTH_TOKEN` must map to
/// `whatsapp.auth_token`, not `whatsapp.auth.token`.
fn env_provider() -> Env {
    Env::prefixed("RECADO_").map(|key| {
        let key_str = key.as_str();
        let mapped = key_str
            .replacen("service_", "service.", 1)
            .replacen("storage_", "storage.", 1)
            .replacen("whatsapp_", "whatsapp.", 1)
            .replacen("webhook_", "webhook.", 1)
            .replacen("followup_", "followup.", 1)
            .replacen("dispatch_", "dispatch.", 1)
            .replacen("reconcile_", "reconcile.", 1)
            .replacen("marketplace_", "marketplace.", 1);
        mapped.into()
    })
}
