// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP clients for the marketplace backend's internal API, implementing
//! the narrow collaborator ports the pipeline consumes.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use recado_config::model::MarketplaceConfig;
use recado_core::types::{Direction, RequestTransition, StaleRequest};
use recado_core::{RecadoError, RecipientDirectory, RequestDirectory};

/// Client for the marketplace backend. One instance serves both the
/// recipient-resolution and request-directory ports.
pub struct HttpMarketplaceClient {
    http: reqwest::Client,
    base_url: String,
    api_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RequestRow {
    id: String,
    status: String,
    updated_at: String,
}

#[derive(Debug, Deserialize)]
struct RecipientRow {
    phone: Option<String>,
    verified: bool,
}

fn collaborator_err(message: impl Into<String>, e: reqwest::Error) -> RecadoError {
    RecadoError::Collaborator {
        message: format!("{}: {e}", message.into()),
        source: Some(Box::new(e)),
    }
}

impl HttpMarketplaceClient {
    pub fn new(config: &MarketplaceConfig) -> Result<Self, RecadoError> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()
            .map_err(|e| RecadoError::Internal(format!("http client build failed: {e}")))?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_token: config.api_token.clone(),
        })
    }

    fn with_auth(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.api_token {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }
}

#[async_trait]
impl RequestDirectory for HttpMarketplaceClient {
    async fn find_stale(
        &self,
        status: &str,
        cutoff: &str,
    ) -> Result<Vec<StaleRequest>, RecadoError> {
        let url = format!("{}/internal/requests", self.base_url);
        let response = self
            .with_auth(self.http.get(&url))
            .query(&[("status", status), ("updated_before", cutoff)])
            .send()
            .await
            .map_err(|e| collaborator_err("stale request lookup failed", e))?
            .error_for_status()
            .map_err(|e| collaborator_err("stale request lookup rejected", e))?;

        let rows: Vec<RequestRow> = response
            .json()
            .await
            .map_err(|e| collaborator_err("malformed request listing", e))?;
        debug!(status, count = rows.len(), "stale requests fetched");
        Ok(rows
            .into_iter()
            .map(|r| StaleRequest {
                id: r.id,
                status: r.status,
                updated_at: r.updated_at,
            })
            .collect())
    }

    async fn apply_transition(
        &self,
        request_id: &str,
        transition: RequestTransition,
    ) -> Result<(), RecadoError> {
        let url = format!("{}/internal/requests/{request_id}/transitions", self.base_url);
        self.with_auth(self.http.post(&url))
            .json(&serde_json::json!({ "action": transition }))
            .send()
            .await
            .map_err(|e| collaborator_err("transition request failed", e))?
            .error_for_status()
            .map_err(|e| collaborator_err("transition rejected", e))?;
        Ok(())
    }
}

#[async_trait]
impl RecipientDirectory for HttpMarketplaceClient {
    async fn verified_phone(
        &self,
        request_id: &str,
        direction: Direction,
    ) -> Result<Option<String>, RecadoError> {
        let url = format!("{}/internal/requests/{request_id}/recipient", self.base_url);
        let response = self
            .with_auth(self.http.get(&url))
            .query(&[("direction", direction.to_string())])
            .send()
            .await
            .map_err(|e| collaborator_err("recipient lookup failed", e))?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = response
            .error_for_status()
            .map_err(|e| collaborator_err("recipient lookup rejected", e))?;

        let row: RecipientRow = response
            .json()
            .await
            .map_err(|e| collaborator_err("malformed recipient response", e))?;
        Ok(match row {
            RecipientRow {
                phone: Some(phone),
                verified: true,
            } => Some(phone),
            _ => None,
        })
    }
}
