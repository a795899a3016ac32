// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Twilio WhatsApp implementation of the MessagingGateway port.
//!
//! Sends through the Messages API with basic auth and form encoding, and
//! re-queries message status for the reconciliation worker. Twilio error
//! codes for unreachable or invalid numbers map to the permanent
//! [`RecadoError::InvalidRecipient`]; everything else is transient.

use async_trait::async_trait;
use serde::Deserialize;
use tracing::debug;

use recado_config::model::WhatsAppConfig;
use recado_core::{MessagingGateway, RecadoError};

/// Twilio error codes that mean the recipient can never be reached:
/// invalid number, not mobile-capable, unsubscribed, or not WhatsApp-enabled.
const PERMANENT_ERROR_CODES: &[i64] = &[21211, 21408, 21610, 21614, 63003];

/// Twilio WhatsApp gateway.
pub struct TwilioWhatsAppGateway {
    http: reqwest::Client,
    account_sid: String,
    auth_token: String,
    from_number: String,
    api_base_url: String,
}

#[derive(Debug, Deserialize)]
struct MessageResource {
    sid: String,
    status: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct TwilioErrorBody {
    code: Option<i64>,
    message: Option<String>,
}

impl TwilioWhatsAppGateway {
    /// Build the gateway from configuration. Fails fast on missing
    /// credentials.
    pub fn new(config: &WhatsAppConfig) -> Result<Self, RecadoError> {
        let account_sid = config
            .account_sid
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RecadoError::Config("whatsapp.account_sid is required".to_string()))?;
        let auth_token = config
            .auth_token
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RecadoError::Config("whatsapp.auth_token is required".to_string()))?;
        let from_number = config
            .from_number
            .as_deref()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .ok_or_else(|| RecadoError::Config("whatsapp.from_number is required".to_string()))?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(config.send_timeout_secs))
            .build()
            .map_err(|e| RecadoError::Internal(format!("http client build failed: {e}")))?;

        Ok(Self {
            http,
            account_sid: account_sid.to_string(),
            auth_token: auth_token.to_string(),
            from_number: from_number.to_string(),
            api_base_url: config.api_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn messages_url(&self) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages.json",
            self.api_base_url, self.account_sid
        )
    }

    fn message_url(&self, sid: &str) -> String {
        format!(
            "{}/2010-04-01/Accounts/{}/Messages/{}.json",
            self.api_base_url, self.account_sid, sid
        )
    }

    /// Prefix an E.164 address with the WhatsApp channel marker if missing.
    fn whatsapp_addr(number: &str) -> String {
        if number.starts_with("whatsapp:") {
            number.to_string()
        } else {
            format!("whatsapp:{number}")
        }
    }

    async fn error_from_response(response: reqwest::Response) -> RecadoError {
        let status = response.status();
        let body: TwilioErrorBody = response.json().await.unwrap_or_default();
        let message = body
            .message
            .unwrap_or_else(|| format!("provider returned {status}"));

        if status.is_client_error()
            && body.code.is_some_and(|c| PERMANENT_ERROR_CODES.contains(&c))
        {
            RecadoError::InvalidRecipient(message)
        } else {
            RecadoError::Gateway {
                message,
                source: None,
            }
        }
    }
}

#[async_trait]
impl MessagingGateway for TwilioWhatsAppGateway {
    async fn send(&self, recipient: &str, body: &str) -> Result<String, RecadoError> {
        let response = self
            .http
            .post(self.messages_url())
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .form(&[
                ("To", Self::whatsapp_addr(recipient)),
                ("From", Self::whatsapp_addr(&self.from_number)),
                ("Body", body.to_string()),
            ])
            .send()
            .await
            .map_err(|e| RecadoError::Gateway {
                message: format!("send request failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let resource: MessageResource =
            response.json().await.map_err(|e| RecadoError::Gateway {
                message: format!("malformed provider response: {e}"),
                source: Some(Box::new(e)),
            })?;
        debug!(
            sid = resource.sid.as_str(),
            status = resource.status.as_str(),
            "message accepted by provider"
        );
        Ok(resource.sid)
    }

    async fn fetch_status(&self, provider_message_id: &str) -> Result<String, RecadoError> {
        let response = self
            .http
            .get(self.message_url(provider_message_id))
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .send()
            .await
            .map_err(|e| RecadoError::Gateway {
                message: format!("status fetch failed: {e}"),
                source: Some(Box::new(e)),
            })?;

        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(RecadoError::NotFound {
                what: "provider message",
                id: provider_message_id.to_string(),
            });
        }
        if !response.status().is_success() {
            return Err(Self::error_from_response(response).await);
        }

        let resource: MessageResource =
            response.json().await.map_err(|e| RecadoError::Gateway {
                message: format!("malformed provider response: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(resource.status)
    }
}
