// SPDX-FileCopyrightText: 2026 Recado Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature validation.
//!
//! The provider signs each callback with HMAC-SHA256 over the full webhook
//! URL concatenated with the raw request body, hex-encoded into a header.
//! Missing and invalid signatures both reject before any business logic
//! runs. With no secret configured, validation is skipped with a loud
//! warning -- explicitly a non-production mode.

use hmac::{Hmac, Mac};
use recado_core::RecadoError;
use sha2::Sha256;
use tracing::warn;

type HmacSha256 = Hmac<Sha256>;

/// Validates provider-supplied webhook signatures.
pub struct SignatureGuard {
    secret: Option<String>,
}

impl SignatureGuard {
    pub fn new(secret: Option<String>) -> Self {
        if secret.is_none() {
            warn!(
                "webhook signature secret not configured -- signature validation is DISABLED; \
                 do not run this in production"
            );
        }
        Self { secret }
    }

    /// Verify a signature header against the signed URL and raw body.
    pub fn verify(
        &self,
        url: &str,
        body: &[u8],
        signature: Option<&str>,
    ) -> Result<(), RecadoError> {
        let Some(secret) = self.secret.as_deref() else {
            warn!("accepting webhook without signature validation (no secret configured)");
            return Ok(());
        };

        let Some(signature) = signature else {
            return Err(RecadoError::Unauthorized(
                "missing signature header".to_string(),
            ));
        };
        let decoded = hex::decode(signature.trim()).map_err(|_| {
            RecadoError::Unauthorized("malformed signature header".to_string())
        })?;

        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .map_err(|e| RecadoError::Internal(format!("hmac key setup failed: {e}")))?;
        mac.update(url.as_bytes());
        mac.update(body);
        mac.verify_slice(&decoded)
            .map_err(|_| RecadoError::Unauthorized("invalid signature".to_string()))
    }

    /// Compute the expected hex signature for a URL and body.
    ///
    /// Used by tests and by provider-side tooling that registers the webhook.
    pub fn compute(secret: &str, url: &str, body: &[u8]) -> String {
        let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
            .expect("HMAC accepts keys of any length");
        mac.update(url.as_bytes());
        mac.update(body);
        hex::encode(mac.finalize().into_bytes())
    }
}
