//! Signature checks for incoming webhooks

use crate::signature::{DEFAULT_TOLERANCE_SECS, WebhookSignature, headers};
use crate::{IngestError, Result};
use parley_core::HttpRequest;

/// Receiver for incoming webhooks
#[derive(Debug, Clone)]
pub struct WebhookReceiver {
    signature: WebhookSignature,
    timestamp_tolerance: u64,
}

impl WebhookReceiver {
    /// Create a new receiver with the given secret
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            signature: WebhookSignature::new(secret),
            timestamp_tolerance: DEFAULT_TOLERANCE_SECS,
        }
    }

    /// Set the timestamp tolerance in seconds
    pub fn with_tolerance(mut self, seconds: u64) -> Self {
        self.timestamp_tolerance = seconds;
        self
    }

    pub fn tolerance(&self) -> u64 {
        self.timestamp_tolerance
    }

    /// Verify `signature` over `payload`, failing unless it matches
    pub fn verify(&self, payload: &[u8], signature: &str) -> Result<()> {
        if self
            .signature
            .verify(payload, signature, self.timestamp_tolerance)?
        {
            Ok(())
        } else {
            Err(IngestError::SignatureInvalid(
                "Signature verification failed".to_string(),
            ))
        }
    }

    /// Verify a webhook request.
    ///
    /// The `X-Webhook-Signature` header signs the raw body. Without the
    /// header, a `signature` field in the body is checked against the compact
    /// JSON serialization of the body's `payload`.
    pub fn verify_request(
        &self,
        req: &HttpRequest,
        body_signature: Option<&str>,
        payload: Option<&serde_json::Value>,
    ) -> Result<()> {
        if let Some(signature) = req.header(headers::SIGNATURE) {
            return self.verify(&req.body, signature);
        }

        let signature = body_signature.ok_or(IngestError::SignatureMissing)?;
        let signed = match payload {
            Some(payload) => serde_json::to_vec(payload)
                .map_err(|e| IngestError::Internal(e.to_string()))?,
            None => Vec::new(),
        };
        self.verify(&signed, signature)
    }
}
