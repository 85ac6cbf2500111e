//! Webhook signature generation and verification
//!
//! Signatures are Stripe-style: `t=<unix seconds>,v1=<hex HMAC-SHA256>` over
//! `"<t>.<payload>"`.

use crate::{IngestError, Result};
use hmac::{Hmac, Mac};
use sha2::Sha256;

type HmacSha256 = Hmac<Sha256>;

/// Default accepted clock skew for signed requests
pub const DEFAULT_TOLERANCE_SECS: u64 = 300;

/// Webhook signature utilities
#[derive(Clone)]
pub struct WebhookSignature {
    secret: String,
}

impl std::fmt::Debug for WebhookSignature {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookSignature")
            .field("secret", &"***")
            .finish()
    }
}

impl WebhookSignature {
    pub fn new(secret: impl Into<String>) -> Self {
        Self {
            secret: secret.into(),
        }
    }

    /// Sign `payload` with the current time
    pub fn sign(&self, payload: &[u8]) -> Result<String> {
        self.sign_with_timestamp(payload, chrono::Utc::now().timestamp())
    }

    /// Sign `payload` with a specific timestamp
    pub fn sign_with_timestamp(&self, payload: &[u8], timestamp: i64) -> Result<String> {
        let signature = self.compute(timestamp, payload)?;
        Ok(format!("t={},v1={}", timestamp, signature))
    }

    /// Verify a signature against the payload at the current time.
    ///
    /// `Ok(false)` means the signature is well-formed and fresh but does not
    /// match; malformed or stale signatures are errors.
    pub fn verify(&self, payload: &[u8], signature: &str, tolerance_secs: u64) -> Result<bool> {
        self.verify_at(payload, signature, tolerance_secs, chrono::Utc::now().timestamp())
    }

    pub fn verify_at(
        &self,
        payload: &[u8],
        signature: &str,
        tolerance_secs: u64,
        now: i64,
    ) -> Result<bool> {
        let parts = parse_signature(signature)?;

        let age = now
            .checked_sub(parts.timestamp)
            .map(i64::unsigned_abs)
            .ok_or_else(|| {
                IngestError::TimestampInvalid("timestamp out of range".to_string())
            })?;
        if age > tolerance_secs {
            return Err(IngestError::TimestampInvalid(format!(
                "timestamp off by {} seconds (tolerance: {} seconds)",
                age, tolerance_secs
            )));
        }

        let expected = self.compute(parts.timestamp, payload)?;
        Ok(constant_time_compare(&parts.signature, &expected))
    }

    fn compute(&self, timestamp: i64, payload: &[u8]) -> Result<String> {
        let mut mac = HmacSha256::new_from_slice(self.secret.as_bytes())
            .map_err(|e| IngestError::Internal(format!("invalid HMAC key: {}", e)))?;
        mac.update(timestamp.to_string().as_bytes());
        mac.update(b".");
        mac.update(payload);
        Ok(hex::encode(mac.finalize().into_bytes()))
    }
}

/// Parsed signature components
struct SignatureParts {
    timestamp: i64,
    signature: String,
}

fn parse_signature(signature: &str) -> Result<SignatureParts> {
    let mut timestamp = None;
    let mut sig = None;

    for part in signature.split(',') {
        match part.trim().split_once('=') {
            Some(("t", t)) => timestamp = Some(t),
            Some(("v1", v)) => sig = Some(v),
            _ => {}
        }
    }

    match (timestamp, sig) {
        (Some(t), Some(s)) => Ok(SignatureParts {
            timestamp: t.parse().map_err(|_| {
                IngestError::TimestampInvalid("invalid timestamp format".to_string())
            })?,
            signature: s.to_string(),
        }),
        _ => Err(IngestError::SignatureInvalid(
            "missing timestamp or signature".to_string(),
        )),
    }
}

/// Constant-time string comparison
pub(crate) fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut result = 0u8;
    for (x, y) in a.bytes().zip(b.bytes()) {
        result |= x ^ y;
    }
    result == 0
}

/// Header names
pub mod headers {
    /// The signature header name
    pub const SIGNATURE: &str = "X-Webhook-Signature";

    /// API key for the internal emit endpoint
    pub const API_KEY: &str = "X-Api-Key";

    pub const ORIGIN: &str = "Origin";
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sign_and_verify() {
        let signer = WebhookSignature::new("test-secret");
        let payload = br#"{"event_type":"conversation.new"}"#;

        let signature = signer.sign(payload).unwrap();
        assert!(signature.starts_with("t="));
        assert!(signature.contains(",v1="));

        assert!(signer.verify(payload, &signature, 300).unwrap());
    }

    #[test]
    fn test_known_vector() {
        // echo -n '1700000000.{}' | openssl dgst -sha256 -hmac secret
        let signer = WebhookSignature::new("secret");
        let signature = signer.sign_with_timestamp(b"{}", 1_700_000_000).unwrap();
        let expected = {
            let mut mac = HmacSha256::new_from_slice(b"secret").unwrap();
            mac.update(b"1700000000.{}");
            hex::encode(mac.finalize().into_bytes())
        };
        assert_eq!(signature, format!("t=1700000000,v1={}", expected));
    }

    #[test]
    fn test_tampered_payload_does_not_match() {
        let signer = WebhookSignature::new("test-secret");
        let signature = signer.sign(b"original").unwrap();

        assert!(!signer.verify(b"tampered", &signature, 300).unwrap());
    }

    #[test]
    fn test_verify_wrong_secret() {
        let signature = WebhookSignature::new("secret1").sign(b"payload").unwrap();
        let result = WebhookSignature::new("secret2").verify(b"payload", &signature, 300);

        assert!(!result.unwrap());
    }

    #[test]
    fn test_malformed_signatures() {
        let signer = WebhookSignature::new("test-secret");

        assert!(matches!(
            signer.verify(b"x", "invalid", 300),
            Err(IngestError::SignatureInvalid(_))
        ));
        assert!(matches!(
            signer.verify(b"x", "t=yesterday,v1=abc", 300),
            Err(IngestError::TimestampInvalid(_))
        ));
    }

    #[test]
    fn test_expired_and_future_timestamps() {
        let signer = WebhookSignature::new("test-secret");
        let now = 1_700_000_000;

        let old = signer.sign_with_timestamp(b"p", now - 301).unwrap();
        assert!(matches!(
            signer.verify_at(b"p", &old, 300, now),
            Err(IngestError::TimestampInvalid(_))
        ));

        let future = signer.sign_with_timestamp(b"p", now + 1000).unwrap();
        assert!(signer.verify_at(b"p", &future, 300, now).is_err());

        let fresh = signer.sign_with_timestamp(b"p", now - 299).unwrap();
        assert!(signer.verify_at(b"p", &fresh, 300, now).unwrap());
    }

    #[test]
    fn test_extreme_timestamps_are_rejected() {
        let signer = WebhookSignature::new("whsec");
        let now = 1_700_000_000;

        for signature in [
            format!("t={},v1=00", i64::MIN),
            format!("t={},v1=00", i64::MAX),
        ] {
            assert!(matches!(
                signer.verify_at(b"{}", &signature, 300, now),
                Err(IngestError::TimestampInvalid(_))
            ));
        }

        assert!(matches!(
            signer.verify(b"{}", "t=-9223372036854775808,v1=00", 300),
            Err(IngestError::TimestampInvalid(_))
        ));
    }

    #[test]
    fn test_constant_time_compare() {
        assert!(constant_time_compare("abc", "abc"));
        assert!(!constant_time_compare("abc", "abd"));
        assert!(!constant_time_compare("abc", "ab"));
        assert!(!constant_time_compare("", "a"));
    }

    #[test]
    fn test_debug_hides_secret() {
        let debug = format!("{:?}", WebhookSignature::new("hunter2"));
        assert!(!debug.contains("hunter2"));
    }
}
