//! Error types for event ingest

use parley_core::HttpResponse;
use serde_json::json;
use thiserror::Error;

/// Errors that can occur while accepting an inbound event
#[derive(Error, Debug)]
pub enum IngestError {
    /// Body is not valid JSON or misses a required field
    #[error("Invalid payload: {0}")]
    InvalidPayload(String),

    /// Event type could not be mapped to an internal event
    #[error("Unknown event type: {0}")]
    UnknownEventType(String),

    /// Signature required but not supplied
    #[error("Signature missing from request")]
    SignatureMissing,

    /// Signature verification failed
    #[error("Signature verification failed: {0}")]
    SignatureInvalid(String),

    /// Timestamp validation failed
    #[error("Timestamp validation failed: {0}")]
    TimestampInvalid(String),

    /// Missing or incorrect API key
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Request origin not allowed
    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Payload too large: {0} bytes")]
    PayloadTooLarge(usize),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl IngestError {
    pub fn status_code(&self) -> u16 {
        match self {
            IngestError::InvalidPayload(_) | IngestError::UnknownEventType(_) => 400,
            IngestError::SignatureMissing
            | IngestError::SignatureInvalid(_)
            | IngestError::TimestampInvalid(_)
            | IngestError::Unauthorized(_) => 401,
            IngestError::Forbidden(_) => 403,
            IngestError::PayloadTooLarge(_) => 413,
            IngestError::Internal(_) => 500,
        }
    }

    /// Short message for the `error` field of the response body
    fn summary(&self) -> &'static str {
        match self {
            IngestError::InvalidPayload(_) => "Invalid payload",
            IngestError::UnknownEventType(_) => "Unknown event type",
            IngestError::SignatureMissing
            | IngestError::SignatureInvalid(_)
            | IngestError::TimestampInvalid(_) => "Invalid signature",
            IngestError::Unauthorized(_) => "Unauthorized",
            IngestError::Forbidden(_) => "Forbidden",
            IngestError::PayloadTooLarge(_) => "Payload too large",
            IngestError::Internal(_) => "Internal server error",
        }
    }

    /// JSON body `{ error, details? }`.
    ///
    /// Authentication and server failures carry no details.
    pub fn to_response(&self) -> HttpResponse {
        let details = match self {
            IngestError::InvalidPayload(d) | IngestError::UnknownEventType(d) => Some(d.clone()),
            IngestError::PayloadTooLarge(_) => Some(self.to_string()),
            _ => None,
        };

        let body = match details {
            Some(details) => json!({ "error": self.summary(), "details": details }),
            None => json!({ "error": self.summary() }),
        };

        HttpResponse::new(self.status_code())
            .with_json(&body)
            .unwrap_or_else(|_| HttpResponse::new(self.status_code()))
    }
}

pub type Result<T> = std::result::Result<T, IngestError>;
