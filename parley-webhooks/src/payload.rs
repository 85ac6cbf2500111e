//! Request bodies accepted by the ingest endpoints

use chrono::{DateTime, Utc};
use serde::Deserialize;
use serde_json::Value;

/// Body of `POST /api/webhooks/events`
#[derive(Debug, Clone, Deserialize)]
pub struct WebhookBody {
    /// External event name, e.g. `conversation.new`
    pub event_type: String,

    #[serde(default)]
    pub payload: Option<Value>,

    #[serde(default)]
    pub source: Option<String>,

    /// Producer timestamp; anything but an RFC 3339 string is ignored
    #[serde(default)]
    pub timestamp: Option<Value>,

    /// Signature carried in the body instead of the header
    #[serde(default)]
    pub signature: Option<String>,
}

impl WebhookBody {
    pub fn timestamp(&self) -> Option<DateTime<Utc>> {
        self.timestamp
            .as_ref()
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
    }
}

/// Body of `POST /api/events/emit`
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmitBody {
    pub event_type: String,

    #[serde(default)]
    pub payload: Option<Value>,

    #[serde(default)]
    pub source: Option<String>,

    #[serde(default)]
    pub api_key: Option<String>,
}
