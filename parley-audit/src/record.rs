//! Event history records

use chrono::{DateTime, Utc};
use parley_events::{Event, EventType};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use uuid::Uuid;

/// Payload keys whose values never reach the history store
pub const DEFAULT_MASKED_FIELDS: &[&str] = &[
    "password",
    "secret",
    "token",
    "api_key",
    "apikey",
    "access_token",
    "refresh_token",
    "authorization",
    "private_key",
];

const MASK: &str = "[REDACTED]";

/// One processed event, as persisted in the history store.
///
/// Records are append-only: created once per received event and never
/// modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EventHistoryRecord {
    /// Unique record ID
    pub id: Uuid,

    /// ID of the event this record describes
    pub event_id: Uuid,

    pub event_type: EventType,

    pub payload: Value,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// When the processor handled the event
    pub processed_at: DateTime<Utc>,

    /// When the event was emitted
    pub original_timestamp: DateTime<Utc>,
}

impl EventHistoryRecord {
    /// Build a record for `event`, processed now
    pub fn from_event(event: &Event) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_id: event.id,
            event_type: event.event_type,
            payload: event.payload.clone(),
            source: event.source.clone(),
            processed_at: Utc::now(),
            original_timestamp: event.timestamp,
        }
    }

    /// Replace sensitive payload values, at any depth
    pub fn masked(mut self, fields: &[&str]) -> Self {
        mask_value(&mut self.payload, fields);
        self
    }

    /// Convert to JSON string
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

fn mask_value(value: &mut Value, fields: &[&str]) {
    match value {
        Value::Object(map) => {
            for (key, inner) in map.iter_mut() {
                let lowered = key.to_lowercase();
                if fields.iter().any(|field| lowered == *field) {
                    *inner = Value::String(MASK.to_string());
                } else {
                    mask_value(inner, fields);
                }
            }
        }
        Value::Array(items) => {
            for item in items {
                mask_value(item, fields);
            }
        }
        _ => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_from_event_copies_identity_and_times() {
        let event = Event::new(EventType::MessageCreated, json!({"text": "hi"})).with_source("api");
        let record = EventHistoryRecord::from_event(&event);

        assert_eq!(record.event_id, event.id);
        assert_eq!(record.event_type, EventType::MessageCreated);
        assert_eq!(record.source.as_deref(), Some("api"));
        assert_eq!(record.original_timestamp, event.timestamp);
        assert!(record.processed_at >= event.timestamp);
    }

    #[test]
    fn test_masking_is_recursive_and_case_insensitive() {
        let event = Event::new(
            EventType::ConversationCreated,
            json!({
                "conversationId": "c1",
                "Token": "abc",
                "contact": {"name": "Ada", "password": "hunter2"},
                "attachments": [{"access_token": "xyz", "url": "https://x"}]
            }),
        );
        let record = EventHistoryRecord::from_event(&event).masked(DEFAULT_MASKED_FIELDS);

        assert_eq!(record.payload["conversationId"], "c1");
        assert_eq!(record.payload["Token"], MASK);
        assert_eq!(record.payload["contact"]["name"], "Ada");
        assert_eq!(record.payload["contact"]["password"], MASK);
        assert_eq!(record.payload["attachments"][0]["access_token"], MASK);
        assert_eq!(record.payload["attachments"][0]["url"], "https://x");
    }

    #[test]
    fn test_json_field_names() {
        let event = Event::new(EventType::ConversationClosed, json!({}));
        let value: Value =
            serde_json::from_str(&EventHistoryRecord::from_event(&event).to_json().unwrap())
                .unwrap();

        assert_eq!(value["eventType"], "conversation.closed");
        assert!(value.get("processedAt").is_some());
        assert!(value.get("originalTimestamp").is_some());
    }
}
