//! Projection of bus events into the conversation domain

use crate::event::{Event, EventType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Normalized conversation event handed to downstream processing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationEvent {
    pub conversation_id: String,
    pub channel_id: String,
    pub metadata: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub assigned_to: Option<String>,
}

const CONVERSATION_KEYS: &[&str] = &["conversationId", "conversation_id"];
const CHANNEL_KEYS: &[&str] = &["channelId", "channel_id"];
const ASSIGNEE_KEYS: &[&str] = &["assignedTo", "assigned_to", "agentId", "agent_id"];
const MESSAGE_KEYS: &[&str] = &["messageId", "message_id", "id"];

/// Map an event to its conversation projection.
///
/// Total over [`EventType`]: agent and system events, and conversation or
/// message events whose payload lacks a conversation or channel id, yield
/// `None`.
pub fn map_to_conversation_event(event: &Event) -> Option<ConversationEvent> {
    match event.event_type {
        EventType::ConversationCreated
        | EventType::ConversationUpdated
        | EventType::ConversationAssigned
        | EventType::ConversationClosed => project(event, Scope::Conversation),
        EventType::MessageCreated | EventType::MessageUpdated | EventType::MessageDeleted => {
            project(event, Scope::Message)
        }
        EventType::AgentOnline
        | EventType::AgentOffline
        | EventType::AgentBusy
        | EventType::AgentAvailable
        | EventType::SystemError
        | EventType::SystemWarning
        | EventType::SystemMaintenance => None,
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum Scope {
    Conversation,
    Message,
}

fn project(event: &Event, scope: Scope) -> Option<ConversationEvent> {
    let payload = event.payload.as_object()?;

    // a conversation payload may identify itself by plain `id`
    let conversation_id = string_field(payload, CONVERSATION_KEYS).or_else(|| match scope {
        Scope::Conversation => string_field(payload, &["id"]),
        Scope::Message => None,
    })?;
    let channel_id = string_field(payload, CHANNEL_KEYS)?;

    let mut metadata = match payload.get("metadata") {
        Some(Value::Object(extra)) => extra.clone(),
        _ => Map::new(),
    };
    metadata.insert(
        "eventType".to_string(),
        Value::String(event.event_type.as_str().to_string()),
    );
    metadata.insert(
        "timestamp".to_string(),
        Value::String(event.timestamp.to_rfc3339()),
    );
    if let Some(source) = &event.source {
        metadata.insert("source".to_string(), Value::String(source.clone()));
    }
    if scope == Scope::Message
        && let Some(message_id) = string_field(payload, MESSAGE_KEYS)
    {
        metadata.insert("messageId".to_string(), Value::String(message_id));
    }

    Some(ConversationEvent {
        conversation_id,
        channel_id,
        metadata: Value::Object(metadata),
        assigned_to: string_field(payload, ASSIGNEE_KEYS),
    })
}

/// First non-empty string (or number) value under any of `keys`
fn string_field(map: &Map<String, Value>, keys: &[&str]) -> Option<String> {
    keys.iter().find_map(|key| match map.get(*key)? {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    })
}
