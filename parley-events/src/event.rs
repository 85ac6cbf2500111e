//! Event definitions and handler traits

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use uuid::Uuid;

/// Closed set of event types understood by the bus.
///
/// The wire name (`conversation.created`, ...) is used for serialization,
/// parsing and logging.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum EventType {
    #[serde(rename = "conversation.created")]
    ConversationCreated,
    #[serde(rename = "conversation.updated")]
    ConversationUpdated,
    #[serde(rename = "conversation.assigned")]
    ConversationAssigned,
    #[serde(rename = "conversation.closed")]
    ConversationClosed,
    #[serde(rename = "message.created")]
    MessageCreated,
    #[serde(rename = "message.updated")]
    MessageUpdated,
    #[serde(rename = "message.deleted")]
    MessageDeleted,
    #[serde(rename = "agent.online")]
    AgentOnline,
    #[serde(rename = "agent.offline")]
    AgentOffline,
    #[serde(rename = "agent.busy")]
    AgentBusy,
    #[serde(rename = "agent.available")]
    AgentAvailable,
    #[serde(rename = "system.error")]
    SystemError,
    #[serde(rename = "system.warning")]
    SystemWarning,
    #[serde(rename = "system.maintenance")]
    SystemMaintenance,
}

/// Broad grouping of event types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventCategory {
    Conversation,
    Message,
    Agent,
    System,
}

impl EventType {
    /// Number of event types
    pub const COUNT: usize = 14;

    /// Every event type, in declaration order.
    pub const ALL: [EventType; Self::COUNT] = [
        EventType::ConversationCreated,
        EventType::ConversationUpdated,
        EventType::ConversationAssigned,
        EventType::ConversationClosed,
        EventType::MessageCreated,
        EventType::MessageUpdated,
        EventType::MessageDeleted,
        EventType::AgentOnline,
        EventType::AgentOffline,
        EventType::AgentBusy,
        EventType::AgentAvailable,
        EventType::SystemError,
        EventType::SystemWarning,
        EventType::SystemMaintenance,
    ];

    /// Wire name of the event type
    pub const fn as_str(self) -> &'static str {
        match self {
            EventType::ConversationCreated => "conversation.created",
            EventType::ConversationUpdated => "conversation.updated",
            EventType::ConversationAssigned => "conversation.assigned",
            EventType::ConversationClosed => "conversation.closed",
            EventType::MessageCreated => "message.created",
            EventType::MessageUpdated => "message.updated",
            EventType::MessageDeleted => "message.deleted",
            EventType::AgentOnline => "agent.online",
            EventType::AgentOffline => "agent.offline",
            EventType::AgentBusy => "agent.busy",
            EventType::AgentAvailable => "agent.available",
            EventType::SystemError => "system.error",
            EventType::SystemWarning => "system.warning",
            EventType::SystemMaintenance => "system.maintenance",
        }
    }

    pub const fn category(self) -> EventCategory {
        match self {
            EventType::ConversationCreated
            | EventType::ConversationUpdated
            | EventType::ConversationAssigned
            | EventType::ConversationClosed => EventCategory::Conversation,
            EventType::MessageCreated | EventType::MessageUpdated | EventType::MessageDeleted => {
                EventCategory::Message
            }
            EventType::AgentOnline
            | EventType::AgentOffline
            | EventType::AgentBusy
            | EventType::AgentAvailable => EventCategory::Agent,
            EventType::SystemError | EventType::SystemWarning | EventType::SystemMaintenance => {
                EventCategory::System
            }
        }
    }

    /// True for conversation and message events.
    pub const fn is_conversation_related(self) -> bool {
        matches!(
            self.category(),
            EventCategory::Conversation | EventCategory::Message
        )
    }

    /// Position of this type in [`EventType::ALL`]
    pub(crate) const fn index(self) -> usize {
        self as usize
    }
}

impl fmt::Display for EventType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EventType {
    type Err = UnknownEventType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        EventType::ALL
            .iter()
            .copied()
            .find(|event_type| event_type.as_str() == s)
            .ok_or_else(|| UnknownEventType(s.to_string()))
    }
}

/// Returned when a string does not name an [`EventType`]
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Unknown event type: {0}")]
pub struct UnknownEventType(pub String);

/// A typed, timestamped notification broadcast in-process.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Unique event ID
    pub id: Uuid,

    #[serde(rename = "type")]
    pub event_type: EventType,

    /// Arbitrary structured payload
    pub payload: serde_json::Value,

    /// Producer of the event (webhook provider, internal api, ...)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,

    /// Emission time
    pub timestamp: DateTime<Utc>,
}

impl Event {
    /// Create a new event stamped with the current time
    pub fn new(event_type: EventType, payload: serde_json::Value) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type,
            payload,
            source: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn with_source_opt(mut self, source: Option<String>) -> Self {
        self.source = source;
        self
    }

    /// Keep a timestamp supplied by the producer instead of "now"
    pub fn with_timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn event_name(&self) -> &'static str {
        self.event_type.as_str()
    }
}

/// Event handler trait
#[async_trait]
pub trait EventHandler: Send + Sync {
    /// Handle the event
    async fn handle(&self, event: &Event) -> Result<(), EventHandlerError>;

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Event handler error
#[derive(Debug, thiserror::Error)]
pub enum EventHandlerError {
    #[error("Handler failed: {0}")]
    HandlerFailed(String),

    #[error("Event processing error: {0}")]
    ProcessingError(String),

    #[error("Handler panicked: {0}")]
    Panicked(String),
}

/// Adapter turning an async closure into an [`EventHandler`].
///
/// The closure receives an owned copy of the event.
pub struct FnHandler<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), EventHandlerError>> + Send,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> EventHandler for FnHandler<F>
where
    F: Fn(Event) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), EventHandlerError>> + Send,
{
    async fn handle(&self, event: &Event) -> Result<(), EventHandlerError> {
        (self.f)(event.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
