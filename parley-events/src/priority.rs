//! Per-event-type priorities and the immediate/deferred threshold

use crate::event::EventType;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Priority threshold used when none is configured.
pub const DEFAULT_PRIORITY_THRESHOLD: u8 = 7;

/// Event priority, 1 (lowest) to 9 (most urgent).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Priority(u8);

impl Priority {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 9;

    /// Create a priority, rejecting values outside 1..=9
    pub const fn new(value: u8) -> Option<Self> {
        if value >= Self::MIN && value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn get(self) -> u8 {
        self.0
    }

    /// The default immediate-processing threshold
    pub const fn default_threshold() -> Self {
        Self(DEFAULT_PRIORITY_THRESHOLD)
    }
}

impl fmt::Display for Priority {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<u8> for Priority {
    type Error = InvalidPriority;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        Priority::new(value).ok_or(InvalidPriority(value))
    }
}

impl From<Priority> for u8 {
    fn from(priority: Priority) -> Self {
        priority.0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Priority must be between 1 and 9, got {0}")]
pub struct InvalidPriority(pub u8);

impl EventType {
    /// Built-in priority for this event type
    pub const fn default_priority(self) -> Priority {
        let value = match self {
            EventType::ConversationCreated => 8,
            EventType::ConversationUpdated => 4,
            EventType::ConversationAssigned => 7,
            EventType::ConversationClosed => 5,
            EventType::MessageCreated => 7,
            EventType::MessageUpdated => 3,
            EventType::MessageDeleted => 3,
            EventType::AgentOnline => 2,
            EventType::AgentOffline => 2,
            EventType::AgentBusy => 2,
            EventType::AgentAvailable => 2,
            EventType::SystemError => 9,
            EventType::SystemWarning => 6,
            EventType::SystemMaintenance => 1,
        };
        Priority(value)
    }
}

/// Read-only mapping from every [`EventType`] to its [`Priority`].
///
/// Built once at startup and shared behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityTable {
    entries: [Priority; EventType::COUNT],
}

impl PriorityTable {
    /// Table with the built-in priorities
    pub fn standard() -> Self {
        Self {
            entries: EventType::ALL.map(EventType::default_priority),
        }
    }

    /// Replace one entry while the table is being built
    pub fn with_override(mut self, event_type: EventType, priority: Priority) -> Self {
        self.entries[event_type.index()] = priority;
        self
    }

    pub fn get(&self, event_type: EventType) -> Priority {
        self.entries[event_type.index()]
    }

    /// Whether `event_type` is processed immediately under `threshold`
    pub fn is_immediate(&self, event_type: EventType, threshold: Priority) -> bool {
        self.get(event_type) >= threshold
    }

    pub fn iter(&self) -> impl Iterator<Item = (EventType, Priority)> + '_ {
        EventType::ALL
            .iter()
            .map(move |event_type| (*event_type, self.get(*event_type)))
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::standard()
    }
}
