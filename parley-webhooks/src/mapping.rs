//! External event names to internal [`EventType`]s
//!
//! Resolution order: an exact internal name, then the alias table, then the
//! `entity.action` heuristic.

use parley_events::EventType;

/// Names used by webhook providers that differ from the internal ones
const ALIASES: &[(&str, EventType)] = &[
    ("conversation.new", EventType::ConversationCreated),
    ("conversation.update", EventType::ConversationUpdated),
    ("conversation.assign", EventType::ConversationAssigned),
    ("conversation.resolved", EventType::ConversationClosed),
    ("conversation.close", EventType::ConversationClosed),
    ("message.new", EventType::MessageCreated),
    ("message.received", EventType::MessageCreated),
    ("message.sent", EventType::MessageCreated),
    ("message.edit", EventType::MessageUpdated),
    ("message.remove", EventType::MessageDeleted),
    ("agent.login", EventType::AgentOnline),
    ("agent.logout", EventType::AgentOffline),
    ("agent.away", EventType::AgentBusy),
    ("system.alert", EventType::SystemWarning),
];

const ENTITIES: &[&str] = &["conversation", "message", "agent", "system"];

/// Map an external event name to an internal event type.
///
/// Matching ignores ASCII case and surrounding whitespace. Returns `None`
/// when no rule applies.
pub fn resolve_event_type(raw: &str) -> Option<EventType> {
    let name = raw.trim().to_ascii_lowercase();

    if let Ok(event_type) = name.parse::<EventType>() {
        return Some(event_type);
    }

    if let Some((_, event_type)) = ALIASES.iter().find(|(alias, _)| *alias == name) {
        return Some(*event_type);
    }

    infer(&name)
}

/// `entity.action` with a known entity and a recognised verb
fn infer(name: &str) -> Option<EventType> {
    let mut parts = name.split('.');
    let (entity, action) = match (parts.next(), parts.next(), parts.next()) {
        (Some(entity), Some(action), None) => (entity, action),
        _ => return None,
    };

    if !ENTITIES.contains(&entity) {
        return None;
    }

    let action = normalize_action(action)?;
    format!("{}.{}", entity, action).parse().ok()
}

fn normalize_action(action: &str) -> Option<&'static str> {
    let normalized = match action {
        "create" | "created" | "new" | "add" | "added" => "created",
        "update" | "updated" | "edit" | "edited" | "change" | "changed" => "updated",
        "delete" | "deleted" | "remove" | "removed" | "destroy" | "destroyed" => "deleted",
        "assign" | "assigned" => "assigned",
        "close" | "closed" | "resolve" | "resolved" => "closed",
        "online" | "connect" | "connected" => "online",
        "offline" | "disconnect" | "disconnected" => "offline",
        "busy" => "busy",
        "available" => "available",
        "error" | "fail" | "failed" => "error",
        "warning" | "warn" => "warning",
        "maintenance" => "maintenance",
        _ => return None,
    };
    Some(normalized)
}
