//! Integration tests for parley-events

use async_trait::async_trait;
use parley_events::*;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

struct Counter(Arc<AtomicU32>);

#[async_trait]
impl EventHandler for Counter {
    async fn handle(&self, _event: &Event) -> Result<(), EventHandlerError> {
        self.0.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

struct Broken;

#[async_trait]
impl EventHandler for Broken {
    async fn handle(&self, _event: &Event) -> Result<(), EventHandlerError> {
        Err(EventHandlerError::ProcessingError("always fails".to_string()))
    }
}

#[tokio::test]
async fn test_every_handler_runs_when_one_fails() {
    for failing_position in 0..5 {
        let bus = EventBus::new();
        let invocations = Arc::new(AtomicU32::new(0));

        for position in 0..5 {
            if position == failing_position {
                let invocations = invocations.clone();
                bus.on_fn(EventType::MessageCreated, "failing", move |_event| {
                    let invocations = invocations.clone();
                    async move {
                        invocations.fetch_add(1, Ordering::SeqCst);
                        Err(EventHandlerError::HandlerFailed("nope".to_string()))
                    }
                });
            } else {
                bus.on(EventType::MessageCreated, Arc::new(Counter(invocations.clone())));
            }
        }

        let report = bus
            .emit(EventType::MessageCreated, json!({}), None)
            .await;

        assert_eq!(invocations.load(Ordering::SeqCst), 5);
        assert_eq!(report.handlers, 5);
        assert_eq!(report.failed, 1);
    }
}

#[tokio::test]
async fn test_zero_handlers_has_no_side_effect() {
    let bus = EventBus::new();
    let witness = Arc::new(AtomicU32::new(0));
    bus.on(EventType::AgentOnline, Arc::new(Counter(witness.clone())));

    for event_type in EventType::ALL {
        if event_type == EventType::AgentOnline {
            continue;
        }
        let report = bus.emit(event_type, json!({"x": 1}), None).await;
        assert_eq!(report.handlers, 0);
    }

    assert_eq!(witness.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn test_handler_sees_payload_and_source() {
    let bus = EventBus::new();
    let seen = Arc::new(std::sync::Mutex::new(None));
    let captured = seen.clone();

    bus.on_fn(EventType::ConversationAssigned, "capture", move |event| {
        let captured = captured.clone();
        async move {
            *captured.lock().unwrap() = Some(event);
            Ok(())
        }
    });

    bus.emit(
        EventType::ConversationAssigned,
        json!({"conversationId": "c1", "channelId": "ch1", "assignedTo": "a1"}),
        Some("internal-api".to_string()),
    )
    .await;

    let event = seen.lock().unwrap().clone().expect("handler should have run");
    assert_eq!(event.source.as_deref(), Some("internal-api"));

    let mapped = map_to_conversation_event(&event).unwrap();
    assert_eq!(mapped.assigned_to.as_deref(), Some("a1"));
}

#[tokio::test]
async fn test_broken_handler_only_counts_as_failure() {
    let bus = EventBus::new();
    bus.on(EventType::SystemError, Arc::new(Broken));

    let report = bus.emit(EventType::SystemError, json!({}), None).await;
    assert_eq!(report.failed, 1);
    assert_eq!(report.succeeded(), 0);
}

#[test]
fn test_priority_table_covers_enumeration() {
    let table = PriorityTable::standard();
    assert_eq!(table.iter().count(), EventType::ALL.len());
    assert_eq!(table.get(EventType::MessageCreated), Priority::new(7).unwrap());
    assert_eq!(table.get(EventType::ConversationUpdated), Priority::new(4).unwrap());
}
