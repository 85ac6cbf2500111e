//! End-to-end tests: bus -> processor -> handler or queue

use parley_audit::MemoryHistoryStore;
use parley_dispatch::*;
use parley_events::{EventBus, EventType};
use parley_queue::MemoryQueue;
use serde_json::json;
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

struct Harness {
    bus: EventBus,
    queue: MemoryQueue,
    history: MemoryHistoryStore,
    dispatched: Arc<AtomicU32>,
    _attached: AttachedProcessor,
}

fn harness() -> Harness {
    let bus = EventBus::new();
    let queue = MemoryQueue::new("conversation_events");
    let history = MemoryHistoryStore::new();
    let dispatched = Arc::new(AtomicU32::new(0));

    let counter = dispatched.clone();
    let processor = Arc::new(
        EventProcessor::builder()
            .queue(Arc::new(queue.clone()))
            .history(Arc::new(history.clone()))
            .handler(Arc::new(FnConversationHandler::new(
                "counting",
                move |_event| {
                    let counter = counter.clone();
                    async move {
                        counter.fetch_add(1, Ordering::SeqCst);
                        Ok(())
                    }
                },
            )))
            .build()
            .unwrap(),
    );
    let attached = processor.attach(&bus).unwrap();

    Harness {
        bus,
        queue,
        history,
        dispatched,
        _attached: attached,
    }
}

#[tokio::test]
async fn test_message_created_is_processed_synchronously() {
    let h = harness();

    let report = h
        .bus
        .emit(
            EventType::MessageCreated,
            json!({"conversationId": "c1", "channelId": "ch1", "messageId": "m1"}),
            Some("api".to_string()),
        )
        .await;

    assert_eq!(report.handlers, 1);
    assert_eq!(report.failed, 0);
    assert_eq!(h.dispatched.load(Ordering::SeqCst), 1);
    assert!(h.queue.is_empty().await);
    assert_eq!(h.history.len().await, 1);
}

#[tokio::test]
async fn test_conversation_updated_is_enqueued() {
    let h = harness();

    h.bus
        .emit(
            EventType::ConversationUpdated,
            json!({"id": "c9", "channelId": "ch1"}),
            None,
        )
        .await;

    assert_eq!(h.dispatched.load(Ordering::SeqCst), 0);

    let job = h.queue.dequeue().await.unwrap();
    assert_eq!(job.job_type, "process_conversation_event");
    assert_eq!(job.priority.get(), 4);
    assert_eq!(job.data["conversationEvent"]["conversationId"], "c9");
    assert_eq!(job.data["originalEvent"]["type"], "conversation.updated");
}

#[tokio::test]
async fn test_mixed_traffic_is_split_by_priority() {
    let h = harness();
    let payload = json!({"conversationId": "c1", "channelId": "ch1"});

    for event_type in EventType::ALL {
        h.bus.emit(event_type, payload.clone(), None).await;
    }

    // created(8), assigned(7), message.created(7)
    assert_eq!(h.dispatched.load(Ordering::SeqCst), 3);
    // updated(4), closed(5), message.updated(3), message.deleted(3)
    let jobs = h.queue.snapshot().await;
    let priorities: Vec<u8> = jobs.iter().map(|j| j.priority.get()).collect();
    assert_eq!(priorities, vec![5, 4, 3, 3]);
    // agent and system events are never subscribed
    assert_eq!(h.history.len().await, 7);
}

#[tokio::test]
async fn test_enqueue_failure_shows_up_in_emit_report() {
    let bus = EventBus::new();
    let queue = MemoryQueue::new("tiny").with_max_size(1);
    let processor = Arc::new(
        EventProcessor::builder()
            .queue(Arc::new(queue.clone()))
            .build()
            .unwrap(),
    );
    let _attached = processor.attach(&bus).unwrap();

    let payload = json!({"conversationId": "c1", "channelId": "ch1"});
    let first = bus.emit(EventType::MessageUpdated, payload.clone(), None).await;
    let second = bus.emit(EventType::MessageUpdated, payload, None).await;

    assert_eq!(first.failed, 0);
    assert_eq!(second.failed, 1);
    assert_eq!(queue.len().await, 1);
}
