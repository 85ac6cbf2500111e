//! End-to-end tests: HTTP ingest -> bus -> processor -> handler or queue

use parley::parley_audit::{FileHistoryStore, HistoryStore, MemoryHistoryStore};
use parley::parley_core::HttpRequest;
use parley::parley_dispatch::FnConversationHandler;
use parley::parley_queue::MemoryQueue;
use parley::parley_webhooks::{EMIT_ROUTE, WEBHOOK_ROUTE, WebhookSignature, headers};
use parley::*;
use serde_json::{Value, json};
use std::sync::Arc;
use std::sync::atomic::{AtomicU32, Ordering};

struct Harness {
    services: Services,
    queue: MemoryQueue,
    history: MemoryHistoryStore,
    handled: Arc<AtomicU32>,
}

async fn harness(config: AppConfig) -> Harness {
    let queue = MemoryQueue::new("conversation_events");
    let history = MemoryHistoryStore::new();
    let handled = Arc::new(AtomicU32::new(0));

    let counter = handled.clone();
    let services = Services::builder(config)
        .queue(Arc::new(queue.clone()))
        .history(Arc::new(history.clone()))
        .handler(Arc::new(FnConversationHandler::new("counting", move |_event| {
            let counter = counter.clone();
            async move {
                counter.fetch_add(1, Ordering::SeqCst);
                Ok(())
            }
        })))
        .build()
        .await
        .unwrap();

    Harness {
        services,
        queue,
        history,
        handled,
    }
}

fn post(path: &str, body: &Value) -> HttpRequest {
    HttpRequest::new("POST", path).with_body(serde_json::to_vec(body).unwrap())
}

fn production() -> AppConfig {
    AppConfig {
        environment: Environment::Production,
        api_secret_key: Some("internal-key".to_string()),
        webhook_secret: Some("whsec".to_string()),
        ..AppConfig::default()
    }
}

#[tokio::test]
async fn test_health() {
    let h = harness(AppConfig::default()).await;
    let router = h.services.router();

    let response = router.dispatch(HttpRequest::new("GET", HEALTH_ROUTE)).await;
    assert_eq!(response.status, 200);

    let body: Value = response.json().unwrap();
    assert_eq!(body["status"], "ok");
    assert_eq!(body["environment"], "development");
}

#[tokio::test]
async fn test_webhook_conversation_new_is_handled_immediately() {
    let h = harness(AppConfig::default()).await;
    let router = h.services.router();

    let response = router
        .dispatch(post(
            WEBHOOK_ROUTE,
            &json!({
                "event_type": "conversation.new",
                "payload": {"conversationId": "c1", "channelId": "ch1"}
            }),
        ))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(h.handled.load(Ordering::SeqCst), 1);
    assert!(h.queue.is_empty().await);

    let records = h.history.records().await;
    assert_eq!(records.len(), 1);
    assert_eq!(records[0].event_type, EventType::ConversationCreated);
}

#[tokio::test]
async fn test_emitted_conversation_update_is_queued() {
    let h = harness(AppConfig::default()).await;
    let router = h.services.router();

    let response = router
        .dispatch(post(
            EMIT_ROUTE,
            &json!({
                "eventType": "conversation.updated",
                "payload": {"conversationId": "c7", "channelId": "ch2"}
            }),
        ))
        .await;

    assert_eq!(response.status, 200);
    assert_eq!(h.handled.load(Ordering::SeqCst), 0);

    let job = h.queue.dequeue().await.unwrap();
    assert_eq!(job.job_type, "process_conversation_event");
    assert_eq!(job.priority.get(), 4);
    assert_eq!(job.data["conversationEvent"]["conversationId"], "c7");
    assert_eq!(job.data["originalEvent"]["source"], "internal");
}

#[tokio::test]
async fn test_threshold_comes_from_config() {
    let config = AppConfig {
        priority_threshold: 9,
        ..AppConfig::default()
    };
    let h = harness(config).await;
    let router = h.services.router();

    router
        .dispatch(post(
            WEBHOOK_ROUTE,
            &json!({"event_type": "message.new", "payload": {"conversationId": "c1", "channelId": "ch1"}}),
        ))
        .await;

    assert_eq!(h.handled.load(Ordering::SeqCst), 0);
    assert_eq!(h.queue.len().await, 1);
}

#[tokio::test]
async fn test_production_requires_credentials() {
    let h = harness(production()).await;
    let router = h.services.router();

    let unsigned = router
        .dispatch(post(
            WEBHOOK_ROUTE,
            &json!({"event_type": "message.new", "payload": {"conversationId": "c1", "channelId": "ch1"}}),
        ))
        .await;
    assert_eq!(unsigned.status, 401);

    let no_key = router
        .dispatch(post(
            EMIT_ROUTE,
            &json!({"eventType": "message.created", "payload": {"conversationId": "c1", "channelId": "ch1"}}),
        ))
        .await;
    assert_eq!(no_key.status, 401);

    assert_eq!(h.handled.load(Ordering::SeqCst), 0);
    assert!(h.history.is_empty().await);

    let raw = serde_json::to_vec(
        &json!({"event_type": "message.new", "payload": {"conversationId": "c1", "channelId": "ch1"}}),
    )
    .unwrap();
    let signature = WebhookSignature::new("whsec").sign(&raw).unwrap();
    let signed = router
        .dispatch(
            HttpRequest::new("POST", WEBHOOK_ROUTE)
                .with_header(headers::SIGNATURE, signature)
                .with_body(raw),
        )
        .await;
    assert_eq!(signed.status, 200);
    assert_eq!(h.handled.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_unknown_routes() {
    let h = harness(AppConfig::default()).await;
    let router = h.services.router();

    let missing = router.dispatch(HttpRequest::new("GET", "/nope")).await;
    assert_eq!(missing.status, 404);

    let wrong_method = router.dispatch(HttpRequest::new("GET", WEBHOOK_ROUTE)).await;
    assert_eq!(wrong_method.status, 405);
}

#[tokio::test]
async fn test_config_file_history_path() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("history.jsonl");

    let config = AppConfig::builder()
        .vars([
            ("PARLEY_HISTORY_PATH", path.to_string_lossy().into_owned()),
            ("PARLEY_PRIORITY_THRESHOLD", "8".to_string()),
        ])
        .load()
        .unwrap();
    let services = Services::builder(config).build().await.unwrap();
    assert_eq!(services.processor().threshold().get(), 8);

    services
        .bus()
        .emit(
            EventType::MessageCreated,
            json!({"conversationId": "c1", "channelId": "ch1"}),
            Some("test".to_string()),
        )
        .await;

    let store = FileHistoryStore::new(&path);
    let recent = store.recent(10).await.unwrap();
    assert_eq!(recent.len(), 1);
    assert_eq!(recent[0].event_type, EventType::MessageCreated);
}

#[tokio::test]
async fn test_default_memory_backends_are_bounded() {
    let config = AppConfig {
        queue_max_size: 2,
        history_max_records: 3,
        ..AppConfig::default()
    };
    let services = Services::builder(config).build().await.unwrap();

    let mut failed = Vec::new();
    for n in 0..5 {
        let report = services
            .bus()
            .emit(
                EventType::ConversationUpdated,
                json!({"conversationId": format!("c{}", n), "channelId": "ch1"}),
                None,
            )
            .await;
        failed.push(report.failed);
    }

    // the queue refuses jobs once full and the processor reports the drop
    assert_eq!(failed, vec![0, 0, 1, 1, 1]);

    let recent = services.history().recent(100).await.unwrap();
    assert_eq!(recent.len(), 3);
    assert_eq!(recent[0].payload["conversationId"], "c4");
    assert_eq!(recent[2].payload["conversationId"], "c2");
}

#[tokio::test]
async fn test_shutdown_detaches_processor() {
    let h = harness(AppConfig::default()).await;
    let bus = h.services.bus().clone();

    assert_eq!(h.services.shutdown(), 7);

    let report = bus
        .emit(
            EventType::ConversationCreated,
            json!({"conversationId": "c1", "channelId": "ch1"}),
            None,
        )
        .await;
    assert_eq!(report.handlers, 0);
    assert_eq!(h.handled.load(Ordering::SeqCst), 0);
}

#[tokio::test]
#[ignore = "requires a running Redis server"]
async fn test_redis_queue_from_config() {
    let config = AppConfig {
        queue_url: Some("redis://127.0.0.1:6379".to_string()),
        queue_name: "parley_test".to_string(),
        ..AppConfig::default()
    };

    let services = Services::builder(config).build().await.unwrap();
    let report = services
        .bus()
        .emit(
            EventType::ConversationUpdated,
            json!({"conversationId": "c1", "channelId": "ch1"}),
            None,
        )
        .await;
    assert_eq!(report.failed, 0);
}
