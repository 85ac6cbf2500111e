//! Startup wiring: one bus, one queue, one history store, one processor.

use crate::ServiceError;
use parley_audit::{FileHistoryStore, HistoryStore, MemoryHistoryStore};
use parley_config::AppConfig;
use parley_core::{HttpResponse, Router, Server};
use parley_dispatch::{
    AttachedProcessor, ConversationHandler, EventProcessor, TracingConversationHandler,
};
use parley_events::{EventBus, Priority, PriorityTable};
use parley_queue::{JobQueue, MemoryQueue, RedisQueue, RedisQueueConfig};
use parley_webhooks::{IngestConfig, IngestService};
use serde_json::json;
use std::sync::Arc;
use tracing::info;

/// Health check route
pub const HEALTH_ROUTE: &str = "/health";

/// The running service graph.
///
/// Built once at startup; the processor is attached to the bus for as long
/// as this value lives or until [`Services::shutdown`].
pub struct Services {
    config: AppConfig,
    bus: EventBus,
    queue: Arc<dyn JobQueue>,
    history: Arc<dyn HistoryStore>,
    ingest: Arc<IngestService>,
    attached: AttachedProcessor,
}

impl Services {
    pub fn builder(config: AppConfig) -> ServicesBuilder {
        ServicesBuilder::new(config)
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn bus(&self) -> &EventBus {
        &self.bus
    }

    pub fn queue(&self) -> &Arc<dyn JobQueue> {
        &self.queue
    }

    pub fn history(&self) -> &Arc<dyn HistoryStore> {
        &self.history
    }

    pub fn processor(&self) -> &Arc<EventProcessor> {
        self.attached.processor()
    }

    pub fn ingest(&self) -> &Arc<IngestService> {
        &self.ingest
    }

    /// Ingest endpoints plus `GET /health`
    pub fn router(&self) -> Router {
        let mut router = Router::new();
        self.ingest.clone().routes(&mut router);

        let environment = self.config.environment.as_str();
        router.get(HEALTH_ROUTE, move |_req| async move {
            HttpResponse::ok().with_json(&json!({
                "status": "ok",
                "environment": environment,
            }))
        });

        router
    }

    pub fn server(&self) -> Server {
        Server::new(self.router(), self.config.server_config())
    }

    /// Detach the processor from the bus. Returns the number of
    /// subscriptions removed.
    pub fn shutdown(self) -> usize {
        self.attached.detach()
    }
}

/// Builder for [`Services`]
pub struct ServicesBuilder {
    config: AppConfig,
    bus: Option<EventBus>,
    handler: Option<Arc<dyn ConversationHandler>>,
    queue: Option<Arc<dyn JobQueue>>,
    history: Option<Arc<dyn HistoryStore>>,
}

impl ServicesBuilder {
    pub fn new(config: AppConfig) -> Self {
        Self {
            config,
            bus: None,
            handler: None,
            queue: None,
            history: None,
        }
    }

    pub fn bus(mut self, bus: EventBus) -> Self {
        self.bus = Some(bus);
        self
    }

    /// Handler for immediate conversation events (default: log only)
    pub fn handler(mut self, handler: Arc<dyn ConversationHandler>) -> Self {
        self.handler = Some(handler);
        self
    }

    /// Use this queue instead of the one named by the configuration
    pub fn queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    /// Use this history store instead of the one named by the configuration
    pub fn history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    pub async fn build(self) -> Result<Services, ServiceError> {
        let config = self.config;

        let threshold = Priority::new(config.priority_threshold)
            .ok_or(ServiceError::InvalidThreshold(config.priority_threshold))?;

        let queue = match self.queue {
            Some(queue) => queue,
            None => connect_queue(&config).await?,
        };
        let history = self.history.unwrap_or_else(|| open_history(&config));
        let handler = self
            .handler
            .unwrap_or_else(|| Arc::new(TracingConversationHandler));
        let bus = self.bus.unwrap_or_default();

        let processor = Arc::new(
            EventProcessor::builder()
                .priorities(Arc::new(PriorityTable::standard()))
                .threshold(threshold)
                .handler(handler)
                .queue(queue.clone())
                .history(history.clone())
                .build()?,
        );
        let attached = processor.attach(&bus)?;

        let ingest = Arc::new(IngestService::new(
            Arc::new(bus.clone()),
            ingest_config(&config),
        ));

        info!(
            environment = config.environment.as_str(),
            threshold = threshold.get(),
            "Services initialized"
        );

        Ok(Services {
            config,
            bus,
            queue,
            history,
            ingest,
            attached,
        })
    }
}

async fn connect_queue(config: &AppConfig) -> Result<Arc<dyn JobQueue>, ServiceError> {
    match &config.queue_url {
        Some(url) => {
            let queue =
                RedisQueue::connect(RedisQueueConfig::new(url.clone(), config.queue_name.clone()))
                    .await?;
            info!(queue = %config.queue_name, "Using Redis job queue");
            Ok(Arc::new(queue))
        }
        None => {
            info!(
                queue = %config.queue_name,
                max_size = config.queue_max_size,
                "Using in-memory job queue"
            );
            Ok(Arc::new(
                MemoryQueue::new(config.queue_name.clone()).with_max_size(config.queue_max_size),
            ))
        }
    }
}

fn open_history(config: &AppConfig) -> Arc<dyn HistoryStore> {
    match &config.history_path {
        Some(path) => {
            info!(path = %path, "Recording event history to file");
            Arc::new(FileHistoryStore::new(path))
        }
        None => Arc::new(MemoryHistoryStore::new().with_max_records(config.history_max_records)),
    }
}

fn ingest_config(config: &AppConfig) -> IngestConfig {
    IngestConfig {
        production: config.is_production(),
        webhook_secret: config.webhook_secret.clone(),
        api_secret_key: config.api_secret_key.clone(),
        app_url: config.app_url.clone(),
        max_body_bytes: config.max_body_bytes,
        ..IngestConfig::default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use parley_config::Environment;

    #[test]
    fn test_ingest_config_follows_environment() {
        let mut config = AppConfig::default();
        assert!(!ingest_config(&config).production);

        config.environment = Environment::Production;
        config.api_secret_key = Some("key".to_string());
        let ingest = ingest_config(&config);
        assert!(ingest.production);
        assert_eq!(ingest.api_secret_key.as_deref(), Some("key"));
        assert_eq!(ingest.max_body_bytes, config.max_body_bytes);
    }

    #[tokio::test]
    async fn test_invalid_threshold_is_rejected() {
        let config = AppConfig {
            priority_threshold: 0,
            ..AppConfig::default()
        };

        let result = Services::builder(config).build().await;
        assert!(matches!(result, Err(ServiceError::InvalidThreshold(0))));
    }

    #[tokio::test]
    async fn test_defaults_use_memory_backends() {
        let services = Services::builder(AppConfig::default()).build().await.unwrap();

        assert!(services.processor().is_attached());
        assert_eq!(services.processor().threshold().get(), 7);
        assert_eq!(services.shutdown(), 7);
    }
}
