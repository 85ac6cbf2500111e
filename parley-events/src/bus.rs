//! Event Bus implementation

use crate::event::{Event, EventHandler, EventHandlerError, EventType, FnHandler};
use async_trait::async_trait;
use dashmap::DashMap;
use futures::FutureExt;
use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, error, info};
use uuid::Uuid;

type HandlerMap = DashMap<EventType, Vec<Registered>>;

#[derive(Clone)]
struct Registered {
    id: u64,
    handler: Arc<dyn EventHandler>,
}

/// Event bus for in-process event publishing and handling
#[derive(Clone)]
pub struct EventBus {
    /// Handlers registered for each event type, in registration order
    handlers: Arc<HandlerMap>,

    next_id: Arc<AtomicU64>,

    /// Configuration
    config: Arc<EventBusConfig>,
}

/// Event bus configuration
#[derive(Debug, Clone)]
pub struct EventBusConfig {
    /// Run handlers as concurrent tasks instead of awaiting them in order
    pub async_handling: bool,

    /// Enable event logging
    pub enable_logging: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            async_handling: true,
            enable_logging: true,
        }
    }
}

/// Outcome of one emission
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EmitReport {
    pub event_id: Uuid,

    /// Handlers invoked
    pub handlers: usize,

    /// Handlers that returned an error or panicked
    pub failed: usize,
}

impl EmitReport {
    pub fn succeeded(&self) -> usize {
        self.handlers - self.failed
    }
}

/// Handle for one registered handler.
///
/// Dropping it leaves the handler registered; call
/// [`Subscription::unsubscribe`] to remove it.
#[derive(Debug)]
pub struct Subscription {
    id: u64,
    event_type: EventType,
    handlers: Weak<HandlerMap>,
}

impl Subscription {
    pub fn event_type(&self) -> EventType {
        self.event_type
    }

    /// Remove exactly this handler. Returns false if it was already gone.
    pub fn unsubscribe(self) -> bool {
        let Some(handlers) = self.handlers.upgrade() else {
            return false;
        };

        let removed = match handlers.get_mut(&self.event_type) {
            Some(mut registered) => {
                let before = registered.len();
                registered.retain(|entry| entry.id != self.id);
                registered.len() != before
            }
            None => false,
        };
        handlers.remove_if(&self.event_type, |_, registered| registered.is_empty());

        if removed {
            debug!(event_type = %self.event_type, handler_id = self.id, "Unsubscribed handler");
        }
        removed
    }
}

impl EventBus {
    /// Create new event bus
    pub fn new() -> Self {
        Self::with_config(EventBusConfig::default())
    }

    /// Create event bus with custom config
    pub fn with_config(config: EventBusConfig) -> Self {
        Self {
            handlers: Arc::new(DashMap::new()),
            next_id: Arc::new(AtomicU64::new(1)),
            config: Arc::new(config),
        }
    }

    pub fn builder() -> EventBusBuilder {
        EventBusBuilder::new()
    }

    /// Subscribe a handler to an event type
    ///
    /// Handlers for the same type are invoked in registration order. The same
    /// handler may be registered more than once.
    ///
    /// # Examples
    ///
    /// ```rust,ignore
    /// let bus = EventBus::new();
    /// let subscription = bus.on(EventType::MessageCreated, Arc::new(MyHandler));
    /// subscription.unsubscribe();
    /// ```
    pub fn on(&self, event_type: EventType, handler: Arc<dyn EventHandler>) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);

        if self.config.enable_logging {
            debug!(
                event_type = %event_type,
                handler = handler.name(),
                handler_id = id,
                "Subscribed handler"
            );
        }

        self.handlers
            .entry(event_type)
            .or_default()
            .push(Registered { id, handler });

        Subscription {
            id,
            event_type,
            handlers: Arc::downgrade(&self.handlers),
        }
    }

    /// Subscribe an async closure
    pub fn on_fn<F, Fut>(&self, event_type: EventType, name: &str, f: F) -> Subscription
    where
        F: Fn(Event) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<(), EventHandlerError>> + Send + 'static,
    {
        self.on(event_type, Arc::new(FnHandler::new(name, f)))
    }

    /// Build an event stamped now and publish it
    pub async fn emit(
        &self,
        event_type: EventType,
        payload: serde_json::Value,
        source: Option<String>,
    ) -> EmitReport {
        self.publish(Event::new(event_type, payload).with_source_opt(source))
            .await
    }

    /// Publish an event
    ///
    /// Every handler registered for the event type runs, and this returns only
    /// once all of them have settled. Handler failures are logged and counted,
    /// never propagated. With no handlers registered this is a no-op.
    pub async fn publish(&self, event: Event) -> EmitReport {
        // clone out of the map so no shard lock is held across awaits
        let handlers = self
            .handlers
            .get(&event.event_type)
            .map(|registered| registered.clone())
            .unwrap_or_default();

        let mut report = EmitReport {
            event_id: event.id,
            handlers: handlers.len(),
            failed: 0,
        };

        if handlers.is_empty() {
            debug!(event_type = %event.event_type, event_id = %event.id, "No handlers registered");
            return report;
        }

        if self.config.enable_logging {
            info!(
                event_type = %event.event_type,
                event_id = %event.id,
                handlers = handlers.len(),
                "Publishing event"
            );
        }

        let event = Arc::new(event);

        if self.config.async_handling {
            let mut tasks = Vec::with_capacity(handlers.len());

            for entry in &handlers {
                let handler = entry.handler.clone();
                let event = event.clone();
                let task = tokio::spawn(async move { handler.handle(&event).await });
                tasks.push((entry, task));
            }

            for (entry, task) in tasks {
                let result = match task.await {
                    Ok(result) => result,
                    Err(e) => Err(EventHandlerError::Panicked(e.to_string())),
                };
                if let Err(e) = result {
                    report.failed += 1;
                    log_failure(entry, &event, &e);
                }
            }
        } else {
            for entry in &handlers {
                let result = AssertUnwindSafe(entry.handler.handle(&event))
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|_| {
                        Err(EventHandlerError::Panicked("handler panicked".to_string()))
                    });
                if let Err(e) = result {
                    report.failed += 1;
                    log_failure(entry, &event, &e);
                }
            }
        }

        if self.config.enable_logging {
            debug!(
                event_type = %event.event_type,
                event_id = %event.id,
                failed = report.failed,
                "Event published"
            );
        }

        report
    }

    /// Remove every handler for an event type
    pub fn unsubscribe_all(&self, event_type: EventType) {
        self.handlers.remove(&event_type);

        if self.config.enable_logging {
            debug!(event_type = %event_type, "Unsubscribed all handlers");
        }
    }

    /// Clear all handlers
    pub fn clear(&self) {
        self.handlers.clear();
        if self.config.enable_logging {
            info!("Cleared all event handlers");
        }
    }

    /// Get handler count for an event type
    pub fn handler_count(&self, event_type: EventType) -> usize {
        self.handlers
            .get(&event_type)
            .map(|h| h.len())
            .unwrap_or(0)
    }
}

fn log_failure(entry: &Registered, event: &Event, e: &EventHandlerError) {
    error!(
        event_type = %event.event_type,
        event_id = %event.id,
        handler = entry.handler.name(),
        error = %e,
        "Event handler failed"
    );
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

/// Anything events can be published into.
///
/// Ingest endpoints depend on this rather than on [`EventBus`] directly.
#[async_trait]
pub trait EventEmitter: Send + Sync {
    async fn publish(&self, event: Event) -> EmitReport;

    async fn emit(
        &self,
        event_type: EventType,
        payload: serde_json::Value,
        source: Option<String>,
    ) -> EmitReport {
        self.publish(Event::new(event_type, payload).with_source_opt(source))
            .await
    }
}

#[async_trait]
impl EventEmitter for EventBus {
    async fn publish(&self, event: Event) -> EmitReport {
        EventBus::publish(self, event).await
    }
}

/// Event bus builder
pub struct EventBusBuilder {
    config: EventBusConfig,
}

impl EventBusBuilder {
    /// Create new event bus builder
    pub fn new() -> Self {
        Self {
            config: EventBusConfig::default(),
        }
    }

    /// Enable/disable concurrent handler execution
    pub fn async_handling(mut self, enabled: bool) -> Self {
        self.config.async_handling = enabled;
        self
    }

    /// Enable/disable logging
    pub fn enable_logging(mut self, enabled: bool) -> Self {
        self.config.enable_logging = enabled;
        self
    }

    /// Build the event bus
    pub fn build(self) -> EventBus {
        EventBus::with_config(self.config)
    }
}

impl Default for EventBusBuilder {
    fn default() -> Self {
        Self::new()
    }
}
