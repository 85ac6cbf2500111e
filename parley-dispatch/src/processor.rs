//! Conversation event processor
//!
//! Subscribes to conversation and message events on the bus. Each event is
//! mapped to a [`ConversationEvent`], written to the history store, then
//! either handed to the [`ConversationHandler`] right away or enqueued as a
//! `process_conversation_event` job, depending on its priority.

use crate::handler::{ConversationHandler, TracingConversationHandler};
use crate::DispatchError;
use async_trait::async_trait;
use parley_audit::{DEFAULT_MASKED_FIELDS, EventHistoryRecord, HistoryStore};
use parley_events::{
    ConversationEvent, Event, EventBus, EventHandler, EventHandlerError, EventType, Priority,
    PriorityTable, Subscription, map_to_conversation_event,
};
use parley_queue::{JobId, JobPriority, JobQueue};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{debug, error, info, warn};

/// Job name used for deferred conversation events
pub const PROCESS_CONVERSATION_EVENT_JOB: &str = "process_conversation_event";

/// Event types the processor subscribes to
pub const SUBSCRIBED_EVENT_TYPES: [EventType; 7] = [
    EventType::ConversationCreated,
    EventType::ConversationUpdated,
    EventType::ConversationAssigned,
    EventType::ConversationClosed,
    EventType::MessageCreated,
    EventType::MessageUpdated,
    EventType::MessageDeleted,
];

/// Payload of a `process_conversation_event` job
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversationJob {
    pub conversation_event: ConversationEvent,
    pub original_event: Event,
}

/// What happened to one event
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// Not a conversation or message event
    Ignored,
    /// Payload lacked a conversation or channel id
    Unmapped,
    /// Handled immediately
    Dispatched,
    DispatchFailed,
    /// Handed to the job queue
    Enqueued(JobId),
    EnqueueFailed,
}

impl ProcessOutcome {
    pub fn is_failure(&self) -> bool {
        matches!(
            self,
            ProcessOutcome::DispatchFailed | ProcessOutcome::EnqueueFailed
        )
    }
}

/// Routes conversation events by priority.
pub struct EventProcessor {
    priorities: Arc<PriorityTable>,
    threshold: Priority,
    handler: Arc<dyn ConversationHandler>,
    queue: Arc<dyn JobQueue>,
    history: Option<Arc<dyn HistoryStore>>,
    masked_fields: &'static [&'static str],
    attached: AtomicBool,
}

impl EventProcessor {
    pub fn builder() -> EventProcessorBuilder {
        EventProcessorBuilder::new()
    }

    pub fn threshold(&self) -> Priority {
        self.threshold
    }

    pub fn priorities(&self) -> &PriorityTable {
        &self.priorities
    }

    pub fn is_attached(&self) -> bool {
        self.attached.load(Ordering::SeqCst)
    }

    /// Subscribe this processor to every conversation and message event type.
    ///
    /// A processor can be attached once; a second call fails with
    /// [`DispatchError::AlreadyAttached`] until the returned handle is
    /// detached.
    pub fn attach(self: &Arc<Self>, bus: &EventBus) -> Result<AttachedProcessor, DispatchError> {
        if self.attached.swap(true, Ordering::SeqCst) {
            warn!("Event processor already attached, ignoring");
            return Err(DispatchError::AlreadyAttached);
        }

        let handler: Arc<dyn EventHandler> = Arc::new(ProcessorEventHandler {
            processor: self.clone(),
        });

        let subscriptions = SUBSCRIBED_EVENT_TYPES
            .iter()
            .map(|event_type| bus.on(*event_type, handler.clone()))
            .collect();

        info!(
            event_types = SUBSCRIBED_EVENT_TYPES.len(),
            threshold = self.threshold.get(),
            handler = self.handler.name(),
            queue = self.queue.name(),
            "Event processor attached"
        );

        Ok(AttachedProcessor {
            processor: self.clone(),
            subscriptions,
        })
    }

    /// Run one event through the pipeline.
    ///
    /// Never fails: every problem is logged and reflected in the outcome.
    pub async fn process(&self, event: &Event) -> ProcessOutcome {
        if !event.event_type.is_conversation_related() {
            warn!(event_type = %event.event_type, event_id = %event.id, "Ignoring non-conversation event");
            return ProcessOutcome::Ignored;
        }

        let Some(conversation_event) = map_to_conversation_event(event) else {
            warn!(
                event_type = %event.event_type,
                event_id = %event.id,
                "Event payload has no conversation or channel id, dropping"
            );
            return ProcessOutcome::Unmapped;
        };

        self.record_history(event).await;

        let priority = self.priorities.get(event.event_type);
        if priority >= self.threshold {
            self.dispatch(event, &conversation_event, priority).await
        } else {
            self.enqueue(event, conversation_event, priority).await
        }
    }

    async fn record_history(&self, event: &Event) {
        let Some(history) = &self.history else {
            return;
        };

        let record = EventHistoryRecord::from_event(event).masked(self.masked_fields);
        if let Err(e) = history.append(&record).await {
            warn!(
                event_type = %event.event_type,
                event_id = %event.id,
                error = %e,
                "Failed to record event history"
            );
        }
    }

    async fn dispatch(
        &self,
        event: &Event,
        conversation_event: &ConversationEvent,
        priority: Priority,
    ) -> ProcessOutcome {
        debug!(
            event_type = %event.event_type,
            conversation_id = %conversation_event.conversation_id,
            priority = priority.get(),
            "Processing immediately"
        );

        match self.handler.process(conversation_event).await {
            Ok(()) => ProcessOutcome::Dispatched,
            Err(e) => {
                error!(
                    event_type = %event.event_type,
                    event_id = %event.id,
                    conversation_id = %conversation_event.conversation_id,
                    handler = self.handler.name(),
                    error = %e,
                    "Immediate processing failed"
                );
                ProcessOutcome::DispatchFailed
            }
        }
    }

    async fn enqueue(
        &self,
        event: &Event,
        conversation_event: ConversationEvent,
        priority: Priority,
    ) -> ProcessOutcome {
        let conversation_id = conversation_event.conversation_id.clone();
        let result = self
            .try_enqueue(event, conversation_event, priority)
            .await;

        match result {
            Ok(job_id) => {
                debug!(
                    event_type = %event.event_type,
                    conversation_id = %conversation_id,
                    priority = priority.get(),
                    job_id = %job_id,
                    "Queued for deferred processing"
                );
                ProcessOutcome::Enqueued(job_id)
            }
            Err(e) => {
                error!(
                    event_type = %event.event_type,
                    event_id = %event.id,
                    conversation_id = %conversation_id,
                    queue = self.queue.name(),
                    error = %e,
                    "Failed to enqueue conversation event"
                );
                ProcessOutcome::EnqueueFailed
            }
        }
    }

    async fn try_enqueue(
        &self,
        event: &Event,
        conversation_event: ConversationEvent,
        priority: Priority,
    ) -> Result<JobId, DispatchError> {
        let job = ConversationJob {
            conversation_event,
            original_event: event.clone(),
        };
        let data = serde_json::to_value(&job)?;
        let priority = JobPriority::new(priority.get())?;

        Ok(self
            .queue
            .enqueue(PROCESS_CONVERSATION_EVENT_JOB, data, priority)
            .await?)
    }
}

/// Bus subscription wrapper around a shared processor
struct ProcessorEventHandler {
    processor: Arc<EventProcessor>,
}

#[async_trait]
impl EventHandler for ProcessorEventHandler {
    async fn handle(&self, event: &Event) -> Result<(), EventHandlerError> {
        let outcome = self.processor.process(event).await;
        if outcome.is_failure() {
            return Err(EventHandlerError::ProcessingError(format!("{:?}", outcome)));
        }
        Ok(())
    }

    fn name(&self) -> &str {
        "event_processor"
    }
}

/// Handle for an attached processor.
///
/// Dropping the handle leaves the processor subscribed; call
/// [`AttachedProcessor::detach`] to unsubscribe.
pub struct AttachedProcessor {
    processor: Arc<EventProcessor>,
    subscriptions: Vec<Subscription>,
}

impl AttachedProcessor {
    pub fn processor(&self) -> &Arc<EventProcessor> {
        &self.processor
    }

    /// Unsubscribe from the bus; returns how many subscriptions were removed
    pub fn detach(self) -> usize {
        let removed = self
            .subscriptions
            .into_iter()
            .map(Subscription::unsubscribe)
            .filter(|removed| *removed)
            .count();
        self.processor.attached.store(false, Ordering::SeqCst);
        info!(removed, "Event processor detached");
        removed
    }
}

/// Builder for [`EventProcessor`]
pub struct EventProcessorBuilder {
    priorities: Arc<PriorityTable>,
    threshold: Priority,
    handler: Arc<dyn ConversationHandler>,
    queue: Option<Arc<dyn JobQueue>>,
    history: Option<Arc<dyn HistoryStore>>,
    masked_fields: &'static [&'static str],
}

impl EventProcessorBuilder {
    pub fn new() -> Self {
        Self {
            priorities: Arc::new(PriorityTable::standard()),
            threshold: Priority::default_threshold(),
            handler: Arc::new(TracingConversationHandler),
            queue: None,
            history: None,
            masked_fields: DEFAULT_MASKED_FIELDS,
        }
    }

    pub fn priorities(mut self, priorities: Arc<PriorityTable>) -> Self {
        self.priorities = priorities;
        self
    }

    /// Priorities at or above `threshold` are processed immediately
    pub fn threshold(mut self, threshold: Priority) -> Self {
        self.threshold = threshold;
        self
    }

    pub fn handler(mut self, handler: Arc<dyn ConversationHandler>) -> Self {
        self.handler = handler;
        self
    }

    pub fn queue(mut self, queue: Arc<dyn JobQueue>) -> Self {
        self.queue = Some(queue);
        self
    }

    pub fn history(mut self, history: Arc<dyn HistoryStore>) -> Self {
        self.history = Some(history);
        self
    }

    /// Payload keys replaced before history records are written
    pub fn masked_fields(mut self, fields: &'static [&'static str]) -> Self {
        self.masked_fields = fields;
        self
    }

    pub fn build(self) -> Result<EventProcessor, DispatchError> {
        let queue = self.queue.ok_or(DispatchError::MissingQueue)?;

        Ok(EventProcessor {
            priorities: self.priorities,
            threshold: self.threshold,
            handler: self.handler,
            queue,
            history: self.history,
            masked_fields: self.masked_fields,
            attached: AtomicBool::new(false),
        })
    }
}

impl Default for EventProcessorBuilder {
    fn default() -> Self {
        Self::new()
    }
}
