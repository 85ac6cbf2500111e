//! Downstream conversation handlers

use crate::DispatchError;
use async_trait::async_trait;
use parley_events::ConversationEvent;
use std::future::Future;
use tracing::info;

/// Receives conversation events that are processed immediately.
#[async_trait]
pub trait ConversationHandler: Send + Sync {
    async fn process(&self, event: &ConversationEvent) -> Result<(), DispatchError>;

    /// Name used in logs
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }
}

/// Default handler: records the normalized event in the log stream.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingConversationHandler;

#[async_trait]
impl ConversationHandler for TracingConversationHandler {
    async fn process(&self, event: &ConversationEvent) -> Result<(), DispatchError> {
        info!(
            conversation_id = %event.conversation_id,
            channel_id = %event.channel_id,
            assigned_to = event.assigned_to.as_deref().unwrap_or(""),
            event_type = event.metadata.get("eventType").and_then(|v| v.as_str()).unwrap_or(""),
            "Processing conversation event"
        );
        Ok(())
    }

    fn name(&self) -> &str {
        "tracing"
    }
}

/// Adapter turning an async closure into a [`ConversationHandler`].
pub struct FnConversationHandler<F> {
    name: String,
    f: F,
}

impl<F, Fut> FnConversationHandler<F>
where
    F: Fn(ConversationEvent) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), DispatchError>> + Send,
{
    pub fn new(name: impl Into<String>, f: F) -> Self {
        Self {
            name: name.into(),
            f,
        }
    }
}

#[async_trait]
impl<F, Fut> ConversationHandler for FnConversationHandler<F>
where
    F: Fn(ConversationEvent) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), DispatchError>> + Send,
{
    async fn process(&self, event: &ConversationEvent) -> Result<(), DispatchError> {
        (self.f)(event.clone()).await
    }

    fn name(&self) -> &str {
        &self.name
    }
}
