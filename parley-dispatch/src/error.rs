//! Dispatch errors

use parley_audit::HistoryError;
use parley_queue::QueueError;
use thiserror::Error;

/// Errors raised while wiring or running the event processor.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// `attach` was called on a processor that is already subscribed
    #[error("Event processor is already attached to a bus")]
    AlreadyAttached,

    #[error("Event processor requires a job queue")]
    MissingQueue,

    /// The downstream conversation handler rejected the event
    #[error("Conversation handler failed: {0}")]
    HandlerFailed(String),

    #[error("Queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("History error: {0}")]
    History(#[from] HistoryError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
