//! Error types for queue operations.

use thiserror::Error;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Queue-specific errors.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Redis error
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Priority outside 1..=9
    #[error("Invalid job priority: {0}")]
    InvalidPriority(u8),

    /// Queue is full
    #[error("Queue is full")]
    QueueFull,

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Backend refused or lost the job
    #[error("Queue unavailable: {0}")]
    Unavailable(String),
}
