//! Startup errors

use thiserror::Error;

/// Errors raised while wiring the service together
#[derive(Error, Debug)]
pub enum ServiceError {
    #[error("Priority threshold {0} is outside 1..=9")]
    InvalidThreshold(u8),

    #[error(transparent)]
    Config(#[from] parley_config::ConfigError),

    #[error(transparent)]
    Queue(#[from] parley_queue::QueueError),

    #[error(transparent)]
    Dispatch(#[from] parley_dispatch::DispatchError),

    #[error(transparent)]
    Server(#[from] parley_core::Error),
}
