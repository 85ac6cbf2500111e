//! Parley - conversation event dispatch
//!
//! Webhooks and internal API calls become typed events on an in-process
//! [`EventBus`](parley_events::EventBus). Conversation and message events are
//! routed by priority: urgent ones go straight to a
//! [`ConversationHandler`](parley_dispatch::ConversationHandler), the rest
//! become `process_conversation_event` jobs on a
//! [`JobQueue`](parley_queue::JobQueue).
//!
//! # Example
//!
//! ```rust,no_run
//! use parley::{AppConfig, Services};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = AppConfig::builder().load()?;
//!     let services = Services::builder(config).build().await?;
//!     services.server().listen().await?;
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod services;

pub use error::ServiceError;
pub use services::{HEALTH_ROUTE, Services, ServicesBuilder};

pub use parley_audit;
pub use parley_config;
pub use parley_core;
pub use parley_dispatch;
pub use parley_events;
pub use parley_queue;
pub use parley_webhooks;

pub use parley_config::{AppConfig, Environment};
pub use parley_dispatch::{ConversationHandler, EventProcessor};
pub use parley_events::{Event, EventBus, EventType};
