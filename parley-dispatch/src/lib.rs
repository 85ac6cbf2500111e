//! Priority-based conversation event processing
//!
//! The [`EventProcessor`] listens on the [`parley_events::EventBus`] for
//! conversation and message events. Events at or above the priority
//! threshold (7 by default) go straight to a [`ConversationHandler`]; lower
//! priorities become `process_conversation_event` jobs on a
//! [`parley_queue::JobQueue`]. Every mapped event is also recorded in the
//! history store.
//!
//! # Quick Start
//!
//! ```no_run
//! use parley_dispatch::*;
//! use parley_events::EventBus;
//! use parley_queue::MemoryQueue;
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), DispatchError> {
//! let bus = EventBus::new();
//! let processor = Arc::new(
//!     EventProcessor::builder()
//!         .queue(Arc::new(MemoryQueue::new("conversation_events")))
//!         .build()?,
//! );
//!
//! let _attached = processor.attach(&bus)?;
//! # Ok(())
//! # }
//! ```

pub mod error;
pub mod handler;
pub mod processor;

pub use error::DispatchError;
pub use handler::{ConversationHandler, FnConversationHandler, TracingConversationHandler};
pub use processor::{
    AttachedProcessor, ConversationJob, EventProcessor, EventProcessorBuilder,
    PROCESS_CONVERSATION_EVENT_JOB, ProcessOutcome, SUBSCRIBED_EVENT_TYPES,
};
