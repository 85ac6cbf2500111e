//! Event history for Parley
//!
//! Every event the conversation processor receives is recorded as an
//! [`EventHistoryRecord`]. Writes are best-effort from the processor's point
//! of view: a failing store is logged and never blocks dispatch.
//!
//! # Backends
//!
//! - [`MemoryHistoryStore`] - in-process, for tests and development
//! - [`FileHistoryStore`] - JSON lines appended to a file
//! - [`MultiHistoryStore`] - fan-out to several stores
//!
//! # Quick Start
//!
//! ```no_run
//! use parley_audit::*;
//! use parley_events::{Event, EventType};
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let store = FileHistoryStore::new("event-history.jsonl");
//! let event = Event::new(EventType::ConversationCreated, serde_json::json!({"id": "c1"}));
//!
//! store
//!     .append(&EventHistoryRecord::from_event(&event).masked(DEFAULT_MASKED_FIELDS))
//!     .await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod record;

pub use backend::*;
pub use record::*;
