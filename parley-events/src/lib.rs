//! In-process events for Parley
//!
//! This crate provides the typed event bus that decouples event producers
//! (webhooks, the internal API) from consumers (the conversation event
//! processor), along with the per-type priority table and the projection of
//! events into the conversation domain.
//!
//! ## Features
//!
//! - **Event Bus** - Publish/subscribe keyed by [`EventType`]
//! - **Isolation** - A failing or panicking handler never stops its siblings
//! - **Unsubscribe** - Every registration returns a [`Subscription`]
//! - **Priorities** - [`PriorityTable`] maps each type to 1..=9
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use parley_events::*;
//!
//! #[tokio::main]
//! async fn main() {
//!     let bus = EventBus::new();
//!
//!     let subscription = bus.on_fn(EventType::MessageCreated, "printer", |event| async move {
//!         println!("received {}", event.event_type);
//!         Ok(())
//!     });
//!
//!     let report = bus
//!         .emit(
//!             EventType::MessageCreated,
//!             serde_json::json!({"conversationId": "c1", "channelId": "ch1"}),
//!             Some("docs".to_string()),
//!         )
//!         .await;
//!     assert_eq!(report.handlers, 1);
//!
//!     subscription.unsubscribe();
//! }
//! ```
//!
//! ## Sequential Handling
//!
//! ```rust,ignore
//! let bus = EventBusBuilder::new()
//!     .async_handling(false)   // await handlers one by one, in order
//!     .enable_logging(true)
//!     .build();
//! ```

pub mod bus;
pub mod conversation;
pub mod event;
pub mod priority;

pub use bus::{EmitReport, EventBus, EventBusBuilder, EventBusConfig, EventEmitter, Subscription};
pub use conversation::{ConversationEvent, map_to_conversation_event};
pub use event::{
    Event, EventCategory, EventHandler, EventHandlerError, EventType, FnHandler, UnknownEventType,
};
pub use priority::{DEFAULT_PRIORITY_THRESHOLD, InvalidPriority, Priority, PriorityTable};
