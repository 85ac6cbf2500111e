//! Webhook and internal API ingest for Parley
//!
//! Two endpoints feed the [`parley_events::EventBus`]:
//!
//! - `POST /api/webhooks/events` accepts provider webhooks, maps their event
//!   names onto internal [`parley_events::EventType`]s and, in production,
//!   requires an HMAC-SHA256 signature.
//! - `POST /api/events/emit` lets trusted internal callers publish events,
//!   guarded in production by an origin check and an API key.
//!
//! # Example
//!
//! ```rust,no_run
//! use parley_core::Router;
//! use parley_events::EventBus;
//! use parley_webhooks::{IngestConfig, IngestService};
//! use std::sync::Arc;
//!
//! let bus = EventBus::new();
//! let ingest = Arc::new(IngestService::new(
//!     Arc::new(bus.clone()),
//!     IngestConfig::production()
//!         .with_webhook_secret("whsec")
//!         .with_api_secret_key("internal-key"),
//! ));
//!
//! let mut router = Router::new();
//! ingest.routes(&mut router);
//! ```
//!
//! # Signing webhooks
//!
//! ```rust
//! use parley_webhooks::WebhookSignature;
//!
//! let signer = WebhookSignature::new("whsec");
//! let header = signer.sign(br#"{"event_type":"conversation.new","payload":{}}"#).unwrap();
//! assert!(header.starts_with("t="));
//! ```

pub mod error;
pub mod ingest;
pub mod mapping;
pub mod payload;
pub mod receiver;
pub mod signature;

pub use error::{IngestError, Result};
pub use ingest::{EMIT_ROUTE, IngestConfig, IngestService, WEBHOOK_ROUTE};
pub use mapping::resolve_event_type;
pub use payload::{EmitBody, WebhookBody};
pub use receiver::WebhookReceiver;
pub use signature::{DEFAULT_TOLERANCE_SECS, WebhookSignature, headers};
