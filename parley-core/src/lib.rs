//! HTTP core for Parley
//!
//! Request and response wrappers, an error type that knows its status code,
//! a method + path [`Router`], the hyper-based [`Server`] loop and logging
//! initialization.
//!
//! ```no_run
//! use parley_core::*;
//!
//! # async fn example() -> Result<(), Error> {
//! let mut router = Router::new();
//! router.get("/health", |_req| async {
//!     HttpResponse::ok().with_json(&serde_json::json!({"status": "ok"}))
//! });
//!
//! Server::new(router, ServerConfig::new("127.0.0.1", 3000))
//!     .listen()
//!     .await
//! # }
//! ```

pub mod error;
pub mod http;
pub mod logging;
pub mod method;
pub mod routing;
pub mod server;

pub use error::Error;
pub use http::{HttpRequest, HttpResponse};
pub use method::HttpMethod;
pub use routing::{HandlerFn, Route, Router, error_response};
pub use server::{DEFAULT_MAX_BODY_BYTES, Server, ServerConfig};
