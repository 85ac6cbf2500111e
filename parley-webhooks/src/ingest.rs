//! HTTP endpoints that turn external requests into bus events

use crate::mapping::resolve_event_type;
use crate::payload::{EmitBody, WebhookBody};
use crate::receiver::WebhookReceiver;
use crate::signature::{DEFAULT_TOLERANCE_SECS, constant_time_compare, headers};
use crate::{IngestError, Result};
use parley_core::{DEFAULT_MAX_BODY_BYTES, HttpRequest, HttpResponse, Router};
use parley_events::{Event, EventEmitter, EventType};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{error, info, warn};

/// Webhook receiver route
pub const WEBHOOK_ROUTE: &str = "/api/webhooks/events";

/// Internal emit route
pub const EMIT_ROUTE: &str = "/api/events/emit";

const DEFAULT_WEBHOOK_SOURCE: &str = "webhook";
const DEFAULT_EMIT_SOURCE: &str = "internal";

/// Ingest configuration
#[derive(Clone)]
pub struct IngestConfig {
    /// Enforce signatures, origin and API key checks
    pub production: bool,

    pub webhook_secret: Option<String>,

    pub api_secret_key: Option<String>,

    /// Only origin accepted by the internal emit endpoint
    pub app_url: Option<String>,

    pub signature_tolerance_secs: u64,

    pub max_body_bytes: usize,
}

impl std::fmt::Debug for IngestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IngestConfig")
            .field("production", &self.production)
            .field("webhook_secret", &self.webhook_secret.as_ref().map(|_| "***"))
            .field("api_secret_key", &self.api_secret_key.as_ref().map(|_| "***"))
            .field("app_url", &self.app_url)
            .field("signature_tolerance_secs", &self.signature_tolerance_secs)
            .field("max_body_bytes", &self.max_body_bytes)
            .finish()
    }
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            production: false,
            webhook_secret: None,
            api_secret_key: None,
            app_url: None,
            signature_tolerance_secs: DEFAULT_TOLERANCE_SECS,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl IngestConfig {
    pub fn production() -> Self {
        Self {
            production: true,
            ..Self::default()
        }
    }

    pub fn with_webhook_secret(mut self, secret: impl Into<String>) -> Self {
        self.webhook_secret = Some(secret.into());
        self
    }

    pub fn with_api_secret_key(mut self, key: impl Into<String>) -> Self {
        self.api_secret_key = Some(key.into());
        self
    }

    pub fn with_app_url(mut self, url: impl Into<String>) -> Self {
        self.app_url = Some(url.into());
        self
    }

    pub fn with_max_body_bytes(mut self, bytes: usize) -> Self {
        self.max_body_bytes = bytes;
        self
    }
}

/// The webhook and internal emit endpoints
pub struct IngestService {
    emitter: Arc<dyn EventEmitter>,
    config: IngestConfig,
    receiver: Option<WebhookReceiver>,
}

impl IngestService {
    pub fn new(emitter: Arc<dyn EventEmitter>, config: IngestConfig) -> Self {
        let receiver = match (&config.webhook_secret, config.production) {
            (Some(secret), true) => Some(
                WebhookReceiver::new(secret.clone()).with_tolerance(config.signature_tolerance_secs),
            ),
            _ => None,
        };

        Self {
            emitter,
            config,
            receiver,
        }
    }

    pub fn config(&self) -> &IngestConfig {
        &self.config
    }

    /// Register both endpoints on `router`
    pub fn routes(self: Arc<Self>, router: &mut Router) {
        let service = self.clone();
        router.post(WEBHOOK_ROUTE, move |req| {
            let service = service.clone();
            async move { Ok(service.webhook(&req).await) }
        });

        let service = self;
        router.post(EMIT_ROUTE, move |req| {
            let service = service.clone();
            async move { Ok(service.emit(&req).await) }
        });
    }

    /// `POST /api/webhooks/events`
    pub async fn webhook(&self, req: &HttpRequest) -> HttpResponse {
        match self.accept_webhook(req).await {
            Ok(()) => success(),
            Err(e) => rejected(WEBHOOK_ROUTE, e),
        }
    }

    /// `POST /api/events/emit`
    pub async fn emit(&self, req: &HttpRequest) -> HttpResponse {
        match self.accept_emit(req).await {
            Ok(()) => success(),
            Err(e) => rejected(EMIT_ROUTE, e),
        }
    }

    async fn accept_webhook(&self, req: &HttpRequest) -> Result<()> {
        self.check_size(req)?;
        let body: WebhookBody = parse_body(req)?;

        if let Some(receiver) = &self.receiver {
            receiver.verify_request(req, body.signature.as_deref(), body.payload.as_ref())?;
        }

        let event_type = resolve(&body.event_type)?;
        let payload = require_object(body.payload.clone())?;

        let mut event = Event::new(event_type, payload).with_source(
            body.source
                .clone()
                .unwrap_or_else(|| DEFAULT_WEBHOOK_SOURCE.to_string()),
        );
        if let Some(timestamp) = body.timestamp() {
            event = event.with_timestamp(timestamp);
        }

        let report = self.emitter.publish(event).await;
        info!(
            external_type = %body.event_type,
            event_type = %event_type,
            event_id = %report.event_id,
            handlers = report.handlers,
            failed = report.failed,
            "Webhook event accepted"
        );
        Ok(())
    }

    async fn accept_emit(&self, req: &HttpRequest) -> Result<()> {
        self.check_size(req)?;
        let body: EmitBody = parse_body(req)?;

        if self.config.production {
            self.check_origin(req)?;
            self.check_api_key(req, body.api_key.as_deref())?;
        }

        let event_type = resolve(&body.event_type)?;
        let payload = require_object(Some(body.payload.unwrap_or_else(|| json!({}))))?;
        let source = body
            .source
            .unwrap_or_else(|| DEFAULT_EMIT_SOURCE.to_string());

        let report = self
            .emitter
            .emit(event_type, payload, Some(source))
            .await;
        info!(
            event_type = %event_type,
            event_id = %report.event_id,
            handlers = report.handlers,
            failed = report.failed,
            "Internal event emitted"
        );
        Ok(())
    }

    fn check_size(&self, req: &HttpRequest) -> Result<()> {
        if req.body.len() > self.config.max_body_bytes {
            return Err(IngestError::PayloadTooLarge(req.body.len()));
        }
        Ok(())
    }

    /// An `Origin` header, when sent, must name the application
    fn check_origin(&self, req: &HttpRequest) -> Result<()> {
        let Some(origin) = req.header(headers::ORIGIN) else {
            return Ok(());
        };

        let allowed = self
            .config
            .app_url
            .as_deref()
            .is_some_and(|url| url.trim_end_matches('/') == origin.trim_end_matches('/'));

        if allowed {
            Ok(())
        } else {
            Err(IngestError::Forbidden(format!("origin {} not allowed", origin)))
        }
    }

    fn check_api_key(&self, req: &HttpRequest, body_key: Option<&str>) -> Result<()> {
        let Some(expected) = self.config.api_secret_key.as_deref() else {
            return Err(IngestError::Unauthorized(
                "no API key configured".to_string(),
            ));
        };

        let provided = body_key
            .or_else(|| req.header(headers::API_KEY))
            .ok_or_else(|| IngestError::Unauthorized("API key missing".to_string()))?;

        if constant_time_compare(provided, expected) {
            Ok(())
        } else {
            Err(IngestError::Unauthorized("API key mismatch".to_string()))
        }
    }
}

fn parse_body<T: DeserializeOwned>(req: &HttpRequest) -> Result<T> {
    serde_json::from_slice(&req.body).map_err(|e| IngestError::InvalidPayload(e.to_string()))
}

fn resolve(name: &str) -> Result<EventType> {
    resolve_event_type(name).ok_or_else(|| IngestError::UnknownEventType(name.to_string()))
}

fn require_object(payload: Option<Value>) -> Result<Value> {
    match payload {
        Some(payload @ Value::Object(_)) => Ok(payload),
        Some(_) => Err(IngestError::InvalidPayload(
            "payload must be a JSON object".to_string(),
        )),
        None => Err(IngestError::InvalidPayload("missing field `payload`".to_string())),
    }
}

fn success() -> HttpResponse {
    HttpResponse::ok()
        .with_json(&json!({ "success": true }))
        .unwrap_or_else(|_| HttpResponse::ok())
}

fn rejected(route: &str, err: IngestError) -> HttpResponse {
    if err.status_code() >= 500 {
        error!(route, error = %err, "Ingest failed");
    } else {
        warn!(route, status = err.status_code(), error = %err, "Ingest rejected");
    }
    err.to_response()
}
