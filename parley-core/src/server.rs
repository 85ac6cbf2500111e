// HTTP server loop

use crate::routing::error_response;
use crate::{Error, HttpRequest, HttpResponse, Router};
use bytes::Bytes;
use http_body_util::{BodyExt, Full, LengthLimitError, Limited};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Request, Response, StatusCode, body::Incoming as IncomingBody};
use hyper_util::rt::TokioIo;
use std::convert::Infallible;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{debug, error, info, warn};

/// Default request body limit (1 MiB)
pub const DEFAULT_MAX_BODY_BYTES: usize = 1024 * 1024;

/// Listener settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Bodies larger than this are rejected with 413
    pub max_body_bytes: usize,
}

impl ServerConfig {
    pub fn new(host: impl Into<String>, port: u16) -> Self {
        Self {
            host: host.into(),
            port,
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }

    pub fn with_max_body_bytes(mut self, max_body_bytes: usize) -> Self {
        self.max_body_bytes = max_body_bytes;
        self
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self::new("0.0.0.0", 3000)
    }
}

/// HTTP/1 server driving a [`Router`]
pub struct Server {
    router: Arc<Router>,
    config: ServerConfig,
}

impl Server {
    pub fn new(router: Router, config: ServerConfig) -> Self {
        Self {
            router: Arc::new(router),
            config,
        }
    }

    pub fn router(&self) -> &Router {
        &self.router
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    /// Bind the configured address
    pub async fn bind(&self) -> Result<TcpListener, Error> {
        Ok(TcpListener::bind((self.config.host.as_str(), self.config.port)).await?)
    }

    /// Bind and serve until Ctrl-C
    pub async fn listen(self) -> Result<(), Error> {
        let listener = self.bind().await?;
        self.serve(listener, shutdown_signal()).await
    }

    /// Serve connections from `listener` until `shutdown` resolves.
    ///
    /// Connections already accepted keep running on their own tasks.
    pub async fn serve<S>(self, listener: TcpListener, shutdown: S) -> Result<(), Error>
    where
        S: Future<Output = ()>,
    {
        let addr = listener.local_addr()?;
        info!(address = %addr, max_body_bytes = self.config.max_body_bytes, "Server listening");

        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutdown signal received, no longer accepting connections");
                    break;
                }
                accepted = listener.accept() => {
                    let (stream, peer) = match accepted {
                        Ok(conn) => conn,
                        Err(err) => {
                            warn!(error = %err, "Failed to accept connection");
                            continue;
                        }
                    };

                    let io = TokioIo::new(stream);
                    let router = self.router.clone();
                    let max_body_bytes = self.config.max_body_bytes;

                    tokio::spawn(async move {
                        let service = service_fn(move |req: Request<IncomingBody>| {
                            let router = router.clone();
                            async move {
                                Ok::<_, Infallible>(handle_request(req, router, max_body_bytes).await)
                            }
                        });

                        if let Err(err) = http1::Builder::new().serve_connection(io, service).await {
                            debug!(peer = %peer, error = %err, "Error serving connection");
                        }
                    });
                }
            }
        }

        Ok(())
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "Unable to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}

/// Handle an incoming HTTP request
async fn handle_request(
    req: Request<IncomingBody>,
    router: Arc<Router>,
    max_body_bytes: usize,
) -> Response<Full<Bytes>> {
    let response = match read_request(req, max_body_bytes).await {
        Ok(request) => router.dispatch(request).await,
        Err(err) => {
            debug!(error = %err, "Rejected request body");
            error_response(&err)
        }
    };

    into_hyper_response(response)
}

/// Convert a hyper request, enforcing the body limit
async fn read_request(
    req: Request<IncomingBody>,
    max_body_bytes: usize,
) -> Result<HttpRequest, Error> {
    let path = req
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());

    let mut request = HttpRequest::new(req.method().to_string(), path);

    for (name, value) in req.headers() {
        if let Ok(value_str) = value.to_str() {
            request
                .headers
                .insert(name.to_string(), value_str.to_string());
        }
    }

    let collected = Limited::new(req.into_body(), max_body_bytes)
        .collect()
        .await
        .map_err(|err| {
            if err.downcast_ref::<LengthLimitError>().is_some() {
                Error::PayloadTooLarge(format!("request body exceeds {} bytes", max_body_bytes))
            } else {
                Error::BadRequest(format!("failed to read request body: {}", err))
            }
        })?;

    request.body = collected.to_bytes().to_vec();
    Ok(request)
}

fn into_hyper_response(response: HttpResponse) -> Response<Full<Bytes>> {
    let status =
        StatusCode::from_u16(response.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    let mut builder = Response::builder().status(status);

    for (key, value) in response.headers {
        builder = builder.header(key, value);
    }

    builder
        .body(Full::new(Bytes::from(response.body)))
        .unwrap_or_else(|err| {
            error!(error = %err, "Failed to build response");
            let mut fallback = Response::new(Full::new(Bytes::new()));
            *fallback.status_mut() = StatusCode::INTERNAL_SERVER_ERROR;
            fallback
        })
}
