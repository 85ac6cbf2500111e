// Routing system for HTTP requests

use crate::{Error, HttpMethod, HttpRequest, HttpResponse};
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use tracing::{debug, error};

/// A route handler function type
pub type HandlerFn = Arc<
    dyn Fn(
            HttpRequest,
        ) -> std::pin::Pin<
            Box<dyn std::future::Future<Output = Result<HttpResponse, Error>> + Send>,
        > + Send
        + Sync,
>;

/// Route definition with handler
#[derive(Clone)]
pub struct Route {
    pub method: HttpMethod,
    pub path: String,
    pub handler: HandlerFn,
}

/// Router for managing routes and dispatching requests
pub struct Router {
    pub routes: Vec<Route>,
}

impl Router {
    pub fn new() -> Self {
        Self { routes: Vec::new() }
    }

    /// Add a route to the router
    pub fn add_route(&mut self, route: Route) {
        self.routes.push(route);
    }

    /// Register an async handler for `method path`
    pub fn handle<F, Fut>(&mut self, method: HttpMethod, path: impl Into<String>, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.add_route(Route {
            method,
            path: path.into(),
            handler: Arc::new(move |req| Box::pin(handler(req))),
        });
    }

    pub fn get<F, Fut>(&mut self, path: impl Into<String>, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.handle(HttpMethod::GET, path, handler);
    }

    pub fn post<F, Fut>(&mut self, path: impl Into<String>, handler: F)
    where
        F: Fn(HttpRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<HttpResponse, Error>> + Send + 'static,
    {
        self.handle(HttpMethod::POST, path, handler);
    }

    /// Find a route that matches the request
    ///
    /// A path that exists under another method yields `MethodNotAllowed`
    /// rather than `RouteNotFound`.
    pub async fn route(&self, mut request: HttpRequest) -> Result<HttpResponse, Error> {
        // Query strings take no part in matching
        let path = match request.path.split_once('?') {
            Some((p, _)) => p.to_string(),
            None => request.path.clone(),
        };

        let mut path_known = false;
        for route in &self.routes {
            let Some(params) = match_path(&route.path, &path) else {
                continue;
            };

            if !route.method.as_str().eq_ignore_ascii_case(&request.method) {
                path_known = true;
                continue;
            }

            request.path_params = params;
            return (route.handler)(request).await;
        }

        let target = format!("{} {}", request.method, path);
        if path_known {
            Err(Error::MethodNotAllowed(target))
        } else {
            Err(Error::RouteNotFound(target))
        }
    }

    /// Route the request and render any error as a JSON response
    pub async fn dispatch(&self, request: HttpRequest) -> HttpResponse {
        let target = format!("{} {}", request.method, request.path);
        match self.route(request).await {
            Ok(response) => response,
            Err(err) => {
                if err.is_server_error() {
                    error!(request = %target, error = %err, "Request failed");
                } else {
                    debug!(request = %target, error = %err, "Request rejected");
                }
                error_response(&err)
            }
        }
    }
}

impl Default for Router {
    fn default() -> Self {
        Self::new()
    }
}

/// JSON body `{ error, status }` for an error
pub fn error_response(err: &Error) -> HttpResponse {
    let status = err.status_code();
    let body = serde_json::json!({
        "error": err.public_message(),
        "status": status,
    });
    HttpResponse::new(status)
        .with_json(&body)
        .unwrap_or_else(|_| HttpResponse::new(status))
}

/// Match a route path pattern against a request path
/// Returns Some(params) if matched, None otherwise
fn match_path(pattern: &str, path: &str) -> Option<HashMap<String, String>> {
    let pattern_parts: Vec<&str> = pattern.split('/').filter(|s| !s.is_empty()).collect();
    let path_parts: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    if pattern_parts.len() != path_parts.len() {
        return None;
    }

    let mut params = HashMap::new();

    for (pattern_part, path_part) in pattern_parts.iter().zip(path_parts.iter()) {
        if let Some(param_name) = pattern_part.strip_prefix(':') {
            params.insert(param_name.to_string(), path_part.to_string());
        } else if pattern_part != path_part {
            return None;
        }
    }

    Some(params)
}
