// File: src/handler.rs
// Purpose: Request/response types and the handler trait functions implement

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, Method, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use serde_json::{Map, Value as JsonValue};

use crate::env::FunctionEnv;

// ============================================================================
// Request
// ============================================================================

/// Parsed request body
#[derive(Debug, Clone, Default, PartialEq)]
pub enum RequestBody {
    #[default]
    Empty,
    Json(JsonValue),
    Form(Vec<(String, String)>),
    Raw(Bytes),
}

impl RequestBody {
    /// JSON view of the body; an absent body reads as `{}`
    pub fn to_json(&self) -> JsonValue {
        match self {
            RequestBody::Empty => JsonValue::Object(Map::new()),
            RequestBody::Json(value) => value.clone(),
            RequestBody::Form(fields) => JsonValue::Object(
                fields
                    .iter()
                    .map(|(k, v)| (k.clone(), JsonValue::String(v.clone())))
                    .collect(),
            ),
            RequestBody::Raw(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        }
    }
}

/// Everything a function sees about the incoming request
#[derive(Debug, Clone)]
pub struct FunctionRequest {
    pub method: Method,
    pub uri: Uri,
    pub headers: HeaderMap,
    /// Route parameters, e.g. `id` for `/users/:id`
    pub params: HashMap<String, String>,
    pub query: HashMap<String, String>,
    pub body: RequestBody,
}

impl FunctionRequest {
    pub fn new(method: Method, uri: Uri) -> Self {
        Self {
            method,
            uri,
            headers: HeaderMap::new(),
            params: HashMap::new(),
            query: HashMap::new(),
            body: RequestBody::Empty,
        }
    }

    pub fn path(&self) -> &str {
        self.uri.path()
    }

    pub fn param(&self, name: &str) -> Option<&str> {
        self.params.get(name).map(String::as_str)
    }

    pub fn query(&self, name: &str) -> Option<&str> {
        self.query.get(name).map(String::as_str)
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    /// Wire form handed to out-of-process functions
    pub fn to_json(&self) -> JsonValue {
        let headers: Map<String, JsonValue> = self
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), JsonValue::String(v.to_string())))
            })
            .collect();

        serde_json::json!({
            "method": self.method.as_str(),
            "path": self.path(),
            "query": self.query,
            "params": self.params,
            "headers": headers,
            "body": self.body.to_json(),
        })
    }
}

// ============================================================================
// Response
// ============================================================================

/// Response produced by a function
#[derive(Debug, Clone)]
pub struct FunctionResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl Default for FunctionResponse {
    fn default() -> Self {
        Self::new(StatusCode::OK)
    }
}

impl FunctionResponse {
    pub fn new(status: StatusCode) -> Self {
        Self {
            status,
            headers: HeaderMap::new(),
            body: Bytes::new(),
        }
    }

    /// Empty body with the given status
    pub fn empty(status: StatusCode) -> Self {
        Self::new(status)
    }

    pub fn text(body: impl Into<String>) -> Self {
        Self::new(StatusCode::OK)
            .with_header(header::CONTENT_TYPE.as_str(), "text/plain; charset=utf-8")
            .with_body(body.into())
    }

    pub fn json(value: &JsonValue) -> Self {
        Self::new(StatusCode::OK)
            .with_header(header::CONTENT_TYPE.as_str(), "application/json")
            .with_body(value.to_string())
    }

    pub fn with_status(mut self, status: StatusCode) -> Self {
        self.status = status;
        self
    }

    /// Adds a header; invalid names or values are dropped
    pub fn with_header(mut self, name: &str, value: &str) -> Self {
        if let (Ok(name), Ok(value)) = (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            self.headers.insert(name, value);
        }
        self
    }

    pub fn with_body(mut self, body: impl Into<Bytes>) -> Self {
        self.body = body.into();
        self
    }
}

impl IntoResponse for FunctionResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;
        response
    }
}

// ============================================================================
// Handler trait
// ============================================================================

/// A compiled function
#[async_trait]
pub trait FunctionHandler: Send + Sync {
    async fn call(&self, request: FunctionRequest, env: FunctionEnv) -> anyhow::Result<FunctionResponse>;
}

/// Handler shared between the route table and in-flight requests
pub type SharedHandler = Arc<dyn FunctionHandler>;

/// Adapter turning an async closure into a [`FunctionHandler`]
pub struct FnHandler<F>(F);

#[async_trait]
impl<F, Fut> FunctionHandler for FnHandler<F>
where
    F: Fn(FunctionRequest, FunctionEnv) -> Fut + Send + Sync,
    Fut: Future<Output = anyhow::Result<FunctionResponse>> + Send + 'static,
{
    async fn call(&self, request: FunctionRequest, env: FunctionEnv) -> anyhow::Result<FunctionResponse> {
        (self.0)(request, env).await
    }
}

/// Wraps an async closure as a shared handler
///
/// ```
/// use launch_functions::{handler_fn, FunctionResponse};
///
/// let hello = handler_fn(|req, _env| async move {
///     Ok(FunctionResponse::text(format!("hello {}", req.path())))
/// });
/// # let _ = hello;
/// ```
pub fn handler_fn<F, Fut>(f: F) -> SharedHandler
where
    F: Fn(FunctionRequest, FunctionEnv) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = anyhow::Result<FunctionResponse>> + Send + 'static,
{
    Arc::new(FnHandler(f))
}
