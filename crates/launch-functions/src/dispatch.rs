// File: src/dispatch.rs
// Purpose: Per-request routing, body parsing and the handler fault boundary

use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use axum::body::{to_bytes, Bytes};
use axum::extract::{Request, State};
use axum::http::{header, HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use futures::FutureExt;
use launch_router::RouteTable;
use tracing::{debug, error, warn};

use crate::env::FunctionEnv;
use crate::handler::{FunctionRequest, RequestBody};
use crate::resource::FunctionResource;

/// Application state shared across requests
#[derive(Clone)]
pub(crate) struct AppState {
    pub table: Arc<RouteTable<FunctionResource>>,
    pub env: FunctionEnv,
    pub body_limit: usize,
}

/// Body could not be turned into a [`RequestBody`]
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum BodyError {
    MalformedJson,
}

/// Single entry point for every method and path
pub(crate) async fn dispatch(State(state): State<AppState>, request: Request) -> Response {
    let (parts, body) = request.into_parts();
    let path = parts.uri.path().to_string();

    let Some(found) = state.table.at(&path) else {
        debug!("No function for {} {}", parts.method, path);
        return StatusCode::NOT_FOUND.into_response();
    };

    let bytes = match to_bytes(body, state.body_limit).await {
        Ok(bytes) => bytes,
        Err(e) => {
            warn!("Rejected body for {} {}: {}", parts.method, path, e);
            return StatusCode::PAYLOAD_TOO_LARGE.into_response();
        }
    };

    let body = match parse_body(&parts.headers, bytes) {
        Ok(body) => body,
        Err(BodyError::MalformedJson) => {
            debug!("Malformed JSON body for {} {}", parts.method, path);
            return StatusCode::BAD_REQUEST.into_response();
        }
    };

    let function_request = FunctionRequest {
        query: parts.uri.query().map(parse_urlencoded).unwrap_or_default().into_iter().collect(),
        method: parts.method,
        uri: parts.uri,
        headers: parts.headers,
        params: found.params,
        body,
    };

    let resource = found.value;
    let env = state.env.clone();
    // The call itself runs inside the boundary; a handler may panic before it
    // hands back a future
    let invocation = async { resource.handler.call(function_request, env).await };

    match AssertUnwindSafe(invocation).catch_unwind().await {
        Ok(Ok(response)) => response.into_response(),
        Ok(Err(e)) => {
            error!("Function {:?} failed: {:#}", resource.source_path, e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
        Err(panic) => {
            error!("Function {:?} panicked: {}", resource.source_path, panic_message(&*panic));
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

/// Parses JSON and URL-encoded bodies by content type; anything else stays raw
pub(crate) fn parse_body(headers: &HeaderMap, bytes: Bytes) -> Result<RequestBody, BodyError> {
    if bytes.is_empty() {
        return Ok(RequestBody::Empty);
    }

    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("");

    if content_type.contains("application/json") {
        serde_json::from_slice(&bytes)
            .map(RequestBody::Json)
            .map_err(|_| BodyError::MalformedJson)
    } else if content_type.contains("application/x-www-form-urlencoded") {
        Ok(RequestBody::Form(parse_urlencoded(&String::from_utf8_lossy(&bytes))))
    } else {
        Ok(RequestBody::Raw(bytes))
    }
}

/// `a=1&b=two+words` → `[("a", "1"), ("b", "two words")]`
pub(crate) fn parse_urlencoded(input: &str) -> Vec<(String, String)> {
    let decode = |s: &str| {
        let s = s.replace('+', " ");
        urlencoding::decode(&s)
            .map(|d| d.into_owned())
            .unwrap_or(s)
    };

    input
        .split('&')
        .filter(|pair| !pair.is_empty())
        .map(|pair| match pair.split_once('=') {
            Some((k, v)) => (decode(k), decode(v)),
            None => (decode(pair), String::new()),
        })
        .collect()
}

fn panic_message(panic: &(dyn Any + Send)) -> &str {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s
    } else {
        "unknown panic"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;

    fn headers(content_type: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
        headers
    }

    #[test]
    fn test_parse_urlencoded() {
        assert_eq!(
            parse_urlencoded("a=1&b=two+words&c=%2Fslash&flag"),
            vec![
                ("a".to_string(), "1".to_string()),
                ("b".to_string(), "two words".to_string()),
                ("c".to_string(), "/slash".to_string()),
                ("flag".to_string(), String::new()),
            ]
        );
        assert!(parse_urlencoded("").is_empty());
    }

    #[test]
    fn test_parse_json_body() {
        let body = parse_body(&headers("application/json; charset=utf-8"), Bytes::from(r#"{"a":1}"#));
        assert_eq!(body, Ok(RequestBody::Json(serde_json::json!({ "a": 1 }))));

        let body = parse_body(&headers("application/json"), Bytes::from("{nope"));
        assert_eq!(body, Err(BodyError::MalformedJson));
    }

    #[test]
    fn test_parse_other_bodies() {
        assert_eq!(
            parse_body(&headers("application/json"), Bytes::new()),
            Ok(RequestBody::Empty)
        );
        assert_eq!(
            parse_body(&headers("text/plain"), Bytes::from("hi")),
            Ok(RequestBody::Raw(Bytes::from("hi")))
        );
        assert_eq!(
            parse_body(&HeaderMap::new(), Bytes::from("x=1")),
            Ok(RequestBody::Raw(Bytes::from("x=1")))
        );
    }

    #[test]
    fn test_panic_message() {
        let boxed: Box<dyn Any + Send> = Box::new("boom");
        assert_eq!(panic_message(&*boxed), "boom");
        let boxed: Box<dyn Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(&*boxed), "bang");
        let boxed: Box<dyn Any + Send> = Box::new(7_u8);
        assert_eq!(panic_message(&*boxed), "unknown panic");
    }
}
