//! Inbound request snapshot.
//!
//! # Responsibilities
//! - Buffer the inbound body once so every retry replays identical bytes
//! - Capture method, path, query, headers and cookies as an immutable value
//! - Detect protocol-upgrade intent
//!
//! The request id itself is assigned by tower-http's request-id layers
//! (see `server.rs`); this module only reads it back.

use std::collections::BTreeMap;

use axum::body::{Body, Bytes};
use axum::http::{header, HeaderMap, Method, Request, Uri};

use crate::http::response::GatewayError;

/// Header carrying the per-request correlation id.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Immutable snapshot of one inbound request.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    method: Method,
    path: String,
    query: Option<String>,
    headers: HeaderMap,
    body: Bytes,
    cookies: BTreeMap<String, String>,
}

impl ProxyRequest {
    pub fn new(method: Method, uri: &Uri, headers: HeaderMap, body: Bytes) -> Self {
        let cookies = parse_cookies(&headers);
        Self {
            method,
            path: uri.path().to_owned(),
            query: uri.query().map(str::to_owned),
            headers,
            body,
            cookies,
        }
    }

    /// Consume an axum request, buffering at most `limit` body bytes.
    pub async fn from_request(request: Request<Body>, limit: usize) -> Result<Self, GatewayError> {
        let (parts, body) = request.into_parts();
        let body = axum::body::to_bytes(body, limit)
            .await
            .map_err(|e| GatewayError::BadRequest(format!("unreadable request body: {e}")))?;

        Ok(Self::new(parts.method, &parts.uri, parts.headers, body))
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn query(&self) -> Option<&str> {
        self.query.as_deref()
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn cookies(&self) -> &BTreeMap<String, String> {
        &self.cookies
    }

    pub fn request_id(&self) -> &str {
        self.headers
            .get(X_REQUEST_ID)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("unknown")
    }

    /// True for handshakes such as WebSocket that need a direct connection:
    /// a non-empty `Upgrade` header, or `upgrade` among the `Connection` tokens.
    pub fn wants_upgrade(&self) -> bool {
        let upgrade = self
            .headers
            .get(header::UPGRADE)
            .map(|v| !v.as_bytes().trim_ascii().is_empty())
            .unwrap_or(false);

        upgrade
            || self
                .headers
                .get_all(header::CONNECTION)
                .iter()
                .filter_map(|v| v.to_str().ok())
                .flat_map(|v| v.split(','))
                .any(|token| token.trim().eq_ignore_ascii_case("upgrade"))
    }
}

fn parse_cookies(headers: &HeaderMap) -> BTreeMap<String, String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| {
            let (name, value) = pair.split_once('=')?;
            let name = name.trim();
            (!name.is_empty()).then(|| (name.to_owned(), value.trim().to_owned()))
        })
        .collect()
}
