//! Response handed back to the browser, and the caller-visible error taxonomy.
//!
//! # Responsibilities
//! - Carry the normalized upstream (or bundle) response to axum
//! - Map transport failures to 503/504/502 and routing misses to 404
//! - Render every error as a small JSON body with enough context to diagnose

use axum::{
    body::{Body, Bytes},
    http::{header, HeaderMap, HeaderValue, Method, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::upstream::{ForwardError, Normalized};

/// The only object handed back to the caller for a proxied path.
#[derive(Debug, Clone)]
pub struct NormalizedResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
    pub content_type: Option<String>,
    /// Re-requests the retry coordinator issued before settling on this one.
    pub retries: u32,
}

impl NormalizedResponse {
    pub fn from_upstream(status: StatusCode, normalized: Normalized, retries: u32) -> Self {
        Self {
            status,
            headers: normalized.headers,
            body: normalized.body,
            content_type: normalized.content_type,
            retries,
        }
    }

    /// A file served out of the static bundle.
    pub fn asset(body: Bytes, content_type: impl Into<String>) -> Self {
        Self {
            status: StatusCode::OK,
            headers: HeaderMap::new(),
            body,
            content_type: Some(content_type.into()),
            retries: 0,
        }
    }

    /// `307 Temporary Redirect` so the method and body survive the hop.
    pub fn redirect(location: &str) -> Result<Self, GatewayError> {
        let value = HeaderValue::from_str(location).map_err(|_| GatewayError::BadGateway {
            url: location.to_owned(),
            reason: "redirect location is not a valid header value".to_owned(),
        })?;

        let mut headers = HeaderMap::new();
        headers.insert(header::LOCATION, value);
        Ok(Self {
            status: StatusCode::TEMPORARY_REDIRECT,
            headers,
            body: Bytes::new(),
            content_type: None,
            retries: 0,
        })
    }
}

impl IntoResponse for NormalizedResponse {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status;
        *response.headers_mut() = self.headers;

        if let Some(content_type) = self.content_type {
            if !response.headers().contains_key(header::CONTENT_TYPE) {
                if let Ok(value) = HeaderValue::from_str(&content_type) {
                    response.headers_mut().insert(header::CONTENT_TYPE, value);
                }
            }
        }

        response
    }
}

/// Failures surfaced to the caller as an HTTP status.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("upstream timed out: {url}")]
    UpstreamTimeout { url: String },

    #[error("upstream unavailable: {url}")]
    UpstreamUnavailable { url: String },

    #[error("upstream request to {url} failed: {reason}")]
    BadGateway { url: String, reason: String },

    #[error("dev server unavailable: {url}")]
    DevServerDown { url: String },

    #[error("no build available to serve {path}")]
    BundleUnavailable { path: String },

    #[error("not found: {path}")]
    NotFound { path: String },

    #[error("method {method} not allowed on {path}")]
    MethodNotAllowed { method: Method, path: String },

    #[error("bad request: {0}")]
    BadRequest(String),
}

impl GatewayError {
    /// Map a transport failure against `url` to its caller-visible error.
    pub fn from_forward(err: ForwardError, url: &str) -> Self {
        let url = url.to_owned();
        match err {
            ForwardError::Timeout(_) => GatewayError::UpstreamTimeout { url },
            ForwardError::Connection(_) => GatewayError::UpstreamUnavailable { url },
            ForwardError::Transport(reason) | ForwardError::InvalidTarget(reason) => {
                GatewayError::BadGateway { url, reason }
            }
        }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::UpstreamTimeout { .. } => StatusCode::GATEWAY_TIMEOUT,
            GatewayError::UpstreamUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::BadGateway { .. } => StatusCode::BAD_GATEWAY,
            GatewayError::DevServerDown { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::BundleUnavailable { .. } => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::NotFound { .. } => StatusCode::NOT_FOUND,
            GatewayError::MethodNotAllowed { .. } => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = match &self {
            GatewayError::UpstreamTimeout { url }
            | GatewayError::UpstreamUnavailable { url }
            | GatewayError::BadGateway { url, .. }
            | GatewayError::DevServerDown { url } => {
                json!({ "error": self.to_string(), "status": status.as_u16(), "url": url })
            }
            GatewayError::BundleUnavailable { path }
            | GatewayError::NotFound { path }
            | GatewayError::MethodNotAllowed { path, .. } => {
                json!({ "error": self.to_string(), "status": status.as_u16(), "path": path })
            }
            GatewayError::BadRequest(_) => {
                json!({ "error": self.to_string(), "status": status.as_u16() })
            }
        };

        (status, Json(body)).into_response()
    }
}
