//! Upstream client: one forward call to a resolved target.
//!
//! # Responsibilities
//! - Replay the inbound method, headers, body and cookies against the target
//! - Bound each call with the configured request timeout
//! - Follow upstream redirects so callers never see an intermediate 3xx
//! - Classify transport failures (timeout / connection / other)
//!
//! No logging and no retries happen here; the retry coordinator owns both.

use std::time::Duration;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderName, HeaderValue, StatusCode};
use futures_util::future::BoxFuture;
use thiserror::Error;
use url::Url;

use crate::http::request::ProxyRequest;

/// Maximum number of upstream redirects followed for a single call.
const MAX_REDIRECTS: usize = 10;

/// Codings the content normalizer can reverse; sent upstream in place of
/// whatever the browser advertised.
const ACCEPTED_CODINGS: &str = "gzip, deflate";

/// Request headers never replayed upstream. `Host` must reflect the target,
/// and the framing headers are recomputed for the buffered body.
const SKIPPED_REQUEST_HEADERS: [HeaderName; 4] = [
    header::HOST,
    header::CONTENT_LENGTH,
    header::TRANSFER_ENCODING,
    header::CONNECTION,
];

/// Transport-level failure of a forward call.
#[derive(Debug, Error)]
pub enum ForwardError {
    /// The upstream did not answer within the request timeout.
    #[error("upstream timed out after {0:?}")]
    Timeout(Duration),

    /// Connection refused, DNS failure, reset during connect.
    #[error("upstream connection failed: {0}")]
    Connection(String),

    /// Any other failure while sending the request or reading the body.
    #[error("upstream transport error: {0}")]
    Transport(String),

    /// The target URL could not be built.
    #[error("invalid upstream target: {0}")]
    InvalidTarget(String),
}

/// Fully resolved URL a request is forwarded to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamTarget {
    url: Url,
}

impl UpstreamTarget {
    /// Join `suffix` onto `base` and append the inbound query string.
    ///
    /// A trailing slash on `suffix` is preserved (`checklist/` stays a
    /// directory path on the dev server).
    pub fn new(base: &Url, suffix: &str, query: Option<&str>) -> Result<Self, ForwardError> {
        let mut raw = format!(
            "{}/{}",
            base.as_str().trim_end_matches('/'),
            suffix.trim_start_matches('/')
        );
        if let Some(query) = query.filter(|q| !q.is_empty()) {
            raw.push(if raw.contains('?') { '&' } else { '?' });
            raw.push_str(query);
        }

        let url = Url::parse(&raw).map_err(|e| ForwardError::InvalidTarget(format!("{raw}: {e}")))?;
        Ok(Self { url })
    }

    pub fn url(&self) -> &Url {
        &self.url
    }

    pub fn as_str(&self) -> &str {
        self.url.as_str()
    }
}

impl std::fmt::Display for UpstreamTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.url.as_str())
    }
}

/// Raw upstream answer, body fully buffered and untouched.
#[derive(Debug, Clone)]
pub struct UpstreamResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Bytes,
}

impl UpstreamResponse {
    /// Declared `Content-Type`, if present and valid UTF-8.
    pub fn content_type(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
    }

    /// Declared `Content-Encoding`, if present and valid UTF-8.
    pub fn content_encoding(&self) -> Option<&str> {
        self.headers
            .get(header::CONTENT_ENCODING)
            .and_then(|v| v.to_str().ok())
    }
}

/// Capability to issue a single forward call.
///
/// Held as `Arc<dyn UpstreamClient>` by the retry coordinator so tests can
/// swap in a scripted double.
pub trait UpstreamClient: Send + Sync {
    fn forward<'a>(
        &'a self,
        request: &'a ProxyRequest,
        target: &'a UpstreamTarget,
    ) -> BoxFuture<'a, Result<UpstreamResponse, ForwardError>>;
}

/// `reqwest`-backed upstream client. Clones share one connection pool.
#[derive(Debug, Clone)]
pub struct ReqwestUpstream {
    http: reqwest::Client,
    timeout: Duration,
}

impl ReqwestUpstream {
    /// Build a client with a fixed per-call timeout.
    ///
    /// Automatic response decompression stays off: the content normalizer
    /// must see the bytes exactly as the upstream sent them.
    pub fn new(timeout: Duration) -> Result<Self, ForwardError> {
        let http = reqwest::Client::builder()
            .timeout(timeout)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .build()
            .map_err(|e| ForwardError::Transport(e.to_string()))?;

        Ok(Self { http, timeout })
    }

    fn classify(&self, err: reqwest::Error) -> ForwardError {
        if err.is_timeout() {
            ForwardError::Timeout(self.timeout)
        } else if err.is_connect() {
            ForwardError::Connection(err.to_string())
        } else {
            ForwardError::Transport(err.to_string())
        }
    }
}

impl UpstreamClient for ReqwestUpstream {
    fn forward<'a>(
        &'a self,
        request: &'a ProxyRequest,
        target: &'a UpstreamTarget,
    ) -> BoxFuture<'a, Result<UpstreamResponse, ForwardError>> {
        Box::pin(async move {
            let headers = forwardable_headers(request.headers());

            let mut builder = self
                .http
                .request(request.method().clone(), target.url().clone())
                .headers(headers);
            if !request.body().is_empty() {
                builder = builder.body(request.body().clone());
            }

            let response = builder.send().await.map_err(|e| self.classify(e))?;
            let status = response.status();
            let headers = response.headers().clone();
            let body = response.bytes().await.map_err(|e| self.classify(e))?;

            Ok(UpstreamResponse {
                status,
                headers,
                body,
            })
        })
    }
}

/// Copy of the inbound headers minus the ones that must not travel upstream.
/// Cookies ride along in the `Cookie` header untouched. `Accept-Encoding` is
/// pinned to the codings `normalize` can reverse.
pub fn forwardable_headers(inbound: &HeaderMap) -> HeaderMap {
    let mut headers = inbound.clone();
    for name in SKIPPED_REQUEST_HEADERS.iter() {
        headers.remove(name);
    }
    headers.insert(header::ACCEPT_ENCODING, HeaderValue::from_static(ACCEPTED_CODINGS));
    headers
}
