//! Test doubles and fixtures shared by the unit tests.
//!
//! The upstream client and liveness probe are injected as trait objects, so
//! tests script their behavior here instead of opening sockets.

use std::collections::VecDeque;
use std::io::Write;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Mutex;

use axum::body::Bytes;
use axum::http::{header, HeaderMap, HeaderValue, Method, StatusCode, Uri};
use flate2::write::{GzEncoder, ZlibEncoder};
use flate2::Compression;
use futures_util::future::BoxFuture;

use crate::health::probe::{LivenessProbe, ProbeFailure};
use crate::http::request::ProxyRequest;
use crate::upstream::{ForwardError, UpstreamClient, UpstreamResponse, UpstreamTarget};

/// gzip-compress `data` in a single member.
pub fn gzip(data: &[u8]) -> Bytes {
    let mut encoder = GzEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    Bytes::from(encoder.finish().unwrap())
}

/// zlib-wrapped deflate, as HTTP `Content-Encoding: deflate` specifies.
pub fn deflate(data: &[u8]) -> Bytes {
    let mut encoder = ZlibEncoder::new(Vec::new(), Compression::default());
    encoder.write_all(data).unwrap();
    Bytes::from(encoder.finish().unwrap())
}

/// Upstream reply with the given status, content type and body.
pub fn reply(
    status: u16,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Result<UpstreamResponse, ForwardError> {
    let mut headers = HeaderMap::new();
    headers.insert(header::CONTENT_TYPE, HeaderValue::from_static(content_type));
    Ok(UpstreamResponse {
        status: StatusCode::from_u16(status).unwrap(),
        headers,
        body: body.into(),
    })
}

/// Plain GET snapshot for `uri`.
pub fn get(uri: &str) -> ProxyRequest {
    let uri: Uri = uri.parse().unwrap();
    ProxyRequest::new(Method::GET, &uri, HeaderMap::new(), Bytes::new())
}

/// Upstream client that plays back a fixed list of outcomes, one per call.
#[derive(Debug, Default)]
pub struct ScriptedUpstream {
    replies: Mutex<VecDeque<Result<UpstreamResponse, ForwardError>>>,
    targets: Mutex<Vec<String>>,
    calls: AtomicU32,
}

impl ScriptedUpstream {
    pub fn new(replies: Vec<Result<UpstreamResponse, ForwardError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> u32 {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn targets(&self) -> Vec<String> {
        self.targets.lock().unwrap().clone()
    }
}

impl UpstreamClient for ScriptedUpstream {
    fn forward<'a>(
        &'a self,
        _request: &'a ProxyRequest,
        target: &'a UpstreamTarget,
    ) -> BoxFuture<'a, Result<UpstreamResponse, ForwardError>> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.targets.lock().unwrap().push(target.to_string());
        let next = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(ForwardError::Transport("script exhausted".into())));
        Box::pin(async move { next })
    }
}

/// Probe with a fixed answer.
#[derive(Debug, Default)]
pub struct FixedProbe {
    live: bool,
    checks: AtomicU32,
}

impl FixedProbe {
    pub fn live() -> Self {
        Self {
            live: true,
            ..Default::default()
        }
    }

    pub fn down() -> Self {
        Self::default()
    }

    pub fn checks(&self) -> u32 {
        self.checks.load(Ordering::SeqCst)
    }
}

impl LivenessProbe for FixedProbe {
    fn check(&self) -> BoxFuture<'_, Result<(), ProbeFailure>> {
        self.checks.fetch_add(1, Ordering::SeqCst);
        let outcome = if self.live {
            Ok(())
        } else {
            Err(ProbeFailure::Connection("connection refused".into()))
        };
        Box::pin(async move { outcome })
    }

    fn target(&self) -> &str {
        "http://localhost:5173/"
    }
}

/// Fresh empty directory under the system temp dir.
pub fn scratch_dir() -> PathBuf {
    let dir = std::env::temp_dir().join(format!("checklist-gateway-{}", uuid::Uuid::new_v4()));
    std::fs::create_dir_all(&dir).unwrap();
    dir
}
