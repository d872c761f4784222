//! Retry coordination for upstream calls.
//!
//! # Responsibilities
//! - Forward, normalize and validate; return as soon as the body is ready
//! - Re-request when a declared-JSON body does not parse, with growing delays
//! - After the budget is spent, hand back the last response unchanged
//! - Map transport failures straight to a caller-visible error (never retried)
//!
//! # Design Decisions
//! - Retry state is request-local; nothing is shared between requests
//! - Attempts are strictly sequential within one request
//! - The upstream client is injected, so tests run against scripted doubles

use std::sync::Arc;
use std::time::Duration;

use axum::http::Method;

use crate::config::{RetryConfig, SecurityConfig};
use crate::http::request::ProxyRequest;
use crate::http::response::{GatewayError, NormalizedResponse};
use crate::observability::metrics;
use crate::resilience::backoff::BackoffSchedule;
use crate::upstream::{is_ready, normalize, UpstreamClient, UpstreamTarget};
use crate::upstream::validate::declares_json;

/// Bounded retry policy for content errors.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Re-requests allowed after the first attempt.
    pub max_retries: u32,
    pub backoff: BackoffSchedule,
    /// Body bytes included in the exhaustion log line.
    pub snippet_bytes: usize,
    /// Largest body the normalizer will decompress.
    pub decode_limit: usize,
}

impl RetryPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            backoff: BackoffSchedule::from_millis(&config.delays_ms),
            snippet_bytes: config.snippet_bytes,
            decode_limit: SecurityConfig::default().max_decoded_size,
        }
    }

    pub fn with_decode_limit(mut self, limit: usize) -> Self {
        self.decode_limit = limit;
        self
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Per-request retry bookkeeping.
#[derive(Debug)]
pub struct RetryState<'a> {
    retries: u32,
    max_retries: u32,
    backoff: &'a BackoffSchedule,
}

impl<'a> RetryState<'a> {
    pub fn new(policy: &'a RetryPolicy) -> Self {
        Self {
            retries: 0,
            max_retries: policy.max_retries,
            backoff: &policy.backoff,
        }
    }

    pub fn retries(&self) -> u32 {
        self.retries
    }

    /// Claim the next retry, returning the delay to wait first.
    /// `None` once the budget is exhausted.
    pub fn next_delay(&mut self) -> Option<Duration> {
        if self.retries >= self.max_retries {
            return None;
        }
        self.retries += 1;
        Some(self.backoff.delay_for(self.retries))
    }
}

/// Runs the forward → normalize → validate loop for one request.
pub struct RetryCoordinator {
    client: Arc<dyn UpstreamClient>,
    policy: RetryPolicy,
}

impl RetryCoordinator {
    pub fn new(client: Arc<dyn UpstreamClient>, policy: RetryPolicy) -> Self {
        Self { client, policy }
    }

    pub async fn fetch_with_retry(
        &self,
        request: &ProxyRequest,
        target: &UpstreamTarget,
    ) -> Result<NormalizedResponse, GatewayError> {
        let request_id = request.request_id();
        let mut state = RetryState::new(&self.policy);

        loop {
            let upstream = match self.client.forward(request, target).await {
                Ok(upstream) => upstream,
                Err(e) => {
                    tracing::error!(
                        request_id = %request_id,
                        target = %target,
                        retries = state.retries(),
                        error = %e,
                        "Upstream request failed"
                    );
                    return Err(GatewayError::from_forward(e, target.as_str()));
                }
            };

            let status = upstream.status;
            let upstream_headers = upstream.headers.clone();
            let normalized = normalize(upstream, self.policy.decode_limit);
            if normalized.decompressed {
                tracing::info!(request_id = %request_id, target = %target, "Decompressed response");
            }

            // HEAD answers never carry a body to validate
            let content_type = normalized.content_type.clone().unwrap_or_default();
            if *request.method() == Method::HEAD || is_ready(&content_type, &normalized.body) {
                if declares_json(&content_type) {
                    tracing::debug!(request_id = %request_id, target = %target, "Upstream returned valid JSON");
                }
                tracing::info!(
                    request_id = %request_id,
                    target = %target,
                    status = %status,
                    content_type = %content_type,
                    content_length = normalized.body.len(),
                    decompressed = normalized.decompressed,
                    retries = state.retries(),
                    "Proxy response"
                );
                return Ok(NormalizedResponse::from_upstream(status, normalized, state.retries()));
            }

            tracing::warn!(
                request_id = %request_id,
                target = %target,
                attempt = state.retries() + 1,
                "Upstream returned invalid JSON"
            );

            match state.next_delay() {
                Some(delay) => {
                    tracing::info!(
                        request_id = %request_id,
                        target = %target,
                        retry = state.retries(),
                        delay = ?delay,
                        "Retrying upstream request"
                    );
                    metrics::record_retry();
                    tokio::time::sleep(delay).await;
                }
                None => {
                    tracing::error!(
                        request_id = %request_id,
                        target = %target,
                        status = %status,
                        headers = ?upstream_headers,
                        snippet = %snippet(&normalized.body, self.policy.snippet_bytes),
                        retries = state.retries(),
                        "Retries exhausted without valid JSON, forwarding last response"
                    );
                    return Ok(NormalizedResponse::from_upstream(status, normalized, state.retries()));
                }
            }
        }
    }
}

/// First `limit` bytes of `body`, lossily decoded for logging.
fn snippet(body: &[u8], limit: usize) -> String {
    String::from_utf8_lossy(&body[..body.len().min(limit)]).into_owned()
}
