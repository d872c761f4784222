//! Protocol-upgrade redirection.
//!
//! # Responsibilities
//! - Detect upgrade handshakes (WebSocket HMR and friends)
//! - Send the caller straight to the dev server for them
//!
//! # Design Decisions
//! - The gateway buffers whole request/response pairs, so it cannot carry
//!   an upgraded connection; a 307 to the dev server is issued instead
//! - No frame-level proxying at all

use std::sync::Arc;

use url::Url;

use crate::health::probe::LivenessProbe;
use crate::http::request::ProxyRequest;
use crate::http::response::{GatewayError, NormalizedResponse};
use crate::upstream::UpstreamTarget;

pub struct UpgradeRedirector {
    dev_server: Url,
    probe: Arc<dyn LivenessProbe>,
}

impl UpgradeRedirector {
    pub fn new(dev_server: Url, probe: Arc<dyn LivenessProbe>) -> Self {
        Self { dev_server, probe }
    }

    /// `None` when the request does not ask for an upgrade; control then
    /// falls through to the dev/build switch.
    pub async fn maybe_redirect(
        &self,
        request: &ProxyRequest,
    ) -> Option<Result<NormalizedResponse, GatewayError>> {
        if !request.wants_upgrade() {
            return None;
        }

        if let Err(e) = self.probe.check().await {
            tracing::warn!(
                request_id = %request.request_id(),
                path = %request.path(),
                reason = %e,
                "Upgrade requested but dev server is down"
            );
            return Some(Err(GatewayError::DevServerDown {
                url: self.dev_server.to_string(),
            }));
        }

        let result = UpstreamTarget::new(&self.dev_server, request.path(), request.query())
            .map_err(|e| GatewayError::from_forward(e, self.dev_server.as_str()))
            .and_then(|target| {
                tracing::info!(
                    request_id = %request.request_id(),
                    location = %target,
                    "Redirecting upgrade request to dev server"
                );
                NormalizedResponse::redirect(target.as_str())
            });
        Some(result)
    }
}
