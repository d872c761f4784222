//! Dev/Build switch.
//!
//! # States
//! - DevLive: the dev server answered the probe; proxy to it
//! - BuildOnly: the probe failed; serve the static bundle
//!
//! # State Transitions
//! ```text
//! every request → probe → DevLive | BuildOnly
//! ```
//! Nothing is remembered between requests.

use std::sync::Arc;

use url::Url;

use crate::frontend::bundle::StaticBundle;
use crate::health::probe::LivenessProbe;
use crate::http::request::ProxyRequest;
use crate::http::response::{GatewayError, NormalizedResponse};
use crate::observability::metrics;
use crate::resilience::retries::RetryCoordinator;
use crate::routing::router::{DevMount, CHECKLIST_MOUNT};
use crate::upstream::UpstreamTarget;

/// Outcome of the per-request liveness probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DevState {
    DevLive,
    BuildOnly,
}

pub struct DevBuildSwitch {
    dev_server: Url,
    probe: Arc<dyn LivenessProbe>,
    coordinator: Arc<RetryCoordinator>,
    bundle: StaticBundle,
}

impl DevBuildSwitch {
    pub fn new(
        dev_server: Url,
        probe: Arc<dyn LivenessProbe>,
        coordinator: Arc<RetryCoordinator>,
        bundle: StaticBundle,
    ) -> Self {
        Self {
            dev_server,
            probe,
            coordinator,
            bundle,
        }
    }

    /// Probe the dev server once.
    pub async fn state(&self) -> DevState {
        let state = match self.probe.check().await {
            Ok(()) => DevState::DevLive,
            Err(e) => {
                tracing::info!(
                    dev_server = %self.probe.target(),
                    reason = %e,
                    bundle = %self.bundle.root().display(),
                    "Dev server unavailable, serving build"
                );
                DevState::BuildOnly
            }
        };
        metrics::record_dev_server(state == DevState::DevLive);
        state
    }

    /// Serve `path` from the dev server or the bundle.
    ///
    /// For [`DevMount::Checklist`] `path` is relative to `/checklist`; for
    /// [`DevMount::Tooling`] the full request path is used and `path` is
    /// ignored.
    pub async fn resolve(
        &self,
        mount: DevMount,
        path: &str,
        request: &ProxyRequest,
    ) -> Result<NormalizedResponse, GatewayError> {
        match self.state().await {
            DevState::DevLive => {
                let suffix = match mount {
                    DevMount::Checklist => format!("{}/{}", CHECKLIST_MOUNT, path),
                    DevMount::Tooling => request.path().to_owned(),
                };
                let target = UpstreamTarget::new(&self.dev_server, &suffix, request.query())
                    .map_err(|e| GatewayError::from_forward(e, self.dev_server.as_str()))?;
                self.coordinator.fetch_with_retry(request, &target).await
            }
            DevState::BuildOnly => match mount {
                DevMount::Checklist => self.serve_checklist(path).await,
                DevMount::Tooling => self.serve_tooling(request.path()).await,
            },
        }
    }

    async fn serve_checklist(&self, path: &str) -> Result<NormalizedResponse, GatewayError> {
        if path.is_empty() {
            return match self.bundle.index().await {
                Some(asset) => {
                    tracing::info!(bundle = %self.bundle.root().display(), "Serving checklist index from build");
                    Ok(NormalizedResponse::asset(asset.body, asset.content_type))
                }
                None => {
                    tracing::error!(bundle = %self.bundle.root().display(), "Checklist build index not found");
                    Err(GatewayError::BundleUnavailable {
                        path: format!("{CHECKLIST_MOUNT}/"),
                    })
                }
            };
        }

        match self.bundle.resolve(path, true).await {
            Some(asset) => Ok(NormalizedResponse::asset(asset.body, asset.content_type)),
            None => {
                tracing::warn!(path = %path, "Checklist file not found in build");
                Err(GatewayError::NotFound {
                    path: format!("{CHECKLIST_MOUNT}/{path}"),
                })
            }
        }
    }

    async fn serve_tooling(&self, request_path: &str) -> Result<NormalizedResponse, GatewayError> {
        match self.bundle.resolve(request_path, false).await {
            Some(asset) => Ok(NormalizedResponse::asset(asset.body, asset.content_type)),
            None => {
                tracing::warn!(path = %request_path, "Dev tooling asset requested while dev server is down");
                Err(GatewayError::NotFound {
                    path: request_path.to_owned(),
                })
            }
        }
    }
}
