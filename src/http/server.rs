//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the main page, the local API, `/static` and the
//!   gateway fallback
//! - Wire up middleware (tracing, timeout, request ID, no-cache headers, CORS)
//! - Bind server to listener
//! - Dispatch requests through the route table to the dev/build switch,
//!   the upgrade redirector or the retry coordinator
//! - Observability (metrics, correlation IDs)

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Method, Request},
    response::{IntoResponse, Response},
    routing::{any, get},
    Router,
};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{
    cors::{AllowOrigin, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    set_header::SetResponseHeaderLayer,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};
use url::Url;

use crate::config::{ApiConfig, CorsConfig, GatewayConfig};
use crate::frontend::{DevBuildSwitch, StaticBundle};
use crate::health::probe::{HttpProbe, LivenessProbe};
use crate::http::api::{self, PageFiles};
use crate::http::request::ProxyRequest;
use crate::http::response::{GatewayError, NormalizedResponse};
use crate::http::websocket::UpgradeRedirector;
use crate::observability::metrics;
use crate::resilience::retries::{RetryCoordinator, RetryPolicy};
use crate::routing::{RouteKind, RouteTable};
use crate::upstream::{ForwardError, ReqwestUpstream, UpstreamClient, UpstreamTarget};

/// Errors that prevent the server from being assembled.
#[derive(Debug, Error)]
pub enum StartupError {
    #[error("invalid URL for {field}: {source}")]
    InvalidUrl {
        field: &'static str,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build upstream client: {0}")]
    Client(#[from] ForwardError),
}

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub routes: Arc<RouteTable>,
    pub coordinator: Arc<RetryCoordinator>,
    pub switch: Arc<DevBuildSwitch>,
    pub redirector: Arc<UpgradeRedirector>,
    pub api: Arc<ApiConfig>,
    pub pages: Arc<PageFiles>,
    pub max_body_size: usize,
}

/// HTTP server for the gateway.
pub struct HttpServer {
    router: Router,
    config: GatewayConfig,
}

impl HttpServer {
    /// Create a server talking to real upstreams.
    pub fn new(config: GatewayConfig) -> Result<Self, StartupError> {
        let dev_server = parse_url("upstreams.dev_server_url", &config.upstreams.dev_server_url)?;
        let client = Arc::new(ReqwestUpstream::new(Duration::from_secs(
            config.timeouts.request_secs,
        ))?);
        let probe = Arc::new(HttpProbe::new(
            dev_server.as_str(),
            Duration::from_millis(config.timeouts.probe_millis),
        ));
        Self::with_components(config, client, probe)
    }

    /// Create a server with injected upstream client and liveness probe.
    pub fn with_components(
        config: GatewayConfig,
        client: Arc<dyn UpstreamClient>,
        probe: Arc<dyn LivenessProbe>,
    ) -> Result<Self, StartupError> {
        let dev_server = parse_url("upstreams.dev_server_url", &config.upstreams.dev_server_url)?;
        let webhook = parse_url("upstreams.webhook_base_url", &config.upstreams.webhook_base_url)?;
        let erp = parse_url("upstreams.erp_base_url", &config.upstreams.erp_base_url)?;

        let coordinator = Arc::new(RetryCoordinator::new(
            client,
            RetryPolicy::from_config(&config.retries)
                .with_decode_limit(config.security.max_decoded_size),
        ));
        let bundle = StaticBundle::new(&config.bundle.checklist_dir, &config.bundle.index_document);
        let switch = DevBuildSwitch::new(dev_server.clone(), probe.clone(), coordinator.clone(), bundle);

        let state = AppState {
            routes: Arc::new(RouteTable::standard(webhook, erp)),
            coordinator,
            switch: Arc::new(switch),
            redirector: Arc::new(UpgradeRedirector::new(dev_server, probe)),
            api: Arc::new(config.api.clone()),
            pages: Arc::new(PageFiles::from_config(&config.bundle)),
            max_body_size: config.security.max_body_size,
        };

        let router = Self::build_router(&config, state);
        Ok(Self { router, config })
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &GatewayConfig, state: AppState) -> Router {
        let api_routes = Router::new()
            .route("/api/health", get(api::health))
            .route("/api/config", get(api::config))
            .route("/api/filiais", get(api::branches))
            .route("/api/filial/atual", get(api::current_branch))
            .route("/api/live/ws", get(api::live_status))
            .route("/api/webhook/{*path}", any(gateway_handler))
            .layer(cors_layer(&config.cors));

        Router::new()
            .route("/", get(api::main_page))
            .route("/favicon.ico", get(api::favicon))
            .merge(api_routes)
            .nest_service("/static", ServeDir::new(&config.bundle.static_dir))
            .fallback(gateway_handler)
            .with_state(state)
            .layer(TimeoutLayer::new(Duration::from_secs(config.timeouts.inbound_secs)))
            .layer(SetResponseHeaderLayer::overriding(
                header::CACHE_CONTROL,
                HeaderValue::from_static("no-cache, no-store, must-revalidate, max-age=0"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::PRAGMA,
                HeaderValue::from_static("no-cache"),
            ))
            .layer(SetResponseHeaderLayer::overriding(
                header::EXPIRES,
                HeaderValue::from_static("0"),
            ))
            .layer(PropagateRequestIdLayer::x_request_id())
            .layer(TraceLayer::new_for_http())
            .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
    }

    /// The assembled router, for driving the server without a socket.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until `shutdown` fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            dev_server = %self.config.upstreams.dev_server_url,
            bundle = %self.config.bundle.checklist_dir,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

fn parse_url(field: &'static str, raw: &str) -> Result<Url, StartupError> {
    Url::parse(raw).map_err(|source| StartupError::InvalidUrl { field, source })
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::AUTHORIZATION])
}

/// Gateway handler.
/// Looks up the route, snapshots the request and hands it to the matching
/// component.
async fn gateway_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let path = request.uri().path().to_owned();

    let Some(matched) = state.routes.dispatch(&path) else {
        tracing::debug!(path = %path, "No route matched");
        metrics::record_request("unmatched", 404, start);
        return GatewayError::NotFound { path: path.clone() }.into_response();
    };
    let route = matched.route.name;

    let request = match ProxyRequest::from_request(request, state.max_body_size).await {
        Ok(request) => request,
        Err(e) => {
            tracing::warn!(path = %path, error = %e, "Rejected inbound request");
            metrics::record_request(route, e.status().as_u16(), start);
            return e.into_response();
        }
    };

    tracing::debug!(
        request_id = %request.request_id(),
        method = %request.method(),
        path = %path,
        route = route,
        "Dispatching request"
    );

    let result = match &matched.route.kind {
        RouteKind::DevAsset {
            mount,
            upgrade_redirect,
        } => {
            let redirect = if *upgrade_redirect {
                state.redirector.maybe_redirect(&request).await
            } else {
                None
            };
            match redirect {
                Some(result) => result,
                None => state.switch.resolve(*mount, matched.remainder, &request).await,
            }
        }
        RouteKind::External { base, methods } => {
            forward_external(&state, base, methods, matched.remainder, &request).await
        }
    };

    let response = match result {
        Ok(response) => response.into_response(),
        Err(e) => {
            tracing::warn!(
                request_id = %request.request_id(),
                path = %path,
                status = e.status().as_u16(),
                error = %e,
                "Request failed"
            );
            e.into_response()
        }
    };

    metrics::record_request(route, response.status().as_u16(), start);
    response
}

async fn forward_external(
    state: &AppState,
    base: &Url,
    methods: &[Method],
    remainder: &str,
    request: &ProxyRequest,
) -> Result<NormalizedResponse, GatewayError> {
    if !methods.contains(request.method()) {
        return Err(GatewayError::MethodNotAllowed {
            method: request.method().clone(),
            path: request.path().to_owned(),
        });
    }

    let target = UpstreamTarget::new(base, remainder, request.query())
        .map_err(|e| GatewayError::from_forward(e, base.as_str()))?;
    state.coordinator.fetch_with_retry(request, &target).await
}
