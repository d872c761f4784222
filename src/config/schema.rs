//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Dev server and external service base URLs.
    pub upstreams: UpstreamConfig,

    /// Pre-built bundle and static asset locations.
    pub bundle: BundleConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Retry configuration for content errors.
    pub retries: RetryConfig,

    /// Request size limits.
    pub security: SecurityConfig,

    /// CORS policy for `/api/*`.
    pub cors: CorsConfig,

    /// Values exposed to the frontend through `/api/config`.
    pub api: ApiConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8000").
    pub bind_address: String,
}

impl ListenerConfig {
    /// Replace the port, keeping the host part of `bind_address`.
    pub fn set_port(&mut self, port: &str) {
        let host = self
            .bind_address
            .rsplit_once(':')
            .map(|(host, _)| host)
            .unwrap_or("0.0.0.0");
        self.bind_address = format!("{host}:{port}");
    }
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8000".to_string(),
        }
    }
}

/// Upstream base URLs, resolved once at startup.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Local frontend dev server (http only).
    pub dev_server_url: String,

    /// External webhook host; `/api/webhook/<path>` maps to `<base>/<path>`.
    pub webhook_base_url: String,

    /// External ERP host; `/ssw/<path>` maps to `<base>/<path>`.
    pub erp_base_url: String,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            dev_server_url: "http://localhost:5173".to_string(),
            webhook_base_url: "https://tritton.dev.br/webhook".to_string(),
            erp_base_url: "https://sistema.ssw.inf.br".to_string(),
        }
    }
}

/// Static files.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BundleConfig {
    /// Checklist build output served when the dev server is down.
    pub checklist_dir: String,

    /// Directory mounted at `/static`.
    pub static_dir: String,

    /// Root document used for the SPA fallback.
    pub index_document: String,

    /// Directory holding the main page.
    pub template_dir: String,

    /// Main page served at `/`, relative to `template_dir`.
    pub main_page: String,

    /// Icon served at `/favicon.ico`, relative to `static_dir`.
    pub favicon: String,
}

impl Default for BundleConfig {
    fn default() -> Self {
        Self {
            checklist_dir: "checklist/dist".to_string(),
            static_dir: "frontend/static".to_string(),
            index_document: "index.html".to_string(),
            template_dir: "frontend/templates".to_string(),
            main_page: "index_v2.html".to_string(),
            favicon: "img/binho.ico".to_string(),
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout of each upstream forward call in seconds.
    pub request_secs: u64,

    /// Dev-server liveness probe timeout in milliseconds.
    pub probe_millis: u64,

    /// Whole inbound request guard in seconds (covers all retries).
    pub inbound_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            probe_millis: 1000,
            inbound_secs: 150,
        }
    }
}

/// Retry configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Re-requests allowed when declared JSON does not parse.
    pub max_retries: u32,

    /// Delay before each retry in milliseconds; the last one repeats.
    pub delays_ms: Vec<u64>,

    /// Body bytes logged when retries are exhausted.
    pub snippet_bytes: usize,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            delays_ms: vec![500, 1000, 2000],
            snippet_bytes: 1024,
        }
    }
}

/// Request size limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Maximum inbound body size in bytes.
    pub max_body_size: usize,

    /// Largest upstream body decompressed before forwarding; bigger ones
    /// pass through still encoded.
    pub max_decoded_size: usize,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            max_body_size: 2 * 1024 * 1024, // 2MB
            max_decoded_size: 32 * 1024 * 1024, // 32MB
        }
    }
}

/// CORS configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    pub allowed_origins: Vec<String>,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origins: vec![
                "http://127.0.0.1:8000".to_string(),
                "http://localhost:8000".to_string(),
            ],
        }
    }
}

/// Frontend-facing configuration values.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ApiConfig {
    pub api_url: String,
    pub version: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            api_url: "https://tritton.dev.br/webhook/picking-process".to_string(),
            version: "2.0".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// File receiving a copy of every log line; empty disables it.
    pub log_file: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_file: "picking.log".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
