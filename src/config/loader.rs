//! Configuration loading from disk and the process environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::GatewayConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Load configuration: TOML file (if any), then environment overrides,
/// then validation.
pub fn load_config(path: Option<&Path>) -> Result<GatewayConfig, ConfigError> {
    let mut config = match path {
        Some(path) => {
            let content = fs::read_to_string(path)?;
            toml::from_str(&content)?
        }
        None => GatewayConfig::default(),
    };

    apply_env_overrides(&mut config, |key| std::env::var(key).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay environment values onto `config`. Empty values are ignored.
///
/// `lookup` abstracts `std::env::var` so tests never touch the real
/// process environment.
pub fn apply_env_overrides<F>(config: &mut GatewayConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

    if let Some(addr) = get("BIND_ADDRESS") {
        config.listener.bind_address = addr;
    }
    if let Some(port) = get("PORT") {
        config.listener.set_port(port.trim());
    }
    if let Some(url) = get("DEV_SERVER_URL") {
        config.upstreams.dev_server_url = url;
    }
    if let Some(url) = get("WEBHOOK_BASE_URL") {
        config.upstreams.webhook_base_url = url;
    }
    if let Some(url) = get("ERP_BASE_URL") {
        config.upstreams.erp_base_url = url;
    }
    if let Some(dir) = get("CHECKLIST_DIST_DIR") {
        config.bundle.checklist_dir = dir;
    }
    if let Some(dir) = get("STATIC_DIR") {
        config.bundle.static_dir = dir;
    }
    if let Some(dir) = get("TEMPLATE_DIR") {
        config.bundle.template_dir = dir;
    }
    if let Some(url) = get("API_URL") {
        config.api.api_url = url;
    }
    if let Some(level) = get("LOG_LEVEL") {
        config.observability.log_level = level;
    }
    if let Some(path) = get("LOG_FILE") {
        config.observability.log_file = path;
    }
}
