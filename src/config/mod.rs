//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, environment overrides)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → passed explicitly to the server, routes and dev/build switch
//! ```
//!
//! # Design Decisions
//! - Read once at process start; no reload, no global mutable state
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::GatewayConfig;
pub use schema::{
    ApiConfig, BundleConfig, CorsConfig, ListenerConfig, ObservabilityConfig, RetryConfig,
    SecurityConfig, TimeoutConfig, UpstreamConfig,
};
