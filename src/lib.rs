//! Development gateway for the checklist frontend.
//!
//! Routes each request to the live frontend dev server, the pre-built
//! static bundle, or a fixed external upstream, normalizing what comes back.

pub mod config;
pub mod frontend;
pub mod health;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod resilience;
pub mod routing;
pub mod upstream;

#[cfg(test)]
pub(crate) mod test_utils;

pub use config::schema::GatewayConfig;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
