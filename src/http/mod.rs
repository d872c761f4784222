//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware, route table dispatch)
//!     → request.rs (buffer body, snapshot headers and cookies)
//!     → websocket.rs (upgrade → 307 to the dev server)
//!     → frontend / resilience (dev/build switch, retry coordinator)
//!     → response.rs (NormalizedResponse or GatewayError → HTTP)
//!     → Send to client
//! ```

pub mod api;
pub mod request;
pub mod response;
pub mod server;
pub mod websocket;

pub use request::{ProxyRequest, X_REQUEST_ID};
pub use response::{GatewayError, NormalizedResponse};
pub use server::{AppState, HttpServer, StartupError};
