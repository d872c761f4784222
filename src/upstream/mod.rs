//! Upstream forwarding subsystem.
//!
//! # Data Flow
//! ```text
//! ProxyRequest + UpstreamTarget
//!     → client.rs (single forward call, timeout, redirects)
//!     → normalize.rs (gzip reversal, header sanitation)
//!     → validate.rs (declared JSON actually parses?)
//!     → resilience::retries decides: return or try again
//! ```

pub mod client;
pub mod normalize;
pub mod validate;

pub use client::{ForwardError, ReqwestUpstream, UpstreamClient, UpstreamResponse, UpstreamTarget};
pub use normalize::{normalize, Normalized};
pub use validate::is_ready;
