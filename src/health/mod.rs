//! Dev-server liveness.
//!
//! # Data Flow
//! ```text
//! Request for a frontend asset
//!     → probe.rs (short-timeout GET against the dev server)
//!     → Ok  → DevLive: proxy to the dev server
//!     → Err → BuildOnly: serve the static bundle
//! ```
//!
//! # Design Decisions
//! - Probed on every request; no state survives between requests, so the
//!   dev server may come and go freely
//! - Timeouts and connection errors are both plain "down"

pub mod probe;

pub use probe::{HttpProbe, LivenessProbe, ProbeFailure};
