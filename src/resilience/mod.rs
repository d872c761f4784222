//! Resilience subsystem.
//!
//! # Data Flow
//! ```text
//! Request to an upstream:
//!     → upstream client (per-call timeout)
//!     → retries.rs (declared JSON that does not parse → retry)
//!     → backoff.rs (fixed delay schedule, last entry repeats)
//! ```
//!
//! # Design Decisions
//! - Only content errors are retried; transport errors are terminal
//! - Retries are bounded; exhaustion forwards the last response as-is

pub mod backoff;
pub mod retries;

pub use backoff::BackoffSchedule;
pub use retries::{RetryCoordinator, RetryPolicy};
