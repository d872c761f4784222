//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request path
//!     → router.rs (ordered table lookup)
//!     → matcher.rs (prefix / mount / exact match, yields remainder)
//!     → Return: RouteMatch { route kind, remainder } or no match
//! ```
//!
//! # Design Decisions
//! - Table built once at startup from resolved upstream URLs, immutable after
//! - No regex in hot path
//! - First match wins; unmatched paths fall through to the plain API handlers

pub mod matcher;
pub mod router;

pub use router::{DevMount, Route, RouteKind, RouteMatch, RouteTable};
