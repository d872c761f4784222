//! Frontend serving: live dev server or pre-built bundle.
//!
//! # Data Flow
//! ```text
//! /checklist/*, dev tooling paths
//!     → switch.rs (probe dev server)
//!         → live: resilience::retries against the dev server
//!         → down: bundle.rs (exact file, SPA fallback, or 404)
//! ```

pub mod bundle;
pub mod switch;

pub use bundle::{BundleAsset, StaticBundle};
pub use switch::{DevBuildSwitch, DevState};
