//! # Utilities Module
//!
//! Internal utility modules for the follow-core crate.
//! These modules are marked as `pub(crate)` to enforce API boundaries.

pub(crate) mod logger;
pub(crate) mod pacing;
pub(crate) mod retry;

pub use logger::setup_logger;
pub use pacing::PacingConfig;
