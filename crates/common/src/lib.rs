//! VJMix Common Utilities
//!
//! Shared infrastructure for all VJMix crates:
//! - Error types and result aliases
//! - Frame clock, rate gating and FPS measurement
//! - Tracing/logging initialization
//! - Configuration loading

pub mod clock;
pub mod config;
pub mod error;
pub mod logging;

pub use clock::*;
pub use config::*;
pub use error::*;
