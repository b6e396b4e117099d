//! VJMix Playback
//!
//! Keeps every layer's media element in step with the declared mixer state:
//! - **Media:** The `MediaElement`/`MediaBackend` seam and RAII media slots
//! - **Machine:** The pure per-layer state machine and reconcile planner
//! - **Synchronizer:** One layer's synchronizer applying plans to its element
//! - **Bank:** All synchronizers, keyed by (channel, layer)
//! - **Simulated:** A deterministic in-process backend for tests and headless runs

pub mod bank;
pub mod machine;
pub mod media;
pub mod simulated;
pub mod synchronizer;

pub use bank::*;
pub use machine::*;
pub use media::*;
pub use simulated::*;
pub use synchronizer::*;
