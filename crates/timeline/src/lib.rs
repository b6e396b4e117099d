//! VJMix Timeline
//!
//! Per-layer timeline interactions, all expressed as store mutations:
//! - **Position:** Pointer offset to time, scrubbing, and playhead fractions
//! - **Markers:** Two-step marker creation, removal, and jump-to-marker
//! - **Loop editor:** Ordered, snapped loop handles written atomically
//! - **Preview:** Hover thumbnails from a private media element
//! - **Format:** `m:ss` labels and speed presets

pub mod format;
pub mod loop_editor;
pub mod markers;
pub mod position;
pub mod preview;

pub use format::*;
pub use loop_editor::*;
pub use markers::*;
pub use position::*;
pub use preview::*;
