//! VJMix Render Engine
//!
//! Turns mixer snapshots into pixels, once per display frame.
//!
//! # Frame Pipeline
//!
//! ```text
//! MixerStore ──snapshot──┐
//!                        ├── SynchronizerBank::reconcile ──► store write-backs
//! media elements ────────┘         │
//!                                  ▼
//! master fader ──► mix_weights ──► Compositor::compose (cached materials)
//!                                  │
//!                                  ▼
//!                             RenderTarget::draw ──► CaptureStream (30 fps)
//!                                  │                        │
//!                                  ▼                        ▼
//!                               FpsMeter              RecordingSink
//! ```

pub mod blend;
pub mod capture;
pub mod compositor;
pub mod engine;
pub mod mix_weight;
pub mod output;
pub mod surface;

pub use blend::*;
pub use capture::*;
pub use compositor::*;
pub use engine::*;
pub use mix_weight::*;
pub use output::*;
pub use surface::*;
