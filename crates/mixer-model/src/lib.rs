//! VJMix Mixer Model
//!
//! Defines the core data contracts for the mixing console:
//! - **Layer:** A single video source with opacity, blend mode, playback and loop state
//! - **Channel:** One of the two layer stacks (A, B) crossfaded by the master fader
//! - **State:** The complete mixer snapshot, including the media library
//! - **Store:** The single owner of mutable mixer state, publishing copy-on-write snapshots
//! - **Session:** Save/load of mixer snapshots as JSON files
//!
//! Opacity, volume and fader values live in `[0.0, 1.0]`; times are seconds.

pub mod channel;
pub mod layer;
pub mod library;
pub mod session;
pub mod state;
pub mod store;

pub use channel::*;
pub use layer::*;
pub use library::*;
pub use session::*;
pub use state::*;
pub use store::*;
