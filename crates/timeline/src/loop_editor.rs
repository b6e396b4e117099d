//! Two-handle loop range editing.
//!
//! Handles move on a 0.1 s grid inside `[0, duration]`. Both points are
//! always written together through `set_layer_loop`, so the synchronizer
//! never sees a half-updated window.

use serde::{Deserialize, Serialize};

use vjmix_mixer_model::{ChannelId, Layer, MixerStore};

/// Grid the loop handles snap to.
pub const LOOP_STEP_SECS: f64 = 0.1;

/// An ordered loop window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LoopRange {
    pub start: f64,
    pub end: f64,
}

impl LoopRange {
    /// Order two handle positions, snap them, and clamp to `[0, duration]`.
    pub fn from_handles(a: f64, b: f64, duration: f64) -> Self {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        Self {
            start: snap(lo).clamp(0.0, duration),
            end: snap(hi).clamp(0.0, duration),
        }
    }

    pub fn len(&self) -> f64 {
        self.end - self.start
    }

    pub fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Round to the nearest grid step.
pub fn snap(time: f64) -> f64 {
    (time / LOOP_STEP_SECS).round() * LOOP_STEP_SECS
}

/// Which loop handle is being dragged.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopHandle {
    In,
    Out,
}

/// Loop controls for one layer.
#[derive(Debug, Clone)]
pub struct LoopEditor {
    channel: ChannelId,
    layer_id: String,
}

impl LoopEditor {
    pub fn new(channel: ChannelId, layer_id: impl Into<String>) -> Self {
        Self {
            channel,
            layer_id: layer_id.into(),
        }
    }

    /// Current handle positions; shown only while looping a clip of known length.
    pub fn handles(layer: &Layer) -> Option<LoopRange> {
        (layer.is_looping && layer.duration > 0.0).then_some(LoopRange {
            start: layer.loop_in,
            end: layer.loop_out,
        })
    }

    /// Write a new range from raw handle positions.
    ///
    /// Returns the range written, or `None` when the layer is unknown, its
    /// duration is not known yet, or the snapped range is empty.
    pub fn set_range(&self, store: &MixerStore, a: f64, b: f64) -> Option<LoopRange> {
        if !a.is_finite() || !b.is_finite() {
            return None;
        }
        let state = store.snapshot();
        let layer = state.layer(self.channel, &self.layer_id)?;
        if layer.duration <= 0.0 {
            return None;
        }

        let range = LoopRange::from_handles(a, b, layer.duration);
        if range.is_empty() {
            tracing::debug!(layer = %self.layer_id, a, b, "loop handles collapsed; ignored");
            return None;
        }
        store.set_layer_loop(self.channel, &self.layer_id, range.start, range.end);
        Some(range)
    }

    /// Move one handle, keeping the other where it is. Dragging a handle past
    /// the other swaps their roles.
    pub fn drag(&self, store: &MixerStore, handle: LoopHandle, time: f64) -> Option<LoopRange> {
        let state = store.snapshot();
        let layer = state.layer(self.channel, &self.layer_id)?;
        let (start, end) = (layer.loop_in, layer.loop_out);
        match handle {
            LoopHandle::In => self.set_range(store, time, end),
            LoopHandle::Out => self.set_range(store, start, time),
        }
    }

    /// Toggle looping. Enabling with no window set loops the whole clip.
    pub fn toggle(&self, store: &MixerStore) -> bool {
        store.toggle_layer_loop(self.channel, &self.layer_id)
    }
}
