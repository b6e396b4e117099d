//! The mixer state store.
//!
//! The store is the single owner of mutable mixer state. Readers take an
//! `Arc<MixerState>` snapshot (or subscribe for new ones); writers go through
//! the named mutation methods below. Every effective mutation publishes a new
//! snapshot, so a reader holding an older one never sees a partial update.
//!
//! Mutations return `true` when they changed the state. Unknown channel or
//! layer ids, non-finite numbers and inverted loop windows are ignored.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::sync::watch;

use crate::channel::ChannelId;
use crate::layer::{BlendMode, Layer, Marker};
use crate::library::LibraryItem;
use crate::state::MixerState;

/// Accepted playback speed range.
pub const SPEED_RANGE: (f64, f64) = (0.25, 4.0);

/// Owner of the authoritative mixer state.
#[derive(Debug)]
pub struct MixerStore {
    tx: watch::Sender<Arc<MixerState>>,
    revision: AtomicU64,
}

impl MixerStore {
    pub fn new(initial: MixerState) -> Self {
        let (tx, _rx) = watch::channel(Arc::new(initial));
        Self {
            tx,
            revision: AtomicU64::new(0),
        }
    }

    /// Store with `layers_per_channel` empty layers per channel.
    pub fn with_layout(layers_per_channel: usize, master_fader: f32) -> Self {
        Self::new(MixerState::new(layers_per_channel, master_fader))
    }

    /// The current snapshot.
    pub fn snapshot(&self) -> Arc<MixerState> {
        self.tx.borrow().clone()
    }

    /// Receive every future snapshot (secondary renderers, UI mirrors).
    pub fn subscribe(&self) -> watch::Receiver<Arc<MixerState>> {
        self.tx.subscribe()
    }

    /// Number of effective mutations since creation.
    pub fn revision(&self) -> u64 {
        self.revision.load(Ordering::Relaxed)
    }

    /// Replace the whole state (session load).
    pub fn replace(&self, state: MixerState) {
        self.commit("replace", |current| {
            *current = state;
            true
        });
    }

    // -- Layer mutations ----------------------------------------------------

    /// Assign (or clear, with `None` / empty string) a layer's media source.
    ///
    /// A new source starts from position 0 with unknown duration and a reset
    /// loop window; markers are kept.
    pub fn set_layer_source(&self, channel: ChannelId, layer_id: &str, source: Option<&str>) -> bool {
        let source = source.filter(|s| !s.is_empty()).map(str::to_string);
        self.commit_layer("set_layer_source", channel, layer_id, |layer| {
            if layer.source == source {
                return;
            }
            layer.source = source;
            layer.current_time = 0.0;
            layer.duration = 0.0;
            layer.loop_in = 0.0;
            layer.loop_out = 0.0;
        })
    }

    /// Assign a library item's URL to a layer, seeding duration from its hint.
    pub fn assign_library_item(&self, channel: ChannelId, layer_id: &str, item_id: &str) -> bool {
        let Some(item) = self.snapshot().library_item(item_id).cloned() else {
            tracing::debug!(item_id, "library item not found; assignment ignored");
            return false;
        };
        if !item.is_usable() {
            tracing::warn!(item_id, error = ?item.error, "library item is not usable");
            return false;
        }
        self.commit_layer("assign_library_item", channel, layer_id, |layer| {
            layer.source = Some(item.url.clone());
            layer.current_time = 0.0;
            layer.duration = 0.0;
            layer.loop_in = 0.0;
            layer.loop_out = 0.0;
            if let Some(hint) = item.duration_hint() {
                apply_duration(layer, hint);
            }
        })
    }

    pub fn set_layer_opacity(&self, channel: ChannelId, layer_id: &str, opacity: f32) -> bool {
        if !opacity.is_finite() {
            return false;
        }
        self.commit_layer("set_layer_opacity", channel, layer_id, |layer| {
            layer.opacity = opacity.clamp(0.0, 1.0);
        })
    }

    pub fn set_layer_blend_mode(&self, channel: ChannelId, layer_id: &str, mode: BlendMode) -> bool {
        self.commit_layer("set_layer_blend_mode", channel, layer_id, |layer| {
            layer.blend_mode = mode;
        })
    }

    pub fn set_layer_playing(&self, channel: ChannelId, layer_id: &str, playing: bool) -> bool {
        self.commit_layer("set_layer_playing", channel, layer_id, |layer| {
            layer.is_playing = playing;
        })
    }

    pub fn toggle_layer_playback(&self, channel: ChannelId, layer_id: &str) -> bool {
        self.commit_layer("toggle_layer_playback", channel, layer_id, |layer| {
            layer.is_playing = !layer.is_playing;
        })
    }

    pub fn set_layer_volume(&self, channel: ChannelId, layer_id: &str, volume: f32) -> bool {
        if !volume.is_finite() {
            return false;
        }
        self.commit_layer("set_layer_volume", channel, layer_id, |layer| {
            layer.volume = volume.clamp(0.0, 1.0);
        })
    }

    pub fn set_layer_muted(&self, channel: ChannelId, layer_id: &str, muted: bool) -> bool {
        self.commit_layer("set_layer_muted", channel, layer_id, |layer| {
            layer.is_muted = muted;
        })
    }

    pub fn toggle_layer_mute(&self, channel: ChannelId, layer_id: &str) -> bool {
        self.commit_layer("toggle_layer_mute", channel, layer_id, |layer| {
            layer.is_muted = !layer.is_muted;
        })
    }

    pub fn set_layer_speed(&self, channel: ChannelId, layer_id: &str, speed: f64) -> bool {
        if !speed.is_finite() {
            return false;
        }
        self.commit_layer("set_layer_speed", channel, layer_id, |layer| {
            layer.playback_speed = speed.clamp(SPEED_RANGE.0, SPEED_RANGE.1);
        })
    }

    /// Set the declared playback position (scrub, marker jump, or measured write-back).
    pub fn set_layer_time(&self, channel: ChannelId, layer_id: &str, time: f64) -> bool {
        if !time.is_finite() {
            return false;
        }
        self.commit_layer("set_layer_time", channel, layer_id, |layer| {
            let mut time = time.max(0.0);
            if layer.duration > 0.0 {
                time = time.min(layer.duration);
            }
            layer.current_time = time;
        })
    }

    /// Record a (newly known) clip duration, initializing or clamping loop-out.
    pub fn set_layer_duration(&self, channel: ChannelId, layer_id: &str, duration: f64) -> bool {
        if !duration.is_finite() || duration < 0.0 {
            return false;
        }
        self.commit_layer("set_layer_duration", channel, layer_id, |layer| {
            apply_duration(layer, duration);
        })
    }

    /// Write both loop points at once.
    ///
    /// Points are clamped to `[0, duration]` when the duration is known. A
    /// window that is empty or inverted after clamping is rejected, so readers
    /// never observe `loop_in > loop_out`.
    pub fn set_layer_loop(&self, channel: ChannelId, layer_id: &str, loop_in: f64, loop_out: f64) -> bool {
        if !loop_in.is_finite() || !loop_out.is_finite() {
            return false;
        }
        self.commit_layer("set_layer_loop", channel, layer_id, |layer| {
            let upper = if layer.duration > 0.0 {
                layer.duration
            } else {
                f64::MAX
            };
            let start = loop_in.clamp(0.0, upper);
            let end = loop_out.clamp(0.0, upper);
            if start >= end {
                tracing::warn!(
                    layer = %layer.id,
                    loop_in,
                    loop_out,
                    "rejected empty or inverted loop window"
                );
                return;
            }
            layer.loop_in = start;
            layer.loop_out = end;
        })
    }

    pub fn set_layer_looping(&self, channel: ChannelId, layer_id: &str, looping: bool) -> bool {
        self.commit_layer("set_layer_looping", channel, layer_id, |layer| {
            set_looping(layer, looping);
        })
    }

    /// Toggle looping. Enabling with an unset window loops the whole clip.
    pub fn toggle_layer_loop(&self, channel: ChannelId, layer_id: &str) -> bool {
        self.commit_layer("toggle_layer_loop", channel, layer_id, |layer| {
            let looping = !layer.is_looping;
            set_looping(layer, looping);
        })
    }

    /// Append a marker. A marker whose id already exists on the layer is ignored.
    pub fn add_layer_marker(&self, channel: ChannelId, layer_id: &str, marker: Marker) -> bool {
        if !marker.time.is_finite() {
            return false;
        }
        self.commit_layer("add_layer_marker", channel, layer_id, |layer| {
            if layer.marker(&marker.id).is_none() {
                layer.markers.push(marker);
            }
        })
    }

    pub fn remove_layer_marker(&self, channel: ChannelId, layer_id: &str, marker_id: &str) -> bool {
        self.commit_layer("remove_layer_marker", channel, layer_id, |layer| {
            layer.markers.retain(|m| m.id != marker_id);
        })
    }

    // -- Channel and master mutations ---------------------------------------

    pub fn set_channel_blend_mode(&self, channel: ChannelId, mode: BlendMode) -> bool {
        self.commit("set_channel_blend_mode", |state| {
            state.channels.get_mut(channel).blend_mode = mode;
            true
        })
    }

    pub fn set_master_fader(&self, value: f32) -> bool {
        if !value.is_finite() {
            return false;
        }
        self.commit("set_master_fader", |state| {
            state.master_fader = value.clamp(0.0, 1.0);
            true
        })
    }

    pub fn toggle_recording(&self) -> bool {
        self.commit("toggle_recording", |state| {
            state.is_recording = !state.is_recording;
            true
        })
    }

    pub fn set_recording(&self, recording: bool) -> bool {
        self.commit("set_recording", |state| {
            state.is_recording = recording;
            true
        })
    }

    pub fn set_fps(&self, fps: u32) -> bool {
        self.commit("set_fps", |state| {
            state.fps = fps;
            true
        })
    }

    pub fn set_output_window_open(&self, open: bool) -> bool {
        self.commit("set_output_window_open", |state| {
            state.output_window_open = open;
            true
        })
    }

    // -- Library ------------------------------------------------------------

    /// Insert an item, or replace the item with the same id in place.
    pub fn upsert_library_item(&self, item: LibraryItem) -> bool {
        self.commit("upsert_library_item", |state| {
            match state.library.iter_mut().find(|existing| existing.id == item.id) {
                Some(existing) => *existing = item,
                None => state.library.push(item),
            }
            true
        })
    }

    pub fn remove_library_item(&self, item_id: &str) -> bool {
        self.commit("remove_library_item", |state| {
            let before = state.library.len();
            state.library.retain(|item| item.id != item_id);
            state.library.len() != before
        })
    }

    // -- Plumbing -----------------------------------------------------------

    fn commit_layer(
        &self,
        op: &'static str,
        channel: ChannelId,
        layer_id: &str,
        f: impl FnOnce(&mut Layer),
    ) -> bool {
        self.commit(op, |state| match state.channels.get_mut(channel).layer_mut(layer_id) {
            Some(layer) => {
                f(layer);
                true
            }
            None => {
                tracing::debug!(op, %channel, layer_id, "unknown layer; mutation ignored");
                false
            }
        })
    }

    /// Apply `f` to a copy of the current state and publish it if it changed.
    /// `f` returns false when its target does not exist.
    fn commit(&self, op: &'static str, f: impl FnOnce(&mut MixerState) -> bool) -> bool {
        let published = self.tx.send_if_modified(|current| {
            let mut next = MixerState::clone(current);
            if f(&mut next) && next != **current {
                *current = Arc::new(next);
                true
            } else {
                false
            }
        });
        if published {
            let revision = self.revision.fetch_add(1, Ordering::Relaxed) + 1;
            tracing::trace!(op, revision, "mixer state updated");
        }
        published
    }
}

impl Default for MixerStore {
    fn default() -> Self {
        Self::new(MixerState::default())
    }
}

/// Loop-out that sat on the previous clip end follows the new one; a window
/// that no longer fits collapses back to the whole clip.
fn apply_duration(layer: &mut Layer, duration: f64) {
    let previous = layer.duration;
    layer.duration = duration;
    let at_clip_end = previous > 0.0 && (layer.loop_out - previous).abs() < 1e-9;
    if layer.loop_out <= 0.0 || layer.loop_out > duration || at_clip_end {
        layer.loop_out = duration;
    }
    if layer.loop_in >= layer.loop_out {
        layer.loop_in = 0.0;
        layer.loop_out = duration;
    }
    if duration > 0.0 {
        layer.current_time = layer.current_time.min(duration);
    }
}

fn set_looping(layer: &mut Layer, looping: bool) {
    layer.is_looping = looping;
    if looping && layer.loop_out <= layer.loop_in && layer.duration > 0.0 {
        layer.loop_in = 0.0;
        layer.loop_out = layer.duration;
    }
}
