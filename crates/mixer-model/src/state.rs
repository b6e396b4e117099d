//! The complete mixer snapshot.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::channel::{Channel, ChannelId, Channels};
use crate::layer::Layer;
use crate::library::LibraryItem;

/// Addresses one layer across both channels.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LayerKey {
    pub channel: ChannelId,
    pub layer_id: String,
}

impl LayerKey {
    pub fn new(channel: ChannelId, layer_id: impl Into<String>) -> Self {
        Self {
            channel,
            layer_id: layer_id.into(),
        }
    }
}

impl fmt::Display for LayerKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.channel, self.layer_id)
    }
}

/// Everything the mixer knows at one instant.
///
/// Snapshots are immutable once published by the store; every mutation
/// produces a new snapshot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MixerState {
    pub channels: Channels,

    /// Crossfade position: 0 = full A, 1 = full B.
    pub master_fader: f32,

    #[serde(default)]
    pub is_recording: bool,

    /// Last measured rendering rate.
    #[serde(default)]
    pub fps: u32,

    #[serde(default)]
    pub output_window_open: bool,

    #[serde(default)]
    pub library: Vec<LibraryItem>,
}

impl MixerState {
    /// Fresh state with `layers_per_channel` empty layers in each channel.
    pub fn new(layers_per_channel: usize, master_fader: f32) -> Self {
        Self {
            channels: Channels::new(layers_per_channel),
            master_fader: master_fader.clamp(0.0, 1.0),
            is_recording: false,
            fps: 0,
            output_window_open: false,
            library: Vec::new(),
        }
    }

    pub fn channel(&self, id: ChannelId) -> &Channel {
        self.channels.get(id)
    }

    pub fn layer(&self, channel: ChannelId, layer_id: &str) -> Option<&Layer> {
        self.channels.get(channel).layer(layer_id)
    }

    pub fn layer_by_key(&self, key: &LayerKey) -> Option<&Layer> {
        self.layer(key.channel, &key.layer_id)
    }

    /// All layers in draw order with their keys.
    pub fn layers(&self) -> impl Iterator<Item = (LayerKey, &Layer)> {
        self.channels.iter().flat_map(|channel| {
            channel
                .layers
                .iter()
                .map(move |layer| (LayerKey::new(channel.id, layer.id.clone()), layer))
        })
    }

    pub fn library_item(&self, item_id: &str) -> Option<&LibraryItem> {
        self.library.iter().find(|item| item.id == item_id)
    }
}

impl Default for MixerState {
    fn default() -> Self {
        Self::new(3, 0.5)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state() {
        let state = MixerState::default();
        assert_eq!(state.channel(ChannelId::A).layers.len(), 3);
        assert_eq!(state.channel(ChannelId::B).layers.len(), 3);
        assert_eq!(state.master_fader, 0.5);
        assert!(!state.is_recording);
        assert!(state.library.is_empty());
    }

    #[test]
    fn test_layers_iterate_in_draw_order() {
        let state = MixerState::new(2, 0.0);
        let keys: Vec<String> = state.layers().map(|(key, _)| key.to_string()).collect();
        assert_eq!(keys, ["A/layer-1", "A/layer-2", "B/layer-1", "B/layer-2"]);
    }

    #[test]
    fn test_layer_lookup() {
        let state = MixerState::default();
        assert!(state.layer(ChannelId::A, "layer-3").is_some());
        assert!(state.layer(ChannelId::A, "layer-4").is_none());
        let key = LayerKey::new(ChannelId::B, "layer-1");
        assert_eq!(state.layer_by_key(&key).unwrap().name, "Layer 1");
    }

    #[test]
    fn test_state_serialization() {
        let state = MixerState::default();
        let json = serde_json::to_string_pretty(&state).unwrap();
        let parsed: MixerState = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, state);
    }
}
