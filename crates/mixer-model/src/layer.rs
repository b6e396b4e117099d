//! Layer types: blend modes, markers, and per-layer playback parameters.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Compositing operator applied between a layer and what lies beneath it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum BlendMode {
    #[default]
    Normal,
    Multiply,
    Screen,
    Overlay,
    Lighten,
    Darken,
    Difference,
}

impl BlendMode {
    /// Every blend mode, in table order.
    pub const ALL: [BlendMode; 7] = [
        BlendMode::Normal,
        BlendMode::Multiply,
        BlendMode::Screen,
        BlendMode::Overlay,
        BlendMode::Lighten,
        BlendMode::Darken,
        BlendMode::Difference,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BlendMode::Normal => "normal",
            BlendMode::Multiply => "multiply",
            BlendMode::Screen => "screen",
            BlendMode::Overlay => "overlay",
            BlendMode::Lighten => "lighten",
            BlendMode::Darken => "darken",
            BlendMode::Difference => "difference",
        }
    }
}

impl fmt::Display for BlendMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing an unknown blend mode name.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown blend mode: {0}")]
pub struct UnknownBlendMode(pub String);

impl FromStr for BlendMode {
    type Err = UnknownBlendMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_ascii_lowercase();
        BlendMode::ALL
            .into_iter()
            .find(|mode| mode.as_str() == needle)
            .ok_or_else(|| UnknownBlendMode(s.to_string()))
    }
}

/// A named, time-stamped point on a layer's timeline.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Marker {
    /// Unique within the layer.
    pub id: String,

    /// Position in seconds.
    pub time: f64,

    /// User-entered label.
    pub label: String,

    /// Display color as hex string (for example `#00ffff`).
    #[serde(default)]
    pub color: Option<String>,
}

/// A single video source within a channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Layer {
    /// Stable identifier (`layer-1`, `layer-2`, ...).
    pub id: String,

    /// Display name.
    pub name: String,

    /// Media source URL. `None` means the layer has no content.
    #[serde(default)]
    pub source: Option<String>,

    /// Layer opacity [0.0, 1.0].
    pub opacity: f32,

    /// Blend operator against the layers beneath.
    #[serde(default)]
    pub blend_mode: BlendMode,

    /// Declared playback intent.
    #[serde(default)]
    pub is_playing: bool,

    /// Audio volume [0.0, 1.0]. Kept as-is while muted.
    pub volume: f32,

    #[serde(default)]
    pub is_muted: bool,

    /// Playback position in seconds.
    #[serde(default)]
    pub current_time: f64,

    /// Clip duration in seconds; 0 while unknown.
    #[serde(default)]
    pub duration: f64,

    /// Playback rate multiplier.
    pub playback_speed: f64,

    #[serde(default)]
    pub is_looping: bool,

    /// Loop window start in seconds.
    #[serde(default)]
    pub loop_in: f64,

    /// Loop window end in seconds; 0 while unset.
    #[serde(default)]
    pub loop_out: f64,

    /// Markers in insertion order.
    #[serde(default)]
    pub markers: Vec<Marker>,
}

impl Layer {
    pub const DEFAULT_VOLUME: f32 = 0.5;

    /// Create the default layer for a 1-based position within its channel.
    pub fn new(index: usize) -> Self {
        Self {
            id: format!("layer-{index}"),
            name: format!("Layer {index}"),
            source: None,
            opacity: 1.0,
            blend_mode: BlendMode::Normal,
            is_playing: false,
            volume: Self::DEFAULT_VOLUME,
            is_muted: false,
            current_time: 0.0,
            duration: 0.0,
            playback_speed: 1.0,
            is_looping: false,
            loop_in: 0.0,
            loop_out: 0.0,
            markers: Vec::new(),
        }
    }

    /// Whether a media source is assigned.
    pub fn has_source(&self) -> bool {
        self.source.as_deref().is_some_and(|s| !s.is_empty())
    }

    /// Volume actually sent to the media element.
    pub fn effective_volume(&self) -> f32 {
        if self.is_muted {
            0.0
        } else {
            self.volume
        }
    }

    /// The active loop window, if looping is on and the window is usable.
    pub fn active_loop(&self) -> Option<(f64, f64)> {
        (self.is_looping && self.duration > 0.0 && self.loop_in < self.loop_out)
            .then_some((self.loop_in, self.loop_out))
    }

    pub fn marker(&self, marker_id: &str) -> Option<&Marker> {
        self.markers.iter().find(|m| m.id == marker_id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layer() {
        let layer = Layer::new(2);
        assert_eq!(layer.id, "layer-2");
        assert_eq!(layer.name, "Layer 2");
        assert!(!layer.has_source());
        assert_eq!(layer.opacity, 1.0);
        assert_eq!(layer.volume, 0.5);
        assert_eq!(layer.playback_speed, 1.0);
        assert!(layer.markers.is_empty());
    }

    #[test]
    fn test_blend_mode_parse_and_display() {
        for mode in BlendMode::ALL {
            assert_eq!(mode.as_str().parse::<BlendMode>().unwrap(), mode);
        }
        assert_eq!("Screen".parse::<BlendMode>().unwrap(), BlendMode::Screen);
        assert!("add".parse::<BlendMode>().is_err());
    }

    #[test]
    fn test_blend_mode_serializes_lowercase() {
        let json = serde_json::to_string(&BlendMode::Difference).unwrap();
        assert_eq!(json, "\"difference\"");
    }

    #[test]
    fn test_muted_volume() {
        let mut layer = Layer::new(1);
        layer.volume = 0.8;
        layer.is_muted = true;
        assert_eq!(layer.effective_volume(), 0.0);
        assert_eq!(layer.volume, 0.8);
    }

    #[test]
    fn test_active_loop_requires_valid_window() {
        let mut layer = Layer::new(1);
        layer.is_looping = true;
        assert_eq!(layer.active_loop(), None); // unknown duration

        layer.duration = 10.0;
        layer.loop_in = 2.0;
        layer.loop_out = 4.0;
        assert_eq!(layer.active_loop(), Some((2.0, 4.0)));

        layer.is_looping = false;
        assert_eq!(layer.active_loop(), None);
    }

    #[test]
    fn test_empty_source_counts_as_none() {
        let mut layer = Layer::new(1);
        layer.source = Some(String::new());
        assert!(!layer.has_source());
    }
}
