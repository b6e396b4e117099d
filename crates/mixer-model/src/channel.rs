//! Channel identity and layer stacks.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::layer::{BlendMode, Layer};

/// Identity of one of the two mixer channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum ChannelId {
    A,
    B,
}

impl ChannelId {
    /// Both channels in draw order (A beneath B).
    pub const ALL: [ChannelId; 2] = [ChannelId::A, ChannelId::B];

    pub fn as_str(self) -> &'static str {
        match self {
            ChannelId::A => "A",
            ChannelId::B => "B",
        }
    }

    /// The opposite side of the crossfader.
    pub fn other(self) -> ChannelId {
        match self {
            ChannelId::A => ChannelId::B,
            ChannelId::B => ChannelId::A,
        }
    }

    /// Accent color used for this channel's markers.
    pub fn marker_color(self) -> &'static str {
        match self {
            ChannelId::A => "#00ffff",
            ChannelId::B => "#ff00ff",
        }
    }
}

impl fmt::Display for ChannelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when parsing a channel identity other than A or B.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown channel: {0} (expected A or B)")]
pub struct UnknownChannel(pub String);

impl FromStr for ChannelId {
    type Err = UnknownChannel;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "A" | "a" => Ok(ChannelId::A),
            "B" | "b" => Ok(ChannelId::B),
            other => Err(UnknownChannel(other.to_string())),
        }
    }
}

/// One stack of layers. Later layers draw on top of earlier ones.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: ChannelId,
    pub name: String,

    /// Channel-level blend mode, applied when the channel pass is composited.
    #[serde(default)]
    pub blend_mode: BlendMode,

    /// Fixed-length layer stack.
    pub layers: Vec<Layer>,
}

impl Channel {
    /// Create a channel populated with `layer_count` default layers.
    pub fn new(id: ChannelId, layer_count: usize) -> Self {
        Self {
            id,
            name: format!("Channel {id}"),
            blend_mode: BlendMode::Normal,
            layers: (1..=layer_count).map(Layer::new).collect(),
        }
    }

    pub fn layer(&self, layer_id: &str) -> Option<&Layer> {
        self.layers.iter().find(|l| l.id == layer_id)
    }

    pub fn layer_mut(&mut self, layer_id: &str) -> Option<&mut Layer> {
        self.layers.iter_mut().find(|l| l.id == layer_id)
    }
}

/// The two channels, keyed by identity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channels {
    #[serde(rename = "A")]
    pub a: Channel,
    #[serde(rename = "B")]
    pub b: Channel,
}

impl Channels {
    pub fn new(layer_count: usize) -> Self {
        Self {
            a: Channel::new(ChannelId::A, layer_count),
            b: Channel::new(ChannelId::B, layer_count),
        }
    }

    pub fn get(&self, id: ChannelId) -> &Channel {
        match id {
            ChannelId::A => &self.a,
            ChannelId::B => &self.b,
        }
    }

    pub fn get_mut(&mut self, id: ChannelId) -> &mut Channel {
        match id {
            ChannelId::A => &mut self.a,
            ChannelId::B => &mut self.b,
        }
    }

    /// Channels in draw order.
    pub fn iter(&self) -> impl Iterator<Item = &Channel> {
        [&self.a, &self.b].into_iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_channel_population() {
        let channel = Channel::new(ChannelId::B, 3);
        assert_eq!(channel.name, "Channel B");
        let ids: Vec<_> = channel.layers.iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, ["layer-1", "layer-2", "layer-3"]);
    }

    #[test]
    fn test_channel_id_parse() {
        assert_eq!("a".parse::<ChannelId>().unwrap(), ChannelId::A);
        assert_eq!(" B ".parse::<ChannelId>().unwrap(), ChannelId::B);
        assert!("C".parse::<ChannelId>().is_err());
    }

    #[test]
    fn test_channels_serialize_keyed_by_identity() {
        let channels = Channels::new(1);
        let value = serde_json::to_value(&channels).unwrap();
        assert_eq!(value["A"]["id"], "A");
        assert_eq!(value["B"]["layers"][0]["id"], "layer-1");
    }

    #[test]
    fn test_draw_order() {
        let channels = Channels::new(2);
        let order: Vec<_> = channels.iter().map(|c| c.id).collect();
        assert_eq!(order, [ChannelId::A, ChannelId::B]);
        assert_eq!(ChannelId::A.other(), ChannelId::B);
    }
}
