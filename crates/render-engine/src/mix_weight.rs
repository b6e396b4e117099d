//! Master crossfader to per-channel weights.

use vjmix_mixer_model::ChannelId;

/// Per-channel contribution to the output frame.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MixWeights {
    pub a: f32,
    pub b: f32,
}

impl MixWeights {
    /// Only `channel` contributes, at full weight.
    pub fn solo(channel: ChannelId) -> Self {
        match channel {
            ChannelId::A => Self { a: 1.0, b: 0.0 },
            ChannelId::B => Self { a: 0.0, b: 1.0 },
        }
    }

    pub fn for_channel(&self, channel: ChannelId) -> f32 {
        match channel {
            ChannelId::A => self.a,
            ChannelId::B => self.b,
        }
    }
}

/// Linear crossfade: fader 0 is all A, 1 is all B.
///
/// The endpoints are exact, so a fully faded-out channel contributes nothing.
/// NaN is treated as the centre position and other inputs are clamped.
pub fn mix_weights(fader: f32) -> MixWeights {
    let fader = if fader.is_nan() { 0.5 } else { fader };
    if fader <= 0.0 {
        MixWeights { a: 1.0, b: 0.0 }
    } else if fader >= 1.0 {
        MixWeights { a: 0.0, b: 1.0 }
    } else {
        MixWeights {
            a: 1.0 - fader,
            b: fader,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoints_are_exact() {
        assert_eq!(mix_weights(0.0), MixWeights { a: 1.0, b: 0.0 });
        assert_eq!(mix_weights(1.0), MixWeights { a: 0.0, b: 1.0 });
    }

    #[test]
    fn test_centre() {
        let w = mix_weights(0.5);
        assert_eq!(w.a, 0.5);
        assert_eq!(w.b, 0.5);
    }

    #[test]
    fn test_out_of_range_is_clamped() {
        assert_eq!(mix_weights(-2.0), mix_weights(0.0));
        assert_eq!(mix_weights(7.0), mix_weights(1.0));
        assert_eq!(mix_weights(f32::INFINITY), mix_weights(1.0));
        assert_eq!(mix_weights(f32::NAN), mix_weights(0.5));
    }

    #[test]
    fn test_solo() {
        assert_eq!(MixWeights::solo(ChannelId::B).for_channel(ChannelId::B), 1.0);
        assert_eq!(MixWeights::solo(ChannelId::B).for_channel(ChannelId::A), 0.0);
    }
}
