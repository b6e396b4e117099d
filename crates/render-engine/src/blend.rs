//! Blend modes as fixed-function blend state.
//!
//! Each [`BlendMode`] maps to a blend equation, a source factor and a
//! destination factor, plus an opacity multiplier. Overlay has no
//! fixed-function form and is approximated by multiply with boosted opacity.

use serde::Serialize;

use vjmix_mixer_model::BlendMode;
use vjmix_playback::Rgba;

/// Default opacity multiplier for the overlay approximation.
pub const OVERLAY_BOOST: f32 = 1.2;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendEquation {
    Add,
    ReverseSubtract,
    Max,
    Min,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum BlendFactor {
    Zero,
    One,
    SrcAlpha,
    OneMinusSrcAlpha,
    SrcColor,
    OneMinusDstColor,
}

impl BlendFactor {
    fn weight(self, src: f32, src_alpha: f32, dst: f32) -> f32 {
        match self {
            BlendFactor::Zero => 0.0,
            BlendFactor::One => 1.0,
            BlendFactor::SrcAlpha => src_alpha,
            BlendFactor::OneMinusSrcAlpha => 1.0 - src_alpha,
            BlendFactor::SrcColor => src,
            BlendFactor::OneMinusDstColor => 1.0 - dst,
        }
    }

    fn uses_src_alpha(self) -> bool {
        matches!(self, BlendFactor::SrcAlpha | BlendFactor::OneMinusSrcAlpha)
    }
}

/// Blend state for one mode.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct BlendOperator {
    pub mode: BlendMode,
    pub equation: BlendEquation,
    pub src_factor: BlendFactor,
    pub dst_factor: BlendFactor,
    /// Multiplier applied to the material opacity (capped at 1).
    pub opacity_scale: f32,
}

impl BlendOperator {
    const fn new(
        mode: BlendMode,
        equation: BlendEquation,
        src_factor: BlendFactor,
        dst_factor: BlendFactor,
    ) -> Self {
        Self {
            mode,
            equation,
            src_factor,
            dst_factor,
            opacity_scale: 1.0,
        }
    }

    /// Opacity after this operator's scale.
    pub fn scaled_opacity(&self, opacity: f32) -> f32 {
        (opacity * self.opacity_scale).clamp(0.0, 1.0)
    }

    /// Blend `src` onto `dst` at `opacity` on the CPU.
    ///
    /// The source alpha is the texel alpha times the scaled opacity. Min and
    /// max ignore their factors, as in fixed-function blending; operators
    /// whose factors do not read source alpha are faded in by that alpha so
    /// opacity and crossfade weight still apply to them.
    pub fn apply(&self, src: Rgba, dst: Rgba, opacity: f32) -> Rgba {
        let alpha = (src[3] * self.scaled_opacity(opacity)).clamp(0.0, 1.0);
        if alpha <= 0.0 {
            return dst;
        }

        let mut out = dst;
        for i in 0..3 {
            let s = src[i];
            let d = dst[i];
            let sf = self.src_factor.weight(s, alpha, d);
            let df = self.dst_factor.weight(s, alpha, d);
            let blended = match self.equation {
                BlendEquation::Add => s * sf + d * df,
                BlendEquation::ReverseSubtract => d * df - s * sf,
                BlendEquation::Max => s.max(d),
                BlendEquation::Min => s.min(d),
            };
            let value = if self.reads_src_alpha() {
                blended
            } else {
                d + (blended - d) * alpha
            };
            out[i] = value.clamp(0.0, 1.0);
        }
        out[3] = (alpha + dst[3] * (1.0 - alpha)).clamp(0.0, 1.0);
        out
    }

    fn reads_src_alpha(&self) -> bool {
        !matches!(self.equation, BlendEquation::Max | BlendEquation::Min)
            && (self.src_factor.uses_src_alpha() || self.dst_factor.uses_src_alpha())
    }
}

/// Operators for every blend mode, indexed in [`BlendMode::ALL`] order.
#[derive(Debug, Clone, PartialEq)]
pub struct BlendTable {
    operators: [BlendOperator; 7],
}

impl BlendTable {
    pub fn new(overlay_boost: f32) -> Self {
        use BlendEquation::*;
        use BlendFactor::*;

        let overlay = BlendOperator {
            opacity_scale: if overlay_boost.is_finite() && overlay_boost > 0.0 {
                overlay_boost
            } else {
                OVERLAY_BOOST
            },
            ..BlendOperator::new(BlendMode::Overlay, Add, Zero, SrcColor)
        };

        Self {
            operators: [
                BlendOperator::new(BlendMode::Normal, Add, SrcAlpha, OneMinusSrcAlpha),
                BlendOperator::new(BlendMode::Multiply, Add, Zero, SrcColor),
                BlendOperator::new(BlendMode::Screen, Add, OneMinusDstColor, One),
                overlay,
                BlendOperator::new(BlendMode::Lighten, Max, SrcAlpha, OneMinusSrcAlpha),
                BlendOperator::new(BlendMode::Darken, Min, SrcAlpha, OneMinusSrcAlpha),
                BlendOperator::new(BlendMode::Difference, ReverseSubtract, SrcAlpha, OneMinusSrcAlpha),
            ],
        }
    }

    pub fn get(&self, mode: BlendMode) -> BlendOperator {
        self.operators[Self::index(mode)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &BlendOperator> {
        self.operators.iter()
    }

    fn index(mode: BlendMode) -> usize {
        match mode {
            BlendMode::Normal => 0,
            BlendMode::Multiply => 1,
            BlendMode::Screen => 2,
            BlendMode::Overlay => 3,
            BlendMode::Lighten => 4,
            BlendMode::Darken => 5,
            BlendMode::Difference => 6,
        }
    }
}

impl Default for BlendTable {
    fn default() -> Self {
        Self::new(OVERLAY_BOOST)
    }
}
