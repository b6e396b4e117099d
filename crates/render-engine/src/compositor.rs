//! Layer compositor: turns a mixer snapshot and channel weights into an
//! ordered list of render directives.
//!
//! Materials are cached per layer and rebuilt only when one of their inputs
//! (layer opacity, blend mode, channel weight, texture) changes. Video
//! advancing does not count as a change; the texture handle stays the same.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use vjmix_common::RenderConfig;
use vjmix_mixer_model::{BlendMode, ChannelId, LayerKey, MixerState};
use vjmix_playback::{Rgba, TextureId};

use crate::blend::{BlendOperator, BlendTable};
use crate::mix_weight::MixWeights;

/// Fill color for layers without media.
pub const PLACEHOLDER_COLOR: Rgba = [0x11 as f32 / 255.0, 0x11 as f32 / 255.0, 0x11 as f32 / 255.0, 1.0];

/// Resolves the texture currently bound to a layer.
pub trait TextureLookup {
    fn texture(&self, key: &LayerKey) -> Option<TextureId>;
}

/// Draw parameters for one textured layer.
#[derive(Debug, Clone, PartialEq)]
pub struct Material {
    pub texture: TextureId,
    /// Effective opacity: layer opacity times snapped channel weight.
    pub opacity: f32,
    pub operator: BlendOperator,
}

#[derive(Debug, Clone, PartialEq)]
pub struct RenderDirective {
    pub key: LayerKey,
    pub material: Arc<Material>,
}

/// Neutral stand-in drawn for a layer with no source.
#[derive(Debug, Clone, PartialEq)]
pub struct Placeholder {
    pub key: LayerKey,
    pub color: Rgba,
    pub opacity: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RenderItem {
    Directive(RenderDirective),
    Placeholder(Placeholder),
}

impl RenderItem {
    pub fn key(&self) -> &LayerKey {
        match self {
            RenderItem::Directive(d) => &d.key,
            RenderItem::Placeholder(p) => &p.key,
        }
    }

    pub fn opacity(&self) -> f32 {
        match self {
            RenderItem::Directive(d) => d.material.opacity,
            RenderItem::Placeholder(p) => p.opacity,
        }
    }

    pub fn as_directive(&self) -> Option<&RenderDirective> {
        match self {
            RenderItem::Directive(d) => Some(d),
            RenderItem::Placeholder(_) => None,
        }
    }
}

/// One channel's layers, bottom to top.
#[derive(Debug, Clone, PartialEq)]
pub struct ChannelPass {
    pub channel: ChannelId,
    /// Channel-level blend mode, used when the pass is composited as a group.
    pub blend_mode: BlendMode,
    pub weight: f32,
    pub items: Vec<RenderItem>,
}

/// Everything needed to draw one output frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ComposedFrame {
    pub weights: MixWeights,
    /// Passes in draw order: A beneath B.
    pub passes: Vec<ChannelPass>,
}

impl ComposedFrame {
    pub fn items(&self) -> impl Iterator<Item = &RenderItem> {
        self.passes.iter().flat_map(|pass| pass.items.iter())
    }

    pub fn directive(&self, key: &LayerKey) -> Option<&RenderDirective> {
        self.items()
            .filter_map(RenderItem::as_directive)
            .find(|d| &d.key == key)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct MaterialInputs {
    opacity: f32,
    blend_mode: BlendMode,
    weight: f32,
    texture: TextureId,
}

#[derive(Debug)]
struct CachedMaterial {
    inputs: MaterialInputs,
    material: Arc<Material>,
}

/// Builds [`ComposedFrame`]s and owns the material cache.
#[derive(Debug)]
pub struct Compositor {
    config: RenderConfig,
    table: BlendTable,
    cache: HashMap<LayerKey, CachedMaterial>,
    materials_built: u64,
}

impl Compositor {
    pub fn new(config: RenderConfig) -> Self {
        let table = BlendTable::new(config.overlay_boost);
        Self {
            config,
            table,
            cache: HashMap::new(),
            materials_built: 0,
        }
    }

    pub fn blend_table(&self) -> &BlendTable {
        &self.table
    }

    /// Number of materials (re)built since creation.
    pub fn materials_built(&self) -> u64 {
        self.materials_built
    }

    /// Snap a channel weight to exactly 0 or 1 near the bounds.
    pub fn snap_weight(&self, weight: f32) -> f32 {
        let eps = self.config.opacity_epsilon;
        if weight <= eps {
            0.0
        } else if weight >= 1.0 - eps {
            1.0
        } else {
            weight
        }
    }

    /// Compose both channels, A beneath B.
    pub fn compose(
        &mut self,
        state: &MixerState,
        weights: MixWeights,
        textures: &dyn TextureLookup,
    ) -> ComposedFrame {
        self.compose_channels(state, weights, &ChannelId::ALL, textures)
    }

    /// Compose a single channel at full weight, as its preview monitor shows it.
    pub fn preview(
        &mut self,
        state: &MixerState,
        channel: ChannelId,
        textures: &dyn TextureLookup,
    ) -> ComposedFrame {
        self.compose_channels(state, MixWeights::solo(channel), &[channel], textures)
    }

    fn compose_channels(
        &mut self,
        state: &MixerState,
        weights: MixWeights,
        channels: &[ChannelId],
        textures: &dyn TextureLookup,
    ) -> ComposedFrame {
        let mut seen = HashSet::new();
        let mut passes = Vec::with_capacity(channels.len());

        for &channel_id in channels {
            let channel = state.channel(channel_id);
            let weight = self.snap_weight(weights.for_channel(channel_id));
            let mut items = Vec::with_capacity(channel.layers.len());

            for layer in &channel.layers {
                let key = LayerKey::new(channel_id, layer.id.clone());

                if !layer.has_source() {
                    items.push(RenderItem::Placeholder(Placeholder {
                        key,
                        color: PLACEHOLDER_COLOR,
                        opacity: self.config.placeholder_opacity * weight,
                    }));
                    continue;
                }

                let Some(texture) = textures.texture(&key) else {
                    tracing::trace!(layer = %key, "no texture bound; layer skipped");
                    continue;
                };

                let inputs = MaterialInputs {
                    opacity: layer.opacity,
                    blend_mode: layer.blend_mode,
                    weight,
                    texture,
                };
                let material = self.material(&key, inputs);
                seen.insert(key.clone());
                items.push(RenderItem::Directive(RenderDirective { key, material }));
            }

            passes.push(ChannelPass {
                channel: channel_id,
                blend_mode: channel.blend_mode,
                weight,
                items,
            });
        }

        self.cache.retain(|key, _| seen.contains(key));
        ComposedFrame { weights, passes }
    }

    fn material(&mut self, key: &LayerKey, inputs: MaterialInputs) -> Arc<Material> {
        if let Some(cached) = self.cache.get(key) {
            if cached.inputs == inputs {
                return Arc::clone(&cached.material);
            }
        }

        let opacity = if inputs.weight == 0.0 {
            0.0
        } else if inputs.weight == 1.0 {
            inputs.opacity
        } else {
            inputs.opacity * inputs.weight
        };
        let material = Arc::new(Material {
            texture: inputs.texture,
            opacity,
            operator: self.table.get(inputs.blend_mode),
        });
        self.materials_built += 1;
        tracing::trace!(layer = %key, opacity, blend = %inputs.blend_mode, "material built");

        self.cache.insert(
            key.clone(),
            CachedMaterial {
                inputs,
                material: Arc::clone(&material),
            },
        );
        material
    }
}

impl Default for Compositor {
    fn default() -> Self {
        Self::new(RenderConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mix_weight::mix_weights;
    use vjmix_mixer_model::MixerStore;

    /// Every sourced layer gets a texture derived from its position.
    struct FixedTextures;

    impl TextureLookup for FixedTextures {
        fn texture(&self, key: &LayerKey) -> Option<TextureId> {
            let base = match key.channel {
                ChannelId::A => 100,
                ChannelId::B => 200,
            };
            let index: u64 = key.layer_id.trim_start_matches("layer-").parse().ok()?;
            Some(TextureId(base + index))
        }
    }

    fn sourced_store() -> MixerStore {
        let store = MixerStore::default();
        store.set_layer_source(ChannelId::A, "layer-1", Some("sim://a"));
        store.set_layer_source(ChannelId::B, "layer-1", Some("sim://b"));
        store
    }

    fn key(channel: ChannelId, id: &str) -> LayerKey {
        LayerKey::new(channel, id)
    }

    #[test]
    fn test_half_fader_halves_opacity() {
        let store = sourced_store();
        let mut compositor = Compositor::default();
        let frame = compositor.compose(&store.snapshot(), mix_weights(0.5), &FixedTextures);
        let d = frame.directive(&key(ChannelId::A, "layer-1")).unwrap();
        assert!((d.material.opacity - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_fader_endpoints_are_exact() {
        let store = sourced_store();
        store.set_layer_opacity(ChannelId::A, "layer-1", 0.8);
        let mut compositor = Compositor::default();

        let frame = compositor.compose(&store.snapshot(), mix_weights(0.0), &FixedTextures);
        assert_eq!(frame.directive(&key(ChannelId::A, "layer-1")).unwrap().material.opacity, 0.8);
        assert_eq!(frame.directive(&key(ChannelId::B, "layer-1")).unwrap().material.opacity, 0.0);
    }

    #[test]
    fn test_weights_near_bounds_snap() {
        let store = sourced_store();
        store.set_layer_opacity(ChannelId::A, "layer-1", 0.8);
        let mut compositor = Compositor::default();
        let frame = compositor.compose(&store.snapshot(), mix_weights(0.00001), &FixedTextures);
        assert_eq!(frame.directive(&key(ChannelId::A, "layer-1")).unwrap().material.opacity, 0.8);
        assert_eq!(frame.directive(&key(ChannelId::B, "layer-1")).unwrap().material.opacity, 0.0);
    }

    #[test]
    fn test_draw_order_and_placeholders() {
        let store = sourced_store();
        let mut compositor = Compositor::default();
        let frame = compositor.compose(&store.snapshot(), mix_weights(0.5), &FixedTextures);

        let order: Vec<String> = frame.items().map(|i| i.key().to_string()).collect();
        assert_eq!(
            order,
            ["A/layer-1", "A/layer-2", "A/layer-3", "B/layer-1", "B/layer-2", "B/layer-3"]
        );

        let placeholder = frame
            .items()
            .find_map(|i| match i {
                RenderItem::Placeholder(p) => Some(p),
                RenderItem::Directive(_) => None,
            })
            .unwrap();
        assert_eq!(placeholder.color, PLACEHOLDER_COLOR);
        assert!((placeholder.opacity - 0.15).abs() < 1e-6);
    }

    #[test]
    fn test_materials_rebuilt_only_on_change() {
        let store = sourced_store();
        let mut compositor = Compositor::default();

        compositor.compose(&store.snapshot(), mix_weights(0.5), &FixedTextures);
        assert_eq!(compositor.materials_built(), 2);

        for _ in 0..10 {
            compositor.compose(&store.snapshot(), mix_weights(0.5), &FixedTextures);
        }
        assert_eq!(compositor.materials_built(), 2);

        store.set_layer_blend_mode(ChannelId::B, "layer-1", BlendMode::Screen);
        compositor.compose(&store.snapshot(), mix_weights(0.5), &FixedTextures);
        assert_eq!(compositor.materials_built(), 3);

        compositor.compose(&store.snapshot(), mix_weights(0.7), &FixedTextures);
        assert_eq!(compositor.materials_built(), 5);
    }

    #[test]
    fn test_cached_material_is_shared() {
        let store = sourced_store();
        let mut compositor = Compositor::default();
        let k = key(ChannelId::A, "layer-1");
        let first = compositor.compose(&store.snapshot(), mix_weights(0.5), &FixedTextures);
        let second = compositor.compose(&store.snapshot(), mix_weights(0.5), &FixedTextures);
        assert!(Arc::ptr_eq(
            &first.directive(&k).unwrap().material,
            &second.directive(&k).unwrap().material
        ));
    }

    #[test]
    fn test_cleared_layer_is_evicted() {
        let store = sourced_store();
        let mut compositor = Compositor::default();
        compositor.compose(&store.snapshot(), mix_weights(0.5), &FixedTextures);
        store.set_layer_source(ChannelId::A, "layer-1", None);
        compositor.compose(&store.snapshot(), mix_weights(0.5), &FixedTextures);
        store.set_layer_source(ChannelId::A, "layer-1", Some("sim://a"));
        compositor.compose(&store.snapshot(), mix_weights(0.5), &FixedTextures);
        assert_eq!(compositor.materials_built(), 3);
    }

    #[test]
    fn test_preview_renders_single_channel_at_full_weight() {
        let store = sourced_store();
        store.set_master_fader(0.0);
        let mut compositor = Compositor::default();
        let frame = compositor.preview(&store.snapshot(), ChannelId::B, &FixedTextures);
        assert_eq!(frame.passes.len(), 1);
        assert_eq!(frame.passes[0].channel, ChannelId::B);
        assert_eq!(frame.directive(&key(ChannelId::B, "layer-1")).unwrap().material.opacity, 1.0);
    }

    #[test]
    fn test_channel_blend_mode_is_carried() {
        let store = sourced_store();
        store.set_channel_blend_mode(ChannelId::B, BlendMode::Screen);
        let mut compositor = Compositor::default();
        let frame = compositor.compose(&store.snapshot(), mix_weights(0.5), &FixedTextures);
        assert_eq!(frame.passes[0].blend_mode, BlendMode::Normal);
        assert_eq!(frame.passes[1].blend_mode, BlendMode::Screen);
    }
}
