//! All layer synchronizers of the mixer.

use std::collections::HashMap;

use vjmix_common::SyncConfig;
use vjmix_mixer_model::{ChannelId, LayerKey, MixerState, MixerStore};

use crate::machine::PlaybackState;
use crate::media::{MediaBackend, Rgba, TextureId};
use crate::synchronizer::{LayerSynchronizer, SyncReport};

/// One synchronizer per (channel, layer), each owning its own media.
#[derive(Debug, Default)]
pub struct SynchronizerBank {
    config: SyncConfig,
    layers: HashMap<LayerKey, LayerSynchronizer>,
}

impl SynchronizerBank {
    pub fn new(config: SyncConfig) -> Self {
        Self {
            config,
            layers: HashMap::new(),
        }
    }

    pub fn config(&self) -> &SyncConfig {
        &self.config
    }

    /// Reconcile every layer in `state`.
    ///
    /// Synchronizers for layers that no longer exist are dropped, releasing
    /// their media. The returned reports carry the store writes; apply them
    /// with [`apply_reports`] once the whole pass is done.
    pub fn reconcile(&mut self, state: &MixerState, backend: &dyn MediaBackend) -> Vec<SyncReport> {
        let before = self.layers.len();
        self.layers
            .retain(|key, _| state.layer_by_key(key).is_some());
        if self.layers.len() != before {
            tracing::debug!(dropped = before - self.layers.len(), "dropped stale synchronizers");
        }

        let mut reports = Vec::new();
        for (key, layer) in state.layers() {
            let sync = self
                .layers
                .entry(key.clone())
                .or_insert_with(|| LayerSynchronizer::new(key));
            reports.push(sync.reconcile(layer, backend, &self.config));
        }
        reports
    }

    /// Release every media element of one channel.
    pub fn teardown_channel(&mut self, channel: ChannelId) {
        let before = self.layers.len();
        self.layers.retain(|key, _| key.channel != channel);
        tracing::info!(%channel, released = before - self.layers.len(), "channel torn down");
    }

    pub fn teardown(&mut self) {
        self.layers.clear();
    }

    pub fn get(&self, key: &LayerKey) -> Option<&LayerSynchronizer> {
        self.layers.get(key)
    }

    pub fn state(&self, key: &LayerKey) -> PlaybackState {
        self.layers
            .get(key)
            .map_or(PlaybackState::Empty, LayerSynchronizer::state)
    }

    pub fn texture(&self, key: &LayerKey) -> Option<TextureId> {
        self.layers.get(key).and_then(LayerSynchronizer::texture)
    }

    pub fn sample(&self, key: &LayerKey, u: f32, v: f32) -> Rgba {
        self.layers
            .get(key)
            .map_or([0.0; 4], |sync| sync.sample(u, v))
    }

    /// Sample whichever layer's media currently owns `texture`.
    pub fn sample_texture(&self, texture: TextureId, u: f32, v: f32) -> Rgba {
        self.layers
            .values()
            .find(|sync| sync.texture() == Some(texture))
            .map_or([0.0; 4], |sync| sync.sample(u, v))
    }

    /// Layer keys with their playback state, in no particular order.
    pub fn states(&self) -> impl Iterator<Item = (&LayerKey, PlaybackState)> {
        self.layers.iter().map(|(key, sync)| (key, sync.state()))
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

/// Apply the store writes carried by a reconcile pass. Returns the number of
/// effective mutations.
pub fn apply_reports(store: &MixerStore, reports: &[SyncReport]) -> usize {
    let mut applied = 0;
    for report in reports.iter().filter(|r| r.has_writes()) {
        let (channel, layer_id) = (report.key.channel, report.key.layer_id.as_str());
        if let Some(duration) = report.duration {
            applied += usize::from(store.set_layer_duration(channel, layer_id, duration));
        }
        if let Some(time) = report.write_back {
            applied += usize::from(store.set_layer_time(channel, layer_id, time));
        }
        if let Some(playing) = report.playing {
            applied += usize::from(store.set_layer_playing(channel, layer_id, playing));
        }
    }
    applied
}
