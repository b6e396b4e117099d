//! One layer's playback synchronizer.

use vjmix_common::SyncConfig;
use vjmix_mixer_model::{Layer, LayerKey};

use crate::machine::{
    plan_reconcile, transition, Declared, PlayCommand, PlaybackState, ReconcileInput, SyncEvent,
    TIME_EPSILON,
};
use crate::media::{MediaBackend, MediaSlot, Rgba, TextureId};

/// Outcome of one reconcile pass, including the writes the store should receive.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncReport {
    pub key: LayerKey,
    pub state: PlaybackState,
    /// Measured position after the pass, when the media is ready.
    pub position: Option<f64>,
    /// Newly learned clip duration.
    pub duration: Option<f64>,
    /// Position to write back as the layer's current time.
    pub write_back: Option<f64>,
    /// Playing flag to write back (play refused, or clip ended).
    pub playing: Option<bool>,
}

impl SyncReport {
    fn idle(key: LayerKey, state: PlaybackState) -> Self {
        Self {
            key,
            state,
            position: None,
            duration: None,
            write_back: None,
            playing: None,
        }
    }

    pub fn has_writes(&self) -> bool {
        self.duration.is_some() || self.write_back.is_some() || self.playing.is_some()
    }
}

/// Keeps one layer's media element aligned with the layer's declared state.
#[derive(Debug)]
pub struct LayerSynchronizer {
    key: LayerKey,
    state: PlaybackState,
    source: Option<String>,
    slot: Option<MediaSlot>,
    /// Declared time as the store will hold it after the previous pass.
    last_declared: Option<f64>,
    play_latched: bool,
    applied_rate: Option<f64>,
    applied_volume: Option<f32>,
}

impl LayerSynchronizer {
    pub fn new(key: LayerKey) -> Self {
        Self {
            key,
            state: PlaybackState::Empty,
            source: None,
            slot: None,
            last_declared: None,
            play_latched: false,
            applied_rate: None,
            applied_volume: None,
        }
    }

    pub fn key(&self) -> &LayerKey {
        &self.key
    }

    pub fn state(&self) -> PlaybackState {
        self.state
    }

    pub fn source(&self) -> Option<&str> {
        self.source.as_deref()
    }

    /// Texture of the current media, if any is loaded or loading.
    pub fn texture(&self) -> Option<TextureId> {
        self.slot.as_ref().map(|slot| slot.element().texture())
    }

    /// Sample the current frame; transparent when nothing is decoded yet.
    pub fn sample(&self, u: f32, v: f32) -> Rgba {
        match &self.slot {
            Some(slot) if self.state.is_ready() => slot.element().sample(u, v),
            _ => [0.0; 4],
        }
    }

    pub fn position(&self) -> Option<f64> {
        self.slot
            .as_ref()
            .filter(|_| self.state.is_ready())
            .map(|slot| slot.element().current_time())
    }

    /// Run one reconcile pass against the layer's declared state.
    pub fn reconcile(
        &mut self,
        layer: &Layer,
        backend: &dyn MediaBackend,
        config: &SyncConfig,
    ) -> SyncReport {
        let wanted = layer.source.as_deref().filter(|s| !s.is_empty());
        if wanted != self.source.as_deref() {
            self.switch_source(wanted, backend);
        }

        let mut report = SyncReport::idle(self.key.clone(), self.state);
        let Some(slot) = self.slot.as_mut() else {
            return report;
        };
        let mut ended = false;

        for event in slot.element_mut().poll_events() {
            if let crate::media::MediaEvent::LoadFailed { reason } = &event {
                tracing::warn!(layer = %self.key, url = slot.url(), reason = %reason, "media failed to load");
            }
            let step = transition(self.state, &SyncEvent::Media(event));
            if let Some(duration) = step.duration {
                tracing::info!(layer = %self.key, duration, "media metadata loaded");
                report.duration = Some(duration);
            }
            if step.play_rejected {
                tracing::warn!(layer = %self.key, "play request rejected; layer stays paused");
                self.play_latched = true;
                if config.reconcile_rejected_play {
                    report.playing = Some(false);
                }
            }
            if step.ended {
                ended = true;
                if layer.active_loop().is_none() {
                    tracing::debug!(layer = %self.key, "clip ended");
                    report.playing = Some(false);
                }
            }
            self.state = step.next;
        }

        if !layer.is_playing {
            self.play_latched = false;
        }

        if !self.state.is_ready() {
            report.state = self.state;
            return report;
        }

        let element = slot.element_mut();
        let declared = Declared::from_layer(layer);
        let input = ReconcileInput {
            state: self.state,
            declared,
            declared_time_changed: self
                .last_declared
                .map_or(true, |prev| (declared.time - prev).abs() > TIME_EPSILON),
            actual_time: element.current_time(),
            media_paused: element.is_paused(),
            play_latched: self.play_latched || report.playing == Some(false),
        };

        if let Some(plan) = plan_reconcile(&input, config) {
            if let Some(target) = plan.seek_to {
                tracing::trace!(layer = %self.key, target, looped = plan.looped, "seeking media");
                element.seek(target);
            }
            if self.applied_rate != Some(plan.rate) {
                element.set_playback_rate(plan.rate);
                self.applied_rate = Some(plan.rate);
            }
            if self.applied_volume != Some(plan.volume) {
                element.set_volume(plan.volume);
                self.applied_volume = Some(plan.volume);
            }
            match plan.command {
                Some(PlayCommand::Play) => element.request_play(),
                Some(PlayCommand::Pause) => {
                    element.pause();
                    self.state = transition(self.state, &SyncEvent::Paused).next;
                }
                None => {}
            }

            // A clip that stopped at its end reports where it stopped.
            let write_back = plan.write_back.or_else(|| {
                (ended && (plan.position - declared.time).abs() > TIME_EPSILON)
                    .then_some(plan.position)
            });
            report.position = Some(plan.position);
            report.write_back = write_back;
            self.last_declared = Some(write_back.unwrap_or(declared.time));
        }

        report.state = self.state;
        report
    }

    /// Release the current media and open `url`, if any.
    fn switch_source(&mut self, url: Option<&str>, backend: &dyn MediaBackend) {
        // Drop releases the previous element and its texture.
        self.slot = None;
        self.source = url.map(str::to_string);
        self.last_declared = None;
        self.play_latched = false;
        self.applied_rate = None;
        self.applied_volume = None;

        let Some(url) = url else {
            self.state = transition(self.state, &SyncEvent::SourceCleared).next;
            tracing::debug!(layer = %self.key, "source cleared");
            return;
        };

        self.state = transition(self.state, &SyncEvent::SourceAssigned).next;
        match MediaSlot::open(backend, url) {
            Ok(slot) => {
                tracing::info!(layer = %self.key, url, texture = %slot.element().texture(), "source assigned");
                self.slot = Some(slot);
            }
            Err(e) => {
                tracing::warn!(layer = %self.key, url, error = %e, "could not open media");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::simulated::{SimClock, SimulatedBackend};
    use vjmix_mixer_model::ChannelId;

    fn setup() -> (SimulatedBackend, LayerSynchronizer, Layer) {
        let backend = SimulatedBackend::new(SimClock::new()).with_clip(
            "sim://clip",
            10.0,
            [0.2, 0.4, 0.8, 1.0],
        );
        let mut layer = Layer::new(1);
        layer.source = Some("sim://clip".to_string());
        let sync = LayerSynchronizer::new(LayerKey::new(ChannelId::A, "layer-1"));
        (backend, sync, layer)
    }

    #[test]
    fn test_load_reports_duration() {
        let (backend, mut sync, layer) = setup();
        let report = sync.reconcile(&layer, &backend, &SyncConfig::default());
        assert_eq!(report.state, PlaybackState::ReadyPaused);
        assert_eq!(report.duration, Some(10.0));
        assert_eq!(report.position, Some(0.0));
    }

    #[test]
    fn test_loading_until_metadata() {
        let (backend, mut sync, layer) = setup();
        backend.set_metadata_delay(3);
        let cfg = SyncConfig::default();
        for _ in 0..3 {
            assert_eq!(sync.reconcile(&layer, &backend, &cfg).state, PlaybackState::Loading);
        }
        assert_eq!(sync.reconcile(&layer, &backend, &cfg).state, PlaybackState::ReadyPaused);
    }

    #[test]
    fn test_play_then_pause_writes_back() {
        let (backend, mut sync, mut layer) = setup();
        let cfg = SyncConfig::default();
        sync.reconcile(&layer, &backend, &cfg);

        layer.is_playing = true;
        sync.reconcile(&layer, &backend, &cfg);
        let report = sync.reconcile(&layer, &backend, &cfg);
        assert_eq!(report.state, PlaybackState::ReadyPlaying);

        backend.clock().advance(1.0);
        let report = sync.reconcile(&layer, &backend, &cfg);
        assert_eq!(report.write_back, Some(1.0));
        layer.current_time = 1.0;

        backend.clock().advance(0.1);
        layer.is_playing = false;
        let report = sync.reconcile(&layer, &backend, &cfg);
        assert_eq!(report.state, PlaybackState::ReadyPaused);
        let written = report.write_back.unwrap();
        assert!((written - 1.1).abs() < 1e-9);
    }

    #[test]
    fn test_scrub_seeks_media() {
        let (backend, mut sync, mut layer) = setup();
        let cfg = SyncConfig::default();
        sync.reconcile(&layer, &backend, &cfg);
        layer.current_time = 6.0;
        let report = sync.reconcile(&layer, &backend, &cfg);
        assert_eq!(report.position, Some(6.0));
        assert_eq!(sync.position(), Some(6.0));
    }

    #[test]
    fn test_rejection_reconciles_flag() {
        let (backend, mut sync, mut layer) = setup();
        backend.set_reject_play(true);
        let cfg = SyncConfig::default();
        layer.is_playing = true;
        sync.reconcile(&layer, &backend, &cfg);
        let report = sync.reconcile(&layer, &backend, &cfg);
        assert_eq!(report.state, PlaybackState::ReadyPaused);
        assert_eq!(report.playing, Some(false));
    }

    #[test]
    fn test_rejection_latches_without_reconcile() {
        let (backend, mut sync, mut layer) = setup();
        backend.set_reject_play(true);
        let cfg = SyncConfig {
            reconcile_rejected_play: false,
            ..SyncConfig::default()
        };
        layer.is_playing = true;
        sync.reconcile(&layer, &backend, &cfg);
        let report = sync.reconcile(&layer, &backend, &cfg);
        assert_eq!(report.playing, None);

        // No further requests while latched.
        for _ in 0..5 {
            let report = sync.reconcile(&layer, &backend, &cfg);
            assert_eq!(report.state, PlaybackState::ReadyPaused);
            assert_eq!(report.playing, None);
        }

        // Toggling the intent re-arms the request.
        backend.set_reject_play(false);
        layer.is_playing = false;
        sync.reconcile(&layer, &backend, &cfg);
        layer.is_playing = true;
        sync.reconcile(&layer, &backend, &cfg);
        let report = sync.reconcile(&layer, &backend, &cfg);
        assert_eq!(report.state, PlaybackState::ReadyPlaying);
    }

    #[test]
    fn test_source_switch_releases_previous_media() {
        let (backend, mut sync, mut layer) = setup();
        backend.add_clip("sim://other", 5.0, [1.0; 4]);
        let cfg = SyncConfig::default();
        sync.reconcile(&layer, &backend, &cfg);
        let first = sync.texture();

        layer.source = Some("sim://other".to_string());
        let report = sync.reconcile(&layer, &backend, &cfg);
        assert_eq!(report.duration, Some(5.0));
        assert_eq!(backend.live_elements(), 1);
        assert_ne!(sync.texture(), first);

        layer.source = None;
        assert_eq!(sync.reconcile(&layer, &backend, &cfg).state, PlaybackState::Empty);
        assert_eq!(backend.live_elements(), 0);
        assert_eq!(sync.texture(), None);
    }

    #[test]
    fn test_load_failure_stays_loading() {
        let (backend, mut sync, mut layer) = setup();
        layer.source = Some("sim://nowhere".to_string());
        let cfg = SyncConfig::default();
        for _ in 0..3 {
            let report = sync.reconcile(&layer, &backend, &cfg);
            assert_eq!(report.state, PlaybackState::Loading);
            assert!(!report.has_writes());
        }
    }

    #[test]
    fn test_clip_end_clears_playing() {
        let (backend, mut sync, mut layer) = setup();
        let cfg = SyncConfig::default();
        sync.reconcile(&layer, &backend, &cfg);
        layer.is_playing = true;
        sync.reconcile(&layer, &backend, &cfg);
        backend.clock().advance(11.0);
        let report = sync.reconcile(&layer, &backend, &cfg);
        assert_eq!(report.playing, Some(false));
        assert_eq!(report.state, PlaybackState::ReadyPaused);
        assert_eq!(report.write_back, Some(10.0));
    }

    #[test]
    fn test_loop_keeps_position_in_window() {
        let (backend, mut sync, mut layer) = setup();
        let cfg = SyncConfig::default();
        sync.reconcile(&layer, &backend, &cfg);
        layer.duration = 10.0;
        layer.is_looping = true;
        layer.loop_in = 2.0;
        layer.loop_out = 3.0;
        layer.is_playing = true;

        for _ in 0..200 {
            backend.clock().advance(1.0 / 30.0);
            let report = sync.reconcile(&layer, &backend, &cfg);
            let position = report.position.unwrap();
            assert!((2.0..=3.0).contains(&position), "position {position} left the loop");
            if let Some(t) = report.write_back {
                layer.current_time = t;
            }
            assert_eq!(report.playing, None);
        }
    }
}
