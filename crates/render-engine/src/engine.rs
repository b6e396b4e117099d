//! The per-frame driver tying store, playback and rendering together.

use std::sync::Arc;

use vjmix_common::{AppConfig, FpsMeter, PerformanceStatus, VjmixError, VjmixResult};
use vjmix_mixer_model::{ChannelId, LayerKey, MixerStore};
use vjmix_playback::{apply_reports, MediaBackend, Rgba, SyncReport, SynchronizerBank, TextureId};

use crate::blend::BlendTable;
use crate::capture::{CaptureStream, NullSink, RecordingSettings, RecordingSink, RecordingSummary};
use crate::compositor::{ComposedFrame, Compositor, RenderItem, TextureLookup};
use crate::mix_weight::{mix_weights, MixWeights};
use crate::output::{OutputLink, OutputWindow};
use crate::surface::{RenderTarget, SoftwareSurface, TextureSampler};

impl TextureLookup for SynchronizerBank {
    fn texture(&self, key: &LayerKey) -> Option<TextureId> {
        SynchronizerBank::texture(self, key)
    }
}

impl TextureSampler for SynchronizerBank {
    fn sample(&self, texture: TextureId, u: f32, v: f32) -> Rgba {
        self.sample_texture(texture, u, v)
    }
}

/// Builds the sink for each new recording.
pub type SinkFactory = Box<dyn FnMut(&RecordingSettings) -> Box<dyn RecordingSink>>;

/// What one tick did.
#[derive(Debug, Clone)]
pub struct TickReport {
    pub frame: u64,
    pub weights: MixWeights,
    pub directives: usize,
    pub placeholders: usize,
    /// Effective store mutations from playback write-backs.
    pub store_writes: usize,
    pub captured: bool,
    /// Measured FPS, when a measurement window closed on this tick.
    pub fps: Option<u32>,
    pub sync: Vec<SyncReport>,
    pub composed: ComposedFrame,
}

/// Owns every per-frame component and runs them in order.
pub struct MixEngine {
    config: AppConfig,
    store: Arc<MixerStore>,
    backend: Box<dyn MediaBackend>,
    bank: SynchronizerBank,
    compositor: Compositor,
    previews: [Compositor; 2],
    target: Box<dyn RenderTarget>,
    capture: Option<CaptureStream>,
    sink_factory: SinkFactory,
    last_recording: Option<RecordingSummary>,
    fps: FpsMeter,
    frames: u64,
    output: Option<OutputLink>,
}

impl MixEngine {
    pub fn new(
        config: AppConfig,
        store: Arc<MixerStore>,
        backend: Box<dyn MediaBackend>,
    ) -> VjmixResult<Self> {
        config.validate()?;
        let surface = SoftwareSurface::new(config.render.width, config.render.height)?
            .with_blend_table(BlendTable::new(config.render.overlay_boost));

        Ok(Self {
            bank: SynchronizerBank::new(config.sync.clone()),
            compositor: Compositor::new(config.render.clone()),
            previews: [
                Compositor::new(config.render.clone()),
                Compositor::new(config.render.clone()),
            ],
            target: Box::new(surface),
            capture: None,
            sink_factory: Box::new(|_| Box::<NullSink>::default()),
            last_recording: None,
            fps: FpsMeter::new(),
            frames: 0,
            output: None,
            config,
            store,
            backend,
        })
    }

    /// Draw into a different render target.
    pub fn with_target(mut self, target: Box<dyn RenderTarget>) -> Self {
        self.target = target;
        self
    }

    /// Choose where recordings go.
    pub fn with_sink_factory(
        mut self,
        factory: impl FnMut(&RecordingSettings) -> Box<dyn RecordingSink> + 'static,
    ) -> Self {
        self.sink_factory = Box::new(factory);
        self
    }

    pub fn store(&self) -> &Arc<MixerStore> {
        &self.store
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn bank(&self) -> &SynchronizerBank {
        &self.bank
    }

    pub fn compositor(&self) -> &Compositor {
        &self.compositor
    }

    pub fn target(&self) -> &dyn RenderTarget {
        self.target.as_ref()
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    pub fn performance(&self) -> Option<PerformanceStatus> {
        self.fps.status()
    }

    pub fn average_fps(&self) -> Option<u32> {
        self.fps.average()
    }

    pub fn is_capturing(&self) -> bool {
        self.capture.is_some()
    }

    /// Summary of the most recently finished recording.
    pub fn last_recording(&self) -> Option<&RecordingSummary> {
        self.last_recording.as_ref()
    }

    /// Run one frame at monotonic time `now_ns`.
    pub fn tick(&mut self, now_ns: u64) -> VjmixResult<TickReport> {
        let snapshot = self.store.snapshot();
        let sync = self.bank.reconcile(&snapshot, self.backend.as_ref());
        let store_writes = apply_reports(&self.store, &sync);

        let snapshot = self.store.snapshot();
        let weights = mix_weights(snapshot.master_fader);
        let frame = self.compositor.compose(&snapshot, weights, &self.bank);
        self.target.draw(&frame, &self.bank)?;

        let captured = self.update_capture(snapshot.is_recording, now_ns)?;

        if snapshot.output_window_open && !self.output.as_ref().is_some_and(OutputLink::is_open) {
            self.output = None;
            self.store.set_output_window_open(false);
        }

        let fps = self.fps.frame(now_ns);
        if let Some(fps) = fps {
            self.store.set_fps(fps);
            tracing::trace!(fps, "frame rate measured");
        }

        self.frames += 1;
        let (directives, placeholders) = count_items(&frame);
        Ok(TickReport {
            frame: self.frames,
            weights,
            directives,
            placeholders,
            store_writes,
            captured,
            fps,
            sync,
            composed: frame,
        })
    }

    /// Compose one channel alone at full weight, for its preview monitor.
    pub fn preview(&mut self, channel: ChannelId) -> ComposedFrame {
        let snapshot = self.store.snapshot();
        let compositor = match channel {
            ChannelId::A => &mut self.previews[0],
            ChannelId::B => &mut self.previews[1],
        };
        compositor.preview(&snapshot, channel, &self.bank)
    }

    /// Open the secondary output window.
    pub fn open_output_window(&mut self) -> OutputWindow {
        let (link, window) = OutputLink::open(&self.store, self.config.render.clone());
        self.output = Some(link);
        window
    }

    pub fn toggle_output_fullscreen(&self) -> VjmixResult<()> {
        match &self.output {
            Some(link) => link.toggle_fullscreen(),
            None => Err(VjmixError::output("no output window is open")),
        }
    }

    /// Release one channel's media.
    pub fn teardown_channel(&mut self, channel: ChannelId) {
        self.bank.teardown_channel(channel);
    }

    /// Stop any recording and release all media.
    pub fn shutdown(mut self) -> VjmixResult<Option<RecordingSummary>> {
        if let Some(stream) = self.capture.take() {
            self.last_recording = Some(stream.finish()?);
            self.store.set_recording(false);
        }
        self.bank.teardown();
        tracing::info!(frames = self.frames, "engine shut down");
        Ok(self.last_recording)
    }

    fn update_capture(&mut self, recording: bool, now_ns: u64) -> VjmixResult<bool> {
        match (recording, self.capture.is_some()) {
            (true, false) => {
                let settings =
                    RecordingSettings::from_defaults(&self.config.recording, chrono::Utc::now());
                let sink = (self.sink_factory)(&settings);
                let (width, height) = self.target.size();
                match CaptureStream::start(settings, sink, width, height) {
                    Ok(stream) => self.capture = Some(stream),
                    Err(e) => {
                        tracing::error!(error = %e, "could not start recording");
                        self.store.set_recording(false);
                        return Ok(false);
                    }
                }
            }
            (false, true) => {
                if let Some(stream) = self.capture.take() {
                    self.last_recording = Some(stream.finish()?);
                }
                return Ok(false);
            }
            _ => {}
        }

        let Some(stream) = self.capture.as_mut() else {
            return Ok(false);
        };
        match stream.offer(self.target.as_ref(), now_ns) {
            Ok(taken) => Ok(taken),
            Err(e) => {
                tracing::error!(error = %e, "capture failed; recording stopped");
                if let Some(stream) = self.capture.take() {
                    self.last_recording = stream.finish().ok();
                }
                self.store.set_recording(false);
                Ok(false)
            }
        }
    }
}

impl std::fmt::Debug for MixEngine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MixEngine")
            .field("frames", &self.frames)
            .field("layers", &self.bank.len())
            .field("capture", &self.capture)
            .finish()
    }
}

fn count_items(frame: &ComposedFrame) -> (usize, usize) {
    frame.items().fold((0, 0), |(d, p), item| match item {
        RenderItem::Directive(_) => (d + 1, p),
        RenderItem::Placeholder(_) => (d, p + 1),
    })
}
