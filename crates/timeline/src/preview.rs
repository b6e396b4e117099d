//! Hover thumbnails.
//!
//! The preview owns its own muted media element for the layer's source, so
//! seeking it to the hovered time never disturbs the live element driven by
//! the synchronizer. A thumbnail is sampled only once the seek completes.

use serde::Serialize;

use vjmix_common::VjmixResult;
use vjmix_mixer_model::Layer;
use vjmix_playback::{MediaBackend, MediaEvent, MediaSlot, Rgba};

use crate::position::time_at;

pub const THUMBNAIL_WIDTH: u32 = 160;
pub const THUMBNAIL_HEIGHT: u32 = 90;

/// A sampled preview frame.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Thumbnail {
    pub time: f64,
    pub width: u32,
    pub height: u32,
    /// Row-major pixels.
    #[serde(skip)]
    pub pixels: Vec<Rgba>,
}

impl Thumbnail {
    fn sample(slot: &MediaSlot, time: f64) -> Self {
        let element = slot.element();
        let mut pixels = Vec::with_capacity((THUMBNAIL_WIDTH * THUMBNAIL_HEIGHT) as usize);
        for y in 0..THUMBNAIL_HEIGHT {
            for x in 0..THUMBNAIL_WIDTH {
                let u = (x as f32 + 0.5) / THUMBNAIL_WIDTH as f32;
                let v = (y as f32 + 0.5) / THUMBNAIL_HEIGHT as f32;
                pixels.push(element.sample(u, v));
            }
        }
        Self {
            time,
            width: THUMBNAIL_WIDTH,
            height: THUMBNAIL_HEIGHT,
            pixels,
        }
    }

    pub fn pixel(&self, x: u32, y: u32) -> Option<Rgba> {
        if x >= self.width || y >= self.height {
            return None;
        }
        self.pixels.get((y * self.width + x) as usize).copied()
    }
}

/// Hover preview for one layer's timeline.
#[derive(Debug, Default)]
pub struct HoverPreview {
    slot: Option<MediaSlot>,
    ready: bool,
    /// Latest hovered time not yet sent to the element.
    requested: Option<f64>,
    /// Time of the seek in flight.
    in_flight: Option<f64>,
    visible: bool,
    latest: Option<Thumbnail>,
}

impl HoverPreview {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pointer moved over the timeline. Returns the hovered time, or `None`
    /// when the layer has no source or no known duration.
    pub fn hover(
        &mut self,
        layer: &Layer,
        backend: &dyn MediaBackend,
        offset: f64,
        width: f64,
    ) -> VjmixResult<Option<f64>> {
        let Some(source) = layer.source.as_deref().filter(|_| layer.has_source()) else {
            return Ok(None);
        };
        let Some(time) = time_at(offset, width, layer.duration) else {
            return Ok(None);
        };

        if self.slot.as_ref().map(MediaSlot::url) != Some(source) {
            self.open(backend, source)?;
        }
        self.visible = true;
        self.requested = Some(time);
        self.issue_seek();
        Ok(Some(time))
    }

    /// Pointer left the timeline.
    pub fn leave(&mut self) {
        self.visible = false;
    }

    /// Process element events; call once per tick while visible.
    pub fn poll(&mut self) {
        let Some(slot) = self.slot.as_mut() else {
            return;
        };
        for event in slot.element_mut().poll_events() {
            match event {
                MediaEvent::MetadataLoaded { .. } => self.ready = true,
                MediaEvent::Seeked => {
                    if let (Some(slot), Some(time)) = (self.slot.as_ref(), self.in_flight.take()) {
                        self.latest = Some(Thumbnail::sample(slot, time));
                        tracing::trace!(time, "preview thumbnail sampled");
                    }
                }
                MediaEvent::LoadFailed { reason } => {
                    tracing::warn!(%reason, "preview media failed to load");
                }
                _ => {}
            }
        }
        self.issue_seek();
    }

    /// Thumbnail to show, while the pointer is over the timeline.
    pub fn thumbnail(&self) -> Option<&Thumbnail> {
        self.latest.as_ref().filter(|_| self.visible)
    }

    pub fn is_visible(&self) -> bool {
        self.visible
    }

    fn open(&mut self, backend: &dyn MediaBackend, url: &str) -> VjmixResult<()> {
        self.slot = None;
        self.ready = false;
        self.in_flight = None;
        self.latest = None;

        let mut slot = MediaSlot::open(backend, url)?;
        slot.element_mut().set_volume(0.0);
        slot.element_mut().pause();
        self.slot = Some(slot);
        Ok(())
    }

    fn issue_seek(&mut self) {
        if !self.ready || self.in_flight.is_some() {
            return;
        }
        if let (Some(slot), Some(time)) = (self.slot.as_mut(), self.requested.take()) {
            slot.element_mut().seek(time);
            self.in_flight = Some(time);
        }
    }
}
