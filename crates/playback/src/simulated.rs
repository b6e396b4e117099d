//! Deterministic in-process media for tests and headless sessions.
//!
//! Clips are registered in a catalog with a duration and base color. Elements
//! advance against a shared [`SimClock`] that the caller moves forward, so a
//! run is reproducible frame for frame.

use std::cell::{Cell, RefCell};
use std::collections::{HashMap, VecDeque};
use std::f32::consts::TAU;
use std::rc::Rc;

use vjmix_common::{VjmixError, VjmixResult};

use crate::media::{MediaBackend, MediaElement, MediaEvent, Rgba, TextureId};

/// Shared simulated wall clock, in seconds.
#[derive(Debug, Clone, Default)]
pub struct SimClock(Rc<Cell<f64>>);

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> f64 {
        self.0.get()
    }

    pub fn advance(&self, secs: f64) {
        if secs.is_finite() && secs > 0.0 {
            self.0.set(self.0.get() + secs);
        }
    }

    pub fn set(&self, secs: f64) {
        self.0.set(secs);
    }
}

/// A catalog entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SimulatedClip {
    pub duration: f64,
    pub color: Rgba,
}

#[derive(Debug, Default)]
struct Shared {
    catalog: RefCell<HashMap<String, SimulatedClip>>,
    next_texture: Cell<u64>,
    live: Cell<usize>,
    opened: Cell<usize>,
    metadata_delay: Cell<u32>,
    reject_play: Cell<bool>,
}

/// Backend whose elements play catalog clips against a [`SimClock`].
#[derive(Debug, Clone, Default)]
pub struct SimulatedBackend {
    shared: Rc<Shared>,
    clock: SimClock,
}

impl SimulatedBackend {
    pub fn new(clock: SimClock) -> Self {
        Self {
            shared: Rc::default(),
            clock,
        }
    }

    pub fn clock(&self) -> &SimClock {
        &self.clock
    }

    pub fn add_clip(&self, url: impl Into<String>, duration: f64, color: Rgba) {
        self.shared
            .catalog
            .borrow_mut()
            .insert(url.into(), SimulatedClip { duration, color });
    }

    pub fn with_clip(self, url: impl Into<String>, duration: f64, color: Rgba) -> Self {
        self.add_clip(url, duration, color);
        self
    }

    /// Number of event polls before metadata is reported.
    pub fn set_metadata_delay(&self, polls: u32) {
        self.shared.metadata_delay.set(polls);
    }

    /// Refuse every play request, as a strict autoplay policy would.
    pub fn set_reject_play(&self, reject: bool) {
        self.shared.reject_play.set(reject);
    }

    /// Elements opened and not yet released.
    pub fn live_elements(&self) -> usize {
        self.shared.live.get()
    }

    /// Elements opened over the backend's lifetime.
    pub fn opened_elements(&self) -> usize {
        self.shared.opened.get()
    }
}

impl MediaBackend for SimulatedBackend {
    fn open(&self, url: &str) -> VjmixResult<Box<dyn MediaElement>> {
        if url.is_empty() {
            return Err(VjmixError::media("empty media url"));
        }
        let clip = self.shared.catalog.borrow().get(url).copied();
        let texture = TextureId(self.shared.next_texture.get() + 1);
        self.shared.next_texture.set(texture.0);
        self.shared.live.set(self.shared.live.get() + 1);
        self.shared.opened.set(self.shared.opened.get() + 1);

        let mut events = VecDeque::new();
        if clip.is_none() {
            events.push_back(MediaEvent::LoadFailed {
                reason: format!("no simulated clip registered for {url}"),
            });
        }

        Ok(Box::new(SimulatedElement {
            url: url.to_string(),
            clip,
            shared: Rc::clone(&self.shared),
            clock: self.clock.clone(),
            texture,
            metadata_countdown: self.shared.metadata_delay.get(),
            metadata_ready: false,
            anchor_position: 0.0,
            anchor_clock: self.clock.now(),
            rate: 1.0,
            volume: 1.0,
            paused: true,
            ended: false,
            events,
            released: false,
        }))
    }
}

/// One simulated element.
#[derive(Debug)]
pub struct SimulatedElement {
    url: String,
    clip: Option<SimulatedClip>,
    shared: Rc<Shared>,
    clock: SimClock,
    texture: TextureId,
    metadata_countdown: u32,
    metadata_ready: bool,
    anchor_position: f64,
    anchor_clock: f64,
    rate: f64,
    volume: f32,
    paused: bool,
    ended: bool,
    events: VecDeque<MediaEvent>,
    released: bool,
}

impl SimulatedElement {
    fn duration(&self) -> f64 {
        self.clip.map_or(0.0, |c| c.duration)
    }

    fn raw_position(&self) -> f64 {
        if self.paused {
            self.anchor_position
        } else {
            self.anchor_position + (self.clock.now() - self.anchor_clock) * self.rate
        }
    }

    /// Re-anchor the position at the current clock reading.
    fn settle(&mut self) {
        self.anchor_position = self.current_time();
        self.anchor_clock = self.clock.now();
    }

    fn check_ended(&mut self) {
        if !self.paused && self.metadata_ready && self.raw_position() >= self.duration() {
            self.anchor_position = self.duration();
            self.anchor_clock = self.clock.now();
            self.paused = true;
            self.ended = true;
            self.events.push_back(MediaEvent::Ended);
        }
    }
}

impl MediaElement for SimulatedElement {
    fn url(&self) -> &str {
        &self.url
    }

    fn current_time(&self) -> f64 {
        let position = self.raw_position().max(0.0);
        if self.metadata_ready {
            position.min(self.duration())
        } else {
            position
        }
    }

    fn seek(&mut self, time: f64) {
        if !self.metadata_ready || !time.is_finite() {
            return;
        }
        self.anchor_position = time.clamp(0.0, self.duration());
        self.anchor_clock = self.clock.now();
        self.ended = false;
        self.events.push_back(MediaEvent::Seeked);
    }

    fn set_playback_rate(&mut self, rate: f64) {
        if rate.is_finite() && rate > 0.0 && rate != self.rate {
            self.settle();
            self.rate = rate;
        }
    }

    fn set_volume(&mut self, volume: f32) {
        self.volume = volume.clamp(0.0, 1.0);
    }

    fn request_play(&mut self) {
        if !self.metadata_ready {
            return;
        }
        if self.shared.reject_play.get() {
            self.events.push_back(MediaEvent::PlayRejected {
                reason: "play() request was refused by the autoplay policy".to_string(),
            });
            return;
        }
        if self.ended {
            self.anchor_position = 0.0;
            self.ended = false;
        }
        self.anchor_clock = self.clock.now();
        self.paused = false;
        self.events.push_back(MediaEvent::Playing);
    }

    fn pause(&mut self) {
        if !self.paused {
            self.settle();
            self.paused = true;
        }
    }

    fn is_paused(&self) -> bool {
        self.paused
    }

    fn poll_events(&mut self) -> Vec<MediaEvent> {
        if let Some(clip) = self.clip {
            if !self.metadata_ready {
                if self.metadata_countdown == 0 {
                    self.metadata_ready = true;
                    self.events.push_back(MediaEvent::MetadataLoaded {
                        duration: clip.duration,
                    });
                } else {
                    self.metadata_countdown -= 1;
                }
            }
        }
        self.check_ended();
        self.events.drain(..).collect()
    }

    fn texture(&self) -> TextureId {
        self.texture
    }

    fn sample(&self, u: f32, v: f32) -> Rgba {
        let Some(clip) = self.clip.filter(|_| self.metadata_ready) else {
            return [0.0, 0.0, 0.0, 0.0];
        };
        let phase = self.current_time() as f32 * 0.5;
        let shade = 0.75 + 0.25 * ((u + v + phase) * TAU).sin();
        let [r, g, b, a] = clip.color;
        [
            (r * shade).clamp(0.0, 1.0),
            (g * shade).clamp(0.0, 1.0),
            (b * shade).clamp(0.0, 1.0),
            a,
        ]
    }

    fn release(&mut self) {
        if !self.released {
            self.released = true;
            self.paused = true;
            self.events.clear();
            self.shared.live.set(self.shared.live.get().saturating_sub(1));
        }
    }
}
