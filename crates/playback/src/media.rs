//! The seam between the synchronizer and whatever actually decodes video.

use std::fmt;

use vjmix_common::VjmixResult;

/// Linear RGBA color, components in `[0.0, 1.0]`.
pub type Rgba = [f32; 4];

/// Handle to the GPU (or software) texture a media element renders into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

impl fmt::Display for TextureId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tex#{}", self.0)
    }
}

/// Asynchronous notifications from a media element.
#[derive(Debug, Clone, PartialEq)]
pub enum MediaEvent {
    /// Metadata is available; the clip can be sought and played.
    MetadataLoaded { duration: f64 },

    /// The source could not be loaded.
    LoadFailed { reason: String },

    /// A seek completed; frames at the new position are available.
    Seeked,

    /// A play request succeeded.
    Playing,

    /// A play request was refused (autoplay policy or similar).
    PlayRejected { reason: String },

    /// Playback reached the end of the clip and stopped.
    Ended,
}

/// A playable media resource.
///
/// Commands take effect immediately where they can; completion of the
/// asynchronous ones is reported through [`MediaElement::poll_events`].
pub trait MediaElement {
    fn url(&self) -> &str;

    /// Current playback position in seconds.
    fn current_time(&self) -> f64;

    fn seek(&mut self, time: f64);

    fn set_playback_rate(&mut self, rate: f64);

    fn set_volume(&mut self, volume: f32);

    /// Ask the element to start playing. Success or refusal arrives as an event.
    fn request_play(&mut self);

    fn pause(&mut self);

    fn is_paused(&self) -> bool;

    /// Drain pending events, oldest first.
    fn poll_events(&mut self) -> Vec<MediaEvent>;

    /// Texture holding the current frame.
    fn texture(&self) -> TextureId;

    /// Sample the current frame at normalized coordinates.
    fn sample(&self, u: f32, v: f32) -> Rgba;

    /// Stop decoding and free the texture. Called exactly once.
    fn release(&mut self);
}

/// Opens independent media elements.
///
/// Two layers showing the same URL get two elements, so their positions
/// never interfere.
pub trait MediaBackend {
    fn open(&self, url: &str) -> VjmixResult<Box<dyn MediaElement>>;
}

/// Exclusive owner of one media element.
///
/// Dropping the slot releases the element and its texture.
pub struct MediaSlot {
    element: Box<dyn MediaElement>,
}

impl MediaSlot {
    pub fn open(backend: &dyn MediaBackend, url: &str) -> VjmixResult<Self> {
        let element = backend.open(url)?;
        Ok(Self { element })
    }

    pub fn element(&self) -> &dyn MediaElement {
        self.element.as_ref()
    }

    pub fn element_mut(&mut self) -> &mut dyn MediaElement {
        self.element.as_mut()
    }

    pub fn url(&self) -> &str {
        self.element.url()
    }
}

impl fmt::Debug for MediaSlot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaSlot")
            .field("url", &self.element.url())
            .field("texture", &self.element.texture())
            .finish()
    }
}

impl Drop for MediaSlot {
    fn drop(&mut self) {
        tracing::trace!(url = self.element.url(), texture = %self.element.texture(), "releasing media");
        self.element.release();
    }
}
