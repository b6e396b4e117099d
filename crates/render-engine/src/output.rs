//! Secondary output window link.
//!
//! The output window is a separate renderer following the same store. The
//! console can only send it one-way messages; when the window is gone,
//! messages are dropped and reported as undeliverable.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::{mpsc, watch};

use vjmix_common::{RenderConfig, VjmixError, VjmixResult};
use vjmix_mixer_model::{MixerState, MixerStore};

use crate::compositor::{ComposedFrame, Compositor, TextureLookup};
use crate::mix_weight::mix_weights;

/// Messages from the console to the output window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum OutputMessage {
    ToggleFullscreen,
}

/// Console side of the link.
#[derive(Debug)]
pub struct OutputLink {
    tx: mpsc::UnboundedSender<OutputMessage>,
}

impl OutputLink {
    /// Open an output window following `store` and mark it open.
    pub fn open(store: &MixerStore, config: RenderConfig) -> (Self, OutputWindow) {
        let (tx, rx) = mpsc::unbounded_channel();
        let window = OutputWindow {
            rx,
            state: store.subscribe(),
            compositor: Compositor::new(config),
            fullscreen: false,
        };
        store.set_output_window_open(true);
        tracing::info!("output window opened");
        (Self { tx }, window)
    }

    pub fn is_open(&self) -> bool {
        !self.tx.is_closed()
    }

    pub fn send(&self, message: OutputMessage) -> VjmixResult<()> {
        self.tx.send(message).map_err(|e| {
            tracing::debug!(message = ?e.0, "output window closed; message dropped");
            VjmixError::output("output window is closed")
        })
    }

    pub fn toggle_fullscreen(&self) -> VjmixResult<()> {
        self.send(OutputMessage::ToggleFullscreen)
    }
}

/// Output window side: follows the store and renders on its own.
#[derive(Debug)]
pub struct OutputWindow {
    rx: mpsc::UnboundedReceiver<OutputMessage>,
    state: watch::Receiver<Arc<MixerState>>,
    compositor: Compositor,
    fullscreen: bool,
}

impl OutputWindow {
    pub fn is_fullscreen(&self) -> bool {
        self.fullscreen
    }

    /// Handle every pending message. Returns how many were handled.
    pub fn process_messages(&mut self) -> usize {
        let mut handled = 0;
        while let Ok(message) = self.rx.try_recv() {
            match message {
                OutputMessage::ToggleFullscreen => {
                    self.fullscreen = !self.fullscreen;
                    tracing::debug!(fullscreen = self.fullscreen, "output fullscreen toggled");
                }
            }
            handled += 1;
        }
        handled
    }

    /// Compose the latest published snapshot.
    pub fn compose(&mut self, textures: &dyn TextureLookup) -> ComposedFrame {
        let state = self.state.borrow_and_update().clone();
        self.compositor
            .compose(&state, mix_weights(state.master_fader), textures)
    }

    /// Wait until the store publishes a new snapshot.
    pub async fn changed(&mut self) -> VjmixResult<()> {
        self.state
            .changed()
            .await
            .map_err(|_| VjmixError::output("mixer store dropped"))
    }

    /// Close the window, marking it closed in the store.
    pub fn close(self, store: &MixerStore) {
        store.set_output_window_open(false);
        tracing::info!("output window closed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use vjmix_mixer_model::{ChannelId, LayerKey};
    use vjmix_playback::TextureId;

    struct AnyTexture;

    impl TextureLookup for AnyTexture {
        fn texture(&self, _key: &LayerKey) -> Option<TextureId> {
            Some(TextureId(7))
        }
    }

    #[test]
    fn test_message_wire_format() {
        let json = serde_json::to_string(&OutputMessage::ToggleFullscreen).unwrap();
        assert_eq!(json, r#"{"type":"toggle-fullscreen"}"#);
    }

    #[test]
    fn test_toggle_fullscreen_delivered() {
        let store = MixerStore::default();
        let (link, mut window) = OutputLink::open(&store, RenderConfig::default());
        assert!(store.snapshot().output_window_open);

        link.toggle_fullscreen().unwrap();
        link.toggle_fullscreen().unwrap();
        link.toggle_fullscreen().unwrap();
        assert_eq!(window.process_messages(), 3);
        assert!(window.is_fullscreen());
    }

    #[test]
    fn test_closed_window_is_undeliverable() {
        let store = MixerStore::default();
        let (link, window) = OutputLink::open(&store, RenderConfig::default());
        window.close(&store);
        assert!(!link.is_open());
        assert!(!store.snapshot().output_window_open);
        assert!(matches!(
            link.toggle_fullscreen(),
            Err(VjmixError::Output { .. })
        ));
    }

    #[test]
    fn test_window_follows_store() {
        let store = MixerStore::default();
        let (_link, mut window) = OutputLink::open(&store, RenderConfig::default());
        store.set_layer_source(ChannelId::B, "layer-2", Some("sim://x"));
        store.set_master_fader(1.0);

        let frame = window.compose(&AnyTexture);
        let key = LayerKey::new(ChannelId::B, "layer-2");
        assert_eq!(frame.directive(&key).unwrap().material.opacity, 1.0);
    }
}
