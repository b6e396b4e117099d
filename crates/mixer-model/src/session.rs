//! Session persistence.
//!
//! A session file is a pretty-printed JSON document wrapping one mixer
//! snapshot with a format version and save timestamp. Transient fields
//! (recording flag, measured fps, output window) are cleared on save.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::channel::ChannelId;
use crate::state::MixerState;

pub const SESSION_FORMAT_VERSION: &str = "1.0";

/// On-disk session document.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionFile {
    pub version: String,
    pub name: String,
    pub saved_at: DateTime<Utc>,
    pub state: MixerState,
}

impl SessionFile {
    pub fn new(name: impl Into<String>, state: &MixerState) -> Self {
        let mut state = state.clone();
        state.is_recording = false;
        state.fps = 0;
        state.output_window_open = false;
        Self {
            version: SESSION_FORMAT_VERSION.to_string(),
            name: name.into(),
            saved_at: Utc::now(),
            state,
        }
    }

    /// Load and validate a session file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, SessionError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|e| SessionError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        let session: SessionFile =
            serde_json::from_str(&json).map_err(|e| SessionError::ParseError {
                path: path.to_path_buf(),
                source: e,
            })?;
        session.validate()?;
        tracing::debug!(path = %path.display(), name = %session.name, "session loaded");
        Ok(session)
    }

    /// Write the session as pretty JSON, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), SessionError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent).map_err(|e| SessionError::IoError {
                path: parent.to_path_buf(),
                source: e,
            })?;
        }
        let json = serde_json::to_string_pretty(self).map_err(|e| SessionError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;
        std::fs::write(path, json).map_err(|e| SessionError::IoError {
            path: path.to_path_buf(),
            source: e,
        })?;
        tracing::debug!(path = %path.display(), "session saved");
        Ok(())
    }

    /// Check structural invariants a hand-edited file could break.
    pub fn validate(&self) -> Result<(), SessionError> {
        if self.version != SESSION_FORMAT_VERSION {
            return Err(SessionError::ValidationError {
                message: format!(
                    "unsupported session version {} (expected {SESSION_FORMAT_VERSION})",
                    self.version
                ),
            });
        }

        for id in ChannelId::ALL {
            let channel = self.state.channel(id);
            if channel.id != id {
                return Err(SessionError::ValidationError {
                    message: format!("channel slot {id} holds channel {}", channel.id),
                });
            }

            let mut seen = HashSet::new();
            for layer in &channel.layers {
                if !seen.insert(layer.id.as_str()) {
                    return Err(SessionError::ValidationError {
                        message: format!("duplicate layer id {} in channel {id}", layer.id),
                    });
                }
                if layer.is_looping && layer.loop_in > layer.loop_out && layer.loop_out > 0.0 {
                    return Err(SessionError::ValidationError {
                        message: format!("layer {id}/{} has an inverted loop window", layer.id),
                    });
                }
            }
        }

        let a = self.state.channel(ChannelId::A).layers.len();
        let b = self.state.channel(ChannelId::B).layers.len();
        if a != b {
            return Err(SessionError::ValidationError {
                message: format!("channels have different layer counts ({a} vs {b})"),
            });
        }

        if !(0.0..=1.0).contains(&self.state.master_fader) {
            return Err(SessionError::ValidationError {
                message: format!("master fader {} out of range", self.state.master_fader),
            });
        }

        Ok(())
    }
}

/// Errors that can occur when reading or writing sessions.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("I/O error at {path}: {source}")]
    IoError {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Parse error in {path}: {source}")]
    ParseError {
        path: PathBuf,
        source: serde_json::Error,
    },

    #[error("Invalid session: {message}")]
    ValidationError { message: String },
}
