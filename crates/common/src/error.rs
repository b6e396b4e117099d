//! Error types shared across VJMix crates.

use std::path::PathBuf;

/// Top-level error type for VJMix operations.
#[derive(Debug, thiserror::Error)]
pub enum VjmixError {
    #[error("Media error: {message}")]
    Media { message: String },

    #[error("Playback error: {message}")]
    Playback { message: String },

    #[error("Render error: {message}")]
    Render { message: String },

    #[error("Capture error: {message}")]
    Capture { message: String },

    #[error("Session error: {message}")]
    Session { message: String },

    #[error("Output window error: {message}")]
    Output { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Unsupported operation: {message}")]
    Unsupported { message: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Result type alias using VjmixError.
pub type VjmixResult<T> = Result<T, VjmixError>;

impl VjmixError {
    pub fn media(msg: impl Into<String>) -> Self {
        Self::Media {
            message: msg.into(),
        }
    }

    pub fn playback(msg: impl Into<String>) -> Self {
        Self::Playback {
            message: msg.into(),
        }
    }

    pub fn render(msg: impl Into<String>) -> Self {
        Self::Render {
            message: msg.into(),
        }
    }

    pub fn capture(msg: impl Into<String>) -> Self {
        Self::Capture {
            message: msg.into(),
        }
    }

    pub fn session(msg: impl Into<String>) -> Self {
        Self::Session {
            message: msg.into(),
        }
    }

    pub fn output(msg: impl Into<String>) -> Self {
        Self::Output {
            message: msg.into(),
        }
    }

    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config {
            message: msg.into(),
        }
    }

    pub fn unsupported(msg: impl Into<String>) -> Self {
        Self::Unsupported {
            message: msg.into(),
        }
    }
}
