//! Application configuration.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::error::{VjmixError, VjmixResult};

/// Global application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AppConfig {
    /// Mixer layout and initial values.
    #[serde(default)]
    pub mixer: MixerDefaults,

    /// Playback synchronizer tuning.
    #[serde(default)]
    pub sync: SyncConfig,

    /// Compositor and render surface settings.
    #[serde(default)]
    pub render: RenderConfig,

    /// Default recording parameters.
    #[serde(default)]
    pub recording: RecordingDefaults,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Initial mixer layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MixerDefaults {
    /// Number of layers created per channel.
    pub layers_per_channel: usize,

    /// Master fader position at startup (0 = full A, 1 = full B).
    pub initial_fader: f32,
}

/// Playback synchronizer thresholds.
///
/// The write-back threshold must be strictly larger than the seek threshold,
/// otherwise a measured position pushed into the store would immediately be
/// treated as a seek request on the next pass.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    /// Drift (seconds) above which an explicit seek forces the media position.
    pub seek_threshold_secs: f64,

    /// Drift (seconds) above which the measured position is written back.
    pub write_back_threshold_secs: f64,

    /// Clear the layer's playing flag when the platform rejects a play request.
    pub reconcile_rejected_play: bool,
}

/// Compositor tuning and render surface geometry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    /// Surface width in pixels.
    pub width: u32,

    /// Surface height in pixels.
    pub height: u32,

    /// Channel weights within this distance of 0 or 1 snap to the bound.
    pub opacity_epsilon: f32,

    /// Opacity multiplier used by the overlay approximation.
    pub overlay_boost: f32,

    /// Opacity of the placeholder drawn for layers without media.
    pub placeholder_opacity: f32,
}

/// Default recording parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RecordingDefaults {
    /// Capture stream frame rate.
    pub fps: u32,

    /// Output resolution preset.
    pub quality: RecordingQuality,

    /// Container/codec selection.
    pub format: RecordingFormat,
}

/// Recording resolution preset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordingQuality {
    #[default]
    #[serde(rename = "720p")]
    Hd720,
    #[serde(rename = "1080p")]
    Hd1080,
}

/// Recording container/codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RecordingFormat {
    #[default]
    Webm,
    Mp4,
}

impl RecordingQuality {
    /// Output dimensions in pixels.
    pub fn dimensions(self) -> (u32, u32) {
        match self {
            RecordingQuality::Hd720 => (1280, 720),
            RecordingQuality::Hd1080 => (1920, 1080),
        }
    }

    /// Target video bitrate in bits per second.
    pub fn video_bits_per_second(self) -> u32 {
        match self {
            RecordingQuality::Hd720 => 4_000_000,
            RecordingQuality::Hd1080 => 8_000_000,
        }
    }
}

impl RecordingFormat {
    /// MIME type handed to the platform encoder.
    pub fn mime_type(self) -> &'static str {
        match self {
            RecordingFormat::Webm => "video/webm;codecs=vp9",
            RecordingFormat::Mp4 => "video/mp4",
        }
    }

    /// File extension for exported recordings.
    pub fn extension(self) -> &'static str {
        match self {
            RecordingFormat::Webm => "webm",
            RecordingFormat::Mp4 => "mp4",
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "vjmix_playback=trace,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for MixerDefaults {
    fn default() -> Self {
        Self {
            layers_per_channel: 3,
            initial_fader: 0.5,
        }
    }
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            seek_threshold_secs: 0.1,
            write_back_threshold_secs: 0.2,
            reconcile_rejected_play: true,
        }
    }
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            width: 320,
            height: 180,
            opacity_epsilon: 1e-4,
            overlay_boost: 1.2,
            placeholder_opacity: 0.3,
        }
    }
}

impl Default for RecordingDefaults {
    fn default() -> Self {
        Self {
            fps: 30,
            quality: RecordingQuality::Hd720,
            format: RecordingFormat::Webm,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match Self::load_from(&config_path) {
                Ok(config) => return config,
                Err(e) => {
                    tracing::warn!("Failed to load config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Load and validate a config file at an explicit path.
    pub fn load_from(path: impl AsRef<Path>) -> VjmixResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(VjmixError::FileNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        let config: AppConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Standard config file location (`$XDG_CONFIG_HOME/vjmix/config.json`).
    pub fn default_path() -> PathBuf {
        config_file_path()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        self.save_to(config_file_path())
    }

    /// Save config to an explicit path, creating parent directories.
    pub fn save_to(&self, path: impl AsRef<Path>) -> Result<(), std::io::Error> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(path, json)
    }

    /// Check cross-field constraints that serde cannot express.
    pub fn validate(&self) -> VjmixResult<()> {
        if self.mixer.layers_per_channel == 0 {
            return Err(VjmixError::config("layers_per_channel must be at least 1"));
        }
        if !(0.0..=1.0).contains(&self.mixer.initial_fader) {
            return Err(VjmixError::config("initial_fader must lie in [0, 1]"));
        }
        if self.sync.seek_threshold_secs <= 0.0 {
            return Err(VjmixError::config("seek_threshold_secs must be positive"));
        }
        if self.sync.write_back_threshold_secs <= self.sync.seek_threshold_secs {
            return Err(VjmixError::config(format!(
                "write_back_threshold_secs ({}) must exceed seek_threshold_secs ({})",
                self.sync.write_back_threshold_secs, self.sync.seek_threshold_secs
            )));
        }
        if self.render.width == 0 || self.render.height == 0 {
            return Err(VjmixError::config("render surface must be non-empty"));
        }
        if self.recording.fps == 0 {
            return Err(VjmixError::config("recording fps must be positive"));
        }
        Ok(())
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("vjmix").join("config.json")
}
