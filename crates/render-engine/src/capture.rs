//! Capture of the rendered surface for recording.
//!
//! The surface is sampled at a fixed rate (30 fps by default) regardless of
//! the display rate. Encoding is not done here: frames go to a
//! [`RecordingSink`], which may hand them to an external encoder.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use vjmix_common::{
    FrameClock, RateController, RecordingDefaults, RecordingFormat, RecordingQuality, VjmixError,
    VjmixResult,
};

use crate::surface::RenderTarget;

/// Parameters of one recording.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSettings {
    pub fps: u32,
    pub quality: RecordingQuality,
    pub format: RecordingFormat,
    pub video_bits_per_second: u32,
    pub mime_type: String,
    pub file_name: String,
}

impl RecordingSettings {
    pub fn from_defaults(defaults: &RecordingDefaults, started_at: DateTime<Utc>) -> Self {
        Self {
            fps: defaults.fps.max(1),
            quality: defaults.quality,
            format: defaults.format,
            video_bits_per_second: defaults.quality.video_bits_per_second(),
            mime_type: defaults.format.mime_type().to_string(),
            file_name: recording_file_name(started_at, defaults.format),
        }
    }
}

/// Default download name: `vj-mix-<timestamp>.<ext>`.
pub fn recording_file_name(at: DateTime<Utc>, format: RecordingFormat) -> String {
    format!(
        "vj-mix-{}.{}",
        at.format("%Y-%m-%dT%H-%M-%S%.3fZ"),
        format.extension()
    )
}

/// One captured frame, 8-bit RGBA, row-major.
#[derive(Debug, Clone, PartialEq)]
pub struct CapturedFrame {
    pub index: u64,
    pub timestamp_ns: u64,
    pub width: u32,
    pub height: u32,
    pub data: Vec<u8>,
}

/// What a finished recording produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordingSummary {
    pub settings: RecordingSettings,
    pub frames: u64,
    pub duration_secs: f64,
    pub output: Option<PathBuf>,
}

/// Destination of captured frames.
pub trait RecordingSink {
    fn begin(&mut self, settings: &RecordingSettings, width: u32, height: u32) -> VjmixResult<()>;

    fn push_frame(&mut self, frame: &CapturedFrame) -> VjmixResult<()>;

    /// Flush and close. Returns where the data went, if anywhere.
    fn finish(&mut self) -> VjmixResult<Option<PathBuf>>;
}

/// Keeps frames in memory.
#[derive(Debug, Default)]
pub struct MemorySink {
    pub settings: Option<RecordingSettings>,
    pub frames: Vec<CapturedFrame>,
    pub finished: bool,
}

impl RecordingSink for MemorySink {
    fn begin(&mut self, settings: &RecordingSettings, _width: u32, _height: u32) -> VjmixResult<()> {
        self.settings = Some(settings.clone());
        self.frames.clear();
        self.finished = false;
        Ok(())
    }

    fn push_frame(&mut self, frame: &CapturedFrame) -> VjmixResult<()> {
        self.frames.push(frame.clone());
        Ok(())
    }

    fn finish(&mut self) -> VjmixResult<Option<PathBuf>> {
        self.finished = true;
        Ok(None)
    }
}

/// Drops frames, counting them.
#[derive(Debug, Default)]
pub struct NullSink {
    pub frames: u64,
}

impl RecordingSink for NullSink {
    fn begin(&mut self, _settings: &RecordingSettings, _width: u32, _height: u32) -> VjmixResult<()> {
        self.frames = 0;
        Ok(())
    }

    fn push_frame(&mut self, _frame: &CapturedFrame) -> VjmixResult<()> {
        self.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> VjmixResult<Option<PathBuf>> {
        Ok(None)
    }
}

/// Manifest written next to a raw frame dump.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawVideoManifest {
    pub width: u32,
    pub height: u32,
    pub fps: u32,
    pub pixel_format: String,
    pub frames: u64,
    pub target: RecordingSettings,
}

/// Writes concatenated RGBA frames to `<dir>/<file stem>.rgba` plus a JSON
/// manifest, ready for an external encoder.
#[derive(Debug)]
pub struct RawFileSink {
    dir: PathBuf,
    writer: Option<BufWriter<File>>,
    path: Option<PathBuf>,
    manifest: Option<RawVideoManifest>,
}

impl RawFileSink {
    pub fn new(dir: impl AsRef<Path>) -> Self {
        Self {
            dir: dir.as_ref().to_path_buf(),
            writer: None,
            path: None,
            manifest: None,
        }
    }
}

impl RecordingSink for RawFileSink {
    fn begin(&mut self, settings: &RecordingSettings, width: u32, height: u32) -> VjmixResult<()> {
        std::fs::create_dir_all(&self.dir)?;
        let stem = Path::new(&settings.file_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .unwrap_or("vj-mix");
        let path = self.dir.join(format!("{stem}.rgba"));
        let file = File::create(&path)?;
        tracing::info!(path = %path.display(), width, height, "raw capture started");

        self.writer = Some(BufWriter::new(file));
        self.path = Some(path);
        self.manifest = Some(RawVideoManifest {
            width,
            height,
            fps: settings.fps,
            pixel_format: "rgba".to_string(),
            frames: 0,
            target: settings.clone(),
        });
        Ok(())
    }

    fn push_frame(&mut self, frame: &CapturedFrame) -> VjmixResult<()> {
        let (Some(writer), Some(manifest)) = (self.writer.as_mut(), self.manifest.as_mut()) else {
            return Err(VjmixError::capture("raw capture was not started"));
        };
        if frame.width != manifest.width || frame.height != manifest.height {
            return Err(VjmixError::capture(format!(
                "frame size {}x{} does not match capture size {}x{}",
                frame.width, frame.height, manifest.width, manifest.height
            )));
        }
        writer.write_all(&frame.data)?;
        manifest.frames += 1;
        Ok(())
    }

    fn finish(&mut self) -> VjmixResult<Option<PathBuf>> {
        let Some(mut writer) = self.writer.take() else {
            return Ok(None);
        };
        writer.flush()?;
        let path = self.path.take();
        if let (Some(path), Some(manifest)) = (&path, self.manifest.take()) {
            let manifest_path = path.with_extension("json");
            std::fs::write(&manifest_path, serde_json::to_string_pretty(&manifest)?)?;
            tracing::info!(
                path = %path.display(),
                frames = manifest.frames,
                "raw capture finished"
            );
        }
        Ok(path)
    }
}

/// An active recording: samples the render target at the capture rate.
pub struct CaptureStream {
    settings: RecordingSettings,
    controller: RateController,
    sink: Box<dyn RecordingSink>,
    frames: u64,
    first_ns: Option<u64>,
    last_ns: u64,
}

impl CaptureStream {
    pub fn start(
        settings: RecordingSettings,
        mut sink: Box<dyn RecordingSink>,
        width: u32,
        height: u32,
    ) -> VjmixResult<Self> {
        sink.begin(&settings, width, height)?;
        tracing::info!(
            file = %settings.file_name,
            mime = %settings.mime_type,
            fps = settings.fps,
            bits_per_second = settings.video_bits_per_second,
            "recording started"
        );
        Ok(Self {
            controller: RateController::new(settings.fps),
            settings,
            sink,
            frames: 0,
            first_ns: None,
            last_ns: 0,
        })
    }

    pub fn settings(&self) -> &RecordingSettings {
        &self.settings
    }

    pub fn frames(&self) -> u64 {
        self.frames
    }

    /// Capture the target's current contents if a capture interval has
    /// elapsed. Returns whether a frame was taken.
    pub fn offer(&mut self, target: &dyn RenderTarget, now_ns: u64) -> VjmixResult<bool> {
        if !self.controller.should_tick(now_ns) {
            return Ok(false);
        }
        let (width, height) = target.size();
        let data = target
            .pixels()
            .iter()
            .flat_map(|px| px.map(|c| (c.clamp(0.0, 1.0) * 255.0).round() as u8))
            .collect();
        let frame = CapturedFrame {
            index: self.frames,
            timestamp_ns: now_ns - *self.first_ns.get_or_insert(now_ns),
            width,
            height,
            data,
        };
        self.sink.push_frame(&frame)?;
        self.frames += 1;
        self.last_ns = now_ns;
        Ok(true)
    }

    pub fn finish(mut self) -> VjmixResult<RecordingSummary> {
        let output = self.sink.finish()?;
        let duration_secs = self
            .first_ns
            .map_or(0.0, |first| FrameClock::ns_to_secs(self.last_ns - first));
        tracing::info!(frames = self.frames, duration_secs, "recording stopped");
        Ok(RecordingSummary {
            settings: self.settings,
            frames: self.frames,
            duration_secs,
            output,
        })
    }
}

impl std::fmt::Debug for CaptureStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CaptureStream")
            .field("settings", &self.settings)
            .field("frames", &self.frames)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compositor::ComposedFrame;
    use crate::mix_weight::mix_weights;
    use crate::surface::{SoftwareSurface, TextureSampler};
    use chrono::TimeZone;
    use vjmix_playback::{Rgba, TextureId};

    struct Blank;

    impl TextureSampler for Blank {
        fn sample(&self, _texture: TextureId, _u: f32, _v: f32) -> Rgba {
            [0.0; 4]
        }
    }

    fn settings() -> RecordingSettings {
        RecordingSettings::from_defaults(&RecordingDefaults::default(), Utc::now())
    }

    #[test]
    fn test_file_name() {
        let at = Utc.with_ymd_and_hms(2024, 3, 9, 21, 5, 7).unwrap();
        assert_eq!(
            recording_file_name(at, RecordingFormat::Webm),
            "vj-mix-2024-03-09T21-05-07.000Z.webm"
        );
        assert!(recording_file_name(at, RecordingFormat::Mp4).ends_with(".mp4"));
    }

    #[test]
    fn test_settings_from_defaults() {
        let s = settings();
        assert_eq!(s.fps, 30);
        assert_eq!(s.video_bits_per_second, 4_000_000);
        assert_eq!(s.mime_type, "video/webm;codecs=vp9");
    }

    #[test]
    fn test_capture_is_rate_limited() {
        let mut surface = SoftwareSurface::new(2, 2).unwrap();
        let frame = ComposedFrame {
            weights: mix_weights(0.0),
            passes: Vec::new(),
        };
        surface.draw(&frame, &Blank).unwrap();

        let mut stream = CaptureStream::start(settings(), Box::<MemorySink>::default(), 2, 2).unwrap();
        // 60 display frames over one second.
        let mut taken = 0;
        for i in 0..60u64 {
            if stream.offer(&surface, i * 16_666_667).unwrap() {
                taken += 1;
            }
        }
        assert_eq!(taken, 30);

        let summary = stream.finish().unwrap();
        assert_eq!(summary.frames, 30);
        assert!(summary.output.is_none());
    }

    #[test]
    fn test_raw_sink_writes_frames_and_manifest() {
        let dir = std::env::temp_dir().join("vjmix_test_raw_capture");
        let _ = std::fs::remove_dir_all(&dir);

        let mut surface = SoftwareSurface::new(2, 2).unwrap();
        let frame = ComposedFrame {
            weights: mix_weights(0.0),
            passes: Vec::new(),
        };
        surface.draw(&frame, &Blank).unwrap();

        let mut stream =
            CaptureStream::start(settings(), Box::new(RawFileSink::new(&dir)), 2, 2).unwrap();
        stream.offer(&surface, 0).unwrap();
        stream.offer(&surface, 40_000_000).unwrap();
        let summary = stream.finish().unwrap();

        let path = summary.output.unwrap();
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 2 * 2 * 4 * 2);
        let manifest: RawVideoManifest =
            serde_json::from_str(&std::fs::read_to_string(path.with_extension("json")).unwrap())
                .unwrap();
        assert_eq!(manifest.frames, 2);
        assert_eq!(manifest.pixel_format, "rgba");

        std::fs::remove_dir_all(&dir).ok();
    }
}
