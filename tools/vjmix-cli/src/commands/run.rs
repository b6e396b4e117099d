//! Run a headless mix against simulated media.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use vjmix_common::{AppConfig, FrameClock};
use vjmix_mixer_model::{ChannelId, MixerStore, SessionFile};
use vjmix_playback::{Rgba, SimClock, SimulatedBackend};
use vjmix_render_engine::{MixEngine, RawFileSink, RecordingSink};
use vjmix_timeline::format_position;

use super::session_path;

pub struct RunOptions {
    pub session: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub seconds: f64,
    pub fps: u32,
    pub fader: Option<f32>,
    pub sources: Vec<String>,
    pub clip_secs: f64,
    pub play: bool,
    pub record: Option<PathBuf>,
    pub realtime: bool,
    pub save: Option<PathBuf>,
}

/// A `--source CHANNEL:LAYER=URL` argument.
#[derive(Debug, Clone, PartialEq)]
struct SourceArg {
    channel: ChannelId,
    layer_id: String,
    url: String,
}

fn parse_source(arg: &str) -> anyhow::Result<SourceArg> {
    let (target, url) = arg
        .split_once('=')
        .with_context(|| format!("expected CHANNEL:LAYER=URL, got '{arg}'"))?;
    let (channel, layer_id) = target
        .split_once(':')
        .with_context(|| format!("expected CHANNEL:LAYER before '=', got '{target}'"))?;
    if layer_id.trim().is_empty() || url.trim().is_empty() {
        anyhow::bail!("layer and url must not be empty in '{arg}'");
    }
    Ok(SourceArg {
        channel: channel.parse()?,
        layer_id: layer_id.trim().to_string(),
        url: url.trim().to_string(),
    })
}

/// Stable per-URL color for simulated clips (FNV-1a over the bytes).
fn clip_color(url: &str) -> Rgba {
    let hash = url.bytes().fold(0xcbf2_9ce4_8422_2325u64, |h, b| {
        (h ^ u64::from(b)).wrapping_mul(0x0100_0000_01b3)
    });
    let channel = |shift: u32| 0.2 + 0.8 * ((hash >> shift) & 0xff) as f32 / 255.0;
    [channel(0), channel(8), channel(16), 1.0]
}

fn positive_secs(value: f64) -> bool {
    value.is_finite() && value > 0.0
}

fn validate(options: &RunOptions) -> anyhow::Result<()> {
    if options.fps == 0 || !positive_secs(options.seconds) {
        anyhow::bail!("fps and seconds must be positive");
    }
    if !positive_secs(options.clip_secs) {
        anyhow::bail!("clip length must be a positive number of seconds, got {}", options.clip_secs);
    }
    Ok(())
}

pub async fn run(options: RunOptions) -> anyhow::Result<()> {
    validate(&options)?;
    let config = match &options.config {
        Some(path) => AppConfig::load_from(path)?,
        None => AppConfig::load(),
    };

    let store = match &options.session {
        Some(path) => {
            let session = SessionFile::load(session_path(path))
                .map_err(|e| anyhow::anyhow!("Failed to load session: {e}"))?;
            println!("Loaded session '{}'", session.name);
            MixerStore::new(session.state)
        }
        None => MixerStore::with_layout(config.mixer.layers_per_channel, config.mixer.initial_fader),
    };
    let store = Arc::new(store);

    let clock = SimClock::new();
    let backend = SimulatedBackend::new(clock.clone());
    for (_, layer) in store.snapshot().layers() {
        if let Some(url) = layer.source.as_deref().filter(|_| layer.has_source()) {
            backend.add_clip(url, options.clip_secs, clip_color(url));
        }
    }
    for arg in &options.sources {
        let source = parse_source(arg)?;
        backend.add_clip(&source.url, options.clip_secs, clip_color(&source.url));
        if !store.set_layer_source(source.channel, &source.layer_id, Some(&source.url)) {
            tracing::warn!(channel = %source.channel, layer = %source.layer_id, "no such layer; source ignored");
        }
    }
    if let Some(fader) = options.fader {
        store.set_master_fader(fader);
    }
    if options.play {
        for (key, layer) in store.snapshot().layers() {
            if layer.has_source() {
                store.set_layer_playing(key.channel, &key.layer_id, true);
            }
        }
    }

    let mut engine = MixEngine::new(config, store.clone(), Box::new(backend))?;
    if let Some(dir) = options.record.clone() {
        engine = engine
            .with_sink_factory(move |_| Box::new(RawFileSink::new(&dir)) as Box<dyn RecordingSink>);
        store.set_recording(true);
    }

    let total_frames = (options.seconds * f64::from(options.fps)).round() as u64;
    let frame_secs = 1.0 / f64::from(options.fps);
    let frame_ns = FrameClock::secs_to_ns(frame_secs);
    println!(
        "Mixing {} frame(s) at {} fps (fader {:.2})",
        total_frames,
        options.fps,
        store.snapshot().master_fader
    );

    let wall = FrameClock::start();
    tracing::info!(started = %wall.epoch_wall(), realtime = options.realtime, "mix started");
    let mut interval = tokio::time::interval(Duration::from_secs_f64(frame_secs));
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    for frame in 0..total_frames {
        if options.realtime {
            tokio::select! {
                _ = interval.tick() => {}
                _ = &mut ctrl_c => {
                    println!("Interrupted at frame {frame}");
                    break;
                }
            }
        }
        clock.advance(frame_secs);
        let now_ns = if options.realtime {
            wall.elapsed_ns()
        } else {
            frame * frame_ns
        };
        let report = engine.tick(now_ns)?;
        if let Some(fps) = report.fps {
            tracing::info!(
                frame = report.frame,
                fps,
                directives = report.directives,
                "mixing"
            );
        }
    }

    store.set_recording(false);
    let average_fps = engine.average_fps();
    let frames = engine.frames();
    let pixels = engine.target().pixels().to_vec();
    let recording = engine.shutdown()?;

    println!();
    println!("Rendered {frames} frame(s)");
    if let Some(fps) = average_fps {
        println!("  Average FPS: {fps}");
    }
    let average = average_color(&pixels);
    println!(
        "  Last frame average RGB: {:.3} {:.3} {:.3}",
        average[0], average[1], average[2]
    );
    if let Some(summary) = recording {
        println!(
            "  Recorded {} frame(s), {:.2}s ({})",
            summary.frames, summary.duration_secs, summary.settings.file_name
        );
        if let Some(output) = summary.output {
            println!("  Raw frames: {}", output.display());
        }
    }

    println!();
    let snapshot = store.snapshot();
    for (key, layer) in snapshot.layers().filter(|(_, layer)| layer.has_source()) {
        println!(
            "  {}/{}  {}  {}",
            key.channel,
            key.layer_id,
            format_position(layer.current_time, layer.duration),
            if layer.is_playing { "playing" } else { "paused" }
        );
    }

    if let Some(path) = options.save {
        let path = if path.extension().is_some() {
            path
        } else {
            path.join(super::SESSION_FILE)
        };
        let name = path
            .parent()
            .and_then(|p| p.file_name())
            .map_or_else(|| "session".to_string(), |n| n.to_string_lossy().into_owned());
        SessionFile::new(name, &snapshot)
            .save(&path)
            .map_err(|e| anyhow::anyhow!("Failed to save session: {e}"))?;
        println!("Session saved to: {}", path.display());
    }

    Ok(())
}

fn average_color(pixels: &[Rgba]) -> Rgba {
    let n = pixels.len().max(1) as f32;
    let sum = pixels.iter().fold([0.0f32; 4], |mut acc, px| {
        for (a, c) in acc.iter_mut().zip(px) {
            *a += c;
        }
        acc
    });
    sum.map(|c| c / n)
}
