//! Show session information.

use std::path::PathBuf;

use vjmix_mixer_model::SessionFile;
use vjmix_render_engine::mix_weights;
use vjmix_timeline::{format_position, format_time, speed_label};

use super::session_path;

pub fn run(path: PathBuf) -> anyhow::Result<()> {
    let path = session_path(&path);
    let session =
        SessionFile::load(&path).map_err(|e| anyhow::anyhow!("Failed to load session: {e}"))?;
    let state = &session.state;
    let weights = mix_weights(state.master_fader);

    println!("Session: {}", session.name);
    println!("  Version: {}", session.version);
    println!("  Saved: {}", session.saved_at);
    println!(
        "  Master fader: {:.2} (A {:.2} / B {:.2})",
        state.master_fader, weights.a, weights.b
    );
    println!();

    for channel in state.channels.iter() {
        println!("Channel {} [{}]:", channel.id, channel.blend_mode);
        for layer in &channel.layers {
            let source = layer.source.as_deref().unwrap_or("(empty)");
            println!(
                "  {} {:<10} {}  opacity {:.2}  {}  {}{}",
                layer.id,
                layer.blend_mode.as_str(),
                format_position(layer.current_time, layer.duration),
                layer.opacity,
                speed_label(layer.playback_speed),
                source,
                if layer.is_playing { "  ▶" } else { "" }
            );
            if layer.is_looping {
                println!(
                    "      loop {} - {}",
                    format_time(layer.loop_in),
                    format_time(layer.loop_out)
                );
            }
            for marker in &layer.markers {
                println!("      marker {} \"{}\"", format_time(marker.time), marker.label);
            }
        }
        println!();
    }

    println!("Library: {} item(s)", state.library.len());
    for item in &state.library {
        println!("  {} {} ({})", item.id, item.name, item.url);
    }

    Ok(())
}
