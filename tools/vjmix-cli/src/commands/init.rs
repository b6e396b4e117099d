//! Create a new session file.

use std::path::PathBuf;

use vjmix_mixer_model::{MixerState, SessionFile};

use super::SESSION_FILE;

pub fn run(name: String, output: PathBuf, layers: usize, fader: f32) -> anyhow::Result<()> {
    if layers == 0 {
        anyhow::bail!("a channel needs at least one layer");
    }
    let session_dir = output.join(&name);
    let path = session_dir.join(SESSION_FILE);
    println!("Creating session '{}' at {}", name, session_dir.display());

    let session = SessionFile::new(&name, &MixerState::new(layers, fader));
    session
        .save(&path)
        .map_err(|e| anyhow::anyhow!("Failed to create session: {e}"))?;

    println!("Session created successfully:");
    println!("  File: {}", path.display());
    println!("  Layers per channel: {layers}");
    println!("  Master fader: {:.2}", session.state.master_fader);

    Ok(())
}
