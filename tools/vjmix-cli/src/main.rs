//! VJMix CLI: command-line interface for sessions and headless mixing.
//!
//! Usage:
//!   vjmix init <NAME>          Create a new session file
//!   vjmix info <PATH>          Show session information
//!   vjmix run [OPTIONS]        Run a headless mix against simulated media
//!   vjmix blend-table          Print the blend operator table
//!   vjmix weights              Print crossfader weights

use std::path::PathBuf;

use clap::{Parser, Subcommand};

mod commands;

#[derive(Parser)]
#[command(
    name = "vjmix",
    about = "Two-channel live video mixer core",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create a new session file
    Init {
        /// Session name
        name: String,

        /// Output directory
        #[arg(short, long, default_value = ".")]
        output: PathBuf,

        /// Layers per channel
        #[arg(long, default_value = "3")]
        layers: usize,

        /// Initial master fader position
        #[arg(long, default_value = "0.5")]
        fader: f32,
    },

    /// Show session information
    Info {
        /// Path to a session file or its directory
        path: PathBuf,
    },

    /// Run a headless mix against simulated media
    Run {
        /// Session to start from
        #[arg(short, long)]
        session: Option<PathBuf>,

        /// Config file (defaults to the standard location)
        #[arg(long)]
        config: Option<PathBuf>,

        /// Seconds of output to render
        #[arg(long, default_value = "5.0")]
        seconds: f64,

        /// Display tick rate
        #[arg(long, default_value = "60")]
        fps: u32,

        /// Master fader position
        #[arg(long)]
        fader: Option<f32>,

        /// Layer source as CHANNEL:LAYER=URL (repeatable)
        #[arg(long = "source", value_name = "CHANNEL:LAYER=URL")]
        sources: Vec<String>,

        /// Duration of simulated clips in seconds
        #[arg(long, default_value = "30.0")]
        clip_secs: f64,

        /// Start every sourced layer playing
        #[arg(long)]
        play: bool,

        /// Record raw frames into this directory
        #[arg(long)]
        record: Option<PathBuf>,

        /// Pace ticks in real time instead of as fast as possible
        #[arg(long)]
        realtime: bool,

        /// Save the final state as a session file
        #[arg(long)]
        save: Option<PathBuf>,
    },

    /// Print the blend operator table
    BlendTable {
        /// Overlay opacity boost
        #[arg(long, default_value = "1.2")]
        overlay_boost: f32,

        /// Output JSON
        #[arg(long)]
        json: bool,
    },

    /// Print crossfader weights across the fader range
    Weights {
        /// Number of fader positions
        #[arg(long, default_value = "11")]
        steps: usize,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    let mut logging = vjmix_common::AppConfig::load().logging;
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    vjmix_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Init {
            name,
            output,
            layers,
            fader,
        } => commands::init::run(name, output, layers, fader),
        Commands::Info { path } => commands::info::run(path),
        Commands::Run {
            session,
            config,
            seconds,
            fps,
            fader,
            sources,
            clip_secs,
            play,
            record,
            realtime,
            save,
        } => {
            commands::run::run(commands::run::RunOptions {
                session,
                config,
                seconds,
                fps,
                fader,
                sources,
                clip_secs,
                play,
                record,
                realtime,
                save,
            })
            .await
        }
        Commands::BlendTable {
            overlay_boost,
            json,
        } => commands::blend_table::run(overlay_boost, json),
        Commands::Weights { steps } => commands::weights::run(steps),
    }
}
