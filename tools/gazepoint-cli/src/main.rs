//! Gazepoint CLI: command-line interface for offline gaze sessions.
//!
//! Usage:
//!   gazepoint synth -o <PATH>                      Generate a synthetic landmark session
//!   gazepoint calibrate <SESSION> -o <PATH>        Build a calibration from a session
//!   gazepoint track <SESSION> --calibration <PATH> Replay tracking frames and report clicks
//!   gazepoint info <PATH>                          Show calibration information
//!   gazepoint init-config                          Write the default configuration

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use gazepoint_common::config::AppConfig;

mod commands;

#[derive(Parser)]
#[command(
    name = "gazepoint",
    about = "Hands-free pointer control from facial landmarks",
    version,
    author
)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Configuration file (defaults to the standard location)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate a synthetic landmark session
    Synth {
        /// Output session file
        #[arg(short, long, default_value = "session.jsonl")]
        output: PathBuf,

        /// Random seed
        #[arg(long, default_value = "7")]
        seed: u64,

        /// Iris jitter amplitude (image units)
        #[arg(long, default_value = "0.0001")]
        noise: f64,

        /// Probability that a frame is a blink
        #[arg(long, default_value = "0.05")]
        blink_rate: f64,

        /// Number of tracking fixations after calibration
        #[arg(long, default_value = "4")]
        fixations: usize,

        /// How long each fixation is held (milliseconds)
        #[arg(long, default_value = "1500")]
        hold_ms: u64,

        /// Camera frame rate
        #[arg(long, default_value = "30")]
        fps: u32,
    },

    /// Aggregate calibration frames of a session into a calibration file
    Calibrate {
        /// Path to the session file
        session: PathBuf,

        /// Output calibration file
        #[arg(short, long, default_value = "calibration.json")]
        output: PathBuf,
    },

    /// Train on a calibration and replay the tracking frames of a session
    Track {
        /// Path to the session file
        session: PathBuf,

        /// Calibration file produced by `calibrate`
        #[arg(long, default_value = "calibration.json")]
        calibration: PathBuf,

        /// Print one JSON object per dwell event
        #[arg(long)]
        json: bool,
    },

    /// Show calibration information
    Info {
        /// Path to the calibration file
        path: PathBuf,
    },

    /// Write the default configuration file
    InitConfig {
        /// Output path (defaults to the standard location)
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => AppConfig::load_from(path)
            .map_err(|e| anyhow::anyhow!("Failed to load config {}: {e}", path.display()))?,
        None => AppConfig::load(),
    };

    // Initialize logging
    let mut logging = config.logging.clone();
    if cli.verbose {
        logging.level = "debug".to_string();
    }
    gazepoint_common::logging::init_logging(&logging);

    match cli.command {
        Commands::Synth {
            output,
            seed,
            noise,
            blink_rate,
            fixations,
            hold_ms,
            fps,
        } => commands::synth::run(
            &config,
            commands::synth::SynthOptions {
                output,
                seed,
                noise,
                blink_rate,
                fixations,
                hold_ms,
                fps,
            },
        ),
        Commands::Calibrate { session, output } => {
            commands::calibrate::run(config, session, output)
        }
        Commands::Track {
            session,
            calibration,
            json,
        } => commands::track::run(config, session, calibration, json).await,
        Commands::Info { path } => commands::info::run(path),
        Commands::InitConfig { output, force } => commands::init_config::run(output, force),
    }
}
