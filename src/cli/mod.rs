//! CLI Module
//!
//! Command-line interface for the audio studio.

pub mod commands;

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use crate::export::ExportFormat;

/// Audio Studio - speed, pitch, volume, reverb and echo for audio files
#[derive(Parser, Debug)]
#[command(name = "audio-studio")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Apply effects to an audio file and write the result
    #[command(name = "render")]
    Render(RenderArgs),

    /// List the built-in presets
    #[command(name = "presets")]
    Presets,

    /// Print format and level information for an audio file
    #[command(name = "inspect")]
    Inspect {
        /// Audio file to inspect
        input: PathBuf,
    },
}

#[derive(Args, Debug, Clone)]
pub struct RenderArgs {
    /// Audio file to process
    pub input: PathBuf,

    /// Output path (default: derived from the input name and effects)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Start from a preset (slowed-reverb, sped-up, nightcore)
    #[arg(long)]
    pub preset: Option<String>,

    /// Playback speed multiplier (0.25-3.0)
    #[arg(long)]
    pub speed: Option<f64>,

    /// Pitch multiplier (0.5-2.0)
    #[arg(long)]
    pub pitch: Option<f64>,

    /// Volume multiplier (0-2.0)
    #[arg(long)]
    pub volume: Option<f64>,

    /// Reverb wet mix (0-1.0)
    #[arg(long)]
    pub reverb: Option<f64>,

    /// Echo wet mix (0-1.0)
    #[arg(long)]
    pub echo: Option<f64>,

    /// Output format
    #[arg(long, value_enum)]
    pub format: Option<ExportFormat>,

    /// Seed for the reverb impulse response
    #[arg(long)]
    pub seed: Option<u64>,

    /// JSON config file
    #[arg(long)]
    pub config: Option<PathBuf>,
}
