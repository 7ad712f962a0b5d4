//! Audio Studio CLI
//!
//! Command-line interface for the offline effects renderer.

use anyhow::Result;
use clap::Parser;
use env_logger::Env;
use log::debug;

use audio_studio::cli::{commands, Cli, Commands};

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(Env::default().default_filter_or(default_filter)).init();

    debug!("Audio Studio v{}", env!("CARGO_PKG_VERSION"));

    match cli.command {
        Some(cmd) => handle_command(cmd),
        None => {
            println!("Audio Studio v{}", env!("CARGO_PKG_VERSION"));
            println!("Use --help for available commands");
            Ok(())
        }
    }
}

fn handle_command(cmd: Commands) -> Result<()> {
    match cmd {
        Commands::Render(args) => commands::render(&args).map(|_| ()),
        Commands::Presets => commands::list_presets(),
        Commands::Inspect { input } => commands::inspect(&input),
    }
}
