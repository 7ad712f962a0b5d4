//! CLI Command Implementations
//!
//! Implements the actual logic for each CLI command.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use log::info;

use crate::cli::RenderArgs;
use crate::config::StudioConfig;
use crate::dsp::{EffectParams, Preset};
use crate::engine::upload::{UploadedAudio, WavDecoder};
use crate::engine::EditorSession;

/// Render an input file with the requested effects.
///
/// Returns the path that was written.
pub fn render(args: &RenderArgs) -> Result<PathBuf> {
    let mut config = match &args.config {
        Some(path) => StudioConfig::load(path)
            .with_context(|| format!("failed to load config {}", path.display()))?,
        None => StudioConfig::default(),
    };
    if args.seed.is_some() {
        config.impulse_seed = args.seed;
    }
    if let Some(format) = args.format {
        config.export_format = format;
    }

    let params = resolve_params(args)?;
    let (file_name, bytes) = read_input(&args.input)?;

    let mut session = EditorSession::new(config);
    session
        .upload(&file_name, None, &bytes, &WavDecoder)
        .map_err(|e| anyhow::anyhow!("{} ({})", e.friendly_message(), e))?;
    session
        .apply_params(params)
        .with_context(|| format!("failed to render {}", args.input.display()))?;

    let file = session.export(None)?;
    let output = args
        .output
        .clone()
        .unwrap_or_else(|| args.input.with_file_name(&file.file_name));

    fs::write(&output, &file.bytes)
        .with_context(|| format!("failed to write {}", output.display()))?;
    session.close();

    if file.substituted {
        println!(
            "Note: {} export is not available, wrote WAV instead",
            file.requested.extension().to_uppercase()
        );
    }
    println!("Wrote {} ({} bytes)", output.display(), file.bytes.len());

    Ok(output)
}

/// Print every preset and its parameters.
pub fn list_presets() -> Result<()> {
    for preset in Preset::ALL {
        let p = preset.params();
        println!(
            "{:<14} {:<16} speed {:.2}  pitch {:.2}  volume {:.2}  reverb {:.2}  echo {:.2}",
            preset.name(),
            preset.display_name(),
            p.speed,
            p.pitch,
            p.volume,
            p.reverb,
            p.echo
        );
    }
    Ok(())
}

/// Print format and level information for an audio file.
pub fn inspect(path: &Path) -> Result<()> {
    let (file_name, bytes) = read_input(path)?;
    let upload = UploadedAudio::accept(
        &file_name,
        None,
        &bytes,
        StudioConfig::default().max_upload_bytes,
        &WavDecoder,
    )
    .map_err(|e| anyhow::anyhow!("{} ({})", e.friendly_message(), e))?;

    let buffer = &upload.buffer;
    println!("File:        {}", upload.file_name);
    println!("Size:        {} bytes", upload.size_bytes);
    println!("SHA-256:     {}", upload.checksum);
    println!("Channels:    {}", buffer.num_channels());
    println!("Sample rate: {} Hz", buffer.sample_rate);
    println!("Frames:      {}", buffer.frames());
    println!("Duration:    {:.3} s", buffer.duration_secs());
    println!("Peak:        {:.2} dBFS", buffer.peak_db());
    println!("RMS:         {:.2} dBFS", buffer.rms_db());

    Ok(())
}

/// Preset (if any) with individual flags applied on top, validated.
pub fn resolve_params(args: &RenderArgs) -> Result<EffectParams> {
    let mut params = match &args.preset {
        Some(name) => match Preset::from_name(name) {
            Some(preset) => preset.params(),
            None => bail!("unknown preset '{}'", name),
        },
        None => EffectParams::default(),
    };

    if let Some(speed) = args.speed {
        params.speed = speed;
    }
    if let Some(pitch) = args.pitch {
        params.pitch = pitch;
    }
    if let Some(volume) = args.volume {
        params.volume = volume;
    }
    if let Some(reverb) = args.reverb {
        params.reverb = reverb;
    }
    if let Some(echo) = args.echo {
        params.echo = echo;
    }

    params.validate()?;
    Ok(params)
}

fn read_input(path: &Path) -> Result<(String, Vec<u8>)> {
    info!("Reading {}", path.display());

    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .with_context(|| format!("{} has no usable file name", path.display()))?
        .to_string();
    let bytes = fs::read(path).with_context(|| format!("failed to read {}", path.display()))?;

    Ok((file_name, bytes))
}
