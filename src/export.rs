//! Export
//!
//! Serializes the current buffer for download and names the file after
//! the upload plus the effects that were applied.
//!
//! No MP3 encoder is shipped. Asking for MP3 produces WAV bytes that are
//! labelled as WAV and flagged as substituted.

use std::fmt;
use std::path::Path;

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::dsp::EffectParams;
use crate::engine::codec::encode_wav;
use crate::engine::SampleBuffer;
use crate::error::Result;

/// Download format offered to the user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    #[default]
    Wav,
    Mp3,
}

impl ExportFormat {
    /// Format whose bytes are actually produced for this request
    pub fn encoded_as(&self) -> ExportFormat {
        ExportFormat::Wav
    }

    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Wav => "wav",
            ExportFormat::Mp3 => "mp3",
        }
    }

    pub fn media_type(&self) -> &'static str {
        match self {
            ExportFormat::Wav => "audio/wav",
            ExportFormat::Mp3 => "audio/mpeg",
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Effects suffix for a parameter set, `None` when no threshold is crossed
///
/// Tags, in order: `slowed` (speed < 0.9), `sped` (speed > 1.1),
/// `lowered` (pitch < 0.9), `pitched` (pitch > 1.1), `reverb`
/// (reverb > 0.3), `echo` (echo > 0.3), joined with `-`.
pub fn effects_suffix(params: &EffectParams) -> Option<String> {
    let mut tags = Vec::new();

    if params.speed < 0.9 {
        tags.push("slowed");
    } else if params.speed > 1.1 {
        tags.push("sped");
    }

    if params.pitch < 0.9 {
        tags.push("lowered");
    } else if params.pitch > 1.1 {
        tags.push("pitched");
    }

    if params.reverb > 0.3 {
        tags.push("reverb");
    }
    if params.echo > 0.3 {
        tags.push("echo");
    }

    if tags.is_empty() {
        None
    } else {
        Some(tags.join("-"))
    }
}

/// Upload name without its final extension
///
/// A name with no extension is returned whole.
pub fn base_name(file_name: &str) -> &str {
    match Path::new(file_name).extension().and_then(|ext| ext.to_str()) {
        Some(ext) => &file_name[..file_name.len() - ext.len() - 1],
        None => file_name,
    }
}

/// `{base}{_suffix}_modified.{ext}`
pub fn output_file_name(original_name: &str, params: &EffectParams, extension: &str) -> String {
    let suffix = effects_suffix(params)
        .map(|s| format!("_{}", s))
        .unwrap_or_default();
    format!("{}{}_modified.{}", base_name(original_name), suffix, extension)
}

/// An encoded file ready to be saved
#[derive(Debug, Clone, PartialEq)]
pub struct ExportedFile {
    pub bytes: Vec<u8>,
    pub file_name: String,
    pub media_type: &'static str,
    /// Format the caller asked for
    pub requested: ExportFormat,
    /// True when the bytes are in a different format than requested
    pub substituted: bool,
}

impl ExportedFile {
    /// Encoding actually used for `bytes`
    pub fn format(&self) -> ExportFormat {
        self.requested.encoded_as()
    }
}

/// Encode `buffer` for download
pub fn export_buffer(
    buffer: &SampleBuffer,
    original_name: &str,
    params: &EffectParams,
    requested: ExportFormat,
) -> Result<ExportedFile> {
    let format = requested.encoded_as();
    let substituted = format != requested;
    if substituted {
        warn!(
            "{} encoding is not available; exporting {} instead",
            requested.extension().to_uppercase(),
            format.extension().to_uppercase()
        );
    }

    let bytes = encode_wav(buffer)?;
    let file_name = output_file_name(original_name, params, format.extension());

    info!("Exported '{}' ({} bytes)", file_name, bytes.len());

    Ok(ExportedFile {
        bytes,
        file_name,
        media_type: format.media_type(),
        requested,
        substituted,
    })
}
