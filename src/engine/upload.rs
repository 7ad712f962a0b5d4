//! Upload boundary
//!
//! Validates an uploaded file by declared media type or filename
//! extension and by size, then hands the bytes to an `AudioDecoder`.
//! Nothing is committed to a session unless every step succeeds.

use std::io::Cursor;
use std::path::Path;

use chrono::{DateTime, Utc};
use hound::{SampleFormat, WavReader};
use log::info;
use sha2::{Digest, Sha256};

use crate::engine::buffer::SampleBuffer;
use crate::error::{Result, StudioError};

/// Maximum accepted upload size (15 MB)
pub const MAX_UPLOAD_BYTES: u64 = 15 * 1024 * 1024;

/// Media types accepted at the upload boundary
pub const SUPPORTED_MEDIA_TYPES: [&str; 7] = [
    "audio/mpeg",
    "audio/wav",
    "audio/ogg",
    "audio/flac",
    "audio/x-flac",
    "audio/mp4",
    "audio/aac",
];

/// Filename extensions accepted at the upload boundary
pub const SUPPORTED_EXTENSIONS: [&str; 6] = ["mp3", "wav", "ogg", "flac", "m4a", "aac"];

/// Check a declared media type and filename against the supported containers
///
/// Either a recognized media type or a recognized extension is enough.
pub fn is_supported_file(file_name: &str, media_type: Option<&str>) -> bool {
    let type_ok = media_type
        .map(|mt| SUPPORTED_MEDIA_TYPES.contains(&mt.trim().to_ascii_lowercase().as_str()))
        .unwrap_or(false);

    type_ok
        || file_extension(file_name)
            .is_some_and(|ext| SUPPORTED_EXTENSIONS.contains(&ext.as_str()))
}

/// Lowercased extension of a filename, if any
pub fn file_extension(file_name: &str) -> Option<String> {
    Path::new(file_name)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.to_ascii_lowercase())
}

/// Validate size and format of an upload before decoding
///
/// # Errors
/// * `FileTooLarge` - if `size_bytes` exceeds `limit_bytes`
/// * `UnsupportedFormat` - if neither media type nor extension is recognized
pub fn validate_upload(
    file_name: &str,
    media_type: Option<&str>,
    size_bytes: u64,
    limit_bytes: u64,
) -> Result<()> {
    if size_bytes > limit_bytes {
        return Err(StudioError::FileTooLarge {
            size_bytes,
            limit_bytes,
        });
    }

    if !is_supported_file(file_name, media_type) {
        return Err(StudioError::UnsupportedFormat {
            format: media_type
                .map(str::to_string)
                .or_else(|| file_extension(file_name))
                .unwrap_or_else(|| file_name.to_string()),
        });
    }

    Ok(())
}

// ============================================================================
// Decoding
// ============================================================================

/// Turns uploaded container bytes into a `SampleBuffer`
pub trait AudioDecoder {
    /// Decode the full file
    ///
    /// Fails with `DecodeFailure` if the bytes cannot be decoded.
    fn decode(&self, bytes: &[u8]) -> Result<SampleBuffer>;
}

/// Decoder for RIFF/WAVE uploads
#[derive(Debug, Clone, Copy, Default)]
pub struct WavDecoder;

impl AudioDecoder for WavDecoder {
    fn decode(&self, bytes: &[u8]) -> Result<SampleBuffer> {
        let reader = WavReader::new(Cursor::new(bytes)).map_err(|e| StudioError::DecodeFailure {
            reason: format!("not a readable WAV file: {}", e),
            source: Some(Box::new(e)),
        })?;

        let spec = reader.spec();
        let num_channels = spec.channels as usize;
        if num_channels == 0 {
            return Err(StudioError::DecodeFailure {
                reason: "WAV header declares zero channels".to_string(),
                source: None,
            });
        }

        let interleaved = read_samples_as_f32(reader, spec.bits_per_sample, spec.sample_format)?;

        SampleBuffer::from_interleaved(&interleaved, num_channels, spec.sample_rate).map_err(|e| {
            StudioError::DecodeFailure {
                reason: e.to_string(),
                source: Some(Box::new(e)),
            }
        })
    }
}

/// Read samples from a WAV reader and convert to f32
fn read_samples_as_f32<R: std::io::Read>(
    mut reader: WavReader<R>,
    bits_per_sample: u16,
    sample_format: SampleFormat,
) -> Result<Vec<f32>> {
    let decode_err = |e: hound::Error| StudioError::DecodeFailure {
        reason: format!("failed to read {}-bit samples: {}", bits_per_sample, e),
        source: Some(Box::new(e)),
    };

    match sample_format {
        SampleFormat::Float => reader
            .samples::<f32>()
            .collect::<std::result::Result<Vec<f32>, _>>()
            .map_err(decode_err),
        SampleFormat::Int => {
            let full_scale = match bits_per_sample {
                8 => 128.0,
                16 => 32768.0,
                24 => 8388608.0,
                32 => 2147483648.0,
                _ => {
                    return Err(StudioError::DecodeFailure {
                        reason: format!("{}-bit integer audio is not supported", bits_per_sample),
                        source: None,
                    })
                }
            };
            reader
                .samples::<i32>()
                .map(|s| s.map(|v| v as f32 / full_scale))
                .collect::<std::result::Result<Vec<f32>, _>>()
                .map_err(decode_err)
        }
    }
}

// ============================================================================
// Uploaded source record
// ============================================================================

/// The original upload, retained for the lifetime of a session
///
/// Every render starts from `buffer`; it is never replaced by a
/// rendered result.
#[derive(Debug, Clone)]
pub struct UploadedAudio {
    /// Name of the uploaded file
    pub file_name: String,
    /// Declared media type, if the host provided one
    pub media_type: Option<String>,
    /// Size of the uploaded file in bytes
    pub size_bytes: u64,
    /// SHA-256 of the uploaded bytes (lowercase hex)
    pub checksum: String,
    /// When the upload was accepted
    pub uploaded_at: DateTime<Utc>,
    /// Decoded audio
    pub buffer: SampleBuffer,
}

impl UploadedAudio {
    /// Validate, decode, and record an upload
    ///
    /// # Errors
    /// * `FileTooLarge`, `UnsupportedFormat` - from `validate_upload`
    /// * `DecodeFailure` - if the decoder rejects the bytes or yields no frames
    pub fn accept(
        file_name: &str,
        media_type: Option<&str>,
        bytes: &[u8],
        limit_bytes: u64,
        decoder: &dyn AudioDecoder,
    ) -> Result<Self> {
        validate_upload(file_name, media_type, bytes.len() as u64, limit_bytes)?;

        let buffer = decoder.decode(bytes)?;
        if buffer.is_empty() {
            return Err(StudioError::DecodeFailure {
                reason: "decoded audio contains no frames".to_string(),
                source: None,
            });
        }

        let checksum = format!("{:x}", Sha256::digest(bytes));

        info!(
            "Accepted upload '{}': {} ch, {} Hz, {} frames",
            file_name,
            buffer.num_channels(),
            buffer.sample_rate,
            buffer.frames()
        );

        Ok(Self {
            file_name: file_name.to_string(),
            media_type: media_type.map(str::to_string),
            size_bytes: bytes.len() as u64,
            checksum,
            uploaded_at: Utc::now(),
            buffer,
        })
    }
}
