//! PCM Codec
//!
//! Serializes a `SampleBuffer` into a canonical 16-bit PCM WAV container:
//! a 44-byte RIFF header followed by interleaved little-endian samples.
//! Buffers peaking above the normalization ceiling are scaled down so
//! that nothing clips at 16-bit resolution.

use log::debug;

use crate::engine::buffer::SampleBuffer;
use crate::error::{Result, StudioError};

/// Size of the RIFF/WAVE header written by `encode_wav`
pub const WAV_HEADER_LEN: usize = 44;

/// Peak level above which the encoder normalizes
pub const NORMALIZATION_CEILING: f64 = 0.95;

/// WAVE format tag for linear PCM
const FORMAT_PCM: u16 = 1;

const BITS_PER_SAMPLE: u16 = 16;
const BYTES_PER_SAMPLE: u32 = (BITS_PER_SAMPLE / 8) as u32;

/// Scale factor applied before quantization for a given peak amplitude
#[inline]
pub fn normalization_factor(peak: f32) -> f64 {
    let peak = peak as f64;
    if peak > NORMALIZATION_CEILING {
        NORMALIZATION_CEILING / peak
    } else {
        1.0
    }
}

/// Quantize one scaled sample to signed 16-bit
///
/// Negative samples scale by 32768, non-negative ones by 32767, since
/// 16-bit PCM has one more negative code than positive. Halves round
/// toward positive infinity.
#[inline]
pub fn quantize_sample(sample: f64) -> i16 {
    let sample = sample.clamp(-1.0, 1.0);
    if sample < 0.0 {
        round_half_up(sample * 32768.0).max(-32768.0) as i16
    } else {
        round_half_up(sample * 32767.0).min(32767.0) as i16
    }
}

#[inline]
fn round_half_up(value: f64) -> f64 {
    (value + 0.5).floor()
}

/// Number of bytes `encode_wav` produces for a buffer
pub fn encoded_len(buffer: &SampleBuffer) -> usize {
    WAV_HEADER_LEN + buffer.frames() * buffer.num_channels() * BYTES_PER_SAMPLE as usize
}

/// Encode a buffer as a 16-bit PCM WAV byte sequence
///
/// # Errors
/// * `MalformedBuffer` - if the buffer invariant does not hold, or the
///   payload does not fit in a RIFF container
pub fn encode_wav(buffer: &SampleBuffer) -> Result<Vec<u8>> {
    buffer.validate()?;

    let num_channels = buffer.num_channels();
    let channels = u16::try_from(num_channels).map_err(|_| StudioError::MalformedBuffer {
        reason: format!("{} channels do not fit a WAV header", num_channels),
    })?;

    let data_len = buffer.frames() as u64 * num_channels as u64 * BYTES_PER_SAMPLE as u64;
    let data_size = u32::try_from(data_len)
        .ok()
        .filter(|size| size.checked_add(36).is_some())
        .ok_or_else(|| StudioError::MalformedBuffer {
            reason: format!("{} bytes of PCM exceed the WAV size limit", data_len),
        })?;

    let sample_rate = buffer.sample_rate;
    let byte_rate = sample_rate * channels as u32 * BYTES_PER_SAMPLE;
    let block_align = channels * BYTES_PER_SAMPLE as u16;

    let mut bytes = Vec::with_capacity(encoded_len(buffer));

    // RIFF header
    bytes.extend_from_slice(b"RIFF");
    bytes.extend_from_slice(&(36 + data_size).to_le_bytes());
    bytes.extend_from_slice(b"WAVE");

    // fmt chunk
    bytes.extend_from_slice(b"fmt ");
    bytes.extend_from_slice(&16u32.to_le_bytes());
    bytes.extend_from_slice(&FORMAT_PCM.to_le_bytes());
    bytes.extend_from_slice(&channels.to_le_bytes());
    bytes.extend_from_slice(&sample_rate.to_le_bytes());
    bytes.extend_from_slice(&byte_rate.to_le_bytes());
    bytes.extend_from_slice(&block_align.to_le_bytes());
    bytes.extend_from_slice(&BITS_PER_SAMPLE.to_le_bytes());

    // data chunk
    bytes.extend_from_slice(b"data");
    bytes.extend_from_slice(&data_size.to_le_bytes());

    let factor = normalization_factor(buffer.peak());
    if factor < 1.0 {
        debug!("[CODEC] Normalizing by {:.4} to avoid clipping", factor);
    }

    for frame in 0..buffer.frames() {
        for channel in &buffer.channels {
            let sample = quantize_sample(channel[frame] as f64 * factor);
            bytes.extend_from_slice(&sample.to_le_bytes());
        }
    }

    Ok(bytes)
}
