//! Sample Buffer
//!
//! The decoded, non-interleaved audio value every stage of the pipeline
//! consumes and produces. Buffers are never mutated once handed to the
//! pipeline; each render builds a new one.

use crate::error::{Result, StudioError};

// ============================================================================
// Helper Functions
// ============================================================================

/// Convert linear amplitude to decibels
///
/// Returns -f32::INFINITY for zero input.
#[inline]
pub fn linear_to_db(linear: f32) -> f32 {
    if linear <= 0.0 {
        f32::NEG_INFINITY
    } else {
        20.0 * linear.log10()
    }
}

/// Peak absolute amplitude across all channels and frames
pub fn peak_amplitude(channels: &[Vec<f32>]) -> f32 {
    channels
        .iter()
        .flat_map(|channel| channel.iter())
        .map(|&s| s.abs())
        .fold(0.0_f32, f32::max)
}

// ============================================================================
// Sample Buffer
// ============================================================================

/// Multi-channel floating-point audio
///
/// Stores audio as non-interleaved 32-bit floating point samples, one
/// `Vec<f32>` per channel. Every channel holds `frames()` samples and all
/// channels share `sample_rate`.
///
/// # Example
/// ```
/// use audio_studio::engine::SampleBuffer;
///
/// // One second of stereo silence
/// let buffer = SampleBuffer::silent(2, 44100, 44100);
/// assert_eq!(buffer.num_channels(), 2);
/// assert_eq!(buffer.frames(), 44100);
/// assert!(buffer.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SampleBuffer {
    /// Sample data: outer Vec is channels, inner Vec is frames
    pub channels: Vec<Vec<f32>>,
    /// Sample rate in Hz
    pub sample_rate: u32,
}

impl SampleBuffer {
    /// Create a silent buffer
    pub fn silent(num_channels: usize, frames: usize, sample_rate: u32) -> Self {
        Self {
            channels: vec![vec![0.0_f32; frames]; num_channels],
            sample_rate,
        }
    }

    /// Create a buffer from per-channel data, checking the buffer invariant
    pub fn from_channels(channels: Vec<Vec<f32>>, sample_rate: u32) -> Result<Self> {
        let buffer = Self {
            channels,
            sample_rate,
        };
        buffer.validate()?;
        Ok(buffer)
    }

    /// Create a buffer from interleaved sample data (L, R, L, R, ... for stereo)
    pub fn from_interleaved(
        interleaved: &[f32],
        num_channels: usize,
        sample_rate: u32,
    ) -> Result<Self> {
        if num_channels == 0 {
            return Err(StudioError::MalformedBuffer {
                reason: "channel count must be at least 1".to_string(),
            });
        }

        if interleaved.len() % num_channels != 0 {
            return Err(StudioError::MalformedBuffer {
                reason: format!(
                    "interleaved data length {} is not divisible by channel count {}",
                    interleaved.len(),
                    num_channels
                ),
            });
        }

        let frames = interleaved.len() / num_channels;
        let mut channels = vec![Vec::with_capacity(frames); num_channels];

        for frame in interleaved.chunks_exact(num_channels) {
            for (ch, &sample) in frame.iter().enumerate() {
                channels[ch].push(sample);
            }
        }

        Self::from_channels(channels, sample_rate)
    }

    /// Convert the buffer to interleaved format
    pub fn to_interleaved(&self) -> Vec<f32> {
        let frames = self.frames();
        let mut interleaved = Vec::with_capacity(self.num_channels() * frames);

        for frame in 0..frames {
            for channel in &self.channels {
                interleaved.push(channel[frame]);
            }
        }

        interleaved
    }

    /// Check the buffer invariant
    ///
    /// Fails with `MalformedBuffer` when there are no channels, the sample
    /// rate is zero, or the channels disagree on length.
    pub fn validate(&self) -> Result<()> {
        if self.channels.is_empty() {
            return Err(StudioError::MalformedBuffer {
                reason: "buffer has no channels".to_string(),
            });
        }

        if self.sample_rate == 0 {
            return Err(StudioError::MalformedBuffer {
                reason: "sample rate must be positive".to_string(),
            });
        }

        let expected = self.channels[0].len();
        if let Some((index, channel)) = self
            .channels
            .iter()
            .enumerate()
            .find(|(_, channel)| channel.len() != expected)
        {
            return Err(StudioError::MalformedBuffer {
                reason: format!(
                    "channel {} has {} frames, channel 0 has {}",
                    index,
                    channel.len(),
                    expected
                ),
            });
        }

        Ok(())
    }

    /// Number of channels
    #[inline]
    pub fn num_channels(&self) -> usize {
        self.channels.len()
    }

    /// Number of frames (samples per channel)
    #[inline]
    pub fn frames(&self) -> usize {
        self.channels.first().map_or(0, Vec::len)
    }

    /// True when the buffer holds no frames
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.frames() == 0
    }

    /// Duration in seconds
    pub fn duration_secs(&self) -> f64 {
        if self.sample_rate == 0 {
            return 0.0;
        }
        self.frames() as f64 / self.sample_rate as f64
    }

    /// Immutable access to one channel
    #[inline]
    pub fn channel(&self, index: usize) -> &[f32] {
        &self.channels[index]
    }

    /// Peak absolute amplitude (linear)
    pub fn peak(&self) -> f32 {
        peak_amplitude(&self.channels)
    }

    /// Peak level in dBFS
    pub fn peak_db(&self) -> f32 {
        linear_to_db(self.peak())
    }

    /// RMS level in dBFS across all channels
    pub fn rms_db(&self) -> f32 {
        let total = self.num_channels() * self.frames();
        if total == 0 {
            return f32::NEG_INFINITY;
        }

        let sum_squares: f64 = self
            .channels
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|&s| (s as f64) * (s as f64))
            .sum();

        linear_to_db((sum_squares / total as f64).sqrt() as f32)
    }

    /// Check whether every sample is exactly zero
    pub fn is_silent(&self) -> bool {
        self.channels
            .iter()
            .flat_map(|channel| channel.iter())
            .all(|&s| s == 0.0)
    }
}

// ============================================================================
// Test Signal Generators
// ============================================================================

/// Generate a mono sine tone
pub fn generate_test_tone(frequency: f32, duration_secs: f32, sample_rate: u32) -> SampleBuffer {
    let frames = (duration_secs * sample_rate as f32) as usize;
    let angular_freq = 2.0 * std::f32::consts::PI * frequency / sample_rate as f32;

    let samples = (0..frames)
        .map(|i| (angular_freq * i as f32).sin())
        .collect();

    SampleBuffer {
        channels: vec![samples],
        sample_rate,
    }
}

/// Generate a stereo tone with a different frequency per channel
pub fn generate_stereo_test_tone(
    freq_left: f32,
    freq_right: f32,
    duration_secs: f32,
    sample_rate: u32,
) -> SampleBuffer {
    let left = generate_test_tone(freq_left, duration_secs, sample_rate);
    let right = generate_test_tone(freq_right, duration_secs, sample_rate);

    SampleBuffer {
        channels: vec![
            left.channels.into_iter().next().unwrap_or_default(),
            right.channels.into_iter().next().unwrap_or_default(),
        ],
        sample_rate,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_silent_buffer() {
        let buffer = SampleBuffer::silent(1, 100, 44100);
        assert_eq!(buffer.frames(), 100);
        assert!(buffer.is_silent());
        assert_eq!(buffer.peak(), 0.0);
        assert_eq!(buffer.rms_db(), f32::NEG_INFINITY);
    }

    #[test]
    fn test_from_interleaved() {
        let buffer = SampleBuffer::from_interleaved(&[0.1, 0.2, 0.3, 0.4], 2, 48000).unwrap();
        assert_eq!(buffer.channel(0), &[0.1, 0.3]);
        assert_eq!(buffer.channel(1), &[0.2, 0.4]);
        assert_eq!(buffer.to_interleaved(), vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[test]
    fn test_from_interleaved_bad_length() {
        let result = SampleBuffer::from_interleaved(&[0.1, 0.2, 0.3], 2, 48000);
        assert!(matches!(result, Err(StudioError::MalformedBuffer { .. })));
    }

    #[test]
    fn test_validate_length_mismatch() {
        let buffer = SampleBuffer {
            channels: vec![vec![0.0; 10], vec![0.0; 9]],
            sample_rate: 44100,
        };
        match buffer.validate() {
            Err(StudioError::MalformedBuffer { reason }) => assert!(reason.contains("channel 1")),
            other => panic!("expected MalformedBuffer, got {:?}", other),
        }
    }

    #[test]
    fn test_validate_zero_rate_and_no_channels() {
        let no_rate = SampleBuffer {
            channels: vec![vec![0.0; 4]],
            sample_rate: 0,
        };
        assert!(no_rate.validate().is_err());

        let no_channels = SampleBuffer {
            channels: Vec::new(),
            sample_rate: 44100,
        };
        assert!(no_channels.validate().is_err());
    }

    #[test]
    fn test_peak_and_duration() {
        let buffer = SampleBuffer::from_channels(vec![vec![0.25, -0.75, 0.5]], 3).unwrap();
        assert_eq!(buffer.peak(), 0.75);
        assert!((buffer.duration_secs() - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_db_conversion() {
        assert!((linear_to_db(0.5) + 6.0206).abs() < 0.001);
        assert_eq!(linear_to_db(0.0), f32::NEG_INFINITY);
    }

    #[test]
    fn test_generate_stereo_test_tone() {
        let buffer = generate_stereo_test_tone(440.0, 880.0, 0.5, 48000);
        assert_eq!(buffer.num_channels(), 2);
        assert_eq!(buffer.frames(), 24000);
        assert!((buffer.channel(0)[100] - buffer.channel(1)[100]).abs() > 0.01);
    }
}
