//! Buffer source
//!
//! Reads the original buffer at a playback rate, with an additional
//! detune in cents folded into the same rate:
//! `computed_rate = playback_rate * 2^(detune / 1200)`.
//! Resampling uses linear interpolation between adjacent frames.

use crate::engine::SampleBuffer;

/// Playback settings for a buffer source
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SourceSettings {
    /// Playback-rate multiplier
    pub playback_rate: f64,
    /// Detune in cents (1200 cents = one octave)
    pub detune_cents: f64,
}

impl SourceSettings {
    /// Rate at which source frames are consumed per output frame
    pub fn computed_rate(&self) -> f64 {
        self.playback_rate * (self.detune_cents / 1200.0).exp2()
    }
}

impl Default for SourceSettings {
    fn default() -> Self {
        Self {
            playback_rate: 1.0,
            detune_cents: 0.0,
        }
    }
}

/// Play `source` for `output_frames` frames
///
/// Frames past the end of the source are silent. At a computed rate of
/// exactly 1.0 the output is a bit-identical copy of the source prefix.
pub fn play_source(
    source: &SampleBuffer,
    settings: SourceSettings,
    output_frames: usize,
) -> Vec<Vec<f32>> {
    let rate = settings.computed_rate();

    source
        .channels
        .iter()
        .map(|channel| resample_linear(channel, rate, output_frames))
        .collect()
}

/// Read `samples` at `rate`, producing exactly `output_frames` frames
fn resample_linear(samples: &[f32], rate: f64, output_frames: usize) -> Vec<f32> {
    let source_len = samples.len();
    let mut output = Vec::with_capacity(output_frames);

    for i in 0..output_frames {
        // Map output index to source position
        let src_pos = i as f64 * rate;
        let src_idx = src_pos.floor() as usize;
        let frac = (src_pos - src_idx as f64) as f32;

        let sample = if src_idx >= source_len {
            0.0
        } else if frac == 0.0 || src_idx + 1 >= source_len {
            samples[src_idx]
        } else {
            samples[src_idx] * (1.0 - frac) + samples[src_idx + 1] * frac
        };

        output.push(sample);
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(len: usize) -> SampleBuffer {
        SampleBuffer::from_channels(vec![(0..len).map(|i| i as f32).collect()], 44100).unwrap()
    }

    #[test]
    fn test_computed_rate() {
        let settings = SourceSettings {
            playback_rate: 1.5,
            detune_cents: 1200.0,
        };
        assert!((settings.computed_rate() - 3.0).abs() < 1e-12);
        assert_eq!(SourceSettings::default().computed_rate(), 1.0);
    }

    #[test]
    fn test_unity_rate_is_identity() {
        let source = ramp(16);
        let out = play_source(&source, SourceSettings::default(), 16);
        assert_eq!(out[0], source.channels[0]);
    }

    #[test]
    fn test_double_rate_skips_frames() {
        let source = ramp(10);
        let settings = SourceSettings {
            playback_rate: 2.0,
            detune_cents: 0.0,
        };
        let out = play_source(&source, settings, 5);
        assert_eq!(out[0], vec![0.0, 2.0, 4.0, 6.0, 8.0]);
    }

    #[test]
    fn test_half_rate_interpolates() {
        let source = ramp(4);
        let settings = SourceSettings {
            playback_rate: 0.5,
            detune_cents: 0.0,
        };
        let out = play_source(&source, settings, 8);
        assert_eq!(out[0], vec![0.0, 0.5, 1.0, 1.5, 2.0, 2.5, 3.0, 3.0]);
    }

    #[test]
    fn test_exhausted_source_is_silent() {
        let source = ramp(4);
        let settings = SourceSettings {
            playback_rate: 1.0,
            detune_cents: 1200.0,
        };
        let out = play_source(&source, settings, 4);
        assert_eq!(out[0], vec![0.0, 2.0, 0.0, 0.0]);
    }

    #[test]
    fn test_channels_preserved() {
        let source = SampleBuffer::silent(3, 10, 48000);
        let out = play_source(&source, SourceSettings::default(), 7);
        assert_eq!(out.len(), 3);
        assert!(out.iter().all(|ch| ch.len() == 7));
    }
}
