//! Convolution reverb
//!
//! The impulse response is synthetic: two channels of exponentially
//! decaying white noise, at most one second long. Convolution runs in
//! the frequency domain with overlap-add over blocks sized so that each
//! block plus the impulse fits one FFT.

use log::debug;
use rand::Rng;
use rustfft::num_complex::Complex;

use crate::engine::context::{FftPair, RenderContext};
use crate::engine::SampleBuffer;
use crate::error::{Result, StudioError};

/// Channels in a generated impulse response
pub const IMPULSE_CHANNELS: usize = 2;

/// Upper bound on impulse length in frames
pub const MAX_IMPULSE_FRAMES: usize = 44100;

/// Decay time constant as a fraction of the impulse length
pub const IMPULSE_DECAY: f32 = 0.3;

/// Loudness calibration applied by the convolver, in dB
const GAIN_CALIBRATION_DB: f32 = -58.0;
/// Sample rate the calibration was measured at
const GAIN_CALIBRATION_SAMPLE_RATE: f32 = 44100.0;
/// Floor for the impulse RMS, so near-silent impulses are not blown up
const MIN_POWER: f32 = 0.000125;

/// Impulse length in frames for a sample rate: `min(2 * rate, 44100)`
pub fn impulse_length(sample_rate: u32) -> usize {
    (2 * sample_rate as usize).min(MAX_IMPULSE_FRAMES)
}

/// Generate a decaying-noise impulse response
///
/// Sample `i` of each channel is `uniform(-1, 1) * exp(-i / (len * 0.3))`.
pub fn generate_impulse_response<R: Rng + ?Sized>(sample_rate: u32, rng: &mut R) -> SampleBuffer {
    let length = impulse_length(sample_rate);
    let decay = length as f32 * IMPULSE_DECAY;

    let channels = (0..IMPULSE_CHANNELS)
        .map(|_| {
            (0..length)
                .map(|i| (rng.gen::<f32>() * 2.0 - 1.0) * (-(i as f32) / decay).exp())
                .collect()
        })
        .collect();

    SampleBuffer {
        channels,
        sample_rate,
    }
}

/// Scale the convolver applies to an impulse response
///
/// `10^(-58/20) / max(rms, 0.000125) * 44100 / sample_rate`, where the
/// RMS runs over every sample of every channel.
pub fn normalization_scale(impulse: &SampleBuffer) -> f32 {
    let total = impulse.num_channels() * impulse.frames();
    let power = if total == 0 {
        0.0
    } else {
        let sum_squares: f64 = impulse
            .channels
            .iter()
            .flat_map(|channel| channel.iter())
            .map(|&s| (s as f64) * (s as f64))
            .sum();
        (sum_squares / total as f64).sqrt() as f32
    };

    let calibration = 10.0_f32.powf(GAIN_CALIBRATION_DB / 20.0);
    let scale = calibration / power.max(MIN_POWER);

    if impulse.sample_rate == 0 {
        scale
    } else {
        scale * GAIN_CALIBRATION_SAMPLE_RATE / impulse.sample_rate as f32
    }
}

/// Convolve `input` with a stereo impulse response
///
/// The output is always stereo and holds `output_frames` frames; the
/// convolution tail past that point is discarded. Mono input feeds both
/// impulse channels, inputs wider than stereo use their first two
/// channels.
pub fn convolve(
    context: &RenderContext,
    input: &[Vec<f32>],
    impulse: &SampleBuffer,
    output_frames: usize,
) -> Result<Vec<Vec<f32>>> {
    impulse.validate()?;
    if input.is_empty() {
        return Err(StudioError::RenderFailure {
            reason: "convolver input has no channels".to_string(),
        });
    }

    let kernel_len = impulse.frames();
    if kernel_len == 0 || output_frames == 0 {
        return Ok(vec![vec![0.0; output_frames]; IMPULSE_CHANNELS]);
    }

    let fft_size = (2 * kernel_len).next_power_of_two();
    let block_size = fft_size - kernel_len + 1;
    let fft = context.plan_fft(fft_size)?;
    let scale = normalization_scale(impulse);

    debug!(
        "[REVERB] Convolving {} frames with {}-frame impulse (fft {}, block {})",
        output_frames, kernel_len, fft_size, block_size
    );

    let output = (0..IMPULSE_CHANNELS)
        .map(|ch| {
            let kernel = impulse.channel(ch.min(impulse.num_channels() - 1));
            let spectrum = kernel_spectrum(&fft, kernel, scale);
            let signal = &input[ch.min(input.len() - 1)];
            overlap_add(&fft, signal, &spectrum, block_size, output_frames)
        })
        .collect();

    Ok(output)
}

/// Forward FFT of the zero-padded, scaled kernel
fn kernel_spectrum(fft: &FftPair, kernel: &[f32], scale: f32) -> Vec<Complex<f32>> {
    let mut spectrum = vec![Complex::new(0.0, 0.0); fft.len()];
    for (bin, &s) in spectrum.iter_mut().zip(kernel) {
        bin.re = s * scale;
    }
    fft.forward.process(&mut spectrum);
    spectrum
}

fn overlap_add(
    fft: &FftPair,
    signal: &[f32],
    spectrum: &[Complex<f32>],
    block_size: usize,
    output_frames: usize,
) -> Vec<f32> {
    let fft_size = fft.len();
    let norm = 1.0 / fft_size as f32;
    let usable = signal.len().min(output_frames);

    let mut output = vec![0.0_f32; output_frames];
    let mut work = vec![Complex::new(0.0, 0.0); fft_size];

    for start in (0..usable).step_by(block_size) {
        let end = (start + block_size).min(usable);

        work.iter_mut().for_each(|c| *c = Complex::new(0.0, 0.0));
        for (bin, &s) in work.iter_mut().zip(&signal[start..end]) {
            bin.re = s;
        }

        fft.forward.process(&mut work);
        for (bin, k) in work.iter_mut().zip(spectrum) {
            *bin *= *k;
        }
        fft.inverse.process(&mut work);

        let tail = (output_frames - start).min(fft_size);
        for (out, bin) in output[start..start + tail].iter_mut().zip(&work) {
            *out += bin.re * norm;
        }
    }

    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn direct_convolution_at(signal: &[f32], kernel: &[f32], n: usize) -> f32 {
        (0..kernel.len())
            .filter(|&k| k <= n && n - k < signal.len())
            .map(|k| signal[n - k] * kernel[k])
            .sum()
    }

    #[test]
    fn test_impulse_length() {
        assert_eq!(impulse_length(8000), 16000);
        assert_eq!(impulse_length(22050), 44100);
        assert_eq!(impulse_length(48000), 44100);
    }

    #[test]
    fn test_impulse_shape() {
        let mut rng = StdRng::seed_from_u64(7);
        let ir = generate_impulse_response(44100, &mut rng);

        assert_eq!(ir.num_channels(), 2);
        assert_eq!(ir.frames(), 44100);
        assert!(ir.peak() <= 1.0);
        assert_ne!(ir.channel(0), ir.channel(1));

        // Envelope at the end is exp(-1 / 0.3)
        let envelope = (-(44099.0_f32) / (44100.0 * 0.3)).exp();
        assert!(ir.channel(0)[44099].abs() <= envelope + 1e-6);
    }

    #[test]
    fn test_seeded_impulse_is_reproducible() {
        let a = generate_impulse_response(16000, &mut StdRng::seed_from_u64(42));
        let b = generate_impulse_response(16000, &mut StdRng::seed_from_u64(42));
        let c = generate_impulse_response(16000, &mut StdRng::seed_from_u64(43));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_normalization_scale() {
        // Unit RMS at the calibration rate leaves only the -58 dB factor
        let ir =
            SampleBuffer::from_channels(vec![vec![1.0, -1.0], vec![-1.0, 1.0]], 44100).unwrap();
        assert_relative_eq!(normalization_scale(&ir), 10.0_f32.powf(-58.0 / 20.0), epsilon = 1e-7);

        let ir =
            SampleBuffer::from_channels(vec![vec![1.0, -1.0], vec![-1.0, 1.0]], 22050).unwrap();
        assert_relative_eq!(
            normalization_scale(&ir),
            2.0 * 10.0_f32.powf(-58.0 / 20.0),
            epsilon = 1e-6
        );

        let silent = SampleBuffer::silent(2, 4, 44100);
        assert_relative_eq!(
            normalization_scale(&silent),
            10.0_f32.powf(-58.0 / 20.0) / MIN_POWER,
            max_relative = 1e-5
        );
    }

    #[test]
    fn test_matches_direct_convolution() {
        let context = RenderContext::acquire();
        let mut rng = StdRng::seed_from_u64(3);
        let ir = generate_impulse_response(3000, &mut rng);
        let scale = normalization_scale(&ir);

        let signal: Vec<f32> = (0..10_000).map(|i| ((i as f32) * 0.01).sin()).collect();
        let out = convolve(&context, &[signal.clone()], &ir, 12_000).unwrap();

        assert_eq!(out.len(), 2);
        assert_eq!(out[0].len(), 12_000);

        let kernel: Vec<f32> = ir.channel(1).iter().map(|&s| s * scale).collect();
        for n in (0..12_000).step_by(97) {
            let expected = direct_convolution_at(&signal, &kernel, n);
            assert!(
                (out[1][n] - expected).abs() < 1e-3,
                "frame {}: {} vs {}",
                n,
                out[1][n],
                expected
            );
        }
    }

    #[test]
    fn test_unit_impulse_passes_signal_scaled() {
        let context = RenderContext::acquire();
        let mut kernel = vec![0.0; 8];
        kernel[0] = 1.0;
        let ir = SampleBuffer::from_channels(vec![kernel.clone(), kernel], 44100).unwrap();
        let scale = normalization_scale(&ir);

        let left = vec![0.5, -0.25, 0.0, 1.0];
        let right = vec![0.1, 0.2, 0.3, 0.4];
        let out = convolve(&context, &[left.clone(), right.clone()], &ir, 4).unwrap();

        for i in 0..4 {
            assert_relative_eq!(out[0][i], left[i] * scale, epsilon = 1e-4);
            assert_relative_eq!(out[1][i], right[i] * scale, epsilon = 1e-4);
        }
    }

    #[test]
    fn test_closed_context_fails() {
        let context = RenderContext::acquire();
        context.close();
        let ir = generate_impulse_response(8000, &mut StdRng::seed_from_u64(1));
        let result = convolve(&context, &[vec![0.0; 16]], &ir, 16);
        assert!(matches!(result, Err(StudioError::ContextClosed)));
    }
}
