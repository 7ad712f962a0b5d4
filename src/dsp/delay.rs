//! Feedback delay
//!
//! A fixed delay line whose output is fed back into its own input
//! through an attenuating gain, so each repeat is quieter than the last:
//! `wet[n] = in[n - D] + feedback * wet[n - D]`.

/// Delay time of the echo stage in seconds
pub const ECHO_DELAY_SECS: f64 = 0.25;

/// Feedback gain per unit of the `echo` parameter
pub const ECHO_FEEDBACK_SCALE: f64 = 0.6;

/// Delay line with feedback
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FeedbackDelay {
    /// Delay length in frames
    pub delay_frames: usize,
    /// Gain on the feedback path, kept below 1.0 so repeats decay
    pub feedback: f32,
}

impl FeedbackDelay {
    /// Delay for the echo stage at a sample rate
    pub fn for_echo(echo: f64, sample_rate: u32) -> Self {
        Self {
            delay_frames: (ECHO_DELAY_SECS * sample_rate as f64).round() as usize,
            feedback: (echo * ECHO_FEEDBACK_SCALE) as f32,
        }
    }

    /// Run the delay over every channel, returning only the wet signal
    pub fn process(&self, input: &[Vec<f32>]) -> Vec<Vec<f32>> {
        input
            .iter()
            .map(|channel| self.process_channel(channel))
            .collect()
    }

    fn process_channel(&self, input: &[f32]) -> Vec<f32> {
        let d = self.delay_frames;
        let mut wet = vec![0.0_f32; input.len()];

        if d == 0 {
            // A zero-length loop would feed back instantly; treat as a plain tap
            wet.copy_from_slice(input);
            return wet;
        }

        for n in d..input.len() {
            wet[n] = input[n - d] + self.feedback * wet[n - d];
        }

        wet
    }
}
