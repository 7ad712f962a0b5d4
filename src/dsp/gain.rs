//! Gain stage
//!
//! Linear multiply of every sample by the volume parameter.

/// Linear gain stage
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Gain {
    gain: f32,
}

impl Gain {
    /// Create a gain stage from a linear multiplier
    pub fn new(gain: f32) -> Self {
        Self { gain }
    }

    /// Apply the gain to every channel in place
    pub fn process(&self, channels: &mut [Vec<f32>]) {
        // Unity gain leaves samples untouched
        if self.gain == 1.0 {
            return;
        }

        for sample in channels.iter_mut().flat_map(|channel| channel.iter_mut()) {
            *sample *= self.gain;
        }
    }
}

impl Default for Gain {
    fn default() -> Self {
        Self::new(1.0)
    }
}
