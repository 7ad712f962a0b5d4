//! DSP building blocks
//!
//! The processing stages a render graph is assembled from. Each stage
//! takes non-interleaved channel data and returns new data; none of them
//! keep state between renders.

pub mod delay;
pub mod gain;
pub mod mix;
pub mod params;
pub mod reverb;
pub mod source;

pub use delay::FeedbackDelay;
pub use gain::Gain;
pub use mix::{mix_channels, weighted_sum};
pub use params::{EffectParams, Preset};
pub use reverb::{convolve, generate_impulse_response, normalization_scale};
pub use source::{play_source, SourceSettings};
