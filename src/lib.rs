//! Audio Studio - Offline Audio Effects Rendering
//!
//! Takes an uploaded audio file, applies speed, pitch, volume, reverb
//! and echo as one deterministic offline pass, and encodes the result
//! as 16-bit PCM WAV.
//!
//! # Architecture
//!
//! - `engine`: sample buffers, WAV encoding, uploads, the session
//!   context, playback transport, and the editor session
//! - `dsp`: effect parameters and the processing stages
//! - `render`: graph building and offline execution
//! - `export`: download naming and format selection
//!
//! # Example
//! ```
//! use audio_studio::dsp::EffectParams;
//! use audio_studio::engine::{RenderContext, SampleBuffer};
//! use audio_studio::render::AudioProcessor;
//!
//! let original = SampleBuffer::silent(1, 88200, 44100);
//! let processor = AudioProcessor::new(RenderContext::acquire());
//!
//! let params = EffectParams { speed: 2.0, ..EffectParams::default() };
//! let rendered = processor.process(&original, &params).unwrap();
//! assert_eq!(rendered.frames(), 44100);
//! assert!(rendered.is_silent());
//! ```

pub mod cli;
pub mod config;
pub mod dsp;
pub mod engine;
pub mod error;
pub mod export;
pub mod render;

pub use config::StudioConfig;
pub use error::{Result, StudioError};
