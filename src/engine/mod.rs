//! Audio Engine Module
//!
//! Session-level audio handling:
//! - Sample buffers and 16-bit WAV encoding
//! - Upload validation and decoding
//! - The session-scoped processing context
//! - Playback transport across buffer swaps
//! - The editor session tying these together

pub mod buffer;
pub mod codec;
pub mod context;
pub mod playback;
pub mod session;
pub mod upload;

pub use buffer::{generate_stereo_test_tone, generate_test_tone, SampleBuffer};
pub use codec::encode_wav;
pub use context::RenderContext;
pub use playback::{PlaybackCoordinator, PlaybackState, SwapOutcome};
pub use session::EditorSession;
pub use upload::{AudioDecoder, UploadedAudio, WavDecoder};
