//! Error handling for Audio Studio
//!
//! Upload errors carry a short user-facing message; render errors leave
//! the session untouched so callers can keep using the previous buffer.

use thiserror::Error;

/// Result type alias for Audio Studio operations
pub type Result<T> = std::result::Result<T, StudioError>;

/// Main error type for Audio Studio operations
#[derive(Error, Debug)]
pub enum StudioError {
    // Upload Errors
    #[error("Unsupported audio format: {format}")]
    UnsupportedFormat { format: String },

    #[error("File too large: {size_bytes} bytes (limit {limit_bytes} bytes)")]
    FileTooLarge { size_bytes: u64, limit_bytes: u64 },

    #[error("Failed to decode audio: {reason}")]
    DecodeFailure {
        reason: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    // Processing Errors
    #[error("Already processing audio")]
    AlreadyProcessing,

    #[error("Render failed: {reason}")]
    RenderFailure { reason: String },

    #[error("Malformed sample buffer: {reason}")]
    MalformedBuffer { reason: String },

    #[error("Invalid parameter {param}: {value} (expected {expected})")]
    InvalidParameter {
        param: String,
        value: String,
        expected: String,
    },

    // Session Errors
    #[error("Processing context has been closed")]
    ContextClosed,

    #[error("No audio loaded")]
    NoAudioLoaded,

    // I/O Errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    // Serialization Errors
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl StudioError {
    /// Get the error code for this error type
    pub fn error_code(&self) -> &'static str {
        match self {
            StudioError::UnsupportedFormat { .. } => "UNSUPPORTED_FORMAT",
            StudioError::FileTooLarge { .. } => "FILE_TOO_LARGE",
            StudioError::DecodeFailure { .. } => "DECODE_FAILURE",
            StudioError::AlreadyProcessing => "ALREADY_PROCESSING",
            StudioError::RenderFailure { .. } => "RENDER_FAILURE",
            StudioError::MalformedBuffer { .. } => "MALFORMED_BUFFER",
            StudioError::InvalidParameter { .. } => "INVALID_PARAMETER",
            StudioError::ContextClosed => "CONTEXT_CLOSED",
            StudioError::NoAudioLoaded => "NO_AUDIO_LOADED",
            StudioError::Io(_) => "IO_ERROR",
            StudioError::Serialization(_) => "SERIALIZATION_ERROR",
        }
    }

    /// Check if the session remains usable after this error
    pub fn is_recoverable(&self) -> bool {
        match self {
            StudioError::UnsupportedFormat { .. } => true,
            StudioError::FileTooLarge { .. } => true,
            StudioError::DecodeFailure { .. } => true,
            StudioError::AlreadyProcessing => true,
            StudioError::RenderFailure { .. } => true,
            StudioError::InvalidParameter { .. } => true,
            StudioError::NoAudioLoaded => true,
            _ => false,
        }
    }

    /// Whether this error belongs to the upload boundary
    pub fn is_upload_error(&self) -> bool {
        matches!(
            self,
            StudioError::UnsupportedFormat { .. }
                | StudioError::FileTooLarge { .. }
                | StudioError::DecodeFailure { .. }
        )
    }

    /// Get a short user-facing message for this error
    pub fn friendly_message(&self) -> String {
        match self {
            StudioError::FileTooLarge { limit_bytes, .. } => {
                format!("File size exceeds {}MB limit", limit_bytes / (1024 * 1024))
            }
            StudioError::UnsupportedFormat { .. } => {
                "Unsupported file format. Please upload MP3, WAV, OGG, FLAC, M4A, or AAC"
                    .to_string()
            }
            StudioError::DecodeFailure { .. } => {
                "Failed to process audio file. Please try another file.".to_string()
            }
            StudioError::AlreadyProcessing => {
                "Still applying the previous change. Try again in a moment.".to_string()
            }
            StudioError::RenderFailure { .. } => {
                "Couldn't apply those effects. Your previous version is still available."
                    .to_string()
            }
            _ => self.to_string(),
        }
    }
}
