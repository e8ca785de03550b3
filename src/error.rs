//! Error types for heartmula-nodes.

/// Result type alias using [`Error`].
pub type Result<T> = std::result::Result<T, Error>;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The external generation pipeline implementation could not be located.
    #[error("pipeline unavailable: {0}")]
    PipelineUnavailable(String),

    /// A checkpoint name did not resolve in the host path registry.
    #[error("checkpoint '{name}' not found in folder '{folder}'")]
    CheckpointNotFound { folder: String, name: String },

    /// Failure raised by the external pipeline call.
    #[error("pipeline: {0}")]
    Pipeline(String),

    /// WAV I/O or waveform layout error.
    #[error("audio: {0}")]
    Audio(String),

    /// Unknown option label or value outside its declared bounds.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Candle tensor error.
    #[error("candle: {0}")]
    Candle(#[from] candle_core::Error),

    /// I/O error.
    #[error("io: {0}")]
    Io(#[from] std::io::Error),

    /// JSON error.
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<hound::Error> for Error {
    fn from(error: hound::Error) -> Self {
        Error::Audio(error.to_string())
    }
}
