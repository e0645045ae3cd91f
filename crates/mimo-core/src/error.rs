//! Error types for Mimo Core.

use thiserror::Error;

/// Result type alias for Mimo operations.
pub type Result<T> = std::result::Result<T, MimoError>;

/// Errors that can occur while preparing or running a decode.
#[derive(Error, Debug)]
pub enum MimoError {
    /// Number of forced initial tokens does not match the batch size.
    #[error("expected {expected} initial tokens (one per instance), got {got}")]
    InitMismatch {
        /// Batch size of the source tensor.
        expected: usize,
        /// Number of initial tokens supplied.
        got: usize,
    },

    /// Shape mismatch error.
    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),

    /// Invalid decoding or vocabulary configuration.
    #[error("invalid config: {0}")]
    InvalidConfig(String),

    /// No decoder registered under this target name.
    #[error("unknown target: {0}")]
    UnknownTarget(String),

    /// Failure reported by an encoder or decoder.
    #[error("model error: {0}")]
    ModelError(String),

    /// I/O error.
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),

    /// Serialization error.
    #[error("serialization error: {0}")]
    SerdeError(#[from] serde_json::Error),

    /// Candle tensor error.
    #[error("tensor error: {0}")]
    TensorError(#[from] candle_core::Error),
}
