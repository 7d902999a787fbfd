//! Error types for the numduel wire format.

use thiserror::Error;

/// Errors that can occur while encoding or decoding wire data.
#[derive(Debug, Error)]
pub enum WireError {
    /// JSON serialization failed
    #[error("serialization failed: {0}")]
    Serialization(#[source] serde_json::Error),

    /// JSON deserialization failed
    #[error("deserialization failed: {0}")]
    Deserialization(#[source] serde_json::Error),

    /// The `type` tag names a message this build does not know
    #[error("unknown message type: {0}")]
    UnknownMessageType(String),

    /// Invalid protocol version
    #[error("unsupported protocol version: {0}")]
    UnsupportedVersion(u8),

    /// Frame declared a zero-length body
    #[error("empty frame")]
    EmptyFrame,

    /// Frame declared a body larger than the sanity bound
    #[error("frame too large: {len} bytes (limit: {max} bytes)")]
    FrameTooLarge {
        /// Declared body length.
        len: usize,
        /// Maximum accepted body length.
        max: usize,
    },

    /// Invalid data format
    #[error("invalid data: {0}")]
    InvalidData(String),
}
