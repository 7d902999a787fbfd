//! Error types for numduel-peer.

use numduel_core::ActionError;
use numduel_types::WireError;

/// Main error type for peer operations.
#[derive(Debug, thiserror::Error)]
pub enum PeerError {
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// An outbound envelope could not be encoded.
    #[error("wire error: {0}")]
    Wire(#[from] WireError),

    /// The TCP connect did not complete in time.
    #[error("timed out connecting to {addr}")]
    ConnectTimeout {
        /// The address being dialled.
        addr: String,
    },

    /// The session refused a local action.
    #[error("{0}")]
    Action(#[from] ActionError),

    /// The session task has already stopped.
    #[error("the session has stopped")]
    Stopped,
}

/// Result type alias for peer operations.
pub type Result<T> = std::result::Result<T, PeerError>;
