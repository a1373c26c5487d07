//! Error types for the link protocol.

use thiserror::Error;

/// Errors that can occur when working with the link protocol.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProtocolError {
    /// The command text was empty or whitespace only.
    #[error("command is empty")]
    EmptyCommand,

    /// Command too long to fit on one line.
    #[error("command too long: max {max} bytes, got {actual}")]
    CommandTooLong { max: usize, actual: usize },

    /// The command contains a line terminator, which would split it on the wire.
    #[error("command contains a line terminator: {0:?}")]
    EmbeddedTerminator(String),
}

/// Result type alias for protocol operations.
pub type ProtocolResult<T> = Result<T, ProtocolError>;
