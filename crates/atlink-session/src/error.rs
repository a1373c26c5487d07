//! Session error types.

use atlink_protocol::ProtocolError;
use thiserror::Error;

/// Errors reported by the session.
///
/// None of these are fatal. Enqueue errors are returned to the caller; the
/// rest are delivered to error subscribers while the machine keeps running.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionError {
    /// Blank command text.
    #[error("please enter a command before sending")]
    EmptyCommand,

    /// Command text failed validation.
    #[error("invalid command: {0}")]
    InvalidCommand(ProtocolError),

    /// The transport could not open the link.
    #[error("failed to open the link")]
    OpenFailed,

    /// The transport reported a failed write.
    #[error("failed to send {command:?}")]
    WriteFailed { command: String },
}

impl From<ProtocolError> for SessionError {
    fn from(err: ProtocolError) -> Self {
        match err {
            ProtocolError::EmptyCommand => SessionError::EmptyCommand,
            other => SessionError::InvalidCommand(other),
        }
    }
}

/// Result type alias for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
