//! Commands queued for transmission and the tags that follow them.

use std::fmt;

use crate::error::{ProtocolError, ProtocolResult};

/// Maximum command length in bytes, excluding the `\r` terminator.
pub const MAX_COMMAND_LENGTH: usize = 256;

/// The stream-cancellation command. It is the only command sent as typed.
pub const CANCEL_COMMAND: &str = "c";

/// Keepalive probe sent while the link is idle.
pub const PING_COMMAND: &str = "AT";

/// A caller-supplied tag that travels with a command (or with incoming data)
/// and comes back attached to the matching response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Intention(String);

impl Intention {
    /// Tag used by transports for unsolicited incoming data.
    pub const DATA: &'static str = "DATA";
    /// Tag used for commands typed by a user.
    pub const COMMAND: &'static str = "COMMAND";
    /// Tag used for keepalive probes.
    pub const PING: &'static str = "PING";

    /// An arbitrary caller-defined tag.
    pub fn new(tag: impl Into<String>) -> Self {
        Intention(tag.into())
    }

    /// Incoming data from the link.
    pub fn data() -> Self {
        Intention::new(Self::DATA)
    }

    /// A user-entered command.
    pub fn command() -> Self {
        Intention::new(Self::COMMAND)
    }

    /// A keepalive probe.
    pub fn ping() -> Self {
        Intention::new(Self::PING)
    }

    /// The tag text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Intention {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Intention {
    fn from(tag: &str) -> Self {
        Intention::new(tag)
    }
}

impl From<String> for Intention {
    fn from(tag: String) -> Self {
        Intention(tag)
    }
}

/// A command waiting in the outgoing queue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingCommand {
    /// Tag returned with the response to this command.
    pub intention: Intention,
    /// Command text as entered, before normalization.
    pub command: String,
}

impl PendingCommand {
    /// Create a pending command after validating its text.
    pub fn new(intention: impl Into<Intention>, command: impl Into<String>) -> ProtocolResult<Self> {
        let command = command.into();
        validate_command(&command)?;
        Ok(PendingCommand {
            intention: intention.into(),
            command,
        })
    }

    /// The text that goes on the wire for this command (without terminator).
    pub fn wire_text(&self) -> String {
        normalize_command(&self.command)
    }
}

/// Check that a command can be queued.
///
/// Blank commands are rejected, as are commands that would not fit on one
/// line or that contain a line terminator of their own.
pub fn validate_command(command: &str) -> ProtocolResult<()> {
    let trimmed = command.trim();
    if trimmed.is_empty() {
        return Err(ProtocolError::EmptyCommand);
    }
    if trimmed.len() > MAX_COMMAND_LENGTH {
        return Err(ProtocolError::CommandTooLong {
            max: MAX_COMMAND_LENGTH,
            actual: trimmed.len(),
        });
    }
    if trimmed.contains(['\r', '\n']) {
        return Err(ProtocolError::EmbeddedTerminator(trimmed.to_string()));
    }
    Ok(())
}

/// Normalize a command for transmission.
///
/// The text is trimmed and upper-cased, except for the exact cancellation
/// command `"c"`, which the device treats differently from `"C"`.
pub fn normalize_command(command: &str) -> String {
    let trimmed = command.trim();
    if trimmed == CANCEL_COMMAND {
        trimmed.to_string()
    } else {
        trimmed.to_uppercase()
    }
}
