//! Events published by the session.

use std::time::Duration;

use atlink_protocol::{Delimiter, Intention, PendingCommand};

use crate::state::SessionState;

/// A state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StateChange {
    /// State before the transition.
    pub from: SessionState,
    /// State after the transition.
    pub to: SessionState,
}

/// A full response, as seen by the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionResponse {
    /// The in-flight command's intention, or the framer's when nothing was in flight.
    pub intention: Intention,
    /// Trimmed response text.
    pub response: String,
    /// Delimiter that completed the response.
    pub delimiter: Delimiter,
    /// Wire text of the command this answers, if one was in flight.
    pub command: Option<String>,
}

impl SessionResponse {
    /// Whether the device answered `OK`.
    pub fn is_ok(&self) -> bool {
        self.delimiter.is_ok()
    }
}

/// Reported once each time the session enters [`SessionState::Timeout`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutReport {
    /// The state the session was waiting in.
    pub waiting_in: SessionState,
    /// The command that went unanswered, if any.
    pub command: Option<PendingCommand>,
    /// How long the session waited.
    pub waited: Duration,
}
