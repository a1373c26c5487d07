//! Session states.

use std::fmt;

/// The state of a session. Exactly one is current at any time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    /// Link closed. The rest state.
    Disconnected,
    /// Opening the link.
    Connecting,
    /// Link opened; moves to `Idle` on the next step.
    Connected,
    /// Waiting for a queued command.
    Idle,
    /// Writing the head of the queue.
    Send,
    /// Waiting for the response to the command in flight.
    Receive,
    /// Writing a keepalive probe.
    PingSend,
    /// Waiting for the keepalive response.
    PingReceive,
    /// A wait ran past the response timeout.
    Timeout,
    /// Closing the link.
    Disconnecting,
}

impl SessionState {
    /// All states, in declaration order.
    pub const ALL: [SessionState; 10] = [
        SessionState::Disconnected,
        SessionState::Connecting,
        SessionState::Connected,
        SessionState::Idle,
        SessionState::Send,
        SessionState::Receive,
        SessionState::PingSend,
        SessionState::PingReceive,
        SessionState::Timeout,
        SessionState::Disconnecting,
    ];

    /// Upper-case state name, used in logs and metric labels.
    pub const fn as_str(&self) -> &'static str {
        match self {
            SessionState::Disconnected => "DISCONNECTED",
            SessionState::Connecting => "CONNECTING",
            SessionState::Connected => "CONNECTED",
            SessionState::Idle => "IDLE",
            SessionState::Send => "SEND",
            SessionState::Receive => "RECEIVE",
            SessionState::PingSend => "PING_SEND",
            SessionState::PingReceive => "PING_RECEIVE",
            SessionState::Timeout => "TIMEOUT",
            SessionState::Disconnecting => "DISCONNECTING",
        }
    }

    /// Whether the link is open in this state.
    ///
    /// `Timeout` and the ping states count as connected.
    pub fn is_connected(&self) -> bool {
        !matches!(
            self,
            SessionState::Disconnected | SessionState::Connecting | SessionState::Disconnecting
        )
    }

    /// Whether the machine is waiting on the device in this state.
    pub fn is_awaiting_response(&self) -> bool {
        matches!(self, SessionState::Receive | SessionState::PingReceive)
    }
}

impl Default for SessionState {
    fn default() -> Self {
        SessionState::Disconnected
    }
}

impl fmt::Display for SessionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
