//! Inactivity timing and the timeout/keepalive policy.

use std::time::Duration;

use tokio::time::Instant;

use crate::state::SessionState;

/// Default bound on a wait for a response.
pub const DEFAULT_RESPONSE_TIMEOUT: Duration = Duration::from_secs(5);

/// Time spent in the current state. Reset on every state entry.
#[derive(Debug, Clone, Copy)]
pub struct InactivityTimer {
    entered_at: Instant,
}

impl InactivityTimer {
    /// Start timing from now.
    pub fn start() -> Self {
        InactivityTimer {
            entered_at: Instant::now(),
        }
    }

    /// Restart timing from now.
    pub fn reset(&mut self) {
        self.entered_at = Instant::now();
    }

    /// Time since the last start or reset.
    pub fn elapsed(&self) -> Duration {
        self.entered_at.elapsed()
    }

    /// Whether at least `limit` has passed.
    pub fn has_elapsed(&self, limit: Duration) -> bool {
        self.elapsed() >= limit
    }
}

impl Default for InactivityTimer {
    fn default() -> Self {
        Self::start()
    }
}

/// When waits time out and when keepalive probes go out.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    /// Longest wait in `Receive` or `PingReceive` before moving to `Timeout`.
    /// `None` waits forever.
    pub response_timeout: Option<Duration>,
    /// Idle time with an empty queue before a keepalive probe is sent.
    /// `None` disables keepalive.
    pub ping_interval: Option<Duration>,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        TimeoutPolicy {
            response_timeout: Some(DEFAULT_RESPONSE_TIMEOUT),
            ping_interval: None,
        }
    }
}

impl TimeoutPolicy {
    /// No timeout and no keepalive.
    pub fn disabled() -> Self {
        TimeoutPolicy {
            response_timeout: None,
            ping_interval: None,
        }
    }

    /// Replace the response timeout. `None` waits forever.
    pub fn with_response_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.response_timeout = timeout;
        self
    }

    /// Replace the keepalive interval. `None` disables keepalive.
    pub fn with_ping_interval(mut self, interval: Option<Duration>) -> Self {
        self.ping_interval = interval;
        self
    }

    /// Whether a wait in `state` has run past the response timeout.
    pub fn is_response_overdue(&self, state: SessionState, timer: &InactivityTimer) -> bool {
        match self.response_timeout {
            Some(limit) => state.is_awaiting_response() && timer.has_elapsed(limit),
            None => false,
        }
    }

    /// Whether an idle session with an empty queue should probe the link.
    pub fn is_ping_due(&self, state: SessionState, queue_empty: bool, timer: &InactivityTimer) -> bool {
        match self.ping_interval {
            Some(interval) => state == SessionState::Idle && queue_empty && timer.has_elapsed(interval),
            None => false,
        }
    }
}
