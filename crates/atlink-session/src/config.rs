//! Session configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::timer::{TimeoutPolicy, DEFAULT_RESPONSE_TIMEOUT};

/// Configuration for a [`SessionStateMachine`](crate::SessionStateMachine).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Whether character and line events fire for incoming data.
    pub echo: bool,
    /// Response timeout in milliseconds. `None` waits forever.
    pub response_timeout_ms: Option<u64>,
    /// Keepalive interval in milliseconds. `None` disables keepalive.
    pub ping_interval_ms: Option<u64>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            echo: true,
            response_timeout_ms: Some(DEFAULT_RESPONSE_TIMEOUT.as_millis() as u64),
            ping_interval_ms: None,
        }
    }
}

impl SessionConfig {
    /// The timeout policy described by this configuration.
    pub fn timeout_policy(&self) -> TimeoutPolicy {
        TimeoutPolicy {
            response_timeout: self.response_timeout_ms.map(Duration::from_millis),
            ping_interval: self.ping_interval_ms.map(Duration::from_millis),
        }
    }
}
