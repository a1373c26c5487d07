//! Runner configuration.
//!
//! Values come from three layers: built-in defaults, an optional YAML file,
//! and command-line arguments, each overriding the one before.
//!
//! ```yaml
//! address: 127.0.0.1:9000
//! tick_ms: 100
//! session:
//!   echo: true
//!   response_timeout_ms: 5000
//!   ping_interval_ms: 30000
//! ```

use std::path::Path;
use std::time::Duration;

use atlink_session::SessionConfig;
use serde::{Deserialize, Serialize};

use crate::cli::Args;
use crate::error::{RunnerError, RunnerResult};

/// Default bridge address.
pub const DEFAULT_ADDRESS: &str = "127.0.0.1:9000";

/// Default step interval.
pub const DEFAULT_TICK_MS: u64 = 100;

/// Configuration for the runner.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunnerConfig {
    /// Address of the UART bridge.
    pub address: String,
    /// Step interval in milliseconds.
    pub tick_ms: u64,
    /// Bound on establishing the TCP connection, in milliseconds.
    pub connect_timeout_ms: u64,
    /// Connect as soon as the runner starts.
    pub auto_connect: bool,
    /// Prefix console output with a timestamp.
    pub timestamps: bool,
    /// Default log filter when `RUST_LOG` is unset.
    pub log_filter: String,
    /// Session behaviour.
    pub session: SessionConfig,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        RunnerConfig {
            address: DEFAULT_ADDRESS.to_string(),
            tick_ms: DEFAULT_TICK_MS,
            connect_timeout_ms: 3000,
            auto_connect: true,
            timestamps: false,
            log_filter: "info".to_string(),
            session: SessionConfig::default(),
        }
    }
}

impl RunnerConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> RunnerResult<Self> {
        let text = std::fs::read_to_string(path).map_err(|source| RunnerError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_yaml_str(&text)
    }

    /// Parse a configuration from YAML text.
    pub fn from_yaml_str(text: &str) -> RunnerResult<Self> {
        let config: RunnerConfig = serde_yaml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// Resolve the final configuration from command-line arguments.
    pub fn resolve(args: &Args) -> RunnerResult<Self> {
        let mut config = match &args.config {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        config.apply_args(args);
        config.validate()?;
        Ok(config)
    }

    /// Override file values with command-line arguments.
    pub fn apply_args(&mut self, args: &Args) {
        if let Some(address) = &args.address {
            self.address = address.clone();
        }
        if let Some(tick_ms) = args.tick_ms {
            self.tick_ms = tick_ms;
        }
        if let Some(timeout) = args.response_timeout_ms {
            self.session.response_timeout_ms = Some(timeout);
        }
        if args.no_response_timeout {
            self.session.response_timeout_ms = None;
        }
        if let Some(interval) = args.ping_interval_ms {
            self.session.ping_interval_ms = Some(interval);
        }
        if args.no_echo {
            self.session.echo = false;
        }
        if args.no_auto_connect {
            self.auto_connect = false;
        }
        if args.timestamps {
            self.timestamps = true;
        }
        if let Some(filter) = &args.log {
            self.log_filter = filter.clone();
        }
    }

    /// Reject values the runner cannot work with.
    pub fn validate(&self) -> RunnerResult<()> {
        if self.address.trim().is_empty() {
            return Err(RunnerError::InvalidConfig {
                field: "address",
                reason: "must not be empty".to_string(),
            });
        }
        if self.tick_ms == 0 {
            return Err(RunnerError::InvalidConfig {
                field: "tick_ms",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.session.ping_interval_ms == Some(0) {
            return Err(RunnerError::InvalidConfig {
                field: "session.ping_interval_ms",
                reason: "must be at least 1 (omit to disable)".to_string(),
            });
        }
        Ok(())
    }

    /// Step interval as a `Duration`.
    pub fn tick(&self) -> Duration {
        Duration::from_millis(self.tick_ms)
    }

    /// Connect timeout as a `Duration`.
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_millis(self.connect_timeout_ms)
    }
}
