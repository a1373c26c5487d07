//! Console runner for AT-style devices.
//!
//! Wires a [`SessionStateMachine`](atlink_session::SessionStateMachine) to a
//! [`TcpTransport`], renders its events on a [`Console`] and feeds it from
//! standard input, all under a single [`Driver`] task.

pub mod cli;
pub mod config;
pub mod console;
pub mod driver;
pub mod error;
pub mod logging;
pub mod tcp_transport;

pub use cli::Args;
pub use config::RunnerConfig;
pub use console::{Console, ConsoleInput, MessageKind};
pub use driver::Driver;
pub use error::{RunnerError, RunnerResult};
pub use logging::init_logging;
pub use tcp_transport::{LinkEvent, TcpTransport};
