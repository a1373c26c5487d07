//! Console presentation.
//!
//! Renders session events as text and turns typed lines into
//! [`ConsoleInput`]. Lines starting with `:` are console commands; anything
//! else is queued for the device.

use std::io::Write;
use std::sync::{Arc, Mutex, PoisonError};

use atlink_session::{SessionState, SessionStateMachine, Transport};
use tracing::debug;

/// Help text for `:help`.
pub const HELP: &str = "\
:connect      open the link
:disconnect   close the link
:status       show session state
:clear        clear the screen
:quit         exit
anything else is sent to the device";

/// One line of user input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConsoleInput {
    /// Text to queue for the device.
    Command(String),
    Connect,
    Disconnect,
    Status,
    Clear,
    Help,
    Quit,
    /// A `:` command that is not recognized.
    Unknown(String),
}

impl ConsoleInput {
    /// Parse a line typed by the user.
    pub fn parse(line: &str) -> Self {
        let trimmed = line.trim();
        let Some(meta) = trimmed.strip_prefix(':') else {
            return ConsoleInput::Command(line.to_string());
        };
        match meta.trim().to_ascii_lowercase().as_str() {
            "connect" => ConsoleInput::Connect,
            "disconnect" => ConsoleInput::Disconnect,
            "status" => ConsoleInput::Status,
            "clear" => ConsoleInput::Clear,
            "help" | "?" => ConsoleInput::Help,
            "quit" | "exit" | "q" => ConsoleInput::Quit,
            other => ConsoleInput::Unknown(other.to_string()),
        }
    }
}

/// How a console line is marked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MessageKind {
    /// Text from the device.
    Data,
    /// A command the user queued.
    Sent,
    /// Session progress.
    Info,
    /// Something went wrong.
    Error,
}

impl MessageKind {
    fn marker(&self) -> &'static str {
        match self {
            MessageKind::Data => "",
            MessageKind::Sent => "> ",
            MessageKind::Info => "-- ",
            MessageKind::Error => "!! ",
        }
    }
}

type SharedWriter = Arc<Mutex<Box<dyn Write + Send>>>;

/// Text output shared by every event subscriber.
#[derive(Clone)]
pub struct Console {
    out: SharedWriter,
    timestamps: bool,
}

impl Console {
    /// A console writing to standard output.
    pub fn stdout(timestamps: bool) -> Self {
        Self::with_writer(std::io::stdout(), timestamps)
    }

    /// A console writing to any sink, e.g. a buffer in tests.
    pub fn with_writer(writer: impl Write + Send + 'static, timestamps: bool) -> Self {
        Console {
            out: Arc::new(Mutex::new(Box::new(writer))),
            timestamps,
        }
    }

    /// Print one line.
    pub fn print(&self, kind: MessageKind, text: &str) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let result = if self.timestamps {
            let now = chrono::Local::now().format("%H:%M:%S%.3f");
            writeln!(out, "[{}] {}{}", now, kind.marker(), text)
        } else {
            writeln!(out, "{}{}", kind.marker(), text)
        };
        if let Err(e) = result.and_then(|_| out.flush()) {
            debug!("Console: write failed: {}", e);
        }
    }

    /// Clear the terminal.
    pub fn clear(&self) {
        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        let _ = write!(out, "\x1b[2J\x1b[H").and_then(|_| out.flush());
    }

    /// Subscribe to a session's events and render them.
    pub fn attach<T: Transport>(&self, machine: &mut SessionStateMachine<T>) {
        let console = self.clone();
        machine.on_line(move |line| console.print(MessageKind::Data, line));

        let console = self.clone();
        machine.on_state_change(move |change| {
            let message = match change.to {
                SessionState::Connecting => Some("Attempting to connect..."),
                SessionState::Connected => Some("Connected"),
                SessionState::Disconnecting => Some("Disconnecting..."),
                SessionState::Disconnected if change.from != SessionState::Connecting => {
                    Some("Disconnected")
                }
                _ => None,
            };
            if let Some(message) = message {
                console.print(MessageKind::Info, message);
            }
        });

        machine.on_response(|response| {
            debug!("Full Response [{}]: {:?}", response.intention, response.response);
        });

        let console = self.clone();
        machine.on_timeout(move |report| {
            let message = match &report.command {
                Some(command) => format!(
                    "Timeout: no response to {} after {:.1}s",
                    command.wire_text(),
                    report.waited.as_secs_f64()
                ),
                None => format!("Timeout after {:.1}s", report.waited.as_secs_f64()),
            };
            console.print(MessageKind::Error, &message);
        });

        let console = self.clone();
        machine.on_error(move |err| {
            let message = match err {
                atlink_session::SessionError::OpenFailed => "Connection failed".to_string(),
                other => other.to_string(),
            };
            console.print(MessageKind::Error, &message);
        });
    }
}
