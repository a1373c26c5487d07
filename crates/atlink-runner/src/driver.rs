//! The session driver.
//!
//! One task owns the [`SessionStateMachine`] and serializes everything that
//! touches it: characters from the link, lines from the console, the
//! shutdown signal, and the periodic step. A response arriving and a step
//! firing can therefore never interleave.

use std::time::Duration;

use atlink_protocol::{normalize_command, Intention};
use atlink_session::{SessionError, SessionState, SessionStateMachine, Transport};
use tokio::sync::{mpsc, watch};
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, trace, warn};

use crate::console::{Console, ConsoleInput, MessageKind, HELP};
use crate::tcp_transport::LinkEvent;

/// Whether the run loop keeps going after handling an input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flow {
    Continue,
    Quit,
}

/// Owns a session and runs it until told to stop.
pub struct Driver<T: Transport> {
    machine: SessionStateMachine<T>,
    console: Console,
    link_events: mpsc::Receiver<LinkEvent>,
    input: mpsc::Receiver<ConsoleInput>,
    shutdown: watch::Receiver<bool>,
    tick: Duration,

    link_gone: bool,
    input_closed: bool,
    shutdown_gone: bool,
}

impl<T: Transport> Driver<T> {
    /// Assemble a driver. Nothing runs until [`run`](Self::run).
    pub fn new(
        machine: SessionStateMachine<T>,
        console: Console,
        link_events: mpsc::Receiver<LinkEvent>,
        input: mpsc::Receiver<ConsoleInput>,
        shutdown: watch::Receiver<bool>,
        tick: Duration,
    ) -> Self {
        Driver {
            machine,
            console,
            link_events,
            input,
            shutdown,
            tick,
            link_gone: false,
            input_closed: false,
            shutdown_gone: false,
        }
    }

    /// The session being driven.
    pub fn machine(&self) -> &SessionStateMachine<T> {
        &self.machine
    }

    /// Mutable access to the session, e.g. to subscribe before running.
    pub fn machine_mut(&mut self) -> &mut SessionStateMachine<T> {
        &mut self.machine
    }

    /// Run until `:quit`, the shutdown signal, or the input closing with
    /// nothing left to send. The link is closed before returning.
    pub async fn run(mut self) -> SessionStateMachine<T> {
        let mut ticker = tokio::time::interval(self.tick);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                biased;

                event = self.link_events.recv(), if !self.link_gone => match event {
                    Some(event) => self.handle_link_event(event),
                    None => {
                        debug!("Driver: link event channel closed");
                        self.link_gone = true;
                    }
                },

                line = self.input.recv(), if !self.input_closed => match line {
                    Some(input) => {
                        if self.handle_input(input) == Flow::Quit {
                            break;
                        }
                    }
                    None => {
                        info!("Driver: input closed, finishing queued commands");
                        self.input_closed = true;
                        if self.is_drained() {
                            break;
                        }
                    }
                },

                changed = self.shutdown.changed(), if !self.shutdown_gone => match changed {
                    Ok(()) => {
                        if *self.shutdown.borrow() {
                            info!("Driver: shutdown requested");
                            break;
                        }
                    }
                    Err(_) => self.shutdown_gone = true,
                },

                _ = ticker.tick() => {
                    self.machine.step().await;
                    if self.input_closed && self.is_drained() {
                        debug!("Driver: queue drained");
                        break;
                    }
                }
            }
        }

        self.finish().await;
        self.machine
    }

    fn handle_link_event(&mut self, event: LinkEvent) {
        match event {
            LinkEvent::Char(ch) => {
                if !self.machine.is_connected() {
                    trace!("Driver: dropping {:?} in {}", ch, self.machine.state());
                    return;
                }
                self.machine.ingest(ch, &Intention::data());
            }
            LinkEvent::Closed => {
                if self.machine.is_connected() {
                    warn!("Driver: link closed by the device");
                    self.console
                        .print(MessageKind::Error, "Connection closed by device");
                    self.machine.disconnect();
                }
            }
        }
    }

    fn handle_input(&mut self, input: ConsoleInput) -> Flow {
        match input {
            ConsoleInput::Command(text) => {
                match self.machine.add_command(Intention::command(), text.as_str()) {
                    Ok(()) => self
                        .console
                        .print(MessageKind::Sent, &normalize_command(&text)),
                    Err(SessionError::EmptyCommand) => self.console.print(
                        MessageKind::Error,
                        "Please enter a command before sending.",
                    ),
                    Err(e) => self.console.print(MessageKind::Error, &e.to_string()),
                }
            }
            ConsoleInput::Connect => {
                if !self.machine.connect() {
                    self.console.print(MessageKind::Info, "Already connected");
                }
            }
            ConsoleInput::Disconnect => {
                if !self.machine.disconnect() {
                    self.console.print(MessageKind::Info, "Not connected");
                }
            }
            ConsoleInput::Status => {
                let status = self.status_line();
                self.console.print(MessageKind::Info, &status);
            }
            ConsoleInput::Clear => self.console.clear(),
            ConsoleInput::Help => {
                for line in HELP.lines() {
                    self.console.print(MessageKind::Info, line);
                }
            }
            ConsoleInput::Quit => return Flow::Quit,
            ConsoleInput::Unknown(name) => self.console.print(
                MessageKind::Error,
                &format!("Unknown command :{} (try :help)", name),
            ),
        }
        Flow::Continue
    }

    fn status_line(&self) -> String {
        let mut status = format!(
            "State: {}, queued: {}",
            self.machine.state(),
            self.machine.queue().len()
        );
        if let Some(command) = self.machine.in_flight() {
            status.push_str(&format!(", waiting on {}", command.wire_text()));
        }
        status
    }

    /// Nothing left to send and nothing awaited.
    fn is_drained(&self) -> bool {
        match self.machine.state() {
            SessionState::Disconnected => true,
            SessionState::Idle | SessionState::Timeout => self.machine.queue().is_empty(),
            _ => false,
        }
    }

    async fn finish(&mut self) {
        if self.machine.disconnect() {
            self.machine.step().await;
        }
    }
}
