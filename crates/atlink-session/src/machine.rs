//! The command/response state machine.

use atlink_metrics::{metric_defs, metrics};
use atlink_protocol::{
    FullResponse, Intention, Listeners, PendingCommand, ResponseFramer, PING_COMMAND,
};
use tokio::time::Instant;
use tracing::{debug, info, trace, warn};

use crate::config::SessionConfig;
use crate::error::{SessionError, SessionResult};
use crate::events::{SessionResponse, StateChange, TimeoutReport};
use crate::queue::CommandQueue;
use crate::state::SessionState;
use crate::timer::{InactivityTimer, TimeoutPolicy};
use crate::transport::Transport;

/// The command currently awaiting its response.
#[derive(Debug, Clone)]
struct InFlight {
    command: PendingCommand,
    wire: String,
    sent_at: Instant,
}

/// Drives one command/response exchange at a time over a [`Transport`].
///
/// All mutation goes through `&mut self`, so the response-driven transition
/// in [`ingest`](Self::ingest) and the periodic [`step`](Self::step) can
/// never run at the same time. Each transition is a single assignment
/// followed by synchronous notification of state-change subscribers.
pub struct SessionStateMachine<T: Transport> {
    transport: T,
    echo: bool,
    policy: TimeoutPolicy,

    state: SessionState,
    timer: InactivityTimer,
    queue: CommandQueue,
    framer: ResponseFramer,
    in_flight: Option<InFlight>,
    pending_timeout: Option<TimeoutReport>,

    state_listeners: Listeners<StateChange>,
    line_listeners: Listeners<str>,
    response_listeners: Listeners<SessionResponse>,
    timeout_listeners: Listeners<TimeoutReport>,
    error_listeners: Listeners<SessionError>,
}

impl<T: Transport> SessionStateMachine<T> {
    /// Create a disconnected session over `transport`.
    pub fn new(transport: T, config: SessionConfig) -> Self {
        SessionStateMachine {
            transport,
            echo: config.echo,
            policy: config.timeout_policy(),
            state: SessionState::Disconnected,
            timer: InactivityTimer::start(),
            queue: CommandQueue::new(),
            framer: ResponseFramer::new(),
            in_flight: None,
            pending_timeout: None,
            state_listeners: Listeners::new(),
            line_listeners: Listeners::new(),
            response_listeners: Listeners::new(),
            timeout_listeners: Listeners::new(),
            error_listeners: Listeners::new(),
        }
    }

    /// Replace the timeout policy.
    pub fn with_policy(mut self, policy: TimeoutPolicy) -> Self {
        self.policy = policy;
        self
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// The current state.
    pub fn state(&self) -> SessionState {
        self.state
    }

    /// True unless disconnected, connecting or disconnecting.
    pub fn is_connected(&self) -> bool {
        self.state.is_connected()
    }

    /// Commands waiting to be sent, oldest first.
    pub fn queue(&self) -> &CommandQueue {
        &self.queue
    }

    /// The command awaiting a response, if any.
    pub fn in_flight(&self) -> Option<&PendingCommand> {
        self.in_flight.as_ref().map(|f| &f.command)
    }

    /// The active timeout and keepalive policy.
    pub fn policy(&self) -> &TimeoutPolicy {
        &self.policy
    }

    /// Whether line events fire for incoming data.
    pub fn echo(&self) -> bool {
        self.echo
    }

    /// The underlying link.
    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Mutable access to the underlying link.
    pub fn transport_mut(&mut self) -> &mut T {
        &mut self.transport
    }

    /// The framer, for subscribing to character, line and response events.
    pub fn framer_mut(&mut self) -> &mut ResponseFramer {
        &mut self.framer
    }

    // ========================================================================
    // Subscriptions
    // ========================================================================

    /// Subscribe to every transition, in order.
    pub fn on_state_change<F>(&mut self, callback: F)
    where
        F: FnMut(&StateChange) + Send + 'static,
    {
        self.state_listeners.subscribe(callback);
    }

    /// Lines from incoming data, forwarded from the framer.
    pub fn on_line<F>(&mut self, callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.line_listeners.subscribe(callback);
    }

    /// Completed responses, tagged with the in-flight command's intention.
    pub fn on_response<F>(&mut self, callback: F)
    where
        F: FnMut(&SessionResponse) + Send + 'static,
    {
        self.response_listeners.subscribe(callback);
    }

    /// Timeout reports, delivered once per entry into `Timeout`.
    pub fn on_timeout<F>(&mut self, callback: F)
    where
        F: FnMut(&TimeoutReport) + Send + 'static,
    {
        self.timeout_listeners.subscribe(callback);
    }

    /// Non-fatal failures: open and write failures.
    pub fn on_error<F>(&mut self, callback: F)
    where
        F: FnMut(&SessionError) + Send + 'static,
    {
        self.error_listeners.subscribe(callback);
    }

    // ========================================================================
    // Control
    // ========================================================================

    /// Queue a command. Blank or malformed commands are rejected and never queued.
    ///
    /// No transition happens here; the command is picked up by a later step
    /// in `Idle`.
    pub fn add_command(
        &mut self,
        intention: impl Into<Intention>,
        command: impl Into<String>,
    ) -> SessionResult<()> {
        match PendingCommand::new(intention, command) {
            Ok(command) => {
                trace!("Session: queued [{}] {:?}", command.intention, command.command);
                self.queue.push(command);
                metrics::gauge!(metric_defs::QUEUE_DEPTH.name).set(self.queue.len() as f64);
                Ok(())
            }
            Err(e) => {
                debug!("Session: rejected command: {}", e);
                metrics::counter!(metric_defs::COMMANDS_REJECTED.name).increment(1);
                Err(e.into())
            }
        }
    }

    /// Set the current state and notify subscribers.
    pub fn change_state(&mut self, next: SessionState) {
        let from = self.state;
        let waited = self.timer.elapsed();

        self.state = next;
        self.timer.reset();
        // A report only survives while the machine stays in Timeout.
        self.pending_timeout = None;

        match next {
            SessionState::Timeout => {
                self.pending_timeout = Some(TimeoutReport {
                    waiting_in: from,
                    command: self.in_flight.as_ref().map(|f| f.command.clone()),
                    waited,
                });
            }
            SessionState::Idle | SessionState::Disconnected => {
                self.in_flight = None;
            }
            _ => {}
        }

        debug!("Session: {} -> {}", from, next);
        metrics::counter!(metric_defs::STATE_TRANSITIONS.name, "state" => next.as_str()).increment(1);
        self.state_listeners.notify(&StateChange { from, to: next });
    }

    /// Begin connecting. Returns `false` if the link is already open or opening.
    pub fn connect(&mut self) -> bool {
        if self.state.is_connected() || self.state == SessionState::Connecting {
            debug!("Session: connect ignored in {}", self.state);
            return false;
        }
        self.change_state(SessionState::Connecting);
        true
    }

    /// Begin disconnecting. Returns `false` if already disconnected or closing.
    pub fn disconnect(&mut self) -> bool {
        if matches!(
            self.state,
            SessionState::Disconnected | SessionState::Disconnecting
        ) {
            debug!("Session: disconnect ignored in {}", self.state);
            return false;
        }
        self.change_state(SessionState::Disconnecting);
        true
    }

    // ========================================================================
    // Receive Path
    // ========================================================================

    /// Feed one incoming character.
    ///
    /// Line events are forwarded to this session's line subscribers. A
    /// completed response is published and returns the session to `Idle`.
    /// Returns `true` when the character completed a response.
    pub fn ingest(&mut self, ch: char, intention: &Intention) -> bool {
        let framed = self.framer.push(ch, intention, self.echo);

        if let Some(line) = framed.line {
            self.line_listeners.notify(line.as_str());
        }

        match framed.response {
            Some(full) => {
                self.handle_full_response(full);
                true
            }
            None => false,
        }
    }

    /// Feed a run of incoming characters. Returns the number of responses completed.
    pub fn ingest_str(&mut self, text: &str, intention: &Intention) -> usize {
        text.chars().filter(|&ch| self.ingest(ch, intention)).count()
    }

    fn handle_full_response(&mut self, full: FullResponse) {
        let in_flight = self.in_flight.take();

        if let Some(ref f) = in_flight {
            let latency = f.sent_at.elapsed();
            metrics::histogram!(metric_defs::RESPONSE_LATENCY.name)
                .record(latency.as_secs_f64() * 1000.0);
        }
        metrics::counter!(metric_defs::RESPONSES_RECEIVED.name, "delimiter" => full.delimiter.as_str())
            .increment(1);

        let (intention, command) = match in_flight {
            Some(f) => (f.command.intention, Some(f.wire)),
            None => (full.intention, None),
        };

        debug!(
            "Session: response [{}] ({}) in {}: {:?}",
            intention, full.delimiter, self.state, full.response
        );

        self.response_listeners.notify(&SessionResponse {
            intention,
            response: full.response,
            delimiter: full.delimiter,
            command,
        });

        self.change_state(SessionState::Idle);
    }

    // ========================================================================
    // Step
    // ========================================================================

    /// Perform one state's worth of work.
    ///
    /// Transport calls are awaited to completion before this returns, so the
    /// caller sees either the state before the step or the state after it.
    pub async fn step(&mut self) {
        match self.state {
            SessionState::Connecting => self.step_connecting().await,
            SessionState::Connected => self.change_state(SessionState::Idle),
            SessionState::Idle => {
                if !self.queue.is_empty() {
                    self.change_state(SessionState::Send);
                } else if self.policy.is_ping_due(self.state, true, &self.timer) {
                    self.change_state(SessionState::PingSend);
                }
            }
            SessionState::Send => self.step_send().await,
            SessionState::Receive | SessionState::PingReceive => {
                if self.policy.is_response_overdue(self.state, &self.timer) {
                    self.change_state(SessionState::Timeout);
                }
            }
            SessionState::PingSend => self.step_ping().await,
            SessionState::Timeout => self.step_timeout(),
            SessionState::Disconnecting => self.step_disconnecting().await,
            SessionState::Disconnected => {}
        }
    }

    async fn step_connecting(&mut self) {
        if self.transport.open().await {
            info!("Session: link opened");
            self.change_state(SessionState::Connected);
        } else {
            warn!("Session: failed to open link");
            metrics::counter!(metric_defs::OPEN_FAILURES.name).increment(1);
            self.error_listeners.notify(&SessionError::OpenFailed);
            self.change_state(SessionState::Disconnected);
        }
    }

    async fn step_send(&mut self) {
        let Some(command) = self.queue.pop() else {
            // Entered Send with nothing queued.
            self.change_state(SessionState::Idle);
            return;
        };
        metrics::gauge!(metric_defs::QUEUE_DEPTH.name).set(self.queue.len() as f64);

        let wire = command.wire_text();
        if self.transport.write(&wire).await {
            debug!("Session: sent [{}] {:?}", command.intention, wire);
            metrics::counter!(metric_defs::COMMANDS_SENT.name, "intention" => command.intention.to_string())
                .increment(1);
            self.in_flight = Some(InFlight {
                command,
                wire,
                sent_at: Instant::now(),
            });
            self.change_state(SessionState::Receive);
        } else {
            self.write_failed(wire);
        }
    }

    async fn step_ping(&mut self) {
        if self.transport.write(PING_COMMAND).await {
            trace!("Session: ping sent");
            metrics::counter!(metric_defs::PINGS_SENT.name).increment(1);
            self.in_flight = Some(InFlight {
                command: PendingCommand {
                    intention: Intention::ping(),
                    command: PING_COMMAND.to_string(),
                },
                wire: PING_COMMAND.to_string(),
                sent_at: Instant::now(),
            });
            self.change_state(SessionState::PingReceive);
        } else {
            self.write_failed(PING_COMMAND.to_string());
        }
    }

    fn write_failed(&mut self, wire: String) {
        warn!("Session: write failed for {:?}", wire);
        metrics::counter!(metric_defs::WRITE_FAILURES.name).increment(1);
        self.error_listeners
            .notify(&SessionError::WriteFailed { command: wire });
        self.change_state(SessionState::Idle);
    }

    fn step_timeout(&mut self) {
        // Reported once per entry; the session stays here until a late
        // response arrives or the caller moves it on.
        if let Some(report) = self.pending_timeout.take() {
            warn!(
                "Session: timeout after {:.1}s in {} (command: {:?})",
                report.waited.as_secs_f64(),
                report.waiting_in,
                report.command.as_ref().map(|c| c.command.as_str())
            );
            metrics::counter!(metric_defs::TIMEOUTS.name).increment(1);
            self.timeout_listeners.notify(&report);
        }
    }

    async fn step_disconnecting(&mut self) {
        self.transport.close().await;
        self.framer.reset();
        let dropped = self.queue.clear();
        if dropped > 0 {
            debug!("Session: dropped {} queued commands on disconnect", dropped);
        }
        metrics::gauge!(metric_defs::QUEUE_DEPTH.name).set(0.0);
        info!("Session: link closed");
        self.change_state(SessionState::Disconnected);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::MockTransport;
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    fn machine() -> (SessionStateMachine<MockTransport>, MockTransport) {
        let transport = MockTransport::new();
        let machine = SessionStateMachine::new(transport.clone(), SessionConfig::default());
        (machine, transport)
    }

    #[tokio::test]
    async fn test_initial_state() {
        let (machine, _) = machine();
        assert_eq!(machine.state(), SessionState::Disconnected);
        assert!(!machine.is_connected());
        assert!(machine.queue().is_empty());
    }

    #[tokio::test]
    async fn test_add_command_does_not_transition() {
        let (mut machine, _) = machine();
        machine.add_command(Intention::command(), "ati").unwrap();
        assert_eq!(machine.state(), SessionState::Disconnected);
        assert_eq!(machine.queue().len(), 1);
    }

    #[tokio::test]
    async fn test_blank_command_rejected() {
        let (mut machine, _) = machine();
        assert_eq!(
            machine.add_command(Intention::command(), "   "),
            Err(SessionError::EmptyCommand)
        );
        assert!(machine.queue().is_empty());
    }

    #[tokio::test]
    async fn test_state_change_notifies_in_order() {
        let (mut machine, _) = machine();
        let seen = Arc::new(Mutex::new(Vec::new()));
        let s = seen.clone();
        machine.on_state_change(move |c| s.lock().unwrap().push((c.from, c.to)));

        machine.change_state(SessionState::Connecting);
        machine.step().await;
        machine.step().await;

        assert_eq!(
            *seen.lock().unwrap(),
            vec![
                (SessionState::Disconnected, SessionState::Connecting),
                (SessionState::Connecting, SessionState::Connected),
                (SessionState::Connected, SessionState::Idle),
            ]
        );
    }

    #[tokio::test]
    async fn test_connect_ignored_when_connected() {
        let (mut machine, _) = machine();
        assert!(machine.connect());
        assert!(!machine.connect());
        machine.step().await;
        assert!(!machine.connect());
        assert!(machine.disconnect());
        assert!(!machine.disconnect());
    }

    #[tokio::test]
    async fn test_response_uses_in_flight_intention() {
        let (mut machine, _) = machine();
        let responses = Arc::new(Mutex::new(Vec::new()));
        let r = responses.clone();
        machine.on_response(move |resp| r.lock().unwrap().push(resp.clone()));

        machine.connect();
        machine.step().await; // Connected
        machine.step().await; // Idle
        machine.add_command("QUERY", "ati").unwrap();
        machine.step().await; // Send
        machine.step().await; // Receive
        assert_eq!(machine.in_flight().map(|c| c.command.as_str()), Some("ati"));

        machine.ingest_str("ATI\rModem\rOK ", &Intention::data());

        let responses = responses.lock().unwrap();
        assert_eq!(responses.len(), 1);
        assert_eq!(responses[0].intention.as_str(), "QUERY");
        assert_eq!(responses[0].command.as_deref(), Some("ATI"));
        assert_eq!(responses[0].response, "ATI\rModem\rOK");
        assert!(responses[0].is_ok());
        assert_eq!(machine.state(), SessionState::Idle);
        assert!(machine.in_flight().is_none());
    }

    #[tokio::test]
    async fn test_unsolicited_response_keeps_data_intention() {
        let (mut machine, _) = machine();
        let responses = Arc::new(Mutex::new(Vec::new()));
        let r = responses.clone();
        machine.on_response(move |resp| r.lock().unwrap().push(resp.intention.clone()));

        machine.connect();
        machine.step().await;
        machine.step().await;
        machine.ingest_str("RING\rERROR", &Intention::data());

        assert_eq!(*responses.lock().unwrap(), vec![Intention::data()]);
    }

    #[tokio::test]
    async fn test_line_events_forwarded() {
        let (mut machine, _) = machine();
        let lines = Arc::new(Mutex::new(Vec::new()));
        let l = lines.clone();
        machine.on_line(move |line| l.lock().unwrap().push(line.to_string()));

        machine.ingest_str("+CSQ: 20,0\r\nOK ", &Intention::data());
        assert_eq!(*lines.lock().unwrap(), vec!["+CSQ: 20,0", "OK"]);
    }

    #[tokio::test]
    async fn test_echo_off_suppresses_lines() {
        let transport = MockTransport::new();
        let config = SessionConfig {
            echo: false,
            ..SessionConfig::default()
        };
        let mut machine = SessionStateMachine::new(transport, config);
        let lines = Arc::new(Mutex::new(0usize));
        let l = lines.clone();
        machine.on_line(move |_| *l.lock().unwrap() += 1);

        assert_eq!(machine.ingest_str("ATI\rOK ", &Intention::data()), 1);
        assert_eq!(*lines.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_write_failure_returns_to_idle() {
        let (mut machine, transport) = machine();
        let errors = Arc::new(Mutex::new(Vec::new()));
        let e = errors.clone();
        machine.on_error(move |err| e.lock().unwrap().push(err.clone()));

        machine.connect();
        machine.step().await;
        machine.step().await;
        transport.fail_writes(true);
        machine.add_command(Intention::command(), "atz").unwrap();
        machine.step().await; // Send
        machine.step().await; // write fails

        assert_eq!(machine.state(), SessionState::Idle);
        assert!(machine.queue().is_empty());
        assert_eq!(
            *errors.lock().unwrap(),
            vec![SessionError::WriteFailed {
                command: "ATZ".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_send_with_empty_queue_goes_idle() {
        let (mut machine, transport) = machine();
        machine.change_state(SessionState::Send);
        machine.step().await;
        assert_eq!(machine.state(), SessionState::Idle);
        assert!(transport.writes().is_empty());
    }

    #[tokio::test]
    async fn test_disconnect_clears_queue_and_framer() {
        let (mut machine, transport) = machine();
        machine.connect();
        machine.step().await;
        machine.step().await;
        machine.add_command(Intention::command(), "ati").unwrap();
        machine.add_command(Intention::command(), "atz").unwrap();
        machine.ingest_str("partial", &Intention::data());

        machine.disconnect();
        machine.step().await;

        assert_eq!(machine.state(), SessionState::Disconnected);
        assert!(machine.queue().is_empty());
        assert!(machine.framer_mut().is_empty());
        assert_eq!(transport.close_calls(), 1);
        assert!(!transport.is_open());
    }

    #[tokio::test(start_paused = true)]
    async fn test_late_response_discards_timeout_report() {
        let transport = MockTransport::new();
        let mut machine = SessionStateMachine::new(transport, SessionConfig::default())
            .with_policy(TimeoutPolicy::disabled().with_response_timeout(Some(Duration::from_secs(1))));
        let reports = Arc::new(Mutex::new(0usize));
        let r = reports.clone();
        machine.on_timeout(move |_| *r.lock().unwrap() += 1);

        machine.connect();
        machine.step().await;
        machine.step().await;
        machine.add_command(Intention::command(), "ati").unwrap();
        machine.step().await;
        machine.step().await;

        tokio::time::advance(Duration::from_secs(1)).await;
        machine.step().await;
        assert_eq!(machine.state(), SessionState::Timeout);
        assert!(machine.pending_timeout.is_some());

        // The response lands before the report is delivered.
        machine.ingest_str("ATI\rOK ", &Intention::data());
        assert_eq!(machine.state(), SessionState::Idle);
        assert!(machine.pending_timeout.is_none());

        machine.step().await;
        assert_eq!(*reports.lock().unwrap(), 0);
    }

    #[tokio::test]
    async fn test_disconnected_step_is_noop() {
        let (mut machine, transport) = machine();
        machine.step().await;
        assert_eq!(machine.state(), SessionState::Disconnected);
        assert_eq!(transport.open_calls(), 0);
    }
}
