//! Integration tests for the TCP link and the driver over a real socket.
//!
//! A small fake modem listens on loopback, echoes each `\r`-terminated
//! command and answers it the way an AT device would.

use std::io::Write;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use atlink_protocol::Intention;
use atlink_runner::{Console, ConsoleInput, Driver, LinkEvent, TcpTransport};
use atlink_session::{SessionConfig, SessionState, SessionStateMachine, Transport};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::timeout;

const WAIT: Duration = Duration::from_secs(5);

/// Reply for one command, after the echo.
fn reply_for(command: &str) -> &'static str {
    match command {
        "ATI" => "Modem v1\r\nOK ",
        "AT+BAD" => "ERROR",
        "AT+WIPE" => "Access Denied",
        _ => "OK ",
    }
}

/// Accept one connection and answer commands until the peer closes.
/// Returns every byte received.
async fn spawn_fake_modem() -> (String, JoinHandle<Vec<u8>>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();

    let handle = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        let mut received = Vec::new();
        let mut line = Vec::new();
        let mut buf = [0u8; 256];
        loop {
            let n = match socket.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => n,
            };
            received.extend_from_slice(&buf[..n]);
            for &byte in &buf[..n] {
                if byte != b'\r' {
                    line.push(byte);
                    continue;
                }
                let command = String::from_utf8_lossy(&line).to_string();
                line.clear();
                let answer = format!("{}\r\n{}", command, reply_for(&command));
                if socket.write_all(answer.as_bytes()).await.is_err() {
                    return received;
                }
            }
        }
        received
    });

    (address, handle)
}

/// Console output tests can read back.
#[derive(Clone, Default)]
struct SharedBuf(Arc<Mutex<Vec<u8>>>);

impl SharedBuf {
    fn text(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).to_string()
    }
}

impl Write for SharedBuf {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

async fn collect_until(events: &mut mpsc::Receiver<LinkEvent>, suffix: &str) -> String {
    let mut text = String::new();
    while !text.ends_with(suffix) {
        match timeout(WAIT, events.recv()).await {
            Ok(Some(LinkEvent::Char(ch))) => text.push(ch),
            other => panic!("unexpected link event {:?} after {:?}", other, text),
        }
    }
    text
}

// ============================================================================
// Transport Tests
// ============================================================================

#[tokio::test]
async fn test_transport_round_trip() {
    let (address, modem) = spawn_fake_modem().await;
    let (tx, mut rx) = mpsc::channel(256);
    let mut transport = TcpTransport::new(address, tx);

    assert!(transport.open().await);
    assert!(transport.is_open());
    assert!(transport.write("ATI").await);

    let text = collect_until(&mut rx, "OK ").await;
    assert_eq!(text, "ATI\r\nModem v1\r\nOK ");

    transport.close().await;
    assert!(!transport.is_open());
    assert!(!transport.write("AT").await);

    let received = timeout(WAIT, modem).await.unwrap().unwrap();
    assert_eq!(received, b"ATI\r");
}

#[tokio::test]
async fn test_peer_close_reported() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let device = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(b"BYE\r\n").await.unwrap();
        // Dropping the socket closes the connection.
    });

    let (tx, mut rx) = mpsc::channel(64);
    let mut transport = TcpTransport::new(address, tx);
    assert!(transport.open().await);
    device.await.unwrap();

    let mut chars = String::new();
    loop {
        match timeout(WAIT, rx.recv()).await.unwrap() {
            Some(LinkEvent::Char(ch)) => chars.push(ch),
            Some(LinkEvent::Closed) => break,
            None => panic!("link channel closed without a Closed event"),
        }
    }
    assert_eq!(chars, "BYE\r\n");
    transport.close().await;
}

#[tokio::test]
async fn test_close_while_event_channel_full() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let device = tokio::spawn(async move {
        let (mut socket, _) = listener.accept().await.unwrap();
        socket.write_all(&[b'X'; 64]).await.unwrap();
        // Hold the connection open until the host closes it.
        let mut buf = [0u8; 16];
        while let Ok(n) = socket.read(&mut buf).await {
            if n == 0 {
                break;
            }
        }
    });

    // Receiver kept alive but never drained.
    let (tx, _rx) = mpsc::channel(4);
    let mut transport = TcpTransport::new(address, tx);
    assert!(transport.open().await);

    // Let the reader fill the channel and block on the next send.
    tokio::time::sleep(Duration::from_millis(100)).await;

    timeout(Duration::from_secs(3), transport.close())
        .await
        .expect("close should not wait on a full event channel");
    assert!(!transport.is_open());

    timeout(WAIT, device).await.unwrap().unwrap();
}

// ============================================================================
// Driver Tests
// ============================================================================

#[tokio::test]
async fn test_driver_runs_queued_commands_and_drains() {
    let (address, modem) = spawn_fake_modem().await;
    let (link_tx, link_rx) = mpsc::channel(1024);
    let (input_tx, input_rx) = mpsc::channel(16);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let output = SharedBuf::default();
    let console = Console::with_writer(output.clone(), false);
    let transport = TcpTransport::new(address, link_tx);
    let mut machine = SessionStateMachine::new(transport, SessionConfig::default());
    console.attach(&mut machine);

    let responses = Arc::new(Mutex::new(Vec::new()));
    let r = responses.clone();
    machine.on_response(move |resp| {
        r.lock()
            .unwrap()
            .push((resp.command.clone(), resp.delimiter.as_str(), resp.intention.clone()))
    });

    for line in [":connect", "ati", "at+bad", "at+wipe"] {
        input_tx.send(ConsoleInput::parse(line)).await.unwrap();
    }
    drop(input_tx);

    let driver = Driver::new(
        machine,
        console,
        link_rx,
        input_rx,
        shutdown_rx,
        Duration::from_millis(5),
    );
    let machine = timeout(WAIT, driver.run()).await.expect("driver should drain and stop");

    assert_eq!(machine.state(), SessionState::Disconnected);
    assert_eq!(
        *responses.lock().unwrap(),
        vec![
            (Some("ATI".to_string()), "ok", Intention::command()),
            (Some("AT+BAD".to_string()), "error", Intention::command()),
            (Some("AT+WIPE".to_string()), "access_denied", Intention::command()),
        ]
    );

    let text = output.text();
    assert!(text.contains("-- Attempting to connect...\n"));
    assert!(text.contains("-- Connected\n"));
    assert!(text.contains("> ATI\n> AT+BAD\n> AT+WIPE\n"));
    assert!(text.contains("Modem v1\n"));
    assert!(text.contains("-- Disconnecting...\n"));

    let received = timeout(WAIT, modem).await.unwrap().unwrap();
    assert_eq!(received, b"ATI\rAT+BAD\rAT+WIPE\r");
}

#[tokio::test]
async fn test_driver_reports_failed_connect() {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let address = listener.local_addr().unwrap().to_string();
    drop(listener);

    let (link_tx, link_rx) = mpsc::channel(16);
    let (input_tx, input_rx) = mpsc::channel(16);
    let (_shutdown_tx, shutdown_rx) = watch::channel(false);

    let output = SharedBuf::default();
    let console = Console::with_writer(output.clone(), false);
    let mut machine =
        SessionStateMachine::new(TcpTransport::new(address, link_tx), SessionConfig::default());
    console.attach(&mut machine);
    machine.connect();
    drop(input_tx);

    let driver = Driver::new(
        machine,
        console,
        link_rx,
        input_rx,
        shutdown_rx,
        Duration::from_millis(5),
    );

    // The refused connect leaves nothing to drain, so the driver stops.
    let machine = timeout(WAIT, driver.run()).await.unwrap();
    assert_eq!(machine.state(), SessionState::Disconnected);
    assert_eq!(
        output.text(),
        "-- Attempting to connect...\n!! Connection failed\n"
    );
}
