//! TCP transport.
//!
//! Connects to a TCP endpoint that exposes a device's UART, such as a
//! serial-to-TCP bridge or a simulator's per-node UART port. Outgoing lines
//! are written directly; incoming bytes are read by a background task,
//! decoded to characters and forwarded as [`LinkEvent`]s.

use std::time::Duration;

use async_trait::async_trait;
use atlink_metrics::{metric_defs, metrics};
use atlink_protocol::{encode_line, CharDecoder};
use atlink_session::Transport;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::tcp::{OwnedReadHalf, OwnedWriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, trace, warn};

/// Something that happened on the receive side of the link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkEvent {
    /// One decoded character.
    Char(char),
    /// The peer closed the connection or the read failed.
    Closed,
}

/// The background read loop and the means to stop it.
struct ReaderTask {
    stop: oneshot::Sender<()>,
    handle: JoinHandle<()>,
}

/// A [`Transport`] over a TCP connection.
pub struct TcpTransport {
    address: String,
    connect_timeout: Duration,
    events: mpsc::Sender<LinkEvent>,
    writer: Option<OwnedWriteHalf>,
    reader: Option<ReaderTask>,
}

impl TcpTransport {
    /// Create a transport that forwards received characters to `events`.
    pub fn new(address: impl Into<String>, events: mpsc::Sender<LinkEvent>) -> Self {
        TcpTransport {
            address: address.into(),
            connect_timeout: Duration::from_secs(3),
            events,
            writer: None,
            reader: None,
        }
    }

    /// Bound on establishing the connection.
    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// The configured peer address.
    pub fn address(&self) -> &str {
        &self.address
    }

    /// Whether a connection is currently held.
    pub fn is_open(&self) -> bool {
        self.writer.is_some()
    }

    async fn connect(&self) -> std::io::Result<TcpStream> {
        match tokio::time::timeout(self.connect_timeout, TcpStream::connect(&self.address)).await {
            Ok(result) => result,
            Err(_) => Err(std::io::Error::new(
                std::io::ErrorKind::TimedOut,
                format!("no connection within {:?}", self.connect_timeout),
            )),
        }
    }
}

#[async_trait]
impl Transport for TcpTransport {
    async fn open(&mut self) -> bool {
        if self.is_open() {
            debug!("TCP: already open to {}", self.address);
            return true;
        }

        let stream = match self.connect().await {
            Ok(stream) => stream,
            Err(e) => {
                warn!("TCP: failed to connect to {}: {}", self.address, e);
                return false;
            }
        };
        if let Err(e) = stream.set_nodelay(true) {
            debug!("TCP: could not disable Nagle: {}", e);
        }

        let (read_half, write_half) = stream.into_split();
        let (stop_tx, stop_rx) = oneshot::channel();
        let handle = tokio::spawn(read_loop(read_half, self.events.clone(), stop_rx));

        self.writer = Some(write_half);
        self.reader = Some(ReaderTask {
            stop: stop_tx,
            handle,
        });
        info!("TCP: connected to {}", self.address);
        true
    }

    async fn write(&mut self, line: &str) -> bool {
        let Some(writer) = self.writer.as_mut() else {
            error!("TCP: cannot write, link is not open");
            return false;
        };

        let frame = encode_line(line);
        let result = async {
            writer.write_all(&frame).await?;
            writer.flush().await
        }
        .await;

        match result {
            Ok(()) => {
                trace!("TCP: sent {:?} ({} bytes)", line, frame.len());
                true
            }
            Err(e) => {
                warn!("TCP: failed to send {:?}: {}", line, e);
                false
            }
        }
    }

    async fn close(&mut self) {
        // Stop the reader first and wait for it, then release the writer.
        if let Some(reader) = self.reader.take() {
            let _ = reader.stop.send(());
            if let Err(e) = reader.handle.await {
                warn!("TCP: reader task ended abnormally: {}", e);
            }
        }
        if let Some(mut writer) = self.writer.take() {
            if let Err(e) = writer.shutdown().await {
                debug!("TCP: error shutting down writer: {}", e);
            }
            info!("TCP: closed {}", self.address);
        }
    }
}

impl Drop for TcpTransport {
    fn drop(&mut self) {
        if let Some(reader) = self.reader.take() {
            reader.handle.abort();
        }
    }
}

/// Read from the socket until stopped, the peer closes, or the receiver goes away.
async fn read_loop(
    mut reader: OwnedReadHalf,
    events: mpsc::Sender<LinkEvent>,
    mut stop: oneshot::Receiver<()>,
) {
    let mut decoder = CharDecoder::new();
    let mut read_buf = [0u8; 1024];
    let mut chars = Vec::with_capacity(read_buf.len());

    loop {
        tokio::select! {
            _ = &mut stop => {
                trace!("TCP: reader stopped");
                return;
            }
            result = reader.read(&mut read_buf) => {
                match result {
                    Ok(0) => {
                        info!("TCP: connection closed by peer");
                        break;
                    }
                    Ok(n) => {
                        metrics::counter!(metric_defs::BYTES_RECEIVED.name).increment(n as u64);
                        chars.clear();
                        decoder.decode_into(&read_buf[..n], &mut chars);
                        for &ch in &chars {
                            // Stop must win even when the channel is full.
                            tokio::select! {
                                biased;
                                _ = &mut stop => {
                                    trace!("TCP: reader stopped while forwarding");
                                    return;
                                }
                                sent = events.send(LinkEvent::Char(ch)) => {
                                    if sent.is_err() {
                                        // Receiver dropped
                                        return;
                                    }
                                }
                            }
                        }
                    }
                    Err(e) => {
                        warn!("TCP: read error: {}", e);
                        break;
                    }
                }
            }
        }
    }

    tokio::select! {
        biased;
        _ = &mut stop => trace!("TCP: reader stopped before reporting close"),
        _ = events.send(LinkEvent::Closed) => {}
    }
}
