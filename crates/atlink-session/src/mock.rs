//! In-memory transport for tests and demos.

use std::collections::VecDeque;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use atlink_protocol::encode_line;

use crate::transport::Transport;

#[derive(Debug)]
struct MockLink {
    open: bool,
    open_results: VecDeque<bool>,
    fail_writes: bool,
    writes: Vec<String>,
    wire: Vec<u8>,
    open_calls: usize,
    close_calls: usize,
}

/// A scripted transport that records what was written.
///
/// Clones share state, so a test can hand one clone to the session and keep
/// another to inspect writes.
#[derive(Debug, Clone)]
pub struct MockTransport {
    link: Arc<Mutex<MockLink>>,
}

impl MockTransport {
    /// A transport whose `open` always succeeds.
    pub fn new() -> Self {
        MockTransport {
            link: Arc::new(Mutex::new(MockLink {
                open: false,
                open_results: VecDeque::new(),
                fail_writes: false,
                writes: Vec::new(),
                wire: Vec::new(),
                open_calls: 0,
                close_calls: 0,
            })),
        }
    }

    /// A transport whose `open` always fails.
    pub fn refusing() -> Self {
        let transport = Self::new();
        transport.script_open(std::iter::repeat(false).take(64));
        transport
    }

    fn link(&self) -> MutexGuard<'_, MockLink> {
        self.link.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Queue results for upcoming `open` calls. Unscripted calls succeed.
    pub fn script_open(&self, results: impl IntoIterator<Item = bool>) {
        self.link().open_results.extend(results);
    }

    /// Make every following write fail.
    pub fn fail_writes(&self, fail: bool) {
        self.link().fail_writes = fail;
    }

    /// Lines written so far, without terminators.
    pub fn writes(&self) -> Vec<String> {
        self.link().writes.clone()
    }

    /// Exact bytes written so far, terminators included.
    pub fn wire(&self) -> Vec<u8> {
        self.link().wire.clone()
    }

    /// Whether the link is currently open.
    pub fn is_open(&self) -> bool {
        self.link().open
    }

    /// Number of `open` calls so far.
    pub fn open_calls(&self) -> usize {
        self.link().open_calls
    }

    /// Number of `close` calls so far.
    pub fn close_calls(&self) -> usize {
        self.link().close_calls
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&mut self) -> bool {
        let mut link = self.link();
        link.open_calls += 1;
        let opened = link.open_results.pop_front().unwrap_or(true);
        link.open = opened;
        opened
    }

    async fn write(&mut self, line: &str) -> bool {
        let mut link = self.link();
        if !link.open || link.fail_writes {
            return false;
        }
        link.writes.push(line.to_string());
        link.wire.extend_from_slice(&encode_line(line));
        true
    }

    async fn close(&mut self) {
        let mut link = self.link();
        link.close_calls += 1;
        link.open = false;
    }
}
