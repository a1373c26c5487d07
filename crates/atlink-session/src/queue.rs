//! The outgoing command queue.

use std::collections::VecDeque;

use atlink_protocol::PendingCommand;

/// FIFO queue of commands waiting to be sent.
///
/// Commands enter at the tail and leave from the head, once each.
#[derive(Debug, Clone, Default)]
pub struct CommandQueue {
    commands: VecDeque<PendingCommand>,
}

impl CommandQueue {
    /// An empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a command to the tail.
    pub fn push(&mut self, command: PendingCommand) {
        self.commands.push_back(command);
    }

    /// Remove and return the head.
    pub fn pop(&mut self) -> Option<PendingCommand> {
        self.commands.pop_front()
    }

    /// The next command to be sent, without removing it.
    pub fn peek(&self) -> Option<&PendingCommand> {
        self.commands.front()
    }

    /// Number of queued commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether nothing is queued.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop every queued command, returning how many were dropped.
    pub fn clear(&mut self) -> usize {
        let dropped = self.commands.len();
        self.commands.clear();
        dropped
    }

    /// Queued commands, oldest first.
    pub fn iter(&self) -> impl Iterator<Item = &PendingCommand> {
        self.commands.iter()
    }
}
