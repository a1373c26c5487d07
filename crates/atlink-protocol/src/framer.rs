//! Response framing.
//!
//! The framer is fed one character at a time. It keeps two accumulators:
//! the current line, which resets at every carriage return, and the current
//! response, which resets only when a delimiter is seen. Line and response
//! boundaries are reported to subscribers and in the return value of
//! [`ResponseFramer::push`].

use crate::command::Intention;
use crate::delimiter::Delimiter;
use crate::listeners::Listeners;

/// A completed response.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FullResponse {
    /// Tag supplied with the character that completed the response.
    pub intention: Intention,
    /// All text since the previous response, trimmed.
    pub response: String,
    /// The delimiter that completed it.
    pub delimiter: Delimiter,
}

/// What a single character produced.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Framed {
    /// A line event, if one fired.
    pub line: Option<String>,
    /// A full response, if the character completed one.
    pub response: Option<FullResponse>,
}

impl Framed {
    /// Whether the character completed a response.
    pub fn is_complete(&self) -> bool {
        self.response.is_some()
    }
}

/// Turns a character stream into line and full-response events.
#[derive(Debug, Default)]
pub struct ResponseFramer {
    line: String,
    response: String,
    char_listeners: Listeners<char>,
    line_listeners: Listeners<str>,
    response_listeners: Listeners<FullResponse>,
}

impl ResponseFramer {
    /// A framer with empty accumulators and no subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribe to every character appended with echo enabled.
    pub fn on_char<F>(&mut self, callback: F)
    where
        F: FnMut(&char) + Send + 'static,
    {
        self.char_listeners.subscribe(callback);
    }

    /// Subscribe to non-empty trimmed lines.
    pub fn on_line<F>(&mut self, callback: F)
    where
        F: FnMut(&str) + Send + 'static,
    {
        self.line_listeners.subscribe(callback);
    }

    /// Subscribe to completed responses.
    pub fn on_full_response<F>(&mut self, callback: F)
    where
        F: FnMut(&FullResponse) + Send + 'static,
    {
        self.response_listeners.subscribe(callback);
    }

    /// Append an optional character. `None` is a no-op.
    ///
    /// Returns `true` when the character completed a response.
    pub fn append(&mut self, ch: Option<char>, intention: &Intention, echo: bool) -> bool {
        match ch {
            Some(ch) => self.push(ch, intention, echo).is_complete(),
            None => false,
        }
    }

    /// Append a whole string, one character at a time.
    ///
    /// Returns the number of responses completed.
    pub fn append_str(&mut self, text: &str, intention: &Intention, echo: bool) -> usize {
        text.chars()
            .filter(|&ch| self.push(ch, intention, echo).is_complete())
            .count()
    }

    /// Append one character and report which events it produced.
    ///
    /// Events fire in a fixed order: character, then line, then response.
    /// With `echo` off, character and line events are suppressed but the
    /// response still completes and is still reported.
    pub fn push(&mut self, ch: char, intention: &Intention, echo: bool) -> Framed {
        let mut framed = Framed::default();

        self.response.push(ch);
        // The line accumulator never holds a `\r`: every `\r` resets it below,
        // so mapping both terminators to `\n` here matches collapsing any
        // `\r\n`, `\r` or `\n` run to `\n`.
        self.line.push(if ch == '\r' { '\n' } else { ch });

        if echo {
            self.char_listeners.notify(&ch);
        }

        if ch == '\r' {
            if echo {
                framed.line = self.emit_line();
            }
            self.line.clear();
        }

        let Some(delimiter) = Delimiter::matching_suffix(&self.response) else {
            return framed;
        };

        if echo {
            // Delimiter text that arrived without a carriage return.
            if let Some(line) = self.emit_line() {
                framed.line = Some(line);
            }
        }

        let full = FullResponse {
            intention: intention.clone(),
            response: self.response.trim().to_string(),
            delimiter,
        };
        log::trace!(
            "framer: full response [{}] ({}, {} chars)",
            full.intention,
            delimiter,
            full.response.len()
        );
        self.response_listeners.notify(&full);

        self.line.clear();
        self.response.clear();
        framed.response = Some(full);
        framed
    }

    /// Notify line listeners if the current line has content.
    fn emit_line(&mut self) -> Option<String> {
        let line = self.line.trim();
        if line.is_empty() {
            return None;
        }
        let line = line.to_string();
        self.line_listeners.notify(line.as_str());
        Some(line)
    }

    /// Text accumulated since the last line terminator.
    pub fn pending_line(&self) -> &str {
        &self.line
    }

    /// Text accumulated since the last full response.
    pub fn pending_response(&self) -> &str {
        &self.response
    }

    /// Whether both accumulators are empty.
    pub fn is_empty(&self) -> bool {
        self.line.is_empty() && self.response.is_empty()
    }

    /// Drop any partially received data. Subscribers are kept.
    pub fn reset(&mut self) {
        if !self.response.is_empty() {
            log::debug!("framer: discarding {} unframed chars", self.response.len());
        }
        self.line.clear();
        self.response.clear();
    }
}
