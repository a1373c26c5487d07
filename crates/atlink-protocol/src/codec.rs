//! Wire encoding.
//!
//! Outgoing commands are plain text terminated with a carriage return.
//! Incoming bytes are decoded to characters incrementally, since a read can
//! end in the middle of a multi-byte UTF-8 sequence.

use bytes::{Buf, Bytes, BytesMut};

/// Line terminator appended to every outgoing command.
pub const LINE_TERMINATOR: char = '\r';

/// Encode a line for transmission, appending the `\r` terminator.
pub fn encode_line(line: &str) -> Bytes {
    let mut buf = BytesMut::with_capacity(line.len() + 1);
    buf.extend_from_slice(line.as_bytes());
    buf.extend_from_slice(&[LINE_TERMINATOR as u8]);
    buf.freeze()
}

/// Incremental UTF-8 decoder for the receive path.
///
/// Invalid sequences decode to U+FFFD so the character stream always makes
/// progress. An incomplete trailing sequence is held until more bytes arrive.
#[derive(Debug, Default)]
pub struct CharDecoder {
    pending: BytesMut,
}

impl CharDecoder {
    /// A decoder with nothing held back.
    pub fn new() -> Self {
        Self::default()
    }

    /// Decode `data`, appending every complete character to `out`.
    pub fn decode_into(&mut self, data: &[u8], out: &mut Vec<char>) {
        self.pending.extend_from_slice(data);

        loop {
            match std::str::from_utf8(&self.pending) {
                Ok(text) => {
                    out.extend(text.chars());
                    self.pending.clear();
                    return;
                }
                Err(e) => {
                    let valid = e.valid_up_to();
                    if let Ok(text) = std::str::from_utf8(&self.pending[..valid]) {
                        out.extend(text.chars());
                    }
                    self.pending.advance(valid);

                    match e.error_len() {
                        Some(bad) => {
                            out.push(char::REPLACEMENT_CHARACTER);
                            self.pending.advance(bad);
                        }
                        // Incomplete sequence at the end; wait for more bytes.
                        None => return,
                    }
                }
            }
        }
    }

    /// Decode `data` into a fresh vector of characters.
    pub fn decode(&mut self, data: &[u8]) -> Vec<char> {
        let mut out = Vec::with_capacity(data.len());
        self.decode_into(data, &mut out);
        out
    }

    /// Number of bytes held back waiting for the rest of a sequence.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Drop any held-back bytes.
    pub fn clear(&mut self) {
        self.pending.clear();
    }
}
