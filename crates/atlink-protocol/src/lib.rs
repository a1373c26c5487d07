//! AT-style serial link protocol
//!
//! This crate provides the protocol-level pieces for talking to a half-duplex,
//! line-oriented command/response device such as an AT-command modem. Nothing
//! in here performs I/O; the session and transport layers live elsewhere.
//!
//! # Protocol Overview
//!
//! - **Commands** (host → device): Text terminated with `\r` (carriage return)
//! - **Responses** (device → host): Free-form text lines, completed when the
//!   accumulated text ends with one of three delimiters: `"OK "`, `"ERROR"` or
//!   `"Access Denied"`
//! - **Echo**: Devices usually echo the command back before the response
//!
//! # Example
//!
//! ```rust
//! use atlink_protocol::{Intention, ResponseFramer};
//!
//! let mut framer = ResponseFramer::new();
//! framer.on_line(|line| println!("line: {line}"));
//!
//! let data = Intention::data();
//! let completed = framer.append_str("AT\rOK ", &data, true);
//! assert_eq!(completed, 1);
//! ```

mod codec;
mod command;
mod delimiter;
mod error;
mod framer;
mod listeners;

pub use codec::*;
pub use command::*;
pub use delimiter::*;
pub use error::*;
pub use framer::*;
pub use listeners::*;
