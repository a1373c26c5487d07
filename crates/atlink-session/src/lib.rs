//! Command/response session for AT-style serial links.
//!
//! The [`SessionStateMachine`] owns the outgoing command queue and a
//! [`ResponseFramer`](atlink_protocol::ResponseFramer). It keeps exactly one
//! command in flight: a command is written, the machine waits in
//! [`SessionState::Receive`] until the framer reports a full response, and
//! only then is the next command taken from the queue.
//!
//! The machine has no scheduler of its own. Whoever owns it feeds incoming
//! characters through [`SessionStateMachine::ingest`] and calls
//! [`SessionStateMachine::step`] on a fixed interval.
//!
//! ```rust,ignore
//! let mut machine = SessionStateMachine::new(transport, SessionConfig::default());
//! machine.on_response(|r| println!("[{}] {}", r.intention, r.response));
//! machine.connect();
//! machine.add_command(Intention::command(), "ati")?;
//! loop {
//!     machine.step().await;
//!     // feed incoming chars with machine.ingest(ch, &Intention::data())
//! }
//! ```

mod config;
mod error;
mod events;
mod machine;
pub mod mock;
mod queue;
mod state;
mod timer;
mod transport;

pub use config::*;
pub use error::*;
pub use events::*;
pub use machine::*;
pub use queue::*;
pub use state::*;
pub use timer::*;
pub use transport::*;
