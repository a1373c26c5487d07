//! The link the session talks over.

use async_trait::async_trait;

/// A half-duplex text link.
///
/// Implementations catch their own I/O errors, log them and report plain
/// success or failure. Incoming characters are not part of this trait; the
/// owner of the session delivers them through
/// [`SessionStateMachine::ingest`](crate::SessionStateMachine::ingest).
#[async_trait]
pub trait Transport: Send {
    /// Acquire and configure the link. Returns `false` on ordinary failure.
    async fn open(&mut self) -> bool;

    /// Send one line. The implementation appends the `\r` terminator.
    async fn write(&mut self, line: &str) -> bool;

    /// Release every resource. Safe to call when partially open or closed.
    async fn close(&mut self);
}

#[async_trait]
impl<T: Transport + ?Sized> Transport for Box<T> {
    async fn open(&mut self) -> bool {
        (**self).open().await
    }

    async fn write(&mut self, line: &str) -> bool {
        (**self).write(line).await
    }

    async fn close(&mut self) {
        (**self).close().await
    }
}
