//! Transport trait for instrument communication.
//!
//! The [`Transport`] trait abstracts over the physical link to an
//! instrument: a serial port, a GPIB board, a TCP socket, or a mock that
//! replays recorded traffic. instrlib does not ship link drivers; callers
//! implement this trait over whatever binding they use.
//!
//! Message framing (line termination, fixed-length reads) is handled by the
//! `Adapter` in `instrlib-message`, which operates on a `Transport` rather
//! than on a concrete port so that instrument tables can be tested
//! deterministically with `MockTransport` from `instrlib-test-harness`.

use async_trait::async_trait;
use std::time::Duration;

use crate::error::Result;

/// Asynchronous byte-level transport to an instrument.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send raw bytes to the instrument.
    ///
    /// Implementations should not return until all bytes have been handed
    /// to the underlying link.
    async fn send(&mut self, data: &[u8]) -> Result<()>;

    /// Send raw bytes and mark the last one as the end of the message.
    ///
    /// On GPIB this asserts EOI with the final byte. Links without an
    /// end-of-message line fall back to [`send`](Transport::send).
    async fn send_with_end(&mut self, data: &[u8]) -> Result<()> {
        self.send(data).await
    }

    /// Receive bytes from the instrument into the provided buffer.
    ///
    /// Returns the number of bytes actually read. Waits up to `timeout` for
    /// data to arrive; returns [`Error::Timeout`](crate::error::Error::Timeout)
    /// if nothing is received within the deadline.
    async fn receive(&mut self, buf: &mut [u8], timeout: Duration) -> Result<usize>;

    /// Close the transport.
    ///
    /// After calling `close()`, subsequent `send()` and `receive()` calls
    /// should return [`Error::NotConnected`](crate::error::Error::NotConnected).
    async fn close(&mut self) -> Result<()>;

    /// Check whether the transport is currently connected.
    fn is_connected(&self) -> bool;
}
