//! Mock transport for deterministic testing of instrument tables.
//!
//! [`MockTransport`] implements the [`Transport`] trait over an ordered list
//! of expected exchanges. Each exchange is an optional write and an optional
//! reply, which covers the three shapes instrument traffic takes:
//!
//! - write then reply (a query)
//! - write only (a setting)
//! - reply only (a measurement the instrument streams without being asked)
//!
//! # Example
//!
//! ```
//! use instrlib_test_harness::MockTransport;
//!
//! let mut mock = MockTransport::new();
//! // When "ID\n" is written, reply with the identification line.
//! mock.expect(b"ID\n", b"HP5384A\r\n");
//! // "AK1\n" is written and nothing comes back.
//! mock.expect_write(b"AK1\n");
//! ```

use async_trait::async_trait;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use instrlib_core::error::{Error, Result};
use instrlib_core::transport::Transport;

/// One expected exchange.
#[derive(Debug, Clone)]
struct Expectation {
    /// The exact bytes we expect to be written, or `None` for a reply that
    /// arrives without a preceding write.
    request: Option<Vec<u8>>,
    /// The bytes the instrument sends back, if any.
    response: Option<Vec<u8>>,
}

/// Shared view of everything a [`MockTransport`] has sent.
///
/// The mock is usually boxed into an adapter, so tests that need to inspect
/// traffic afterwards take this handle first.
#[derive(Debug, Clone, Default)]
pub struct SendLog(Arc<Mutex<Vec<Vec<u8>>>>);

impl SendLog {
    /// Copy of every send so far, one element per `send()` call.
    pub fn sends(&self) -> Vec<Vec<u8>> {
        self.0.lock().map(|log| log.clone()).unwrap_or_default()
    }

    /// Number of sends so far.
    pub fn len(&self) -> usize {
        self.0.lock().map(|log| log.len()).unwrap_or_default()
    }

    /// Whether nothing has been sent.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn push(&self, data: &[u8]) {
        if let Ok(mut log) = self.0.lock() {
            log.push(data.to_vec());
        }
    }
}

/// A mock [`Transport`] that replays fixture traffic.
///
/// Expectations are consumed in order. A `send()` must match the next
/// expectation's request byte for byte; its response then becomes readable.
/// A `receive()` with nothing pending consumes the next expectation if it is
/// reply-only, and otherwise times out immediately, which is how the link
/// going quiet looks to the framing layer.
#[derive(Debug)]
pub struct MockTransport {
    /// Ordered queue of expected exchanges.
    expectations: VecDeque<Expectation>,
    /// Reply bytes not yet handed out by `receive()`.
    pending: VecDeque<u8>,
    /// Whether the transport is "connected".
    connected: bool,
    /// Log of all bytes sent through this transport.
    sent_log: Vec<Vec<u8>>,
    /// Whether each logged send asserted end-of-message.
    end_log: Vec<bool>,
    /// Shared copy of `sent_log`.
    shared_log: SendLog,
}

impl MockTransport {
    /// Create a new mock transport in the connected state.
    pub fn new() -> Self {
        MockTransport {
            expectations: VecDeque::new(),
            pending: VecDeque::new(),
            connected: true,
            sent_log: Vec::new(),
            end_log: Vec::new(),
            shared_log: SendLog::default(),
        }
    }

    /// Build a mock from `(written, reply)` fixture pairs.
    pub fn from_fixture<I>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (Option<Vec<u8>>, Option<Vec<u8>>)>,
    {
        let mut mock = Self::new();
        mock.expectations
            .extend(pairs.into_iter().map(|(request, response)| Expectation { request, response }));
        mock
    }

    /// Expect `request` to be written, answered by `response`.
    pub fn expect(&mut self, request: &[u8], response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: Some(request.to_vec()),
            response: Some(response.to_vec()),
        });
    }

    /// Expect `request` to be written with no reply.
    pub fn expect_write(&mut self, request: &[u8]) {
        self.expectations.push_back(Expectation {
            request: Some(request.to_vec()),
            response: None,
        });
    }

    /// Expect a reply that arrives without a preceding write.
    pub fn expect_read(&mut self, response: &[u8]) {
        self.expectations.push_back(Expectation {
            request: None,
            response: Some(response.to_vec()),
        });
    }

    /// Return a reference to all data that has been sent through this transport.
    ///
    /// Each element is the byte slice from one `send()` call.
    pub fn sent_data(&self) -> &[Vec<u8>] {
        &self.sent_log
    }

    /// A handle on the send log that stays valid after the mock is moved.
    pub fn send_log(&self) -> SendLog {
        self.shared_log.clone()
    }

    /// For each logged send, whether it went through `send_with_end()`.
    pub fn end_flags(&self) -> &[bool] {
        &self.end_log
    }

    /// Return the number of expectations that have not yet been consumed.
    pub fn remaining_expectations(&self) -> usize {
        self.expectations.len()
    }

    /// Set the connected state of the mock transport.
    ///
    /// When set to `false`, subsequent `send()` and `receive()` calls will
    /// return [`Error::NotConnected`].
    pub fn set_connected(&mut self, connected: bool) {
        self.connected = connected;
    }

    fn record_send(&mut self, data: &[u8], end: bool) -> Result<()> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        self.sent_log.push(data.to_vec());
        self.end_log.push(end);
        self.shared_log.push(data);

        let expectation = self
            .expectations
            .pop_front()
            .ok_or_else(|| Error::Transport("no more expectations in mock transport".into()))?;

        match expectation.request {
            Some(ref request) if request.as_slice() == data => {}
            Some(ref request) => {
                return Err(Error::Transport(format!(
                    "unexpected send data: expected {:?}, got {:?}",
                    String::from_utf8_lossy(request),
                    String::from_utf8_lossy(data)
                )));
            }
            None => {
                return Err(Error::Transport(format!(
                    "unexpected send data {:?}: expected a read",
                    String::from_utf8_lossy(data)
                )));
            }
        }

        if let Some(response) = expectation.response {
            self.pending.extend(response);
        }
        Ok(())
    }
}

impl Default for MockTransport {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn send(&mut self, data: &[u8]) -> Result<()> {
        self.record_send(data, false)
    }

    async fn send_with_end(&mut self, data: &[u8]) -> Result<()> {
        self.record_send(data, true)
    }

    async fn receive(&mut self, buf: &mut [u8], _timeout: Duration) -> Result<usize> {
        if !self.connected {
            return Err(Error::NotConnected);
        }

        if self.pending.is_empty() {
            let reply_only = self
                .expectations
                .front()
                .is_some_and(|e| e.request.is_none());
            if !reply_only {
                return Err(Error::Timeout);
            }
            if let Some(response) = self.expectations.pop_front().and_then(|e| e.response) {
                self.pending.extend(response);
            }
            if self.pending.is_empty() {
                return Err(Error::Timeout);
            }
        }

        let n = self.pending.len().min(buf.len());
        for (slot, byte) in buf.iter_mut().zip(self.pending.drain(..n)) {
            *slot = byte;
        }
        Ok(n)
    }

    async fn close(&mut self) -> Result<()> {
        self.connected = false;
        self.pending.clear();
        Ok(())
    }

    fn is_connected(&self) -> bool {
        self.connected
    }
}
