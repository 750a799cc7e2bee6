//! Message framing over a [`Transport`].
//!
//! An [`Adapter`] turns the byte-level transport into the operations
//! message-based instruments speak: terminated command writes, line reads,
//! fixed-length binary reads, and write-then-read queries. Bytes that arrive
//! after a line's termination are kept for the next read.

use std::fmt;
use std::time::Duration;

use bytes::{Buf, BytesMut};
use tokio::time::Instant;
use tracing::{debug, trace, warn};

use instrlib_core::error::{Error, Result};
use instrlib_core::resource::ResourceName;
use instrlib_core::transport::Transport;

use crate::framing::{self, DecodeResult};

/// Maximum buffered reply size before the buffer is reset.
/// Replies from these instruments are a few dozen bytes.
pub const MAX_BUF: usize = 4096;

/// Size of a single transport receive.
const RECV_CHUNK: usize = 256;

/// Connection parameters for an [`Adapter`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterConfig {
    /// Instrument address, for logging and display.
    pub resource: Option<ResourceName>,
    /// Sequence that ends each reply line. Empty means a reply ends when the
    /// link goes quiet.
    pub read_termination: String,
    /// Sequence appended to each command.
    pub write_termination: String,
    /// Deadline for one complete read.
    pub timeout: Duration,
    /// Assert end-of-message with the last byte of each write.
    pub send_end: bool,
    /// Pause between the write and the read of a query.
    pub query_delay: Duration,
}

impl Default for AdapterConfig {
    fn default() -> Self {
        AdapterConfig {
            resource: None,
            read_termination: "\n".into(),
            write_termination: "\n".into(),
            timeout: Duration::from_secs(2),
            send_end: true,
            query_delay: Duration::ZERO,
        }
    }
}

impl AdapterConfig {
    /// Check that the configuration is usable.
    pub fn validate(&self) -> Result<()> {
        if self.timeout.is_zero() {
            return Err(Error::InvalidConfig("timeout must be non-zero".into()));
        }
        Ok(())
    }
}

/// Framed message access to one instrument.
pub struct Adapter {
    transport: Box<dyn Transport>,
    config: AdapterConfig,
    buffer: BytesMut,
}

impl Adapter {
    /// Wrap `transport` with the given framing configuration.
    pub fn new(transport: Box<dyn Transport>, config: AdapterConfig) -> Self {
        Adapter {
            transport,
            config,
            buffer: BytesMut::with_capacity(RECV_CHUNK),
        }
    }

    /// The framing configuration.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Whether the underlying transport is connected.
    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Send `command` followed by the write termination.
    pub async fn write(&mut self, command: &str) -> Result<()> {
        debug!(command, "write");
        let msg = framing::encode_message(command, &self.config.write_termination);
        self.send(&msg).await
    }

    /// Send raw bytes with no termination added.
    pub async fn write_bytes(&mut self, data: &[u8]) -> Result<()> {
        debug!(len = data.len(), "write bytes");
        self.send(data).await
    }

    /// Read one reply line with the read termination stripped.
    ///
    /// Fails with [`Error::Timeout`] if no complete line arrives within the
    /// timeout and [`Error::MalformedReply`] if the line is not UTF-8. A
    /// partial line is discarded on failure.
    pub async fn read(&mut self) -> Result<String> {
        let termination = self.config.read_termination.clone().into_bytes();
        if termination.is_empty() {
            let bytes = self.read_bytes(None, false).await?;
            return String::from_utf8(bytes)
                .map_err(|_| Error::MalformedReply("reply is not valid UTF-8".into()));
        }

        let deadline = Instant::now() + self.config.timeout;
        loop {
            match framing::decode_line(&self.buffer, &termination) {
                DecodeResult::Line { text, consumed } => {
                    self.buffer.advance(consumed);
                    debug!(reply = text.as_str(), "read");
                    return Ok(text);
                }
                DecodeResult::Invalid(consumed) => {
                    self.buffer.advance(consumed);
                    return Err(Error::MalformedReply("reply is not valid UTF-8".into()));
                }
                DecodeResult::Incomplete => {}
            }
            if let Err(e) = self.fill(deadline, MAX_BUF).await {
                self.discard("partial reply");
                return Err(e);
            }
        }
    }

    /// Read raw bytes.
    ///
    /// - `Some(n)` reads exactly `n` bytes. If the link goes quiet first the
    ///   partial reply is discarded and [`Error::ByteCountMismatch`] returned.
    /// - `None` reads until the link goes quiet.
    ///
    /// With `break_on_termchar` the read also stops after the first read
    /// termination, which is included in the result.
    ///
    /// Fails with [`Error::Timeout`] if nothing at all arrives.
    pub async fn read_bytes(
        &mut self,
        count: Option<usize>,
        break_on_termchar: bool,
    ) -> Result<Vec<u8>> {
        let termination = self.config.read_termination.clone().into_bytes();
        let limit = count.map_or(MAX_BUF, |n| n.max(MAX_BUF));
        let deadline = Instant::now() + self.config.timeout;

        loop {
            if break_on_termchar {
                if let Some(pos) = framing::find_termination(&self.buffer, &termination) {
                    let end = pos + termination.len();
                    if count.is_none_or(|n| end <= n) {
                        return Ok(self.take(end));
                    }
                }
            }
            if let Some(n) = count {
                if self.buffer.len() >= n {
                    return Ok(self.take(n));
                }
            }

            match self.fill(deadline, limit).await {
                Ok(_) => {}
                Err(Error::Timeout) if !self.buffer.is_empty() => {
                    return match count {
                        Some(expected) => {
                            let received = self.buffer.len();
                            self.buffer.clear();
                            Err(Error::ByteCountMismatch { expected, received })
                        }
                        None => {
                            let len = self.buffer.len();
                            Ok(self.take(len))
                        }
                    };
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Write `command`, wait the query delay, and read one reply line.
    ///
    /// Bytes left over from earlier traffic are dropped first, so the reply
    /// always belongs to this command.
    pub async fn query(&mut self, command: &str) -> Result<String> {
        self.discard("stale bytes");
        self.write(command).await?;
        if !self.config.query_delay.is_zero() {
            tokio::time::sleep(self.config.query_delay).await;
        }
        self.read().await
    }

    /// Query and parse the reply as a `separator`-separated list of numbers.
    pub async fn query_values(&mut self, command: &str, separator: char) -> Result<Vec<f64>> {
        let reply = self.query(command).await?;
        framing::parse_values(&reply, separator)
    }

    /// Close the transport and drop any buffered reply bytes.
    pub async fn close(&mut self) -> Result<()> {
        self.buffer.clear();
        self.transport.close().await
    }

    async fn send(&mut self, data: &[u8]) -> Result<()> {
        trace!(bytes = ?data, end = self.config.send_end, "send");
        if self.config.send_end {
            self.transport.send_with_end(data).await
        } else {
            self.transport.send(data).await
        }
    }

    /// Receive once into the buffer. A receive that returns no bytes, or a
    /// deadline already passed, counts as the link going quiet.
    async fn fill(&mut self, deadline: Instant, limit: usize) -> Result<usize> {
        let now = Instant::now();
        if now >= deadline {
            return Err(Error::Timeout);
        }

        let mut chunk = [0u8; RECV_CHUNK];
        let n = self.transport.receive(&mut chunk, deadline - now).await?;
        if n == 0 {
            return Err(Error::Timeout);
        }
        trace!(bytes = ?&chunk[..n], "received");
        self.buffer.extend_from_slice(&chunk[..n]);

        if self.buffer.len() > limit {
            warn!(len = self.buffer.len(), "reply buffer overflow, clearing");
            self.buffer.clear();
            return Err(Error::MalformedReply(format!(
                "reply exceeds {limit} bytes without termination"
            )));
        }
        Ok(n)
    }

    fn discard(&mut self, what: &str) {
        if !self.buffer.is_empty() {
            debug!(len = self.buffer.len(), "discarding {what}");
            self.buffer.clear();
        }
    }

    fn take(&mut self, n: usize) -> Vec<u8> {
        self.buffer.split_to(n).to_vec()
    }
}

impl fmt::Display for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.config.resource {
            Some(resource) => write!(f, "Adapter(resource='{resource}')"),
            None => write!(f, "Adapter(resource=None)"),
        }
    }
}

impl fmt::Debug for Adapter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Adapter")
            .field("config", &self.config)
            .field("buffered", &self.buffer.len())
            .field("connected", &self.transport.is_connected())
            .finish()
    }
}
