//! Error types for instrlib.
//!
//! All fallible operations across the library return [`Result<T>`], which
//! uses [`Error`] as the error type. Failures fall into four families:
//!
//! - **validation** -- a value was rejected before any byte was sent
//! - **declaration** -- a property table, status layout, or connection
//!   configuration is inconsistent
//! - **communication** -- the transport failed, timed out, or the instrument
//!   replied with something that does not convert
//! - **decode** -- a status register holds a bit pattern with no meaning
//!
//! Nothing is retried or suppressed internally; every error reaches the
//! caller of the property access that produced it.

/// The error type for all instrlib operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// A value was rejected by a property's validator. Nothing was sent.
    #[error("validation error: {0}")]
    Validation(String),

    /// A property declaration violates its own invariants (e.g. a mapped
    /// key outside the validator's set, or a template without a slot).
    #[error("invalid property declaration: {0}")]
    InvalidSpec(String),

    /// The connection configuration cannot be used.
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    /// A transport-level error (port busy, unexpected write on a mock).
    #[error("transport error: {0}")]
    Transport(String),

    /// Timed out waiting for a reply from the instrument.
    #[error("timeout waiting for response")]
    Timeout,

    /// The reply could not be converted to the expected value.
    #[error("malformed reply: {0}")]
    MalformedReply(String),

    /// A fixed-length read ended before the requested number of bytes.
    #[error("expected {expected} bytes, received {received}")]
    ByteCountMismatch {
        /// Number of bytes requested.
        expected: usize,
        /// Number of bytes that arrived before the link went quiet.
        received: usize,
    },

    /// A status register held a bit pattern that the layout does not define.
    #[error("status decode error: {0}")]
    Decode(String),

    /// The operation is not available for this property or instrument.
    #[error("unsupported operation: {0}")]
    Unsupported(String),

    /// No connection to the instrument has been established.
    #[error("not connected")]
    NotConnected,

    /// The connection to the instrument was lost unexpectedly.
    #[error("connection lost")]
    ConnectionLost,

    /// An underlying I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl Error {
    /// True for values rejected before transmission.
    pub fn is_validation(&self) -> bool {
        matches!(self, Error::Validation(_))
    }

    /// True for transport failures, timeouts, and unconvertible replies.
    pub fn is_communication(&self) -> bool {
        matches!(
            self,
            Error::Transport(_)
                | Error::Timeout
                | Error::MalformedReply(_)
                | Error::ByteCountMismatch { .. }
                | Error::NotConnected
                | Error::ConnectionLost
                | Error::Io(_)
        )
    }

    /// True for undefined status-register bit patterns.
    pub fn is_decode(&self) -> bool {
        matches!(self, Error::Decode(_))
    }
}

/// A convenience `Result` alias using [`Error`] as the error type.
pub type Result<T> = std::result::Result<T, Error>;
