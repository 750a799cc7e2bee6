//! instrlib-test-harness: Test utilities and mock transports for instrlib.
//!
//! This crate provides [`MockTransport`] for deterministic testing of
//! instrument tables and message framing without real hardware. Expected
//! traffic is declared as `(bytes written, reply)` fixture pairs.

pub mod mock_transport;

pub use mock_transport::{MockTransport, SendLog};
