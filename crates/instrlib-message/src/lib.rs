//! instrlib-message: Message-based instrument access for instrlib.
//!
//! Everything between an instrument table and a raw [`Transport`]:
//!
//! - [`framing`] -- pure helpers for line termination and value lists
//! - [`Adapter`] -- terminated writes, line and byte-count reads, queries
//! - [`Instrument`] -- generic property get/set and status reads
//! - [`InstrumentBuilder`] / [`Driver`] -- connection configuration and
//!   per-model construction
//!
//! All operations are strictly request-then-reply: each call awaits its own
//! round trip, and nothing runs in the background.
//!
//! [`Transport`]: instrlib_core::Transport

pub mod adapter;
pub mod builder;
pub mod framing;
pub mod instrument;

pub use adapter::{Adapter, AdapterConfig};
pub use builder::{Driver, InstrumentBuilder};
pub use instrument::Instrument;
