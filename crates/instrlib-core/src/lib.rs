//! instrlib-core: Core traits, types, and error definitions for instrlib.
//!
//! This crate holds everything an instrument table needs that does not touch
//! a live link: the declarative property descriptors, the status-register
//! decoder, the wire value codec, and the [`Transport`] abstraction that
//! message framing sits on.
//!
//! # Key types
//!
//! - [`PropertySpec`] -- declarative description of one instrument property
//! - [`StatusLayout`] / [`StatusBits`] -- status-register bit layouts and
//!   decoded snapshots
//! - [`Transport`] -- byte-level communication channel
//! - [`ResourceName`] -- VISA-style instrument address
//! - [`Error`] / [`Result`] -- error handling

pub mod error;
pub mod property;
pub mod resource;
pub mod status;
pub mod transport;
pub mod wire;

// Re-export key types at crate root for ergonomic `use instrlib_core::*`.
pub use error::{Error, Result};
pub use property::{
    Access, AccessKind, Control, DynProperty, Measurement, PropertyBuilder, PropertyInfo,
    PropertySpec, Readable, Setting, Validator, ValueMap, Writable, control, measurement, setting,
};
pub use resource::{ParseResourceError, ResourceName};
pub use status::{
    EnumMember, FieldKind, FieldValue, StatusBits, StatusField, StatusLayout, StatusRegister,
};
pub use transport::Transport;
pub use wire::WireValue;
