//! # instrlib -- Declarative Instrument Control
//!
//! `instrlib` drives message-based laboratory instruments (GPIB, serial, or
//! socket links speaking ASCII command sets) through declarative property
//! tables. Each instrument property is a [`PropertySpec`]: the command that
//! reads it, the template that writes it, the validator guarding writes, and
//! an optional mapping between logical values and wire tokens. One generic
//! accessor pair, [`Instrument::get`] and [`Instrument::set`], turns any
//! table into round trips.
//!
//! ## Quick Start
//!
//! ```no_run
//! use instrlib::hp::Hp8350x;
//! use instrlib::{InstrumentBuilder, Transport};
//!
//! # async fn example(transport: Box<dyn Transport>) -> instrlib::Result<()> {
//! let mut sweeper = InstrumentBuilder::<Hp8350x>::new()
//!     .resource(19u8)
//!     .build_with_transport(transport)
//!     .await?;
//!
//! sweeper.set_center_frequency(1_000_000).await?;
//! sweeper.set_amplitude_marker_enabled(true).await?;
//! println!("{}", sweeper.status().await?);
//! # Ok(())
//! # }
//! ```
//!
//! ## Architecture
//!
//! | Crate                   | Purpose                                            |
//! |-------------------------|----------------------------------------------------|
//! | `instrlib-core`         | Property descriptors, status decoding, errors, [`Transport`] |
//! | `instrlib-message`      | Line framing, generic [`Instrument`] access, builder |
//! | `instrlib-hp`           | HP 5384A and HP 8350A/B drivers                    |
//! | `instrlib-test-harness` | `MockTransport` for fixture replay in tests        |
//! | **`instrlib`**          | This facade crate -- re-exports everything         |
//!
//! The physical link is not part of the library: implement [`Transport`]
//! over the serial, GPIB, or socket binding in use.
//!
//! ## Feature Flags
//!
//! | Feature | Enables                               | Default |
//! |---------|---------------------------------------|---------|
//! | `hp`    | [`hp`] module (HP legacy instruments) | yes     |
//!
//! ## Errors
//!
//! Every operation returns [`Result`]. Rejected values surface as
//! [`Error::Validation`] before any byte is sent; link failures and
//! unconvertible replies as communication errors ([`Error::is_communication`]);
//! undefined status patterns as [`Error::Decode`]. Nothing is retried.

pub use instrlib_core::*;
pub use instrlib_message::{
    Adapter, AdapterConfig, Driver, Instrument, InstrumentBuilder, framing,
};

/// Hewlett-Packard legacy instruments.
///
/// Provides [`Hp5384a`](hp::Hp5384a) (225 MHz frequency counter) and
/// [`Hp8350x`](hp::Hp8350x) (8350A/B sweep oscillator), with their property
/// tables and the 8350 status layout.
#[cfg(feature = "hp")]
pub mod hp {
    pub use instrlib_hp::*;
}

/// Returns the names of all instrument models in enabled backends.
///
/// # Example
///
/// ```
/// for model in instrlib::supported_models() {
///     println!("{model}");
/// }
/// ```
pub fn supported_models() -> Vec<&'static str> {
    #[allow(unused_mut)]
    let mut models = Vec::new();

    #[cfg(feature = "hp")]
    {
        models.extend(hp::Model::ALL.iter().map(|m| m.name()));
    }

    models
}
