//! InstrumentBuilder -- fluent builder for per-model instrument drivers.
//!
//! Separates connection configuration from construction. Each model
//! supplies its defaults through [`Driver::default_config`] (for example a
//! `"\r\n"` read termination), and callers override what they need before
//! handing over the transport.
//!
//! # Example
//!
//! ```ignore
//! let counter = InstrumentBuilder::<Hp5384a>::new()
//!     .resource(3u8)
//!     .timeout(Duration::from_millis(500))
//!     .build_with_transport(transport)
//!     .await?;
//! ```

use std::marker::PhantomData;
use std::time::Duration;

use tracing::debug;

use instrlib_core::error::{Error, Result};
use instrlib_core::resource::ResourceName;
use instrlib_core::transport::Transport;

use crate::adapter::{Adapter, AdapterConfig};
use crate::instrument::Instrument;

/// A model-specific driver built on top of an [`Instrument`].
pub trait Driver: Sized {
    /// Default instrument name.
    const NAME: &'static str;

    /// Connection defaults for this model.
    fn default_config() -> AdapterConfig {
        AdapterConfig::default()
    }

    /// Wrap a connected instrument. Fails if the model's property tables
    /// do not build.
    fn from_instrument(instrument: Instrument) -> Result<Self>;
}

/// Fluent builder for a [`Driver`].
pub struct InstrumentBuilder<D> {
    name: String,
    config: AdapterConfig,
    driver: PhantomData<D>,
}

impl<D: Driver> InstrumentBuilder<D> {
    /// Start from the model's defaults.
    pub fn new() -> Self {
        InstrumentBuilder {
            name: D::NAME.to_string(),
            config: D::default_config(),
            driver: PhantomData,
        }
    }

    /// Override the instrument name.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the instrument address (a [`ResourceName`] or a GPIB primary
    /// address).
    pub fn resource(mut self, resource: impl Into<ResourceName>) -> Self {
        self.config.resource = Some(resource.into());
        self
    }

    /// Set the sequence that ends each reply line.
    pub fn read_termination(mut self, termination: impl Into<String>) -> Self {
        self.config.read_termination = termination.into();
        self
    }

    /// Set the sequence appended to each command.
    pub fn write_termination(mut self, termination: impl Into<String>) -> Self {
        self.config.write_termination = termination.into();
        self
    }

    /// Set the read deadline.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    /// Assert end-of-message with the last byte of each write.
    pub fn send_end(mut self, enabled: bool) -> Self {
        self.config.send_end = enabled;
        self
    }

    /// Pause between the write and read of each query.
    pub fn query_delay(mut self, delay: Duration) -> Self {
        self.config.query_delay = delay;
        self
    }

    /// The configuration built so far.
    pub fn config(&self) -> &AdapterConfig {
        &self.config
    }

    /// Build the driver on an already-open transport.
    ///
    /// Fails with [`Error::InvalidConfig`] for a zero timeout,
    /// [`Error::NotConnected`] if the transport is closed, and
    /// [`Error::InvalidSpec`] if the model's tables are inconsistent.
    pub async fn build_with_transport(self, transport: Box<dyn Transport>) -> Result<D> {
        self.config.validate()?;
        if !transport.is_connected() {
            return Err(Error::NotConnected);
        }

        let adapter = Adapter::new(transport, self.config);
        debug!(instrument = %self.name, adapter = %adapter, "connected");
        D::from_instrument(Instrument::new(self.name, adapter))
    }
}

impl<D: Driver> Default for InstrumentBuilder<D> {
    fn default() -> Self {
        Self::new()
    }
}
