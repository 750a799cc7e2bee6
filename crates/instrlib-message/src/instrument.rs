//! Generic property access.
//!
//! [`Instrument`] pairs an [`Adapter`] with a name and provides the single
//! accessor pair every instrument table goes through: [`Instrument::get`]
//! for readable properties and [`Instrument::set`] for writable ones. The
//! access kind is checked at compile time through the property's marker
//! type, so a measurement cannot be passed to `set`.
//!
//! ```ignore
//! let id = instrument.get(&props.instrument_id).await?;
//! instrument.set(&props.center_frequency, 1_000_000).await?;
//! ```

use std::fmt;

use tracing::debug;

use instrlib_core::error::{Error, Result};
use instrlib_core::property::{PropertySpec, Readable, Writable};
use instrlib_core::status::{StatusBits, StatusRegister};
use instrlib_core::wire::WireValue;

use crate::adapter::Adapter;

/// A named connection to one message-based instrument.
#[derive(Debug)]
pub struct Instrument {
    name: String,
    adapter: Adapter,
}

impl Instrument {
    /// Wrap an adapter.
    pub fn new(name: impl Into<String>, adapter: Adapter) -> Self {
        Instrument {
            name: name.into(),
            adapter,
        }
    }

    /// Instrument name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The framing adapter.
    pub fn adapter(&self) -> &Adapter {
        &self.adapter
    }

    /// Mutable access to the framing adapter, for raw I/O.
    pub fn adapter_mut(&mut self) -> &mut Adapter {
        &mut self.adapter
    }

    /// Read a property.
    ///
    /// Sends the property's query (nothing if it is empty), reads one reply
    /// line, and decodes it.
    pub async fn get<T, A>(&mut self, property: &PropertySpec<T, A>) -> Result<T>
    where
        T: WireValue,
        A: Readable,
    {
        let command = property.get_command().ok_or_else(|| {
            Error::Unsupported(format!("{} has no query command", property.name()))
        })?;

        let reply = if command.is_empty() {
            self.adapter.read().await?
        } else {
            self.adapter.query(command).await?
        };

        let value = property.decode(&reply)?;
        debug!(
            instrument = %self.name,
            property = property.name(),
            reply = reply.as_str(),
            value = ?value,
            "get"
        );
        Ok(value)
    }

    /// Write a property.
    ///
    /// The value is validated and encoded before anything is sent; a
    /// rejected value produces [`Error::Validation`] and no traffic.
    pub async fn set<T, A>(&mut self, property: &PropertySpec<T, A>, value: T) -> Result<()>
    where
        T: WireValue,
        A: Writable,
    {
        let command = property.encode(&value)?;
        debug!(
            instrument = %self.name,
            property = property.name(),
            value = ?value,
            command = command.as_str(),
            "set"
        );
        self.adapter.write(&command).await
    }

    /// Read and decode a status register.
    ///
    /// Sends the register's query and reads exactly its byte count.
    pub async fn read_status(&mut self, register: &StatusRegister) -> Result<StatusBits> {
        self.adapter.write(register.command).await?;
        let bytes = self.adapter.read_bytes(Some(register.byte_count), false).await?;
        let status = register.decode_bytes(&bytes)?;
        debug!(instrument = %self.name, status = %status, "status");
        Ok(status)
    }

    /// Send a raw command (termination added).
    pub async fn write(&mut self, command: &str) -> Result<()> {
        self.adapter.write(command).await
    }

    /// Read one raw reply line.
    pub async fn read(&mut self) -> Result<String> {
        self.adapter.read().await
    }

    /// Send a raw command and read one reply line.
    pub async fn query(&mut self, command: &str) -> Result<String> {
        self.adapter.query(command).await
    }

    /// Send a raw command and parse a separated list of numbers.
    pub async fn query_values(&mut self, command: &str, separator: char) -> Result<Vec<f64>> {
        self.adapter.query_values(command, separator).await
    }

    /// Release the transport.
    pub async fn close(&mut self) -> Result<()> {
        debug!(instrument = %self.name, "close");
        self.adapter.close().await
    }
}

impl fmt::Display for Instrument {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} via {}", self.name, self.adapter)
    }
}
