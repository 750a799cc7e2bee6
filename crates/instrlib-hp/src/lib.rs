//! Hewlett-Packard legacy instrument drivers for instrlib.
//!
//! These instruments predate SCPI: each speaks a terse mnemonic command set
//! over GPIB. This crate provides, per model:
//!
//! - **Property table** -- the declarative [`PropertySpec`] list
//!   ([`Hp5384aProperties`], [`Hp8350xProperties`])
//! - **Driver** -- typed async accessors over an
//!   [`Instrument`](instrlib_message::Instrument) ([`Hp5384a`], [`Hp8350x`])
//! - **Status layout** -- where the instrument has one ([`hp8350x::STATUS`])
//!
//! Both models default to a `"\r\n"` read termination with end-of-message
//! asserted on writes.
//!
//! | Model    | Instrument                     | Properties | Status |
//! |----------|--------------------------------|------------|--------|
//! | HP 5384A | 225 MHz frequency counter      | 4          | no     |
//! | HP 8350X | 8350A/B sweep oscillator       | 14         | `OS`   |
//!
//! # Example
//!
//! ```
//! use instrlib_hp::hp8350x::Hp8350xProperties;
//!
//! let props = Hp8350xProperties::new().unwrap();
//! assert_eq!(props.center_frequency.encode(&1_000_000).unwrap(), "CF 1000000HZ");
//! ```
//!
//! [`PropertySpec`]: instrlib_core::PropertySpec

use std::fmt;
use std::str::FromStr;

use instrlib_core::error::{Error, Result};
use instrlib_core::property::DynProperty;
use instrlib_core::status::StatusRegister;

pub mod hp5384a;
pub mod hp8350x;

pub use hp5384a::{Hp5384a, Hp5384aProperties};
pub use hp8350x::{Hp8350x, Hp8350xProperties};

/// Supported models, for tooling that selects a model at runtime.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Model {
    /// HP 5384A frequency counter.
    Hp5384a,
    /// HP 8350A/B sweep oscillator.
    Hp8350x,
}

impl Model {
    /// All supported models.
    pub const ALL: [Model; 2] = [Model::Hp5384a, Model::Hp8350x];

    /// Short model name (`"hp8350x"`).
    pub fn name(self) -> &'static str {
        match self {
            Model::Hp5384a => "hp5384a",
            Model::Hp8350x => "hp8350x",
        }
    }

    /// The model's property catalog.
    pub fn catalog(self) -> Result<Vec<Box<dyn DynProperty>>> {
        Ok(match self {
            Model::Hp5384a => Hp5384aProperties::new()?.into_catalog(),
            Model::Hp8350x => Hp8350xProperties::new()?.into_catalog(),
        })
    }

    /// The model's status register, if it has one.
    pub fn status_register(self) -> Option<StatusRegister> {
        match self {
            Model::Hp5384a => None,
            Model::Hp8350x => Some(hp8350x::STATUS),
        }
    }
}

impl fmt::Display for Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl FromStr for Model {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "hp5384a" | "5384a" => Ok(Model::Hp5384a),
            "hp8350x" | "hp8350a" | "hp8350b" | "8350a" | "8350b" => Ok(Model::Hp8350x),
            _ => Err(Error::Unsupported(format!("unknown model {s:?}"))),
        }
    }
}
