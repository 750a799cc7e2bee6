//! Conversion between logical property values and wire text.
//!
//! Every property is typed by its logical value (`bool`, `u64` hertz,
//! an instrument enum, ...). [`WireValue`] is the codec a property falls
//! back to when it has no value map: `to_wire` produces the text placed in
//! a command's slot and `from_wire` parses a reply line.
//!
//! Replies from legacy instruments are loosely formatted, so integer types
//! also accept integral floating-point replies (`+1.000000E+06`).

use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

/// A logical value that can be written to and read from an instrument.
///
/// `PartialEq` backs discrete-set validation, `PartialOrd` backs range
/// validation.
pub trait WireValue: Clone + PartialEq + PartialOrd + fmt::Debug + Send + Sync + 'static {
    /// Text substituted into a set command's slot.
    fn to_wire(&self) -> String;

    /// Parse a reply line (termination already stripped).
    fn from_wire(reply: &str) -> Result<Self>;

    /// Parse operator input, e.g. a command-line argument.
    ///
    /// Defaults to the wire syntax; failures are validation errors since no
    /// instrument was involved.
    fn parse_input(text: &str) -> Result<Self> {
        Self::from_wire(text).map_err(|_| {
            Error::Validation(format!(
                "cannot interpret {text:?} as {}",
                short_type_name::<Self>()
            ))
        })
    }

    /// Human-readable rendering of the value.
    fn to_text(&self) -> String {
        self.to_wire()
    }
}

/// Build the error for a reply that does not convert to `T`.
pub fn malformed<T>(reply: &str) -> Error {
    Error::MalformedReply(format!(
        "cannot convert {reply:?} to {}",
        short_type_name::<T>()
    ))
}

fn short_type_name<T>() -> &'static str {
    let full = std::any::type_name::<T>();
    full.rsplit("::").next().unwrap_or(full)
}

impl WireValue for bool {
    fn to_wire(&self) -> String {
        let token = if *self { "1" } else { "0" };
        token.to_string()
    }

    fn from_wire(reply: &str) -> Result<Self> {
        let s = reply.trim();
        match s.to_ascii_uppercase().as_str() {
            "ON" => return Ok(true),
            "OFF" => return Ok(false),
            _ => {}
        }
        let n: f64 = s.parse().map_err(|_| malformed::<bool>(reply))?;
        Ok(n != 0.0)
    }

    fn parse_input(text: &str) -> Result<Self> {
        match text.trim().to_ascii_lowercase().as_str() {
            "true" | "on" | "yes" | "1" => Ok(true),
            "false" | "off" | "no" | "0" => Ok(false),
            _ => Err(Error::Validation(format!("cannot interpret {text:?} as bool"))),
        }
    }

    fn to_text(&self) -> String {
        self.to_string()
    }
}

/// Parse an integer reply, accepting integral floats in any notation.
fn parse_integer<T>(reply: &str) -> Result<T>
where
    T: FromStr + TryFrom<i128>,
{
    let s = reply.trim();
    if let Ok(v) = s.parse::<T>() {
        return Ok(v);
    }
    let f: f64 = s.parse().map_err(|_| malformed::<T>(reply))?;
    if !f.is_finite() || f.fract() != 0.0 || f.abs() > i128::MAX as f64 {
        return Err(malformed::<T>(reply));
    }
    T::try_from(f as i128).map_err(|_| malformed::<T>(reply))
}

macro_rules! wire_integer {
    ($($t:ty),* $(,)?) => {
        $(
            impl WireValue for $t {
                fn to_wire(&self) -> String {
                    self.to_string()
                }

                fn from_wire(reply: &str) -> Result<Self> {
                    parse_integer(reply)
                }
            }
        )*
    };
}

wire_integer!(i8, i16, i32, i64, u8, u16, u32, u64, usize);

impl WireValue for f64 {
    fn to_wire(&self) -> String {
        self.to_string()
    }

    fn from_wire(reply: &str) -> Result<Self> {
        reply.trim().parse().map_err(|_| malformed::<f64>(reply))
    }
}

impl WireValue for String {
    fn to_wire(&self) -> String {
        self.clone()
    }

    fn from_wire(reply: &str) -> Result<Self> {
        Ok(reply.trim().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bool_wire_is_numeric() {
        assert_eq!(true.to_wire(), "1");
        assert_eq!(false.to_wire(), "0");
    }

    #[test]
    fn bool_from_wire_accepts_numbers_and_words() {
        assert!(bool::from_wire("1").unwrap());
        assert!(bool::from_wire(" +1.0 ").unwrap());
        assert!(!bool::from_wire("0").unwrap());
        assert!(bool::from_wire("ON").unwrap());
        assert!(!bool::from_wire("off").unwrap());
        assert!(bool::from_wire("maybe").unwrap_err().is_communication());
    }

    #[test]
    fn bool_parse_input_is_validation_error() {
        assert!(bool::parse_input("yes").unwrap());
        assert!(!bool::parse_input("False").unwrap());
        assert!(bool::parse_input("2").unwrap_err().is_validation());
    }

    #[test]
    fn integer_from_plain_reply() {
        assert_eq!(u64::from_wire("1000000").unwrap(), 1_000_000);
        assert_eq!(i32::from_wire("+42").unwrap(), 42);
        assert_eq!(i32::from_wire("-20").unwrap(), -20);
    }

    #[test]
    fn integer_from_scientific_reply() {
        assert_eq!(u64::from_wire("+1.0000000E+09").unwrap(), 1_000_000_000);
        assert_eq!(i64::from_wire("2.5e1").unwrap(), 25);
    }

    #[test]
    fn integer_rejects_fractional_and_out_of_range() {
        assert!(matches!(u64::from_wire("1.5"), Err(Error::MalformedReply(_))));
        assert!(matches!(u8::from_wire("300"), Err(Error::MalformedReply(_))));
        assert!(matches!(u64::from_wire("-1"), Err(Error::MalformedReply(_))));
        assert!(matches!(u32::from_wire("HZ"), Err(Error::MalformedReply(_))));
    }

    #[test]
    fn float_round_trip_text() {
        assert_eq!(0.5f64.to_wire(), "0.5");
        assert_eq!(f64::from_wire("1.234E+06\n").unwrap(), 1.234e6);
        assert!(f64::from_wire("").is_err());
    }

    #[test]
    fn string_is_trimmed() {
        assert_eq!(String::from_wire("  HP5384A ").unwrap(), "HP5384A");
        assert_eq!("DR HELLO".to_string().to_wire(), "DR HELLO");
    }

    #[test]
    fn malformed_message_names_the_type() {
        let err = u16::from_wire("abc").unwrap_err();
        assert_eq!(err.to_string(), "malformed reply: cannot convert \"abc\" to u16");
    }
}
