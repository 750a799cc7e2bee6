//! HP 5384A 225 MHz frequency counter.
//!
//! The 5384A streams its current reading: the `value` measurement has no
//! query and simply reads the next line the counter sends.

use std::fmt;

use instrlib_core::error::{Error, Result};
use instrlib_core::property::{DynProperty, Measurement, PropertySpec, Setting, measurement, setting};
use instrlib_core::wire::{WireValue, malformed};
use instrlib_message::{AdapterConfig, Driver, Instrument};

/// Longest text the front-panel display shows.
pub const DISPLAY_CHARS: usize = 20;

/// Measurement function.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Function {
    /// Frequency of input A.
    FreqA,
    /// Period of input A.
    PeriodA,
    /// Frequency of input B.
    FreqB,
}

impl Function {
    /// All functions in front-panel order.
    pub const ALL: [Function; 3] = [Function::FreqA, Function::PeriodA, Function::FreqB];

    /// Identifier used in text form (`"freq_a"`).
    pub fn as_str(self) -> &'static str {
        match self {
            Function::FreqA => "freq_a",
            Function::PeriodA => "period_a",
            Function::FreqB => "freq_b",
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl WireValue for Function {
    fn to_wire(&self) -> String {
        self.as_str().to_string()
    }

    fn from_wire(reply: &str) -> Result<Self> {
        let s = reply.trim();
        Function::ALL
            .into_iter()
            .find(|f| f.as_str().eq_ignore_ascii_case(s))
            .ok_or_else(|| malformed::<Function>(reply))
    }

    fn parse_input(text: &str) -> Result<Self> {
        Self::from_wire(text).map_err(|_| {
            Error::Validation(format!(
                "unknown function {text:?}, expected freq_a, period_a or freq_b"
            ))
        })
    }
}

fn display_process(text: String) -> String {
    text.chars().take(DISPLAY_CHARS).collect::<String>().to_uppercase()
}

/// Property table of the HP 5384A.
#[derive(Debug, Clone)]
pub struct Hp5384aProperties {
    /// Text shown on the display (up to 20 characters, upper-cased).
    pub display_text: PropertySpec<String, Setting>,
    /// Current reading in Hz (or seconds in period mode).
    pub value: PropertySpec<f64, Measurement>,
    /// Measurement function.
    pub function: PropertySpec<Function, Setting>,
    /// Identification string, always `HP5384A`.
    pub instrument_id: PropertySpec<String, Measurement>,
}

impl Hp5384aProperties {
    /// Build the table.
    pub fn new() -> Result<Self> {
        Ok(Hp5384aProperties {
            display_text: setting(
                "display_text",
                "DR{}",
                "Display up to 20 upper-case ASCII characters.",
            )
            .set_process(display_process)
            .build()?,
            value: measurement("value", "", "Current frequency measurement in Hz.").build()?,
            function: setting(
                "function",
                "{}",
                "Measurement function: freq_a, period_a or freq_b.",
            )
            .mapped([
                (Function::FreqA, "FU1"),
                (Function::PeriodA, "FU2"),
                (Function::FreqB, "FU3"),
            ])
            .build()?,
            instrument_id: measurement(
                "instrument_id",
                "ID",
                "Identification string. Returns HP5384A.",
            )
            .build()?,
        })
    }

    /// Every property as a type-erased catalog entry.
    pub fn into_catalog(self) -> Vec<Box<dyn DynProperty>> {
        vec![
            Box::new(self.display_text),
            Box::new(self.value),
            Box::new(self.function),
            Box::new(self.instrument_id),
        ]
    }
}

/// Driver for the HP 5384A frequency counter.
#[derive(Debug)]
pub struct Hp5384a {
    instrument: Instrument,
    props: Hp5384aProperties,
}

impl Driver for Hp5384a {
    const NAME: &'static str = "Hewlett-Packard 5384A";

    fn default_config() -> AdapterConfig {
        AdapterConfig {
            read_termination: "\r\n".into(),
            send_end: true,
            ..AdapterConfig::default()
        }
    }

    fn from_instrument(instrument: Instrument) -> Result<Self> {
        Ok(Hp5384a {
            instrument,
            props: Hp5384aProperties::new()?,
        })
    }
}

impl Hp5384a {
    /// The property table.
    pub fn properties(&self) -> &Hp5384aProperties {
        &self.props
    }

    /// The underlying instrument, for raw I/O.
    pub fn instrument_mut(&mut self) -> &mut Instrument {
        &mut self.instrument
    }

    /// Show `text` on the display.
    pub async fn set_display_text(&mut self, text: impl Into<String>) -> Result<()> {
        self.instrument.set(&self.props.display_text, text.into()).await
    }

    /// Read the current measurement.
    pub async fn value(&mut self) -> Result<f64> {
        self.instrument.get(&self.props.value).await
    }

    /// Select the measurement function.
    pub async fn set_function(&mut self, function: Function) -> Result<()> {
        self.instrument.set(&self.props.function, function).await
    }

    /// Read the identification string.
    pub async fn instrument_id(&mut self) -> Result<String> {
        self.instrument.get(&self.props.instrument_id).await
    }

    /// Release the transport.
    pub async fn close(&mut self) -> Result<()> {
        self.instrument.close().await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instrlib_message::InstrumentBuilder;
    use instrlib_test_harness::MockTransport;

    async fn counter(mock: MockTransport) -> Hp5384a {
        InstrumentBuilder::<Hp5384a>::new()
            .resource(3u8)
            .build_with_transport(Box::new(mock))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn instrument_id_query() {
        let mut mock = MockTransport::new();
        mock.expect(b"ID\n", b"HP5384A\r\n");
        let mut hp = counter(mock).await;
        assert_eq!(hp.instrument_id().await.unwrap(), "HP5384A");
    }

    #[tokio::test]
    async fn value_reads_without_query() {
        let mut mock = MockTransport::new();
        mock.expect_read(b" 1.0000000E+07\r\n");
        let mut hp = counter(mock).await;
        assert_eq!(hp.value().await.unwrap(), 1.0e7);
    }

    #[tokio::test]
    async fn display_text_is_truncated_and_uppercased() {
        let mut mock = MockTransport::new();
        mock.expect_write(b"DRTHE QUICK BROWN FOX \n");
        let mut hp = counter(mock).await;
        hp.set_display_text("the quick brown fox jumps").await.unwrap();
    }

    #[tokio::test]
    async fn function_sends_mapped_token() {
        let mut mock = MockTransport::new();
        mock.expect_write(b"FU1\n");
        mock.expect_write(b"FU2\n");
        mock.expect_write(b"FU3\n");
        let mut hp = counter(mock).await;
        for f in Function::ALL {
            hp.set_function(f).await.unwrap();
        }
    }

    #[test]
    fn function_mapping_is_a_bijection() {
        let props = Hp5384aProperties::new().unwrap();
        let map = props.function.value_map().unwrap();
        assert_eq!(map.len(), Function::ALL.len());
        for f in Function::ALL {
            let token = map.encode(&f).unwrap();
            assert_eq!(map.decode(token), Some(f));
        }
    }

    #[test]
    fn function_parses_operator_input() {
        assert_eq!(Function::parse_input("PERIOD_A").unwrap(), Function::PeriodA);
        assert!(Function::parse_input("freq_c").unwrap_err().is_validation());
    }

    #[test]
    fn defaults() {
        let config = Hp5384a::default_config();
        assert_eq!(config.read_termination, "\r\n");
        assert!(config.send_end);
    }

    #[test]
    fn catalog_lists_every_property() {
        let names: Vec<_> = Hp5384aProperties::new()
            .unwrap()
            .into_catalog()
            .iter()
            .map(|p| p.info().name)
            .collect();
        assert_eq!(names, ["display_text", "value", "function", "instrument_id"]);
    }
}
