//! HP 8350A/B sweep oscillator.
//!
//! Every control reads back through an `OP` prefixed output command
//! (`OPCF` for the center frequency) and is written with the bare
//! mnemonic. Frequencies are sent in hertz with an explicit `HZ` unit.
//!
//! The `OS` command returns two raw bytes: the status byte followed by the
//! extended status byte. [`STATUS`] decodes them as one 16-bit word.

use tracing::debug;

use instrlib_core::error::{Error, Result};
use instrlib_core::property::{Control, DynProperty, PropertySpec, control};
use instrlib_core::status::{StatusBits, StatusField, StatusLayout, StatusRegister};
use instrlib_core::wire::{WireValue, malformed};
use instrlib_message::{AdapterConfig, Driver, Instrument};

const BOOL_MAPPINGS: [(bool, &str); 2] = [(true, "1"), (false, "0")];

/// Implements `WireValue` and `TryFrom<i64>` for a fieldless enum whose
/// discriminants are its wire codes.
macro_rules! numeric_enum {
    ($name:ident [$($variant:ident),+ $(,)?]) => {
        impl $name {
            /// All members in declaration order.
            pub const ALL: &'static [$name] = &[$($name::$variant),+];

            /// Numeric code sent on the wire.
            pub fn code(self) -> i64 {
                self as i64
            }
        }

        impl TryFrom<i64> for $name {
            type Error = Error;

            fn try_from(code: i64) -> Result<Self> {
                $name::ALL
                    .iter()
                    .copied()
                    .find(|m| m.code() == code)
                    .ok_or_else(|| {
                        Error::MalformedReply(format!(
                            "{code} is not a valid {}",
                            stringify!($name)
                        ))
                    })
            }
        }

        impl WireValue for $name {
            fn to_wire(&self) -> String {
                self.code().to_string()
            }

            fn from_wire(reply: &str) -> Result<Self> {
                let code = i64::from_wire(reply)?;
                $name::try_from(code).map_err(|_| malformed::<$name>(reply))
            }

            fn parse_input(text: &str) -> Result<Self> {
                let s = text.trim();
                if let Some(member) = $name::ALL
                    .iter()
                    .find(|m| format!("{m:?}").eq_ignore_ascii_case(s))
                {
                    return Ok(*member);
                }
                s.parse::<i64>()
                    .ok()
                    .and_then(|code| $name::try_from(code).ok())
                    .ok_or_else(|| {
                        Error::Validation(format!(
                            "cannot interpret {text:?} as {}",
                            stringify!($name)
                        ))
                    })
            }

            fn to_text(&self) -> String {
                format!("{self:?}")
            }
        }
    };
}

/// Leveling mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum LevelingMode {
    /// Internal leveling.
    Internal = 1,
    /// External crystal detector.
    ExternalCrystal = 2,
    /// External power meter.
    ExternalPowerMeter = 3,
}

numeric_enum!(LevelingMode [Internal, ExternalCrystal, ExternalPowerMeter]);

impl TryFrom<u32> for LevelingMode {
    type Error = Error;

    fn try_from(pattern: u32) -> Result<Self> {
        LevelingMode::try_from(i64::from(pattern))
    }
}

/// FM sensitivity in MHz/V.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FmSensitivity {
    /// -20 MHz/V.
    Neg20 = -20,
    /// -6 MHz/V.
    Neg6 = -6,
}

numeric_enum!(FmSensitivity [Neg20, Neg6]);

const LEVELING_MODES: &[(u32, &str)] = &[
    (1, "Internal"),
    (2, "ExternalCrystal"),
    (3, "ExternalPowerMeter"),
];

/// Bit layout of the `OS` reply: status byte in bits 8-15, extended status
/// byte in bits 0-7.
pub const STATUS_LAYOUT: StatusLayout = StatusLayout::new(
    "HP8350X status",
    16,
    &[
        // Status byte.
        StatusField::flag("sweep_started", 8),
        StatusField::flag("change_in_extended_status", 9),
        StatusField::flag("numeric_entry_completed", 10),
        StatusField::flag("any_front_panel_key_pressed", 11),
        StatusField::flag("end_of_sweep", 12),
        StatusField::flag("syntax_error", 13),
        StatusField::flag("request_service", 14),
        // Extended status byte.
        StatusField::flag("self_test_failed", 0),
        StatusField::flag("rf_unleveled", 1),
        StatusField::flag("power_failure", 2),
        StatusField::flag("rf_off", 3),
        StatusField::flag("plug_in_fault", 4),
        StatusField::enumeration("leveling_mode", 5, 2, LEVELING_MODES),
    ],
);

/// The `OS` status query.
pub const STATUS: StatusRegister = StatusRegister::new(STATUS_LAYOUT, "OS", 2);

fn with_hz(token: String) -> String {
    format!("{token}HZ")
}

fn toggle(
    name: &'static str,
    get: &'static str,
    set: &'static str,
    doc: &'static str,
) -> Result<PropertySpec<bool, Control>> {
    control(name, get, set, doc).mapped(BOOL_MAPPINGS).build()
}

fn frequency(
    name: &'static str,
    get: &'static str,
    set: &'static str,
    doc: &'static str,
) -> Result<PropertySpec<u64, Control>> {
    control(name, get, set, doc).set_process(with_hz).build()
}

/// Property table of the HP 8350A/B.
#[derive(Debug, Clone)]
pub struct Hp8350xProperties {
    /// Amplitude markers on or off.
    pub amplitude_marker_enabled: PropertySpec<bool, Control>,
    /// ALC leveling source.
    pub leveling_mode: PropertySpec<LevelingMode, Control>,
    /// Works with 83522/83525 plug-ins only.
    pub amplitude_crystal_marker_enabled: PropertySpec<bool, Control>,
    /// Works with 83522/83525 plug-ins only.
    pub intensity_crystal_marker_enabled: PropertySpec<bool, Control>,
    /// Hz. The valid range depends on the installed plug-in.
    pub center_frequency: PropertySpec<u64, Control>,
    /// Hz.
    pub delta_frequency: PropertySpec<u64, Control>,
    /// Front-panel display blanking.
    pub display_blanking_enabled: PropertySpec<bool, Control>,
    /// Whether the display follows remote changes.
    pub display_update_enabled: PropertySpec<bool, Control>,
    /// Hz. The valid range depends on the installed plug-in.
    pub start_frequency: PropertySpec<u64, Control>,
    /// Hz. The valid range depends on the installed plug-in.
    pub stop_frequency: PropertySpec<u64, Control>,
    /// CW filter on or off.
    pub cw_filter_enabled: PropertySpec<bool, Control>,
    /// External FM input sensitivity.
    pub fm_sensitivity: PropertySpec<FmSensitivity, Control>,
    /// External AM input on or off.
    pub am_enabled: PropertySpec<bool, Control>,
    /// Sweep between markers 1 and 2.
    pub marker_1_2_sweep_enabled: PropertySpec<bool, Control>,
}

impl Hp8350xProperties {
    /// Build the table.
    pub fn new() -> Result<Self> {
        Ok(Hp8350xProperties {
            amplitude_marker_enabled: toggle(
                "amplitude_marker_enabled",
                "OPAK",
                "AK{}",
                "Enable/disable the amplitude marker.",
            )?,
            leveling_mode: control("leveling_mode", "OPA", "A{}", "Select the leveling mode.")
                .discrete_set(LevelingMode::ALL.iter().copied())
                .build()?,
            amplitude_crystal_marker_enabled: toggle(
                "amplitude_crystal_marker_enabled",
                "OPCA",
                "CA{}",
                "Enable/disable the amplitude crystal marker (83522/83525 plug-ins only).",
            )?,
            intensity_crystal_marker_enabled: toggle(
                "intensity_crystal_marker_enabled",
                "OPCI",
                "CI{}",
                "Enable/disable the intensity crystal marker (83522/83525 plug-ins only).",
            )?,
            center_frequency: frequency(
                "center_frequency",
                "OPCF",
                "CF {}",
                "Center frequency in Hz.",
            )?,
            delta_frequency: frequency("delta_frequency", "OPDF", "DF {}", "Delta frequency in Hz.")?,
            display_blanking_enabled: toggle(
                "display_blanking_enabled",
                "OPDP",
                "DP{}",
                "Enable/disable display blanking.",
            )?,
            display_update_enabled: toggle(
                "display_update_enabled",
                "OPDU",
                "DU{}",
                "Enable/disable display updates.",
            )?,
            start_frequency: frequency(
                "start_frequency",
                "OPFA",
                "FA {}",
                "Start frequency in Hz.",
            )?,
            stop_frequency: frequency("stop_frequency", "OPFB", "FB {}", "Stop frequency in Hz.")?,
            cw_filter_enabled: toggle(
                "cw_filter_enabled",
                "OPFI",
                "FI{}",
                "Enable/disable the CW filter. Reduces residual FM; inactive in sweep modes.",
            )?,
            fm_sensitivity: control(
                "fm_sensitivity",
                "OPF",
                "F{}",
                "FM sensitivity: -20 or -6 MHz/V.",
            )
            .discrete_set(FmSensitivity::ALL.iter().copied())
            .build()?,
            am_enabled: toggle(
                "am_enabled",
                "OPMD",
                "MD{}",
                "Enable/disable amplitude modulation.",
            )?,
            marker_1_2_sweep_enabled: toggle(
                "marker_1_2_sweep_enabled",
                "OPMP",
                "MP{}",
                "Sweep between markers 1 and 2. On exit the original limits return.",
            )?,
        })
    }

    /// Every property as a type-erased catalog entry.
    pub fn into_catalog(self) -> Vec<Box<dyn DynProperty>> {
        vec![
            Box::new(self.amplitude_marker_enabled),
            Box::new(self.leveling_mode),
            Box::new(self.amplitude_crystal_marker_enabled),
            Box::new(self.intensity_crystal_marker_enabled),
            Box::new(self.center_frequency),
            Box::new(self.delta_frequency),
            Box::new(self.display_blanking_enabled),
            Box::new(self.display_update_enabled),
            Box::new(self.start_frequency),
            Box::new(self.stop_frequency),
            Box::new(self.cw_filter_enabled),
            Box::new(self.fm_sensitivity),
            Box::new(self.am_enabled),
            Box::new(self.marker_1_2_sweep_enabled),
        ]
    }
}

/// Driver for the HP 8350A/B sweep oscillator.
#[derive(Debug)]
pub struct Hp8350x {
    instrument: Instrument,
    props: Hp8350xProperties,
}

impl Driver for Hp8350x {
    const NAME: &'static str = "Hewlett-Packard 8350X";

    fn default_config() -> AdapterConfig {
        AdapterConfig {
            read_termination: "\r\n".into(),
            send_end: true,
            ..AdapterConfig::default()
        }
    }

    fn from_instrument(instrument: Instrument) -> Result<Self> {
        STATUS.validate()?;
        Ok(Hp8350x {
            instrument,
            props: Hp8350xProperties::new()?,
        })
    }
}

/// Generates a getter and a setter for each control.
macro_rules! accessors {
    ($($field:ident, $setter:ident: $ty:ty;)+) => {
        $(
            #[doc = concat!("Read `", stringify!($field), "`.")]
            pub async fn $field(&mut self) -> Result<$ty> {
                self.instrument.get(&self.props.$field).await
            }

            #[doc = concat!("Write `", stringify!($field), "`.")]
            pub async fn $setter(&mut self, value: $ty) -> Result<()> {
                self.instrument.set(&self.props.$field, value).await
            }
        )+
    };
}

impl Hp8350x {
    /// The property table.
    pub fn properties(&self) -> &Hp8350xProperties {
        &self.props
    }

    /// The underlying instrument, for raw I/O.
    pub fn instrument_mut(&mut self) -> &mut Instrument {
        &mut self.instrument
    }

    accessors! {
        amplitude_marker_enabled, set_amplitude_marker_enabled: bool;
        leveling_mode, set_leveling_mode: LevelingMode;
        amplitude_crystal_marker_enabled, set_amplitude_crystal_marker_enabled: bool;
        intensity_crystal_marker_enabled, set_intensity_crystal_marker_enabled: bool;
        center_frequency, set_center_frequency: u64;
        delta_frequency, set_delta_frequency: u64;
        display_blanking_enabled, set_display_blanking_enabled: bool;
        display_update_enabled, set_display_update_enabled: bool;
        start_frequency, set_start_frequency: u64;
        stop_frequency, set_stop_frequency: u64;
        cw_filter_enabled, set_cw_filter_enabled: bool;
        fm_sensitivity, set_fm_sensitivity: FmSensitivity;
        am_enabled, set_am_enabled: bool;
        marker_1_2_sweep_enabled, set_marker_1_2_sweep_enabled: bool;
    }

    /// Reset the instrument.
    pub async fn reset(&mut self) -> Result<()> {
        self.command("IP").await
    }

    /// Decrement the last-set parameter by one step.
    pub async fn decrement(&mut self) -> Result<()> {
        self.command("DN").await
    }

    /// Increment the last-set parameter by one step.
    pub async fn increment(&mut self) -> Result<()> {
        self.command("UP").await
    }

    /// Move the marker to the center frequency.
    pub async fn set_marker_to_center_frequency(&mut self) -> Result<()> {
        self.command("MC").await
    }

    /// Read and decode the status and extended status bytes.
    pub async fn status(&mut self) -> Result<StatusBits> {
        self.instrument.read_status(&STATUS).await
    }

    /// Release the transport.
    pub async fn close(&mut self) -> Result<()> {
        self.instrument.close().await
    }

    async fn command(&mut self, mnemonic: &str) -> Result<()> {
        debug!(command = mnemonic, "instrument command");
        self.instrument.write(mnemonic).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use instrlib_message::InstrumentBuilder;
    use instrlib_test_harness::MockTransport;

    async fn sweeper(mock: MockTransport) -> Hp8350x {
        InstrumentBuilder::<Hp8350x>::new()
            .resource(19u8)
            .build_with_transport(Box::new(mock))
            .await
            .unwrap()
    }

    // ---------------------------------------------------------------
    // Writes
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn center_frequency_sends_hz() {
        let mut mock = MockTransport::new();
        mock.expect_write(b"CF 1000000HZ\n");
        let mut hp = sweeper(mock).await;
        hp.set_center_frequency(1_000_000).await.unwrap();
    }

    #[tokio::test]
    async fn frequency_controls_share_format() {
        let mut mock = MockTransport::new();
        mock.expect_write(b"DF 5000HZ\n");
        mock.expect_write(b"FA 2000000000HZ\n");
        mock.expect_write(b"FB 8000000000HZ\n");
        let mut hp = sweeper(mock).await;
        hp.set_delta_frequency(5_000).await.unwrap();
        hp.set_start_frequency(2_000_000_000).await.unwrap();
        hp.set_stop_frequency(8_000_000_000).await.unwrap();
    }

    #[tokio::test]
    async fn amplitude_marker_sends_mapped_token() {
        let mut mock = MockTransport::new();
        mock.expect_write(b"AK1\n");
        mock.expect_write(b"AK0\n");
        let mut hp = sweeper(mock).await;
        hp.set_amplitude_marker_enabled(true).await.unwrap();
        hp.set_amplitude_marker_enabled(false).await.unwrap();
    }

    #[tokio::test]
    async fn enum_controls_send_codes() {
        let mut mock = MockTransport::new();
        mock.expect_write(b"A3\n");
        mock.expect_write(b"F-20\n");
        let mut hp = sweeper(mock).await;
        hp.set_leveling_mode(LevelingMode::ExternalPowerMeter).await.unwrap();
        hp.set_fm_sensitivity(FmSensitivity::Neg20).await.unwrap();
    }

    #[tokio::test]
    async fn commands() {
        let mut mock = MockTransport::new();
        for cmd in [b"IP\n", b"DN\n", b"UP\n", b"MC\n"] {
            mock.expect_write(cmd);
        }
        let mut hp = sweeper(mock).await;
        hp.reset().await.unwrap();
        hp.decrement().await.unwrap();
        hp.increment().await.unwrap();
        hp.set_marker_to_center_frequency().await.unwrap();
    }

    // ---------------------------------------------------------------
    // Reads
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn discrete_controls_round_trip_fixture_replies() {
        let mut mock = MockTransport::new();
        mock.expect(b"OPA\n", b"2\r\n");
        mock.expect(b"OPF\n", b"-6\r\n");
        mock.expect(b"OPMD\n", b"1\r\n");
        let mut hp = sweeper(mock).await;
        assert_eq!(hp.leveling_mode().await.unwrap(), LevelingMode::ExternalCrystal);
        assert_eq!(hp.fm_sensitivity().await.unwrap(), FmSensitivity::Neg6);
        assert!(hp.am_enabled().await.unwrap());
    }

    #[tokio::test]
    async fn every_discrete_value_round_trips() {
        const TOGGLES: [(&str, &str); 8] = [
            ("AK", "OPAK"),
            ("CA", "OPCA"),
            ("CI", "OPCI"),
            ("DP", "OPDP"),
            ("DU", "OPDU"),
            ("FI", "OPFI"),
            ("MD", "OPMD"),
            ("MP", "OPMP"),
        ];

        let mut mock = MockTransport::new();
        for mode in LevelingMode::ALL {
            let code = mode.code();
            mock.expect_write(format!("A{code}\n").as_bytes());
            mock.expect(b"OPA\n", format!("{code}\r\n").as_bytes());
        }
        for sensitivity in FmSensitivity::ALL {
            let code = sensitivity.code();
            mock.expect_write(format!("F{code}\n").as_bytes());
            mock.expect(b"OPF\n", format!("{code}\r\n").as_bytes());
        }
        for (set, get) in TOGGLES {
            for token in ["1", "0"] {
                mock.expect_write(format!("{set}{token}\n").as_bytes());
                mock.expect(format!("{get}\n").as_bytes(), format!("{token}\r\n").as_bytes());
            }
        }
        let log = mock.send_log();
        let mut hp = sweeper(mock).await;

        for &mode in LevelingMode::ALL {
            hp.set_leveling_mode(mode).await.unwrap();
            assert_eq!(hp.leveling_mode().await.unwrap(), mode);
        }
        for &sensitivity in FmSensitivity::ALL {
            hp.set_fm_sensitivity(sensitivity).await.unwrap();
            assert_eq!(hp.fm_sensitivity().await.unwrap(), sensitivity);
        }

        // Same order as TOGGLES.
        let props = hp.properties().clone();
        for p in [
            &props.amplitude_marker_enabled,
            &props.amplitude_crystal_marker_enabled,
            &props.intensity_crystal_marker_enabled,
            &props.display_blanking_enabled,
            &props.display_update_enabled,
            &props.cw_filter_enabled,
            &props.am_enabled,
            &props.marker_1_2_sweep_enabled,
        ] {
            for value in [true, false] {
                hp.instrument_mut().set(p, value).await.unwrap();
                assert_eq!(hp.instrument_mut().get(p).await.unwrap(), value, "{}", p.name());
            }
        }

        let expected = 2 * (LevelingMode::ALL.len() + FmSensitivity::ALL.len() + 2 * TOGGLES.len());
        assert_eq!(log.len(), expected);
    }

    #[tokio::test]
    async fn frequency_reply_in_scientific_notation() {
        let mut mock = MockTransport::new();
        mock.expect(b"OPCF\n", b"+5.000000000E+09\r\n");
        let mut hp = sweeper(mock).await;
        assert_eq!(hp.center_frequency().await.unwrap(), 5_000_000_000);
    }

    #[tokio::test]
    async fn unknown_enum_reply_is_malformed() {
        let mut mock = MockTransport::new();
        mock.expect(b"OPA\n", b"7\r\n");
        let mut hp = sweeper(mock).await;
        assert!(matches!(hp.leveling_mode().await, Err(Error::MalformedReply(_))));
    }

    // ---------------------------------------------------------------
    // Status
    // ---------------------------------------------------------------

    #[tokio::test]
    async fn status_decodes_both_bytes() {
        let mut mock = MockTransport::new();
        mock.expect(b"OS\n", &[0b0001_0001, 0b0010_1010]);
        let mut hp = sweeper(mock).await;

        let status = hp.status().await.unwrap();
        assert_eq!(status.flag("sweep_started"), Some(true));
        assert_eq!(status.flag("end_of_sweep"), Some(true));
        assert_eq!(status.flag("syntax_error"), Some(false));
        assert_eq!(status.flag("rf_unleveled"), Some(true));
        assert_eq!(status.flag("rf_off"), Some(true));
        assert_eq!(
            status.enumeration::<LevelingMode>("leveling_mode").unwrap(),
            LevelingMode::Internal
        );
    }

    #[tokio::test]
    async fn status_with_undefined_leveling_pattern_fails() {
        let mut mock = MockTransport::new();
        mock.expect(b"OS\n", &[0x00, 0x00]);
        let mut hp = sweeper(mock).await;
        assert!(hp.status().await.unwrap_err().is_decode());
    }

    #[test]
    fn status_decode_is_deterministic() {
        STATUS_LAYOUT.validate().unwrap();
        let raw = 0x4062;
        assert_eq!(STATUS_LAYOUT.decode(raw).unwrap(), STATUS_LAYOUT.decode(raw).unwrap());
    }

    // ---------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------

    #[test]
    fn every_toggle_is_a_bijection() {
        let props = Hp8350xProperties::new().unwrap();
        for p in [
            &props.amplitude_marker_enabled,
            &props.amplitude_crystal_marker_enabled,
            &props.intensity_crystal_marker_enabled,
            &props.display_blanking_enabled,
            &props.display_update_enabled,
            &props.cw_filter_enabled,
            &props.am_enabled,
            &props.marker_1_2_sweep_enabled,
        ] {
            let map = p.value_map().unwrap();
            for value in [true, false] {
                let token = map.encode(&value).unwrap();
                assert_eq!(map.decode(token), Some(value), "{}", p.name());
                assert_eq!(p.decode(token).unwrap(), value);
            }
        }
    }

    #[test]
    fn enum_input_accepts_names_and_codes() {
        assert_eq!(LevelingMode::parse_input("internal").unwrap(), LevelingMode::Internal);
        assert_eq!(FmSensitivity::parse_input("-6").unwrap(), FmSensitivity::Neg6);
        assert!(FmSensitivity::parse_input("-7").unwrap_err().is_validation());
    }

    #[test]
    fn invalid_operator_input_is_rejected() {
        let catalog = Hp8350xProperties::new().unwrap().into_catalog();
        let find = |name: &str| catalog.iter().find(|p| p.info().name == name).unwrap();
        assert!(find("leveling_mode").encode_text("4").unwrap_err().is_validation());
        assert!(find("fm_sensitivity").encode_text("-7").unwrap_err().is_validation());
        assert!(find("am_enabled").encode_text("2").unwrap_err().is_validation());
        assert_eq!(find("leveling_mode").encode_text("2").unwrap(), "A2");
        assert_eq!(find("center_frequency").encode_text("1e6").unwrap(), "CF 1000000HZ");
    }

    #[test]
    fn catalog_has_every_control() {
        let catalog = Hp8350xProperties::new().unwrap().into_catalog();
        assert_eq!(catalog.len(), 14);
        assert!(catalog.iter().all(|p| p.info().kind.is_readable() && p.info().kind.is_writable()));
    }
}
