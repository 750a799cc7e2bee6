//! Declarative property descriptors.
//!
//! An instrument is described by a table of [`PropertySpec`]s, one per
//! controllable or measurable value. Each spec carries the command text to
//! read the value, the template to write it, the validator that guards
//! writes, and an optional value map between logical values and wire tokens.
//! The I/O itself lives in `instrlib-message`; everything here is pure, so a
//! spec can be checked and exercised without an instrument attached.
//!
//! Specs are created with one of three constructors:
//!
//! - [`measurement`] -- read-only (`get_command` only)
//! - [`setting`] -- write-only (`set_command` only)
//! - [`control`] -- read/write
//!
//! The access kind is part of the type (`PropertySpec<T, Measurement>`), so
//! writing a measurement or reading a setting does not compile.
//!
//! # Write path
//!
//! ```text
//! value ─► validator ─► value map / WireValue::to_wire ─► set_process ─► template slot
//! ```
//!
//! # Read path
//!
//! ```text
//! reply line ─► get_process ─► value map (reverse) / WireValue::from_wire ─► value
//! ```
//!
//! # Example
//!
//! ```
//! use instrlib_core::property::control;
//!
//! let marker = control::<bool>("amplitude_marker_enabled", "OPAK", "AK{}", "Amplitude marker.")
//!     .mapped([(true, "1"), (false, "0")])
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(marker.encode(&true).unwrap(), "AK1");
//! assert!(!marker.decode("0").unwrap());
//! ```

use std::fmt;
use std::marker::PhantomData;

use crate::error::{Error, Result};
use crate::wire::WireValue;

/// The placeholder a set command's value is substituted into.
pub const SLOT: &str = "{}";

/// Transform applied to a reply line before it is decoded.
pub type GetProcess = fn(&str) -> String;

/// Transform applied to the wire token before it is placed in the template.
pub type SetProcess = fn(String) -> String;

// ---------------------------------------------------------------
// Access kinds
// ---------------------------------------------------------------

/// Whether a property can be read, written, or both.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AccessKind {
    /// Read-only.
    Measurement,
    /// Write-only.
    Setting,
    /// Read/write.
    Control,
}

impl AccessKind {
    /// True for measurements and controls.
    pub fn is_readable(self) -> bool {
        matches!(self, AccessKind::Measurement | AccessKind::Control)
    }

    /// True for settings and controls.
    pub fn is_writable(self) -> bool {
        matches!(self, AccessKind::Setting | AccessKind::Control)
    }
}

impl fmt::Display for AccessKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            AccessKind::Measurement => "measurement",
            AccessKind::Setting => "setting",
            AccessKind::Control => "control",
        };
        write!(f, "{s}")
    }
}

/// Type-level access marker carried by every [`PropertySpec`].
pub trait Access: fmt::Debug + Clone + Send + Sync + 'static {
    /// The runtime kind this marker stands for.
    const KIND: AccessKind;
}

/// Marker for access kinds that can be read.
pub trait Readable: Access {}

/// Marker for access kinds that can be written.
pub trait Writable: Access {}

/// Read-only access marker.
#[derive(Debug, Clone, Copy)]
pub struct Measurement;

/// Write-only access marker.
#[derive(Debug, Clone, Copy)]
pub struct Setting;

/// Read/write access marker.
#[derive(Debug, Clone, Copy)]
pub struct Control;

impl Access for Measurement {
    const KIND: AccessKind = AccessKind::Measurement;
}
impl Access for Setting {
    const KIND: AccessKind = AccessKind::Setting;
}
impl Access for Control {
    const KIND: AccessKind = AccessKind::Control;
}

impl Readable for Measurement {}
impl Readable for Control {}
impl Writable for Setting {}
impl Writable for Control {}

// ---------------------------------------------------------------
// Validators
// ---------------------------------------------------------------

/// Check applied to a value before it is written.
#[derive(Debug, Clone, PartialEq)]
pub enum Validator<T> {
    /// Accept any value of the logical type.
    Any,
    /// The value must equal one member of the set.
    DiscreteSet(Vec<T>),
    /// The value must satisfy `min <= value <= max`. Values that do not
    /// compare (NaN) are rejected.
    Range {
        /// Inclusive lower bound.
        min: T,
        /// Inclusive upper bound.
        max: T,
    },
}

impl<T: WireValue> Validator<T> {
    /// True if `value` passes this validator.
    pub fn accepts(&self, value: &T) -> bool {
        match self {
            Validator::Any => true,
            Validator::DiscreteSet(members) => members.contains(value),
            Validator::Range { min, max } => min <= value && value <= max,
        }
    }

    /// Check `value`, naming `property` in the error.
    pub fn check(&self, property: &str, value: &T) -> Result<()> {
        if self.accepts(value) {
            return Ok(());
        }
        let allowed = self.describe().unwrap_or_default();
        Err(Error::Validation(format!(
            "{property}: {} is not {allowed}",
            value.to_text()
        )))
    }

    /// Human-readable description of the allowed values, if restricted.
    pub fn describe(&self) -> Option<String> {
        match self {
            Validator::Any => None,
            Validator::DiscreteSet(members) => {
                let list: Vec<String> = members.iter().map(WireValue::to_text).collect();
                Some(format!("one of [{}]", list.join(", ")))
            }
            Validator::Range { min, max } => {
                Some(format!("in range {}..={}", min.to_text(), max.to_text()))
            }
        }
    }
}

// ---------------------------------------------------------------
// Value maps
// ---------------------------------------------------------------

/// Bijection between logical values and the wire tokens that stand for them.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueMap<T> {
    entries: Vec<(T, String)>,
}

impl<T: WireValue> ValueMap<T> {
    /// Build a map from `(logical, token)` pairs.
    ///
    /// Injectivity is checked when the owning property is built.
    pub fn new<I, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (T, S)>,
        S: Into<String>,
    {
        ValueMap {
            entries: pairs.into_iter().map(|(v, t)| (v, t.into())).collect(),
        }
    }

    /// The wire token for `value`, if mapped.
    pub fn encode(&self, value: &T) -> Option<&str> {
        self.entries
            .iter()
            .find(|(v, _)| v == value)
            .map(|(_, token)| token.as_str())
    }

    /// The logical value for a reply token.
    ///
    /// Surrounding whitespace is ignored, and numeric tokens match any
    /// numerically equal reply (`"+1.0"` matches `"1"`).
    pub fn decode(&self, reply: &str) -> Option<T> {
        let reply = reply.trim();
        if let Some((v, _)) = self.entries.iter().find(|(_, token)| token == reply) {
            return Some(v.clone());
        }
        let reply_num = numeric_token(reply)?;
        self.entries
            .iter()
            .find(|(_, token)| numeric_token(token) == Some(reply_num))
            .map(|(v, _)| v.clone())
    }

    /// Logical values in declaration order.
    pub fn keys(&self) -> impl Iterator<Item = &T> {
        self.entries.iter().map(|(v, _)| v)
    }

    /// `(logical, token)` pairs in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&T, &str)> {
        self.entries.iter().map(|(v, t)| (v, t.as_str()))
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// True if the map has no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn check_injective(&self, property: &str) -> Result<()> {
        for (i, (value, token)) in self.entries.iter().enumerate() {
            if token.trim().is_empty() {
                return Err(Error::InvalidSpec(format!(
                    "{property}: {value:?} maps to an empty token"
                )));
            }
            for (other_value, other_token) in &self.entries[i + 1..] {
                if other_value == value {
                    return Err(Error::InvalidSpec(format!(
                        "{property}: {value:?} is mapped twice"
                    )));
                }
                if other_token.trim() == token.trim() {
                    return Err(Error::InvalidSpec(format!(
                        "{property}: token {token:?} stands for both {value:?} and {other_value:?}"
                    )));
                }
                if numeric_token(token).is_some_and(|n| numeric_token(other_token) == Some(n)) {
                    return Err(Error::InvalidSpec(format!(
                        "{property}: tokens {token:?} and {other_token:?} are numerically equal"
                    )));
                }
            }
        }
        Ok(())
    }
}

fn numeric_token(token: &str) -> Option<f64> {
    token.trim().parse::<f64>().ok().filter(|n| !n.is_nan())
}

// ---------------------------------------------------------------
// Property specs
// ---------------------------------------------------------------

/// Immutable description of one instrument property.
///
/// Built through [`measurement`], [`setting`], or [`control`] and
/// [`PropertyBuilder::build`]. Cheap to clone and safe to share between
/// instruments of the same model.
#[derive(Debug, Clone)]
pub struct PropertySpec<T, A> {
    name: &'static str,
    doc: &'static str,
    get_command: Option<&'static str>,
    set_command: Option<&'static str>,
    validator: Validator<T>,
    value_map: Option<ValueMap<T>>,
    get_process: Option<GetProcess>,
    set_process: Option<SetProcess>,
    access: PhantomData<A>,
}

impl<T: WireValue, A: Access> PropertySpec<T, A> {
    /// Property name (e.g. `"center_frequency"`).
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// Documentation string.
    pub fn doc(&self) -> &'static str {
        self.doc
    }

    /// Access kind.
    pub fn kind(&self) -> AccessKind {
        A::KIND
    }

    /// Query command, if readable. May be empty: the reply is then read
    /// without sending anything first.
    pub fn get_command(&self) -> Option<&'static str> {
        self.get_command
    }

    /// Set command template, if writable.
    pub fn set_command(&self) -> Option<&'static str> {
        self.set_command
    }

    /// Validator guarding writes.
    pub fn validator(&self) -> &Validator<T> {
        &self.validator
    }

    /// Value map, if the property is mapped.
    pub fn value_map(&self) -> Option<&ValueMap<T>> {
        self.value_map.as_ref()
    }

    /// Static description of this property.
    pub fn info(&self) -> PropertyInfo {
        PropertyInfo {
            name: self.name,
            doc: self.doc,
            kind: A::KIND,
            get_command: self.get_command,
            set_command: self.set_command,
            allowed: self.validator.describe(),
            mapped: self.value_map.is_some(),
        }
    }

    fn encode_value(&self, value: &T) -> Result<String> {
        let template = self
            .set_command
            .ok_or_else(|| Error::Unsupported(format!("{} is read-only", self.name)))?;

        self.validator.check(self.name, value)?;

        let token = match &self.value_map {
            Some(map) => map
                .encode(value)
                .ok_or_else(|| {
                    Error::Validation(format!("{}: {} is not mapped", self.name, value.to_text()))
                })?
                .to_string(),
            None => value.to_wire(),
        };
        let token = match self.set_process {
            Some(process) => process(token),
            None => token,
        };
        Ok(template.replacen(SLOT, &token, 1))
    }

    fn decode_reply(&self, reply: &str) -> Result<T> {
        if self.get_command.is_none() {
            return Err(Error::Unsupported(format!("{} is write-only", self.name)));
        }

        let processed;
        let text = match self.get_process {
            Some(process) => {
                processed = process(reply);
                processed.as_str()
            }
            None => reply,
        };

        match &self.value_map {
            Some(map) => map.decode(text).ok_or_else(|| {
                Error::MalformedReply(format!(
                    "{}: reply {text:?} matches no mapped value",
                    self.name
                ))
            }),
            None => T::from_wire(text),
        }
    }
}

impl<T: WireValue, A: Writable> PropertySpec<T, A> {
    /// Validate `value` and produce the exact command text to send
    /// (without line termination).
    ///
    /// Fails with [`Error::Validation`] if the validator rejects the value.
    pub fn encode(&self, value: &T) -> Result<String> {
        self.encode_value(value)
    }
}

impl<T: WireValue, A: Readable> PropertySpec<T, A> {
    /// Convert a reply line into the logical value.
    ///
    /// Fails with [`Error::MalformedReply`] if the reply does not convert.
    pub fn decode(&self, reply: &str) -> Result<T> {
        self.decode_reply(reply)
    }
}

// ---------------------------------------------------------------
// Constructors and builder
// ---------------------------------------------------------------

/// Declare a read-only property.
///
/// An empty `get_command` means the reply is read without sending a query
/// (instruments that stream their reading).
pub fn measurement<T: WireValue>(
    name: &'static str,
    get_command: &'static str,
    doc: &'static str,
) -> PropertyBuilder<T, Measurement> {
    PropertyBuilder::new(name, doc, Some(get_command), None)
}

/// Declare a write-only property. `set_command` must contain one `{}` slot.
pub fn setting<T: WireValue>(
    name: &'static str,
    set_command: &'static str,
    doc: &'static str,
) -> PropertyBuilder<T, Setting> {
    PropertyBuilder::new(name, doc, None, Some(set_command))
}

/// Declare a read/write property. `set_command` must contain one `{}` slot.
pub fn control<T: WireValue>(
    name: &'static str,
    get_command: &'static str,
    set_command: &'static str,
    doc: &'static str,
) -> PropertyBuilder<T, Control> {
    PropertyBuilder::new(name, doc, Some(get_command), Some(set_command))
}

/// Fluent builder for [`PropertySpec`].
///
/// [`build`](PropertyBuilder::build) checks the declaration's invariants,
/// so a spec that exists is one whose validator accepts exactly the values
/// its map can encode.
#[derive(Debug, Clone)]
pub struct PropertyBuilder<T, A> {
    spec: PropertySpec<T, A>,
}

impl<T: WireValue, A: Access> PropertyBuilder<T, A> {
    fn new(
        name: &'static str,
        doc: &'static str,
        get_command: Option<&'static str>,
        set_command: Option<&'static str>,
    ) -> Self {
        PropertyBuilder {
            spec: PropertySpec {
                name,
                doc,
                get_command,
                set_command,
                validator: Validator::Any,
                value_map: None,
                get_process: None,
                set_process: None,
                access: PhantomData,
            },
        }
    }

    /// Restrict writes to the given values.
    pub fn discrete_set(mut self, values: impl IntoIterator<Item = T>) -> Self {
        self.spec.validator = Validator::DiscreteSet(values.into_iter().collect());
        self
    }

    /// Restrict writes to `min..=max`.
    pub fn range(mut self, min: T, max: T) -> Self {
        self.spec.validator = Validator::Range { min, max };
        self
    }

    /// Install an explicit validator.
    pub fn validator(mut self, validator: Validator<T>) -> Self {
        self.spec.validator = validator;
        self
    }

    /// Map logical values to wire tokens and restrict writes to the mapped
    /// values.
    pub fn mapped<S: Into<String>>(mut self, pairs: impl IntoIterator<Item = (T, S)>) -> Self {
        let map = ValueMap::new(pairs);
        self.spec.validator = Validator::DiscreteSet(map.keys().cloned().collect());
        self.spec.value_map = Some(map);
        self
    }

    /// Install a value map without touching the validator.
    ///
    /// On a writable property the validator must then be a discrete set over
    /// exactly the map's keys, or `build()` fails.
    pub fn value_map(mut self, map: ValueMap<T>) -> Self {
        self.spec.value_map = Some(map);
        self
    }

    /// Transform each reply line before decoding.
    pub fn get_process(mut self, process: GetProcess) -> Self {
        self.spec.get_process = Some(process);
        self
    }

    /// Transform the wire token before it enters the template.
    pub fn set_process(mut self, process: SetProcess) -> Self {
        self.spec.set_process = Some(process);
        self
    }

    /// Check the declaration and produce the immutable spec.
    ///
    /// Fails with [`Error::InvalidSpec`] if:
    /// - the name is empty, or a query command contains a slot
    /// - a set template does not contain exactly one `{}` slot
    /// - a measurement declares a validator
    /// - a range has `min > max`, or a discrete set is empty
    /// - a value map is not injective, or on a writable property its keys
    ///   differ from the validator's discrete set
    pub fn build(self) -> Result<PropertySpec<T, A>> {
        let spec = self.spec;
        let name = spec.name;
        let invalid = |reason: String| Err(Error::InvalidSpec(format!("{name}: {reason}")));

        if name.is_empty() {
            return Err(Error::InvalidSpec("property name is empty".into()));
        }

        if let Some(get) = spec.get_command {
            if get.contains(SLOT) {
                return invalid(format!("query command {get:?} contains a slot"));
            }
        }

        if let Some(set) = spec.set_command {
            let slots = set.matches(SLOT).count();
            if slots != 1 {
                return invalid(format!("set command {set:?} has {slots} slots, expected 1"));
            }
        }

        match &spec.validator {
            Validator::Any => {}
            _ if !A::KIND.is_writable() => {
                return invalid("a measurement cannot validate writes".into());
            }
            Validator::DiscreteSet(members) if members.is_empty() => {
                return invalid("discrete set is empty".into());
            }
            Validator::Range { min, max } if !(min <= max) => {
                return invalid(format!(
                    "range {}..={} is empty",
                    min.to_text(),
                    max.to_text()
                ));
            }
            _ => {}
        }

        if let Some(map) = &spec.value_map {
            if map.is_empty() {
                return invalid("value map is empty".into());
            }
            map.check_injective(name)?;

            if A::KIND.is_writable() {
                let Validator::DiscreteSet(members) = &spec.validator else {
                    return invalid("a mapped property must validate against the map's keys".into());
                };
                if let Some(key) = map.keys().find(|k| !members.contains(k)) {
                    return invalid(format!("mapped value {} is not allowed", key.to_text()));
                }
                if let Some(member) = members.iter().find(|m| map.encode(m).is_none()) {
                    return invalid(format!("allowed value {} has no mapping", member.to_text()));
                }
            }
        }

        Ok(spec)
    }
}

// ---------------------------------------------------------------
// Type-erased view
// ---------------------------------------------------------------

/// Static description of a property, independent of its value type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropertyInfo {
    /// Property name.
    pub name: &'static str,
    /// Documentation string.
    pub doc: &'static str,
    /// Access kind.
    pub kind: AccessKind,
    /// Query command, if readable.
    pub get_command: Option<&'static str>,
    /// Set command template, if writable.
    pub set_command: Option<&'static str>,
    /// Description of the allowed values, if restricted.
    pub allowed: Option<String>,
    /// Whether values go through a value map.
    pub mapped: bool,
}

impl fmt::Display for PropertyInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.name, self.kind)?;
        if let Some(get) = self.get_command {
            write!(f, " get={get:?}")?;
        }
        if let Some(set) = self.set_command {
            write!(f, " set={set:?}")?;
        }
        if let Some(allowed) = &self.allowed {
            write!(f, " {allowed}")?;
        }
        Ok(())
    }
}

/// Object-safe view over any [`PropertySpec`], for catalogs and tooling
/// that handle properties of mixed value types.
pub trait DynProperty: Send + Sync {
    /// Static description.
    fn info(&self) -> PropertyInfo;

    /// Parse operator input and produce the command text a write would send.
    fn encode_text(&self, input: &str) -> Result<String>;

    /// Decode a reply line and render the value as text.
    fn decode_text(&self, reply: &str) -> Result<String>;
}

impl<T: WireValue, A: Access> DynProperty for PropertySpec<T, A> {
    fn info(&self) -> PropertyInfo {
        PropertySpec::info(self)
    }

    fn encode_text(&self, input: &str) -> Result<String> {
        if !A::KIND.is_writable() {
            return Err(Error::Unsupported(format!("{} is read-only", self.name)));
        }
        let value = T::parse_input(input)?;
        self.encode_value(&value)
    }

    fn decode_text(&self, reply: &str) -> Result<String> {
        self.decode_reply(reply).map(|v| v.to_text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BOOL_MAP: [(bool, &str); 2] = [(true, "1"), (false, "0")];

    fn with_hz(token: String) -> String {
        format!("{token}HZ")
    }

    fn upper_20(token: String) -> String {
        token.chars().take(20).collect::<String>().to_uppercase()
    }

    fn strip_hz(reply: &str) -> String {
        reply.trim().trim_end_matches("HZ").to_string()
    }

    // ---------------------------------------------------------------
    // Encoding
    // ---------------------------------------------------------------

    #[test]
    fn mapped_bool_encodes_token() {
        let p = control::<bool>("amplitude_marker_enabled", "OPAK", "AK{}", "")
            .mapped(BOOL_MAP)
            .build()
            .unwrap();
        assert_eq!(p.encode(&true).unwrap(), "AK1");
        assert_eq!(p.encode(&false).unwrap(), "AK0");
    }

    #[test]
    fn set_process_runs_after_to_wire() {
        let p = control::<u64>("center_frequency", "OPCF", "CF {}", "")
            .set_process(with_hz)
            .build()
            .unwrap();
        assert_eq!(p.encode(&1_000_000).unwrap(), "CF 1000000HZ");
    }

    #[test]
    fn set_process_runs_after_mapping() {
        fn quoted(token: String) -> String {
            format!("'{token}'")
        }
        let p = setting::<bool>("x", "X {}", "")
            .mapped([(true, "ON"), (false, "OFF")])
            .set_process(quoted)
            .build()
            .unwrap();
        assert_eq!(p.encode(&true).unwrap(), "X 'ON'");
    }

    #[test]
    fn string_setting_truncates_and_uppercases() {
        let p = setting::<String>("display_text", "DR{}", "")
            .set_process(upper_20)
            .build()
            .unwrap();
        assert_eq!(
            p.encode(&"hello world, this is long".to_string()).unwrap(),
            "DRHELLO WORLD, THIS IS"
        );
    }

    // ---------------------------------------------------------------
    // Validation
    // ---------------------------------------------------------------

    #[test]
    fn discrete_set_rejects_non_members() {
        let p = control::<i32>("leveling_mode", "OPA", "A{}", "")
            .discrete_set([1, 2, 3])
            .build()
            .unwrap();
        assert_eq!(p.encode(&2).unwrap(), "A2");
        let err = p.encode(&4).unwrap_err();
        assert!(err.is_validation());
        assert_eq!(
            err.to_string(),
            "validation error: leveling_mode: 4 is not one of [1, 2, 3]"
        );
    }

    #[test]
    fn range_is_inclusive() {
        let p = setting::<f64>("level", "LEV {}", "")
            .range(-1.0, 1.0)
            .build()
            .unwrap();
        assert_eq!(p.encode(&-1.0).unwrap(), "LEV -1");
        assert_eq!(p.encode(&1.0).unwrap(), "LEV 1");
        assert!(p.encode(&1.5).unwrap_err().is_validation());
    }

    #[test]
    fn range_rejects_nan() {
        let p = setting::<f64>("level", "LEV {}", "")
            .range(-1.0, 1.0)
            .build()
            .unwrap();
        assert!(p.encode(&f64::NAN).unwrap_err().is_validation());
    }

    // ---------------------------------------------------------------
    // Decoding
    // ---------------------------------------------------------------

    #[test]
    fn mapped_reply_decodes_by_token() {
        let p = control::<bool>("am_enabled", "OPMD", "MD{}", "")
            .mapped(BOOL_MAP)
            .build()
            .unwrap();
        assert!(p.decode("1").unwrap());
        assert!(!p.decode(" 0 ").unwrap());
    }

    #[test]
    fn mapped_reply_falls_back_to_numeric_equality() {
        let p = control::<bool>("am_enabled", "OPMD", "MD{}", "")
            .mapped(BOOL_MAP)
            .build()
            .unwrap();
        assert!(p.decode("+1.000").unwrap());
        assert!(!p.decode("0.0").unwrap());
    }

    #[test]
    fn unmapped_reply_is_malformed() {
        let p = control::<bool>("am_enabled", "OPMD", "MD{}", "")
            .mapped(BOOL_MAP)
            .build()
            .unwrap();
        let err = p.decode("7").unwrap_err();
        assert!(matches!(err, Error::MalformedReply(_)));
        assert!(err.is_communication());
    }

    #[test]
    fn get_process_runs_before_decoding() {
        let p = measurement::<u64>("frequency", "F?", "")
            .get_process(strip_hz)
            .build()
            .unwrap();
        assert_eq!(p.decode("1000HZ").unwrap(), 1000);
    }

    #[test]
    fn mapping_is_a_bijection() {
        let p = setting::<String>("function", "{}", "")
            .mapped([
                ("freq_a".to_string(), "FU1"),
                ("period_a".to_string(), "FU2"),
                ("freq_b".to_string(), "FU3"),
            ])
            .build()
            .unwrap();
        let map = p.value_map().unwrap();
        for (value, token) in map.iter() {
            assert_eq!(map.encode(value), Some(token));
            assert_eq!(map.decode(token).as_ref(), Some(value));
        }
    }

    // ---------------------------------------------------------------
    // Declaration checks
    // ---------------------------------------------------------------

    #[test]
    fn build_rejects_template_without_slot() {
        let err = setting::<i32>("x", "X", "").build().unwrap_err();
        assert!(matches!(err, Error::InvalidSpec(_)));
    }

    #[test]
    fn build_rejects_template_with_two_slots() {
        let err = setting::<i32>("x", "X{}{}", "").build().unwrap_err();
        assert_eq!(
            err.to_string(),
            "invalid property declaration: x: set command \"X{}{}\" has 2 slots, expected 1"
        );
    }

    #[test]
    fn build_rejects_slot_in_query() {
        let err = measurement::<i32>("x", "X{}?", "").build().unwrap_err();
        assert!(matches!(err, Error::InvalidSpec(_)));
    }

    #[test]
    fn build_rejects_validator_on_measurement() {
        let err = measurement::<i32>("x", "X?", "")
            .discrete_set([1])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSpec(_)));
    }

    #[test]
    fn build_rejects_empty_range_and_set() {
        assert!(setting::<i32>("x", "X{}", "").range(5, 1).build().is_err());
        assert!(
            setting::<i32>("x", "X{}", "")
                .discrete_set(Vec::new())
                .build()
                .is_err()
        );
    }

    #[test]
    fn build_rejects_map_without_matching_validator() {
        let map = ValueMap::new(BOOL_MAP);

        let no_validator = control::<bool>("x", "X?", "X{}", "").value_map(map.clone());
        assert!(matches!(no_validator.build(), Err(Error::InvalidSpec(_))));

        let missing_member = control::<bool>("x", "X?", "X{}", "")
            .value_map(ValueMap::new([(true, "1")]))
            .discrete_set([true, false]);
        assert!(matches!(missing_member.build(), Err(Error::InvalidSpec(_))));

        let extra_key = control::<bool>("x", "X?", "X{}", "")
            .value_map(map)
            .discrete_set([true]);
        assert!(matches!(extra_key.build(), Err(Error::InvalidSpec(_))));
    }

    #[test]
    fn build_rejects_duplicate_tokens() {
        let err = setting::<i32>("x", "X{}", "")
            .mapped([(1, "A"), (2, "A")])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("stands for both"));
    }

    #[test]
    fn build_rejects_numerically_equal_tokens() {
        let err = control::<i32>("x", "X?", "X{}", "")
            .mapped([(1, "1"), (2, "01")])
            .build()
            .unwrap_err();
        assert!(matches!(err, Error::InvalidSpec(_)));
        assert!(err.to_string().contains("numerically equal"));

        let distinct = control::<i32>("x", "X?", "X{}", "")
            .mapped([(1, "1"), (2, "1.5"), (3, "ON")])
            .build()
            .unwrap();
        assert_eq!(distinct.decode("+1.0").unwrap(), 1);
        assert_eq!(distinct.decode("1.50").unwrap(), 2);
    }

    #[test]
    fn measurement_may_map_without_validator() {
        let p = measurement::<bool>("buffer_filled", "FILL?", "")
            .value_map(ValueMap::new(BOOL_MAP))
            .build()
            .unwrap();
        assert!(p.decode("1").unwrap());
    }

    // ---------------------------------------------------------------
    // Type-erased view
    // ---------------------------------------------------------------

    #[test]
    fn dyn_property_encodes_operator_input() {
        let p = control::<bool>("am_enabled", "OPMD", "MD{}", "")
            .mapped(BOOL_MAP)
            .build()
            .unwrap();
        let dynamic: &dyn DynProperty = &p;
        assert_eq!(dynamic.encode_text("on").unwrap(), "MD1");
        assert_eq!(dynamic.decode_text("0").unwrap(), "false");
        assert!(dynamic.encode_text("sometimes").unwrap_err().is_validation());
    }

    #[test]
    fn dyn_property_enforces_access_kind() {
        let m = measurement::<String>("instrument_id", "ID", "").build().unwrap();
        let s = setting::<i32>("x", "X{}", "").build().unwrap();
        assert!(matches!(
            (&m as &dyn DynProperty).encode_text("x"),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            (&s as &dyn DynProperty).decode_text("1"),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn info_display() {
        let p = control::<i32>("leveling_mode", "OPA", "A{}", "Leveling mode.")
            .discrete_set([1, 2, 3])
            .build()
            .unwrap();
        let info = p.info();
        assert_eq!(info.kind, AccessKind::Control);
        assert!(!info.mapped);
        assert_eq!(
            info.to_string(),
            "leveling_mode (control) get=\"OPA\" set=\"A{}\" one of [1, 2, 3]"
        );
    }
}
