//! Status-register decoding.
//!
//! Instruments report their state as a bit-packed word. A [`StatusLayout`]
//! names the bits of that word: single-bit [`FieldKind::Flag`]s decode to
//! `bool`, multi-bit [`FieldKind::Enum`] fields decode through an injective
//! pattern table. Layouts are plain `const` data, and decoding is a pure
//! function of the raw word.
//!
//! ```
//! use instrlib_core::status::{FieldKind, StatusField, StatusLayout};
//!
//! const MODES: &[(u32, &str)] = &[(1, "Internal"), (2, "External")];
//! const LAYOUT: StatusLayout = StatusLayout::new(
//!     "demo",
//!     8,
//!     &[
//!         StatusField::flag("ready", 0),
//!         StatusField::enumeration("mode", 1, 2, MODES),
//!     ],
//! );
//!
//! let bits = LAYOUT.decode(0b101).unwrap();
//! assert_eq!(bits.flag("ready"), Some(true));
//! assert_eq!(bits.member("mode").unwrap().name, "External");
//!
//! // Pattern 0 has no member.
//! assert!(LAYOUT.decode(0b000).unwrap_err().is_decode());
//! ```

use std::fmt;

use crate::error::{Error, Result};

/// Widest register the decoder handles, in bits.
pub const MAX_WIDTH: u8 = 32;

/// How a field's bits are interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// One bit, decoded to `bool`.
    Flag,
    /// A bit range, decoded through `(pattern, member name)` pairs.
    Enum(&'static [(u32, &'static str)]),
}

/// One named field of a status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusField {
    /// Field name.
    pub name: &'static str,
    /// Position of the least significant bit.
    pub lsb: u8,
    /// Number of bits.
    pub width: u8,
    /// Interpretation.
    pub kind: FieldKind,
}

impl StatusField {
    /// A single-bit flag at `bit`.
    pub const fn flag(name: &'static str, bit: u8) -> Self {
        StatusField {
            name,
            lsb: bit,
            width: 1,
            kind: FieldKind::Flag,
        }
    }

    /// A `width`-bit enum field starting at `lsb`.
    pub const fn enumeration(
        name: &'static str,
        lsb: u8,
        width: u8,
        members: &'static [(u32, &'static str)],
    ) -> Self {
        StatusField {
            name,
            lsb,
            width,
            kind: FieldKind::Enum(members),
        }
    }

    fn value_mask(&self) -> u32 {
        if self.width >= MAX_WIDTH {
            u32::MAX
        } else {
            (1u32 << self.width) - 1
        }
    }

    fn register_mask(&self) -> u32 {
        self.value_mask() << self.lsb
    }

    fn extract(&self, raw: u32) -> u32 {
        (raw >> self.lsb) & self.value_mask()
    }
}

/// The decoded value of one field.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldValue {
    /// A flag.
    Flag(bool),
    /// An enum member.
    Enum(EnumMember),
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FieldValue::Flag(b) => write!(f, "{b}"),
            FieldValue::Enum(m) => write!(f, "{}", m.name),
        }
    }
}

/// A decoded enum field: the raw pattern and the member it stands for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnumMember {
    /// Raw bit pattern, shifted down to bit 0.
    pub pattern: u32,
    /// Member name from the layout.
    pub name: &'static str,
}

/// Declarative bit layout of a status register.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusLayout {
    /// Register name, used in errors and display.
    pub name: &'static str,
    /// Register width in bits (at most 32).
    pub width: u8,
    /// Fields in display order.
    pub fields: &'static [StatusField],
}

impl StatusLayout {
    /// Declare a layout. Call [`validate`](Self::validate) to check it.
    pub const fn new(name: &'static str, width: u8, fields: &'static [StatusField]) -> Self {
        StatusLayout {
            name,
            width,
            fields,
        }
    }

    /// Look up a field by name.
    pub fn field(&self, name: &str) -> Option<&StatusField> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Check that the layout is well formed.
    ///
    /// Fields must fit inside the register, must not overlap and must have
    /// unique names. Flags are exactly one bit. Enum tables must be
    /// non-empty and injective, and every pattern must fit its field.
    pub fn validate(&self) -> Result<()> {
        let invalid = |reason: String| Err(Error::InvalidSpec(format!("{}: {reason}", self.name)));

        if self.width == 0 || self.width > MAX_WIDTH {
            return invalid(format!("register width {} is not in 1..={MAX_WIDTH}", self.width));
        }

        let mut used = 0u32;
        for (i, field) in self.fields.iter().enumerate() {
            if field.width == 0 || u32::from(field.lsb) + u32::from(field.width) > u32::from(self.width) {
                return invalid(format!(
                    "field {} (bits {}..{}) does not fit {} bits",
                    field.name,
                    field.lsb,
                    u32::from(field.lsb) + u32::from(field.width),
                    self.width
                ));
            }
            if used & field.register_mask() != 0 {
                return invalid(format!("field {} overlaps another field", field.name));
            }
            used |= field.register_mask();

            if self.fields[..i].iter().any(|f| f.name == field.name) {
                return invalid(format!("field {} is declared twice", field.name));
            }

            match field.kind {
                FieldKind::Flag if field.width != 1 => {
                    return invalid(format!("flag {} is {} bits wide", field.name, field.width));
                }
                FieldKind::Flag => {}
                FieldKind::Enum(members) => {
                    if members.is_empty() {
                        return invalid(format!("enum field {} has no members", field.name));
                    }
                    for (j, (pattern, member)) in members.iter().enumerate() {
                        if *pattern & !field.value_mask() != 0 {
                            return invalid(format!(
                                "{}: pattern {pattern:#b} of {member} does not fit {} bits",
                                field.name, field.width
                            ));
                        }
                        if members[..j].iter().any(|(p, m)| p == pattern || m == member) {
                            return invalid(format!(
                                "{}: member {member} or pattern {pattern:#b} is repeated",
                                field.name
                            ));
                        }
                    }
                }
            }
        }
        Ok(())
    }

    /// Decode a raw register value.
    ///
    /// Fails with [`Error::Decode`] if `raw` has bits set above the register
    /// width or an enum field holds a pattern with no member. Bits not
    /// covered by any field are ignored.
    pub fn decode(&self, raw: u32) -> Result<StatusBits> {
        self.validate()?;

        if self.width < MAX_WIDTH && raw >> self.width != 0 {
            return Err(Error::Decode(format!(
                "{}: raw value {raw:#x} exceeds {} bits",
                self.name, self.width
            )));
        }

        let mut values = Vec::with_capacity(self.fields.len());
        for field in self.fields {
            let bits = field.extract(raw);
            let value = match field.kind {
                FieldKind::Flag => FieldValue::Flag(bits != 0),
                FieldKind::Enum(members) => {
                    let (pattern, name) = members
                        .iter()
                        .find(|(p, _)| *p == bits)
                        .copied()
                        .ok_or_else(|| {
                            Error::Decode(format!(
                                "{}: no member for pattern {bits:#b}",
                                field.name
                            ))
                        })?;
                    FieldValue::Enum(EnumMember { pattern, name })
                }
            };
            values.push((field.name, value));
        }

        Ok(StatusBits {
            register: self.name,
            raw,
            values,
        })
    }
}

/// An immutable decoded snapshot of a status register.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusBits {
    register: &'static str,
    raw: u32,
    values: Vec<(&'static str, FieldValue)>,
}

impl StatusBits {
    /// The raw register value this snapshot was decoded from.
    pub fn raw(&self) -> u32 {
        self.raw
    }

    /// Name of the register layout.
    pub fn register(&self) -> &'static str {
        self.register
    }

    /// Value of the field `name`.
    pub fn get(&self, name: &str) -> Option<FieldValue> {
        self.values
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, v)| *v)
    }

    /// Value of the flag `name`; `None` if there is no such flag.
    pub fn flag(&self, name: &str) -> Option<bool> {
        match self.get(name)? {
            FieldValue::Flag(b) => Some(b),
            FieldValue::Enum(_) => None,
        }
    }

    /// Member of the enum field `name`; `None` if there is no such field.
    pub fn member(&self, name: &str) -> Option<EnumMember> {
        match self.get(name)? {
            FieldValue::Enum(m) => Some(m),
            FieldValue::Flag(_) => None,
        }
    }

    /// Convert the enum field `name` into a typed enum.
    pub fn enumeration<E: TryFrom<u32>>(&self, name: &str) -> Result<E> {
        let member = self.member(name).ok_or_else(|| {
            Error::Decode(format!("{}: no enum field named {name}", self.register))
        })?;
        E::try_from(member.pattern).map_err(|_| {
            Error::Decode(format!(
                "{name}: pattern {:#b} ({}) has no typed counterpart",
                member.pattern, member.name
            ))
        })
    }

    /// Names of the flags that are set, in layout order.
    pub fn set_flags(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.values.iter().filter_map(|(name, value)| match value {
            FieldValue::Flag(true) => Some(*name),
            _ => None,
        })
    }

    /// All fields in layout order.
    pub fn iter(&self) -> impl Iterator<Item = (&'static str, FieldValue)> + '_ {
        self.values.iter().copied()
    }
}

impl fmt::Display for StatusBits {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({:#06x}):", self.register, self.raw)?;
        let mut any = false;
        for (name, value) in &self.values {
            match value {
                FieldValue::Flag(false) => continue,
                FieldValue::Flag(true) => write!(f, " {name}")?,
                FieldValue::Enum(m) => write!(f, " {name}={}", m.name)?,
            }
            any = true;
        }
        if !any {
            write!(f, " (none)")?;
        }
        Ok(())
    }
}

/// A status layout together with the query that reads it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StatusRegister {
    /// Bit layout.
    pub layout: StatusLayout,
    /// Query command (without termination).
    pub command: &'static str,
    /// Number of raw reply bytes, most significant first.
    pub byte_count: usize,
}

impl StatusRegister {
    /// Couple a layout with its query.
    pub const fn new(layout: StatusLayout, command: &'static str, byte_count: usize) -> Self {
        StatusRegister {
            layout,
            command,
            byte_count,
        }
    }

    /// Check the layout and that the reply fits the register.
    pub fn validate(&self) -> Result<()> {
        self.layout.validate()?;
        if self.byte_count == 0 || self.byte_count * 8 > usize::from(MAX_WIDTH) {
            return Err(Error::InvalidSpec(format!(
                "{}: a {}-byte reply does not fit a status register",
                self.layout.name, self.byte_count
            )));
        }
        Ok(())
    }

    /// Assemble reply bytes (most significant first) into the raw word.
    pub fn assemble(&self, bytes: &[u8]) -> Result<u32> {
        if bytes.len() != self.byte_count {
            return Err(Error::ByteCountMismatch {
                expected: self.byte_count,
                received: bytes.len(),
            });
        }
        if bytes.len() * 8 > usize::from(MAX_WIDTH) {
            return Err(Error::InvalidSpec(format!(
                "{}: {} bytes do not fit a status register",
                self.layout.name,
                bytes.len()
            )));
        }
        Ok(bytes.iter().fold(0u32, |acc, b| (acc << 8) | u32::from(*b)))
    }

    /// Assemble and decode reply bytes.
    pub fn decode_bytes(&self, bytes: &[u8]) -> Result<StatusBits> {
        let raw = self.assemble(bytes)?;
        self.layout.decode(raw)
    }
}
