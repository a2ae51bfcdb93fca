// Copyright (c) 2025 Ronan LE MEILLAT, SCTG Development
// This file is part of the rust-helios project and is licensed under the
// SCTG Development Non-Commercial License v1.0 (see LICENSE.md for details).

//! Parameter model of the Helios ASCII protocol
//!
//! Every device variable is addressed by a fixed code (`v` followed by five
//! digits) and carries a value of one of a small, closed set of kinds. The
//! kind is fixed when the parameter is declared: [`Parameter<T>`] is generic
//! over a [`HeliosValue`] implementation, and [`ParameterInfo`] is the
//! type-erased view used when a parameter is looked up by its code at runtime.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Access mode of a device variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum AccessMode {
    /// Read only.
    Read,
    /// Write only.
    Write,
    /// Read and write.
    ReadWrite,
}

impl AccessMode {
    /// Whether a query is permitted.
    pub const fn can_read(self) -> bool {
        matches!(self, AccessMode::Read | AccessMode::ReadWrite)
    }

    /// Whether a write is permitted.
    pub const fn can_write(self) -> bool {
        matches!(self, AccessMode::Write | AccessMode::ReadWrite)
    }
}

impl fmt::Display for AccessMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AccessMode::Read => write!(f, "R"),
            AccessMode::Write => write!(f, "W"),
            AccessMode::ReadWrite => write!(f, "RW"),
        }
    }
}

/// The closed set of value kinds a parameter can carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ValueKind {
    U16,
    U32,
    F32,
    Text,
}

impl ValueKind {
    /// Parse a textual value extracted from a device answer.
    ///
    /// Returns `None` when the text does not represent a value of this kind.
    pub fn parse(self, text: &str) -> Option<ParameterValue> {
        match self {
            ValueKind::U16 => u16::parse_value(text).map(ParameterValue::U16),
            ValueKind::U32 => u32::parse_value(text).map(ParameterValue::U32),
            ValueKind::F32 => f32::parse_value(text).map(ParameterValue::F32),
            ValueKind::Text => String::parse_value(text).map(ParameterValue::Text),
        }
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ValueKind::U16 => "u16",
            ValueKind::U32 => "u32",
            ValueKind::F32 => "f32",
            ValueKind::Text => "text",
        };
        f.write_str(name)
    }
}

/// A decoded value of any kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ParameterValue {
    U16(u16),
    U32(u32),
    F32(f32),
    Text(String),
}

impl ParameterValue {
    /// The kind tag of this value.
    pub fn kind(&self) -> ValueKind {
        match self {
            ParameterValue::U16(_) => ValueKind::U16,
            ParameterValue::U32(_) => ValueKind::U32,
            ParameterValue::F32(_) => ValueKind::F32,
            ParameterValue::Text(_) => ValueKind::Text,
        }
    }

    /// Numeric view, used for bounds checks and gauges. `None` for text.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            ParameterValue::U16(v) => Some(f64::from(*v)),
            ParameterValue::U32(v) => Some(f64::from(*v)),
            ParameterValue::F32(v) => Some(f64::from(*v)),
            ParameterValue::Text(_) => None,
        }
    }
}

impl fmt::Display for ParameterValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParameterValue::U16(v) => fmt::Display::fmt(v, f),
            ParameterValue::U32(v) => fmt::Display::fmt(v, f),
            ParameterValue::F32(v) => fmt::Display::fmt(v, f),
            ParameterValue::Text(v) => f.write_str(v),
        }
    }
}

/// A Rust type that can be carried by a [`Parameter`].
///
/// Implemented for `u16`, `u32`, `f32` and `String`, one per [`ValueKind`].
pub trait HeliosValue: Sized + Clone + fmt::Debug + Send + Sync + 'static {
    /// Kind tag resolved at declaration time.
    const KIND: ValueKind;

    /// Parse the text found between `=` and the terminator of an answer.
    fn parse_value(text: &str) -> Option<Self>;

    /// Render the value as it is sent in a `code=value` write command.
    fn format_value(&self) -> String;

    /// Numeric view used for bounds checks. `None` for text.
    fn as_f64(&self) -> Option<f64>;
}

impl HeliosValue for u16 {
    const KIND: ValueKind = ValueKind::U16;

    fn parse_value(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }

    fn format_value(&self) -> String {
        self.to_string()
    }

    fn as_f64(&self) -> Option<f64> {
        Some(f64::from(*self))
    }
}

impl HeliosValue for u32 {
    const KIND: ValueKind = ValueKind::U32;

    fn parse_value(text: &str) -> Option<Self> {
        text.trim().parse().ok()
    }

    fn format_value(&self) -> String {
        self.to_string()
    }

    fn as_f64(&self) -> Option<f64> {
        Some(f64::from(*self))
    }
}

impl HeliosValue for f32 {
    const KIND: ValueKind = ValueKind::F32;

    fn parse_value(text: &str) -> Option<Self> {
        text.trim().parse::<f32>().ok().filter(|v| v.is_finite())
    }

    fn format_value(&self) -> String {
        self.to_string()
    }

    fn as_f64(&self) -> Option<f64> {
        Some(f64::from(*self))
    }
}

impl HeliosValue for String {
    const KIND: ValueKind = ValueKind::Text;

    fn parse_value(text: &str) -> Option<Self> {
        Some(text.to_string())
    }

    fn format_value(&self) -> String {
        self.clone()
    }

    fn as_f64(&self) -> Option<f64> {
        None
    }
}

/// A typed device variable.
///
/// `register_count` is the size of the *answer* window; the request always
/// spans the command window starting at the configured register offset.
/// `min` and `max` document the device range and are never enforced on reads.
#[derive(Debug, Clone)]
pub struct Parameter<T: HeliosValue> {
    code: &'static str,
    register_count: u16,
    description: &'static str,
    access: AccessMode,
    min: Option<T>,
    max: Option<T>,
}

impl<T: HeliosValue> Parameter<T> {
    /// Declare a parameter.
    pub const fn new(
        code: &'static str,
        register_count: u16,
        description: &'static str,
        access: AccessMode,
        min: Option<T>,
        max: Option<T>,
    ) -> Self {
        Self {
            code,
            register_count,
            description,
            access,
            min,
            max,
        }
    }

    pub fn code(&self) -> &'static str {
        self.code
    }

    pub fn register_count(&self) -> u16 {
        self.register_count
    }

    pub fn description(&self) -> &'static str {
        self.description
    }

    pub fn access(&self) -> AccessMode {
        self.access
    }

    pub fn min(&self) -> Option<&T> {
        self.min.as_ref()
    }

    pub fn max(&self) -> Option<&T> {
        self.max.as_ref()
    }

    /// Whether `value` lies within the declared bounds (inclusive).
    ///
    /// Missing bounds and non-numeric kinds always pass.
    pub fn is_within_bounds(&self, value: &T) -> bool {
        let Some(v) = value.as_f64() else {
            return true;
        };
        let above_min = self
            .min
            .as_ref()
            .and_then(HeliosValue::as_f64)
            .map_or(true, |min| v >= min);
        let below_max = self
            .max
            .as_ref()
            .and_then(HeliosValue::as_f64)
            .map_or(true, |max| v <= max);
        above_min && below_max
    }

    /// Type-erased view of this parameter.
    pub fn info(&self) -> ParameterInfo {
        ParameterInfo {
            code: self.code,
            register_count: self.register_count,
            description: self.description,
            access: self.access,
            kind: T::KIND,
            min: self.min.as_ref().and_then(HeliosValue::as_f64),
            max: self.max.as_ref().and_then(HeliosValue::as_f64),
        }
    }
}

/// Type-erased description of a parameter, used for lookups by code.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParameterInfo {
    pub code: &'static str,
    pub register_count: u16,
    pub description: &'static str,
    pub access: AccessMode,
    pub kind: ValueKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl ParameterInfo {
    /// Parse a user-supplied value according to this parameter's kind.
    pub fn parse_value(&self, text: &str) -> Option<ParameterValue> {
        self.kind.parse(text)
    }

    /// Whether `value` lies within the declared bounds (inclusive).
    pub fn is_within_bounds(&self, value: &ParameterValue) -> bool {
        let Some(v) = value.as_f64() else {
            return true;
        };
        self.min.map_or(true, |min| v >= min) && self.max.map_or(true, |max| v <= max)
    }

    /// Whether the code has the `v` + five digits shape.
    pub fn has_valid_code(&self) -> bool {
        is_valid_code(self.code)
    }
}

/// Check the `v` + five decimal digits shape of a parameter code.
pub fn is_valid_code(code: &str) -> bool {
    let bytes = code.as_bytes();
    bytes.len() == 6 && bytes[0] == b'v' && bytes[1..].iter().all(u8::is_ascii_digit)
}

#[cfg(test)]
mod tests {
    use super::*;

    const FAN_LEVEL: Parameter<u16> = Parameter::new(
        "v00102",
        5,
        "Current fan level",
        AccessMode::ReadWrite,
        Some(0),
        Some(4),
    );

    #[test]
    fn test_access_mode_capabilities() {
        assert!(AccessMode::Read.can_read());
        assert!(!AccessMode::Read.can_write());
        assert!(AccessMode::Write.can_write());
        assert!(!AccessMode::Write.can_read());
        assert!(AccessMode::ReadWrite.can_read() && AccessMode::ReadWrite.can_write());
    }

    #[test]
    fn test_value_kind_parsing() {
        assert_eq!(ValueKind::U16.parse("3"), Some(ParameterValue::U16(3)));
        assert_eq!(ValueKind::U16.parse("-3"), None);
        assert_eq!(ValueKind::U16.parse("70000"), None);
        assert_eq!(ValueKind::U32.parse("70000"), Some(ParameterValue::U32(70000)));
        assert_eq!(ValueKind::F32.parse("-2.5"), Some(ParameterValue::F32(-2.5)));
        assert_eq!(ValueKind::F32.parse("abc"), None);
        assert_eq!(
            ValueKind::Text.parse("10:00:00"),
            Some(ParameterValue::Text("10:00:00".to_string()))
        );
    }

    #[test]
    fn test_bounds_are_inclusive() {
        assert!(FAN_LEVEL.is_within_bounds(&0));
        assert!(FAN_LEVEL.is_within_bounds(&4));
        assert!(!FAN_LEVEL.is_within_bounds(&5));

        let info = FAN_LEVEL.info();
        assert!(info.is_within_bounds(&ParameterValue::U16(2)));
        assert!(!info.is_within_bounds(&ParameterValue::U16(9)));
    }

    #[test]
    fn test_info_carries_kind_and_bounds() {
        let info = FAN_LEVEL.info();
        assert_eq!(info.code, "v00102");
        assert_eq!(info.kind, ValueKind::U16);
        assert_eq!(info.min, Some(0.0));
        assert_eq!(info.max, Some(4.0));
        assert!(info.has_valid_code());
    }

    #[test]
    fn test_code_shape() {
        assert!(is_valid_code("v00005"));
        assert!(!is_valid_code("v0005"));
        assert!(!is_valid_code("x00005"));
        assert!(!is_valid_code("v0000a"));
    }
}
