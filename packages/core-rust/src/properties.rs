//! Application-defined message properties.
//!
//! Brokers keep properties marshalled (`MsgPack` via `rmp_serde::to_vec_named`)
//! until something asks for them, so reading the mapping can fail when the
//! stored bytes are corrupt. [`PropertyStore`] models both states.

use std::borrow::Cow;
use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::{MessageError, PropertyConversionError};

/// Decoded property mapping. `BTreeMap` keeps iteration order deterministic.
pub type PropertyMap = BTreeMap<String, PropertyValue>;

// ---------------------------------------------------------------------------
// PropertyValue
// ---------------------------------------------------------------------------

/// A single property value of one of the heterogeneous primitive kinds a
/// message may carry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PropertyValue {
    Bool(bool),
    Byte(i8),
    Short(i16),
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    String(String),
    /// Raw bytes. Not string-convertible.
    Bytes(Vec<u8>),
    /// Nested list. Not string-convertible.
    List(Vec<PropertyValue>),
    /// Nested map. Not string-convertible.
    Map(BTreeMap<String, PropertyValue>),
}

impl PropertyValue {
    /// Runtime type name, used in diagnostics.
    #[must_use]
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "Boolean",
            Self::Byte(_) => "Byte",
            Self::Short(_) => "Short",
            Self::Int(_) => "Integer",
            Self::Long(_) => "Long",
            Self::Float(_) => "Float",
            Self::Double(_) => "Double",
            Self::String(_) => "String",
            Self::Bytes(_) => "Bytes",
            Self::List(_) => "List",
            Self::Map(_) => "Map",
        }
    }

    /// Renders the value as a string following messaging property
    /// conversion rules: primitives and strings convert, bytes and
    /// collections do not.
    ///
    /// Floating-point values keep a fractional part (`1.0`, not `1`). Large
    /// magnitudes use Rust exponent notation (`1e20`), not `1.0E20`.
    ///
    /// # Errors
    ///
    /// Returns [`PropertyConversionError`] for bytes, list and map values.
    pub fn to_property_string(&self) -> Result<String, PropertyConversionError> {
        match self {
            Self::Bool(v) => Ok(v.to_string()),
            Self::Byte(v) => Ok(v.to_string()),
            Self::Short(v) => Ok(v.to_string()),
            Self::Int(v) => Ok(v.to_string()),
            Self::Long(v) => Ok(v.to_string()),
            Self::Float(v) => Ok(format!("{v:?}")),
            Self::Double(v) => Ok(format!("{v:?}")),
            Self::String(v) => Ok(v.clone()),
            Self::Bytes(_) | Self::List(_) | Self::Map(_) => Err(PropertyConversionError {
                kind: self.type_name(),
            }),
        }
    }
}

impl From<&str> for PropertyValue {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for PropertyValue {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl From<bool> for PropertyValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<i32> for PropertyValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for PropertyValue {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f64> for PropertyValue {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

// ---------------------------------------------------------------------------
// PropertyStore
// ---------------------------------------------------------------------------

/// Property mapping as held by the broker: either already decoded, or still
/// in its marshalled wire form.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyStore {
    Decoded(PropertyMap),
    Marshalled(Vec<u8>),
}

impl Default for PropertyStore {
    fn default() -> Self {
        Self::Decoded(PropertyMap::new())
    }
}

impl PropertyStore {
    /// Marshals a decoded mapping into its wire form.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::PropertyEncode`] if encoding fails.
    pub fn marshal(properties: &PropertyMap) -> Result<Self, MessageError> {
        rmp_serde::to_vec_named(properties)
            .map(Self::Marshalled)
            .map_err(|e| MessageError::PropertyEncode(e.to_string()))
    }

    /// Reads the mapping, decoding marshalled bytes on demand.
    ///
    /// # Errors
    ///
    /// Returns [`MessageError::PropertyDecode`] when the marshalled bytes are
    /// not a valid property mapping.
    pub fn read(&self) -> Result<Cow<'_, PropertyMap>, MessageError> {
        match self {
            Self::Decoded(map) => Ok(Cow::Borrowed(map)),
            Self::Marshalled(bytes) => rmp_serde::from_slice::<PropertyMap>(bytes)
                .map(Cow::Owned)
                .map_err(|e| MessageError::PropertyDecode(e.to_string())),
        }
    }
}

impl From<PropertyMap> for PropertyStore {
    fn from(map: PropertyMap) -> Self {
        Self::Decoded(map)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
