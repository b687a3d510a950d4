//! Module: value
//! Responsibility: dynamic cell model shared by rows, data tables and merges.
//! Does not own: block layout or null bitmaps.
//! Boundary: every materialized row cell is a [`Value`].

mod compare;
mod data_type;
pub(crate) mod decimal;

#[cfg(test)]
mod tests;

use derive_more::{Deref, DerefMut};
use ordered_float::OrderedFloat;
use quarry_primitives::StoredType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;

// re-exports
pub use compare::{canonical_cmp, compare_nulls_last};
pub use data_type::{ColumnDataType, FieldKind};
pub use decimal::{deserialize_decimal, serialize_decimal};

///
/// ByteArray
///
/// Owned binary cell ordered lexicographically by unsigned byte.
///

#[derive(
    Clone, Debug, Default, Deref, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct ByteArray(#[serde(with = "serde_bytes")] Vec<u8>);

impl ByteArray {
    #[must_use]
    pub const fn new(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }

    #[must_use]
    pub fn into_inner(self) -> Vec<u8> {
        self.0
    }

    /// Lower-case hex rendering used by result formatting.
    #[must_use]
    pub fn to_hex(&self) -> String {
        let mut out = String::with_capacity(self.0.len() * 2);
        for byte in &self.0 {
            let _ = write!(out, "{byte:02x}");
        }

        out
    }
}

impl From<Vec<u8>> for ByteArray {
    fn from(bytes: Vec<u8>) -> Self {
        Self(bytes)
    }
}

impl From<&[u8]> for ByteArray {
    fn from(bytes: &[u8]) -> Self {
        Self(bytes.to_vec())
    }
}

///
/// Value
///
/// One row cell. `Null` is only produced when null handling is enabled and
/// the source position is present in the column's null bitmap.
///

#[derive(Clone, Debug, Default, Deserialize, PartialEq, Serialize)]
pub enum Value {
    #[default]
    Null,
    Int(i32),
    Long(i64),
    Float(f32),
    Double(f64),
    BigDecimal(Decimal),
    String(String),
    Bytes(ByteArray),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<f32>),
    DoubleArray(Vec<f64>),
    StringArray(Vec<String>),
}

impl Value {
    #[must_use]
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    #[must_use]
    pub const fn is_multi_value(&self) -> bool {
        matches!(
            self,
            Self::IntArray(_)
                | Self::LongArray(_)
                | Self::FloatArray(_)
                | Self::DoubleArray(_)
                | Self::StringArray(_)
        )
    }

    /// Stored type of the cell, `None` for `Null`.
    #[must_use]
    pub const fn stored_type(&self) -> Option<StoredType> {
        match self {
            Self::Null => None,
            Self::Int(_) | Self::IntArray(_) => Some(StoredType::Int),
            Self::Long(_) | Self::LongArray(_) => Some(StoredType::Long),
            Self::Float(_) | Self::FloatArray(_) => Some(StoredType::Float),
            Self::Double(_) | Self::DoubleArray(_) => Some(StoredType::Double),
            Self::BigDecimal(_) => Some(StoredType::BigDecimal),
            Self::String(_) | Self::StringArray(_) => Some(StoredType::String),
            Self::Bytes(_) => Some(StoredType::Bytes),
        }
    }

    /// Short variant label for diagnostics.
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Int(_) => "int",
            Self::Long(_) => "long",
            Self::Float(_) => "float",
            Self::Double(_) => "double",
            Self::BigDecimal(_) => "big_decimal",
            Self::String(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::IntArray(_) => "int_array",
            Self::LongArray(_) => "long_array",
            Self::FloatArray(_) => "float_array",
            Self::DoubleArray(_) => "double_array",
            Self::StringArray(_) => "string_array",
        }
    }

    /// Numeric view of a single-value cell as a double.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Int(v) => Some(f64::from(*v)),
            Self::Long(v) => Some(*v as f64),
            Self::Float(v) => Some(f64::from(*v)),
            Self::Double(v) => Some(*v),
            Self::BigDecimal(v) => Some(decimal::decimal_to_f64(*v)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_long(&self) -> Option<i64> {
        match self {
            Self::Int(v) => Some(*v as i64),
            Self::Long(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_decimal(&self) -> Option<Decimal> {
        match self {
            Self::BigDecimal(v) => Some(*v),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::String(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Long(v)
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Self::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Self::Double(v)
    }
}

impl From<Decimal> for Value {
    fn from(v: Decimal) -> Self {
        Self::BigDecimal(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::String(v.to_string())
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::String(v)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

///
/// ValueKey
///
/// Hashable, totally ordered mirror of [`Value`] used for group keys and
/// distinct sets. Floats compare and hash through `OrderedFloat`.
///

#[derive(Clone, Debug, Eq, Hash, Ord, PartialEq, PartialOrd)]
pub enum ValueKey {
    Int(i32),
    Long(i64),
    Float(OrderedFloat<f32>),
    Double(OrderedFloat<f64>),
    BigDecimal(Decimal),
    String(String),
    Bytes(ByteArray),
    IntArray(Vec<i32>),
    LongArray(Vec<i64>),
    FloatArray(Vec<OrderedFloat<f32>>),
    DoubleArray(Vec<OrderedFloat<f64>>),
    StringArray(Vec<String>),
    Null,
}

impl From<&Value> for ValueKey {
    fn from(value: &Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Int(v) => Self::Int(*v),
            Value::Long(v) => Self::Long(*v),
            Value::Float(v) => Self::Float(OrderedFloat(*v)),
            Value::Double(v) => Self::Double(OrderedFloat(*v)),
            Value::BigDecimal(v) => Self::BigDecimal(v.normalize()),
            Value::String(v) => Self::String(v.clone()),
            Value::Bytes(v) => Self::Bytes(v.clone()),
            Value::IntArray(v) => Self::IntArray(v.clone()),
            Value::LongArray(v) => Self::LongArray(v.clone()),
            Value::FloatArray(v) => Self::FloatArray(v.iter().copied().map(OrderedFloat).collect()),
            Value::DoubleArray(v) => {
                Self::DoubleArray(v.iter().copied().map(OrderedFloat).collect())
            }
            Value::StringArray(v) => Self::StringArray(v.clone()),
        }
    }
}

impl From<ValueKey> for Value {
    fn from(key: ValueKey) -> Self {
        match key {
            ValueKey::Null => Self::Null,
            ValueKey::Int(v) => Self::Int(v),
            ValueKey::Long(v) => Self::Long(v),
            ValueKey::Float(v) => Self::Float(v.into_inner()),
            ValueKey::Double(v) => Self::Double(v.into_inner()),
            ValueKey::BigDecimal(v) => Self::BigDecimal(v),
            ValueKey::String(v) => Self::String(v),
            ValueKey::Bytes(v) => Self::Bytes(v),
            ValueKey::IntArray(v) => Self::IntArray(v),
            ValueKey::LongArray(v) => Self::LongArray(v),
            ValueKey::FloatArray(v) => {
                Self::FloatArray(v.into_iter().map(OrderedFloat::into_inner).collect())
            }
            ValueKey::DoubleArray(v) => {
                Self::DoubleArray(v.into_iter().map(OrderedFloat::into_inner).collect())
            }
            ValueKey::StringArray(v) => Self::StringArray(v),
        }
    }
}

///
/// Row
///
/// One materialized row; cell order follows the producing schema.
///

#[derive(Clone, Debug, Default, Deref, DerefMut, Deserialize, PartialEq, Serialize)]
pub struct Row(Vec<Value>);

impl Row {
    #[must_use]
    pub const fn new(cells: Vec<Value>) -> Self {
        Self(cells)
    }

    /// Row of `width` null cells.
    #[must_use]
    pub fn nulls(width: usize) -> Self {
        Self(vec![Value::Null; width])
    }

    #[must_use]
    pub fn into_cells(self) -> Vec<Value> {
        self.0
    }
}

impl From<Vec<Value>> for Row {
    fn from(cells: Vec<Value>) -> Self {
        Self(cells)
    }
}

impl FromIterator<Value> for Row {
    fn from_iter<I: IntoIterator<Item = Value>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}
