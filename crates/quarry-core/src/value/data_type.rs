use crate::{
    error::{ErrorOrigin, InternalError},
    value::{ByteArray, Value},
};
use quarry_primitives::StoredType;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

///
/// FieldKind
///
/// Schema role of a column. Selects the placeholder written for nulls.
///

#[derive(Clone, Copy, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum FieldKind {
    #[default]
    Dimension,
    Metric,
}

///
/// ColumnDataType
///
/// Result-schema column type exchanged across the merge boundary.
///

#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ColumnDataType {
    Int,
    Long,
    Float,
    Double,
    BigDecimal,
    String,
    Bytes,
    IntArray,
    LongArray,
    FloatArray,
    DoubleArray,
    StringArray,
    Object,
}

impl ColumnDataType {
    /// Result column type for a projected column, `None` when the stored
    /// type has no array form.
    #[must_use]
    pub const fn from_stored(stored_type: StoredType, single_value: bool) -> Option<Self> {
        if single_value {
            return Some(match stored_type {
                StoredType::Int => Self::Int,
                StoredType::Long => Self::Long,
                StoredType::Float => Self::Float,
                StoredType::Double => Self::Double,
                StoredType::BigDecimal => Self::BigDecimal,
                StoredType::String => Self::String,
                StoredType::Bytes => Self::Bytes,
            });
        }

        if !stored_type.supports_multi_value() {
            return None;
        }

        match stored_type {
            StoredType::Int => Some(Self::IntArray),
            StoredType::Long => Some(Self::LongArray),
            StoredType::Float => Some(Self::FloatArray),
            StoredType::Double => Some(Self::DoubleArray),
            StoredType::String => Some(Self::StringArray),
            StoredType::BigDecimal | StoredType::Bytes => None,
        }
    }

    /// Stored element type; `None` for `Object`.
    #[must_use]
    pub const fn stored_type(self) -> Option<StoredType> {
        match self {
            Self::Int | Self::IntArray => Some(StoredType::Int),
            Self::Long | Self::LongArray => Some(StoredType::Long),
            Self::Float | Self::FloatArray => Some(StoredType::Float),
            Self::Double | Self::DoubleArray => Some(StoredType::Double),
            Self::BigDecimal => Some(StoredType::BigDecimal),
            Self::String | Self::StringArray => Some(StoredType::String),
            Self::Bytes => Some(StoredType::Bytes),
            Self::Object => None,
        }
    }

    #[must_use]
    pub const fn is_array(self) -> bool {
        matches!(
            self,
            Self::IntArray | Self::LongArray | Self::FloatArray | Self::DoubleArray | Self::StringArray
        )
    }

    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Int => "INT",
            Self::Long => "LONG",
            Self::Float => "FLOAT",
            Self::Double => "DOUBLE",
            Self::BigDecimal => "BIG_DECIMAL",
            Self::String => "STRING",
            Self::Bytes => "BYTES",
            Self::IntArray => "INT_ARRAY",
            Self::LongArray => "LONG_ARRAY",
            Self::FloatArray => "FLOAT_ARRAY",
            Self::DoubleArray => "DOUBLE_ARRAY",
            Self::StringArray => "STRING_ARRAY",
            Self::Object => "OBJECT",
        }
    }

    /// Placeholder stored in place of a null cell.
    #[must_use]
    pub fn null_placeholder(self, field_kind: FieldKind) -> Value {
        let metric = matches!(field_kind, FieldKind::Metric);

        match self {
            Self::Int => Value::Int(if metric { 0 } else { i32::MIN }),
            Self::Long => Value::Long(if metric { 0 } else { i64::MIN }),
            Self::Float => Value::Float(if metric { 0.0 } else { f32::NEG_INFINITY }),
            Self::Double => Value::Double(if metric { 0.0 } else { f64::NEG_INFINITY }),
            Self::BigDecimal | Self::Object => Value::BigDecimal(Decimal::ZERO),
            Self::String => Value::String("null".to_string()),
            Self::Bytes => Value::Bytes(ByteArray::default()),
            Self::IntArray => Value::IntArray(Vec::new()),
            Self::LongArray => Value::LongArray(Vec::new()),
            Self::FloatArray => Value::FloatArray(Vec::new()),
            Self::DoubleArray => Value::DoubleArray(Vec::new()),
            Self::StringArray => Value::StringArray(Vec::new()),
        }
    }

    /// Coerce a cell into this column's canonical representation.
    ///
    /// Integral values widen to long/double, int arrays widen to long arrays
    /// and numeric arrays widen to double arrays. Nulls pass through.
    #[allow(clippy::cast_precision_loss)]
    pub fn convert(self, value: Value) -> Result<Value, InternalError> {
        let converted = match (self, value) {
            (_, Value::Null) => Value::Null,
            (Self::Object, other) => other,

            (Self::Int, Value::Int(v)) => Value::Int(v),
            (Self::Long, Value::Int(v)) => Value::Long(i64::from(v)),
            (Self::Long, Value::Long(v)) => Value::Long(v),
            (Self::Float, Value::Float(v)) => Value::Float(v),
            (Self::Double, Value::Int(v)) => Value::Double(f64::from(v)),
            (Self::Double, Value::Long(v)) => Value::Double(v as f64),
            (Self::Double, Value::Float(v)) => Value::Double(f64::from(v)),
            (Self::Double, Value::Double(v)) => Value::Double(v),
            (Self::BigDecimal, Value::BigDecimal(v)) => Value::BigDecimal(v),
            (Self::BigDecimal, Value::Int(v)) => Value::BigDecimal(Decimal::from(v)),
            (Self::BigDecimal, Value::Long(v)) => Value::BigDecimal(Decimal::from(v)),
            (Self::String, Value::String(v)) => Value::String(v),
            (Self::Bytes, Value::Bytes(v)) => Value::Bytes(v),

            (Self::IntArray, Value::IntArray(v)) => Value::IntArray(v),
            (Self::LongArray, Value::IntArray(v)) => {
                Value::LongArray(v.into_iter().map(i64::from).collect())
            }
            (Self::LongArray, Value::LongArray(v)) => Value::LongArray(v),
            (Self::FloatArray, Value::FloatArray(v)) => Value::FloatArray(v),
            (Self::DoubleArray, Value::IntArray(v)) => {
                Value::DoubleArray(v.into_iter().map(f64::from).collect())
            }
            (Self::DoubleArray, Value::LongArray(v)) => {
                Value::DoubleArray(v.into_iter().map(|x| x as f64).collect())
            }
            (Self::DoubleArray, Value::FloatArray(v)) => {
                Value::DoubleArray(v.into_iter().map(f64::from).collect())
            }
            (Self::DoubleArray, Value::DoubleArray(v)) => Value::DoubleArray(v),
            (Self::StringArray, Value::StringArray(v)) => Value::StringArray(v),

            (ty, other) => {
                return Err(InternalError::unsupported(
                    ErrorOrigin::Render,
                    format!("cannot convert {} cell to column type {ty}", other.kind_name()),
                ));
            }
        };

        Ok(converted)
    }

    /// Render-time formatting: decimals become plain strings, bytes become hex.
    #[must_use]
    pub fn format(self, value: Value) -> Value {
        match value {
            Value::BigDecimal(v) => Value::String(v.to_string()),
            Value::Bytes(v) => Value::String(v.to_hex()),
            other => other,
        }
    }

    pub fn convert_and_format(self, value: Value) -> Result<Value, InternalError> {
        self.convert(value).map(|converted| self.format(converted))
    }
}

impl fmt::Display for ColumnDataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
