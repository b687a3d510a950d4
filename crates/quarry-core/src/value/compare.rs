use crate::{direction::Direction, value::Value};
use std::cmp::Ordering;

/// Total order over cells.
///
/// Same-type cells compare by value (floats through `total_cmp`, arrays
/// lexicographically); cells of different types fall back to a fixed type
/// rank. `Null` ranks after every non-null cell.
#[must_use]
pub fn canonical_cmp(left: &Value, right: &Value) -> Ordering {
    match (left, right) {
        (Value::Int(a), Value::Int(b)) => a.cmp(b),
        (Value::Long(a), Value::Long(b)) => a.cmp(b),
        (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
        (Value::Double(a), Value::Double(b)) => a.total_cmp(b),
        (Value::BigDecimal(a), Value::BigDecimal(b)) => a.cmp(b),
        (Value::String(a), Value::String(b)) => a.cmp(b),
        (Value::Bytes(a), Value::Bytes(b)) => a.cmp(b),
        (Value::IntArray(a), Value::IntArray(b)) => a.cmp(b),
        (Value::LongArray(a), Value::LongArray(b)) => a.cmp(b),
        (Value::FloatArray(a), Value::FloatArray(b)) => cmp_slices(a, b, f32::total_cmp),
        (Value::DoubleArray(a), Value::DoubleArray(b)) => cmp_slices(a, b, f64::total_cmp),
        (Value::StringArray(a), Value::StringArray(b)) => a.cmp(b),
        _ => rank(left).cmp(&rank(right)),
    }
}

/// Compare two cells for one order-by column.
///
/// `Less` means `left` sorts first. Nulls sort last in both directions and
/// two nulls are equal; only the non-null comparison is oriented.
#[must_use]
pub fn compare_nulls_last(left: &Value, right: &Value, direction: Direction) -> Ordering {
    match (left.is_null(), right.is_null()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Greater,
        (false, true) => Ordering::Less,
        (false, false) => direction.apply(canonical_cmp(left, right)),
    }
}

fn cmp_slices<T>(left: &[T], right: &[T], cmp: impl Fn(&T, &T) -> Ordering) -> Ordering {
    for (a, b) in left.iter().zip(right) {
        match cmp(a, b) {
            Ordering::Equal => {}
            other => return other,
        }
    }

    left.len().cmp(&right.len())
}

const fn rank(value: &Value) -> u8 {
    match value {
        Value::Int(_) => 0,
        Value::Long(_) => 1,
        Value::Float(_) => 2,
        Value::Double(_) => 3,
        Value::BigDecimal(_) => 4,
        Value::String(_) => 5,
        Value::Bytes(_) => 6,
        Value::IntArray(_) => 7,
        Value::LongArray(_) => 8,
        Value::FloatArray(_) => 9,
        Value::DoubleArray(_) => 10,
        Value::StringArray(_) => 11,
        Value::Null => u8::MAX,
    }
}
