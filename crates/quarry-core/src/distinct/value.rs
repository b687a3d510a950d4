use crate::{
    block::ColumnValues,
    value::{ByteArray, Value},
};
use ordered_float::OrderedFloat;
use quarry_primitives::StoredType;
use rust_decimal::Decimal;
use std::{fmt::Debug, hash::Hash};

///
/// DistinctValue
///
/// Element type of a distinct executor: hashable for dedup, totally ordered
/// for ordered mode.
///

pub trait DistinctValue: Clone + Debug + Eq + Hash + Ord {
    const STORED_TYPE: StoredType;

    /// Value at `index` of a single-value column, `None` on a type mismatch.
    fn read(values: &ColumnValues, index: usize) -> Option<Self>;

    fn from_value(value: &Value) -> Option<Self>;

    fn into_value(self) -> Value;
}

macro_rules! impl_distinct_value {
    ($ty:ty, $stored:ident, $read:expr, $from:expr, $into:expr) => {
        impl DistinctValue for $ty {
            const STORED_TYPE: StoredType = StoredType::$stored;

            fn read(values: &ColumnValues, index: usize) -> Option<Self> {
                match values {
                    ColumnValues::$stored(v) => v.get(index).map($read),
                    _ => None,
                }
            }

            fn from_value(value: &Value) -> Option<Self> {
                match value {
                    Value::$stored(v) => Some($from(v)),
                    _ => None,
                }
            }

            fn into_value(self) -> Value {
                Value::$stored($into(self))
            }
        }
    };
}

impl_distinct_value!(i32, Int, |v: &i32| *v, |v: &i32| *v, |v| v);
impl_distinct_value!(i64, Long, |v: &i64| *v, |v: &i64| *v, |v| v);
impl_distinct_value!(
    OrderedFloat<f32>,
    Float,
    |v: &f32| OrderedFloat(*v),
    |v: &f32| OrderedFloat(*v),
    |v: OrderedFloat<f32>| v.into_inner()
);
impl_distinct_value!(
    OrderedFloat<f64>,
    Double,
    |v: &f64| OrderedFloat(*v),
    |v: &f64| OrderedFloat(*v),
    |v: OrderedFloat<f64>| v.into_inner()
);
impl_distinct_value!(
    Decimal,
    BigDecimal,
    |v: &Decimal| v.normalize(),
    |v: &Decimal| v.normalize(),
    |v| v
);
impl_distinct_value!(String, String, |v: &String| v.clone(), |v: &String| v.clone(), |v| v);
impl_distinct_value!(
    ByteArray,
    Bytes,
    |v: &ByteArray| v.clone(),
    |v: &ByteArray| v.clone(),
    |v| v
);
