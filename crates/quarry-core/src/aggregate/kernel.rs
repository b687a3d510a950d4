//! Module: aggregate::kernel
//! Responsibility: null-aware numeric folds shared by every numeric aggregate.
//! Does not own: holder state or null-marking policy.
//! Boundary: one generic fold per operation, dispatched once per block over
//! the closed [`NumericSlice`] tag set.

use crate::{
    block::{NumericSlice, bitmap_position},
    error::{ErrorOrigin, InternalError},
    value::decimal::decimal_to_f64,
};
use roaring::RoaringBitmap;
use rust_decimal::Decimal;

macro_rules! with_numeric_slice {
    ($slice:expr, $values:ident => $body:expr) => {
        match $slice {
            NumericSlice::Int($values) => $body,
            NumericSlice::Long($values) => $body,
            NumericSlice::Float($values) => $body,
            NumericSlice::Double($values) => $body,
            NumericSlice::BigDecimal($values) => $body,
        }
    };
}

///
/// NumericElement
///
/// Element type of a numeric column. `EMPTY_MIN` / `EMPTY_MAX` are the block
/// results when every position is null.
///

pub(crate) trait NumericElement: Copy + PartialOrd {
    const EMPTY_MIN: f64;
    const EMPTY_MAX: f64;

    fn to_f64(self) -> f64;
}

impl NumericElement for i32 {
    const EMPTY_MIN: f64 = Self::MAX as f64;
    const EMPTY_MAX: f64 = Self::MIN as f64;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl NumericElement for i64 {
    #[allow(clippy::cast_precision_loss)]
    const EMPTY_MIN: f64 = Self::MAX as f64;
    #[allow(clippy::cast_precision_loss)]
    const EMPTY_MAX: f64 = Self::MIN as f64;

    #[allow(clippy::cast_precision_loss)]
    fn to_f64(self) -> f64 {
        self as f64
    }
}

impl NumericElement for f32 {
    const EMPTY_MIN: f64 = f64::INFINITY;
    const EMPTY_MAX: f64 = f64::NEG_INFINITY;

    fn to_f64(self) -> f64 {
        f64::from(self)
    }
}

impl NumericElement for f64 {
    const EMPTY_MIN: f64 = Self::INFINITY;
    const EMPTY_MAX: f64 = Self::NEG_INFINITY;

    fn to_f64(self) -> f64 {
        self
    }
}

impl NumericElement for Decimal {
    const EMPTY_MIN: f64 = f64::INFINITY;
    const EMPTY_MAX: f64 = f64::NEG_INFINITY;

    fn to_f64(self) -> f64 {
        decimal_to_f64(self)
    }
}

/// Fold the non-null values among the first `length` positions.
pub(crate) fn fold_non_null<T: Copy, A>(
    values: &[T],
    length: usize,
    nulls: Option<&RoaringBitmap>,
    init: A,
    mut f: impl FnMut(A, T) -> A,
) -> A {
    let mut acc = init;
    for (index, &value) in values.iter().enumerate().take(length) {
        if nulls.is_some_and(|bitmap| bitmap.contains(bitmap_position(index))) {
            continue;
        }
        acc = f(acc, value);
    }

    acc
}

fn block_min<T: NumericElement>(values: &[T], length: usize, nulls: Option<&RoaringBitmap>) -> f64 {
    fold_non_null(values, length, nulls, None, |acc: Option<T>, v| match acc {
        Some(current) if current <= v => Some(current),
        _ => Some(v),
    })
    .map_or(T::EMPTY_MIN, T::to_f64)
}

fn block_max<T: NumericElement>(values: &[T], length: usize, nulls: Option<&RoaringBitmap>) -> f64 {
    fold_non_null(values, length, nulls, None, |acc: Option<T>, v| match acc {
        Some(current) if current >= v => Some(current),
        _ => Some(v),
    })
    .map_or(T::EMPTY_MAX, T::to_f64)
}

fn block_sum<T: NumericElement>(values: &[T], length: usize, nulls: Option<&RoaringBitmap>) -> f64 {
    fold_non_null(values, length, nulls, 0.0, |acc, v| acc + v.to_f64())
}

impl NumericSlice<'_> {
    /// Smallest non-null value, or the type's empty-block sentinel.
    #[must_use]
    pub(crate) fn min(&self, length: usize, nulls: Option<&RoaringBitmap>) -> f64 {
        with_numeric_slice!(*self, values => block_min(values, length, nulls))
    }

    /// Largest non-null value, or the type's empty-block sentinel.
    #[must_use]
    pub(crate) fn max(&self, length: usize, nulls: Option<&RoaringBitmap>) -> f64 {
        with_numeric_slice!(*self, values => block_max(values, length, nulls))
    }

    /// Sum of non-null values as a double. Decimals are summed exactly
    /// first and converted once.
    pub(crate) fn sum(
        &self,
        length: usize,
        nulls: Option<&RoaringBitmap>,
    ) -> Result<f64, InternalError> {
        match *self {
            NumericSlice::BigDecimal(values) => {
                let sum = fold_non_null(values, length, nulls, Some(Decimal::ZERO), |acc, v| {
                    acc.and_then(|sum: Decimal| sum.checked_add(v))
                })
                .ok_or_else(|| {
                    InternalError::invalid_argument(
                        ErrorOrigin::Aggregate,
                        "decimal sum overflow",
                    )
                })?;

                Ok(decimal_to_f64(sum))
            }
            NumericSlice::Int(values) => Ok(block_sum(values, length, nulls)),
            NumericSlice::Long(values) => Ok(block_sum(values, length, nulls)),
            NumericSlice::Float(values) => Ok(block_sum(values, length, nulls)),
            NumericSlice::Double(values) => Ok(block_sum(values, length, nulls)),
        }
    }
}

/// Number of non-null positions among the first `length`.
#[must_use]
pub(crate) fn count_non_null(len: usize, length: usize, nulls: Option<&RoaringBitmap>) -> i64 {
    let scanned = len.min(length);
    let null_count = nulls.map_or(0, |bitmap| {
        bitmap
            .iter()
            .take_while(|&pos| (pos as usize) < scanned)
            .count()
    });

    i64::try_from(scanned - null_count).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bitmap(positions: &[u32]) -> RoaringBitmap {
        positions.iter().copied().collect()
    }

    #[test]
    fn min_skips_null_positions() {
        let values = [5, -3, 8];
        let slice = NumericSlice::Int(&values);

        assert_eq!(slice.min(3, Some(&bitmap(&[1]))), 5.0);
        assert_eq!(slice.min(3, None), -3.0);
    }

    #[test]
    fn all_null_block_yields_type_sentinels() {
        let ints = [1, 2];
        let longs = [1_i64, 2];
        let doubles = [1.0, 2.0];
        let nulls = bitmap(&[0, 1]);

        assert_eq!(NumericSlice::Int(&ints).min(2, Some(&nulls)), 2_147_483_647.0);
        assert_eq!(NumericSlice::Int(&ints).max(2, Some(&nulls)), -2_147_483_648.0);
        assert_eq!(
            NumericSlice::Long(&longs).min(2, Some(&nulls)),
            i64::MAX as f64
        );
        assert_eq!(
            NumericSlice::Double(&doubles).min(2, Some(&nulls)),
            f64::INFINITY
        );
    }

    #[test]
    fn fold_is_clipped_to_the_shorter_of_length_and_values() {
        let values = [1.0_f32, 2.0, 3.0];
        let slice = NumericSlice::Float(&values);

        assert_eq!(slice.sum(10, None).expect("sum should succeed"), 6.0);
        assert_eq!(slice.sum(2, None).expect("sum should succeed"), 3.0);
    }

    #[test]
    fn decimal_sum_is_exact_before_conversion() {
        let values = [
            Decimal::new(1, 1),
            Decimal::new(2, 1),
            Decimal::new(7, 1),
        ];
        let sum = NumericSlice::BigDecimal(&values)
            .sum(3, None)
            .expect("decimal sum should succeed");

        assert_eq!(sum, 1.0);
    }

    #[test]
    fn count_non_null_respects_length() {
        let nulls = bitmap(&[0, 4, 9]);

        assert_eq!(count_non_null(10, 10, Some(&nulls)), 7);
        assert_eq!(count_non_null(10, 5, Some(&nulls)), 3);
        assert_eq!(count_non_null(10, 5, None), 5);
    }
}
