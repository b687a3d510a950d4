use super::{
    ByteArray, ColumnDataType, FieldKind, Row, Value, ValueKey, canonical_cmp,
    compare_nulls_last,
    decimal::{parse_decimal, round_to_precision, set_scale},
    deserialize_decimal, serialize_decimal,
};
use crate::direction::Direction;
use proptest::prelude::*;
use quarry_primitives::StoredType;
use rust_decimal::Decimal;
use std::{cmp::Ordering, str::FromStr};

fn dec(text: &str) -> Decimal {
    Decimal::from_str(text).expect("decimal literal should parse")
}

#[test]
fn nulls_sort_last_in_both_directions() {
    let null = Value::Null;
    let one = Value::Int(1);

    for direction in [Direction::Asc, Direction::Desc] {
        assert_eq!(compare_nulls_last(&one, &null, direction), Ordering::Less);
        assert_eq!(compare_nulls_last(&null, &one, direction), Ordering::Greater);
        assert_eq!(compare_nulls_last(&null, &null, direction), Ordering::Equal);
    }
}

#[test]
fn direction_only_orients_non_null_comparisons() {
    let low = Value::Double(1.5);
    let high = Value::Double(2.5);

    assert_eq!(compare_nulls_last(&low, &high, Direction::Asc), Ordering::Less);
    assert_eq!(compare_nulls_last(&low, &high, Direction::Desc), Ordering::Greater);
}

#[test]
fn canonical_cmp_orders_arrays_lexicographically() {
    let short = Value::DoubleArray(vec![1.0, 2.0]);
    let long = Value::DoubleArray(vec![1.0, 2.0, 0.5]);
    let bigger = Value::DoubleArray(vec![1.5]);

    assert_eq!(canonical_cmp(&short, &long), Ordering::Less);
    assert_eq!(canonical_cmp(&long, &bigger), Ordering::Less);
}

#[test]
fn canonical_cmp_mixed_types_use_a_fixed_rank() {
    assert_eq!(
        canonical_cmp(&Value::Int(100), &Value::from("a")),
        Ordering::Less
    );
    assert_eq!(
        canonical_cmp(&Value::from("a"), &Value::Null),
        Ordering::Less
    );
}

#[test]
fn value_key_round_trips_and_normalizes_decimals() {
    let scaled = Value::BigDecimal(dec("1.50"));
    let plain = Value::BigDecimal(dec("1.5"));

    assert_eq!(ValueKey::from(&scaled), ValueKey::from(&plain));
    assert_eq!(
        Value::from(ValueKey::from(&Value::FloatArray(vec![1.0, -2.0]))),
        Value::FloatArray(vec![1.0, -2.0])
    );
    assert_eq!(Value::from(ValueKey::Null), Value::Null);
}

#[test]
fn option_conversion_maps_none_to_null() {
    assert_eq!(Value::from(None::<i32>), Value::Null);
    assert_eq!(Value::from(Some(7_i64)), Value::Long(7));
}

#[test]
fn row_nulls_builds_a_row_of_the_requested_width() {
    let row = Row::nulls(3);

    assert_eq!(row.len(), 3);
    assert!(row.iter().all(Value::is_null));
}

#[test]
fn byte_array_renders_lowercase_hex() {
    let bytes = ByteArray::new(vec![0x00, 0xab, 0x10]);

    assert_eq!(bytes.to_hex(), "00ab10");
}

#[test]
fn data_type_round_trips_stored_types() {
    for stored_type in [StoredType::Int, StoredType::Long, StoredType::String] {
        for single_value in [true, false] {
            let data_type = ColumnDataType::from_stored(stored_type, single_value)
                .expect("type should have a result column form");

            assert_eq!(data_type.stored_type(), Some(stored_type));
            assert_eq!(data_type.is_array(), !single_value);
        }
    }
    assert_eq!(ColumnDataType::from_stored(StoredType::Bytes, false), None);
    assert_eq!(ColumnDataType::Object.stored_type(), None);
}

#[test]
fn null_placeholders_depend_on_field_kind() {
    assert_eq!(
        ColumnDataType::Int.null_placeholder(FieldKind::Dimension),
        Value::Int(i32::MIN)
    );
    assert_eq!(
        ColumnDataType::Int.null_placeholder(FieldKind::Metric),
        Value::Int(0)
    );
    assert_eq!(
        ColumnDataType::String.null_placeholder(FieldKind::Dimension),
        Value::from("null")
    );
}

#[test]
fn convert_widens_and_passes_nulls_through() {
    assert_eq!(
        ColumnDataType::Double
            .convert(Value::Int(3))
            .expect("int should widen to double"),
        Value::Double(3.0)
    );
    assert_eq!(
        ColumnDataType::LongArray
            .convert(Value::IntArray(vec![1, 2]))
            .expect("int array should widen to long array"),
        Value::LongArray(vec![1, 2])
    );
    assert_eq!(
        ColumnDataType::Int
            .convert(Value::Null)
            .expect("null should pass through"),
        Value::Null
    );

    let err = ColumnDataType::Int
        .convert(Value::from("x"))
        .expect_err("string should not convert to int");
    assert!(err.is_unsupported());
}

#[test]
fn format_renders_decimals_and_bytes_as_strings() {
    assert_eq!(
        ColumnDataType::BigDecimal
            .convert_and_format(Value::BigDecimal(dec("12.340")))
            .expect("decimal should format"),
        Value::from("12.340")
    );
    assert_eq!(
        ColumnDataType::Bytes
            .convert_and_format(Value::Bytes(ByteArray::new(vec![0xff])))
            .expect("bytes should format"),
        Value::from("ff")
    );
}

#[test]
fn decimal_rounding_is_half_even() {
    assert_eq!(set_scale(dec("3.010"), 2), dec("3.01"));
    assert_eq!(set_scale(dec("2.125"), 2), dec("2.12"));
    assert_eq!(set_scale(dec("2.135"), 2), dec("2.14"));
    assert_eq!(set_scale(dec("7"), 2).to_string(), "7.00");
    assert_eq!(round_to_precision(dec("123.45"), 4), dec("123.4"));
    assert_eq!(round_to_precision(dec("123.45"), 0), dec("123.45"));
}

#[test]
fn parse_decimal_accepts_scientific_notation() {
    assert_eq!(
        parse_decimal("1.5e2").expect("scientific text should parse"),
        dec("150")
    );
    assert!(parse_decimal("abc").is_err());
}

#[test]
fn decimal_bytes_keep_scale_and_sign() {
    for text in ["0", "-1", "127", "128", "-129", "3.0100", "-0.0001"] {
        let value = dec(text);
        let decoded = deserialize_decimal(&serialize_decimal(value))
            .expect("serialized decimal should decode");

        assert_eq!(decoded, value);
        assert_eq!(decoded.scale(), value.scale());
    }
}

#[test]
fn decimal_bytes_reject_truncated_input() {
    assert!(deserialize_decimal(&[0x00]).is_err());
    assert!(deserialize_decimal(&[]).is_err());
}

proptest! {
    #[test]
    fn nulls_last_ordering_is_antisymmetric(
        left in proptest::option::of(any::<i64>()),
        right in proptest::option::of(any::<i64>()),
        descending in any::<bool>(),
    ) {
        let direction = if descending { Direction::Desc } else { Direction::Asc };
        let (left, right) = (Value::from(left), Value::from(right));

        prop_assert_eq!(
            compare_nulls_last(&left, &right, direction),
            compare_nulls_last(&right, &left, direction).reverse()
        );
    }

    #[test]
    fn decimal_bytes_preserve_values(mantissa in any::<i64>(), scale in 0_u32..12) {
        let value = Decimal::new(mantissa, scale);
        let decoded = deserialize_decimal(&serialize_decimal(value))
            .expect("serialized decimal should decode");

        prop_assert_eq!(decoded, value);
    }
}
