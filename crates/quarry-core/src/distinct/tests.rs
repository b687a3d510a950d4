use super::{DistinctExecutor, DistinctExecutorFactory, DistinctOperator};
use crate::{
    block::{BlockValSet, ColumnValues, MemorySegment},
    config::QueryOptions,
    direction::Direction,
    result::ResultRows,
    value::{FieldKind, Value},
};
use ordered_float::OrderedFloat;
use proptest::prelude::*;
use quarry_primitives::StoredType;
use roaring::RoaringBitmap;
use rust_decimal::Decimal;
use std::{collections::BTreeSet, str::FromStr};

fn ints(values: &[i32], nulls: &[u32]) -> BlockValSet {
    BlockValSet::new(ColumnValues::Int(values.to_vec()))
        .with_null_bitmap(nulls.iter().copied().collect::<RoaringBitmap>())
}

#[test]
fn unordered_executor_keeps_the_first_values_seen() {
    let mut executor = DistinctExecutor::<i32>::new(3, None, false);

    let done = executor
        .process(&ints(&[1, 1, 3, 5, 7, 9], &[]), 6)
        .expect("ints should be accepted");

    assert!(done);
    assert_eq!(
        executor.into_result(),
        vec![Value::Int(1), Value::Int(3), Value::Int(5)]
    );
}

#[test]
fn ordered_executor_keeps_the_best_values_with_nulls_last() {
    let mut executor = DistinctExecutor::<i32>::new(3, Some(Direction::Desc), true);

    let done = executor
        .process(&ints(&[4, 0, 9, 2, 9], &[1]), 5)
        .expect("ints should be accepted");

    assert!(!done);
    assert_eq!(
        executor.into_result(),
        vec![Value::Int(9), Value::Int(4), Value::Int(2)]
    );
}

#[test]
fn null_is_kept_when_too_few_values_exist() {
    let mut executor = DistinctExecutor::<i32>::new(5, Some(Direction::Asc), true);

    executor
        .process(&ints(&[3, 0, 1], &[1]), 3)
        .expect("ints should be accepted");

    assert_eq!(
        executor.into_result(),
        vec![Value::Int(1), Value::Int(3), Value::Null]
    );
}

#[test]
fn nulls_are_plain_values_without_null_handling() {
    let mut executor = DistinctExecutor::<i32>::new(5, None, false);

    executor
        .process(&ints(&[3, 0], &[1]), 2)
        .expect("ints should be accepted");
    executor
        .add_value(&Value::Null)
        .expect("null should be dropped");

    assert_eq!(executor.into_result(), vec![Value::Int(3), Value::Int(0)]);
}

#[test]
fn add_value_rejects_a_mismatched_cell() {
    let mut executor = DistinctExecutor::<i64>::new(5, None, false);

    let err = executor
        .add_value(&Value::from("x"))
        .expect_err("string should not enter a long executor");
    assert!(err.is_internal_state());
}

#[test]
fn process_rejects_a_column_of_another_type() {
    let mut executor = DistinctExecutor::<String>::new(5, None, false);

    assert!(executor.process(&ints(&[1], &[]), 1).is_err());
}

#[test]
fn decimals_dedupe_across_scales() {
    let mut executor = DistinctExecutor::<Decimal>::new(5, None, false);
    let column = BlockValSet::new(ColumnValues::BigDecimal(vec![
        Decimal::from_str("1.50").expect("decimal"),
        Decimal::from_str("1.5").expect("decimal"),
    ]));

    executor.process(&column, 2).expect("decimals should be accepted");

    assert_eq!(executor.len(), 1);
}

#[test]
fn float_nan_is_a_single_distinct_value() {
    let mut executor = DistinctExecutor::<OrderedFloat<f64>>::new(5, None, false);
    let column = BlockValSet::new(ColumnValues::Double(vec![f64::NAN, f64::NAN, 1.0]));

    executor.process(&column, 3).expect("doubles should be accepted");

    assert_eq!(executor.len(), 2);
}

#[test]
fn factory_rejects_multi_value_columns() {
    let err = DistinctExecutorFactory::create(StoredType::Int, false, None, 10, false)
        .expect_err("multi-value distinct should be rejected");

    assert!(err.is_unsupported());
}

#[test]
fn merge_of_mismatched_executors_fails() {
    let mut left = DistinctExecutorFactory::create(StoredType::Int, true, None, 10, false)
        .expect("int executor");
    let right = DistinctExecutorFactory::create(StoredType::Long, true, None, 10, false)
        .expect("long executor");

    assert!(left.merge(right).is_err());
}

#[test]
fn merged_ordered_executors_keep_the_global_best() {
    let mut left = DistinctExecutorFactory::create(StoredType::Int, true, Some(Direction::Asc), 2, false)
        .expect("int executor");
    let mut right = DistinctExecutorFactory::create(StoredType::Int, true, Some(Direction::Asc), 2, false)
        .expect("int executor");
    left.process(&ints(&[8, 3, 5], &[]), 3).expect("left");
    right.process(&ints(&[4, 1], &[]), 2).expect("right");

    left.merge(right).expect("same-type merge should succeed");

    assert_eq!(
        left.into_result().values(),
        &[Value::Int(1), Value::Int(3)]
    );
}

#[test]
fn operator_stops_scanning_once_saturated() {
    let segment = MemorySegment::new("seg", 100)
        .with_column(
            "v",
            FieldKind::Dimension,
            ColumnValues::Int((0..100).collect()),
            None,
        )
        .expect("v should fit")
        .with_block_size(10);
    let options = QueryOptions::new().with_limit(3);

    let result = DistinctOperator::new(&segment, "v", None, options)
        .execute()
        .expect("distinct should succeed");

    assert_eq!(result.stats().num_docs_scanned, 10);
    let ResultRows::Distinct(executor) = result.into_parts().1 else {
        panic!("expected distinct rows");
    };
    assert_eq!(
        executor.into_result().values(),
        &[Value::Int(0), Value::Int(1), Value::Int(2)]
    );
}

#[test]
fn operator_rejects_multi_value_columns() {
    let segment = MemorySegment::new("seg", 1)
        .with_column(
            "tags",
            FieldKind::Dimension,
            ColumnValues::StringMv(vec![vec!["a".into()]]),
            None,
        )
        .expect("tags should fit");

    assert!(
        DistinctOperator::new(&segment, "tags", None, QueryOptions::new())
            .execute()
            .is_err()
    );
}

proptest! {
    #[test]
    fn unordered_results_are_unique_and_bounded(
        values in proptest::collection::vec(0_i32..20, 0..100),
        limit in 0_usize..10,
    ) {
        let mut executor = DistinctExecutor::<i32>::new(limit, None, false);
        for value in &values {
            executor.add_value(&Value::Int(*value)).expect("int should be accepted");
        }
        let result = executor.into_result();
        let unique: BTreeSet<i64> = result.iter().filter_map(Value::as_long).collect();

        prop_assert!(result.len() <= limit);
        prop_assert_eq!(result.len(), unique.len());
    }
}
