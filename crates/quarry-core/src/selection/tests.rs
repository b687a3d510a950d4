use super::{
    Offer, OrderByComparator, OrderByExpression, OrderedRows, SelectionOnlyOperator,
    SelectionOrderByOperator, SelectionStrategy, TopKHeap, extract_expressions, selection_columns,
};
use crate::{
    block::{ColumnValues, MemorySegment},
    config::QueryOptions,
    direction::Direction,
    result::ResultRows,
    value::{FieldKind, Row, Value},
};
use proptest::prelude::*;
use roaring::RoaringBitmap;

fn names(items: &[&str]) -> Vec<String> {
    items.iter().map(|s| (*s).to_string()).collect()
}

fn row(cells: Vec<Value>) -> Row {
    Row::new(cells)
}

fn ordered_rows(result: crate::result::IntermediateResult) -> Vec<Row> {
    match result.into_parts().1 {
        ResultRows::OrderedSelection(rows) => rows.into_sorted_rows(),
        other => panic!("expected ordered selection, got {}", other.kind_name()),
    }
}

/// Segment with an id column and a nullable score; score is null for every
/// odd id.
fn scored_segment(num_docs: usize) -> MemorySegment {
    let ids: Vec<i32> = (0..num_docs).map(|i| i32::try_from(i).expect("small id")).collect();
    let scores: Vec<f64> = ids.iter().map(|&i| f64::from(i) * 1.5).collect();
    let nulls: RoaringBitmap = (0..num_docs)
        .filter(|i| i % 2 == 1)
        .map(|i| u32::try_from(i).expect("small id"))
        .collect();

    MemorySegment::new("seg", num_docs)
        .with_column("id", FieldKind::Dimension, ColumnValues::Int(ids), None)
        .expect("id should fit")
        .with_column(
            "score",
            FieldKind::Metric,
            ColumnValues::Double(scores),
            Some(nulls),
        )
        .expect("score should fit")
        .with_column(
            "label",
            FieldKind::Dimension,
            ColumnValues::String((0..num_docs).map(|i| format!("l{i}")).collect()),
            None,
        )
        .expect("label should fit")
        .with_block_size(7)
}

#[test]
fn heap_keeps_the_best_items_and_reports_evictions() {
    let mut heap = TopKHeap::new(2);
    let order = |a: &i32, b: &i32| a.cmp(b);

    assert!(matches!(heap.offer(5, order), Offer::Inserted));
    assert!(matches!(heap.offer(3, order), Offer::Inserted));
    assert!(matches!(heap.offer(9, order), Offer::Rejected(9)));
    assert!(matches!(heap.offer(1, order), Offer::Replaced(5)));
    assert_eq!(heap.peek_worst(), Some(&3));
    assert_eq!(heap.into_sorted_vec(order), vec![1, 3]);
}

#[test]
fn zero_sized_heap_rejects_everything() {
    let mut heap = TopKHeap::new(0);

    assert!(matches!(heap.offer(1, |a: &i32, b: &i32| a.cmp(b)), Offer::Rejected(1)));
    assert!(heap.is_empty());
}

#[test]
fn ties_keep_the_earlier_item() {
    let mut heap = TopKHeap::new(1);
    let order = |a: &(i32, char), b: &(i32, char)| a.0.cmp(&b.0);

    heap.offer((1, 'a'), order);
    assert!(matches!(heap.offer((1, 'b'), order), Offer::Rejected((1, 'b'))));
}

#[test]
fn comparator_places_nulls_last_and_falls_through_ties() {
    let comparator = OrderByComparator::new(vec![(0, Direction::Desc), (1, Direction::Asc)]);
    let mut rows = vec![
        row(vec![Value::Null, Value::Int(1)]),
        row(vec![Value::Double(1.0), Value::Int(2)]),
        row(vec![Value::Double(1.0), Value::Int(1)]),
        row(vec![Value::Double(3.0), Value::Null]),
        row(vec![Value::Null, Value::Null]),
    ];

    rows.sort_by(|a, b| comparator.compare(a, b));

    assert_eq!(
        rows,
        vec![
            row(vec![Value::Double(3.0), Value::Null]),
            row(vec![Value::Double(1.0), Value::Int(1)]),
            row(vec![Value::Double(1.0), Value::Int(2)]),
            row(vec![Value::Null, Value::Int(1)]),
            row(vec![Value::Null, Value::Null]),
        ]
    );
}

#[test]
fn ordered_rows_reject_multi_value_sort_cells() {
    let mut rows = OrderedRows::new(OrderByComparator::leading([Direction::Asc]), 4, 4);

    let err = rows
        .offer(row(vec![Value::IntArray(vec![1])]))
        .expect_err("array sort cell should be rejected");
    assert!(err.is_internal_state());
}

#[test]
fn ordered_rows_merge_reoffers_the_other_side() {
    let comparator = OrderByComparator::leading([Direction::Asc]);
    let mut left = OrderedRows::new(comparator.clone(), 2, 2);
    let mut right = OrderedRows::new(comparator, 2, 2);
    for value in [4, 8] {
        left.offer(row(vec![Value::Int(value)])).expect("offer");
    }
    for value in [1, 6] {
        right.offer(row(vec![Value::Int(value)])).expect("offer");
    }

    left.merge(right).expect("merge should succeed");

    assert_eq!(
        left.into_sorted_rows(),
        vec![row(vec![Value::Int(1)]), row(vec![Value::Int(4)])]
    );
}

#[test]
fn expressions_put_order_by_first_and_expand_star() {
    let all = names(&["b", "$docId", "a"]);
    let order_by = vec![OrderByExpression::desc("b")];

    assert_eq!(
        extract_expressions(&names(&["*", "c"]), &order_by, 10, &all),
        names(&["b", "a", "c"])
    );
    assert_eq!(
        extract_expressions(&names(&["a"]), &order_by, 0, &all),
        names(&["a"])
    );
    assert_eq!(
        selection_columns(&names(&["a", "*", "a"]), &all),
        names(&["a", "a", "b", "a"])
    );
}

#[test]
fn strategy_follows_sortedness_and_projection() {
    let segment = scored_segment(10).with_sorted_column("id");
    let options = QueryOptions::new();

    let pre_sorted = SelectionOrderByOperator::new(
        &segment,
        &names(&["label"]),
        &[OrderByExpression::asc("id")],
        &options,
    );
    assert_eq!(pre_sorted.strategy(), SelectionStrategy::PreSorted);

    let descending = SelectionOrderByOperator::new(
        &segment,
        &names(&["id"]),
        &[OrderByExpression::desc("id")],
        &options,
    );
    assert_eq!(descending.strategy(), SelectionStrategy::AllOrdered);

    let partial = SelectionOrderByOperator::new(
        &segment,
        &names(&["label"]),
        &[OrderByExpression::desc("score")],
        &options,
    );
    assert_eq!(partial.strategy(), SelectionStrategy::PartiallyOrdered);
    assert_eq!(partial.expressions(), names(&["score", "label"]).as_slice());
}

#[test]
fn pre_sorted_selection_stops_after_enough_documents() {
    let segment = scored_segment(50).with_sorted_column("id");
    let options = QueryOptions::new().with_limit(3).with_offset(2);

    let result = SelectionOrderByOperator::new(
        &segment,
        &names(&["id"]),
        &[OrderByExpression::asc("id")],
        &options,
    )
    .execute()
    .expect("selection should succeed");

    assert_eq!(result.stats().num_docs_scanned, 5);
    let ids: Vec<Value> = ordered_rows(result)
        .into_iter()
        .map(|row| row[0].clone())
        .collect();
    assert_eq!(ids, (0..5).map(Value::Int).collect::<Vec<_>>());
}

#[test]
fn partially_ordered_selection_completes_rows_in_a_second_pass() {
    let segment = scored_segment(40);
    let options = QueryOptions::new()
        .with_limit(3)
        .with_null_handling(true);

    let result = SelectionOrderByOperator::new(
        &segment,
        &names(&["label"]),
        &[OrderByExpression::desc("score")],
        &options,
    )
    .execute()
    .expect("selection should succeed");

    assert_eq!(result.stats().num_docs_scanned, 40);
    assert_eq!(
        ordered_rows(result),
        vec![
            row(vec![Value::Double(57.0), Value::from("l38")]),
            row(vec![Value::Double(54.0), Value::from("l36")]),
            row(vec![Value::Double(51.0), Value::from("l34")]),
        ]
    );
}

#[test]
fn null_scores_fill_the_tail_once_values_run_out() {
    let segment = scored_segment(6);
    let options = QueryOptions::new()
        .with_limit(5)
        .with_null_handling(true);

    let rows = ordered_rows(
        SelectionOrderByOperator::new(
            &segment,
            &names(&["score", "id"]),
            &[OrderByExpression::asc("score")],
            &options,
        )
        .execute()
        .expect("selection should succeed"),
    );

    let scores: Vec<bool> = rows.iter().map(|row| row[0].is_null()).collect();
    assert_eq!(scores, vec![false, false, false, true, true]);
}

#[test]
fn selection_only_takes_rows_in_scan_order() {
    let segment = scored_segment(20);
    let options = QueryOptions::new().with_limit(4).with_offset(1);

    let result = SelectionOnlyOperator::new(&segment, &names(&["id"]), &options)
        .execute()
        .expect("selection should succeed");

    let ResultRows::Selection(rows) = result.rows() else {
        panic!("expected plain selection rows");
    };
    assert_eq!(rows.len(), 5);
    assert_eq!(rows[4], row(vec![Value::Int(4)]));
}

#[test]
fn selection_with_zero_limit_returns_only_the_schema() {
    let segment = scored_segment(20);
    let options = QueryOptions::new().with_limit(0);

    let result = SelectionOnlyOperator::new(&segment, &names(&["*"]), &options)
        .execute()
        .expect("selection should succeed");

    assert!(result.rows().is_empty());
    assert_eq!(result.schema().names(), vec!["id", "label", "score"]);
    assert_eq!(result.stats().num_docs_scanned, 0);
}

proptest! {
    #[test]
    fn heap_keeps_exactly_the_smallest_k(
        values in proptest::collection::vec(any::<i16>(), 0..200),
        k in 0_usize..20,
    ) {
        let mut heap = TopKHeap::new(k);
        for &value in &values {
            heap.offer(value, |a: &i16, b: &i16| a.cmp(b));
        }
        let mut expected = values.clone();
        expected.sort_unstable();
        expected.truncate(k);

        prop_assert!(heap.len() <= k);
        prop_assert_eq!(heap.into_sorted_vec(|a, b| a.cmp(b)), expected);
    }

    #[test]
    fn nulls_never_precede_values(
        cells in proptest::collection::vec(proptest::option::of(any::<i32>()), 0..50),
        descending in any::<bool>(),
    ) {
        let direction = if descending { Direction::Desc } else { Direction::Asc };
        let comparator = OrderByComparator::leading([direction]);
        let mut rows: Vec<Row> = cells.into_iter().map(|c| row(vec![Value::from(c)])).collect();

        rows.sort_by(|a, b| comparator.compare(a, b));

        let first_null = rows.iter().position(|r| r[0].is_null()).unwrap_or(rows.len());
        prop_assert!(rows[first_null..].iter().all(|r| r[0].is_null()));
    }
}
