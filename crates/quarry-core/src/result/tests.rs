use super::{
    BrokerReducer, ColumnSchema, CombineOperator, DataSchema, DataTable, ExecutionStats,
    GroupByRows, IntermediateResult, MetadataKey, ResultRows, merge_with_ordering,
    merge_without_ordering, render_result_table,
};
use crate::{
    aggregate::{AggregationFunctionVariant, MaxFunction, MinFunction, SumPrecisionFunction},
    config::QueryOptions,
    direction::Direction,
    error::{ErrorClass, ErrorOrigin, InternalError, ProcessingException, QueryErrorCode},
    query::QueryContext,
    selection::{OrderByComparator, OrderByExpression, OrderedRows},
    value::{ColumnDataType, FieldKind, Row, Value, ValueKey},
};
use proptest::prelude::*;
use rust_decimal::Decimal;
use std::str::FromStr;

fn row(cells: Vec<Value>) -> Row {
    Row::new(cells)
}

fn schema(columns: &[(&str, ColumnDataType, FieldKind)]) -> DataSchema {
    DataSchema::new(
        columns
            .iter()
            .map(|(name, data_type, kind)| ColumnSchema::new(*name, *data_type, *kind))
            .collect(),
    )
}

fn stats(docs: u64) -> ExecutionStats {
    let mut stats = ExecutionStats::for_segment(docs);
    stats.record_scan(docs, docs);
    stats
}

#[test]
fn data_table_restores_nulls_after_a_byte_round_trip() {
    let schema = schema(&[
        ("name", ColumnDataType::String, FieldKind::Dimension),
        ("score", ColumnDataType::Double, FieldKind::Metric),
    ]);
    let rows = vec![
        row(vec![Value::from("a"), Value::Null]),
        row(vec![Value::Null, Value::Double(2.5)]),
    ];

    let table = DataTable::from_rows(schema, rows.clone()).expect("rows should fit the schema");
    assert_eq!(
        table.raw_row(0),
        Some(&row(vec![Value::from("a"), Value::Double(0.0)]))
    );

    let decoded = DataTable::from_bytes(&table.to_bytes().expect("table should encode"))
        .expect("table should decode");
    assert_eq!(decoded.extract_rows().collect::<Vec<_>>(), rows);
    assert!(
        decoded
            .null_bitmap(1)
            .expect("score bitmap")
            .contains(0)
    );
}

#[test]
fn data_table_rejects_rows_of_the_wrong_width() {
    let schema = schema(&[("a", ColumnDataType::Int, FieldKind::Dimension)]);

    let err = DataTable::from_rows(schema, vec![row(vec![Value::Int(1), Value::Int(2)])])
        .expect_err("two cells should not fit one column");
    assert!(err.is_internal_state());
}

#[test]
fn stats_round_trip_through_metadata() {
    let mut original = stats(42);
    original.num_groups_limit_reached = true;
    original.num_resizes = 3;
    let mut table = DataTable::default();

    table.set_stats(&original);

    assert_eq!(table.metadata().len(), MetadataKey::ALL.len());
    assert_eq!(
        table.metadata().get("numDocsScanned").map(String::as_str),
        Some("42")
    );
    assert_eq!(table.stats(), original);
}

#[test]
fn stats_merge_by_summing() {
    let mut left = stats(10);
    left.merge(&stats(0));

    assert_eq!(left.num_docs_scanned, 10);
    assert_eq!(left.num_segments_processed, 2);
    assert_eq!(left.num_segments_matched, 1);
}

#[test]
fn merge_without_ordering_stops_at_the_limit() {
    let mut target = vec![row(vec![Value::Int(1)])];

    merge_without_ordering(
        &mut target,
        vec![row(vec![Value::Int(2)]), row(vec![Value::Int(3)])],
        2,
    );

    assert_eq!(target, vec![row(vec![Value::Int(1)]), row(vec![Value::Int(2)])]);
}

#[test]
fn combine_turns_segment_failures_into_exceptions() {
    let functions = vec![AggregationFunctionVariant::Min(MinFunction::new("v"))];
    let schema = schema(&[("min(v)", ColumnDataType::Double, FieldKind::Metric)]);
    let partial = |value: Value| -> Result<IntermediateResult, InternalError> {
        Ok(IntermediateResult::new(
            schema.clone(),
            ResultRows::Aggregation(row(vec![value])),
            stats(5),
        ))
    };

    let combined = CombineOperator::new(&functions, 10, 10).combine(vec![
        partial(Value::Double(4.0)),
        Err(InternalError::new(
            ErrorClass::Internal,
            ErrorOrigin::Fetch,
            "segment unavailable",
        )),
        partial(Value::Null),
        partial(Value::Double(2.0)),
    ]);

    assert_eq!(combined.exceptions().len(), 1);
    assert_eq!(
        combined.exceptions()[0].code(),
        QueryErrorCode::QueryExecution
    );
    assert_eq!(combined.stats().num_docs_scanned, 15);
    let ResultRows::Aggregation(row) = combined.rows() else {
        panic!("expected aggregation rows");
    };
    assert_eq!(row[0], Value::Double(2.0));
}

#[test]
fn failed_aggregate_merge_keeps_the_existing_value() {
    let functions = vec![AggregationFunctionVariant::Min(MinFunction::new("v"))];
    let schema = schema(&[("min(v)", ColumnDataType::Double, FieldKind::Metric)]);
    let mut target = IntermediateResult::new(
        schema.clone(),
        ResultRows::Aggregation(row(vec![Value::Double(4.0)])),
        stats(1),
    );
    let other = IntermediateResult::new(
        schema,
        ResultRows::Aggregation(row(vec![Value::from("bad")])),
        stats(1),
    );

    let err = CombineOperator::new(&functions, 10, 10)
        .merge_into(&mut target, other)
        .expect_err("string intermediate should not merge");

    assert!(err.is_internal_state());
    let ResultRows::Aggregation(row) = target.rows() else {
        panic!("expected aggregation rows");
    };
    assert_eq!(row[0], Value::Double(4.0));
}

#[test]
fn combine_reports_mismatched_partials() {
    let functions = Vec::new();
    let combined = CombineOperator::new(&functions, 10, 10).combine(vec![
        Ok(IntermediateResult::new(
            DataSchema::default(),
            ResultRows::Selection(vec![row(vec![Value::Int(1)])]),
            stats(1),
        )),
        Ok(IntermediateResult::new(
            DataSchema::default(),
            ResultRows::Aggregation(row(vec![Value::Int(1)])),
            stats(1),
        )),
    ]);

    assert_eq!(combined.exceptions().len(), 1);
    assert_eq!(combined.rows().len(), 1);
}

#[test]
fn combine_drops_groups_beyond_the_limit() {
    let functions = vec![AggregationFunctionVariant::Max(MaxFunction::new("v"))];
    let group = |key: i32, value: f64| -> Result<IntermediateResult, InternalError> {
        let mut groups = GroupByRows::new();
        groups.insert(vec![ValueKey::Int(key)], vec![Value::Double(value)]);
        Ok(IntermediateResult::new(
            DataSchema::default(),
            ResultRows::GroupBy(groups),
            stats(1),
        ))
    };

    let combined = CombineOperator::new(&functions, 10, 1).combine(vec![
        group(1, 1.0),
        group(1, 3.0),
        group(2, 5.0),
    ]);

    assert!(combined.stats().num_groups_limit_reached);
    let ResultRows::GroupBy(groups) = combined.rows() else {
        panic!("expected group-by rows");
    };
    assert_eq!(groups.len(), 1);
    assert_eq!(groups.get(&[ValueKey::Int(1)]), Some(&[Value::Double(3.0)][..]));
}

#[test]
fn render_allows_duplicate_columns_and_formats_cells() {
    let schema = schema(&[
        ("d", ColumnDataType::BigDecimal, FieldKind::Metric),
        ("n", ColumnDataType::Long, FieldKind::Metric),
    ]);
    let rows = vec![row(vec![
        Value::BigDecimal(Decimal::from_str("1.20").expect("decimal")),
        Value::Int(7),
    ])];

    let table = render_result_table(&schema, rows, &["n".to_string(), "d".to_string(), "n".to_string()])
        .expect("render should succeed");

    assert_eq!(table.schema.names(), vec!["n", "d", "n"]);
    assert_eq!(
        table.rows,
        vec![row(vec![Value::Long(7), Value::from("1.20"), Value::Long(7)])]
    );
    assert!(render_result_table(&schema, Vec::new(), &["missing".to_string()]).is_err());
}

#[test]
fn reducer_orders_selection_rows_with_nulls_last_and_applies_offset() {
    let query = QueryContext::selection(["v"])
        .with_order_by(vec![OrderByExpression::desc("v")])
        .with_options(QueryOptions::new().with_limit(3).with_offset(1));
    let schema = schema(&[("v", ColumnDataType::Int, FieldKind::Dimension)]);
    let table = |values: Vec<Option<i32>>| {
        DataTable::from_rows(
            schema.clone(),
            values.into_iter().map(|v| row(vec![Value::from(v)])).collect(),
        )
        .expect("rows should fit")
    };

    let response = BrokerReducer::new(&query).reduce(&[
        table(vec![Some(5), None, Some(1)]),
        table(vec![Some(9), None]),
    ]);

    assert!(response.exceptions.is_empty());
    let result = response.result_table.expect("result table");
    assert_eq!(
        result.rows,
        vec![
            row(vec![Value::Int(5)]),
            row(vec![Value::Int(1)]),
            row(vec![Value::Null]),
        ]
    );
}

#[test]
fn reducer_finalizes_sumprecision_as_a_string() {
    let function = SumPrecisionFunction::new("price", false).with_scale(2);
    let query = QueryContext::aggregation(vec![AggregationFunctionVariant::SumPrecision(function)]);
    let schema = schema(&[("sumprecision(price)", ColumnDataType::Object, FieldKind::Metric)]);
    let table = |text: &str| {
        DataTable::from_rows(
            schema.clone(),
            vec![row(vec![Value::BigDecimal(Decimal::from_str(text).expect("decimal"))])],
        )
        .expect("row should fit")
    };

    let response = BrokerReducer::new(&query).reduce(&[table("1.005"), table("2.005")]);

    let result = response.result_table.expect("result table");
    assert_eq!(
        result.schema.column(0).map(|c| c.data_type),
        Some(ColumnDataType::String)
    );
    assert_eq!(result.rows, vec![row(vec![Value::from("3.01")])]);
}

#[test]
fn reducer_rejects_group_order_by_on_unknown_columns() {
    let query = QueryContext::group_by(
        ["k"],
        vec![AggregationFunctionVariant::Max(MaxFunction::new("v"))],
    )
    .with_order_by(vec![OrderByExpression::asc("nope")]);
    let schema = schema(&[
        ("k", ColumnDataType::Int, FieldKind::Dimension),
        ("max(v)", ColumnDataType::Double, FieldKind::Metric),
    ]);
    let table = DataTable::from_rows(schema, vec![row(vec![Value::Int(1), Value::Double(2.0)])])
        .expect("row should fit");

    let response = BrokerReducer::new(&query).reduce(&[table]);

    assert!(response.result_table.is_none());
    assert_eq!(response.exceptions.len(), 1);
    assert_eq!(response.exceptions[0].code(), QueryErrorCode::MergeResponse);
}

#[test]
fn reducer_sorts_groups_by_aggregate_with_nulls_last() {
    let query = QueryContext::group_by(
        ["k"],
        vec![AggregationFunctionVariant::Max(MaxFunction::new("v"))],
    )
    .with_order_by(vec![OrderByExpression::desc("max(v)")]);
    let schema = schema(&[
        ("k", ColumnDataType::Int, FieldKind::Dimension),
        ("max(v)", ColumnDataType::Double, FieldKind::Metric),
    ]);
    let left = DataTable::from_rows(
        schema.clone(),
        vec![
            row(vec![Value::Int(1), Value::Double(2.0)]),
            row(vec![Value::Int(2), Value::Null]),
        ],
    )
    .expect("rows should fit");
    let right = DataTable::from_rows(
        schema,
        vec![
            row(vec![Value::Int(1), Value::Double(7.0)]),
            row(vec![Value::Int(3), Value::Double(4.0)]),
        ],
    )
    .expect("rows should fit");

    let response = BrokerReducer::new(&query).reduce(&[left, right]);

    let result = response.result_table.expect("result table");
    assert_eq!(
        result.rows,
        vec![
            row(vec![Value::Int(1), Value::Double(7.0)]),
            row(vec![Value::Int(3), Value::Double(4.0)]),
            row(vec![Value::Int(2), Value::Null]),
        ]
    );
}

#[test]
fn reducer_merges_distinct_tables_and_forwards_exceptions() {
    let query = QueryContext::distinct("v")
        .with_options(QueryOptions::new().with_limit(3));
    let schema = schema(&[("v", ColumnDataType::Long, FieldKind::Dimension)]);
    let mut left = DataTable::from_rows(
        schema.clone(),
        vec![row(vec![Value::Long(1)]), row(vec![Value::Long(3)])],
    )
    .expect("rows should fit");
    left.add_exception(ProcessingException::new(
        QueryErrorCode::ServerSegmentMissing,
        "segment s9 missing",
    ));
    let right = DataTable::from_rows(
        schema,
        vec![row(vec![Value::Long(3)]), row(vec![Value::Long(5)]), row(vec![Value::Long(7)])],
    )
    .expect("rows should fit");

    let response = BrokerReducer::new(&query).reduce(&[left, right]);

    assert_eq!(response.exceptions.len(), 1);
    assert_eq!(response.num_rows(), 3);
    let result = response.result_table.expect("result table");
    assert_eq!(
        result.rows,
        vec![
            row(vec![Value::Long(1)]),
            row(vec![Value::Long(3)]),
            row(vec![Value::Long(5)]),
        ]
    );
}

proptest! {
    #[test]
    fn data_tables_round_trip_null_positions(
        cells in proptest::collection::vec(proptest::option::of(any::<i64>()), 0..40),
    ) {
        let schema = schema(&[("v", ColumnDataType::Long, FieldKind::Dimension)]);
        let rows: Vec<Row> = cells.iter().map(|c| row(vec![Value::from(*c)])).collect();

        let table = DataTable::from_rows(schema, rows.clone()).expect("rows should fit");
        let decoded = DataTable::from_bytes(&table.to_bytes().expect("table should encode"))
            .expect("table should decode");

        prop_assert_eq!(decoded.extract_rows().collect::<Vec<_>>(), rows);
    }
}

fn ordered(values: &[Option<i32>], keep: usize) -> OrderedRows {
    let mut rows = OrderedRows::new(
        OrderByComparator::new(vec![(0, Direction::Desc)]),
        keep,
        keep,
    );
    for value in values {
        rows.offer(row(vec![Value::from(*value)]))
            .expect("single-value rows should compare");
    }

    rows
}

proptest! {
    #[test]
    fn ordered_merge_is_associative(
        a in proptest::collection::vec(proptest::option::of(-50i32..50), 0..30),
        b in proptest::collection::vec(proptest::option::of(-50i32..50), 0..30),
        c in proptest::collection::vec(proptest::option::of(-50i32..50), 0..30),
        keep in 1usize..20,
    ) {
        let mut left = ordered(&a, keep);
        merge_with_ordering(&mut left, ordered(&b, keep)).expect("merge should succeed");
        merge_with_ordering(&mut left, ordered(&c, keep)).expect("merge should succeed");

        let mut tail = ordered(&b, keep);
        merge_with_ordering(&mut tail, ordered(&c, keep)).expect("merge should succeed");
        let mut right = ordered(&a, keep);
        merge_with_ordering(&mut right, tail).expect("merge should succeed");

        prop_assert_eq!(left.into_sorted_rows(), right.into_sorted_rows());
    }
}
