use super::{BlockValSet, ColumnValues, MemorySegment, RowFetcher, SegmentSource};
use crate::value::{ByteArray, FieldKind, Value};
use roaring::RoaringBitmap;
use rust_decimal::Decimal;

fn bitmap(positions: &[u32]) -> RoaringBitmap {
    positions.iter().copied().collect()
}

fn segment() -> MemorySegment {
    MemorySegment::new("seg", 5)
        .with_column(
            "id",
            FieldKind::Dimension,
            ColumnValues::Long(vec![10, 11, 12, 13, 14]),
            None,
        )
        .expect("id should fit")
        .with_column(
            "score",
            FieldKind::Metric,
            ColumnValues::Float(vec![1.0, 2.0, 3.0, 4.0, 5.0]),
            Some(bitmap(&[1, 3])),
        )
        .expect("score should fit")
        .with_block_size(2)
}

#[test]
fn fetcher_returns_null_only_for_bitmap_positions() {
    let columns = vec![
        BlockValSet::new(ColumnValues::Int(vec![1, 2])).with_null_bitmap(bitmap(&[1])),
        BlockValSet::new(ColumnValues::String(vec!["a".into(), "b".into()])),
    ];
    let fetcher = RowFetcher::new(&columns).expect("fetcher should build");

    assert_eq!(fetcher.row(0).expect("row 0").into_cells(), vec![Value::Int(1), Value::from("a")]);
    assert_eq!(fetcher.row(1).expect("row 1").into_cells(), vec![Value::Null, Value::from("b")]);
}

#[test]
fn fetcher_never_nulls_multi_value_cells() {
    let columns = vec![
        BlockValSet::new(ColumnValues::IntMv(vec![vec![1, 2]])).with_null_bitmap(bitmap(&[0])),
    ];
    let fetcher = RowFetcher::new(&columns).expect("fetcher should build");

    assert_eq!(
        fetcher.row(0).expect("row 0").into_cells(),
        vec![Value::IntArray(vec![1, 2])]
    );
    assert!(fetcher.column_null_bitmap(0).is_none());
}

#[test]
fn fetcher_rejects_unsupported_multi_value_types() {
    let columns = vec![BlockValSet::new(ColumnValues::BigDecimalMv(vec![vec![
        Decimal::ONE,
    ]]))];

    let err = RowFetcher::new(&columns)
        .err()
        .expect("decimal arrays should be rejected");
    assert!(err.is_unsupported());
}

#[test]
fn fill_row_writes_at_the_requested_offset() {
    let columns = vec![BlockValSet::new(ColumnValues::Bytes(vec![ByteArray::new(vec![7])]))];
    let fetcher = RowFetcher::new(&columns).expect("fetcher should build");
    let mut buffer = vec![Value::Int(0), Value::Null];

    fetcher
        .fill_row(0, &mut buffer, 1)
        .expect("fill should fit the buffer");
    assert_eq!(buffer[1], Value::Bytes(ByteArray::new(vec![7])));
    let err = fetcher
        .fill_row(0, &mut buffer, 2)
        .expect_err("column past the buffer end should be rejected");
    assert!(err.is_internal_state());
    assert!(err.message.contains("width 2"), "{}", err.message);
    assert_eq!(buffer, vec![Value::Int(0), Value::Bytes(ByteArray::new(vec![7]))]);
}

#[test]
fn fetching_outside_the_block_is_an_internal_error() {
    let columns = vec![BlockValSet::new(ColumnValues::Int(vec![1]))];
    let fetcher = RowFetcher::new(&columns).expect("fetcher should build");

    let err = fetcher.row(5).expect_err("doc 5 should be outside the block");
    assert!(err.is_internal_state());
}

#[test]
fn slice_and_take_rebase_the_null_bitmap() {
    let column =
        BlockValSet::new(ColumnValues::Double(vec![0.0, 1.0, 2.0, 3.0])).with_null_bitmap(bitmap(&[1, 3]));

    let sliced = column.slice(1..3);
    assert_eq!(sliced.null_bitmap(), Some(&bitmap(&[0])));
    assert_eq!(sliced.values(), &ColumnValues::Double(vec![1.0, 2.0]));

    let taken = column.take(&[3, 0]);
    assert_eq!(taken.null_bitmap(), Some(&bitmap(&[0])));
    assert_eq!(taken.values(), &ColumnValues::Double(vec![3.0, 0.0]));
}

#[test]
fn all_null_requires_every_position() {
    let column = BlockValSet::new(ColumnValues::Int(vec![1, 2])).with_null_bitmap(bitmap(&[0, 1]));

    assert!(column.all_null(2));
    assert!(!column.all_null(0));
    assert!(!BlockValSet::new(ColumnValues::Int(vec![1])).all_null(1));
}

#[test]
fn double_values_widen_ints_and_reject_strings() {
    let ints = BlockValSet::new(ColumnValues::Int(vec![1, -2]));
    assert_eq!(
        ints.double_values_sv().expect("ints should widen").as_ref(),
        &[1.0, -2.0]
    );

    let strings = BlockValSet::new(ColumnValues::String(vec!["x".into()]));
    assert!(strings.double_values_sv().is_err());
}

#[test]
fn memory_segment_rejects_mismatched_and_duplicate_columns() {
    assert!(
        MemorySegment::new("seg", 2)
            .with_column("a", FieldKind::Dimension, ColumnValues::Int(vec![1]), None)
            .is_err()
    );

    let duplicate = MemorySegment::new("seg", 1)
        .with_column("a", FieldKind::Dimension, ColumnValues::Int(vec![1]), None)
        .expect("first column should fit")
        .with_column("a", FieldKind::Dimension, ColumnValues::Int(vec![2]), None);
    assert!(duplicate.is_err());
}

#[test]
fn scan_splits_into_blocks_and_drops_bitmaps_without_null_handling() {
    let segment = segment();
    let expressions = vec!["score".to_string()];

    let mut with_nulls = segment
        .open(&expressions, true)
        .expect("scan should open");
    let first = with_nulls
        .next_block()
        .expect("first block")
        .expect("first block should exist");
    assert_eq!(first.doc_ids(), &[0, 1]);
    assert!(first.columns()[0].is_null(1));

    let mut without_nulls = segment
        .open(&expressions, false)
        .expect("scan should open");
    let mut blocks = 0;
    while let Some(block) = without_nulls.next_block().expect("block") {
        assert!(block.columns()[0].null_bitmap().is_none());
        blocks += 1;
    }
    assert_eq!(blocks, 3);
}

#[test]
fn filtered_scan_reports_filter_entries() {
    let segment = segment().with_filter(bitmap(&[0, 4]));
    let expressions = vec!["id".to_string(), "id".to_string()];

    let mut source = segment
        .open(&expressions, false)
        .expect("scan should open");
    let block = source
        .next_block()
        .expect("block")
        .expect("block should exist");

    assert_eq!(block.doc_ids(), &[0, 4]);
    assert_eq!(block.columns().len(), 2);
    assert_eq!(source.num_columns_projected(), 1);
    assert_eq!(source.num_entries_scanned_in_filter(), 5);
}

#[test]
fn open_docs_rejects_out_of_range_documents() {
    let segment = segment();
    let expressions = vec!["id".to_string()];

    assert!(segment.open_docs(&expressions, &bitmap(&[9]), false).is_err());
    assert!(segment.open(&["missing".to_string()], false).is_err());
}
