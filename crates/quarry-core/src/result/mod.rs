//! Module: result
//! Responsibility: partial results, their merge, the columnar data table
//! wire form and the final reduce/render step.
//! Does not own: how a partial result is produced (see the operators).
//! Boundary: [`IntermediateResult`] is the only shape crossing the merge
//! boundary; [`DataTable`] is its serialized form.

mod data_table;
mod merge;
mod reduce;

#[cfg(test)]
mod tests;

use crate::{
    distinct::AnyDistinctExecutor,
    error::ProcessingException,
    selection::OrderedRows,
    value::{ColumnDataType, FieldKind, Row, Value, ValueKey},
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

// re-exports
pub use data_table::{DataTable, MetadataKey, NullBitmap};
pub use merge::{CombineOperator, merge_with_ordering, merge_without_ordering};
pub use reduce::{BrokerReducer, BrokerResponse, ResultTable, render_result_table};

///
/// ColumnSchema
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ColumnSchema {
    pub name: String,
    pub data_type: ColumnDataType,
    pub field_kind: FieldKind,
}

impl ColumnSchema {
    pub fn new(name: impl Into<String>, data_type: ColumnDataType, field_kind: FieldKind) -> Self {
        Self {
            name: name.into(),
            data_type,
            field_kind,
        }
    }
}

///
/// DataSchema
///
/// Ordered result columns.
///

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct DataSchema {
    columns: Vec<ColumnSchema>,
}

impl DataSchema {
    #[must_use]
    pub const fn new(columns: Vec<ColumnSchema>) -> Self {
        Self { columns }
    }

    #[must_use]
    pub fn columns(&self) -> &[ColumnSchema] {
        &self.columns
    }

    #[must_use]
    pub fn column(&self, index: usize) -> Option<&ColumnSchema> {
        self.columns.get(index)
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.columns.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    #[must_use]
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|column| column.name == name)
    }

    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        self.columns.iter().map(|column| column.name.as_str()).collect()
    }
}

///
/// ExecutionStats
///
/// Scan counters carried beside every partial result; merged by summing.
///

#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
pub struct ExecutionStats {
    pub num_docs_scanned: u64,
    pub num_entries_scanned_in_filter: u64,
    pub num_entries_scanned_post_filter: u64,
    pub total_docs: u64,
    pub num_segments_processed: u64,
    pub num_segments_matched: u64,
    pub num_resizes: u64,
    pub resize_time_ms: u64,
    pub num_groups_limit_reached: bool,
}

impl ExecutionStats {
    /// Stats for one processed segment.
    #[must_use]
    pub const fn for_segment(total_docs: u64) -> Self {
        Self {
            num_docs_scanned: 0,
            num_entries_scanned_in_filter: 0,
            num_entries_scanned_post_filter: 0,
            total_docs,
            num_segments_processed: 1,
            num_segments_matched: 0,
            num_resizes: 0,
            resize_time_ms: 0,
            num_groups_limit_reached: false,
        }
    }

    /// Record scanned documents; a segment with any scanned doc counts as
    /// matched.
    pub const fn record_scan(&mut self, docs: u64, entries_post_filter: u64) {
        self.num_docs_scanned = self.num_docs_scanned.saturating_add(docs);
        self.num_entries_scanned_post_filter = self
            .num_entries_scanned_post_filter
            .saturating_add(entries_post_filter);
        if self.num_docs_scanned > 0 {
            self.num_segments_matched = 1;
        }
    }

    pub const fn merge(&mut self, other: &Self) {
        self.num_docs_scanned = self.num_docs_scanned.saturating_add(other.num_docs_scanned);
        self.num_entries_scanned_in_filter = self
            .num_entries_scanned_in_filter
            .saturating_add(other.num_entries_scanned_in_filter);
        self.num_entries_scanned_post_filter = self
            .num_entries_scanned_post_filter
            .saturating_add(other.num_entries_scanned_post_filter);
        self.total_docs = self.total_docs.saturating_add(other.total_docs);
        self.num_segments_processed = self
            .num_segments_processed
            .saturating_add(other.num_segments_processed);
        self.num_segments_matched = self
            .num_segments_matched
            .saturating_add(other.num_segments_matched);
        self.num_resizes = self.num_resizes.saturating_add(other.num_resizes);
        self.resize_time_ms = self.resize_time_ms.saturating_add(other.resize_time_ms);
        self.num_groups_limit_reached |= other.num_groups_limit_reached;
    }
}

///
/// GroupByRows
///
/// Intermediate aggregate values per group, keyed by the group-by cells.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct GroupByRows {
    pub(crate) groups: BTreeMap<Vec<ValueKey>, Vec<Value>>,
}

impl GroupByRows {
    #[must_use]
    pub const fn new() -> Self {
        Self {
            groups: BTreeMap::new(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.groups.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }

    pub fn insert(&mut self, key: Vec<ValueKey>, aggregates: Vec<Value>) {
        self.groups.insert(key, aggregates);
    }

    #[must_use]
    pub fn get(&self, key: &[ValueKey]) -> Option<&[Value]> {
        self.groups.get(key).map(Vec::as_slice)
    }

    /// Rows of key cells followed by aggregate cells, in key order.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.groups
            .into_iter()
            .map(|(key, aggregates)| {
                key.into_iter()
                    .map(Value::from)
                    .chain(aggregates)
                    .collect()
            })
            .collect()
    }
}

///
/// ResultRows
///

#[derive(Clone, Debug)]
pub enum ResultRows {
    /// No rows; carried by results that only report exceptions.
    Empty,
    Selection(Vec<Row>),
    OrderedSelection(OrderedRows),
    Aggregation(Row),
    GroupBy(GroupByRows),
    Distinct(AnyDistinctExecutor),
}

impl ResultRows {
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Empty => "empty",
            Self::Selection(_) => "selection",
            Self::OrderedSelection(_) => "ordered_selection",
            Self::Aggregation(_) => "aggregation",
            Self::GroupBy(_) => "group_by",
            Self::Distinct(_) => "distinct",
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        match self {
            Self::Empty => 0,
            Self::Selection(rows) => rows.len(),
            Self::OrderedSelection(rows) => rows.len(),
            Self::Aggregation(_) => 1,
            Self::GroupBy(groups) => groups.len(),
            Self::Distinct(executor) => executor.len(),
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize rows; ordered selections and ordered distincts come out
    /// best-first.
    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        match self {
            Self::Empty => Vec::new(),
            Self::Selection(rows) => rows,
            Self::OrderedSelection(rows) => rows.into_sorted_rows(),
            Self::Aggregation(row) => vec![row],
            Self::GroupBy(groups) => groups.into_rows(),
            Self::Distinct(executor) => executor.into_result().into_rows(),
        }
    }
}

///
/// IntermediateResult
///
/// One segment's (or one merge's) unreduced result.
///

#[derive(Clone, Debug)]
pub struct IntermediateResult {
    schema: DataSchema,
    rows: ResultRows,
    stats: ExecutionStats,
    exceptions: Vec<ProcessingException>,
}

impl IntermediateResult {
    #[must_use]
    pub const fn new(schema: DataSchema, rows: ResultRows, stats: ExecutionStats) -> Self {
        Self {
            schema,
            rows,
            stats,
            exceptions: Vec::new(),
        }
    }

    /// Result that only carries a processing exception.
    #[must_use]
    pub fn from_exception(exception: ProcessingException) -> Self {
        Self {
            schema: DataSchema::default(),
            rows: ResultRows::Empty,
            stats: ExecutionStats::default(),
            exceptions: vec![exception],
        }
    }

    #[must_use]
    pub const fn schema(&self) -> &DataSchema {
        &self.schema
    }

    #[must_use]
    pub const fn rows(&self) -> &ResultRows {
        &self.rows
    }

    #[must_use]
    pub const fn stats(&self) -> &ExecutionStats {
        &self.stats
    }

    #[must_use]
    pub fn exceptions(&self) -> &[ProcessingException] {
        &self.exceptions
    }

    pub fn add_exception(&mut self, exception: ProcessingException) {
        self.exceptions.push(exception);
    }

    #[must_use]
    pub fn into_parts(
        self,
    ) -> (
        DataSchema,
        ResultRows,
        ExecutionStats,
        Vec<ProcessingException>,
    ) {
        (self.schema, self.rows, self.stats, self.exceptions)
    }

    /// Serialize-ready columnar form.
    pub fn into_data_table(self) -> Result<DataTable, crate::error::InternalError> {
        DataTable::from_intermediate(self)
    }
}
