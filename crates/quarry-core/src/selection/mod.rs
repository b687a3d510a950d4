//! Module: selection
//! Responsibility: selection with and without ORDER BY over one segment,
//! including the bounded top-k heap and the NULLS LAST row comparator.
//! Does not own: cross-segment merge (see `result`).
//! Boundary: operators read blocks through `SegmentSource` and return an
//! `IntermediateResult`.

mod comparator;
mod expressions;
mod heap;
mod only;
mod order_by;

#[cfg(test)]
mod tests;

use crate::{error::InternalError, value::Row};

// re-exports
pub use comparator::{OrderByComparator, OrderByExpression};
pub use expressions::{extract_expressions, selection_columns};
pub use heap::{Offer, TopKHeap};
pub use only::SelectionOnlyOperator;
pub use order_by::{SelectionOrderByOperator, SelectionStrategy};

///
/// OrderedRows
///
/// Bounded top-k row collection with the comparator that orders it.
///

#[derive(Clone, Debug)]
pub struct OrderedRows {
    heap: TopKHeap<Row>,
    comparator: OrderByComparator,
}

impl OrderedRows {
    #[must_use]
    pub fn new(comparator: OrderByComparator, max_rows: usize, initial_capacity: usize) -> Self {
        Self {
            heap: TopKHeap::with_capacity(max_rows, initial_capacity),
            comparator,
        }
    }

    #[must_use]
    pub(crate) const fn from_heap(heap: TopKHeap<Row>, comparator: OrderByComparator) -> Self {
        Self { heap, comparator }
    }

    #[must_use]
    pub const fn comparator(&self) -> &OrderByComparator {
        &self.comparator
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.heap.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }

    #[must_use]
    pub const fn max_rows(&self) -> usize {
        self.heap.max_size()
    }

    /// Offer one row; true when the row was kept.
    pub fn offer(&mut self, row: Row) -> Result<bool, InternalError> {
        self.comparator.validate_row(&row)?;
        let comparator = &self.comparator;
        let kept = !matches!(
            self.heap.offer(row, |a, b| comparator.compare(a, b)),
            Offer::Rejected(_)
        );

        Ok(kept)
    }

    /// Re-offer every row of `other`.
    pub fn merge(&mut self, other: Self) -> Result<(), InternalError> {
        for row in other.heap.into_vec() {
            self.offer(row)?;
        }

        Ok(())
    }

    /// Rows in heap layout order.
    pub fn iter(&self) -> impl Iterator<Item = &Row> {
        self.heap.iter()
    }

    /// Drain best-first.
    #[must_use]
    pub fn into_sorted_rows(self) -> Vec<Row> {
        let comparator = self.comparator;
        self.heap.into_sorted_vec(|a, b| comparator.compare(a, b))
    }
}

/// Result schema for projected physical columns.
pub(crate) fn selection_schema(
    segment: &dyn crate::block::SegmentSource,
    expressions: &[String],
) -> Result<crate::result::DataSchema, InternalError> {
    let columns = expressions
        .iter()
        .map(|expression| {
            let metadata = segment.column_metadata(expression)?;
            Ok(crate::result::ColumnSchema::new(
                expression.clone(),
                metadata.data_type()?,
                metadata.field_kind,
            ))
        })
        .collect::<Result<Vec<_>, InternalError>>()?;

    Ok(crate::result::DataSchema::new(columns))
}
