use crate::{
    block::{RowFetcher, SegmentSource},
    config::QueryOptions,
    error::{ErrorOrigin, InternalError},
    obs::{OperatorKind, sink::Span},
    result::{ExecutionStats, IntermediateResult, ResultRows},
    selection::{
        OrderByComparator, OrderByExpression, OrderedRows, TopKHeap, extract_expressions,
        heap::Offer, selection_schema,
    },
    value::Row,
};
use roaring::RoaringBitmap;
use std::cmp::Ordering;
use tracing::debug;

///
/// SelectionStrategy
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum SelectionStrategy {
    /// Documents already arrive in the requested order; stop after
    /// `offset + limit` documents.
    PreSorted,
    /// Every projected expression is an order-by expression.
    AllOrdered,
    /// Order-by expressions first, the rest fetched for surviving documents
    /// in a second pass.
    PartiallyOrdered,
}

///
/// RowSlot
///

#[derive(Clone, Copy, Debug)]
struct RowSlot {
    slot: usize,
    doc_id: u32,
}

///
/// RowArena
///
/// Row storage for the two-pass strategy. The heap orders slot indices;
/// rows stay put between passes and are completed in place.
///

#[derive(Debug, Default)]
struct RowArena {
    rows: Vec<Row>,
    free: Vec<usize>,
}

impl RowArena {
    fn insert(&mut self, row: Row) -> usize {
        if let Some(slot) = self.free.pop() {
            self.rows[slot] = row;
            slot
        } else {
            self.rows.push(row);
            self.rows.len() - 1
        }
    }

    fn release(&mut self, slot: usize) {
        self.free.push(slot);
    }

    fn get(&self, slot: usize) -> &Row {
        &self.rows[slot]
    }

    fn get_mut(&mut self, slot: usize) -> &mut Row {
        &mut self.rows[slot]
    }

    fn take(&mut self, slot: usize) -> Row {
        std::mem::take(&mut self.rows[slot])
    }
}

///
/// SelectionOrderByOperator
///
/// Top `offset + limit` rows of one segment under an ORDER BY.
///

pub struct SelectionOrderByOperator<'a> {
    segment: &'a dyn SegmentSource,
    expressions: Vec<String>,
    order_by: Vec<OrderByExpression>,
    num_order_by_expressions: usize,
    num_rows_to_keep: usize,
    initial_capacity: usize,
    null_handling_enabled: bool,
}

impl<'a> SelectionOrderByOperator<'a> {
    #[must_use]
    pub fn new(
        segment: &'a dyn SegmentSource,
        select: &[String],
        order_by: &[OrderByExpression],
        options: &QueryOptions,
    ) -> Self {
        let expressions =
            extract_expressions(select, order_by, options.limit, &segment.column_names());
        let num_order_by_expressions = extract_expressions(&[], order_by, options.limit, &[]).len();
        let num_rows_to_keep = options.num_rows_to_keep();

        Self {
            segment,
            expressions,
            order_by: order_by.to_vec(),
            num_order_by_expressions,
            num_rows_to_keep,
            initial_capacity: options.initial_capacity(num_rows_to_keep),
            null_handling_enabled: options.null_handling_enabled,
        }
    }

    /// Projected expressions, order-by expressions first.
    #[must_use]
    pub fn expressions(&self) -> &[String] {
        &self.expressions
    }

    #[must_use]
    pub fn strategy(&self) -> SelectionStrategy {
        let pre_sorted = self
            .order_by
            .iter()
            .all(|o| o.direction.is_asc() && self.segment.is_sorted_on(&o.expression));

        if pre_sorted {
            SelectionStrategy::PreSorted
        } else if self.expressions.len() == self.num_order_by_expressions {
            SelectionStrategy::AllOrdered
        } else {
            SelectionStrategy::PartiallyOrdered
        }
    }

    /// Comparator over the leading order-by columns. Multi-value columns do
    /// not take part in ordering.
    fn comparator(&self) -> Result<OrderByComparator, InternalError> {
        let mut keys = Vec::with_capacity(self.num_order_by_expressions);
        for (index, expression) in self.expressions[..self.num_order_by_expressions]
            .iter()
            .enumerate()
        {
            if !self.segment.column_metadata(expression)?.single_value {
                debug!(expression = %expression, "multi-value order-by column skipped");
                continue;
            }
            let direction = self
                .order_by
                .iter()
                .find(|o| &o.expression == expression)
                .map(|o| o.direction)
                .unwrap_or_default();
            keys.push((index, direction));
        }

        Ok(OrderByComparator::new(keys))
    }

    pub fn execute(&self) -> Result<IntermediateResult, InternalError> {
        let strategy = self.strategy();
        debug!(
            segment = self.segment.name(),
            ?strategy,
            num_rows_to_keep = self.num_rows_to_keep,
            "selection order-by"
        );

        let schema = selection_schema(self.segment, &self.expressions)?;
        let comparator = self.comparator()?;
        let mut stats = ExecutionStats::for_segment(self.segment.total_docs());
        let mut span = Span::new(OperatorKind::SelectionOrderBy);

        let rows = if self.num_rows_to_keep == 0 {
            OrderedRows::new(comparator, 0, 0)
        } else {
            match strategy {
                SelectionStrategy::PreSorted => {
                    self.execute_pre_sorted(comparator, &mut stats, &mut span)?
                }
                SelectionStrategy::AllOrdered => {
                    self.execute_all_ordered(comparator, &mut stats, &mut span)?
                }
                SelectionStrategy::PartiallyOrdered => {
                    self.execute_partially_ordered(comparator, &mut stats, &mut span)?
                }
            }
        };

        Ok(IntermediateResult::new(
            schema,
            ResultRows::OrderedSelection(rows),
            stats,
        ))
    }

    fn execute_pre_sorted(
        &self,
        comparator: OrderByComparator,
        stats: &mut ExecutionStats,
        span: &mut Span,
    ) -> Result<OrderedRows, InternalError> {
        let mut source = self
            .segment
            .open(&self.expressions, self.null_handling_enabled)?;
        let mut rows = OrderedRows::new(comparator, self.num_rows_to_keep, self.initial_capacity);
        let mut scanned = 0;

        while scanned < self.num_rows_to_keep {
            let Some(block) = source.next_block()? else {
                break;
            };
            let fetcher = RowFetcher::new(block.columns())?;
            let take = block.num_docs().min(self.num_rows_to_keep - scanned);
            for doc in 0..take {
                rows.offer(fetcher.row(doc)?)?;
            }
            scanned += take;
            span.add_block(take);
        }

        stats.num_entries_scanned_in_filter = source.num_entries_scanned_in_filter();
        stats.record_scan(
            scanned as u64,
            (scanned * source.num_columns_projected()) as u64,
        );

        Ok(rows)
    }

    fn execute_all_ordered(
        &self,
        comparator: OrderByComparator,
        stats: &mut ExecutionStats,
        span: &mut Span,
    ) -> Result<OrderedRows, InternalError> {
        let mut source = self
            .segment
            .open(&self.expressions, self.null_handling_enabled)?;
        let mut rows = OrderedRows::new(comparator, self.num_rows_to_keep, self.initial_capacity);
        let mut scanned = 0;

        while let Some(block) = source.next_block()? {
            let fetcher = RowFetcher::new(block.columns())?;
            for doc in 0..block.num_docs() {
                rows.offer(fetcher.row(doc)?)?;
            }
            scanned += block.num_docs();
            span.add_block(block.num_docs());
        }

        stats.num_entries_scanned_in_filter = source.num_entries_scanned_in_filter();
        stats.record_scan(
            scanned as u64,
            (scanned * source.num_columns_projected()) as u64,
        );

        Ok(rows)
    }

    fn execute_partially_ordered(
        &self,
        comparator: OrderByComparator,
        stats: &mut ExecutionStats,
        span: &mut Span,
    ) -> Result<OrderedRows, InternalError> {
        let width = self.expressions.len();
        let (order_by_expressions, other_expressions) =
            self.expressions.split_at(self.num_order_by_expressions);

        // pass 1: order-by columns and doc ids only
        let mut arena = RowArena::default();
        let mut heap: TopKHeap<RowSlot> =
            TopKHeap::with_capacity(self.num_rows_to_keep, self.initial_capacity);
        let mut source = self
            .segment
            .open(order_by_expressions, self.null_handling_enabled)?;
        let mut scanned = 0;

        while let Some(block) = source.next_block()? {
            let fetcher = RowFetcher::new(block.columns())?;
            for (doc, &doc_id) in block.doc_ids().iter().enumerate() {
                let mut row = Row::nulls(width);
                fetcher.fill_row(doc, &mut row, 0)?;
                comparator.validate_row(&row)?;

                if let Some(worst) = heap.peek_worst()
                    && heap.is_full()
                    && comparator.compare(&row, arena.get(worst.slot)) != Ordering::Less
                {
                    continue;
                }

                let slot = arena.insert(row);
                let offer = heap.offer(RowSlot { slot, doc_id }, |a, b| {
                    comparator.compare(arena.get(a.slot), arena.get(b.slot))
                });
                match offer {
                    Offer::Inserted => {}
                    Offer::Replaced(evicted) | Offer::Rejected(evicted) => {
                        arena.release(evicted.slot);
                    }
                }
            }
            scanned += block.num_docs();
            span.add_block(block.num_docs());
        }

        stats.num_entries_scanned_in_filter = source.num_entries_scanned_in_filter();
        stats.record_scan(
            scanned as u64,
            (scanned * source.num_columns_projected()) as u64,
        );
        drop(source);

        // pass 2: remaining columns for the surviving documents
        let mut by_doc: Vec<RowSlot> = heap.iter().copied().collect();
        by_doc.sort_unstable_by_key(|entry| entry.doc_id);
        let doc_ids: RoaringBitmap = by_doc.iter().map(|entry| entry.doc_id).collect();

        let mut source =
            self.segment
                .open_docs(other_expressions, &doc_ids, self.null_handling_enabled)?;
        let mut cursor = by_doc.iter();
        let mut fetched = 0;

        while let Some(block) = source.next_block()? {
            let fetcher = RowFetcher::new(block.columns())?;
            for (doc, &doc_id) in block.doc_ids().iter().enumerate() {
                let entry = cursor.next().filter(|entry| entry.doc_id == doc_id).ok_or_else(|| {
                    InternalError::internal_state(
                        ErrorOrigin::Selection,
                        format!("second pass returned unexpected document {doc_id}"),
                    )
                })?;
                fetcher.fill_row(doc, arena.get_mut(entry.slot), self.num_order_by_expressions)?;
            }
            fetched += block.num_docs();
        }

        if fetched != by_doc.len() {
            return Err(InternalError::internal_state(
                ErrorOrigin::Selection,
                format!(
                    "second pass fetched {fetched} of {} documents",
                    by_doc.len()
                ),
            ));
        }
        stats.num_entries_scanned_post_filter = stats
            .num_entries_scanned_post_filter
            .saturating_add((fetched * source.num_columns_projected()) as u64);

        let heap = heap.map(|entry| arena.take(entry.slot));

        Ok(OrderedRows::from_heap(heap, comparator))
    }
}
