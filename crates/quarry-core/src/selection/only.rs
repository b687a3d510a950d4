use crate::{
    block::{RowFetcher, SegmentSource},
    config::QueryOptions,
    error::InternalError,
    obs::{OperatorKind, sink::Span},
    result::{ExecutionStats, IntermediateResult, ResultRows},
    selection::{extract_expressions, selection_schema},
};
use tracing::debug;

///
/// SelectionOnlyOperator
///
/// Selection without ORDER BY: the first `offset + limit` matching rows in
/// scan order. A zero limit returns the schema only.
///

pub struct SelectionOnlyOperator<'a> {
    segment: &'a dyn SegmentSource,
    expressions: Vec<String>,
    num_rows_to_keep: usize,
    null_handling_enabled: bool,
}

impl<'a> SelectionOnlyOperator<'a> {
    #[must_use]
    pub fn new(segment: &'a dyn SegmentSource, select: &[String], options: &QueryOptions) -> Self {
        let expressions = extract_expressions(select, &[], options.limit, &segment.column_names());
        let num_rows_to_keep = if options.limit == 0 {
            0
        } else {
            options.num_rows_to_keep()
        };

        Self {
            segment,
            expressions,
            num_rows_to_keep,
            null_handling_enabled: options.null_handling_enabled,
        }
    }

    pub fn execute(&self) -> Result<IntermediateResult, InternalError> {
        let schema = selection_schema(self.segment, &self.expressions)?;
        let mut stats = ExecutionStats::for_segment(self.segment.total_docs());
        let mut span = Span::new(OperatorKind::Selection);
        let mut rows = Vec::with_capacity(self.num_rows_to_keep.min(crate::MAX_ROW_HOLDER_INITIAL_CAPACITY));

        if self.num_rows_to_keep > 0 {
            let mut source = self
                .segment
                .open(&self.expressions, self.null_handling_enabled)?;
            let mut scanned = 0;

            while rows.len() < self.num_rows_to_keep {
                let Some(block) = source.next_block()? else {
                    break;
                };
                let fetcher = RowFetcher::new(block.columns())?;
                let take = block.num_docs().min(self.num_rows_to_keep - rows.len());
                for doc in 0..take {
                    rows.push(fetcher.row(doc)?);
                }
                scanned += take;
                span.add_block(take);
            }

            stats.num_entries_scanned_in_filter = source.num_entries_scanned_in_filter();
            stats.record_scan(
                scanned as u64,
                (scanned * source.num_columns_projected()) as u64,
            );
        }
        debug!(segment = self.segment.name(), rows = rows.len(), "selection only");

        Ok(IntermediateResult::new(
            schema,
            ResultRows::Selection(rows),
            stats,
        ))
    }
}
