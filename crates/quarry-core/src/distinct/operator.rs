use crate::{
    block::SegmentSource,
    config::QueryOptions,
    direction::Direction,
    distinct::DistinctExecutorFactory,
    error::InternalError,
    obs::{OperatorKind, sink::Span},
    result::{ColumnSchema, DataSchema, ExecutionStats, IntermediateResult, ResultRows},
};
use tracing::debug;

///
/// DistinctOperator
///
/// `SELECT DISTINCT col [ORDER BY col]` over one segment.
///

pub struct DistinctOperator<'a> {
    segment: &'a dyn SegmentSource,
    expression: String,
    order_by: Option<Direction>,
    options: QueryOptions,
}

impl<'a> DistinctOperator<'a> {
    #[must_use]
    pub fn new(
        segment: &'a dyn SegmentSource,
        expression: impl Into<String>,
        order_by: Option<Direction>,
        options: QueryOptions,
    ) -> Self {
        Self {
            segment,
            expression: expression.into(),
            order_by,
            options,
        }
    }

    pub fn execute(&self) -> Result<IntermediateResult, InternalError> {
        let metadata = self.segment.column_metadata(&self.expression)?;
        let schema = DataSchema::new(vec![ColumnSchema::new(
            self.expression.clone(),
            metadata.data_type()?,
            metadata.field_kind,
        )]);
        let mut executor = DistinctExecutorFactory::create(
            metadata.stored_type,
            metadata.single_value,
            self.order_by,
            self.options.num_rows_to_keep(),
            self.options.null_handling_enabled,
        )?;

        let mut stats = ExecutionStats::for_segment(self.segment.total_docs());
        let mut span = Span::new(OperatorKind::Distinct);
        let expressions = [self.expression.clone()];
        let mut source = self
            .segment
            .open(&expressions, self.options.null_handling_enabled)?;
        let mut scanned = 0;

        while let Some(block) = source.next_block()? {
            let done = executor.process(block.column(0)?, block.num_docs())?;
            scanned += block.num_docs();
            span.add_block(block.num_docs());
            if done {
                debug!(segment = self.segment.name(), "distinct limit reached");
                break;
            }
        }

        stats.num_entries_scanned_in_filter = source.num_entries_scanned_in_filter();
        stats.record_scan(
            scanned as u64,
            (scanned * source.num_columns_projected()) as u64,
        );

        Ok(IntermediateResult::new(
            schema,
            ResultRows::Distinct(executor),
            stats,
        ))
    }
}
