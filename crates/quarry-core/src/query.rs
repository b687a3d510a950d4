//! Module: query
//! Responsibility: the shape of one query and its routing to the segment
//! operator that executes it.
//! Does not own: parsing query text; callers build a [`QueryContext`]
//! directly.

use crate::{
    aggregate::{AggregationExecutor, AggregationFunctionVariant, GroupByExecutor},
    block::SegmentSource,
    config::QueryOptions,
    direction::Direction,
    distinct::DistinctOperator,
    error::{ErrorOrigin, InternalError},
    result::{CombineOperator, IntermediateResult},
    selection::{OrderByExpression, SelectionOnlyOperator, SelectionOrderByOperator},
};

///
/// QueryKind
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryKind {
    Selection,
    Aggregation,
    GroupBy,
    Distinct,
}

///
/// QueryContext
///
/// Everything the operators need to know about one query.
///

#[derive(Clone, Debug)]
pub struct QueryContext {
    kind: QueryKind,
    select: Vec<String>,
    order_by: Vec<OrderByExpression>,
    group_by: Vec<String>,
    aggregations: Vec<AggregationFunctionVariant>,
    options: QueryOptions,
}

impl QueryContext {
    fn new(kind: QueryKind) -> Self {
        Self {
            kind,
            select: Vec::new(),
            order_by: Vec::new(),
            group_by: Vec::new(),
            aggregations: Vec::new(),
            options: QueryOptions::default(),
        }
    }

    /// `SELECT <columns>`; `*` expands to every physical column.
    pub fn selection<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut query = Self::new(QueryKind::Selection);
        query.select = columns.into_iter().map(Into::into).collect();
        query
    }

    #[must_use]
    pub fn aggregation(functions: Vec<AggregationFunctionVariant>) -> Self {
        let mut query = Self::new(QueryKind::Aggregation);
        query.aggregations = functions;
        query
    }

    pub fn group_by<I, S>(columns: I, functions: Vec<AggregationFunctionVariant>) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let mut query = Self::new(QueryKind::GroupBy);
        query.group_by = columns.into_iter().map(Into::into).collect();
        query.aggregations = functions;
        query
    }

    /// `SELECT DISTINCT <column>`.
    pub fn distinct(column: impl Into<String>) -> Self {
        let mut query = Self::new(QueryKind::Distinct);
        query.select = vec![column.into()];
        query
    }

    #[must_use]
    pub fn with_order_by(mut self, order_by: Vec<OrderByExpression>) -> Self {
        self.order_by = order_by;
        self
    }

    #[must_use]
    pub const fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    #[must_use]
    pub const fn kind(&self) -> QueryKind {
        self.kind
    }

    #[must_use]
    pub fn select(&self) -> &[String] {
        &self.select
    }

    #[must_use]
    pub fn order_by(&self) -> &[OrderByExpression] {
        &self.order_by
    }

    #[must_use]
    pub fn group_by_columns(&self) -> &[String] {
        &self.group_by
    }

    #[must_use]
    pub fn aggregations(&self) -> &[AggregationFunctionVariant] {
        &self.aggregations
    }

    #[must_use]
    pub const fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Direction of a distinct query's ORDER BY, which may only name the
    /// distinct column.
    pub fn distinct_order(&self) -> Result<Option<Direction>, InternalError> {
        match (self.order_by.as_slice(), self.select.first()) {
            ([], _) => Ok(None),
            ([order], Some(column)) if &order.expression == column => Ok(Some(order.direction)),
            _ => Err(InternalError::invalid_argument(
                ErrorOrigin::Distinct,
                "distinct ORDER BY must name the distinct column",
            )),
        }
    }

    /// Run this query over one segment.
    pub fn execute_segment(
        &self,
        segment: &dyn SegmentSource,
    ) -> Result<IntermediateResult, InternalError> {
        match self.kind {
            QueryKind::Selection if self.order_by.is_empty() || self.options.limit == 0 => {
                SelectionOnlyOperator::new(segment, &self.select, &self.options).execute()
            }
            QueryKind::Selection => {
                SelectionOrderByOperator::new(segment, &self.select, &self.order_by, &self.options)
                    .execute()
            }
            QueryKind::Aggregation => {
                AggregationExecutor::new(&self.aggregations, &self.options).execute(segment)
            }
            QueryKind::GroupBy => {
                GroupByExecutor::new(&self.group_by, &self.aggregations, self.options)
                    .execute(segment)
            }
            QueryKind::Distinct => {
                let column = self.select.first().ok_or_else(|| {
                    InternalError::invalid_argument(
                        ErrorOrigin::Distinct,
                        "distinct query needs a column",
                    )
                })?;
                DistinctOperator::new(segment, column.clone(), self.distinct_order()?, self.options)
                    .execute()
            }
        }
    }

    #[must_use]
    pub fn combine_operator(&self) -> CombineOperator<'_> {
        CombineOperator::new(
            &self.aggregations,
            self.options.num_rows_to_keep(),
            self.options.num_groups_limit,
        )
    }

    /// Run over every segment and combine; per-segment failures become
    /// processing exceptions on the combined result.
    #[must_use]
    pub fn execute(&self, segments: &[&dyn SegmentSource]) -> IntermediateResult {
        self.combine_operator()
            .combine(segments.iter().map(|segment| self.execute_segment(*segment)))
    }
}
