use crate::{
    aggregate::{AggregationFunction, AggregationFunctionVariant, GroupByResultHolder},
    block::{BlockValSet, RowFetcher, SegmentSource},
    config::QueryOptions,
    error::{ErrorOrigin, InternalError},
    obs::{OperatorKind, sink::Span},
    result::{
        ColumnSchema, DataSchema, ExecutionStats, GroupByRows, IntermediateResult, ResultRows,
    },
    value::{FieldKind, Row, Value, ValueKey},
};
use ordered_float::OrderedFloat;
use std::{borrow::Cow, collections::HashMap};
use tracing::debug;

/// Distinct input expressions of `functions`, after `leading`.
fn projected_expressions(leading: &[String], functions: &[AggregationFunctionVariant]) -> Vec<String> {
    let mut out = leading.to_vec();
    for function in functions {
        if let Some(expression) = function.input_expression()
            && !out.iter().any(|e| e == expression)
        {
            out.push(expression.to_string());
        }
    }

    out
}

/// Column index of each function's input, `None` for `COUNT(*)`.
fn input_columns(expressions: &[String], functions: &[AggregationFunctionVariant]) -> Vec<Option<usize>> {
    functions
        .iter()
        .map(|function| {
            function
                .input_expression()
                .and_then(|input| expressions.iter().position(|e| e == input))
        })
        .collect()
}

fn aggregation_columns(functions: &[AggregationFunctionVariant]) -> impl Iterator<Item = ColumnSchema> + '_ {
    functions.iter().map(|function| {
        ColumnSchema::new(
            function.result_column_name(),
            function.intermediate_result_type(),
            FieldKind::Metric,
        )
    })
}

///
/// AggregationExecutor
///
/// Scalar aggregation (no GROUP BY) over one segment.
///

pub struct AggregationExecutor<'a> {
    functions: &'a [AggregationFunctionVariant],
    null_handling_enabled: bool,
}

impl<'a> AggregationExecutor<'a> {
    #[must_use]
    pub const fn new(functions: &'a [AggregationFunctionVariant], options: &QueryOptions) -> Self {
        Self {
            functions,
            null_handling_enabled: options.null_handling_enabled,
        }
    }

    pub fn execute(&self, segment: &dyn SegmentSource) -> Result<IntermediateResult, InternalError> {
        let expressions = projected_expressions(&[], self.functions);
        let inputs = input_columns(&expressions, self.functions);
        let mut holders: Vec<_> = self
            .functions
            .iter()
            .map(AggregationFunction::create_aggregation_result_holder)
            .collect();

        let mut stats = ExecutionStats::for_segment(segment.total_docs());
        let mut span = Span::new(OperatorKind::Aggregation);
        let mut source = segment.open(&expressions, self.null_handling_enabled)?;
        let mut scanned = 0;

        while let Some(block) = source.next_block()? {
            let length = block.num_docs();
            for ((function, holder), input) in self.functions.iter().zip(&mut holders).zip(&inputs) {
                let column = input.map(|index| block.column(index)).transpose()?;
                function.aggregate(length, holder, column)?;
            }
            scanned += length;
            span.add_block(length);
        }

        stats.num_entries_scanned_in_filter = source.num_entries_scanned_in_filter();
        stats.record_scan(
            scanned as u64,
            (scanned * source.num_columns_projected()) as u64,
        );

        let row: Row = self
            .functions
            .iter()
            .zip(&holders)
            .map(|(function, holder)| function.extract_aggregation_result(holder))
            .collect();
        let schema = DataSchema::new(aggregation_columns(self.functions).collect());

        Ok(IntermediateResult::new(
            schema,
            ResultRows::Aggregation(row),
            stats,
        ))
    }
}

///
/// GroupKeyGenerator
///
/// Assigns dense group ids to distinct group-by tuples, up to `limit`
/// groups. Tuples first seen after the limit get no id.
///

#[derive(Clone, Debug, Default)]
pub struct GroupKeyGenerator {
    ids: HashMap<Vec<ValueKey>, u32>,
    keys: Vec<Vec<ValueKey>>,
    limit: usize,
    limit_reached: bool,
}

impl GroupKeyGenerator {
    #[must_use]
    pub fn new(limit: usize) -> Self {
        Self {
            limit,
            ..Self::default()
        }
    }

    #[must_use]
    pub const fn num_keys(&self) -> usize {
        self.keys.len()
    }

    #[must_use]
    pub const fn limit_reached(&self) -> bool {
        self.limit_reached
    }

    /// Group tuples indexed by id.
    #[must_use]
    pub fn keys(&self) -> &[Vec<ValueKey>] {
        &self.keys
    }

    pub fn key_for(&mut self, tuple: Vec<ValueKey>) -> Option<u32> {
        if let Some(&id) = self.ids.get(&tuple) {
            return Some(id);
        }
        if self.keys.len() >= self.limit {
            self.limit_reached = true;
            return None;
        }

        let id = u32::try_from(self.keys.len()).ok()?;
        self.ids.insert(tuple.clone(), id);
        self.keys.push(tuple);

        Some(id)
    }
}

/// Scalar elements of a multi-value group-by cell.
fn array_elements(cell: &Value) -> Vec<ValueKey> {
    match cell {
        Value::IntArray(v) => v.iter().map(|&x| ValueKey::Int(x)).collect(),
        Value::LongArray(v) => v.iter().map(|&x| ValueKey::Long(x)).collect(),
        Value::FloatArray(v) => v.iter().map(|&x| ValueKey::Float(OrderedFloat(x))).collect(),
        Value::DoubleArray(v) => v.iter().map(|&x| ValueKey::Double(OrderedFloat(x))).collect(),
        Value::StringArray(v) => v.iter().cloned().map(ValueKey::String).collect(),
        other => vec![ValueKey::from(other)],
    }
}

///
/// GroupByExecutor
///
/// GROUP BY aggregation over one segment. A multi-value group-by column is
/// supported when it is the only group-by column.
///

pub struct GroupByExecutor<'a> {
    group_by: &'a [String],
    functions: &'a [AggregationFunctionVariant],
    options: QueryOptions,
}

impl<'a> GroupByExecutor<'a> {
    #[must_use]
    pub const fn new(
        group_by: &'a [String],
        functions: &'a [AggregationFunctionVariant],
        options: QueryOptions,
    ) -> Self {
        Self {
            group_by,
            functions,
            options,
        }
    }

    fn schema(&self, segment: &dyn SegmentSource) -> Result<(DataSchema, bool), InternalError> {
        let mut columns = Vec::with_capacity(self.group_by.len() + self.functions.len());
        let mut multi_value = false;

        for column in self.group_by {
            let metadata = segment.column_metadata(column)?;
            if !metadata.single_value {
                if self.group_by.len() > 1 {
                    return Err(InternalError::unsupported(
                        ErrorOrigin::Aggregate,
                        format!("multi-value group-by column '{column}' must be the only group-by column"),
                    ));
                }
                multi_value = true;
            }
            let data_type = crate::value::ColumnDataType::from_stored(metadata.stored_type, true)
                .ok_or_else(|| {
                    InternalError::unsupported_type(
                        ErrorOrigin::Aggregate,
                        "group-by",
                        metadata.stored_type,
                        metadata.single_value,
                    )
                })?;
            columns.push(ColumnSchema::new(column.clone(), data_type, metadata.field_kind));
        }
        columns.extend(aggregation_columns(self.functions));

        Ok((DataSchema::new(columns), multi_value))
    }

    pub fn execute(&self, segment: &dyn SegmentSource) -> Result<IntermediateResult, InternalError> {
        let (schema, multi_value) = self.schema(segment)?;
        let num_group_by = self.group_by.len();
        let expressions = projected_expressions(self.group_by, self.functions);
        let inputs = input_columns(&expressions, self.functions);

        let max_capacity = self.options.num_groups_limit;
        let initial_capacity = self.options.max_initial_capacity.min(max_capacity);
        let mut holders: Vec<GroupByResultHolder> = self
            .functions
            .iter()
            .map(|f| f.create_group_by_result_holder(initial_capacity, max_capacity))
            .collect();
        let mut generator = GroupKeyGenerator::new(max_capacity);

        let mut stats = ExecutionStats::for_segment(segment.total_docs());
        let mut span = Span::new(OperatorKind::GroupBy);
        let mut source = segment.open(&expressions, self.options.null_handling_enabled)?;
        let mut scanned = 0;

        while let Some(block) = source.next_block()? {
            let fetcher = RowFetcher::new(&block.columns()[..num_group_by])?;

            if multi_value {
                let mut keys = Vec::with_capacity(block.num_docs());
                for doc in 0..block.num_docs() {
                    let row = fetcher.row(doc)?;
                    let doc_keys: Vec<u32> = row
                        .iter()
                        .flat_map(array_elements)
                        .filter_map(|element| generator.key_for(vec![element]))
                        .collect();
                    keys.push(doc_keys);
                }
                for holder in &mut holders {
                    holder.ensure_capacity(generator.num_keys())?;
                }
                for ((function, holder), input) in self.functions.iter().zip(&mut holders).zip(&inputs) {
                    let column = input.map(|index| block.column(index)).transpose()?;
                    function.aggregate_group_by_mv(block.num_docs(), &keys, holder, column)?;
                }
            } else {
                let mut keys = Vec::with_capacity(block.num_docs());
                let mut positions = Vec::with_capacity(block.num_docs());
                for doc in 0..block.num_docs() {
                    let tuple = fetcher.row(doc)?.iter().map(ValueKey::from).collect();
                    if let Some(key) = generator.key_for(tuple) {
                        keys.push(key);
                        positions.push(doc);
                    }
                }

                // drop documents whose group was refused by the limit
                let columns: Cow<'_, [BlockValSet]> = if positions.len() == block.num_docs() {
                    Cow::Borrowed(block.columns())
                } else {
                    Cow::Owned(block.columns().iter().map(|c| c.take(&positions)).collect())
                };

                for holder in &mut holders {
                    holder.ensure_capacity(generator.num_keys())?;
                }
                for ((function, holder), input) in self.functions.iter().zip(&mut holders).zip(&inputs) {
                    let column = input.map(|index| &columns[index]);
                    function.aggregate_group_by_sv(keys.len(), &keys, holder, column)?;
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
        stats.num_groups_limit_reached = generator.limit_reached();
        for holder in &holders {
            stats.num_resizes = stats.num_resizes.saturating_add(holder.num_resizes());
            stats.resize_time_ms = stats.resize_time_ms.saturating_add(holder.resize_time_ms());
        }

        let mut groups = GroupByRows::new();
        for (id, tuple) in (0u32..).zip(generator.keys()) {
            let aggregates = self
                .functions
                .iter()
                .zip(&holders)
                .map(|(function, holder)| function.extract_group_by_result(holder, id))
                .collect::<Result<Vec<_>, _>>()?;
            groups.insert(tuple.clone(), aggregates);
        }
        debug!(
            segment = segment.name(),
            groups = groups.len(),
            limit_reached = stats.num_groups_limit_reached,
            "group-by"
        );

        Ok(IntermediateResult::new(
            schema,
            ResultRows::GroupBy(groups),
            stats,
        ))
    }
}
