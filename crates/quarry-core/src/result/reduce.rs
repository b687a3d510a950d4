use crate::{
    aggregate::{AggregationFunction, AggregationFunctionVariant},
    distinct::DistinctExecutorFactory,
    error::{ErrorOrigin, InternalError, ProcessingException, QueryErrorCode},
    query::{QueryContext, QueryKind},
    result::{ColumnSchema, DataSchema, DataTable, ExecutionStats},
    selection::{OrderByComparator, OrderedRows, selection_columns},
    value::{FieldKind, Row, Value, ValueKey},
};
use serde::Serialize;
use std::collections::BTreeMap;
use tracing::{debug, warn};

///
/// ResultTable
///
/// Final rendered rows with their output schema.
///

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResultTable {
    pub schema: DataSchema,
    pub rows: Vec<Row>,
}

///
/// BrokerResponse
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct BrokerResponse {
    pub result_table: Option<ResultTable>,
    pub stats: ExecutionStats,
    pub exceptions: Vec<ProcessingException>,
}

impl BrokerResponse {
    #[must_use]
    pub fn num_rows(&self) -> usize {
        self.result_table.as_ref().map_or(0, |table| table.rows.len())
    }
}

/// Project `rows` onto `columns` (duplicates allowed) and convert and format
/// every cell by its column type.
pub fn render_result_table(
    schema: &DataSchema,
    rows: Vec<Row>,
    columns: &[String],
) -> Result<ResultTable, InternalError> {
    let indices = columns
        .iter()
        .map(|name| {
            schema.index_of(name).ok_or_else(|| {
                InternalError::internal_state(
                    ErrorOrigin::Render,
                    format!("result column '{name}' is missing from the data schema"),
                )
            })
        })
        .collect::<Result<Vec<_>, _>>()?;

    let output_schema = DataSchema::new(
        indices
            .iter()
            .filter_map(|&index| schema.column(index).cloned())
            .collect(),
    );
    let rows = rows
        .into_iter()
        .map(|row| {
            indices
                .iter()
                .zip(output_schema.columns())
                .map(|(&index, column)| {
                    let cell = row.get(index).cloned().unwrap_or_default();
                    column.data_type.convert_and_format(cell)
                })
                .collect::<Result<Row, _>>()
        })
        .collect::<Result<Vec<_>, _>>()?;

    Ok(ResultTable {
        schema: output_schema,
        rows,
    })
}

///
/// BrokerReducer
///
/// Reduces the data tables of every server into the final result table.
///

pub struct BrokerReducer<'a> {
    query: &'a QueryContext,
}

impl<'a> BrokerReducer<'a> {
    #[must_use]
    pub const fn new(query: &'a QueryContext) -> Self {
        Self { query }
    }

    #[must_use]
    pub fn reduce(&self, tables: &[DataTable]) -> BrokerResponse {
        let mut response = BrokerResponse::default();
        for table in tables {
            response.stats.merge(&table.stats());
            response.exceptions.extend_from_slice(table.exceptions());
        }

        let tables: Vec<&DataTable> = tables.iter().filter(|t| !t.schema().is_empty()).collect();
        match self.reduce_tables(&tables) {
            Ok(result_table) => {
                debug!(rows = result_table.rows.len(), tables = tables.len(), "reduced");
                response.result_table = Some(result_table);
            }
            Err(err) => {
                warn!(error = %err, "broker reduce failed");
                response.exceptions.push(ProcessingException::new(
                    QueryErrorCode::MergeResponse,
                    err.display_with_class(),
                ));
            }
        }

        response
    }

    fn reduce_tables(&self, tables: &[&DataTable]) -> Result<ResultTable, InternalError> {
        let Some(first) = tables.first() else {
            return Ok(ResultTable::default());
        };
        let schema = first.schema();

        match self.query.kind() {
            QueryKind::Selection => {
                let rows = if self.query.order_by().is_empty() {
                    self.reduce_without_ordering(tables)
                } else {
                    self.reduce_with_ordering(schema, tables)?
                };
                let all_columns: Vec<String> =
                    schema.names().into_iter().map(str::to_string).collect();
                let columns = selection_columns(self.query.select(), &all_columns);

                render_result_table(schema, rows, &columns)
            }
            QueryKind::Aggregation => self.reduce_aggregation(tables),
            QueryKind::GroupBy => self.reduce_group_by(schema, tables),
            QueryKind::Distinct => self.reduce_distinct(schema, tables),
        }
    }

    fn reduce_without_ordering(&self, tables: &[&DataTable]) -> Vec<Row> {
        let options = self.query.options();
        tables
            .iter()
            .flat_map(|table| table.extract_rows())
            .take(options.num_rows_to_keep())
            .skip(options.offset)
            .collect()
    }

    fn reduce_with_ordering(
        &self,
        schema: &DataSchema,
        tables: &[&DataTable],
    ) -> Result<Vec<Row>, InternalError> {
        let options = self.query.options();
        let keys = self
            .query
            .order_by()
            .iter()
            .filter_map(|order| {
                let index = schema.index_of(&order.expression)?;
                let column = schema.column(index)?;
                (!column.data_type.is_array()).then_some((index, order.direction))
            })
            .collect();
        let num_rows = options.num_rows_to_keep();
        let mut ordered = OrderedRows::new(
            OrderByComparator::new(keys),
            num_rows,
            options.initial_capacity(num_rows),
        );
        for row in tables.iter().flat_map(|table| table.extract_rows()) {
            ordered.offer(row)?;
        }

        Ok(ordered
            .into_sorted_rows()
            .into_iter()
            .skip(options.offset)
            .collect())
    }

    fn reduce_aggregation(&self, tables: &[&DataTable]) -> Result<ResultTable, InternalError> {
        let functions = self.query.aggregations();
        let mut merged: Option<Vec<Value>> = None;

        for row in tables.iter().filter_map(|table| table.extract_row(0)) {
            merged = Some(match merged {
                None => row.into_cells(),
                Some(current) => current
                    .into_iter()
                    .zip(row.into_cells())
                    .zip(functions)
                    .map(|((left, right), function)| function.merge(left, right))
                    .collect::<Result<_, _>>()?,
            });
        }

        let schema = final_schema(&[], functions);
        let Some(merged) = merged else {
            return Ok(ResultTable {
                schema,
                rows: Vec::new(),
            });
        };
        let row = functions
            .iter()
            .zip(merged)
            .map(|(function, value)| function.extract_final_result(value))
            .collect::<Result<Row, _>>()?;
        let columns: Vec<String> = schema.names().into_iter().map(str::to_string).collect();

        render_result_table(&schema, vec![row], &columns)
    }

    fn reduce_group_by(
        &self,
        schema: &DataSchema,
        tables: &[&DataTable],
    ) -> Result<ResultTable, InternalError> {
        let functions = self.query.aggregations();
        let options = self.query.options();
        let num_keys = self.query.group_by_columns().len();
        let mut groups: BTreeMap<Vec<ValueKey>, Vec<Value>> = BTreeMap::new();

        for row in tables.iter().flat_map(|table| table.extract_rows()) {
            let mut cells = row.into_cells();
            let aggregates = cells.split_off(num_keys.min(cells.len()));
            let key: Vec<ValueKey> = cells.iter().map(ValueKey::from).collect();

            if let Some(current) = groups.get_mut(&key) {
                for ((slot, value), function) in current.iter_mut().zip(aggregates).zip(functions) {
                    *slot = function.merge(slot.clone(), value)?;
                }
            } else if groups.len() < options.num_groups_limit {
                groups.insert(key, aggregates);
            }
        }

        let key_columns: Vec<ColumnSchema> = schema.columns().iter().take(num_keys).cloned().collect();
        let output_schema = final_schema(&key_columns, functions);
        let mut rows = groups
            .into_iter()
            .map(|(key, aggregates)| -> Result<Row, InternalError> {
                let finals = functions
                    .iter()
                    .zip(aggregates)
                    .map(|(function, value)| function.extract_final_result(value))
                    .collect::<Result<Vec<_>, _>>()?;

                Ok(key.into_iter().map(Value::from).chain(finals).collect())
            })
            .collect::<Result<Vec<_>, _>>()?;

        if !self.query.order_by().is_empty() {
            let keys = self
                .query
                .order_by()
                .iter()
                .map(|order| {
                    output_schema
                        .index_of(&order.expression)
                        .map(|index| (index, order.direction))
                        .ok_or_else(|| {
                            InternalError::invalid_argument(
                                ErrorOrigin::Merge,
                                format!(
                                    "group-by ORDER BY '{}' is not a result column",
                                    order.expression
                                ),
                            )
                        })
                })
                .collect::<Result<Vec<_>, _>>()?;
            let comparator = OrderByComparator::new(keys);
            rows.sort_by(|a, b| comparator.compare(a, b));
        }

        let rows = rows
            .into_iter()
            .skip(options.offset)
            .take(options.limit)
            .collect();
        let columns: Vec<String> = output_schema
            .names()
            .into_iter()
            .map(str::to_string)
            .collect();

        render_result_table(&output_schema, rows, &columns)
    }

    fn reduce_distinct(
        &self,
        schema: &DataSchema,
        tables: &[&DataTable],
    ) -> Result<ResultTable, InternalError> {
        let options = self.query.options();
        let column = schema.column(0).ok_or_else(|| {
            InternalError::internal_state(ErrorOrigin::Merge, "distinct table has no column")
        })?;
        let stored_type = column.data_type.stored_type().ok_or_else(|| {
            InternalError::internal_state(
                ErrorOrigin::Merge,
                format!("distinct column type {} has no stored type", column.data_type),
            )
        })?;
        let mut executor = DistinctExecutorFactory::create(
            stored_type,
            !column.data_type.is_array(),
            self.query.distinct_order()?,
            options.num_rows_to_keep(),
            options.null_handling_enabled,
        )?;

        'tables: for table in tables {
            for row in table.extract_rows() {
                if executor.add_value(row.first().unwrap_or(&Value::Null))? {
                    break 'tables;
                }
            }
        }

        let rows = executor
            .into_result()
            .into_rows()
            .into_iter()
            .skip(options.offset)
            .collect();

        render_result_table(schema, rows, &[column.name.clone()])
    }
}

/// Key columns followed by one final-typed column per function.
fn final_schema(
    key_columns: &[ColumnSchema],
    functions: &[AggregationFunctionVariant],
) -> DataSchema {
    let mut columns = key_columns.to_vec();
    columns.extend(functions.iter().map(|function| {
        ColumnSchema::new(
            function.result_column_name(),
            function.final_result_type(),
            FieldKind::Metric,
        )
    }));

    DataSchema::new(columns)
}
