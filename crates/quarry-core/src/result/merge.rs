use crate::{
    aggregate::{AggregationFunction, AggregationFunctionVariant},
    error::{ErrorOrigin, InternalError},
    obs::{MetricsEvent, sink::record},
    result::{GroupByRows, IntermediateResult, ResultRows},
    selection::OrderedRows,
    value::{Row, Value},
};
use tracing::{debug, warn};

/// Append rows from `other` until `target` holds `limit` rows.
pub fn merge_without_ordering(target: &mut Vec<Row>, other: Vec<Row>, limit: usize) {
    let room = limit.saturating_sub(target.len());
    target.extend(other.into_iter().take(room));
}

/// Re-offer every row of `other` to `target`'s bounded heap.
pub fn merge_with_ordering(target: &mut OrderedRows, other: OrderedRows) -> Result<(), InternalError> {
    target.merge(other)
}

fn merge_aggregates(
    functions: &[AggregationFunctionVariant],
    target: &mut [Value],
    other: Vec<Value>,
) -> Result<(), InternalError> {
    if target.len() != functions.len() || other.len() != functions.len() {
        return Err(InternalError::internal_state(
            ErrorOrigin::Merge,
            format!(
                "aggregate widths {} and {} do not match {} functions",
                target.len(),
                other.len(),
                functions.len()
            ),
        ));
    }

    for ((function, slot), value) in functions.iter().zip(target.iter_mut()).zip(other) {
        *slot = function.merge(slot.clone(), value)?;
    }

    Ok(())
}

/// Merge per-group aggregates; groups beyond `num_groups_limit` are dropped.
/// Returns whether any group was dropped.
fn merge_groups(
    functions: &[AggregationFunctionVariant],
    target: &mut GroupByRows,
    other: GroupByRows,
    num_groups_limit: usize,
) -> Result<bool, InternalError> {
    let mut dropped = false;
    for (key, aggregates) in other.groups {
        if let Some(existing) = target.groups.get_mut(&key) {
            merge_aggregates(functions, existing, aggregates)?;
        } else if target.groups.len() < num_groups_limit {
            target.groups.insert(key, aggregates);
        } else {
            dropped = true;
        }
    }

    Ok(dropped)
}

///
/// CombineOperator
///
/// Folds per-segment partial results into one. Segment failures and merge
/// failures become processing exceptions on the combined result.
///

pub struct CombineOperator<'a> {
    functions: &'a [AggregationFunctionVariant],
    num_rows_to_keep: usize,
    num_groups_limit: usize,
}

impl<'a> CombineOperator<'a> {
    #[must_use]
    pub const fn new(
        functions: &'a [AggregationFunctionVariant],
        num_rows_to_keep: usize,
        num_groups_limit: usize,
    ) -> Self {
        Self {
            functions,
            num_rows_to_keep,
            num_groups_limit,
        }
    }

    #[must_use]
    pub fn combine(
        &self,
        partials: impl IntoIterator<Item = Result<IntermediateResult, InternalError>>,
    ) -> IntermediateResult {
        let mut combined: Option<IntermediateResult> = None;
        let mut exceptions = Vec::new();
        let mut num_partials = 0u64;

        for partial in partials {
            num_partials = num_partials.saturating_add(1);
            let partial = match partial {
                Ok(partial) => partial,
                Err(err) => {
                    warn!(error = %err, "segment execution failed");
                    exceptions.push(err.into_processing_exception());
                    continue;
                }
            };

            combined = Some(match combined {
                None => partial,
                Some(mut target) => {
                    if let Err(err) = self.merge_into(&mut target, partial) {
                        warn!(error = %err, "partial result merge failed");
                        exceptions.push(err.into_processing_exception());
                    }
                    target
                }
            });
        }

        let mut result = combined.unwrap_or_else(|| {
            IntermediateResult::new(
                super::DataSchema::default(),
                ResultRows::Empty,
                super::ExecutionStats::default(),
            )
        });
        for exception in exceptions {
            result.add_exception(exception);
        }

        let num_exceptions = result.exceptions().len() as u64;
        record(MetricsEvent::MergeFinish {
            partials: num_partials,
            exceptions: num_exceptions,
        });
        debug!(
            partials = num_partials,
            rows = result.rows().len(),
            exceptions = num_exceptions,
            "combined partial results"
        );

        result
    }

    /// Merge `other` into `target`. An empty side (exception-only result)
    /// contributes only its stats and exceptions.
    pub fn merge_into(
        &self,
        target: &mut IntermediateResult,
        other: IntermediateResult,
    ) -> Result<(), InternalError> {
        let (schema, rows, stats, exceptions) = other.into_parts();
        target.stats.merge(&stats);
        target.exceptions.extend(exceptions);

        if matches!(target.rows, ResultRows::Empty) {
            target.schema = schema;
            target.rows = rows;
            return Ok(());
        }

        match (&mut target.rows, rows) {
            (_, ResultRows::Empty) => {}
            (ResultRows::Selection(a), ResultRows::Selection(b)) => {
                merge_without_ordering(a, b, self.num_rows_to_keep);
            }
            (ResultRows::OrderedSelection(a), ResultRows::OrderedSelection(b)) => {
                merge_with_ordering(a, b)?;
            }
            (ResultRows::Aggregation(a), ResultRows::Aggregation(b)) => {
                merge_aggregates(self.functions, a, b.into_cells())?;
            }
            (ResultRows::GroupBy(a), ResultRows::GroupBy(b)) => {
                if merge_groups(self.functions, a, b, self.num_groups_limit)? {
                    target.stats.num_groups_limit_reached = true;
                }
            }
            (ResultRows::Distinct(a), ResultRows::Distinct(b)) => a.merge(b)?,
            (a, b) => {
                return Err(InternalError::internal_state(
                    ErrorOrigin::Merge,
                    format!(
                        "cannot merge {} rows into {} rows",
                        b.kind_name(),
                        a.kind_name()
                    ),
                ));
            }
        }

        Ok(())
    }
}
