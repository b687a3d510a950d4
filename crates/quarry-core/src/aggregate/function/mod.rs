//! Concrete aggregate functions and the argument and operand helpers they
//! share.

mod count;
mod max;
mod min;
mod sum;
mod sum_precision;

pub use count::CountFunction;
pub use max::MaxFunction;
pub use min::MinFunction;
pub use sum::SumFunction;
pub use sum_precision::SumPrecisionFunction;

use crate::{
    aggregate::AggregationFunctionKind,
    block::BlockValSet,
    error::{ErrorOrigin, InternalError},
    value::Value,
};

/// Block input for functions that read a column.
fn require_input(
    kind: AggregationFunctionKind,
    input: Option<&BlockValSet>,
) -> Result<&BlockValSet, InternalError> {
    input.ok_or_else(|| {
        InternalError::internal_state(
            ErrorOrigin::Aggregate,
            format!("{} requires an input column", kind.name()),
        )
    })
}

/// The sole argument of a one-argument function.
fn single_argument(
    kind: AggregationFunctionKind,
    arguments: &[String],
) -> Result<String, InternalError> {
    match arguments {
        [expression] => Ok(expression.clone()),
        _ => Err(InternalError::invalid_argument(
            ErrorOrigin::Aggregate,
            format!(
                "{} expects exactly 1 argument, got {}",
                kind.name(),
                arguments.len()
            ),
        )),
    }
}

fn column_name(kind: AggregationFunctionKind, expression: &str) -> String {
    format!("{}({expression})", kind.name())
}

/// Numeric view of an intermediate result taking part in a merge.
fn numeric_operand(kind: AggregationFunctionKind, value: &Value) -> Result<f64, InternalError> {
    value.as_f64().ok_or_else(|| {
        InternalError::internal_state(
            ErrorOrigin::Merge,
            format!(
                "{} cannot merge a {} intermediate",
                kind.name(),
                value.kind_name()
            ),
        )
    })
}
