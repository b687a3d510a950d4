use super::column_name;
use crate::{
    aggregate::{
        Accumulator, AggregationFunction, AggregationFunctionKind, AggregationFunctionVariant,
        AggregationResultHolder, GroupByResultHolder, GroupSlot, kernel::count_non_null,
    },
    block::BlockValSet,
    error::{ErrorOrigin, InternalError},
    value::{ColumnDataType, Value},
};

const STAR: &str = "*";

///
/// CountFunction
///
/// Counts non-null positions of a column, or every position for `COUNT(*)`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CountFunction {
    expression: Option<String>,
}

impl CountFunction {
    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        let expression = expression.into();

        Self {
            expression: (expression != STAR).then_some(expression),
        }
    }

    #[must_use]
    pub const fn star() -> Self {
        Self { expression: None }
    }

    pub(crate) fn construct(
        arguments: &[String],
        _null_handling_enabled: bool,
    ) -> Result<AggregationFunctionVariant, InternalError> {
        match arguments {
            [expression] => Ok(AggregationFunctionVariant::Count(Self::new(
                expression.as_str(),
            ))),
            _ => Err(InternalError::invalid_argument(
                ErrorOrigin::Aggregate,
                format!("count expects exactly 1 argument, got {}", arguments.len()),
            )),
        }
    }

    fn counted(input: Option<&BlockValSet>, index: usize) -> bool {
        input.is_none_or(|column| !column.is_null(index))
    }

    fn positions(length: usize, input: Option<&BlockValSet>) -> usize {
        input.map_or(length, |column| length.min(column.len()))
    }
}

fn fold_count(slot: &mut GroupSlot) {
    slot.value = Accumulator::Long(slot.value.as_long().saturating_add(1));
    slot.observe();
}

impl AggregationFunction for CountFunction {
    fn kind(&self) -> AggregationFunctionKind {
        AggregationFunctionKind::Count
    }

    fn input_expression(&self) -> Option<&str> {
        self.expression.as_deref()
    }

    fn result_column_name(&self) -> String {
        column_name(self.kind(), self.expression.as_deref().unwrap_or(STAR))
    }

    fn create_aggregation_result_holder(&self) -> AggregationResultHolder {
        AggregationResultHolder::new(Accumulator::Long(0))
    }

    fn create_group_by_result_holder(
        &self,
        initial_capacity: usize,
        max_capacity: usize,
    ) -> GroupByResultHolder {
        GroupByResultHolder::new(initial_capacity, max_capacity, Accumulator::Long(0))
    }

    fn aggregate(
        &self,
        length: usize,
        holder: &mut AggregationResultHolder,
        input: Option<&BlockValSet>,
    ) -> Result<(), InternalError> {
        let counted = match input {
            Some(column) => count_non_null(column.len(), length, column.null_bitmap()),
            None => i64::try_from(length).unwrap_or(i64::MAX),
        };
        let total = holder.value().as_long().saturating_add(counted);
        holder.set_value(Accumulator::Long(total));

        Ok(())
    }

    fn aggregate_group_by_sv(
        &self,
        length: usize,
        group_keys: &[u32],
        holder: &mut GroupByResultHolder,
        input: Option<&BlockValSet>,
    ) -> Result<(), InternalError> {
        let length = Self::positions(length, input);
        for (index, &key) in group_keys.iter().take(length).enumerate() {
            if Self::counted(input, index) {
                fold_count(holder.slot_mut(key)?);
            }
        }

        Ok(())
    }

    fn aggregate_group_by_mv(
        &self,
        length: usize,
        group_keys: &[Vec<u32>],
        holder: &mut GroupByResultHolder,
        input: Option<&BlockValSet>,
    ) -> Result<(), InternalError> {
        let length = Self::positions(length, input);
        for (index, keys) in group_keys.iter().take(length).enumerate() {
            if !Self::counted(input, index) {
                continue;
            }
            for &key in keys {
                fold_count(holder.slot_mut(key)?);
            }
        }

        Ok(())
    }

    fn extract_aggregation_result(&self, holder: &AggregationResultHolder) -> Value {
        Value::Long(holder.value().as_long())
    }

    fn extract_group_by_result(
        &self,
        holder: &GroupByResultHolder,
        group_key: u32,
    ) -> Result<Value, InternalError> {
        Ok(Value::Long(holder.slot(group_key)?.value.as_long()))
    }

    fn merge(&self, left: Value, right: Value) -> Result<Value, InternalError> {
        match (left, right) {
            (Value::Null, other) | (other, Value::Null) => Ok(other),
            (left, right) => match (left.as_long(), right.as_long()) {
                (Some(left), Some(right)) => Ok(Value::Long(left.saturating_add(right))),
                _ => Err(InternalError::internal_state(
                    ErrorOrigin::Merge,
                    format!(
                        "count cannot merge {} with {}",
                        left.kind_name(),
                        right.kind_name()
                    ),
                )),
            },
        }
    }

    fn intermediate_result_type(&self) -> ColumnDataType {
        ColumnDataType::Long
    }

    fn final_result_type(&self) -> ColumnDataType {
        ColumnDataType::Long
    }

    fn extract_final_result(&self, intermediate: Value) -> Result<Value, InternalError> {
        Ok(intermediate)
    }
}
