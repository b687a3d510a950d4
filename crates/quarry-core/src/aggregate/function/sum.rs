use super::{column_name, numeric_operand, require_input, single_argument};
use crate::{
    aggregate::{
        Accumulator, AggregationFunction, AggregationFunctionKind, AggregationFunctionVariant,
        AggregationResultHolder, GroupByResultHolder, GroupSlot,
    },
    block::BlockValSet,
    error::InternalError,
    value::{ColumnDataType, Value},
};

///
/// SumFunction
///
/// Double sum of non-null positions. Empty input sums to `0.0`.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SumFunction {
    expression: String,
}

impl SumFunction {
    pub const DEFAULT_VALUE: f64 = 0.0;

    #[must_use]
    pub fn new(expression: impl Into<String>) -> Self {
        Self {
            expression: expression.into(),
        }
    }

    pub(crate) fn construct(
        arguments: &[String],
        _null_handling_enabled: bool,
    ) -> Result<AggregationFunctionVariant, InternalError> {
        let expression = single_argument(AggregationFunctionKind::Sum, arguments)?;

        Ok(AggregationFunctionVariant::Sum(Self::new(expression)))
    }
}

fn fold_sum(slot: &mut GroupSlot, value: f64, is_null: bool) {
    if is_null {
        return;
    }
    slot.value = Accumulator::Double(slot.value.as_f64() + value);
    slot.observe();
}

impl AggregationFunction for SumFunction {
    fn kind(&self) -> AggregationFunctionKind {
        AggregationFunctionKind::Sum
    }

    fn input_expression(&self) -> Option<&str> {
        Some(&self.expression)
    }

    fn result_column_name(&self) -> String {
        column_name(self.kind(), &self.expression)
    }

    fn create_aggregation_result_holder(&self) -> AggregationResultHolder {
        AggregationResultHolder::new(Accumulator::Double(Self::DEFAULT_VALUE))
    }

    fn create_group_by_result_holder(
        &self,
        initial_capacity: usize,
        max_capacity: usize,
    ) -> GroupByResultHolder {
        GroupByResultHolder::new(
            initial_capacity,
            max_capacity,
            Accumulator::Double(Self::DEFAULT_VALUE),
        )
    }

    fn aggregate(
        &self,
        length: usize,
        holder: &mut AggregationResultHolder,
        input: Option<&BlockValSet>,
    ) -> Result<(), InternalError> {
        let input = require_input(self.kind(), input)?;
        let block_sum = input.numeric_sv()?.sum(length, input.null_bitmap())?;
        holder.set_double(holder.double() + block_sum);

        Ok(())
    }

    fn aggregate_group_by_sv(
        &self,
        length: usize,
        group_keys: &[u32],
        holder: &mut GroupByResultHolder,
        input: Option<&BlockValSet>,
    ) -> Result<(), InternalError> {
        let input = require_input(self.kind(), input)?;
        let values = input.double_values_sv()?;

        for (index, (&value, &key)) in values.iter().zip(group_keys).take(length).enumerate() {
            fold_sum(holder.slot_mut(key)?, value, input.is_null(index));
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
        let input = require_input(self.kind(), input)?;
        let values = input.double_values_sv()?;

        for (index, (&value, keys)) in values.iter().zip(group_keys).take(length).enumerate() {
            let is_null = input.is_null(index);
            for &key in keys {
                fold_sum(holder.slot_mut(key)?, value, is_null);
            }
        }

        Ok(())
    }

    fn extract_aggregation_result(&self, holder: &AggregationResultHolder) -> Value {
        Value::Double(holder.double())
    }

    fn extract_group_by_result(
        &self,
        holder: &GroupByResultHolder,
        group_key: u32,
    ) -> Result<Value, InternalError> {
        Ok(Value::Double(holder.slot(group_key)?.value.as_f64()))
    }

    fn merge(&self, left: Value, right: Value) -> Result<Value, InternalError> {
        match (left, right) {
            (Value::Null, other) | (other, Value::Null) => Ok(other),
            (left, right) => {
                let left = numeric_operand(self.kind(), &left)?;
                let right = numeric_operand(self.kind(), &right)?;

                Ok(Value::Double(left + right))
            }
        }
    }

    fn intermediate_result_type(&self) -> ColumnDataType {
        ColumnDataType::Double
    }

    fn final_result_type(&self) -> ColumnDataType {
        ColumnDataType::Double
    }

    fn extract_final_result(&self, intermediate: Value) -> Result<Value, InternalError> {
        Ok(intermediate)
    }
}
