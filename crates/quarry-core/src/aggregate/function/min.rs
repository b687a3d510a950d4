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
/// MinFunction
///
/// Running minimum as a double. A null position marks its group `Null` and
/// the mark survives later non-null values; in merges a null side is the
/// identity.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct MinFunction {
    expression: String,
}

impl MinFunction {
    pub const DEFAULT_VALUE: f64 = f64::INFINITY;

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
        let expression = single_argument(AggregationFunctionKind::Min, arguments)?;

        Ok(AggregationFunctionVariant::Min(Self::new(expression)))
    }
}

fn fold_min(slot: &mut GroupSlot, value: f64, is_null: bool) {
    if is_null {
        slot.mark_null();
        return;
    }
    if value < slot.value.as_f64() {
        slot.value = Accumulator::Double(value);
    }
    slot.observe();
}

impl AggregationFunction for MinFunction {
    fn kind(&self) -> AggregationFunctionKind {
        AggregationFunctionKind::Min
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
        let block_min = input.numeric_sv()?.min(length, input.null_bitmap());
        holder.set_double(block_min.min(holder.double()));

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
            fold_min(holder.slot_mut(key)?, value, input.is_null(index));
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
                fold_min(holder.slot_mut(key)?, value, is_null);
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
        let slot = holder.slot(group_key)?;
        if slot.is_null() {
            return Ok(Value::Null);
        }

        Ok(Value::Double(slot.value.as_f64()))
    }

    fn merge(&self, left: Value, right: Value) -> Result<Value, InternalError> {
        match (left, right) {
            (Value::Null, other) | (other, Value::Null) => Ok(other),
            (left, right) => {
                let left = numeric_operand(self.kind(), &left)?;
                let right = numeric_operand(self.kind(), &right)?;

                Ok(Value::Double(left.min(right)))
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
