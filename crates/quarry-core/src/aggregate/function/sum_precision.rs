use super::{column_name, require_input};
use crate::{
    aggregate::{
        Accumulator, AggregationFunction, AggregationFunctionKind, AggregationFunctionVariant,
        AggregationResultHolder, GroupByResultHolder, GroupSlot, GroupState,
    },
    block::{BlockValSet, ColumnValues},
    error::{ErrorOrigin, InternalError},
    value::{
        ColumnDataType, Value,
        decimal::{
            decimal_from_f32, decimal_from_f64, deserialize_decimal, parse_decimal,
            round_to_precision, set_scale,
        },
    },
};
use rust_decimal::Decimal;

///
/// SumPrecisionFunction
///
/// Exact decimal sum with optional precision and scale applied to the final
/// result. With null handling enabled a holder that never saw a non-null
/// input extracts as null.
///

#[derive(Clone, Debug, Eq, PartialEq)]
pub struct SumPrecisionFunction {
    expression: String,
    precision: u32,
    scale: Option<u32>,
    null_handling_enabled: bool,
}

impl SumPrecisionFunction {
    #[must_use]
    pub fn new(expression: impl Into<String>, null_handling_enabled: bool) -> Self {
        Self {
            expression: expression.into(),
            precision: 0,
            scale: None,
            null_handling_enabled,
        }
    }

    #[must_use]
    pub const fn with_precision(mut self, precision: u32) -> Self {
        self.precision = precision;
        self
    }

    #[must_use]
    pub const fn with_scale(mut self, scale: u32) -> Self {
        self.scale = Some(scale);
        self
    }

    #[must_use]
    pub const fn precision(&self) -> u32 {
        self.precision
    }

    #[must_use]
    pub const fn scale(&self) -> Option<u32> {
        self.scale
    }

    pub(crate) fn construct(
        arguments: &[String],
        null_handling_enabled: bool,
    ) -> Result<AggregationFunctionVariant, InternalError> {
        let (expression, precision, scale) = match arguments {
            [expression] => (expression, None, None),
            [expression, precision] => (expression, Some(precision), None),
            [expression, precision, scale] => (expression, Some(precision), Some(scale)),
            _ => {
                return Err(InternalError::invalid_argument(
                    ErrorOrigin::Aggregate,
                    format!(
                        "sumprecision expects 1 to 3 arguments, got {}",
                        arguments.len()
                    ),
                ));
            }
        };

        let mut function = Self::new(expression.as_str(), null_handling_enabled);
        if let Some(precision) = precision {
            function = function.with_precision(parse_literal("precision", precision)?);
        }
        if let Some(scale) = scale {
            function = function.with_scale(parse_literal("scale", scale)?);
        }

        Ok(AggregationFunctionVariant::SumPrecision(function))
    }

    /// Decimal operands of the first `length` positions; `None` marks a
    /// position that does not contribute.
    fn block_decimals(
        &self,
        length: usize,
        input: &BlockValSet,
    ) -> Result<Vec<Option<Decimal>>, InternalError> {
        let length = length.min(input.len());
        let mut out = Vec::with_capacity(length);

        for index in 0..length {
            if self.null_handling_enabled && input.is_null(index) {
                out.push(None);
                continue;
            }
            out.push(self.decimal_at(input.values(), index)?);
        }

        Ok(out)
    }

    fn decimal_at(&self, values: &ColumnValues, index: usize) -> Result<Option<Decimal>, InternalError> {
        let decimal = match values {
            ColumnValues::Int(v) => Decimal::from(v[index]),
            ColumnValues::Long(v) => Decimal::from(v[index]),
            ColumnValues::Float(v) => {
                if self.null_handling_enabled && !v[index].is_finite() {
                    return Ok(None);
                }
                decimal_from_f32(v[index])?
            }
            ColumnValues::Double(v) => {
                if self.null_handling_enabled && !v[index].is_finite() {
                    return Ok(None);
                }
                decimal_from_f64(v[index])?
            }
            ColumnValues::BigDecimal(v) => v[index],
            ColumnValues::String(v) => parse_decimal(&v[index])?,
            ColumnValues::Bytes(v) => deserialize_decimal(&v[index])?,
            other => {
                return Err(InternalError::invalid_argument(
                    ErrorOrigin::Aggregate,
                    format!(
                        "sumprecision does not accept multi-value {} input",
                        other.stored_type()
                    ),
                ));
            }
        };

        Ok(Some(decimal))
    }

    fn group_value(&self, slot: &GroupSlot) -> Value {
        if self.null_handling_enabled && slot.state != GroupState::Valued {
            return Value::Null;
        }

        Value::BigDecimal(slot.value.as_decimal())
    }
}

fn parse_literal(name: &str, literal: &str) -> Result<u32, InternalError> {
    literal.trim().parse::<u32>().map_err(|_| {
        InternalError::invalid_argument(
            ErrorOrigin::Aggregate,
            format!("sumprecision {name} must be a non-negative integer, got '{literal}'"),
        )
    })
}

fn checked_sum(left: Decimal, right: Decimal) -> Result<Decimal, InternalError> {
    left.checked_add(right).ok_or_else(|| {
        InternalError::invalid_argument(ErrorOrigin::Aggregate, "decimal sum overflow")
    })
}

fn fold_decimal(slot: &mut GroupSlot, value: Decimal) -> Result<(), InternalError> {
    slot.value = Accumulator::Decimal(checked_sum(slot.value.as_decimal(), value)?);
    slot.observe();

    Ok(())
}

fn decimal_operand(value: &Value) -> Result<Decimal, InternalError> {
    match value {
        Value::BigDecimal(v) => Ok(*v),
        Value::String(v) => parse_decimal(v),
        other => Err(InternalError::internal_state(
            ErrorOrigin::Merge,
            format!("sumprecision cannot merge a {} intermediate", other.kind_name()),
        )),
    }
}

impl AggregationFunction for SumPrecisionFunction {
    fn kind(&self) -> AggregationFunctionKind {
        AggregationFunctionKind::SumPrecision
    }

    fn input_expression(&self) -> Option<&str> {
        Some(&self.expression)
    }

    fn result_column_name(&self) -> String {
        column_name(self.kind(), &self.expression)
    }

    fn create_aggregation_result_holder(&self) -> AggregationResultHolder {
        AggregationResultHolder::new(Accumulator::Decimal(Decimal::ZERO))
    }

    fn create_group_by_result_holder(
        &self,
        initial_capacity: usize,
        max_capacity: usize,
    ) -> GroupByResultHolder {
        GroupByResultHolder::new(
            initial_capacity,
            max_capacity,
            Accumulator::Decimal(Decimal::ZERO),
        )
    }

    fn aggregate(
        &self,
        length: usize,
        holder: &mut AggregationResultHolder,
        input: Option<&BlockValSet>,
    ) -> Result<(), InternalError> {
        let input = require_input(self.kind(), input)?;
        let mut sum = holder.value().as_decimal();

        for value in self.block_decimals(length, input)?.into_iter().flatten() {
            sum = checked_sum(sum, value)?;
            holder.mark_non_null();
        }
        holder.set_value(Accumulator::Decimal(sum));

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
        let values = self.block_decimals(length, input)?;

        for (value, &key) in values.into_iter().zip(group_keys) {
            if let Some(value) = value {
                fold_decimal(holder.slot_mut(key)?, value)?;
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
        let input = require_input(self.kind(), input)?;
        let values = self.block_decimals(length, input)?;

        for (value, keys) in values.into_iter().zip(group_keys) {
            let Some(value) = value else {
                continue;
            };
            for &key in keys {
                fold_decimal(holder.slot_mut(key)?, value)?;
            }
        }

        Ok(())
    }

    fn extract_aggregation_result(&self, holder: &AggregationResultHolder) -> Value {
        if self.null_handling_enabled && !holder.has_non_null() {
            return Value::Null;
        }

        Value::BigDecimal(holder.value().as_decimal())
    }

    fn extract_group_by_result(
        &self,
        holder: &GroupByResultHolder,
        group_key: u32,
    ) -> Result<Value, InternalError> {
        Ok(self.group_value(holder.slot(group_key)?))
    }

    fn merge(&self, left: Value, right: Value) -> Result<Value, InternalError> {
        match (left, right) {
            (Value::Null, other) | (other, Value::Null) => Ok(other),
            (left, right) => {
                let sum = checked_sum(decimal_operand(&left)?, decimal_operand(&right)?)?;

                Ok(Value::BigDecimal(sum))
            }
        }
    }

    fn intermediate_result_type(&self) -> ColumnDataType {
        ColumnDataType::Object
    }

    fn final_result_type(&self) -> ColumnDataType {
        ColumnDataType::String
    }

    fn extract_final_result(&self, intermediate: Value) -> Result<Value, InternalError> {
        if intermediate.is_null() {
            return Ok(Value::Null);
        }

        let mut result = round_to_precision(decimal_operand(&intermediate)?, self.precision);
        if let Some(scale) = self.scale {
            result = set_scale(result, scale);
        }

        Ok(Value::String(result.to_string()))
    }
}
