//! Module: distinct
//! Responsibility: bounded distinct-value collection over one column,
//! unordered or ordered with NULLS LAST.
//! Does not own: multi-column distinct.
//! Boundary: one generic executor per stored type, dispatched through
//! [`AnyDistinctExecutor`].

mod executor;
mod operator;
mod value;

#[cfg(test)]
mod tests;

use crate::{
    block::BlockValSet,
    direction::Direction,
    error::{ErrorOrigin, InternalError},
    value::{ByteArray, Row, Value},
};
use ordered_float::OrderedFloat;
use quarry_primitives::StoredType;
use rust_decimal::Decimal;

// re-exports
pub use executor::DistinctExecutor;
pub use operator::DistinctOperator;
pub use value::DistinctValue;

///
/// DistinctTable
///
/// Final distinct values; best-first when the executor was ordered,
/// otherwise in first-seen order.
///

#[derive(Clone, Debug, Default, PartialEq)]
pub struct DistinctTable {
    values: Vec<Value>,
}

impl DistinctTable {
    #[must_use]
    pub const fn new(values: Vec<Value>) -> Self {
        Self { values }
    }

    #[must_use]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    #[must_use]
    pub fn into_rows(self) -> Vec<Row> {
        self.values
            .into_iter()
            .map(|value| Row::new(vec![value]))
            .collect()
    }
}

macro_rules! with_executor {
    ($self:expr, $e:ident => $body:expr) => {
        match $self {
            Self::Int($e) => $body,
            Self::Long($e) => $body,
            Self::Float($e) => $body,
            Self::Double($e) => $body,
            Self::BigDecimal($e) => $body,
            Self::String($e) => $body,
            Self::Bytes($e) => $body,
        }
    };
}

///
/// AnyDistinctExecutor
///

#[derive(Clone, Debug)]
pub enum AnyDistinctExecutor {
    Int(DistinctExecutor<i32>),
    Long(DistinctExecutor<i64>),
    Float(DistinctExecutor<OrderedFloat<f32>>),
    Double(DistinctExecutor<OrderedFloat<f64>>),
    BigDecimal(DistinctExecutor<Decimal>),
    String(DistinctExecutor<String>),
    Bytes(DistinctExecutor<ByteArray>),
}

impl AnyDistinctExecutor {
    #[must_use]
    pub const fn stored_type(&self) -> StoredType {
        match self {
            Self::Int(_) => StoredType::Int,
            Self::Long(_) => StoredType::Long,
            Self::Float(_) => StoredType::Float,
            Self::Double(_) => StoredType::Double,
            Self::BigDecimal(_) => StoredType::BigDecimal,
            Self::String(_) => StoredType::String,
            Self::Bytes(_) => StoredType::Bytes,
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        with_executor!(self, e => e.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Feed one block; true when no further input can change the result.
    pub fn process(&mut self, column: &BlockValSet, length: usize) -> Result<bool, InternalError> {
        with_executor!(self, e => e.process(column, length))
    }

    /// Feed one already-materialized cell.
    pub fn add_value(&mut self, value: &Value) -> Result<bool, InternalError> {
        with_executor!(self, e => e.add_value(value))
    }

    /// Fold another executor of the same type into this one.
    pub fn merge(&mut self, other: Self) -> Result<(), InternalError> {
        match (self, other) {
            (Self::Int(a), Self::Int(b)) => a.merge(b),
            (Self::Long(a), Self::Long(b)) => a.merge(b),
            (Self::Float(a), Self::Float(b)) => a.merge(b),
            (Self::Double(a), Self::Double(b)) => a.merge(b),
            (Self::BigDecimal(a), Self::BigDecimal(b)) => a.merge(b),
            (Self::String(a), Self::String(b)) => a.merge(b),
            (Self::Bytes(a), Self::Bytes(b)) => a.merge(b),
            (a, b) => {
                return Err(InternalError::internal_state(
                    ErrorOrigin::Merge,
                    format!(
                        "cannot merge {} distinct values into {} executor",
                        b.stored_type(),
                        a.stored_type()
                    ),
                ));
            }
        }

        Ok(())
    }

    #[must_use]
    pub fn into_result(self) -> DistinctTable {
        DistinctTable::new(with_executor!(self, e => e.into_result()))
    }
}

///
/// DistinctExecutorFactory
///

pub struct DistinctExecutorFactory;

impl DistinctExecutorFactory {
    pub fn create(
        stored_type: StoredType,
        single_value: bool,
        order_by: Option<Direction>,
        limit: usize,
        null_handling_enabled: bool,
    ) -> Result<AnyDistinctExecutor, InternalError> {
        if !single_value {
            return Err(InternalError::unsupported_type(
                ErrorOrigin::Distinct,
                "distinct",
                stored_type,
                single_value,
            ));
        }

        let executor = match stored_type {
            StoredType::Int => AnyDistinctExecutor::Int(DistinctExecutor::new(
                limit,
                order_by,
                null_handling_enabled,
            )),
            StoredType::Long => AnyDistinctExecutor::Long(DistinctExecutor::new(
                limit,
                order_by,
                null_handling_enabled,
            )),
            StoredType::Float => AnyDistinctExecutor::Float(DistinctExecutor::new(
                limit,
                order_by,
                null_handling_enabled,
            )),
            StoredType::Double => AnyDistinctExecutor::Double(DistinctExecutor::new(
                limit,
                order_by,
                null_handling_enabled,
            )),
            StoredType::BigDecimal => AnyDistinctExecutor::BigDecimal(DistinctExecutor::new(
                limit,
                order_by,
                null_handling_enabled,
            )),
            StoredType::String => AnyDistinctExecutor::String(DistinctExecutor::new(
                limit,
                order_by,
                null_handling_enabled,
            )),
            StoredType::Bytes => AnyDistinctExecutor::Bytes(DistinctExecutor::new(
                limit,
                order_by,
                null_handling_enabled,
            )),
        };

        Ok(executor)
    }
}
