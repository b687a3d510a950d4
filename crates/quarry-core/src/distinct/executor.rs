use crate::{
    block::BlockValSet,
    direction::Direction,
    distinct::DistinctValue,
    error::{ErrorOrigin, InternalError},
    selection::{Offer, TopKHeap},
    value::Value,
};
use std::{cmp::Ordering, collections::HashSet};

/// NULLS LAST order over optional distinct values.
fn compare_optional<T: Ord>(left: &Option<T>, right: &Option<T>, direction: Direction) -> Ordering {
    match (left, right) {
        (None, None) => Ordering::Equal,
        (None, Some(_)) => Ordering::Greater,
        (Some(_), None) => Ordering::Less,
        (Some(l), Some(r)) => direction.apply(l.cmp(r)),
    }
}

///
/// DistinctExecutor
///
/// Up to `limit` distinct values of one column. `None` stands for null and
/// only appears when null handling is enabled.
///
/// Unordered mode keeps the first `limit` distinct values seen. Ordered
/// mode keeps the best `limit` under `order_by`, nulls last.
///

#[derive(Clone, Debug)]
pub struct DistinctExecutor<T: DistinctValue> {
    limit: usize,
    null_handling_enabled: bool,
    seen: HashSet<Option<T>>,
    insertion_order: Vec<Option<T>>,
    ordered: Option<(TopKHeap<Option<T>>, Direction)>,
}

impl<T: DistinctValue> DistinctExecutor<T> {
    #[must_use]
    pub fn new(limit: usize, order_by: Option<Direction>, null_handling_enabled: bool) -> Self {
        let initial_capacity = limit.min(crate::MAX_ROW_HOLDER_INITIAL_CAPACITY);

        Self {
            limit,
            null_handling_enabled,
            seen: HashSet::with_capacity(initial_capacity),
            insertion_order: Vec::new(),
            ordered: order_by
                .map(|direction| (TopKHeap::with_capacity(limit, initial_capacity), direction)),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.is_empty()
    }

    #[must_use]
    pub const fn is_ordered(&self) -> bool {
        self.ordered.is_some()
    }

    /// Unordered executors stop accepting input once full.
    #[must_use]
    pub fn is_saturated(&self) -> bool {
        !self.is_ordered() && self.seen.len() >= self.limit
    }

    /// Offer one candidate; true when the executor is saturated.
    pub fn add(&mut self, value: Option<T>) -> bool {
        if self.is_saturated() {
            return true;
        }
        if self.seen.contains(&value) {
            return false;
        }

        match &mut self.ordered {
            None => {
                self.seen.insert(value.clone());
                self.insertion_order.push(value);
            }
            Some((heap, direction)) => {
                let direction = *direction;
                match heap.offer(value.clone(), |a, b| compare_optional(a, b, direction)) {
                    Offer::Inserted => {
                        self.seen.insert(value);
                    }
                    Offer::Replaced(evicted) => {
                        self.seen.remove(&evicted);
                        self.seen.insert(value);
                    }
                    Offer::Rejected(_) => {}
                }
            }
        }

        self.is_saturated()
    }

    /// Feed the first `length` positions of one block. Ordered executors
    /// always return false.
    pub fn process(&mut self, column: &BlockValSet, length: usize) -> Result<bool, InternalError> {
        let length = length.min(column.len());
        for index in 0..length {
            let value = if self.null_handling_enabled && column.is_null(index) {
                None
            } else {
                Some(T::read(column.values(), index).ok_or_else(|| {
                    InternalError::unsupported_type(
                        ErrorOrigin::Distinct,
                        "distinct",
                        column.stored_type(),
                        column.is_single_value(),
                    )
                })?)
            };
            if self.add(value) {
                return Ok(true);
            }
        }

        Ok(self.is_saturated())
    }

    /// Feed one materialized cell; `Value::Null` is dropped unless null
    /// handling is enabled.
    pub fn add_value(&mut self, value: &Value) -> Result<bool, InternalError> {
        if value.is_null() {
            if !self.null_handling_enabled {
                return Ok(self.is_saturated());
            }
            return Ok(self.add(None));
        }

        let typed = T::from_value(value).ok_or_else(|| {
            InternalError::internal_state(
                ErrorOrigin::Distinct,
                format!(
                    "{} distinct executor cannot accept a {} value",
                    T::STORED_TYPE,
                    value.kind_name()
                ),
            )
        })?;

        Ok(self.add(Some(typed)))
    }

    pub fn merge(&mut self, other: Self) {
        for value in other.into_values() {
            if self.add(value) {
                break;
            }
        }
    }

    /// Kept values, best-first when ordered.
    #[must_use]
    pub fn into_values(self) -> Vec<Option<T>> {
        match self.ordered {
            None => self.insertion_order,
            Some((heap, direction)) => heap.into_sorted_vec(|a, b| compare_optional(a, b, direction)),
        }
    }

    #[must_use]
    pub fn into_result(self) -> Vec<Value> {
        self.into_values()
            .into_iter()
            .map(|value| value.map_or(Value::Null, DistinctValue::into_value))
            .collect()
    }
}
