use crate::{
    direction::Direction,
    error::{ErrorOrigin, InternalError},
    value::{Value, compare_nulls_last},
};
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

static NULL_VALUE: Value = Value::Null;

///
/// OrderByExpression
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct OrderByExpression {
    pub expression: String,
    pub direction: Direction,
}

impl OrderByExpression {
    pub fn new(expression: impl Into<String>, direction: Direction) -> Self {
        Self {
            expression: expression.into(),
            direction,
        }
    }

    pub fn asc(expression: impl Into<String>) -> Self {
        Self::new(expression, Direction::Asc)
    }

    pub fn desc(expression: impl Into<String>) -> Self {
        Self::new(expression, Direction::Desc)
    }
}

///
/// OrderByComparator
///
/// Row comparator over `(column index, direction)` keys, evaluated left to
/// right. A null cell sorts after any non-null cell in either direction; two
/// nulls tie and fall through to the next key.
///

#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct OrderByComparator {
    keys: Vec<(usize, Direction)>,
}

impl OrderByComparator {
    #[must_use]
    pub const fn new(keys: Vec<(usize, Direction)>) -> Self {
        Self { keys }
    }

    /// Keys over the leading columns, one per direction.
    #[must_use]
    pub fn leading(directions: impl IntoIterator<Item = Direction>) -> Self {
        Self::new(directions.into_iter().enumerate().collect())
    }

    #[must_use]
    pub fn keys(&self) -> &[(usize, Direction)] {
        &self.keys
    }

    #[must_use]
    pub fn compare(&self, left: &[Value], right: &[Value]) -> Ordering {
        for &(index, direction) in &self.keys {
            let l = left.get(index).unwrap_or(&NULL_VALUE);
            let r = right.get(index).unwrap_or(&NULL_VALUE);
            let ordering = compare_nulls_last(l, r, direction);
            if ordering != Ordering::Equal {
                return ordering;
            }
        }

        Ordering::Equal
    }

    /// Reject rows whose compared cells are multi-valued.
    pub fn validate_row(&self, row: &[Value]) -> Result<(), InternalError> {
        for &(index, _) in &self.keys {
            if let Some(cell) = row.get(index)
                && cell.is_multi_value()
            {
                return Err(InternalError::internal_state(
                    ErrorOrigin::Selection,
                    format!(
                        "order-by column {index} holds a multi-value {} cell",
                        cell.kind_name()
                    ),
                ));
            }
        }

        Ok(())
    }
}
