//! Core query runtime for Quarry: block fetching, aggregation, distinct,
//! selection and the server/broker merge path, with NULLS LAST ordering
//! throughout.
#![warn(unreachable_pub)]

// public exports are one module level down
pub mod aggregate;
pub mod block;
pub mod config;
pub mod direction;
pub mod distinct;
pub mod error;
pub mod obs;
pub mod query;
pub mod result;
pub mod selection;
pub mod serialize;
pub mod value;

///
/// CONSTANTS
///

/// Upper bound on the capacity a row holder pre-allocates, whatever the
/// requested row count.
pub const MAX_ROW_HOLDER_INITIAL_CAPACITY: usize = 10_000;

///
/// Prelude
///
/// Query vocabulary only. Operators, executors and serializers stay in their
/// modules.
///

pub mod prelude {
    pub use crate::{
        aggregate::{AggregationFunction, AggregationFunctionKind, AggregationFunctionVariant},
        block::{ColumnValues, MemorySegment, SegmentSource},
        config::QueryOptions,
        direction::Direction,
        query::{QueryContext, QueryKind},
        selection::OrderByExpression,
        value::{ColumnDataType, FieldKind, Row, Value},
    };
}
