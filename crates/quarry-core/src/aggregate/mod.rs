//! Module: aggregate
//! Responsibility: aggregation functions, result holders and the scalar and
//! group-by operators that drive them over blocks.
//! Does not own: group key assignment policy beyond the value-keyed generator.
//! Boundary: every function is one variant of [`AggregationFunctionVariant`]
//! behind the [`AggregationFunction`] capability trait.

mod function;
mod holder;
pub(crate) mod kernel;
mod executor;


use crate::{
    block::BlockValSet,
    error::{ErrorOrigin, InternalError},
    value::{ColumnDataType, Value},
};

// re-exports
pub use function::{CountFunction, MaxFunction, MinFunction, SumFunction, SumPrecisionFunction};
pub use holder::{
    Accumulator, AggregationResultHolder, GroupByResultHolder, GroupSlot, GroupState,
};
pub use executor::{AggregationExecutor, GroupByExecutor, GroupKeyGenerator};

///
/// AggregationFunction
///
/// Capability interface shared by every aggregate. Functions are stateless
/// strategies; all running state lives in the holders they create.
///

pub trait AggregationFunction {
    fn kind(&self) -> AggregationFunctionKind;

    /// Input column, `None` for `COUNT(*)`.
    fn input_expression(&self) -> Option<&str>;

    fn result_column_name(&self) -> String;

    fn create_aggregation_result_holder(&self) -> AggregationResultHolder;

    fn create_group_by_result_holder(
        &self,
        initial_capacity: usize,
        max_capacity: usize,
    ) -> GroupByResultHolder;

    /// Fold the first `length` positions of one block into `holder`.
    fn aggregate(
        &self,
        length: usize,
        holder: &mut AggregationResultHolder,
        input: Option<&BlockValSet>,
    ) -> Result<(), InternalError>;

    /// Fold position `i` into group `group_keys[i]`.
    fn aggregate_group_by_sv(
        &self,
        length: usize,
        group_keys: &[u32],
        holder: &mut GroupByResultHolder,
        input: Option<&BlockValSet>,
    ) -> Result<(), InternalError>;

    /// Fold position `i` into every group in `group_keys[i]`.
    fn aggregate_group_by_mv(
        &self,
        length: usize,
        group_keys: &[Vec<u32>],
        holder: &mut GroupByResultHolder,
        input: Option<&BlockValSet>,
    ) -> Result<(), InternalError>;

    fn extract_aggregation_result(&self, holder: &AggregationResultHolder) -> Value;

    fn extract_group_by_result(
        &self,
        holder: &GroupByResultHolder,
        group_key: u32,
    ) -> Result<Value, InternalError>;

    /// Combine two intermediate results from independent scans.
    fn merge(&self, left: Value, right: Value) -> Result<Value, InternalError>;

    fn intermediate_result_type(&self) -> ColumnDataType;

    fn final_result_type(&self) -> ColumnDataType;

    fn extract_final_result(&self, intermediate: Value) -> Result<Value, InternalError>;
}

///
/// AggregationFunctionKind
///

#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
pub enum AggregationFunctionKind {
    Min,
    Max,
    Sum,
    SumPrecision,
    Count,
}

impl AggregationFunctionKind {
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Min => "min",
            Self::Max => "max",
            Self::Sum => "sum",
            Self::SumPrecision => "sumprecision",
            Self::Count => "count",
        }
    }

    /// Case-insensitive lookup by declared function name.
    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        REGISTRY
            .iter()
            .map(|(kind, _)| *kind)
            .find(|kind| kind.name().eq_ignore_ascii_case(name))
    }
}

///
/// AggregationConstructor
///
/// Builds one function from its raw argument list and the null-handling flag.
///

pub type AggregationConstructor =
    fn(&[String], bool) -> Result<AggregationFunctionVariant, InternalError>;

const REGISTRY: [(AggregationFunctionKind, AggregationConstructor); 5] = [
    (AggregationFunctionKind::Min, MinFunction::construct),
    (AggregationFunctionKind::Max, MaxFunction::construct),
    (AggregationFunctionKind::Sum, SumFunction::construct),
    (
        AggregationFunctionKind::SumPrecision,
        SumPrecisionFunction::construct,
    ),
    (AggregationFunctionKind::Count, CountFunction::construct),
];

/// Build a function from its declared name and raw arguments.
pub fn create_aggregation_function(
    name: &str,
    arguments: &[String],
    null_handling_enabled: bool,
) -> Result<AggregationFunctionVariant, InternalError> {
    let constructor = REGISTRY
        .iter()
        .find(|(kind, _)| kind.name().eq_ignore_ascii_case(name))
        .map(|(_, constructor)| *constructor)
        .ok_or_else(|| {
            InternalError::invalid_argument(
                ErrorOrigin::Aggregate,
                format!("unknown aggregation function '{name}'"),
            )
        })?;

    constructor(arguments, null_handling_enabled)
}

/// Build a function from call syntax such as `sumprecision(price, 10, 2)`.
pub fn parse_aggregation_function(
    call: &str,
    null_handling_enabled: bool,
) -> Result<AggregationFunctionVariant, InternalError> {
    let malformed = || {
        InternalError::invalid_argument(
            ErrorOrigin::Aggregate,
            format!("malformed aggregation call '{call}'"),
        )
    };

    let call = call.trim();
    let open = call.find('(').ok_or_else(malformed)?;
    let inner = call[open + 1..].strip_suffix(')').ok_or_else(malformed)?;
    let arguments: Vec<String> = inner
        .split(',')
        .map(|arg| arg.trim().to_string())
        .filter(|arg| !arg.is_empty())
        .collect();

    create_aggregation_function(call[..open].trim(), &arguments, null_handling_enabled)
}

macro_rules! dispatch_function {
    ($self:expr, $f:ident => $body:expr) => {
        match $self {
            Self::Min($f) => $body,
            Self::Max($f) => $body,
            Self::Sum($f) => $body,
            Self::SumPrecision($f) => $body,
            Self::Count($f) => $body,
        }
    };
}

///
/// AggregationFunctionVariant
///
/// Closed set of supported aggregates.
///

#[derive(Clone, Debug)]
pub enum AggregationFunctionVariant {
    Min(MinFunction),
    Max(MaxFunction),
    Sum(SumFunction),
    SumPrecision(SumPrecisionFunction),
    Count(CountFunction),
}

impl AggregationFunction for AggregationFunctionVariant {
    fn kind(&self) -> AggregationFunctionKind {
        dispatch_function!(self, f => f.kind())
    }

    fn input_expression(&self) -> Option<&str> {
        dispatch_function!(self, f => f.input_expression())
    }

    fn result_column_name(&self) -> String {
        dispatch_function!(self, f => f.result_column_name())
    }

    fn create_aggregation_result_holder(&self) -> AggregationResultHolder {
        dispatch_function!(self, f => f.create_aggregation_result_holder())
    }

    fn create_group_by_result_holder(
        &self,
        initial_capacity: usize,
        max_capacity: usize,
    ) -> GroupByResultHolder {
        dispatch_function!(self, f => f.create_group_by_result_holder(initial_capacity, max_capacity))
    }

    fn aggregate(
        &self,
        length: usize,
        holder: &mut AggregationResultHolder,
        input: Option<&BlockValSet>,
    ) -> Result<(), InternalError> {
        dispatch_function!(self, f => f.aggregate(length, holder, input))
    }

    fn aggregate_group_by_sv(
        &self,
        length: usize,
        group_keys: &[u32],
        holder: &mut GroupByResultHolder,
        input: Option<&BlockValSet>,
    ) -> Result<(), InternalError> {
        dispatch_function!(self, f => f.aggregate_group_by_sv(length, group_keys, holder, input))
    }

    fn aggregate_group_by_mv(
        &self,
        length: usize,
        group_keys: &[Vec<u32>],
        holder: &mut GroupByResultHolder,
        input: Option<&BlockValSet>,
    ) -> Result<(), InternalError> {
        dispatch_function!(self, f => f.aggregate_group_by_mv(length, group_keys, holder, input))
    }

    fn extract_aggregation_result(&self, holder: &AggregationResultHolder) -> Value {
        dispatch_function!(self, f => f.extract_aggregation_result(holder))
    }

    fn extract_group_by_result(
        &self,
        holder: &GroupByResultHolder,
        group_key: u32,
    ) -> Result<Value, InternalError> {
        dispatch_function!(self, f => f.extract_group_by_result(holder, group_key))
    }

    fn merge(&self, left: Value, right: Value) -> Result<Value, InternalError> {
        dispatch_function!(self, f => f.merge(left, right))
    }

    fn intermediate_result_type(&self) -> ColumnDataType {
        dispatch_function!(self, f => f.intermediate_result_type())
    }

    fn final_result_type(&self) -> ColumnDataType {
        dispatch_function!(self, f => f.final_result_type())
    }

    fn extract_final_result(&self, intermediate: Value) -> Result<Value, InternalError> {
        dispatch_function!(self, f => f.extract_final_result(intermediate))
    }
}
