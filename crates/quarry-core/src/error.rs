use quarry_primitives::StoredType;
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error as ThisError;

///
/// InternalError
///
/// Structured runtime error with a stable internal classification.
/// Segment-local failures are captured into a [`ProcessingException`] at the
/// combine boundary instead of crossing it as an error.
///

#[derive(Clone, Debug, ThisError)]
#[error("{message}")]
pub struct InternalError {
    pub class: ErrorClass,
    pub origin: ErrorOrigin,
    pub message: String,
}

impl InternalError {
    pub fn new(class: ErrorClass, origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self {
            class,
            origin,
            message: message.into(),
        }
    }

    /// Construct an unsupported-type error for a stored type with no kernel.
    pub(crate) fn unsupported_type(
        origin: ErrorOrigin,
        operation: &str,
        stored_type: StoredType,
        single_value: bool,
    ) -> Self {
        let valued = if single_value {
            "single-value"
        } else {
            "multi-value"
        };

        Self::new(
            ErrorClass::Unsupported,
            origin,
            format!("unsupported {valued} stored type {stored_type} for {operation}"),
        )
    }

    /// Construct an unsupported error with a free-form message.
    pub(crate) fn unsupported(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Unsupported, origin, message)
    }

    /// Construct an invalid-argument error raised before any scanning.
    pub(crate) fn invalid_argument(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvalidArgument, origin, message)
    }

    /// Construct an internal-state error for contract violations.
    pub(crate) fn internal_state(origin: ErrorOrigin, message: impl Into<String>) -> Self {
        Self::new(ErrorClass::InvariantViolation, origin, message)
    }

    /// Construct a serialize-origin corruption error.
    pub(crate) fn serialize_corruption(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Corruption, ErrorOrigin::Serialize, message)
    }

    /// Construct a serialize-origin internal error.
    pub(crate) fn serialize_internal(message: impl Into<String>) -> Self {
        Self::new(ErrorClass::Internal, ErrorOrigin::Serialize, message)
    }

    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self.class, ErrorClass::Unsupported)
    }

    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self.class, ErrorClass::InvalidArgument)
    }

    #[must_use]
    pub const fn is_internal_state(&self) -> bool {
        matches!(self.class, ErrorClass::InvariantViolation)
    }

    #[must_use]
    pub fn display_with_class(&self) -> String {
        format!("{}:{}: {}", self.origin, self.class, self.message)
    }

    /// Capture this error as a query-execution processing exception.
    #[must_use]
    pub fn into_processing_exception(self) -> ProcessingException {
        ProcessingException::new(QueryErrorCode::QueryExecution, self.display_with_class())
    }
}

///
/// ErrorClass
/// Internal error taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorClass {
    Unsupported,
    InvalidArgument,
    InvariantViolation,
    Internal,
    Corruption,
}

impl fmt::Display for ErrorClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Unsupported => "unsupported",
            Self::InvalidArgument => "invalid_argument",
            Self::InvariantViolation => "invariant_violation",
            Self::Internal => "internal",
            Self::Corruption => "corruption",
        };
        write!(f, "{label}")
    }
}

///
/// ErrorOrigin
/// Internal origin taxonomy for runtime classification.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum ErrorOrigin {
    Config,
    Fetch,
    Aggregate,
    Distinct,
    Selection,
    Merge,
    Render,
    Serialize,
}

impl fmt::Display for ErrorOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Config => "config",
            Self::Fetch => "fetch",
            Self::Aggregate => "aggregate",
            Self::Distinct => "distinct",
            Self::Selection => "selection",
            Self::Merge => "merge",
            Self::Render => "render",
            Self::Serialize => "serialize",
        };
        write!(f, "{label}")
    }
}

///
/// QueryErrorCode
///
/// Numeric error codes carried by processing exceptions on the wire.
///

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub enum QueryErrorCode {
    QueryExecution,
    ServerSegmentMissing,
    MergeResponse,
    Unknown,
}

impl QueryErrorCode {
    #[must_use]
    pub const fn code(self) -> u32 {
        match self {
            Self::QueryExecution => 200,
            Self::ServerSegmentMissing => 235,
            Self::MergeResponse => 500,
            Self::Unknown => 1000,
        }
    }

    #[must_use]
    pub const fn from_code(code: u32) -> Self {
        match code {
            200 => Self::QueryExecution,
            235 => Self::ServerSegmentMissing,
            500 => Self::MergeResponse,
            _ => Self::Unknown,
        }
    }
}

///
/// ProcessingException
///
/// One failure captured into a partial result instead of aborting the query.
///

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ProcessingException {
    pub error_code: u32,
    pub message: String,
}

impl ProcessingException {
    pub fn new(code: QueryErrorCode, message: impl Into<String>) -> Self {
        Self {
            error_code: code.code(),
            message: message.into(),
        }
    }

    #[must_use]
    pub const fn code(&self) -> QueryErrorCode {
        QueryErrorCode::from_code(self.error_code)
    }
}

impl fmt::Display for ProcessingException {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.error_code, self.message)
    }
}
