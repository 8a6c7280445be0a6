//! Error types for the bind/define marshaling core.

use std::panic::Location;
use thiserror::Error;

/// Result type alias for marshaling operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for bind, define and LOB transfer operations.
#[derive(Error, Debug)]
pub enum Error {
    /// No registry rule exists for this Oracle type number.
    #[error("Unsupported Oracle data type: {type_num}")]
    UnsupportedType { type_num: u8 },

    /// Host value cannot be converted to the parameter's kind.
    #[error("Type mismatch for parameter {param} row {row}: cannot bind {actual} as {expected}")]
    TypeMismatch {
        param: usize,
        row: usize,
        expected: String,
        actual: &'static str,
    },

    /// Encoded value exceeds the maximum length of a non-streamed kind.
    #[error("Value too large for parameter {param} row {row}: {len} bytes (max {max})")]
    ValueTooLarge {
        param: usize,
        row: usize,
        len: usize,
        max: u64,
    },

    /// Parameters (or engine outcomes) disagree on the number of rows.
    #[error("Batch size mismatch: expected {expected} rows, got {actual}")]
    BatchSizeMismatch { expected: usize, actual: usize },

    /// Destination shape does not match the described columns.
    #[error("Scan mismatch: {expected} columns described, {actual} destinations")]
    ScanMismatch { expected: usize, actual: usize },

    /// Engine returned fewer bytes than the kind's minimum wire size.
    #[error("Truncated read in column {column}: got {got} bytes, need at least {min}")]
    TruncatedRead {
        column: String,
        got: usize,
        min: usize,
    },

    /// Numeric value does not fit the requested native representation.
    #[error("Numeric overflow: {value} does not fit {target}")]
    NumericOverflow { value: String, target: &'static str },

    /// At least one row of a batch execution failed.
    #[error("Batch execution failed at row {row}: {source}")]
    BatchPartialFailure {
        row: usize,
        #[source]
        source: Box<Error>,
    },

    /// A chunked transfer observed cancellation or its deadline.
    #[error("Operation cancelled during {operation}{}", timeout_suffix(.timed_out))]
    OperationCancelled {
        operation: &'static str,
        timed_out: bool,
    },

    /// Oracle database error reported by the engine.
    #[error("ORA-{code:05}: {message}")]
    Oracle { code: u32, message: String },

    /// Wire bytes that do not form a valid value of their kind.
    #[error("Malformed value: {message}")]
    MalformedValue { message: String },

    /// Engine wrote past a define buffer.
    #[error("Buffer too small: need {needed} bytes, have {available} at {location}")]
    BufferTooSmall {
        needed: usize,
        available: usize,
        location: &'static Location<'static>,
    },

    /// Rejected configuration value.
    #[error("Invalid configuration: {message}")]
    InvalidConfig { message: String },

    /// A query was expected but the statement produced no result set.
    #[error("Statement did not produce a result set")]
    NoResultSet,

    /// Column not found.
    #[error("Column not found: {name}")]
    ColumnNotFound { name: String },
}

fn timeout_suffix(timed_out: &bool) -> &'static str {
    if *timed_out {
        " (timed out)"
    } else {
        ""
    }
}

impl Error {
    /// Create a malformed-value error.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::MalformedValue {
            message: message.into(),
        }
    }

    /// Create an Oracle database error.
    pub fn oracle(code: u32, message: impl Into<String>) -> Self {
        Self::Oracle {
            code,
            message: message.into(),
        }
    }

    /// Create a configuration error.
    pub fn invalid_config(message: impl Into<String>) -> Self {
        Self::InvalidConfig {
            message: message.into(),
        }
    }

    /// Create a buffer overflow error pointing at the caller.
    #[track_caller]
    pub fn buffer_too_small(needed: usize, available: usize) -> Self {
        Self::BufferTooSmall {
            needed,
            available,
            location: Location::caller(),
        }
    }

    /// Attach a parameter/row position to bind-side errors.
    ///
    /// Codecs raise `TypeMismatch` and `ValueTooLarge` without knowing where
    /// the value came from; the encoder fills the position in.
    pub(crate) fn at(self, param: usize, row: usize) -> Self {
        match self {
            Self::TypeMismatch {
                expected, actual, ..
            } => Self::TypeMismatch {
                param,
                row,
                expected,
                actual,
            },
            Self::ValueTooLarge { len, max, .. } => Self::ValueTooLarge {
                param,
                row,
                len,
                max,
            },
            other => other,
        }
    }

    /// Whether re-opening the result set in arbitrary-precision mode can
    /// succeed where this error occurred.
    pub fn is_numeric_overflow(&self) -> bool {
        matches!(self, Self::NumericOverflow { .. })
    }

    /// Whether this error came from cancellation or a chunk deadline.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::OperationCancelled { .. })
    }
}
