use std::{borrow::Cow, fmt};

use crate::catalog::ty::ColumnType;

pub type StmtResult<T, E = Error> = Result<T, E>;

#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// The lower limit is greater than the upper extraction limit.
    #[error("illegal statement state: upper limit ({upper}) must not be smaller than the lower limit ({lower})")]
    LimitViolation { lower: u32, upper: u32 },

    /// The execution produced fewer rows than the lower limit requires.
    #[error("did not receive enough data: expected at least {expected} rows, but got {actual}")]
    InsufficientData { expected: u32, actual: u32 },

    /// More rows are available than the hard limit permits.
    #[error("hard limit of {limit} rows reached (retrieved more data than requested)")]
    HardLimitExceeded { limit: u32 },

    /// Inconsistent statement configuration.
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(Cow<'static, str>),

    /// No default extraction exists for the column's declared type.
    #[error("data type `{ty}` of column `{column}` not supported")]
    UnsupportedType { column: String, ty: ColumnType },

    #[error("invalid column name: {0}")]
    ColumnNotFound(String),

    #[error("no binding named `{0}`")]
    BindingNotFound(String),

    /// Dataset cursor moved past one of its boundaries.
    #[error("{0} of data sets reached")]
    NoMoreDataSets(Direction),

    /// The session doesn't know the requested feature.
    #[error("feature `{0}` not supported by the session")]
    FeatureNotSupported(String),

    /// An extracted value couldn't be stored in the destination type.
    #[error("bad cast: expected `{expected}`, but found `{found}`")]
    BadCast {
        expected: &'static str,
        found: &'static str,
    },

    /// A backend primitive failed.
    #[error("backend error: {0}")]
    Backend(Cow<'static, str>),
}

/// Dataset navigation direction, used to report which boundary was hit.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Direction {
    Next,
    Previous,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Next => f.write_str("end"),
            Direction::Previous => f.write_str("beginning"),
        }
    }
}
