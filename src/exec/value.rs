use std::fmt;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

use crate::{
    catalog::ty::ColumnType,
    error::{Error, StmtResult},
};

/// A value exchanged with a backend, either bound as a parameter or
/// extracted from a result column.
#[derive(Clone, PartialEq)]
pub enum Value {
    Null,
    Bool(bool),
    Int8(i8),
    UInt8(u8),
    Int16(i16),
    UInt16(u16),
    Int32(i32),
    UInt32(u32),
    Int64(i64),
    UInt64(u64),
    Float(f32),
    Double(f64),
    String(String),
    Blob(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    Timestamp(NaiveDateTime),
}

impl Value {
    /// Returns the corresponding column type, or `None` for [`Value::Null`].
    pub fn column_type(&self) -> Option<ColumnType> {
        let ty = match self {
            Value::Null => return None,
            Value::Bool(_) => ColumnType::Bool,
            Value::Int8(_) => ColumnType::Int8,
            Value::UInt8(_) => ColumnType::UInt8,
            Value::Int16(_) => ColumnType::Int16,
            Value::UInt16(_) => ColumnType::UInt16,
            Value::Int32(_) => ColumnType::Int32,
            Value::UInt32(_) => ColumnType::UInt32,
            Value::Int64(_) => ColumnType::Int64,
            Value::UInt64(_) => ColumnType::UInt64,
            Value::Float(_) => ColumnType::Float,
            Value::Double(_) => ColumnType::Double,
            Value::String(_) => ColumnType::String,
            Value::Blob(_) => ColumnType::Blob,
            Value::Date(_) => ColumnType::Date,
            Value::Time(_) => ColumnType::Time,
            Value::Timestamp(_) => ColumnType::Timestamp,
        };
        Some(ty)
    }

    /// Returns the canonical name of the value's type.
    pub fn type_name(&self) -> &'static str {
        self.column_type().map_or("null", ColumnType::name)
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => f.write_str("NULL"),
            Value::Bool(inner) => fmt::Display::fmt(inner, f),
            Value::Int8(inner) => fmt::Display::fmt(inner, f),
            Value::UInt8(inner) => fmt::Display::fmt(inner, f),
            Value::Int16(inner) => fmt::Display::fmt(inner, f),
            Value::UInt16(inner) => fmt::Display::fmt(inner, f),
            Value::Int32(inner) => fmt::Display::fmt(inner, f),
            Value::UInt32(inner) => fmt::Display::fmt(inner, f),
            Value::Int64(inner) => fmt::Display::fmt(inner, f),
            Value::UInt64(inner) => fmt::Display::fmt(inner, f),
            Value::Float(inner) => fmt::Display::fmt(inner, f),
            Value::Double(inner) => fmt::Display::fmt(inner, f),
            Value::String(inner) => fmt::Display::fmt(inner, f),
            Value::Blob(inner) => write!(f, "<bytes ({})>", inner.len()),
            Value::Date(inner) => fmt::Display::fmt(inner, f),
            Value::Time(inner) => fmt::Display::fmt(inner, f),
            Value::Timestamp(inner) => fmt::Display::fmt(inner, f),
        }
    }
}

impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::String(inner) => write!(f, "{inner:?}"),
            Value::Blob(_) => f.write_str("<blob>"),
            other => fmt::Display::fmt(other, f),
        }
    }
}

/// A type that may be stored from an extracted, non-null [`Value`].
pub trait FromValue: Sized {
    /// The column type this destination accepts.
    const TYPE: ColumnType;

    fn from_value(value: Value) -> StmtResult<Self>;
}

/// A type that may be bound as a parameter value.
pub trait IntoValue {
    fn into_value(self) -> Value;
}

macro_rules! value_impls {
    ($($type:ty => $variant:ident),+ $(,)?) => {
        $(
            impl FromValue for $type {
                const TYPE: ColumnType = ColumnType::$variant;

                fn from_value(value: Value) -> StmtResult<Self> {
                    match value {
                        Value::$variant(inner) => Ok(inner),
                        other => Err(Error::BadCast {
                            expected: Self::TYPE.name(),
                            found: other.type_name(),
                        }),
                    }
                }
            }

            impl IntoValue for $type {
                fn into_value(self) -> Value {
                    Value::$variant(self)
                }
            }

            impl From<$type> for Value {
                fn from(inner: $type) -> Value {
                    Value::$variant(inner)
                }
            }
        )+
    }
}

value_impls![
    bool => Bool,
    i8 => Int8,
    u8 => UInt8,
    i16 => Int16,
    u16 => UInt16,
    i32 => Int32,
    u32 => UInt32,
    i64 => Int64,
    u64 => UInt64,
    f32 => Float,
    f64 => Double,
    String => String,
    Vec<u8> => Blob,
    NaiveDate => Date,
    NaiveTime => Time,
    NaiveDateTime => Timestamp,
];

impl IntoValue for &str {
    fn into_value(self) -> Value {
        Value::String(self.to_owned())
    }
}

impl IntoValue for Value {
    fn into_value(self) -> Value {
        self
    }
}

impl<T: IntoValue> IntoValue for Option<T> {
    fn into_value(self) -> Value {
        self.map_or(Value::Null, IntoValue::into_value)
    }
}

impl From<&str> for Value {
    fn from(inner: &str) -> Value {
        Value::String(inner.to_owned())
    }
}
