use std::fmt;

/// A positional formatting argument.
#[derive(Clone, Debug, PartialEq)]
pub enum Arg {
    Bool(bool),
    Char(char),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
}

impl Arg {
    /// Returns the argument kind name, used in diagnostics.
    pub fn kind(&self) -> &'static str {
        match self {
            Arg::Bool(_) => "bool",
            Arg::Char(_) => "char",
            Arg::Int(_) => "int",
            Arg::UInt(_) => "uint",
            Arg::Float(_) => "float",
            Arg::Str(_) => "string",
        }
    }
}

impl fmt::Display for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Bool(inner) => fmt::Display::fmt(inner, f),
            Arg::Char(inner) => fmt::Display::fmt(inner, f),
            Arg::Int(inner) => fmt::Display::fmt(inner, f),
            Arg::UInt(inner) => fmt::Display::fmt(inner, f),
            Arg::Float(inner) => fmt::Display::fmt(inner, f),
            Arg::Str(inner) => fmt::Display::fmt(inner, f),
        }
    }
}

macro_rules! from_impls {
    ($variant:ident as $target:ty: $($type:ty),+) => {
        $(
            impl From<$type> for Arg {
                fn from(inner: $type) -> Arg {
                    Arg::$variant(<$target>::from(inner))
                }
            }
        )+
    }
}

from_impls!(Int as i64: i8, i16, i32, i64);
from_impls!(UInt as u64: u8, u16, u32, u64);
from_impls!(Float as f64: f32, f64);
from_impls!(Str as String: &str, String);

impl From<bool> for Arg {
    fn from(inner: bool) -> Arg {
        Arg::Bool(inner)
    }
}

impl From<char> for Arg {
    fn from(inner: char) -> Arg {
        Arg::Char(inner)
    }
}

impl From<usize> for Arg {
    fn from(inner: usize) -> Arg {
        Arg::UInt(inner as u64)
    }
}
