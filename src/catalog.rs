//! Result column metadata, as reported by a backend.

pub mod column;
pub mod ty;
