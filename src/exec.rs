//! Statement execution: the engine plus the binding and extraction
//! capabilities it drives.

mod value;
pub use value::*;

mod binding;
pub use binding::*;

mod extraction;
pub use extraction::*;

mod statement;
pub use statement::*;
