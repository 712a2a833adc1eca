//! Backend-independent SQL statement execution.
//!
//! [`Statement`] drives a single SQL statement through compilation,
//! parameter binding, limited (paged) row extraction and multi-dataset
//! navigation. Everything database-specific lives behind the
//! [`backend::StatementBackend`] and [`backend::Session`] traits.

pub mod error;

pub mod catalog;
pub mod config;
pub mod limit;

pub mod backend;
pub mod exec;

pub use exec::{State, Statement};
pub use sqlfmt::Arg;
