//! The contract between the statement engine and a concrete database backend.
//!
//! The engine never talks to a database itself. It drives a
//! [`StatementBackend`] through a handful of primitives (compile, bind, fetch,
//! metadata) and attaches the backend's [`Binder`] and [`Extractor`] adapters
//! to the registered bindings and extractions during fixup.

use std::{cell::RefCell, rc::Rc};

use crate::{
    catalog::column::ColumnDescriptor,
    error::StmtResult,
    exec::{Binder, Binding, Extraction, Extractor},
    limit::BulkMode,
};

pub mod memory;

/// Shared handle to a backend binder.
pub type BinderHandle = Rc<RefCell<dyn Binder>>;

/// Shared handle to a backend extractor.
pub type ExtractorHandle = Rc<RefCell<dyn Extractor>>;

/// A backend session. A statement references its session for its whole
/// lifetime; the session must outlive every statement created on it.
pub trait Session {
    /// Returns the value of a boolean session feature.
    ///
    /// Fails with [`Error::FeatureNotSupported`](crate::error::Error) for
    /// unknown feature names.
    fn feature(&self, name: &str) -> StmtResult<bool>;
}

/// Bind call context.
pub struct BindCtx<'a> {
    /// The statement's bindings, in positional order.
    pub bindings: &'a mut [Box<dyn Binding>],
    pub bulk: BulkMode,
}

/// Row fetch call context.
pub struct FetchCtx<'a> {
    /// The extractions of the active dataset.
    pub extractions: &'a mut [Box<dyn Extraction>],
    /// The active dataset index.
    pub dataset: usize,
    pub bulk: BulkMode,
}

/// Backend-specific statement primitives.
///
/// Every method is a direct, blocking call. `compile_impl` and `bind_impl`
/// must be idempotent from the engine's point of view.
pub trait StatementBackend {
    /// Compiles the next SQL unit of `sql`.
    fn compile_impl(&mut self, sql: &str) -> StmtResult<()>;

    /// Forgets compilation progress so the next `compile_impl` starts from
    /// the first SQL unit.
    fn reset_impl(&mut self) {}

    /// Transmits the next batch of parameters and executes.
    fn bind_impl(&mut self, ctx: BindCtx<'_>) -> StmtResult<()>;

    /// Whether more rows can be extracted.
    fn has_next(&mut self) -> StmtResult<bool>;

    /// Extracts the next row group, returning the number of rows consumed.
    fn next(&mut self, ctx: FetchCtx<'_>) -> StmtResult<u32>;

    /// Whether another parameter batch can be bound.
    fn can_bind(&self, bindings: &[Box<dyn Binding>]) -> bool;

    /// Whether more SQL units remain to be compiled. The engine compiles
    /// them in order, one per exhausted unit.
    fn can_compile(&self) -> bool;

    /// Number of columns returned by the given dataset.
    fn columns_returned(&self, dataset: usize) -> usize;

    /// Column metadata at position `pos` of the given dataset.
    fn meta_column(&self, dataset: usize, pos: usize) -> StmtResult<&ColumnDescriptor>;

    fn dataset_count(&self) -> usize;

    fn is_stored_procedure(&self) -> bool {
        false
    }

    /// Rows affected by the last execution, for non-row-returning statements.
    fn affected_row_count(&self) -> u32;

    fn binder(&mut self) -> BinderHandle;

    fn extractor(&mut self) -> ExtractorHandle;
}
