//! In-memory reference backend.
//!
//! Each `;`-separated SQL unit is served from the dataset with the same
//! index, which also describes the unit's columns. The SQL text itself is
//! never interpreted. Every execution (one per bound parameter row) replays
//! the dataset's rows from the start.

use std::{cell::RefCell, collections::HashMap, rc::Rc};

use tracing::{debug, error};

use crate::{
    backend::{BindCtx, BinderHandle, ExtractorHandle, FetchCtx, Session, StatementBackend},
    catalog::{column::ColumnDescriptor, ty::ColumnType},
    config::{EMPTY_STRING_IS_NULL, FORCE_EMPTY_STRING},
    error::{Error, StmtResult},
    exec::{Binder, Binding, Extractor, Value},
};

/// A session holding boolean features.
#[derive(Debug, Clone)]
pub struct MemorySession {
    features: HashMap<String, bool>,
}

impl MemorySession {
    /// Creates a session with both string-null features disabled.
    pub fn new() -> MemorySession {
        let features = HashMap::from([
            (EMPTY_STRING_IS_NULL.to_owned(), false),
            (FORCE_EMPTY_STRING.to_owned(), false),
        ]);
        MemorySession { features }
    }

    /// Sets a known feature.
    pub fn set_feature(&mut self, name: &str, value: bool) -> StmtResult<()> {
        let Some(slot) = self.features.get_mut(name) else {
            error!(name, "unknown session feature");
            return Err(Error::FeatureNotSupported(name.to_owned()));
        };
        *slot = value;
        Ok(())
    }
}

impl Default for MemorySession {
    fn default() -> Self {
        Self::new()
    }
}

impl Session for MemorySession {
    fn feature(&self, name: &str) -> StmtResult<bool> {
        self.features
            .get(name)
            .copied()
            .ok_or_else(|| Error::FeatureNotSupported(name.to_owned()))
    }
}

/// One result set: column descriptions, rows and the affected-row count of a
/// single execution.
#[derive(Debug, Clone, Default)]
pub struct MemoryDataSet {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<Value>>,
    affected_rows: u32,
}

impl MemoryDataSet {
    pub fn new() -> MemoryDataSet {
        MemoryDataSet::default()
    }

    /// Appends a column description.
    pub fn column(mut self, name: &str, ty: ColumnType) -> Self {
        let position = self.columns.len();
        self.columns.push(ColumnDescriptor::new(position, name, ty));
        self
    }

    /// Appends a full column description. Its position is set to the next
    /// column index.
    pub fn describe(mut self, mut column: ColumnDescriptor) -> Self {
        column.position = self.columns.len();
        self.columns.push(column);
        self
    }

    pub fn row(mut self, values: Vec<Value>) -> Self {
        self.rows.push(values);
        self
    }

    /// Sets the number of rows each execution reports as affected.
    pub fn affected(mut self, rows: u32) -> Self {
        self.affected_rows = rows;
        self
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }
}

/// Collects the parameters of the row being bound.
#[derive(Debug, Default)]
pub struct MemoryBinder {
    current: Vec<Value>,
}

impl Binder for MemoryBinder {
    fn bind(&mut self, pos: usize, value: &Value) -> StmtResult<()> {
        if pos >= self.current.len() {
            self.current.resize(pos + 1, Value::Null);
        }
        self.current[pos] = value.clone();
        Ok(())
    }
}

/// Serves the columns of the row being fetched.
#[derive(Debug, Default)]
pub struct MemoryExtractor {
    row: Vec<Value>,
}

impl Extractor for MemoryExtractor {
    fn extract(&mut self, pos: usize) -> StmtResult<Value> {
        self.row.get(pos).cloned().ok_or_else(|| {
            error!(pos, columns = self.row.len(), "column position out of range");
            Error::Backend(format!("no column at position {pos}").into())
        })
    }
}

/// The in-memory statement backend.
#[derive(Debug)]
pub struct MemoryBackend {
    datasets: Vec<MemoryDataSet>,
    stored_procedure: bool,
    compiled_sql: Option<String>,
    fragments: Vec<String>,
    fragment: usize,
    cursor: usize,
    executed: bool,
    executions: u32,
    compile_count: usize,
    bound: Vec<Vec<Value>>,
    binder: Rc<RefCell<MemoryBinder>>,
    extractor: Rc<RefCell<MemoryExtractor>>,
}

impl MemoryBackend {
    pub fn new(datasets: Vec<MemoryDataSet>) -> MemoryBackend {
        MemoryBackend {
            datasets,
            stored_procedure: false,
            compiled_sql: None,
            fragments: Vec::new(),
            fragment: 0,
            cursor: 0,
            executed: false,
            executions: 0,
            compile_count: 0,
            bound: Vec::new(),
            binder: Rc::default(),
            extractor: Rc::default(),
        }
    }

    /// Marks the statement as a stored procedure call.
    pub fn stored_procedure(mut self) -> Self {
        self.stored_procedure = true;
        self
    }

    /// Parameter rows received so far, one per execution.
    pub fn bound_rows(&self) -> &[Vec<Value>] {
        &self.bound
    }

    /// Number of `compile_impl` calls.
    pub fn compile_count(&self) -> usize {
        self.compile_count
    }

    /// The SQL unit compiled last.
    pub fn compiled_fragment(&self) -> Option<&str> {
        self.fragments.get(self.fragment).map(String::as_str)
    }

    fn current_rows(&self) -> &[Vec<Value>] {
        self.datasets
            .get(self.fragment)
            .map(|dataset| dataset.rows.as_slice())
            .unwrap_or_default()
    }

    /// Binds one parameter row and records it.
    fn bind_row(&mut self, bindings: &mut [Box<dyn Binding>]) -> StmtResult<()> {
        let mut pos = 0;
        for binding in bindings.iter_mut() {
            if binding.can_bind() {
                binding.bind(pos)?;
            }
            pos += binding.columns_handled();
        }
        let row = std::mem::take(&mut self.binder.borrow_mut().current);
        self.bound.push(row);
        self.executions += 1;
        Ok(())
    }
}

impl StatementBackend for MemoryBackend {
    fn compile_impl(&mut self, sql: &str) -> StmtResult<()> {
        self.compile_count += 1;
        if self.compiled_sql.as_deref() != Some(sql) {
            self.fragments = sql
                .split(';')
                .map(str::trim)
                .filter(|fragment| !fragment.is_empty())
                .map(ToOwned::to_owned)
                .collect();
            if self.fragments.is_empty() {
                self.fragments.push(String::new());
            }
            self.compiled_sql = Some(sql.to_owned());
            self.fragment = 0;
        } else if self.fragment + 1 < self.fragments.len() {
            self.fragment += 1;
        } else {
            // Everything compiled: start over.
            self.fragment = 0;
        }
        self.cursor = 0;
        self.executed = false;
        self.executions = 0;
        debug!(fragment = self.fragment, "compiled");
        Ok(())
    }

    fn reset_impl(&mut self) {
        self.compiled_sql = None;
    }

    fn bind_impl(&mut self, ctx: BindCtx<'_>) -> StmtResult<()> {
        let BindCtx { bindings, bulk } = ctx;
        if bindings.is_empty() {
            self.executions += 1;
        } else if bulk.is_bulk() {
            while bindings[0].can_bind() {
                self.bind_row(bindings)?;
            }
        } else {
            self.bind_row(bindings)?;
        }
        self.cursor = 0;
        self.executed = true;
        Ok(())
    }

    fn has_next(&mut self) -> StmtResult<bool> {
        Ok(self.executed && self.cursor < self.current_rows().len())
    }

    // Rows come from the compiled unit. The engine moves to the matching
    // dataset when it compiles the next unit.
    fn next(&mut self, ctx: FetchCtx<'_>) -> StmtResult<u32> {
        let FetchCtx {
            extractions, bulk, ..
        } = ctx;
        let batch = if bulk.is_bulk() {
            extractions
                .first()
                .map_or(1, |extraction| extraction.limit().max(1))
        } else {
            1
        };

        let mut rows = 0;
        while rows < batch {
            let Some(row) = self.current_rows().get(self.cursor).cloned() else {
                break;
            };
            self.extractor.borrow_mut().row = row;

            let mut pos = 0;
            for extraction in extractions.iter_mut() {
                extraction.extract(pos)?;
                pos += extraction.columns_handled();
            }
            self.cursor += 1;
            rows += 1;
        }
        Ok(rows)
    }

    fn can_bind(&self, bindings: &[Box<dyn Binding>]) -> bool {
        bindings.first().is_some_and(|binding| binding.can_bind())
    }

    fn can_compile(&self) -> bool {
        self.compiled_sql.is_some() && self.fragment + 1 < self.fragments.len()
    }

    fn columns_returned(&self, dataset: usize) -> usize {
        self.datasets
            .get(dataset)
            .map_or(0, |dataset| dataset.columns.len())
    }

    fn meta_column(&self, dataset: usize, pos: usize) -> StmtResult<&ColumnDescriptor> {
        self.datasets
            .get(dataset)
            .and_then(|dataset| dataset.columns.get(pos))
            .ok_or_else(|| {
                Error::Backend(format!("no column at position {pos} of data set {dataset}").into())
            })
    }

    fn dataset_count(&self) -> usize {
        self.datasets.len()
    }

    fn is_stored_procedure(&self) -> bool {
        self.stored_procedure
    }

    fn affected_row_count(&self) -> u32 {
        self.datasets
            .get(self.fragment)
            .map_or(0, |dataset| dataset.affected_rows * self.executions)
    }

    fn binder(&mut self) -> BinderHandle {
        self.binder.clone()
    }

    fn extractor(&mut self) -> ExtractorHandle {
        self.extractor.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_walks_sql_units() {
        let mut backend = MemoryBackend::new(vec![MemoryDataSet::new(), MemoryDataSet::new()]);
        backend.compile_impl("SELECT 1; SELECT 2;").unwrap();
        assert_eq!(backend.compiled_fragment(), Some("SELECT 1"));
        assert!(backend.can_compile());

        backend.compile_impl("SELECT 1; SELECT 2;").unwrap();
        assert_eq!(backend.compiled_fragment(), Some("SELECT 2"));
        assert!(!backend.can_compile());

        // Starts over once every unit was compiled.
        backend.compile_impl("SELECT 1; SELECT 2;").unwrap();
        assert_eq!(backend.compiled_fragment(), Some("SELECT 1"));
        assert_eq!(backend.compile_count(), 3);
    }

    #[test]
    fn test_reset_restarts_at_first_unit() {
        let mut backend = MemoryBackend::new(vec![MemoryDataSet::new(), MemoryDataSet::new()]);
        backend.compile_impl("SELECT 1; SELECT 2").unwrap();
        backend.reset_impl();
        assert!(!backend.can_compile());

        backend.compile_impl("SELECT 1; SELECT 2").unwrap();
        assert_eq!(backend.compiled_fragment(), Some("SELECT 1"));
        assert!(backend.can_compile());
    }

    #[test]
    fn test_extractor_out_of_range() {
        let mut extractor = MemoryExtractor {
            row: vec![Value::Int32(1)],
        };
        assert_eq!(extractor.extract(0).unwrap(), Value::Int32(1));
        assert!(matches!(extractor.extract(1), Err(Error::Backend(_))));
    }

    #[test]
    fn test_session_features() {
        let mut session = MemorySession::new();
        assert!(!session.feature(EMPTY_STRING_IS_NULL).unwrap());
        session.set_feature(EMPTY_STRING_IS_NULL, true).unwrap();
        assert!(session.feature(EMPTY_STRING_IS_NULL).unwrap());
        assert!(matches!(
            session.feature("bulk"),
            Err(Error::FeatureNotSupported(_))
        ));
    }
}
