use std::{
    cell::RefCell,
    collections::{LinkedList, VecDeque},
    fmt,
    rc::Rc,
    str::FromStr,
};

use tracing::error;

use crate::{
    backend::ExtractorHandle,
    catalog::{column::ColumnDescriptor, ty::ColumnType},
    config::{LIMIT_UNLIMITED, STORAGE_DEQUE, STORAGE_LIST, STORAGE_UNKNOWN, STORAGE_VECTOR},
    error::{Error, StmtResult},
    exec::value::{FromValue, IntoValue, Value},
};

/// Backend adapter that reads one column of the current row.
pub trait Extractor {
    /// Extracts the value at column position `pos`. SQL nulls are returned as
    /// [`Value::Null`].
    fn extract(&mut self, pos: usize) -> StmtResult<Value>;
}

/// A registered result handler.
///
/// An extraction copies one or more result columns into a destination
/// container and tracks how many rows it received. It is registered at one
/// dataset position and never moves.
pub trait Extraction {
    /// The dataset this extraction belongs to.
    fn position(&self) -> usize;

    /// Number of result columns this extraction consumes per row.
    fn columns_handled(&self) -> usize;

    /// Number of rows extracted since the last reset.
    fn rows_handled(&self) -> usize;

    /// The extraction limit attached during fixup.
    fn limit(&self) -> u32;

    fn set_limit(&mut self, limit: u32);

    /// Attaches the backend extractor. Called on every compile.
    fn set_extractor(&mut self, extractor: ExtractorHandle);

    fn extractor(&self) -> Option<&ExtractorHandle>;

    fn set_empty_string_is_null(&mut self, flag: bool);

    fn set_force_empty_string(&mut self, flag: bool);

    /// Extracts the current row, reading columns starting at `pos`.
    ///
    /// Returns the number of rows extracted.
    fn extract(&mut self, pos: usize) -> StmtResult<usize>;

    /// Clears the destination container.
    fn reset(&mut self);

    /// Returns the generic value at the given row, [`Value::Null`] for nulls.
    fn value(&self, row: usize) -> Option<Value>;

    /// Column metadata, for extractions generated from a result description.
    fn column(&self) -> Option<&ColumnDescriptor> {
        None
    }
}

/// Storage mode, i.e., the container shape of generated extractions.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum Storage {
    #[default]
    Unknown,
    Vector,
    List,
    Deque,
}

impl FromStr for Storage {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        const NAMES: [(&str, Storage); 4] = [
            (STORAGE_DEQUE, Storage::Deque),
            (STORAGE_VECTOR, Storage::Vector),
            (STORAGE_LIST, Storage::List),
            (STORAGE_UNKNOWN, Storage::Unknown),
        ];
        NAMES
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(s))
            .map(|&(_, storage)| storage)
            .ok_or_else(|| {
                error!(storage = s, "invalid storage mode");
                Error::InvalidConfiguration(format!("unknown storage mode `{s}`").into())
            })
    }
}

impl fmt::Display for Storage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Storage::Unknown => STORAGE_UNKNOWN,
            Storage::Vector => STORAGE_VECTOR,
            Storage::List => STORAGE_LIST,
            Storage::Deque => STORAGE_DEQUE,
        })
    }
}

/// An extraction destination of one of the supported container shapes.
#[derive(Debug, Clone, PartialEq)]
pub enum Rows<T> {
    Vector(Vec<T>),
    List(LinkedList<T>),
    Deque(VecDeque<T>),
}

impl<T> Rows<T> {
    /// Creates an empty container for the given storage mode. The unknown
    /// storage mode uses a vector.
    pub fn with_storage(storage: Storage) -> Rows<T> {
        match storage {
            Storage::Unknown | Storage::Vector => Rows::Vector(Vec::new()),
            Storage::List => Rows::List(LinkedList::new()),
            Storage::Deque => Rows::Deque(VecDeque::new()),
        }
    }

    pub fn storage(&self) -> Storage {
        match self {
            Rows::Vector(_) => Storage::Vector,
            Rows::List(_) => Storage::List,
            Rows::Deque(_) => Storage::Deque,
        }
    }

    pub fn push(&mut self, item: T) {
        match self {
            Rows::Vector(inner) => inner.push(item),
            Rows::List(inner) => inner.push_back(item),
            Rows::Deque(inner) => inner.push_back(item),
        }
    }

    pub fn get(&self, index: usize) -> Option<&T> {
        match self {
            Rows::Vector(inner) => inner.get(index),
            Rows::List(inner) => inner.iter().nth(index),
            Rows::Deque(inner) => inner.get(index),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Rows::Vector(inner) => inner.len(),
            Rows::List(inner) => inner.len(),
            Rows::Deque(inner) => inner.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn clear(&mut self) {
        match self {
            Rows::Vector(inner) => inner.clear(),
            Rows::List(inner) => inner.clear(),
            Rows::Deque(inner) => inner.clear(),
        }
    }

    pub fn to_vec(&self) -> Vec<T>
    where
        T: Clone,
    {
        match self {
            Rows::Vector(inner) => inner.clone(),
            Rows::List(inner) => inner.iter().cloned().collect(),
            Rows::Deque(inner) => inner.iter().cloned().collect(),
        }
    }
}

/// Shared handle to an extraction's destination, kept by the caller to read
/// the rows after execution.
pub type Sink<T> = Rc<RefCell<Rows<Option<T>>>>;

/// Default single-column extraction into a container of `Option<T>`.
pub struct Extract<T> {
    rows: Sink<T>,
    position: usize,
    limit: u32,
    extractor: Option<ExtractorHandle>,
    empty_string_is_null: bool,
    force_empty_string: bool,
    column: Option<ColumnDescriptor>,
}

impl<T: FromValue + IntoValue + Clone> Extract<T> {
    /// Creates an extraction into a new vector, for the first dataset.
    pub fn new() -> Extract<T> {
        Extract::with_sink(Rc::new(RefCell::new(Rows::Vector(Vec::new()))))
    }

    /// Creates an extraction into a caller-provided destination.
    pub fn with_sink(rows: Sink<T>) -> Extract<T> {
        Extract {
            rows,
            position: 0,
            limit: LIMIT_UNLIMITED,
            extractor: None,
            empty_string_is_null: false,
            force_empty_string: false,
            column: None,
        }
    }

    /// Creates an extraction generated from a result column description.
    pub fn internal(column: ColumnDescriptor, storage: Storage) -> Extract<T> {
        let mut extract = Extract::with_sink(Rc::new(RefCell::new(Rows::with_storage(storage))));
        extract.column = Some(column);
        extract
    }

    /// Moves this extraction to the given dataset position.
    pub fn at(mut self, position: usize) -> Self {
        self.position = position;
        self
    }

    /// Returns a handle to the destination container.
    pub fn sink(&self) -> Sink<T> {
        Rc::clone(&self.rows)
    }

    /// Applies the session's string-null handling to an extracted value.
    fn normalize(&self, value: Value) -> Value {
        if T::TYPE != ColumnType::String {
            return value;
        }
        match value {
            Value::String(s) if s.is_empty() && self.empty_string_is_null => Value::Null,
            Value::Null if self.force_empty_string => Value::String(String::new()),
            other => other,
        }
    }
}

impl<T: FromValue + IntoValue + Clone> Default for Extract<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: FromValue + IntoValue + Clone> Extraction for Extract<T> {
    fn position(&self) -> usize {
        self.position
    }

    fn columns_handled(&self) -> usize {
        1
    }

    fn rows_handled(&self) -> usize {
        self.rows.borrow().len()
    }

    fn limit(&self) -> u32 {
        self.limit
    }

    fn set_limit(&mut self, limit: u32) {
        self.limit = limit;
    }

    fn set_extractor(&mut self, extractor: ExtractorHandle) {
        self.extractor = Some(extractor);
    }

    fn extractor(&self) -> Option<&ExtractorHandle> {
        self.extractor.as_ref()
    }

    fn set_empty_string_is_null(&mut self, flag: bool) {
        self.empty_string_is_null = flag;
    }

    fn set_force_empty_string(&mut self, flag: bool) {
        self.force_empty_string = flag;
    }

    fn extract(&mut self, pos: usize) -> StmtResult<usize> {
        let Some(extractor) = &self.extractor else {
            error!(pos, "extract without an attached extractor");
            return Err(Error::InvalidConfiguration(
                format!("extraction at column {pos} has no extractor attached").into(),
            ));
        };
        let value = extractor.borrow_mut().extract(pos)?;
        let item = match self.normalize(value) {
            Value::Null => None,
            value => Some(T::from_value(value)?),
        };
        self.rows.borrow_mut().push(item);
        Ok(1)
    }

    fn reset(&mut self) {
        self.rows.borrow_mut().clear();
    }

    fn value(&self, row: usize) -> Option<Value> {
        let rows = self.rows.borrow();
        let item = rows.get(row)?;
        Some(item.clone().into_value())
    }

    fn column(&self) -> Option<&ColumnDescriptor> {
        self.column.as_ref()
    }
}

impl<T> fmt::Debug for Extract<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Extract")
            .field("position", &self.position)
            .field("limit", &self.limit)
            .field("column", &self.column)
            .field("has_extractor", &self.extractor.is_some())
            .finish()
    }
}
