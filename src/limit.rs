use crate::config::LIMIT_UNLIMITED;

/// A bound on the number of rows a statement extracts.
///
/// An upper limit caps the rows returned by a single `execute` call and is
/// the paging size of a limited statement. A lower limit is never a paging
/// ceiling; it only sets the minimum row count an execution must produce.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Limit {
    value: u32,
    hard: bool,
    lower: bool,
}

impl Limit {
    /// Creates a new limit.
    pub const fn new(value: u32, hard: bool, lower: bool) -> Limit {
        Limit { value, hard, lower }
    }

    /// An upper limit. A hard upper limit fails the execution if more rows
    /// are available than it allows.
    pub const fn upper(value: u32, hard: bool) -> Limit {
        Limit::new(value, hard, false)
    }

    /// A lower limit, i.e., the minimum number of rows to extract.
    pub const fn lower(value: u32) -> Limit {
        Limit::new(value, false, true)
    }

    /// The soft, unlimited upper limit.
    pub const fn unlimited() -> Limit {
        Limit::upper(LIMIT_UNLIMITED, false)
    }

    pub fn value(&self) -> u32 {
        self.value
    }

    pub fn is_hard(&self) -> bool {
        self.hard
    }

    pub fn is_lower(&self) -> bool {
        self.lower
    }

    pub fn is_unlimited(&self) -> bool {
        self.value == LIMIT_UNLIMITED
    }
}

impl Default for Limit {
    fn default() -> Self {
        Limit::unlimited()
    }
}

/// Bulk (array) transfer of `size` rows per backend round trip.
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Bulk {
    size: u32,
}

impl Bulk {
    pub const fn new(size: u32) -> Bulk {
        Bulk { size }
    }

    pub fn size(&self) -> u32 {
        self.size
    }

    /// The soft upper limit equivalent to this batch size.
    pub fn limit(&self) -> Limit {
        Limit::upper(self.size, false)
    }
}

/// Whether binding or extraction operates on batches of rows.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub enum BulkMode {
    #[default]
    Undefined,
    Bulk,
}

impl BulkMode {
    pub fn is_bulk(self) -> bool {
        self == BulkMode::Bulk
    }
}
