use crate::catalog::ty::ColumnType;

/// Static metadata of one result column.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnDescriptor {
    /// Zero-based position in the result set.
    pub position: usize,
    /// The column identifier, as reported by the backend.
    pub name: String,
    /// The declared column type.
    pub ty: ColumnType,
    /// Maximum length, for variable-length types.
    pub length: usize,
    /// Numeric precision; zero if not applicable.
    pub precision: usize,
    pub nullable: bool,
}

impl ColumnDescriptor {
    /// Creates a nullable column descriptor with no length or precision.
    pub fn new(position: usize, name: impl Into<String>, ty: ColumnType) -> ColumnDescriptor {
        ColumnDescriptor {
            position,
            name: name.into(),
            ty,
            length: 0,
            precision: 0,
            nullable: true,
        }
    }

    pub fn with_length(mut self, length: usize) -> Self {
        self.length = length;
        self
    }

    pub fn with_precision(mut self, precision: usize) -> Self {
        self.precision = precision;
        self
    }

    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }

    /// Case-insensitive name comparison.
    pub fn is_named(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}
