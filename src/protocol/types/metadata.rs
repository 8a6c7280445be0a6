//! Raw column metadata as an engine reports it.
//!
//! Engines describe columns with wire-level numbers; `ColumnDescriptor`
//! is the resolved form used by bind and define.

/// Raw column metadata from an engine describe.
///
/// Use `ColumnDescriptor` for the resolved form.
#[derive(Debug, Clone)]
pub struct ColumnMetadata {
    /// Column name.
    pub name: String,
    /// Oracle data type number (raw wire format).
    pub oracle_type: u8,
    /// Numeric precision.
    pub precision: i8,
    /// Numeric scale.
    pub scale: i8,
    /// Declared maximum size in bytes.
    pub max_size: u32,
    /// Whether NULL values are allowed.
    pub nullable: bool,
}

impl ColumnMetadata {
    /// Create new column metadata with minimal info.
    pub fn new(name: impl Into<String>, oracle_type: u8) -> Self {
        Self {
            name: name.into(),
            oracle_type,
            precision: 0,
            scale: 0,
            max_size: 0,
            nullable: true,
        }
    }

    /// Set numeric precision and scale.
    pub fn with_precision(mut self, precision: i8, scale: i8) -> Self {
        self.precision = precision;
        self.scale = scale;
        self
    }

    /// Set the declared maximum size.
    pub fn with_max_size(mut self, max_size: u32) -> Self {
        self.max_size = max_size;
        self
    }

    /// Mark the column NOT NULL.
    pub fn not_null(mut self) -> Self {
        self.nullable = false;
        self
    }
}
