//! Column descriptors shared by a statement and its result sets.

use crate::error::Result;

use super::kind::ColumnKind;
use super::metadata::ColumnMetadata;

/// A described column (immutable once produced by the engine).
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnDescriptor {
    /// Column name.
    pub name: String,
    /// Ordinal position, 0-based.
    pub position: usize,
    /// Whether NULL values are allowed.
    pub nullable: bool,
    /// Logical kind, carrying declared size or precision.
    pub kind: ColumnKind,
}

impl ColumnDescriptor {
    /// Create a nullable column descriptor.
    pub fn new(name: impl Into<String>, position: usize, kind: ColumnKind) -> Self {
        Self {
            name: name.into(),
            position,
            nullable: true,
            kind,
        }
    }

    /// Create a column descriptor from raw metadata.
    ///
    /// Returns error if the Oracle type is not supported.
    pub fn from_metadata(position: usize, meta: &ColumnMetadata) -> Result<Self> {
        Ok(Self {
            name: meta.name.clone(),
            position,
            nullable: meta.nullable,
            kind: ColumnKind::from_raw(
                meta.oracle_type,
                meta.precision,
                meta.scale,
                meta.max_size,
            )?,
        })
    }
}

/// Shared column information for all rows in a result set.
#[derive(Debug, Clone, Default)]
pub struct ColumnInfo {
    /// Column definitions.
    pub columns: Vec<ColumnDescriptor>,
}

impl ColumnInfo {
    /// Create new column info from columns.
    pub fn new(columns: Vec<ColumnDescriptor>) -> Self {
        Self { columns }
    }

    /// Create column info from raw metadata.
    ///
    /// Returns error if any column has an unsupported Oracle type.
    pub fn from_metadata(metadata: &[ColumnMetadata]) -> Result<Self> {
        let columns = metadata
            .iter()
            .enumerate()
            .map(|(pos, meta)| ColumnDescriptor::from_metadata(pos, meta))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { columns })
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.columns.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.columns.is_empty()
    }

    /// Get column by index.
    pub fn get(&self, index: usize) -> Option<&ColumnDescriptor> {
        self.columns.get(index)
    }

    /// Find column index by name (case-insensitive).
    pub fn find_by_name(&self, name: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| c.name.eq_ignore_ascii_case(name))
    }
}
