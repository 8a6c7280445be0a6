//! Record type for decoded result rows.

use std::sync::Arc;

use crate::error::{Error, Result};

use super::column::{ColumnDescriptor, ColumnInfo};
use super::value::HostValue;

/// One decoded row: column name to host value, in column order.
#[derive(Debug, Clone)]
pub struct Record {
    /// Column values.
    values: Vec<HostValue>,
    /// Shared column information (reference counted).
    column_info: Arc<ColumnInfo>,
}

impl Record {
    /// Create a new record with values and shared column info.
    pub fn new(values: Vec<HostValue>, column_info: Arc<ColumnInfo>) -> Self {
        Self {
            values,
            column_info,
        }
    }

    /// Get value by column index (0-based).
    pub fn get(&self, index: usize) -> Option<&HostValue> {
        self.values.get(index)
    }

    /// Get value by column name (case-insensitive).
    pub fn get_by_name(&self, name: &str) -> Option<&HostValue> {
        self.column_info
            .find_by_name(name)
            .and_then(|idx| self.values.get(idx))
    }

    /// Get value by column name, failing if the name is unknown.
    pub fn try_get(&self, name: &str) -> Result<&HostValue> {
        self.get_by_name(name).ok_or_else(|| Error::ColumnNotFound {
            name: name.to_string(),
        })
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if the record is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get all values.
    pub fn values(&self) -> &[HostValue] {
        &self.values
    }

    /// Get column descriptors.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.column_info.columns
    }

    /// Get column names.
    pub fn column_names(&self) -> Vec<&str> {
        self.column_info.column_names()
    }

    /// Iterate over values.
    pub fn iter(&self) -> impl Iterator<Item = &HostValue> {
        self.values.iter()
    }

    /// Iterate over `(name, value)` pairs in column order.
    pub fn named(&self) -> impl Iterator<Item = (&str, &HostValue)> {
        self.column_info
            .columns
            .iter()
            .map(|c| c.name.as_str())
            .zip(self.values.iter())
    }

    /// Copy the values into caller-provided destinations.
    ///
    /// The destination count must equal the column count.
    pub fn scan(&self, dest: &mut [HostValue]) -> Result<()> {
        if dest.len() != self.values.len() {
            return Err(Error::ScanMismatch {
                expected: self.values.len(),
                actual: dest.len(),
            });
        }
        dest.clone_from_slice(&self.values);
        Ok(())
    }
}

impl IntoIterator for Record {
    type Item = HostValue;
    type IntoIter = std::vec::IntoIter<HostValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.into_iter()
    }
}

impl<'a> IntoIterator for &'a Record {
    type Item = &'a HostValue;
    type IntoIter = std::slice::Iter<'a, HostValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.values.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::types::ColumnKind;

    fn make_test_column_info() -> Arc<ColumnInfo> {
        Arc::new(ColumnInfo::new(vec![
            ColumnDescriptor::new("NAME", 0, ColumnKind::Varchar2 { max_size: 100 }),
            ColumnDescriptor::new(
                "VALUE",
                1,
                ColumnKind::Number {
                    precision: 10,
                    scale: 0,
                },
            ),
        ]))
    }

    fn make_record() -> Record {
        Record::new(
            vec![HostValue::from("test"), HostValue::from(42i64)],
            make_test_column_info(),
        )
    }

    #[test]
    fn test_record_access() {
        let record = make_record();

        assert_eq!(record.len(), 2);
        assert_eq!(record.get(0), Some(&HostValue::from("test")));
        assert_eq!(record.get_by_name("value"), Some(&HostValue::from(42i64)));
        assert_eq!(record.get_by_name("VALUE"), record.get_by_name("value"));
        assert!(matches!(
            record.try_get("missing"),
            Err(Error::ColumnNotFound { .. })
        ));
    }

    #[test]
    fn test_record_named() {
        let record = make_record();
        let names: Vec<&str> = record.named().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["NAME", "VALUE"]);
        assert_eq!(record.columns()[1].name, "VALUE");
    }

    #[test]
    fn test_scan() {
        let record = make_record();
        let mut dest = vec![HostValue::Null; 2];
        record.scan(&mut dest).unwrap();
        assert_eq!(dest[1], HostValue::from(42i64));

        let mut short = vec![HostValue::Null; 1];
        match record.scan(&mut short) {
            Err(Error::ScanMismatch { expected, actual }) => {
                assert_eq!(expected, 2);
                assert_eq!(actual, 1);
            }
            other => panic!("Expected ScanMismatch, got {:?}", other),
        }
    }
}
