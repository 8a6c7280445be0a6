//! Column kind enum with type-specific attributes.
//!
//! Each kind maps to exactly one Type Registry rule. Nullability is a column
//! property, not a kind property.

use crate::error::{Error, Result};
use crate::protocol::constants::*;

/// Logical Oracle column kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnKind {
    /// VARCHAR2(max_size) - variable-length string.
    Varchar2 { max_size: u32 },
    /// CHAR(max_size) - fixed-length, blank-padded string.
    Char { max_size: u32 },
    /// LONG - legacy large text type.
    Long,
    /// CLOB - streamed character large object.
    Clob,
    /// NUMBER(precision, scale).
    Number { precision: i8, scale: i8 },
    /// BINARY_INTEGER - integer carried in NUMBER format.
    BinaryInteger,
    /// DATE - date/time without timezone.
    Date,
    /// RAW(max_size) - bytes with a declared limit.
    Raw { max_size: u32 },
    /// LONG RAW - legacy large bytes, never streamed.
    LongRaw,
    /// BLOB - streamed binary large object.
    Blob,
}

impl ColumnKind {
    /// Create from raw Oracle type number and metadata.
    ///
    /// Returns `Err(Error::UnsupportedType)` for unsupported types.
    pub fn from_raw(oracle_type: u8, precision: i8, scale: i8, max_size: u32) -> Result<Self> {
        match oracle_type as u16 {
            ORA_TYPE_NUM_VARCHAR => Ok(ColumnKind::Varchar2 { max_size }),
            ORA_TYPE_NUM_CHAR => Ok(ColumnKind::Char { max_size }),
            ORA_TYPE_NUM_LONG => Ok(ColumnKind::Long),
            ORA_TYPE_NUM_CLOB => Ok(ColumnKind::Clob),
            ORA_TYPE_NUM_NUMBER => Ok(ColumnKind::Number { precision, scale }),
            ORA_TYPE_NUM_BINARY_INTEGER => Ok(ColumnKind::BinaryInteger),
            ORA_TYPE_NUM_DATE => Ok(ColumnKind::Date),
            ORA_TYPE_NUM_RAW => Ok(ColumnKind::Raw { max_size }),
            ORA_TYPE_NUM_LONG_RAW => Ok(ColumnKind::LongRaw),
            ORA_TYPE_NUM_BLOB => Ok(ColumnKind::Blob),
            _ => Err(Error::UnsupportedType {
                type_num: oracle_type,
            }),
        }
    }

    /// Get the Oracle type number.
    pub fn type_num(&self) -> u8 {
        let num = match self {
            ColumnKind::Varchar2 { .. } => ORA_TYPE_NUM_VARCHAR,
            ColumnKind::Char { .. } => ORA_TYPE_NUM_CHAR,
            ColumnKind::Long => ORA_TYPE_NUM_LONG,
            ColumnKind::Clob => ORA_TYPE_NUM_CLOB,
            ColumnKind::Number { .. } => ORA_TYPE_NUM_NUMBER,
            ColumnKind::BinaryInteger => ORA_TYPE_NUM_BINARY_INTEGER,
            ColumnKind::Date => ORA_TYPE_NUM_DATE,
            ColumnKind::Raw { .. } => ORA_TYPE_NUM_RAW,
            ColumnKind::LongRaw => ORA_TYPE_NUM_LONG_RAW,
            ColumnKind::Blob => ORA_TYPE_NUM_BLOB,
        };
        num as u8
    }

    /// Get precision (for Number kinds, 0 otherwise).
    pub fn precision(&self) -> i8 {
        match self {
            ColumnKind::Number { precision, .. } => *precision,
            _ => 0,
        }
    }

    /// Get scale (for Number kinds, 0 otherwise).
    pub fn scale(&self) -> i8 {
        match self {
            ColumnKind::Number { scale, .. } => *scale,
            _ => 0,
        }
    }

    /// Declared max size (for sized kinds, 0 otherwise).
    pub fn max_size(&self) -> u32 {
        match self {
            ColumnKind::Varchar2 { max_size }
            | ColumnKind::Char { max_size }
            | ColumnKind::Raw { max_size } => *max_size,
            _ => 0,
        }
    }

    /// Whether values of this kind are transferred through LOB chunks.
    pub fn is_streamed(&self) -> bool {
        matches!(self, ColumnKind::Clob | ColumnKind::Blob)
    }

    /// Whether this is a LONG or LONG RAW column.
    pub fn is_long(&self) -> bool {
        matches!(self, ColumnKind::Long | ColumnKind::LongRaw)
    }
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ColumnKind::Varchar2 { max_size } => write!(f, "VARCHAR2({})", max_size),
            ColumnKind::Char { max_size } => write!(f, "CHAR({})", max_size),
            ColumnKind::Long => write!(f, "LONG"),
            ColumnKind::Clob => write!(f, "CLOB"),
            ColumnKind::Number { precision, scale } => {
                if *precision == 0 && (*scale == 0 || *scale == ORA_NUMBER_SCALE_FLOAT) {
                    write!(f, "NUMBER")
                } else if *scale == ORA_NUMBER_SCALE_FLOAT {
                    write!(f, "FLOAT({})", precision)
                } else if *scale == 0 {
                    write!(f, "NUMBER({})", precision)
                } else {
                    write!(f, "NUMBER({},{})", precision, scale)
                }
            }
            ColumnKind::BinaryInteger => write!(f, "BINARY_INTEGER"),
            ColumnKind::Date => write!(f, "DATE"),
            ColumnKind::Raw { max_size } => write!(f, "RAW({})", max_size),
            ColumnKind::LongRaw => write!(f, "LONG RAW"),
            ColumnKind::Blob => write!(f, "BLOB"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_raw_raw() {
        let k = ColumnKind::from_raw(ORA_TYPE_NUM_RAW as u8, 0, 0, 2000);
        assert_eq!(k.unwrap(), ColumnKind::Raw { max_size: 2000 });
    }

    #[test]
    fn test_from_raw_number() {
        let k = ColumnKind::from_raw(ORA_TYPE_NUM_NUMBER as u8, 10, 2, 0);
        assert_eq!(
            k.unwrap(),
            ColumnKind::Number {
                precision: 10,
                scale: 2
            }
        );
    }

    #[test]
    fn test_from_raw_unsupported() {
        // BFILE has no marshaling rule
        match ColumnKind::from_raw(114, 0, 0, 0) {
            Err(Error::UnsupportedType { type_num }) => assert_eq!(type_num, 114),
            other => panic!("Expected UnsupportedType error, got {:?}", other),
        }
    }

    #[test]
    fn test_type_num_round_trip() {
        let kinds = [
            ColumnKind::Varchar2 { max_size: 10 },
            ColumnKind::Char { max_size: 5 },
            ColumnKind::Long,
            ColumnKind::Clob,
            ColumnKind::Number {
                precision: 5,
                scale: 2,
            },
            ColumnKind::BinaryInteger,
            ColumnKind::Date,
            ColumnKind::Raw { max_size: 16 },
            ColumnKind::LongRaw,
            ColumnKind::Blob,
        ];
        for kind in kinds {
            let back = ColumnKind::from_raw(
                kind.type_num(),
                kind.precision(),
                kind.scale(),
                kind.max_size(),
            )
            .unwrap();
            assert_eq!(back, kind);
        }
    }

    #[test]
    fn test_streamed() {
        assert!(ColumnKind::Blob.is_streamed());
        assert!(ColumnKind::Clob.is_streamed());
        assert!(!ColumnKind::LongRaw.is_streamed());
        assert!(ColumnKind::LongRaw.is_long());
    }

    #[test]
    fn test_display() {
        assert_eq!(format!("{}", ColumnKind::Raw { max_size: 2000 }), "RAW(2000)");
        assert_eq!(format!("{}", ColumnKind::LongRaw), "LONG RAW");
        assert_eq!(
            format!(
                "{}",
                ColumnKind::Number {
                    precision: 10,
                    scale: 2
                }
            ),
            "NUMBER(10,2)"
        );
        assert_eq!(
            format!(
                "{}",
                ColumnKind::Number {
                    precision: 0,
                    scale: -127
                }
            ),
            "NUMBER"
        );
        assert_eq!(
            format!(
                "{}",
                ColumnKind::Number {
                    precision: 126,
                    scale: -127
                }
            ),
            "FLOAT(126)"
        );
    }
}
