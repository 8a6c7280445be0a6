//! Host values exchanged with bind and define buffers.

use bigdecimal::{BigDecimal, ToPrimitive};
use bytes::Bytes;
use chrono::NaiveDateTime;
use std::fmt;

/// Numeric host value.
///
/// Which variant a define produces depends on the result set's numeric mode.
#[derive(Debug, Clone, PartialEq)]
pub enum Numeric {
    /// Native signed integer.
    Int(i64),
    /// Native binary float.
    Float(f64),
    /// Arbitrary-precision decimal.
    Decimal(BigDecimal),
}

impl Numeric {
    /// Convert to i64 if the value is integral and in range.
    pub fn to_i64(&self) -> Option<i64> {
        match self {
            Numeric::Int(v) => Some(*v),
            Numeric::Float(v) if v.fract() == 0.0 && v.abs() < 9.2e18 => Some(*v as i64),
            Numeric::Float(_) => None,
            Numeric::Decimal(d) if d.is_integer() => d.to_i64(),
            Numeric::Decimal(_) => None,
        }
    }

    /// Convert to f64 (may round decimals).
    pub fn to_f64(&self) -> Option<f64> {
        match self {
            Numeric::Int(v) => Some(*v as f64),
            Numeric::Float(v) => Some(*v),
            Numeric::Decimal(d) => d.to_f64(),
        }
    }
}

impl fmt::Display for Numeric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Numeric::Int(v) => write!(f, "{}", v),
            Numeric::Float(v) => write!(f, "{}", v),
            Numeric::Decimal(d) => write!(f, "{}", d.normalized()),
        }
    }
}

/// A single host value, as passed to bind or produced by define.
#[derive(Debug, Clone, PartialEq)]
pub enum HostValue {
    /// NULL value.
    Null,
    /// Raw bytes (RAW, LONG RAW, BLOB).
    Bytes(Bytes),
    /// Bytes with an explicit null flag.
    NullableBytes { value: Bytes, is_null: bool },
    /// Text (VARCHAR2, CHAR, LONG, CLOB).
    Str(String),
    /// Numeric value (NUMBER, BINARY_INTEGER).
    Number(Numeric),
    /// Date/time value (DATE).
    Date(NaiveDateTime),
}

impl HostValue {
    /// Check if the value is NULL (including a null-flagged `NullableBytes`).
    pub fn is_null(&self) -> bool {
        matches!(
            self,
            HostValue::Null | HostValue::NullableBytes { is_null: true, .. }
        )
    }

    /// Whether binding this value sets a null indicator.
    ///
    /// Zero-length bytes and strings are NULL on the database side.
    pub fn is_null_sentinel(&self) -> bool {
        match self {
            HostValue::Null => true,
            HostValue::NullableBytes { value, is_null } => *is_null || value.is_empty(),
            HostValue::Bytes(b) => b.is_empty(),
            HostValue::Str(s) => s.is_empty(),
            HostValue::Number(_) | HostValue::Date(_) => false,
        }
    }

    /// Short variant name used in mismatch errors.
    pub fn variant_name(&self) -> &'static str {
        match self {
            HostValue::Null => "Null",
            HostValue::Bytes(_) => "Bytes",
            HostValue::NullableBytes { .. } => "NullableBytes",
            HostValue::Str(_) => "Str",
            HostValue::Number(Numeric::Int(_)) => "Int",
            HostValue::Number(Numeric::Float(_)) => "Float",
            HostValue::Number(Numeric::Decimal(_)) => "Decimal",
            HostValue::Date(_) => "Date",
        }
    }

    /// Try to get the value as bytes.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            HostValue::Bytes(b) => Some(b),
            HostValue::NullableBytes {
                value,
                is_null: false,
            } => Some(value),
            _ => None,
        }
    }

    /// Try to get the value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            HostValue::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get the numeric value.
    pub fn as_number(&self) -> Option<&Numeric> {
        match self {
            HostValue::Number(n) => Some(n),
            _ => None,
        }
    }

    /// Try to convert to i64.
    pub fn to_i64(&self) -> Option<i64> {
        self.as_number().and_then(Numeric::to_i64)
    }

    /// Try to convert to f64.
    pub fn to_f64(&self) -> Option<f64> {
        self.as_number().and_then(Numeric::to_f64)
    }

    /// Try to get the value as a decimal.
    pub fn as_decimal(&self) -> Option<&BigDecimal> {
        match self {
            HostValue::Number(Numeric::Decimal(d)) => Some(d),
            _ => None,
        }
    }

    /// Try to get the value as a NaiveDateTime.
    pub fn as_date(&self) -> Option<NaiveDateTime> {
        match self {
            HostValue::Date(dt) => Some(*dt),
            _ => None,
        }
    }
}

impl fmt::Display for HostValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HostValue::Null | HostValue::NullableBytes { is_null: true, .. } => write!(f, "NULL"),
            HostValue::Bytes(b) | HostValue::NullableBytes { value: b, .. } => {
                write!(f, "<RAW: {} bytes>", b.len())
            }
            HostValue::Str(s) => write!(f, "{}", s),
            HostValue::Number(n) => write!(f, "{}", n),
            HostValue::Date(dt) => write!(f, "{}", dt.format("%Y-%m-%d %H:%M:%S")),
        }
    }
}

impl From<i64> for HostValue {
    fn from(v: i64) -> Self {
        HostValue::Number(Numeric::Int(v))
    }
}

impl From<i32> for HostValue {
    fn from(v: i32) -> Self {
        HostValue::Number(Numeric::Int(v as i64))
    }
}

impl From<f64> for HostValue {
    fn from(v: f64) -> Self {
        HostValue::Number(Numeric::Float(v))
    }
}

impl From<BigDecimal> for HostValue {
    fn from(v: BigDecimal) -> Self {
        HostValue::Number(Numeric::Decimal(v))
    }
}

impl From<&str> for HostValue {
    fn from(v: &str) -> Self {
        HostValue::Str(v.to_string())
    }
}

impl From<String> for HostValue {
    fn from(v: String) -> Self {
        HostValue::Str(v)
    }
}

impl From<Vec<u8>> for HostValue {
    fn from(v: Vec<u8>) -> Self {
        HostValue::Bytes(Bytes::from(v))
    }
}

impl From<&[u8]> for HostValue {
    fn from(v: &[u8]) -> Self {
        HostValue::Bytes(Bytes::copy_from_slice(v))
    }
}

impl From<Bytes> for HostValue {
    fn from(v: Bytes) -> Self {
        HostValue::Bytes(v)
    }
}

impl From<NaiveDateTime> for HostValue {
    fn from(v: NaiveDateTime) -> Self {
        HostValue::Date(v)
    }
}

impl<T: Into<HostValue>> From<Option<T>> for HostValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(HostValue::Null)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn test_host_value_null() {
        let val = HostValue::Null;
        assert!(val.is_null());
        assert!(val.is_null_sentinel());
        assert_eq!(val.as_str(), None);
        assert_eq!(format!("{}", val), "NULL");
    }

    #[test]
    fn test_empty_values_are_null_sentinels() {
        assert!(HostValue::from("").is_null_sentinel());
        assert!(HostValue::from(Vec::<u8>::new()).is_null_sentinel());
        assert!(!HostValue::from("").is_null());
        assert!(!HostValue::from(0i64).is_null_sentinel());
    }

    #[test]
    fn test_nullable_bytes() {
        let val = HostValue::NullableBytes {
            value: Bytes::from_static(b"ab"),
            is_null: true,
        };
        assert!(val.is_null());
        assert_eq!(val.as_bytes(), None);

        let val = HostValue::NullableBytes {
            value: Bytes::from_static(b"ab"),
            is_null: false,
        };
        assert!(!val.is_null());
        assert_eq!(val.as_bytes(), Some(&b"ab"[..]));
    }

    #[test]
    fn test_numeric_conversions() {
        let val = HostValue::from(42i64);
        assert_eq!(val.to_i64(), Some(42));
        assert_eq!(val.to_f64(), Some(42.0));

        let val = HostValue::from(123.45f64);
        assert_eq!(val.to_i64(), None);
        assert_eq!(val.to_f64(), Some(123.45));

        let val = HostValue::from(BigDecimal::from_str("12345678901234567890").unwrap());
        assert_eq!(val.to_i64(), None);
        assert!(val.as_decimal().is_some());
        assert_eq!(format!("{}", val), "12345678901234567890");
    }

    #[test]
    fn test_option_conversion() {
        assert_eq!(HostValue::from(None::<i64>), HostValue::Null);
        assert_eq!(HostValue::from(Some("x")), HostValue::Str("x".into()));
    }
}
