//! Type registry: per-kind wire rules.
//!
//! | Kind | Type num | Family | Default size | Streamed |
//! |------|----------|--------|--------------|----------|
//! | VARCHAR2 | 1 | text | 4000 | no |
//! | NUMBER | 2 | numeric | 22 | no |
//! | BINARY_INTEGER | 3 | numeric | 22 | no |
//! | LONG | 8 | text | 2^31-1 | no |
//! | DATE | 12 | date | 7 | no |
//! | RAW | 23 | bytes | 2000 | no |
//! | LONG RAW | 24 | bytes | 2^31-1 | no |
//! | CHAR | 96 | text | 2000 | no |
//! | CLOB | 112 | text | chunk | yes |
//! | BLOB | 113 | bytes | chunk | yes |

use bytes::{BufMut, Bytes, BytesMut};

use crate::config::{BytesForm, RsetConfig};
use crate::error::{Error, Result};
use crate::protocol::codec::{decode_oracle_date, encode_oracle_date, OracleNumber};
use crate::protocol::constants::*;
use crate::protocol::types::{ColumnKind, HostValue, Numeric};

/// Host value family a kind accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Family {
    Bytes,
    Text,
    Numeric,
    Date,
}

impl Family {
    /// Whether a non-null host value belongs to this family.
    pub fn accepts(self, value: &HostValue) -> bool {
        matches!(
            (self, value),
            (Family::Bytes, HostValue::Bytes(_) | HostValue::NullableBytes { .. })
                | (Family::Text, HostValue::Str(_))
                | (Family::Numeric, HostValue::Number(_))
                | (Family::Date, HostValue::Date(_))
        )
    }
}

/// Inputs a decode function needs besides the wire bytes.
#[derive(Debug, Clone, Copy)]
pub struct DecodeContext<'a> {
    pub kind: &'a ColumnKind,
    pub rset: &'a RsetConfig,
}

/// Appends one value's wire bytes. Callers pass non-null values only.
pub type EncodeFn = fn(&HostValue, &mut BytesMut) -> Result<()>;
/// Decodes one non-null value from its wire bytes.
pub type DecodeFn = fn(&[u8], &DecodeContext<'_>) -> Result<HostValue>;
/// Decodes a fully reassembled streamed value, taking ownership of the bytes.
pub type AssembleFn = fn(Vec<u8>, &DecodeContext<'_>) -> Result<HostValue>;

/// Marshaling rule for one column kind.
pub struct TypeRule {
    pub name: &'static str,
    pub type_num: u16,
    pub family: Family,
    /// Default (and maximum) wire size; streamed kinds use the chunk size.
    pub default_size: u32,
    /// Smallest valid non-null wire value.
    pub min_size: u32,
    pub streamed: bool,
    pub encode: EncodeFn,
    pub decode: DecodeFn,
    pub assemble: Option<AssembleFn>,
}

impl std::fmt::Debug for TypeRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TypeRule")
            .field("name", &self.name)
            .field("type_num", &self.type_num)
            .field("family", &self.family)
            .field("default_size", &self.default_size)
            .field("streamed", &self.streamed)
            .finish()
    }
}

impl TypeRule {
    /// Largest encoded value a kind accepts at bind time.
    pub fn max_value_len(&self, kind: &ColumnKind) -> u64 {
        if self.streamed {
            return u64::MAX;
        }
        match kind.max_size() {
            0 => self.default_size as u64,
            declared => declared.min(self.default_size) as u64,
        }
    }

    /// Whether bind slots for this kind have a fixed size.
    pub fn is_fixed_width(&self) -> bool {
        matches!(self.family, Family::Numeric | Family::Date)
    }
}

static RULES: [TypeRule; 10] = [
    TypeRule {
        name: "VARCHAR2",
        type_num: ORA_TYPE_NUM_VARCHAR,
        family: Family::Text,
        default_size: TNS_MAX_VARCHAR_LENGTH,
        min_size: 0,
        streamed: false,
        encode: encode_text,
        decode: decode_text,
        assemble: None,
    },
    TypeRule {
        name: "NUMBER",
        type_num: ORA_TYPE_NUM_NUMBER,
        family: Family::Numeric,
        default_size: TNS_NUMBER_MAX_LENGTH,
        min_size: 1,
        streamed: false,
        encode: encode_number,
        decode: decode_number,
        assemble: None,
    },
    TypeRule {
        name: "BINARY_INTEGER",
        type_num: ORA_TYPE_NUM_BINARY_INTEGER,
        family: Family::Numeric,
        default_size: TNS_NUMBER_MAX_LENGTH,
        min_size: 1,
        streamed: false,
        encode: encode_number,
        decode: decode_number,
        assemble: None,
    },
    TypeRule {
        name: "LONG",
        type_num: ORA_TYPE_NUM_LONG,
        family: Family::Text,
        default_size: TNS_MAX_LONG_LENGTH,
        min_size: 0,
        streamed: false,
        encode: encode_text,
        decode: decode_text,
        assemble: None,
    },
    TypeRule {
        name: "DATE",
        type_num: ORA_TYPE_NUM_DATE,
        family: Family::Date,
        default_size: TNS_DATE_LENGTH,
        min_size: TNS_DATE_LENGTH,
        streamed: false,
        encode: encode_date,
        decode: decode_date,
        assemble: None,
    },
    TypeRule {
        name: "RAW",
        type_num: ORA_TYPE_NUM_RAW,
        family: Family::Bytes,
        default_size: TNS_MAX_RAW_LENGTH,
        min_size: 0,
        streamed: false,
        encode: encode_bytes,
        decode: decode_bytes,
        assemble: None,
    },
    TypeRule {
        name: "LONG RAW",
        type_num: ORA_TYPE_NUM_LONG_RAW,
        family: Family::Bytes,
        default_size: TNS_MAX_LONG_LENGTH,
        min_size: 0,
        streamed: false,
        encode: encode_bytes,
        decode: decode_bytes,
        assemble: None,
    },
    TypeRule {
        name: "CHAR",
        type_num: ORA_TYPE_NUM_CHAR,
        family: Family::Text,
        default_size: TNS_MAX_CHAR_LENGTH,
        min_size: 0,
        streamed: false,
        encode: encode_text,
        decode: decode_text,
        assemble: None,
    },
    TypeRule {
        name: "CLOB",
        type_num: ORA_TYPE_NUM_CLOB,
        family: Family::Text,
        default_size: 0,
        min_size: 0,
        streamed: true,
        encode: encode_text,
        decode: decode_text,
        assemble: Some(assemble_text),
    },
    TypeRule {
        name: "BLOB",
        type_num: ORA_TYPE_NUM_BLOB,
        family: Family::Bytes,
        default_size: 0,
        min_size: 0,
        streamed: true,
        encode: encode_bytes,
        decode: decode_bytes,
        assemble: Some(assemble_bytes),
    },
];

/// Rule for a column kind.
pub fn rule(kind: &ColumnKind) -> &'static TypeRule {
    let index = match kind {
        ColumnKind::Varchar2 { .. } => 0,
        ColumnKind::Number { .. } => 1,
        ColumnKind::BinaryInteger => 2,
        ColumnKind::Long => 3,
        ColumnKind::Date => 4,
        ColumnKind::Raw { .. } => 5,
        ColumnKind::LongRaw => 6,
        ColumnKind::Char { .. } => 7,
        ColumnKind::Clob => 8,
        ColumnKind::Blob => 9,
    };
    &RULES[index]
}

/// Rule for a raw Oracle type number.
pub fn lookup(type_num: u8) -> Result<&'static TypeRule> {
    RULES
        .iter()
        .find(|r| r.type_num == type_num as u16)
        .ok_or(Error::UnsupportedType { type_num })
}

fn mismatch(expected: &'static str, value: &HostValue) -> Error {
    Error::TypeMismatch {
        param: 0,
        row: 0,
        expected: expected.to_string(),
        actual: value.variant_name(),
    }
}

fn encode_text(value: &HostValue, out: &mut BytesMut) -> Result<()> {
    match value {
        HostValue::Str(s) => {
            out.put_slice(s.as_bytes());
            Ok(())
        }
        other => Err(mismatch("text", other)),
    }
}

fn encode_bytes(value: &HostValue, out: &mut BytesMut) -> Result<()> {
    match value {
        HostValue::Bytes(b) | HostValue::NullableBytes { value: b, .. } => {
            out.put_slice(b);
            Ok(())
        }
        other => Err(mismatch("bytes", other)),
    }
}

fn encode_number(value: &HostValue, out: &mut BytesMut) -> Result<()> {
    let number = match value {
        HostValue::Number(Numeric::Int(v)) => OracleNumber::from_i64(*v),
        HostValue::Number(Numeric::Float(v)) => {
            OracleNumber::from_f64(*v).ok_or_else(|| Error::NumericOverflow {
                value: v.to_string(),
                target: "NUMBER",
            })?
        }
        HostValue::Number(Numeric::Decimal(d)) => {
            OracleNumber::from_decimal(d).ok_or_else(|| Error::NumericOverflow {
                value: d.to_string(),
                target: "NUMBER",
            })?
        }
        other => return Err(mismatch("number", other)),
    };
    number.encode(out)
}

fn encode_date(value: &HostValue, out: &mut BytesMut) -> Result<()> {
    match value {
        HostValue::Date(dt) => encode_oracle_date(dt, out),
        other => Err(mismatch("date", other)),
    }
}

fn decode_text(data: &[u8], _ctx: &DecodeContext<'_>) -> Result<HostValue> {
    std::str::from_utf8(data)
        .map(|s| HostValue::Str(s.to_owned()))
        .map_err(|e| Error::malformed(format!("invalid UTF-8 in text column: {}", e)))
}

fn assemble_text(data: Vec<u8>, _ctx: &DecodeContext<'_>) -> Result<HostValue> {
    String::from_utf8(data)
        .map(HostValue::Str)
        .map_err(|e| Error::malformed(format!("invalid UTF-8 in CLOB: {}", e)))
}

fn bytes_value(value: Bytes, ctx: &DecodeContext<'_>) -> HostValue {
    match ctx.rset.bytes_form {
        BytesForm::Bytes => HostValue::Bytes(value),
        BytesForm::NullableBytes => HostValue::NullableBytes {
            value,
            is_null: false,
        },
    }
}

fn decode_bytes(data: &[u8], ctx: &DecodeContext<'_>) -> Result<HostValue> {
    Ok(bytes_value(Bytes::copy_from_slice(data), ctx))
}

fn assemble_bytes(data: Vec<u8>, ctx: &DecodeContext<'_>) -> Result<HostValue> {
    Ok(bytes_value(Bytes::from(data), ctx))
}

fn decode_number(data: &[u8], ctx: &DecodeContext<'_>) -> Result<HostValue> {
    let number = OracleNumber::decode(data)?;
    ctx.rset.materialize(ctx.kind, &number).map(HostValue::Number)
}

fn decode_date(data: &[u8], _ctx: &DecodeContext<'_>) -> Result<HostValue> {
    decode_oracle_date(data).map(HostValue::Date)
}
