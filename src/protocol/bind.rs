//! Bind encoder: host values to bind buffers and indicator arrays.
//!
//! Non-streamed parameters are packed into one zero-filled buffer of
//! `rows * slot_size` bytes with a length per row. Streamed parameters (CLOB,
//! BLOB) keep their bytes until execute, when the batch coordinator uploads
//! them through temporary LOBs.

use bytes::{Bytes, BytesMut};
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::constants::{
    INDICATOR_NOT_NULL, INDICATOR_NULL, TNS_MAX_RAW_LENGTH, TNS_MAX_VARCHAR_LENGTH,
};
use crate::protocol::registry::{self, TypeRule};
use crate::protocol::sizing;
use crate::protocol::types::{ColumnKind, HostValue, LobLocator};

/// Per-row null flag handed to the engine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Indicator {
    NotNull,
    Null,
}

impl Indicator {
    /// Oracle indicator value.
    pub fn as_raw(self) -> i16 {
        match self {
            Indicator::NotNull => INDICATOR_NOT_NULL,
            Indicator::Null => INDICATOR_NULL,
        }
    }

    pub fn is_null(self) -> bool {
        self == Indicator::Null
    }
}

/// Values of one parameter.
#[derive(Debug, Clone, PartialEq)]
pub enum ParamValues {
    /// One row.
    Scalar(HostValue),
    /// One value per row.
    Batch(Vec<HostValue>),
}

/// A statement parameter, optionally with an explicit kind.
#[derive(Debug, Clone, PartialEq)]
pub struct Param {
    pub kind: Option<ColumnKind>,
    pub values: ParamValues,
}

impl Param {
    /// Single-row parameter.
    pub fn scalar(value: impl Into<HostValue>) -> Self {
        Self {
            kind: None,
            values: ParamValues::Scalar(value.into()),
        }
    }

    /// Multi-row parameter.
    pub fn batch<I, T>(values: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<HostValue>,
    {
        Self {
            kind: None,
            values: ParamValues::Batch(values.into_iter().map(Into::into).collect()),
        }
    }

    /// Bind as `kind` instead of inferring it.
    pub fn with_kind(mut self, kind: ColumnKind) -> Self {
        self.kind = Some(kind);
        self
    }

    /// Number of rows this parameter carries.
    pub fn rows(&self) -> usize {
        match &self.values {
            ParamValues::Scalar(_) => 1,
            ParamValues::Batch(v) => v.len(),
        }
    }

    fn into_values(self) -> Vec<HostValue> {
        match self.values {
            ParamValues::Scalar(v) => vec![v],
            ParamValues::Batch(v) => v,
        }
    }
}

impl From<HostValue> for Param {
    fn from(value: HostValue) -> Self {
        Param::scalar(value)
    }
}

impl From<Vec<HostValue>> for Param {
    fn from(values: Vec<HostValue>) -> Self {
        Param::batch(values)
    }
}

/// Encoded payload of one parameter.
#[derive(Debug)]
pub enum BindData {
    /// Fixed slots in one buffer.
    Inline {
        slot_size: usize,
        buffer: BytesMut,
        lengths: Vec<u32>,
    },
    /// Streamed values, uploaded to LOBs at execute time.
    Streamed {
        values: Vec<Option<Bytes>>,
        locators: Vec<Option<LobLocator>>,
    },
}

/// Encoded parameter, consumed once by execute.
#[derive(Debug)]
pub struct BindSpec {
    position: usize,
    kind: ColumnKind,
    rule: &'static TypeRule,
    indicators: Vec<Indicator>,
    data: BindData,
}

impl BindSpec {
    /// 0-based parameter position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Wire kind.
    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    /// Registry rule of the wire kind.
    pub fn rule(&self) -> &'static TypeRule {
        self.rule
    }

    /// Number of rows.
    pub fn rows(&self) -> usize {
        self.indicators.len()
    }

    /// Indicator of one row.
    pub fn indicator(&self, row: usize) -> Indicator {
        self.indicators[row]
    }

    /// All indicators.
    pub fn indicators(&self) -> &[Indicator] {
        &self.indicators
    }

    /// Whether values are passed through LOB locators.
    pub fn is_streamed(&self) -> bool {
        matches!(self.data, BindData::Streamed { .. })
    }

    /// Slot size of an inline parameter.
    pub fn slot_size(&self) -> Option<usize> {
        match &self.data {
            BindData::Inline { slot_size, .. } => Some(*slot_size),
            BindData::Streamed { .. } => None,
        }
    }

    /// Whole inline buffer (`rows * slot_size` bytes).
    pub fn buffer(&self) -> Option<&[u8]> {
        match &self.data {
            BindData::Inline { buffer, .. } => Some(buffer),
            BindData::Streamed { .. } => None,
        }
    }

    /// Encoded bytes of one inline row (`None` for NULL rows and streamed binds).
    pub fn value(&self, row: usize) -> Option<&[u8]> {
        if self.indicators[row].is_null() {
            return None;
        }
        match &self.data {
            BindData::Inline {
                slot_size,
                buffer,
                lengths,
            } => {
                let start = row * slot_size;
                Some(&buffer[start..start + lengths[row] as usize])
            }
            BindData::Streamed { .. } => None,
        }
    }

    /// LOB locator carrying a streamed row, once uploaded.
    pub fn lob(&self, row: usize) -> Option<&LobLocator> {
        match &self.data {
            BindData::Streamed { locators, .. } => locators.get(row).and_then(Option::as_ref),
            BindData::Inline { .. } => None,
        }
    }

    /// Pending bytes of a streamed row.
    pub(crate) fn streamed_value(&self, row: usize) -> Option<&Bytes> {
        match &self.data {
            BindData::Streamed { values, .. } => values.get(row).and_then(Option::as_ref),
            BindData::Inline { .. } => None,
        }
    }

    pub(crate) fn set_lob(&mut self, row: usize, lob: LobLocator) {
        if let BindData::Streamed { locators, .. } = &mut self.data {
            locators[row] = Some(lob);
        }
    }

    /// Remove uploaded locators, leaving the bind as before upload.
    pub(crate) fn take_lobs(&mut self) -> Vec<LobLocator> {
        match &mut self.data {
            BindData::Streamed { locators, .. } => {
                locators.iter_mut().filter_map(Option::take).collect()
            }
            BindData::Inline { .. } => Vec::new(),
        }
    }
}

/// Encode parameters with byte alignment.
pub fn bind(params: Vec<Param>) -> Result<Vec<BindSpec>> {
    encode_params(params, 1)
}

/// Encode parameters, rounding inline slots up to `alignment`.
///
/// All parameters must carry the same number of rows.
pub fn encode_params(params: Vec<Param>, alignment: usize) -> Result<Vec<BindSpec>> {
    let rows = params.first().map(Param::rows).unwrap_or(0);
    if let Some(other) = params.iter().map(Param::rows).find(|&n| n != rows) {
        return Err(Error::BatchSizeMismatch {
            expected: rows,
            actual: other,
        });
    }
    let specs = params
        .into_iter()
        .enumerate()
        .map(|(position, param)| encode_param(position, param, alignment))
        .collect::<Result<Vec<_>>>()?;
    debug!(params = specs.len(), rows, "encoded binds");
    Ok(specs)
}

/// Kind chosen for a parameter bound without one.
///
/// Decided by the first non-null value's family and the largest value.
pub fn infer_kind(values: &[HostValue]) -> ColumnKind {
    let Some(first) = values.iter().find(|v| !v.is_null_sentinel()) else {
        return ColumnKind::Varchar2 {
            max_size: TNS_MAX_VARCHAR_LENGTH,
        };
    };
    let longest = |f: fn(&HostValue) -> Option<usize>| values.iter().filter_map(f).max().unwrap_or(0);
    match first {
        HostValue::Bytes(_) | HostValue::NullableBytes { .. } => {
            if longest(|v| v.as_bytes().map(<[u8]>::len)) <= TNS_MAX_RAW_LENGTH as usize {
                ColumnKind::Raw {
                    max_size: TNS_MAX_RAW_LENGTH,
                }
            } else {
                ColumnKind::Blob
            }
        }
        HostValue::Str(_) => {
            if longest(|v| v.as_str().map(str::len)) <= TNS_MAX_VARCHAR_LENGTH as usize {
                ColumnKind::Varchar2 {
                    max_size: TNS_MAX_VARCHAR_LENGTH,
                }
            } else {
                ColumnKind::Clob
            }
        }
        HostValue::Number(_) => ColumnKind::Number {
            precision: 0,
            scale: 0,
        },
        HostValue::Date(_) => ColumnKind::Date,
        HostValue::Null => ColumnKind::Varchar2 {
            max_size: TNS_MAX_VARCHAR_LENGTH,
        },
    }
}

fn mismatch(rule: &TypeRule, kind: &ColumnKind, value: &HostValue, param: usize, row: usize) -> Error {
    Error::TypeMismatch {
        param,
        row,
        expected: if rule.streamed {
            rule.name.to_string()
        } else {
            kind.to_string()
        },
        actual: value.variant_name(),
    }
}

fn encode_param(position: usize, param: Param, alignment: usize) -> Result<BindSpec> {
    let kind = param.kind;
    let values = param.into_values();
    let kind = kind.unwrap_or_else(|| infer_kind(&values));
    let rule = registry::rule(&kind);
    let rows = values.len();
    let mut indicators = Vec::with_capacity(rows);

    let data = if rule.streamed {
        let mut pending = Vec::with_capacity(rows);
        for (row, value) in values.into_iter().enumerate() {
            if value.is_null_sentinel() {
                indicators.push(Indicator::Null);
                pending.push(None);
                continue;
            }
            if !rule.family.accepts(&value) {
                return Err(mismatch(rule, &kind, &value, position, row));
            }
            let bytes = match value {
                HostValue::Bytes(b) | HostValue::NullableBytes { value: b, .. } => b,
                HostValue::Str(s) => Bytes::from(s.into_bytes()),
                other => {
                    let mut buf = BytesMut::new();
                    (rule.encode)(&other, &mut buf).map_err(|e| e.at(position, row))?;
                    buf.freeze()
                }
            };
            indicators.push(Indicator::NotNull);
            pending.push(Some(bytes));
        }
        BindData::Streamed {
            values: pending,
            locators: vec![None; rows],
        }
    } else {
        let max = rule.max_value_len(&kind);
        let mut scratch = BytesMut::new();
        let mut spans: Vec<Option<(usize, usize)>> = Vec::with_capacity(rows);
        for (row, value) in values.iter().enumerate() {
            if value.is_null_sentinel() {
                indicators.push(Indicator::Null);
                spans.push(None);
                continue;
            }
            if !rule.family.accepts(value) {
                return Err(mismatch(rule, &kind, value, position, row));
            }
            let start = scratch.len();
            (rule.encode)(value, &mut scratch).map_err(|e| e.at(position, row))?;
            let len = scratch.len() - start;
            if len as u64 > max {
                return Err(Error::ValueTooLarge {
                    param: position,
                    row,
                    len,
                    max,
                });
            }
            indicators.push(Indicator::NotNull);
            spans.push(Some((start, len)));
        }

        let max_encoded = spans.iter().flatten().map(|&(_, len)| len).max().unwrap_or(0);
        let slot_size = sizing::bind_slot_size(rule, max_encoded, alignment);
        let mut buffer = BytesMut::zeroed(slot_size * rows);
        let mut lengths = vec![0u32; rows];
        for (row, span) in spans.iter().enumerate() {
            if let Some(&(start, len)) = span.as_ref() {
                let slot = row * slot_size;
                buffer[slot..slot + len].copy_from_slice(&scratch[start..start + len]);
                lengths[row] = len as u32;
            }
        }
        BindData::Inline {
            slot_size,
            buffer,
            lengths,
        }
    };

    Ok(BindSpec {
        position,
        kind,
        rule,
        indicators,
        data,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_infer_kind() {
        assert_eq!(
            infer_kind(&[HostValue::from(vec![0u8; 2000])]),
            ColumnKind::Raw { max_size: 2000 }
        );
        assert_eq!(infer_kind(&[HostValue::from(vec![0u8; 2001])]), ColumnKind::Blob);
        assert_eq!(
            infer_kind(&[HostValue::from(vec![1u8]), HostValue::from(vec![0u8; 3000])]),
            ColumnKind::Blob
        );
        assert_eq!(infer_kind(&[HostValue::from("x".repeat(4001))]), ColumnKind::Clob);
        assert_eq!(
            infer_kind(&[HostValue::Null, HostValue::from(1i64)]),
            ColumnKind::Number {
                precision: 0,
                scale: 0
            }
        );
        assert_eq!(
            infer_kind(&[HostValue::Null]),
            ColumnKind::Varchar2 { max_size: 4000 }
        );
    }

    #[test]
    fn test_bind_scalar_raw() {
        let specs = bind(vec![Param::scalar(vec![1u8, 2, 3])]).unwrap();
        assert_eq!(specs.len(), 1);
        let spec = &specs[0];
        assert_eq!(spec.rows(), 1);
        assert_eq!(spec.kind(), &ColumnKind::Raw { max_size: 2000 });
        assert_eq!(spec.indicator(0).as_raw(), 0);
        assert_eq!(spec.value(0), Some(&[1u8, 2, 3][..]));
        assert_eq!(spec.slot_size(), Some(3));
    }

    #[test]
    fn test_bind_batch_with_nulls() {
        let param = Param::batch(vec![
            HostValue::from(vec![9u8; 4]),
            HostValue::Null,
            HostValue::from(Vec::<u8>::new()),
            HostValue::NullableBytes {
                value: Bytes::from_static(b"zz"),
                is_null: true,
            },
            HostValue::from(vec![7u8]),
        ]);
        let spec = bind(vec![param]).unwrap().remove(0);
        let nulls: Vec<i16> = spec.indicators().iter().map(|i| i.as_raw()).collect();
        assert_eq!(nulls, vec![0, -1, -1, -1, 0]);
        assert_eq!(spec.slot_size(), Some(4));
        assert_eq!(spec.buffer().unwrap().len(), 20);
        // null slots stay zero-filled
        assert_eq!(&spec.buffer().unwrap()[4..16], &[0u8; 12]);
        assert_eq!(spec.value(4), Some(&[7u8][..]));
        assert_eq!(spec.value(1), None);
    }

    #[test]
    fn test_bind_size_mismatch() {
        let err = bind(vec![
            Param::batch(vec![1i64, 2, 3]),
            Param::batch(vec!["a", "b"]),
        ])
        .unwrap_err();
        match err {
            Error::BatchSizeMismatch { expected, actual } => {
                assert_eq!(expected, 3);
                assert_eq!(actual, 2);
            }
            other => panic!("Expected BatchSizeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_type_mismatch_position() {
        let param = Param::batch(vec![HostValue::from(vec![1u8]), HostValue::from("text")])
            .with_kind(ColumnKind::Raw { max_size: 10 });
        let err = bind(vec![Param::scalar(1i64), param]).unwrap_err();
        match err {
            Error::BatchSizeMismatch { .. } => {}
            other => panic!("Expected BatchSizeMismatch, got {:?}", other),
        }

        let param = Param::batch(vec![HostValue::from(vec![1u8]), HostValue::from("text")])
            .with_kind(ColumnKind::Raw { max_size: 10 });
        match bind(vec![Param::batch(vec![1i64, 2]), param]).unwrap_err() {
            Error::TypeMismatch {
                param,
                row,
                expected,
                actual,
            } => {
                assert_eq!(param, 1);
                assert_eq!(row, 1);
                assert_eq!(expected, "RAW(10)");
                assert_eq!(actual, "Str");
            }
            other => panic!("Expected TypeMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_value_too_large() {
        let param = Param::scalar(vec![0u8; 11]).with_kind(ColumnKind::Raw { max_size: 10 });
        match bind(vec![param]).unwrap_err() {
            Error::ValueTooLarge { len, max, .. } => {
                assert_eq!(len, 11);
                assert_eq!(max, 10);
            }
            other => panic!("Expected ValueTooLarge, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_huge_exponent_overflows() {
        let huge: bigdecimal::BigDecimal = "1e32766".parse().unwrap();
        match bind(vec![Param::scalar(huge)]).unwrap_err() {
            Error::NumericOverflow { target, .. } => assert_eq!(target, "NUMBER"),
            other => panic!("Expected NumericOverflow, got {:?}", other),
        }
    }

    #[test]
    fn test_bind_streamed() {
        let spec = bind(vec![Param::batch(vec![
            HostValue::from(vec![5u8; 3000]),
            HostValue::Null,
        ])])
        .unwrap()
        .remove(0);
        assert!(spec.is_streamed());
        assert_eq!(spec.kind(), &ColumnKind::Blob);
        assert_eq!(spec.streamed_value(0).map(Bytes::len), Some(3000));
        assert!(spec.indicator(1).is_null());
        assert!(spec.lob(0).is_none());
        assert_eq!(spec.value(0), None);
    }

    #[test]
    fn test_bind_fixed_width_slots() {
        let date = NaiveDate::from_ymd_opt(2001, 2, 3)
            .unwrap()
            .and_hms_opt(4, 5, 6)
            .unwrap();
        let specs = bind(vec![
            Param::batch(vec![1i64, -1_000_000]),
            Param::batch(vec![Some(date), None]),
        ])
        .unwrap();
        assert_eq!(specs[0].slot_size(), Some(22));
        assert_eq!(specs[0].value(0), Some(&[0xC1u8, 0x02][..]));
        assert_eq!(specs[1].slot_size(), Some(7));
        assert!(specs[1].indicator(1).is_null());
    }

    #[test]
    fn test_encode_aligned() {
        let spec = encode_params(vec![Param::scalar("abc")], 8).unwrap().remove(0);
        assert_eq!(spec.slot_size(), Some(8));
        assert_eq!(spec.value(0), Some(&b"abc"[..]));
    }
}
