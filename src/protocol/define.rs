//! Define buffers: where the engine writes fetched column values.
//!
//! One `DefineSpec` per result column, allocated when the result set opens
//! and reused for every row. Streamed columns get a single chunk-sized buffer;
//! the engine only hands back a LOB locator and the data is pulled later
//! through the same buffer.

use crate::config::{BytesForm, RsetConfig, StatementConfig};
use crate::error::{Error, Result};
use crate::protocol::bind::Indicator;
use crate::protocol::chunk::TransferStats;
use crate::protocol::registry::{self, DecodeContext, Family, TypeRule};
use crate::protocol::sizing;
use crate::protocol::types::{ColumnDescriptor, ColumnInfo, ColumnKind, HostValue, LobLocator};

/// Receive buffer and state for one result column.
#[derive(Debug)]
pub struct DefineSpec {
    position: usize,
    kind: ColumnKind,
    rule: &'static TypeRule,
    buffer: Vec<u8>,
    len: usize,
    indicator: Indicator,
    lob: Option<LobLocator>,
    last_transfer: TransferStats,
}

impl DefineSpec {
    /// Allocate the define buffer for a column.
    pub fn new(column: &ColumnDescriptor, config: &StatementConfig, alignment: usize) -> Self {
        let rule = registry::rule(&column.kind);
        let capacity = sizing::define_capacity(column, rule, config, alignment);
        Self {
            position: column.position,
            kind: column.kind,
            rule,
            buffer: vec![0u8; capacity],
            len: 0,
            indicator: Indicator::Null,
            lob: None,
            last_transfer: TransferStats::default(),
        }
    }

    /// 0-based column position.
    pub fn position(&self) -> usize {
        self.position
    }

    /// Column kind.
    pub fn kind(&self) -> &ColumnKind {
        &self.kind
    }

    /// Whether the engine delivers a LOB locator instead of data.
    pub fn is_streamed(&self) -> bool {
        self.rule.streamed
    }

    /// Buffer capacity in bytes (the chunk size for streamed columns).
    pub fn capacity(&self) -> usize {
        self.buffer.len()
    }

    /// Whole receive buffer for the engine to write into.
    pub fn buffer_mut(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    /// Filled part of the buffer.
    pub fn data(&self) -> &[u8] {
        &self.buffer[..self.len]
    }

    /// Current indicator.
    pub fn indicator(&self) -> Indicator {
        self.indicator
    }

    /// Mark `len` bytes of the buffer as this row's value.
    #[track_caller]
    pub fn set_len(&mut self, len: usize) -> Result<()> {
        if len > self.buffer.len() {
            return Err(Error::buffer_too_small(len, self.buffer.len()));
        }
        self.len = len;
        self.indicator = Indicator::NotNull;
        Ok(())
    }

    /// Copy `data` in as this row's value.
    #[track_caller]
    pub fn fill(&mut self, data: &[u8]) -> Result<()> {
        if data.len() > self.buffer.len() {
            return Err(Error::buffer_too_small(data.len(), self.buffer.len()));
        }
        self.buffer[..data.len()].copy_from_slice(data);
        self.set_len(data.len())
    }

    /// Mark this row's value NULL.
    pub fn set_null(&mut self) {
        self.len = 0;
        self.lob = None;
        self.indicator = Indicator::Null;
    }

    /// Hand over the locator of this row's streamed value.
    pub fn set_lob(&mut self, lob: LobLocator) {
        self.len = 0;
        self.lob = Some(lob);
        self.indicator = Indicator::NotNull;
    }

    /// Locator of this row's streamed value.
    pub fn lob(&self) -> Option<&LobLocator> {
        self.lob.as_ref()
    }

    /// Counters of the last LOB read through this define.
    pub fn last_transfer(&self) -> TransferStats {
        self.last_transfer
    }

    pub(crate) fn take_lob(&mut self) -> Option<LobLocator> {
        self.lob.take()
    }

    pub(crate) fn chunk_buffer(&mut self) -> &mut [u8] {
        &mut self.buffer
    }

    pub(crate) fn record_transfer(&mut self, stats: TransferStats) {
        self.last_transfer = stats;
    }

    /// Clear per-row state before a fetch.
    pub(crate) fn reset(&mut self) {
        self.set_null();
    }

    /// Value for a NULL indicator.
    pub(crate) fn null_value(&self, rset: &RsetConfig) -> HostValue {
        if self.rule.family == Family::Bytes && rset.bytes_form == BytesForm::NullableBytes {
            HostValue::NullableBytes {
                value: bytes::Bytes::new(),
                is_null: true,
            }
        } else {
            HostValue::Null
        }
    }

    /// Decode an inline (non-streamed) value.
    pub(crate) fn decode(&self, name: &str, rset: &RsetConfig) -> Result<HostValue> {
        if self.indicator.is_null() {
            return Ok(self.null_value(rset));
        }
        let min = self.rule.min_size as usize;
        if self.len < min {
            return Err(Error::TruncatedRead {
                column: name.to_string(),
                got: self.len,
                min,
            });
        }
        let ctx = DecodeContext {
            kind: &self.kind,
            rset,
        };
        (self.rule.decode)(self.data(), &ctx)
    }

    /// Decode a reassembled streamed value.
    pub(crate) fn assemble(&self, data: Vec<u8>, rset: &RsetConfig) -> Result<HostValue> {
        let ctx = DecodeContext {
            kind: &self.kind,
            rset,
        };
        match self.rule.assemble {
            Some(assemble) => assemble(data, &ctx),
            None => (self.rule.decode)(&data, &ctx),
        }
    }
}

/// Allocate define buffers for every described column.
pub fn open_defines(
    columns: &ColumnInfo,
    config: &StatementConfig,
    alignment: usize,
) -> Vec<DefineSpec> {
    columns
        .columns
        .iter()
        .map(|c| DefineSpec::new(c, config, alignment))
        .collect()
}
