//! The engine seam: what the marshaling core needs from a database session.
//!
//! An `Engine` owns the native session. The core hands it encoded bind
//! buffers and define buffers to fill; it never sees host values. Every call
//! takes `&mut self`, so one session serves one statement at a time.

use std::future::Future;

use crate::error::Result;
use crate::protocol::bind::BindSpec;
use crate::protocol::define::DefineSpec;
use crate::protocol::types::{ColumnDescriptor, ColumnKind, LobLocator};

/// Engine-side prepared statement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StatementHandle(pub u32);

/// Engine-side open result set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ResultSetHandle(pub u32);

/// A row the engine rejected during a batch execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowError {
    /// 0-based row index within the batch.
    pub row: usize,
    /// Oracle error code.
    pub code: u32,
    /// Error message.
    pub message: String,
}

/// Outcome of one `execute_bind` call.
#[derive(Debug, Clone, Default)]
pub struct ExecuteOutcome {
    /// Rows affected, one entry per bound row (empty for queries).
    pub row_counts: Vec<u64>,
    /// Rows that failed.
    pub row_errors: Vec<RowError>,
    /// Result set opened by a query.
    pub result_set: Option<ResultSetHandle>,
}

/// Result of one LOB chunk read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkRead {
    /// Bytes written into the caller's buffer.
    pub bytes_read: usize,
    /// Engine knows no data follows this chunk.
    pub is_last: bool,
}

/// A database session able to execute bound statements and stream LOBs.
///
/// Offsets passed to LOB calls are 0-based byte offsets.
pub trait Engine: Send {
    /// Alignment define and bind buffers are rounded up to.
    const BUFFER_ALIGNMENT: usize = 1;

    /// Prepare a statement.
    fn prepare(&mut self, sql: &str) -> impl Future<Output = Result<StatementHandle>> + Send;

    /// Describe the columns a query returns (empty for DML).
    fn describe(
        &mut self,
        sql: &str,
    ) -> impl Future<Output = Result<Vec<ColumnDescriptor>>> + Send;

    /// Execute once for all rows in `binds`.
    fn execute_bind(
        &mut self,
        stmt: StatementHandle,
        binds: &[BindSpec],
    ) -> impl Future<Output = Result<ExecuteOutcome>> + Send;

    /// Fill `defines` with the next row. Returns `false` when exhausted.
    fn fetch_next(
        &mut self,
        rset: ResultSetHandle,
        defines: &mut [DefineSpec],
    ) -> impl Future<Output = Result<bool>> + Send;

    /// Release an engine cursor.
    fn close_result_set(&mut self, rset: ResultSetHandle)
        -> impl Future<Output = Result<()>> + Send;

    /// Create a temporary LOB for a streamed bind.
    fn create_temp_lob(
        &mut self,
        kind: &ColumnKind,
    ) -> impl Future<Output = Result<LobLocator>> + Send;

    /// Read up to `buf.len()` bytes starting at `offset`.
    fn read_chunk(
        &mut self,
        lob: &LobLocator,
        offset: u64,
        buf: &mut [u8],
    ) -> impl Future<Output = Result<ChunkRead>> + Send;

    /// Write `chunk` at `offset`.
    fn write_chunk(
        &mut self,
        lob: &LobLocator,
        offset: u64,
        chunk: &[u8],
    ) -> impl Future<Output = Result<()>> + Send;

    /// Release a LOB locator.
    fn close_lob(&mut self, lob: &LobLocator) -> impl Future<Output = Result<()>> + Send;
}
