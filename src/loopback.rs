//! In-memory engine for tests and benchmarks.
//!
//! `LoopbackEngine` keeps one table of encoded cells. `INSERT` statements
//! store bound rows, `SELECT` statements serve them back through define
//! buffers, `DELETE` clears the table. It can simulate engine conditions
//! like read latency, missing last-chunk flags and rejected rows.

use std::collections::HashMap;
use std::time::Duration;

use tracing::trace;

use crate::engine::{ChunkRead, Engine, ExecuteOutcome, ResultSetHandle, RowError, StatementHandle};
use crate::error::{Error, Result};
use crate::protocol::bind::BindSpec;
use crate::protocol::define::DefineSpec;
use crate::protocol::registry;
use crate::protocol::types::{ColumnDescriptor, ColumnInfo, ColumnKind, ColumnMetadata, LobLocator};

/// Call counters.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LoopbackStats {
    /// `execute_bind` calls.
    pub executions: u64,
    /// `fetch_next` calls.
    pub fetches: u64,
    /// `read_chunk` calls.
    pub read_calls: u64,
    /// `write_chunk` calls.
    pub write_calls: u64,
    /// Temporary LOBs created.
    pub lobs_created: u64,
    /// LOB locators released.
    pub lobs_closed: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Command {
    Insert,
    Select,
    Delete,
}

impl Command {
    fn parse(sql: &str) -> Result<Self> {
        let verb = sql.split_whitespace().next().unwrap_or("");
        if verb.eq_ignore_ascii_case("insert") {
            Ok(Command::Insert)
        } else if verb.eq_ignore_ascii_case("select") {
            Ok(Command::Select)
        } else if verb.eq_ignore_ascii_case("delete") {
            Ok(Command::Delete)
        } else {
            Err(Error::oracle(900, "invalid SQL statement"))
        }
    }
}

#[derive(Debug)]
enum LobData {
    /// Temporary LOB written by a streamed bind.
    Temp(Vec<u8>),
    /// Locator over a stored cell.
    Cell { row: usize, column: usize },
}

/// Single-table engine held in memory.
///
/// # Example
///
/// ```
/// use ora_marshal::{ColumnMetadata, LoopbackEngine};
///
/// let engine = LoopbackEngine::new(vec![
///     ColumnMetadata::new("ID", 2).with_precision(10, 0).not_null(),
///     ColumnMetadata::new("DATA", 113),
/// ])
/// .unwrap()
/// .report_last(false);
/// assert_eq!(engine.columns().len(), 2);
/// ```
#[derive(Debug)]
pub struct LoopbackEngine {
    columns: Vec<ColumnDescriptor>,
    rows: Vec<Vec<Option<Vec<u8>>>>,
    statements: Vec<Command>,
    cursors: HashMap<u32, usize>,
    next_cursor: u32,
    lobs: HashMap<u64, LobData>,
    next_lob: u64,
    report_last: bool,
    read_delay: Option<Duration>,
    failing_rows: HashMap<usize, u32>,
    stats: LoopbackStats,
}

impl LoopbackEngine {
    /// Create an engine whose table is described by raw metadata.
    pub fn new(metadata: Vec<ColumnMetadata>) -> Result<Self> {
        Ok(Self::with_columns(ColumnInfo::from_metadata(&metadata)?.columns))
    }

    /// Create an engine from resolved column descriptors.
    pub fn with_columns(columns: Vec<ColumnDescriptor>) -> Self {
        Self {
            columns,
            rows: Vec::new(),
            statements: Vec::new(),
            cursors: HashMap::new(),
            next_cursor: 0,
            lobs: HashMap::new(),
            next_lob: 0,
            report_last: true,
            read_delay: None,
            failing_rows: HashMap::new(),
            stats: LoopbackStats::default(),
        }
    }

    /// Whether `read_chunk` flags the final chunk.
    pub fn report_last(mut self, report: bool) -> Self {
        self.report_last = report;
        self
    }

    /// Sleep before every chunk read.
    pub fn with_read_delay(mut self, delay: Duration) -> Self {
        self.read_delay = Some(delay);
        self
    }

    /// Reject bound row `row` of every insert with ORA-`code`.
    pub fn fail_row(mut self, row: usize, code: u32) -> Self {
        self.failing_rows.insert(row, code);
        self
    }

    /// Table columns.
    pub fn columns(&self) -> &[ColumnDescriptor] {
        &self.columns
    }

    /// Number of stored rows.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Stored wire bytes of one cell (`None` for NULL).
    pub fn cell(&self, row: usize, column: usize) -> Option<&[u8]> {
        self.rows.get(row)?.get(column)?.as_deref()
    }

    /// Call counters.
    pub fn stats(&self) -> LoopbackStats {
        self.stats
    }

    /// LOB locators not yet released.
    pub fn open_lobs(&self) -> usize {
        self.lobs.len()
    }

    /// Result sets not yet closed.
    pub fn open_result_sets(&self) -> usize {
        self.cursors.len()
    }

    fn command(&self, stmt: StatementHandle) -> Result<Command> {
        self.statements
            .get(stmt.0 as usize)
            .copied()
            .ok_or_else(|| Error::oracle(1003, "no statement parsed"))
    }

    fn new_lob(&mut self, data: LobData) -> LobLocator {
        let id = self.next_lob;
        self.next_lob += 1;
        self.lobs.insert(id, data);
        LobLocator::new(id.to_be_bytes().to_vec(), None, 0)
    }

    fn lob_bytes(&self, lob: &LobLocator) -> Result<&[u8]> {
        match self.lobs.get(&lob_id(lob)?) {
            Some(LobData::Temp(data)) => Ok(data),
            Some(LobData::Cell { row, column }) => Ok(self.cell(*row, *column).unwrap_or(&[])),
            None => Err(nonexistent_lob()),
        }
    }

    fn insert(&mut self, binds: &[BindSpec]) -> Result<ExecuteOutcome> {
        if binds.len() < self.columns.len() {
            return Err(Error::oracle(947, "not enough values"));
        }
        if binds.len() > self.columns.len() {
            return Err(Error::oracle(913, "too many values"));
        }
        for (bind, column) in binds.iter().zip(&self.columns) {
            // an all-NULL bind carries no value to convert
            if bind.indicators().iter().all(|i| i.is_null()) {
                continue;
            }
            if bind.rule().family != registry::rule(&column.kind).family {
                return Err(Error::oracle(
                    932,
                    format!(
                        "inconsistent datatypes: expected {} got {}",
                        column.kind,
                        bind.kind()
                    ),
                ));
            }
        }

        let rows = binds.first().map(BindSpec::rows).unwrap_or(1);
        let mut outcome = ExecuteOutcome::default();
        for row in 0..rows {
            let stored = match self.failing_rows.get(&row) {
                Some(&code) => Err(Error::oracle(code, "row rejected")),
                None => self.store_row(binds, row),
            };
            match stored {
                Ok(cells) => {
                    self.rows.push(cells);
                    outcome.row_counts.push(1);
                }
                Err(Error::Oracle { code, message }) => {
                    outcome.row_counts.push(0);
                    outcome.row_errors.push(RowError { row, code, message });
                }
                Err(e) => return Err(e),
            }
        }
        Ok(outcome)
    }

    fn store_row(&self, binds: &[BindSpec], row: usize) -> Result<Vec<Option<Vec<u8>>>> {
        let mut cells = Vec::with_capacity(binds.len());
        for (bind, column) in binds.iter().zip(&self.columns) {
            if bind.indicator(row).is_null() {
                if !column.nullable {
                    return Err(Error::oracle(
                        1400,
                        format!("cannot insert NULL into (\"{}\")", column.name),
                    ));
                }
                cells.push(None);
                continue;
            }
            let mut data = if bind.is_streamed() {
                let lob = bind
                    .lob(row)
                    .ok_or_else(|| Error::malformed("streamed bind without a LOB locator"))?;
                self.lob_bytes(lob)?.to_vec()
            } else {
                bind.value(row).unwrap_or(&[]).to_vec()
            };
            let max = column.kind.max_size() as usize;
            if max > 0 && data.len() > max {
                return Err(Error::oracle(
                    12899,
                    format!(
                        "value too large for column \"{}\" (actual: {}, maximum: {})",
                        column.name,
                        data.len(),
                        max
                    ),
                ));
            }
            if let ColumnKind::Char { .. } = column.kind {
                data.resize(max, b' ');
            }
            cells.push(Some(data));
        }
        Ok(cells)
    }
}

impl Default for LoopbackEngine {
    fn default() -> Self {
        Self::with_columns(Vec::new())
    }
}

fn lob_id(lob: &LobLocator) -> Result<u64> {
    <[u8; 8]>::try_from(lob.locator.as_ref())
        .map(u64::from_be_bytes)
        .map_err(|_| Error::malformed("LOB locator not issued by this engine"))
}

fn nonexistent_lob() -> Error {
    Error::oracle(22922, "nonexistent LOB value")
}

impl Engine for LoopbackEngine {
    async fn prepare(&mut self, sql: &str) -> Result<StatementHandle> {
        let command = Command::parse(sql)?;
        self.statements.push(command);
        Ok(StatementHandle(self.statements.len() as u32 - 1))
    }

    async fn describe(&mut self, sql: &str) -> Result<Vec<ColumnDescriptor>> {
        match Command::parse(sql)? {
            Command::Select => Ok(self.columns.clone()),
            Command::Insert | Command::Delete => Ok(Vec::new()),
        }
    }

    async fn execute_bind(
        &mut self,
        stmt: StatementHandle,
        binds: &[BindSpec],
    ) -> Result<ExecuteOutcome> {
        self.stats.executions += 1;
        match self.command(stmt)? {
            Command::Insert => self.insert(binds),
            Command::Select => {
                let id = self.next_cursor;
                self.next_cursor += 1;
                self.cursors.insert(id, 0);
                Ok(ExecuteOutcome {
                    result_set: Some(ResultSetHandle(id)),
                    ..Default::default()
                })
            }
            Command::Delete => {
                let removed = self.rows.len() as u64;
                self.rows.clear();
                Ok(ExecuteOutcome {
                    row_counts: vec![removed],
                    ..Default::default()
                })
            }
        }
    }

    async fn fetch_next(&mut self, rset: ResultSetHandle, defines: &mut [DefineSpec]) -> Result<bool> {
        self.stats.fetches += 1;
        let cursor = self
            .cursors
            .get_mut(&rset.0)
            .ok_or_else(|| Error::oracle(1001, "invalid cursor"))?;
        if *cursor >= self.rows.len() {
            return Ok(false);
        }
        let row = *cursor;
        *cursor += 1;
        if defines.len() != self.columns.len() {
            return Err(Error::ScanMismatch {
                expected: self.columns.len(),
                actual: defines.len(),
            });
        }

        for (column, define) in defines.iter_mut().enumerate() {
            let Some(data) = self.rows[row][column].as_deref() else {
                define.set_null();
                continue;
            };
            if define.is_streamed() {
                let id = self.next_lob;
                self.next_lob += 1;
                self.lobs.insert(id, LobData::Cell { row, column });
                define.set_lob(LobLocator::new(
                    id.to_be_bytes().to_vec(),
                    Some(data.len() as u64),
                    0,
                ));
            } else if data.len() > define.capacity() {
                return Err(Error::oracle(1406, "fetched column value was truncated"));
            } else {
                define.fill(data)?;
            }
        }
        Ok(true)
    }

    async fn close_result_set(&mut self, rset: ResultSetHandle) -> Result<()> {
        self.cursors
            .remove(&rset.0)
            .map(|_| ())
            .ok_or_else(|| Error::oracle(1001, "invalid cursor"))
    }

    async fn create_temp_lob(&mut self, kind: &ColumnKind) -> Result<LobLocator> {
        if !kind.is_streamed() {
            return Err(Error::oracle(
                932,
                format!("inconsistent datatypes: expected LOB got {}", kind),
            ));
        }
        self.stats.lobs_created += 1;
        let lob = self.new_lob(LobData::Temp(Vec::new()));
        Ok(LobLocator::temporary(lob.locator, 0))
    }

    async fn read_chunk(
        &mut self,
        lob: &LobLocator,
        offset: u64,
        buf: &mut [u8],
    ) -> Result<ChunkRead> {
        self.stats.read_calls += 1;
        if let Some(delay) = self.read_delay {
            tokio::time::sleep(delay).await;
        }
        let data = self.lob_bytes(lob)?;
        let start = (offset as usize).min(data.len());
        let n = buf.len().min(data.len() - start);
        buf[..n].copy_from_slice(&data[start..start + n]);
        let is_last = self.report_last && start + n >= data.len();
        trace!(offset, bytes = n, is_last, "loopback read");
        Ok(ChunkRead {
            bytes_read: n,
            is_last,
        })
    }

    async fn write_chunk(&mut self, lob: &LobLocator, offset: u64, chunk: &[u8]) -> Result<()> {
        self.stats.write_calls += 1;
        match self.lobs.get_mut(&lob_id(lob)?) {
            Some(LobData::Temp(data)) => {
                if offset as usize > data.len() {
                    return Err(Error::oracle(22928, "invalid LOB offset"));
                }
                data.truncate(offset as usize);
                data.extend_from_slice(chunk);
                Ok(())
            }
            Some(LobData::Cell { .. }) => Err(Error::oracle(
                22920,
                "row containing the LOB value is not locked",
            )),
            None => Err(nonexistent_lob()),
        }
    }

    async fn close_lob(&mut self, lob: &LobLocator) -> Result<()> {
        self.stats.lobs_closed += 1;
        self.lobs
            .remove(&lob_id(lob)?)
            .map(|_| ())
            .ok_or_else(nonexistent_lob)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::StatementConfig;
    use crate::protocol::bind::{bind, Param};
    use crate::protocol::define::open_defines;
    use crate::protocol::types::HostValue;

    fn engine() -> LoopbackEngine {
        LoopbackEngine::with_columns(vec![
            ColumnDescriptor::new("CODE", 0, ColumnKind::Char { max_size: 4 }),
            ColumnDescriptor::new("DATA", 1, ColumnKind::Blob),
        ])
    }

    #[tokio::test]
    async fn test_insert_pads_char() {
        let mut e = engine();
        let stmt = e.prepare("INSERT INTO t VALUES (:1, :2)").await.unwrap();
        let binds = bind(vec![Param::scalar("ab"), Param::scalar(HostValue::Null)]).unwrap();
        let outcome = e.execute_bind(stmt, &binds).await.unwrap();
        assert_eq!(outcome.row_counts, vec![1]);
        assert_eq!(e.cell(0, 0), Some(&b"ab  "[..]));
        assert_eq!(e.cell(0, 1), None);
    }

    #[tokio::test]
    async fn test_family_mismatch() {
        let mut e = engine();
        let stmt = e.prepare("insert into t values (:1, :2)").await.unwrap();
        let binds = bind(vec![Param::scalar(1i64), Param::scalar(vec![1u8])]).unwrap();
        match e.execute_bind(stmt, &binds).await {
            Err(Error::Oracle { code, .. }) => assert_eq!(code, 932),
            other => panic!("Expected ORA-00932, got {:?}", other),
        }
        assert_eq!(e.row_count(), 0);
    }

    #[tokio::test]
    async fn test_fetch_fills_defines() {
        let mut e = engine();
        let stmt = e.prepare("INSERT").await.unwrap();
        let binds = bind(vec![Param::scalar("x"), Param::scalar(HostValue::Null)]).unwrap();
        e.execute_bind(stmt, &binds).await.unwrap();

        let query = e.prepare("SELECT * FROM t").await.unwrap();
        let info = ColumnInfo::new(e.describe("SELECT").await.unwrap());
        let rset = e.execute_bind(query, &[]).await.unwrap().result_set.unwrap();
        let mut defines = open_defines(&info, &StatementConfig::default(), 1);
        assert!(e.fetch_next(rset, &mut defines).await.unwrap());
        assert_eq!(defines[0].data(), b"x   ");
        assert!(defines[1].indicator().is_null());
        assert!(!e.fetch_next(rset, &mut defines).await.unwrap());
        e.close_result_set(rset).await.unwrap();
        assert_eq!(e.open_result_sets(), 0);
    }

    #[tokio::test]
    async fn test_temp_lob_lifecycle() {
        let mut e = engine();
        let lob = e.create_temp_lob(&ColumnKind::Blob).await.unwrap();
        assert!(lob.temporary);
        e.write_chunk(&lob, 0, b"abc").await.unwrap();
        e.write_chunk(&lob, 3, b"de").await.unwrap();
        let mut buf = [0u8; 8];
        let read = e.read_chunk(&lob, 1, &mut buf).await.unwrap();
        assert_eq!(&buf[..read.bytes_read], b"bcde");
        assert!(read.is_last);
        e.close_lob(&lob).await.unwrap();
        assert_eq!(e.open_lobs(), 0);
        assert!(e.close_lob(&lob).await.is_err());
    }

    #[tokio::test]
    async fn test_unknown_statement() {
        let mut e = engine();
        assert!(matches!(
            e.prepare("MERGE INTO t").await,
            Err(Error::Oracle { code: 900, .. })
        ));
    }
}
