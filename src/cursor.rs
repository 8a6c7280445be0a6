//! Result sets: define buffers in, records out.
//!
//! The `Cursor` trait defines the common iteration interface; `ResultSet`
//! implements it over an engine result-set handle. A result set holds the
//! engine session mutably, so only one result set per session is open at a
//! time.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use futures::Stream;
use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::config::{RsetConfig, StatementConfig};
use crate::engine::{Engine, ResultSetHandle};
use crate::error::{Error, Result};
use crate::protocol::chunk::read_lob;
use crate::protocol::define::{open_defines, DefineSpec};
use crate::protocol::types::{ColumnDescriptor, ColumnInfo, HostValue, Record};

/// Base trait for all cursor types.
///
/// # Example
///
/// ```no_run
/// use ora_marshal::{Cursor, Record};
///
/// async fn count_rows<C: Cursor<Item = Record>>(cursor: &mut C) -> ora_marshal::Result<u64> {
///     let mut count = 0;
///     while let Some(_) = cursor.next().await? {
///         count += 1;
///     }
///     Ok(count)
/// }
/// ```
pub trait Cursor {
    /// The type of item this cursor yields.
    type Item;

    /// Column descriptors for this cursor.
    fn columns(&self) -> &[ColumnDescriptor];

    /// Number of rows fetched so far.
    fn rowcount(&self) -> u64;

    /// Check if the cursor is closed.
    fn is_closed(&self) -> bool;

    /// Check if more items may be available.
    fn has_more(&self) -> bool;

    /// Close the cursor and release engine resources.
    fn close(&mut self) -> impl Future<Output = Result<()>> + Send;

    /// Get the next item.
    ///
    /// Returns `Ok(None)` when exhausted. Any error closes the cursor.
    fn next(&mut self) -> impl Future<Output = Result<Option<Self::Item>>> + Send;

    /// Fetch all remaining items into a vector.
    ///
    /// The cursor will be closed after this call.
    fn fetch_all(&mut self) -> impl Future<Output = Result<Vec<Self::Item>>> + Send;
}

/// An open result set decoding rows into `Record`s.
///
/// # Lifecycle
///
/// 1. Created by `Statement::query()` or `ResultSet::open()`
/// 2. Iterated via `next()` or `fetch_all()`
/// 3. Closed when exhausted, on the first error, or via `close()`
///
/// Define buffers are released on drop. Dropping an open result set cannot
/// release the engine cursor. A result set opened by `Statement::query()`
/// hands its handle back to the statement, which closes it before its next
/// engine call. Otherwise call `close()`.
pub struct ResultSet<'e, E: Engine> {
    engine: &'e mut E,
    handle: ResultSetHandle,
    column_info: Arc<ColumnInfo>,
    defines: Vec<DefineSpec>,
    config: RsetConfig,
    lob_timeout: Option<Duration>,
    cancel: CancelToken,
    rows_fetched: u64,
    exhausted: bool,
    closed: bool,
    abandoned: Option<&'e mut Option<ResultSetHandle>>,
}

impl<'e, E: Engine> ResultSet<'e, E> {
    /// Open a result set over an engine handle.
    ///
    /// The numeric configuration is snapshotted here and never re-read.
    pub fn open(
        engine: &'e mut E,
        handle: ResultSetHandle,
        columns: Arc<ColumnInfo>,
        config: &StatementConfig,
        cancel: CancelToken,
    ) -> Result<Self> {
        config.validate()?;
        let rset = config.rset_snapshot();
        let defines = open_defines(&columns, config, E::BUFFER_ALIGNMENT);
        debug!(
            handle = handle.0,
            columns = columns.len(),
            config = ?rset,
            "result set opened"
        );
        Ok(Self {
            engine,
            handle,
            column_info: columns,
            defines,
            config: rset,
            lob_timeout: config.lob_timeout,
            cancel,
            rows_fetched: 0,
            exhausted: false,
            closed: false,
            abandoned: None,
        })
    }

    /// Slot that receives the handle if the result set is dropped while open.
    pub(crate) fn on_abandon(mut self, slot: &'e mut Option<ResultSetHandle>) -> Self {
        self.abandoned = Some(slot);
        self
    }

    /// Decode configuration frozen at open.
    pub fn config(&self) -> &RsetConfig {
        &self.config
    }

    /// Engine handle.
    pub fn handle(&self) -> ResultSetHandle {
        self.handle
    }

    /// Shared column information.
    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.column_info)
    }

    /// Define buffers, one per column.
    pub fn defines(&self) -> &[DefineSpec] {
        &self.defines
    }

    /// Cancellation token observed by LOB reads.
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    async fn fetch_row(&mut self) -> Result<Option<Record>> {
        for define in &mut self.defines {
            define.reset();
        }
        if !self.engine.fetch_next(self.handle, &mut self.defines).await? {
            self.exhausted = true;
            self.release().await?;
            return Ok(None);
        }

        let mut values = Vec::with_capacity(self.defines.len());
        for index in 0..self.defines.len() {
            match self.column_value(index).await {
                Ok(value) => values.push(value),
                Err(e) => {
                    self.discard_lobs(index + 1).await;
                    return Err(e);
                }
            }
        }
        self.rows_fetched += 1;
        Ok(Some(Record::new(values, Arc::clone(&self.column_info))))
    }

    async fn column_value(&mut self, index: usize) -> Result<HostValue> {
        let define = &mut self.defines[index];
        let column = &self.column_info.columns[index];
        if !define.is_streamed() || define.indicator().is_null() {
            return define.decode(&column.name, &self.config);
        }
        let lob = define.take_lob().ok_or_else(|| {
            Error::malformed(format!("column {} has no LOB locator", column.name))
        })?;
        let (data, stats) = read_lob(
            &mut *self.engine,
            &lob,
            define.chunk_buffer(),
            &self.cancel,
            self.lob_timeout,
        )
        .await?;
        define.record_transfer(stats);
        define.assemble(data, &self.config)
    }

    /// Close locators of columns not yet read when a row is abandoned.
    async fn discard_lobs(&mut self, from: usize) {
        for define in &mut self.defines[from..] {
            let Some(lob) = define.take_lob() else {
                continue;
            };
            if let Err(e) = self.engine.close_lob(&lob).await {
                warn!(error = %e, column = define.position(), "failed to close LOB of abandoned row");
            }
        }
    }

    async fn release(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        debug!(
            handle = self.handle.0,
            rows = self.rows_fetched,
            "result set closed"
        );
        self.engine.close_result_set(self.handle).await
    }
}

impl<E: Engine> Cursor for ResultSet<'_, E> {
    type Item = Record;

    fn columns(&self) -> &[ColumnDescriptor] {
        &self.column_info.columns
    }

    fn rowcount(&self) -> u64 {
        self.rows_fetched
    }

    fn is_closed(&self) -> bool {
        self.closed
    }

    fn has_more(&self) -> bool {
        !self.closed && !self.exhausted
    }

    async fn close(&mut self) -> Result<()> {
        self.release().await
    }

    async fn next(&mut self) -> Result<Option<Self::Item>> {
        if self.closed || self.exhausted {
            return Ok(None);
        }
        match self.fetch_row().await {
            Ok(row) => Ok(row),
            Err(e) => {
                if let Err(close_err) = self.release().await {
                    warn!(error = %close_err, "failed to close result set after error");
                }
                Err(e)
            }
        }
    }

    async fn fetch_all(&mut self) -> Result<Vec<Self::Item>> {
        let mut all_rows = Vec::new();
        while let Some(row) = self.next().await? {
            all_rows.push(row);
        }
        self.release().await?;
        Ok(all_rows)
    }
}

impl<E: Engine> Drop for ResultSet<'_, E> {
    fn drop(&mut self) {
        if !self.closed {
            debug!(handle = self.handle.0, "result set dropped while open");
            if let Some(slot) = self.abandoned.take() {
                *slot = Some(self.handle);
            }
        }
    }
}

/// Extension trait for converting Cursor to Stream.
///
/// # Example
///
/// ```no_run
/// use futures::stream::TryStreamExt;
/// use ora_marshal::{CursorStreamExt, Engine, ResultSet};
///
/// async fn first_names<E: Engine>(rs: ResultSet<'_, E>) -> ora_marshal::Result<Vec<String>> {
///     rs.into_stream()
///         .map_ok(|row| row.get(0).map(|v| v.to_string()).unwrap_or_default())
///         .try_collect()
///         .await
/// }
/// ```
pub trait CursorStreamExt: Cursor + Sized {
    /// Convert this cursor into a Stream yielding `Result<Item>`.
    ///
    /// The stream takes ownership of the cursor and ends after the first error.
    fn into_stream(self) -> impl Stream<Item = Result<Self::Item>>;
}

impl<C: Cursor + Unpin> CursorStreamExt for C {
    fn into_stream(self) -> impl Stream<Item = Result<Self::Item>> {
        use futures::stream;

        stream::unfold(Some(self), |opt_cursor| async move {
            let mut cursor = opt_cursor?;
            match cursor.next().await {
                Ok(Some(item)) => Some((Ok(item), Some(cursor))),
                Ok(None) => None,
                Err(e) => Some((Err(e), None)),
            }
        })
    }
}
