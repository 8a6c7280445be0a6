//! Prepared statements over an engine session.

use std::sync::Arc;

use tracing::debug;

use crate::batch::{execute_many, BatchOutcome};
use crate::cancel::CancelToken;
use crate::config::StatementConfig;
use crate::cursor::ResultSet;
use crate::engine::{Engine, ResultSetHandle, StatementHandle};
use crate::error::{Error, Result};
use crate::protocol::bind::{encode_params, BindSpec, Param};
use crate::protocol::types::{ColumnDescriptor, ColumnInfo};

/// A statement prepared on an engine session.
///
/// Parameters are encoded by `bind()` and consumed by the next `execute()` or
/// `query()`. The statement borrows the session mutably for its lifetime.
///
/// A result set from `query()` that is dropped before it is exhausted or
/// closed leaves its engine cursor open until the statement's next
/// `describe()`, `execute()` or `query()`. Dropping the statement itself
/// does not close it.
///
/// # Example
///
/// ```no_run
/// use ora_marshal::{ColumnMetadata, LoopbackEngine, Param, Statement};
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let mut engine = LoopbackEngine::new(vec![ColumnMetadata::new("ID", 2)])?;
///     let mut stmt = Statement::prepare(&mut engine, "INSERT INTO t VALUES (:1)").await?;
///     stmt.bind(vec![Param::batch(vec![1i64, 2, 3])])?;
///     let outcome = stmt.execute().await?;
///     assert_eq!(outcome.total(), 3);
///     Ok(())
/// }
/// ```
pub struct Statement<'e, E: Engine> {
    engine: &'e mut E,
    sql: String,
    handle: StatementHandle,
    config: StatementConfig,
    cancel: CancelToken,
    binds: Vec<BindSpec>,
    abandoned: Option<ResultSetHandle>,
}

impl<'e, E: Engine> Statement<'e, E> {
    /// Prepare `sql` with the default configuration.
    pub async fn prepare(engine: &'e mut E, sql: &str) -> Result<Self> {
        Self::prepare_with_config(engine, sql, StatementConfig::default()).await
    }

    /// Prepare `sql` with an explicit configuration.
    pub async fn prepare_with_config(
        engine: &'e mut E,
        sql: &str,
        config: StatementConfig,
    ) -> Result<Self> {
        config.validate()?;
        let handle = engine.prepare(sql).await?;
        debug!(handle = handle.0, "statement prepared");
        Ok(Self {
            engine,
            sql: sql.to_string(),
            handle,
            config,
            cancel: CancelToken::new(),
            binds: Vec::new(),
            abandoned: None,
        })
    }

    /// SQL text.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// Engine handle.
    pub fn handle(&self) -> StatementHandle {
        self.handle
    }

    /// Statement configuration.
    pub fn config(&self) -> &StatementConfig {
        &self.config
    }

    /// Mutable statement configuration.
    ///
    /// Changes apply to result sets opened afterwards.
    pub fn config_mut(&mut self) -> &mut StatementConfig {
        &mut self.config
    }

    /// Token observed by LOB transfers of this statement.
    pub fn cancel_token(&self) -> CancelToken {
        self.cancel.clone()
    }

    /// Replace the cancellation token.
    pub fn set_cancel_token(&mut self, cancel: CancelToken) {
        self.cancel = cancel;
    }

    /// Encode parameters for the next execution.
    ///
    /// Replaces any parameters bound earlier.
    pub fn bind(&mut self, params: Vec<Param>) -> Result<&[BindSpec]> {
        self.binds = encode_params(params, E::BUFFER_ALIGNMENT)?;
        Ok(&self.binds)
    }

    /// Currently bound parameters.
    pub fn binds(&self) -> &[BindSpec] {
        &self.binds
    }

    /// Close the cursor of a result set dropped while open.
    async fn close_abandoned(&mut self) -> Result<()> {
        if let Some(handle) = self.abandoned.take() {
            debug!(handle = handle.0, "closing abandoned result set");
            self.engine.close_result_set(handle).await?;
        }
        Ok(())
    }

    /// Describe the columns the statement returns.
    pub async fn describe(&mut self) -> Result<Vec<ColumnDescriptor>> {
        self.close_abandoned().await?;
        self.engine.describe(&self.sql).await
    }

    /// Execute with the bound parameters, one engine round trip for all rows.
    pub async fn execute(&mut self) -> Result<BatchOutcome> {
        self.close_abandoned().await?;
        let binds = std::mem::take(&mut self.binds);
        execute_many(&mut *self.engine, self.handle, binds, &self.config, &self.cancel).await
    }

    /// Execute a query and open its result set.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use ora_marshal::{ColumnMetadata, Cursor, LoopbackEngine, Statement};
    ///
    /// #[tokio::main]
    /// async fn main() -> Result<(), Box<dyn std::error::Error>> {
    ///     let mut engine = LoopbackEngine::new(vec![ColumnMetadata::new("ID", 2)])?;
    ///     let mut stmt = Statement::prepare(&mut engine, "SELECT id FROM t").await?;
    ///     let mut rs = stmt.query().await?;
    ///     while let Some(row) = rs.next().await? {
    ///         println!("{:?}", row.values());
    ///     }
    ///     Ok(())
    /// }
    /// ```
    pub async fn query(&mut self) -> Result<ResultSet<'_, E>> {
        self.close_abandoned().await?;
        // Describe first so the defines exist before any row arrives
        let columns = Arc::new(ColumnInfo::new(self.engine.describe(&self.sql).await?));
        let outcome = self.execute().await?;
        let handle = outcome.result_set.ok_or(Error::NoResultSet)?;
        let rset = ResultSet::open(
            &mut *self.engine,
            handle,
            columns,
            &self.config,
            self.cancel.clone(),
        )?;
        Ok(rset.on_abandon(&mut self.abandoned))
    }
}
