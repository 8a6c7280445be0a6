//! Oracle bind/define marshaling core
//!
//! Converts host values into Oracle wire buffers for parameter binding and
//! decodes fetched column buffers back into host values. Large objects are
//! moved in fixed-size chunks; batches bind N rows in one engine round trip.
//! The native session sits behind the [`Engine`] trait; [`LoopbackEngine`]
//! is an in-memory implementation.
//!
//! # Example
//!
//! ```no_run
//! use ora_marshal::{ColumnMetadata, Cursor, LoopbackEngine, Param, Result, Statement};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let mut engine = LoopbackEngine::new(vec![
//!         ColumnMetadata::new("ID", 2).with_precision(10, 0),
//!         ColumnMetadata::new("NAME", 1).with_max_size(30),
//!     ])?;
//!
//!     // Bind three rows at once
//!     let mut insert = Statement::prepare(&mut engine, "INSERT INTO t VALUES (:1, :2)").await?;
//!     insert.bind(vec![
//!         Param::batch(vec![1i64, 2, 3]),
//!         Param::batch(vec!["one", "two", "three"]),
//!     ])?;
//!     insert.execute().await?;
//!
//!     let mut select = Statement::prepare(&mut engine, "SELECT id, name FROM t").await?;
//!     let mut rows = select.query().await?;
//!     while let Some(row) = rows.next().await? {
//!         println!("{:?}", row.values());
//!     }
//!     Ok(())
//! }
//! ```

pub mod batch;
pub mod cancel;
pub mod config;
pub mod cursor;
pub mod engine;
pub mod error;
pub mod loopback;
pub mod protocol;
pub mod statement;

// Re-export main types
pub use batch::{execute_many, BatchOutcome};
pub use cancel::CancelToken;
pub use config::{
    set_numeric_mode, BytesForm, NumberCategory, NumericMode, NumericScope, RsetConfig,
    StatementConfig,
};
pub use cursor::{Cursor, CursorStreamExt, ResultSet};
pub use engine::{ChunkRead, Engine, ExecuteOutcome, ResultSetHandle, RowError, StatementHandle};
pub use error::{Error, Result};
pub use loopback::{LoopbackEngine, LoopbackStats};
pub use protocol::bind::{bind, BindSpec, Indicator, Param, ParamValues};
pub use protocol::define::DefineSpec;
pub use protocol::types::{
    ColumnDescriptor, ColumnInfo, ColumnKind, ColumnMetadata, HostValue, LobLocator, Numeric,
    Record,
};
pub use statement::Statement;
