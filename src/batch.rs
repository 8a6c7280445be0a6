//! Batch coordination: one engine round trip for N rows.
//!
//! Streamed parameters are uploaded to temporary LOBs first, the statement is
//! executed once with every row bound, and the temporary LOBs are released
//! whatever the outcome.

use tracing::{debug, warn};

use crate::cancel::CancelToken;
use crate::config::StatementConfig;
use crate::engine::{Engine, ResultSetHandle, StatementHandle};
use crate::error::{Error, Result};
use crate::protocol::bind::BindSpec;
use crate::protocol::chunk::{write_lob, TransferStats};

/// Index-aligned result of a batch execution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BatchOutcome {
    /// Rows affected, entry `i` belongs to bound row `i`.
    pub row_counts: Vec<u64>,
    /// Result set opened by a query.
    pub result_set: Option<ResultSetHandle>,
    /// Totals of the LOB uploads done for this execution.
    pub uploaded: TransferStats,
}

impl BatchOutcome {
    /// Number of rows reported.
    pub fn rows(&self) -> usize {
        self.row_counts.len()
    }

    /// Rows affected by bound row `row`.
    pub fn row_count(&self, row: usize) -> Option<u64> {
        self.row_counts.get(row).copied()
    }

    /// Sum of affected rows.
    pub fn total(&self) -> u64 {
        self.row_counts.iter().sum()
    }
}

/// Execute `stmt` once for every row carried by `binds`.
///
/// The first failed row surfaces as `BatchPartialFailure` wrapping the
/// engine's error for that row.
pub async fn execute_many<E: Engine>(
    engine: &mut E,
    stmt: StatementHandle,
    mut binds: Vec<BindSpec>,
    config: &StatementConfig,
    cancel: &CancelToken,
) -> Result<BatchOutcome> {
    let rows = binds.first().map(BindSpec::rows);
    if let Some(expected) = rows {
        if let Some(other) = binds.iter().map(BindSpec::rows).find(|&n| n != expected) {
            return Err(Error::BatchSizeMismatch {
                expected,
                actual: other,
            });
        }
    }

    let mut uploaded = TransferStats::default();
    let result = match upload_lobs(engine, &mut binds, config, cancel, &mut uploaded).await {
        Ok(()) => engine.execute_bind(stmt, &binds).await,
        Err(e) => Err(e),
    };
    release_lobs(engine, &mut binds).await;
    let outcome = result?;

    if let Some(first) = outcome.row_errors.iter().min_by_key(|e| e.row) {
        warn!(
            row = first.row,
            code = first.code,
            failed = outcome.row_errors.len(),
            "batch row rejected"
        );
        return Err(Error::BatchPartialFailure {
            row: first.row,
            source: Box::new(Error::oracle(first.code, first.message.clone())),
        });
    }

    if outcome.result_set.is_none() {
        if let Some(expected) = rows {
            if outcome.row_counts.len() != expected {
                return Err(Error::BatchSizeMismatch {
                    expected,
                    actual: outcome.row_counts.len(),
                });
            }
        }
    }

    debug!(
        rows = outcome.row_counts.len(),
        lob_chunks = uploaded.chunks,
        query = outcome.result_set.is_some(),
        "batch executed"
    );
    Ok(BatchOutcome {
        row_counts: outcome.row_counts,
        result_set: outcome.result_set,
        uploaded,
    })
}

async fn upload_lobs<E: Engine>(
    engine: &mut E,
    binds: &mut [BindSpec],
    config: &StatementConfig,
    cancel: &CancelToken,
    totals: &mut TransferStats,
) -> Result<()> {
    for spec in binds.iter_mut().filter(|s| s.is_streamed()) {
        for row in 0..spec.rows() {
            let Some(data) = spec.streamed_value(row).cloned() else {
                continue;
            };
            let lob = engine.create_temp_lob(spec.kind()).await?;
            let stats = write_lob(
                engine,
                &lob,
                &data,
                config.lob_chunk_size,
                cancel,
                config.lob_timeout,
            )
            .await
            .map_err(|e| e.at(spec.position(), row))?;
            totals.chunks += stats.chunks;
            totals.bytes += stats.bytes;
            spec.set_lob(row, lob);
        }
    }
    Ok(())
}

async fn release_lobs<E: Engine>(engine: &mut E, binds: &mut [BindSpec]) {
    for spec in binds.iter_mut() {
        for lob in spec.take_lobs() {
            if let Err(e) = engine.close_lob(&lob).await {
                warn!(param = spec.position(), error = %e, "failed to release temporary LOB");
            }
        }
    }
}
