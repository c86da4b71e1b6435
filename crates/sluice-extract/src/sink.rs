//! Destination row sink
//!
//! The sink is an external collaborator: append-only and
//! order-insensitive across partitions. The engine never stages writes
//! per run — when some partitions succeed and a sibling fails, their
//! rows are already durable on the destination while the checkpoint
//! stays put. The next run re-issues the same bounded query, so the
//! sink MUST tolerate re-delivery of those rows (idempotent writes or
//! an overwrite-safe layout).

use async_trait::async_trait;

use crate::error::Result;
use crate::value::Row;

/// Append-only destination for extracted rows
#[async_trait]
pub trait RowSink: Send + Sync {
    /// Write one row; failures fail the owning partition worker
    async fn write(&self, row: &Row) -> Result<()>;

    /// Flush buffered rows; called by each worker before it reports,
    /// including on failure paths
    async fn flush(&self) -> Result<()> {
        Ok(())
    }
}
