//! # sluice-extract
//!
//! Checkpoint-driven incremental extraction from relational sources.
//!
//! Given a check column and the value recorded by the previous run,
//! the engine extracts only the rows strictly beyond that checkpoint —
//! for integer, lexically ordered string, and timestamp columns — in
//! parallel disjoint partitions, and atomically advances the
//! checkpoint to the maximum value observed across all extracted rows.
//! A failed or partial run never advances the checkpoint.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use sluice_extract::prelude::*;
//! use std::sync::Arc;
//!
//! let source = Arc::new(SqlSource::new(executor, ExtractQueryBuilder::new("releases")));
//! let store = Arc::new(ConfigCheckpointStore::new(job_config));
//! let engine = ExtractEngine::new(source, sink, store);
//!
//! let outcome = engine
//!     .extract("id", ValueKind::Integer, Some("9"), 4)
//!     .await?;
//! assert_eq!(outcome.new_last_value.as_deref(), Some("19"));
//! ```
//!
//! ## Pipeline
//!
//! checkpoint store → boundary resolver → partitioner → N parallel
//! partition workers → checkpoint aggregator → checkpoint store.
//!
//! The source driver, the destination writer, and the orchestration
//! layer (scheduling, retries) are external collaborators behind the
//! [`SqlExecutor`](source::SqlExecutor), [`RowSink`](sink::RowSink),
//! and [`CheckpointStore`](checkpoint::CheckpointStore) traits.

#![warn(missing_docs)]
#![warn(clippy::all)]
#![deny(unsafe_code)]

pub mod aggregate;
pub mod boundary;
pub mod checkpoint;
pub mod config;
pub mod engine;
pub mod error;
pub mod partition;
pub mod query;
pub mod sink;
pub mod source;
pub mod value;
pub mod worker;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::aggregate::{AggregateOutcome, CheckpointAggregator};
    pub use crate::boundary::{BoundaryResolver, CheckBounds};
    pub use crate::checkpoint::{Checkpoint, CheckpointStore, ConfigCheckpointStore};
    pub use crate::config::{JobConfig, CHECK_COLUMN_KEY, LAST_VALUE_KEY};
    pub use crate::engine::{ExtractEngine, RunOutcome, RunStatus};
    pub use crate::error::{Error, Result};
    pub use crate::partition::{PartitionRange, Partitioner};
    pub use crate::query::ExtractQueryBuilder;
    pub use crate::sink::RowSink;
    pub use crate::source::{ExtractSource, RowStream, SqlExecutor, SqlSource};
    pub use crate::value::{CheckValue, Row, Value, ValueKind};
    pub use crate::worker::{PartitionWorker, WorkerResult, WorkerStatus};
}
