//! Run entry point
//!
//! One call per job execution: checkpoint parse → boundary resolve →
//! partition → N parallel workers → aggregate → atomic checkpoint
//! commit. Workers run as independent tokio tasks sharing no mutable
//! state; the only synchronization point is the N-of-N join barrier in
//! front of the aggregator.

use std::sync::Arc;

use futures::future::join_all;
use tokio::sync::broadcast;
use tracing::{info, warn};

use crate::aggregate::CheckpointAggregator;
use crate::boundary::BoundaryResolver;
use crate::checkpoint::CheckpointStore;
use crate::error::{Error, Result};
use crate::partition::Partitioner;
use crate::sink::RowSink;
use crate::source::ExtractSource;
use crate::value::{CheckValue, ValueKind};
use crate::worker::{PartitionWorker, WorkerResult, WorkerStatus};

/// How a successful run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunStatus {
    /// Rows were extracted and the checkpoint advanced
    Completed,
    /// No rows lay beyond the checkpoint; nothing written, checkpoint
    /// unchanged
    EmptyDelta,
}

/// Result of one successful run
#[derive(Debug, Clone, PartialEq)]
pub struct RunOutcome {
    /// Total rows extracted across all partitions
    pub rows_extracted: u64,
    /// New recorded checkpoint value in config-string form; `None`
    /// when the checkpoint is unchanged
    pub new_last_value: Option<String>,
    /// Terminal status
    pub status: RunStatus,
}

/// Incremental-extraction engine
///
/// Holds the three collaborators for the lifetime of the job: the
/// source, the destination sink, and the checkpoint store. Each call
/// to [`extract`](Self::extract) is one complete run.
pub struct ExtractEngine {
    source: Arc<dyn ExtractSource>,
    sink: Arc<dyn RowSink>,
    store: Arc<dyn CheckpointStore>,
    shutdown: broadcast::Sender<()>,
}

impl ExtractEngine {
    /// Create an engine over the given collaborators
    pub fn new(
        source: Arc<dyn ExtractSource>,
        sink: Arc<dyn RowSink>,
        store: Arc<dyn CheckpointStore>,
    ) -> Self {
        let (shutdown, _) = broadcast::channel(1);
        Self {
            source,
            sink,
            store,
            shutdown,
        }
    }

    /// Request cancellation of the in-flight run
    ///
    /// Workers stop issuing further fetches and report
    /// `Failed("cancelled")`; the aggregator treats that like any
    /// other failure, so no checkpoint is committed.
    pub fn shutdown(&self) {
        let _ = self.shutdown.send(());
    }

    /// Load the checkpoint from the store and run one extraction
    ///
    /// Convenience wrapper around [`extract`](Self::extract) for
    /// jobs whose checkpoint lives in the configured store.
    pub async fn run_incremental(&self, kind: ValueKind, partitions: usize) -> Result<RunOutcome> {
        let checkpoint = self.store.load(kind).await?;
        let last_value = checkpoint.last_value.as_ref().map(|v| v.to_string());
        self.extract(
            &checkpoint.check_column,
            kind,
            last_value.as_deref(),
            partitions,
        )
        .await
    }

    /// Run one incremental extraction
    ///
    /// Extracts exactly the rows with `check_column > last_value`
    /// (all rows when `last_value` is absent) and, if every partition
    /// succeeds, atomically commits the maximum observed value as the
    /// new checkpoint. On any failure the stored checkpoint is left
    /// untouched.
    pub async fn extract(
        &self,
        check_column: &str,
        kind: ValueKind,
        last_value: Option<&str>,
        partitions: usize,
    ) -> Result<RunOutcome> {
        if check_column.is_empty() {
            return Err(Error::config("check column must not be empty"));
        }

        let checkpoint = match last_value {
            Some(text) => Some(CheckValue::parse(kind, text)?),
            None => None,
        };

        info!(
            column = check_column,
            %kind,
            last_value = ?checkpoint,
            partitions,
            "starting incremental extraction"
        );

        let bounds =
            BoundaryResolver::resolve(self.source.as_ref(), check_column, kind, checkpoint.as_ref())
                .await?;
        let bounds = match bounds {
            Some(bounds) => bounds,
            None => {
                info!(column = check_column, "empty delta, checkpoint unchanged");
                return Ok(RunOutcome {
                    rows_extracted: 0,
                    new_last_value: None,
                    status: RunStatus::EmptyDelta,
                });
            }
        };

        let ranges = Partitioner::split(&bounds, checkpoint.as_ref(), partitions)?;
        let total = ranges.len();

        let handles: Vec<_> = ranges
            .into_iter()
            .enumerate()
            .map(|(idx, range)| {
                let worker = PartitionWorker::new(idx, check_column, kind, range);
                let source = Arc::clone(&self.source);
                let sink = Arc::clone(&self.sink);
                let shutdown = self.shutdown.subscribe();
                tokio::spawn(worker.run(source, sink, shutdown))
            })
            .collect();

        // N-of-N barrier: the aggregator must observe every result,
        // success or failure, before the commit decision.
        let results: Vec<WorkerResult> = join_all(handles)
            .await
            .into_iter()
            .enumerate()
            .map(|(idx, joined)| {
                joined.unwrap_or_else(|e| {
                    warn!(partition = idx, error = %e, "worker task panicked");
                    WorkerResult {
                        partition: idx,
                        rows_extracted: 0,
                        observed_max: None,
                        status: WorkerStatus::Failed {
                            reason: format!("worker task failed: {e}"),
                            retriable: false,
                        },
                    }
                })
            })
            .collect();

        let outcome = CheckpointAggregator::reduce(&results)?;

        let new_last_value = match &outcome.new_checkpoint {
            Some(value) => {
                self.store.commit(check_column, value).await?;
                info!(
                    column = check_column,
                    rows = outcome.rows_extracted,
                    partitions = total,
                    new_last_value = %value,
                    "extraction complete, checkpoint advanced"
                );
                Some(value.to_string())
            }
            None => {
                info!(
                    column = check_column,
                    partitions = total,
                    "extraction complete with no rows, checkpoint unchanged"
                );
                None
            }
        };

        let status = if outcome.rows_extracted > 0 {
            RunStatus::Completed
        } else {
            RunStatus::EmptyDelta
        };

        Ok(RunOutcome {
            rows_extracted: outcome.rows_extracted,
            new_last_value,
            status,
        })
    }
}
