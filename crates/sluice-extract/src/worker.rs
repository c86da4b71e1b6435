//! Partition worker
//!
//! One worker per partition: executes the bounded extraction query,
//! streams rows to the sink, and folds the running maximum
//! check-column value from the rows it personally consumed. No second
//! aggregate query is issued — every row already passed through the
//! worker, and re-aggregating over the range would double the source
//! load.
//!
//! Workers share no mutable state. Each owns its cursor and its
//! running-maximum accumulator; cross-partition ordering is enforced
//! only at the aggregator.

use std::cmp::Ordering;
use std::sync::Arc;

use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::error::Error;
use crate::partition::PartitionRange;
use crate::sink::RowSink;
use crate::source::ExtractSource;
use crate::value::{CheckValue, ValueKind};

/// Terminal status of one partition worker
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerStatus {
    /// All rows in the partition were extracted and written
    Success,
    /// Extraction stopped; already-sent rows were flushed
    Failed {
        /// Why the worker failed
        reason: String,
        /// Whether the failure was a transient source outage, per
        /// [`Error::is_retriable`](crate::error::Error::is_retriable)
        retriable: bool,
    },
}

impl WorkerStatus {
    /// Whether the worker finished successfully
    #[inline]
    pub fn is_success(&self) -> bool {
        matches!(self, Self::Success)
    }
}

/// What one worker observed and reported to the aggregator
///
/// Owned exclusively by its worker until reported; immutable after.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkerResult {
    /// Partition index within the run
    pub partition: usize,
    /// Rows extracted and written by this worker
    pub rows_extracted: u64,
    /// Maximum check-column value this worker personally observed
    pub observed_max: Option<CheckValue>,
    /// Terminal status
    pub status: WorkerStatus,
}

/// Executes one bounded extraction
#[derive(Debug)]
pub struct PartitionWorker {
    partition: usize,
    column: String,
    kind: ValueKind,
    range: PartitionRange,
}

impl PartitionWorker {
    /// Create a worker for one partition of `column`
    pub fn new(partition: usize, column: impl Into<String>, kind: ValueKind, range: PartitionRange) -> Self {
        Self {
            partition,
            column: column.into(),
            kind,
            range,
        }
    }

    /// Run the extraction to completion or failure
    ///
    /// Never returns `Err`: every outcome, including cancellation via
    /// `shutdown`, is encoded in the [`WorkerResult`] status so the
    /// aggregator always observes N of N results. The worker does not
    /// retry internally; retry policy belongs to the orchestration
    /// layer.
    pub async fn run(
        self,
        source: Arc<dyn ExtractSource>,
        sink: Arc<dyn RowSink>,
        mut shutdown: broadcast::Receiver<()>,
    ) -> WorkerResult {
        let mut rows_extracted = 0u64;
        let mut observed_max: Option<CheckValue> = None;

        let mut stream = match source
            .open_partition(&self.column, self.kind, &self.range)
            .await
        {
            Ok(stream) => stream,
            Err(e) => {
                warn!(partition = self.partition, error = %e, "failed to open partition cursor");
                return self.finish(rows_extracted, observed_max, Some(failure_of(&e)));
            }
        };

        let failure = loop {
            let row = tokio::select! {
                biased;
                _ = shutdown.recv() => break Some(("cancelled".to_owned(), false)),
                row = stream.next() => row,
            };

            let row = match row {
                Ok(Some(row)) => row,
                Ok(None) => break None,
                Err(e) => break Some(failure_of(&e)),
            };

            let check = match row.get_by_name(&self.column) {
                Some(value) => match value.clone().into_check(self.kind) {
                    Ok(check) => check,
                    Err(e) => break Some(failure_of(&e)),
                },
                None => {
                    break Some((
                        format!("check column {:?} missing from row", self.column),
                        false,
                    ))
                }
            };

            if let Err(e) = sink.write(&row).await {
                break Some(failure_of(&e));
            }
            rows_extracted += 1;

            observed_max = match observed_max.take() {
                None => Some(check),
                Some(current) => match check.compare(&current) {
                    Ok(Ordering::Greater) => Some(check),
                    Ok(_) => Some(current),
                    Err(e) => break Some(failure_of(&e)),
                },
            };
        };

        // Flush whatever was already sent, even on the failure path.
        if let Err(e) = sink.flush().await {
            warn!(partition = self.partition, error = %e, "sink flush failed");
            return self.finish(
                rows_extracted,
                observed_max,
                Some(failure.unwrap_or_else(|| failure_of(&e))),
            );
        }

        self.finish(rows_extracted, observed_max, failure)
    }

    fn finish(
        self,
        rows_extracted: u64,
        observed_max: Option<CheckValue>,
        failure: Option<(String, bool)>,
    ) -> WorkerResult {
        let status = match failure {
            None => {
                debug!(
                    partition = self.partition,
                    rows = rows_extracted,
                    max = ?observed_max,
                    "partition complete"
                );
                WorkerStatus::Success
            }
            Some((reason, retriable)) => {
                warn!(partition = self.partition, rows = rows_extracted, %reason, "partition failed");
                WorkerStatus::Failed { reason, retriable }
            }
        };
        WorkerResult {
            partition: self.partition,
            rows_extracted,
            observed_max,
            status,
        }
    }
}

/// Failure reason plus its retriability classification
fn failure_of(e: &Error) -> (String, bool) {
    (e.to_string(), e.is_retriable())
}
