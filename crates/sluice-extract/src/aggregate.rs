//! Checkpoint aggregation
//!
//! Reduces all worker results for a run into the single
//! new-checkpoint decision. The reduction is a commutative,
//! associative max fold, so worker completion order never matters.
//! Any failed worker forces "do not advance": advancing past data that
//! was never durably and completely written would cause silent data
//! loss on the next incremental run.

use std::cmp::Ordering;

use crate::error::{Error, Result};
use crate::value::CheckValue;
use crate::worker::{WorkerResult, WorkerStatus};

/// Outcome of a fully successful reduction
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateOutcome {
    /// Total rows extracted across all partitions
    pub rows_extracted: u64,
    /// New checkpoint value, `None` when no worker observed any row
    /// (empty delta: the checkpoint stays unchanged)
    pub new_checkpoint: Option<CheckValue>,
}

/// Reduces per-worker maxima into the global checkpoint decision
#[derive(Debug, Clone, Copy, Default)]
pub struct CheckpointAggregator;

impl CheckpointAggregator {
    /// Reduce all worker results
    ///
    /// Must be called with all N results of the run — the caller's
    /// join barrier is "wait for N of N", never "first success wins".
    /// Returns [`Error::PartialFailure`] if any worker failed; no
    /// checkpoint may be committed in that case. The partial failure
    /// stays retryable only when every failed partition was a
    /// transient source outage.
    pub fn reduce(results: &[WorkerResult]) -> Result<AggregateOutcome> {
        let mut reasons = Vec::new();
        let mut retriable = true;
        for result in results {
            if let WorkerStatus::Failed {
                reason,
                retriable: failure_retriable,
            } = &result.status
            {
                reasons.push(format!("partition {}: {}", result.partition, reason));
                retriable = retriable && *failure_retriable;
            }
        }
        if !reasons.is_empty() {
            return Err(Error::PartialFailure {
                failed: reasons.len(),
                total: results.len(),
                reasons,
                retriable,
            });
        }

        let mut rows_extracted = 0u64;
        let mut new_checkpoint: Option<CheckValue> = None;
        for result in results {
            rows_extracted += result.rows_extracted;
            if let Some(observed) = &result.observed_max {
                new_checkpoint = match new_checkpoint.take() {
                    None => Some(observed.clone()),
                    Some(current) => {
                        if observed.compare(&current)? == Ordering::Greater {
                            Some(observed.clone())
                        } else {
                            Some(current)
                        }
                    }
                };
            }
        }

        Ok(AggregateOutcome {
            rows_extracted,
            new_checkpoint,
        })
    }
}
