//! Range partitioning for parallel extraction
//!
//! Splits the resolved `[low, high]` extraction range into N disjoint,
//! ordered sub-ranges, one per worker. Integer and timestamp domains
//! split by linear interpolation (timestamps at nanosecond
//! granularity), so partitions are approximately equal-width even when
//! the value distribution is not uniform in row count. Lexical domains
//! have no meaningful arithmetic midpoint; they always collapse to a
//! single partition. That is an explicit policy choice, not a general
//! solution.

use chrono::DateTime;

use crate::boundary::CheckBounds;
use crate::error::{Error, Result};
use crate::value::CheckValue;

/// One bounded sub-range assigned to a single partition worker
///
/// The upper bound is always inclusive. Partitions produced by
/// [`Partitioner::split`] are disjoint and their union equals the
/// resolved extraction range.
#[derive(Debug, Clone, PartialEq)]
pub struct PartitionRange {
    /// Lower bound of the range
    pub low: CheckValue,
    /// Upper bound of the range (inclusive)
    pub high: CheckValue,
    /// Whether the lower bound itself belongs to the range
    pub low_inclusive: bool,
}

impl PartitionRange {
    /// SQL comparison operator for the lower bound
    #[inline]
    pub fn low_operator(&self) -> &'static str {
        if self.low_inclusive {
            ">="
        } else {
            ">"
        }
    }

    /// Whether a value falls inside this range
    pub fn contains(&self, value: &CheckValue) -> Result<bool> {
        let above = match value.compare(&self.low)? {
            std::cmp::Ordering::Greater => true,
            std::cmp::Ordering::Equal => self.low_inclusive,
            std::cmp::Ordering::Less => false,
        };
        Ok(above && value.compare(&self.high)? != std::cmp::Ordering::Greater)
    }
}

/// Splits an extraction range into disjoint sub-ranges
#[derive(Debug, Clone, Copy, Default)]
pub struct Partitioner;

impl Partitioner {
    /// Split `bounds` into at most `partitions` disjoint sub-ranges
    ///
    /// When a `checkpoint` is present the first partition's lower bound
    /// is the checkpoint itself, exclusive (strictly-greater), matching
    /// the incremental predicate `check_column > last_value`. All other
    /// partitions are inclusive of their lower bound. Without a
    /// checkpoint the first partition starts at `bounds.low`,
    /// inclusive.
    ///
    /// Degenerate cases: `low == high` yields exactly one partition
    /// containing the single value; a non-empty range never yields zero
    /// partitions. Narrow integer ranges may yield fewer than
    /// `partitions` sub-ranges rather than empty ones.
    pub fn split(
        bounds: &CheckBounds,
        checkpoint: Option<&CheckValue>,
        partitions: usize,
    ) -> Result<Vec<PartitionRange>> {
        if partitions == 0 {
            return Err(Error::config("partition count must be at least 1"));
        }
        if bounds.low.kind() != bounds.high.kind() {
            return Err(Error::internal(format!(
                "bounds kinds differ: {} vs {}",
                bounds.low.kind(),
                bounds.high.kind()
            )));
        }
        if let Some(cp) = checkpoint {
            if cp.kind() != bounds.low.kind() {
                return Err(Error::internal(format!(
                    "checkpoint kind {} differs from bounds kind {}",
                    cp.kind(),
                    bounds.low.kind()
                )));
            }
        }

        // Anchor of the whole range: the checkpoint (exclusive) when
        // present, otherwise the observed minimum (inclusive).
        let (anchor, anchor_inclusive) = match checkpoint {
            Some(cp) => (cp.clone(), false),
            None => (bounds.low.clone(), true),
        };

        let single = |anchor: CheckValue, inclusive: bool| {
            vec![PartitionRange {
                low: anchor,
                high: bounds.high.clone(),
                low_inclusive: inclusive,
            }]
        };

        if bounds.low.compare(&bounds.high)? == std::cmp::Ordering::Equal {
            return Ok(single(anchor, anchor_inclusive));
        }

        let cuts = match (&bounds.low, &bounds.high) {
            (CheckValue::Integer(lo), CheckValue::Integer(hi)) => {
                split_discrete(*lo, *hi, partitions)
                    .into_iter()
                    .map(|(a, b)| (CheckValue::Integer(a), CheckValue::Integer(b)))
                    .collect::<Vec<_>>()
            }
            (CheckValue::Timestamp(lo), CheckValue::Timestamp(hi)) => {
                match (lo.and_utc().timestamp_nanos_opt(), hi.and_utc().timestamp_nanos_opt()) {
                    (Some(lo_ns), Some(hi_ns)) => split_discrete(lo_ns, hi_ns, partitions)
                        .into_iter()
                        .map(|(a, b)| (nanos_to_check(a), nanos_to_check(b)))
                        .collect(),
                    // Outside chrono's nanosecond-representable span;
                    // one partition is always correct.
                    _ => return Ok(single(anchor, anchor_inclusive)),
                }
            }
            (CheckValue::Lexical(_), CheckValue::Lexical(_)) => {
                return Ok(single(anchor, anchor_inclusive));
            }
            _ => unreachable!("kinds verified above"),
        };

        let mut ranges = Vec::with_capacity(cuts.len());
        for (idx, (sub_low, sub_high)) in cuts.into_iter().enumerate() {
            if idx == 0 {
                ranges.push(PartitionRange {
                    low: anchor.clone(),
                    high: sub_high,
                    low_inclusive: anchor_inclusive,
                });
            } else {
                ranges.push(PartitionRange {
                    low: sub_low,
                    high: sub_high,
                    low_inclusive: true,
                });
            }
        }
        Ok(ranges)
    }
}

/// Split the inclusive discrete range `[low, high]` into up to `n`
/// contiguous inclusive sub-ranges of approximately equal width
fn split_discrete(low: i64, high: i64, n: usize) -> Vec<(i64, i64)> {
    debug_assert!(low < high);
    let span = (high as i128) - (low as i128) + 1;
    let n = (n as i128).min(span).max(1);

    let mut out = Vec::with_capacity(n as usize);
    for i in 0..n {
        let start = (low as i128) + span * i / n;
        let end = (low as i128) + span * (i + 1) / n - 1;
        out.push((start as i64, end as i64));
    }
    out
}

fn nanos_to_check(nanos: i64) -> CheckValue {
    // Safe: nanos came from timestamp_nanos_opt on a valid datetime,
    // and split points lie between the two endpoints.
    let dt = DateTime::from_timestamp_nanos(nanos);
    CheckValue::Timestamp(dt.naive_utc())
}
