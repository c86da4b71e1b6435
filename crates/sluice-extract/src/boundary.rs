//! Boundary resolution for the extraction range
//!
//! Issues the single aggregate MIN/MAX query that sizes the extraction
//! range before partitioning. An empty restricted range is a valid,
//! non-error terminal state: the run succeeds trivially and the
//! checkpoint is left unchanged.

use tracing::debug;

use crate::error::Result;
use crate::source::ExtractSource;
use crate::value::{CheckValue, ValueKind};

/// The observed minimum and maximum of the check column within the
/// extraction range
#[derive(Debug, Clone, PartialEq)]
pub struct CheckBounds {
    /// Minimum check-column value beyond the checkpoint
    pub low: CheckValue,
    /// Maximum check-column value beyond the checkpoint
    pub high: CheckValue,
}

/// Resolves the extraction range against the source
#[derive(Debug, Clone, Copy, Default)]
pub struct BoundaryResolver;

impl BoundaryResolver {
    /// Query the current MIN/MAX of `column` restricted to
    /// `column > checkpoint` (unrestricted when no checkpoint)
    ///
    /// Returns `Ok(None)` when no rows lie beyond the checkpoint.
    /// Source failures surface as
    /// [`Error::SourceUnavailable`](crate::error::Error::SourceUnavailable)
    /// and abort the run with the checkpoint untouched.
    pub async fn resolve(
        source: &dyn ExtractSource,
        column: &str,
        kind: ValueKind,
        checkpoint: Option<&CheckValue>,
    ) -> Result<Option<CheckBounds>> {
        let bounds = source.check_bounds(column, kind, checkpoint).await?;
        match &bounds {
            Some(b) => debug!(
                column,
                low = %b.low,
                high = %b.high,
                "resolved extraction range"
            ),
            None => debug!(column, "no rows beyond checkpoint"),
        }
        Ok(bounds)
    }
}
