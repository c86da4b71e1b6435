//! Source abstraction
//!
//! The engine consumes the relational source through two seams:
//! - [`ExtractSource`]: domain-level operations (aggregate bounds,
//!   bounded partition cursors)
//! - [`SqlExecutor`]: a raw SQL-executing connection, adapted into an
//!   `ExtractSource` by [`SqlSource`] using the query builder
//!
//! The driver itself (connection handling, wire protocol) is an
//! external collaborator behind [`SqlExecutor`].

use std::future::Future;
use std::pin::Pin;

use async_trait::async_trait;

use crate::boundary::CheckBounds;
use crate::error::{Error, Result};
use crate::partition::PartitionRange;
use crate::query::ExtractQueryBuilder;
use crate::value::{Row, ValueKind};

/// Streaming row iterator over one bounded extraction query
pub trait RowStream: Send {
    /// Get the next row, `None` once the cursor is exhausted
    fn next(&mut self) -> Pin<Box<dyn Future<Output = Result<Option<Row>>> + Send + '_>>;
}

/// Domain-level source operations used by the engine
#[async_trait]
pub trait ExtractSource: Send + Sync {
    /// Aggregate MIN/MAX of `column` restricted to `column > lower`
    /// (unrestricted when `lower` is `None`); `Ok(None)` when the
    /// restricted range holds no rows
    async fn check_bounds(
        &self,
        column: &str,
        kind: ValueKind,
        lower: Option<&crate::value::CheckValue>,
    ) -> Result<Option<CheckBounds>>;

    /// Open a cursor over the rows whose check column falls inside
    /// `range`
    async fn open_partition(
        &self,
        column: &str,
        kind: ValueKind,
        range: &PartitionRange,
    ) -> Result<Box<dyn RowStream>>;
}

/// A connection capable of executing SQL text against the source
///
/// Implementations wrap the actual driver. Failures should be
/// reported as [`Error::SourceUnavailable`] so the orchestration
/// layer can classify them as retryable.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Execute a query and collect all rows
    async fn query(&self, sql: &str) -> Result<Vec<Row>>;

    /// Execute a query and stream rows
    async fn query_stream(&self, sql: &str) -> Result<Box<dyn RowStream>>;
}

/// SQL-backed [`ExtractSource`] over any [`SqlExecutor`]
///
/// Builds boundary and partition queries with
/// [`ExtractQueryBuilder`]. Note on lexical check columns: the range
/// predicates are pushed down as string comparisons, so the source
/// column's collation must agree with the engine's lexical order; the
/// engine's own comparison is authoritative for checkpoint
/// advancement.
pub struct SqlSource<E> {
    executor: E,
    builder: ExtractQueryBuilder,
}

impl<E: SqlExecutor> SqlSource<E> {
    /// Create a source over `executor` reading from `table`
    pub fn new(executor: E, builder: ExtractQueryBuilder) -> Self {
        Self { executor, builder }
    }

    /// Access the query builder
    pub fn builder(&self) -> &ExtractQueryBuilder {
        &self.builder
    }
}

#[async_trait]
impl<E: SqlExecutor> ExtractSource for SqlSource<E> {
    async fn check_bounds(
        &self,
        column: &str,
        kind: ValueKind,
        lower: Option<&crate::value::CheckValue>,
    ) -> Result<Option<CheckBounds>> {
        let sql = self.builder.bounds_sql(column, lower);
        let rows = self.executor.query(&sql).await?;
        let row = match rows.into_iter().next() {
            Some(row) => row,
            None => return Ok(None),
        };

        // MIN/MAX over an empty restricted range comes back as NULLs.
        let min = row
            .get(0)
            .ok_or_else(|| Error::internal("bounds query returned no columns"))?;
        let max = row
            .get(1)
            .ok_or_else(|| Error::internal("bounds query returned one column"))?;
        if min.is_null() || max.is_null() {
            return Ok(None);
        }

        Ok(Some(CheckBounds {
            low: min.clone().into_check(kind)?,
            high: max.clone().into_check(kind)?,
        }))
    }

    async fn open_partition(
        &self,
        column: &str,
        _kind: ValueKind,
        range: &PartitionRange,
    ) -> Result<Box<dyn RowStream>> {
        let sql = self.builder.partition_sql(column, range);
        self.executor.query_stream(&sql).await
    }
}
