//! Boundary and partition query construction
//!
//! Builds the two query shapes the engine issues:
//! - the aggregate boundary query: `SELECT MIN(c), MAX(c) FROM t
//!   [WHERE c > last]`
//! - the bounded partition query: `SELECT ... WHERE c >(=) low AND
//!   c <= high ORDER BY c ASC`
//!
//! Identifiers are double-quoted; literals come from
//! [`CheckValue::to_literal`], which handles string escaping.

use crate::partition::PartitionRange;
use crate::value::CheckValue;

/// Builds boundary and partition SQL for one source table
#[derive(Debug, Clone)]
pub struct ExtractQueryBuilder {
    schema: Option<String>,
    table: String,
    columns: Option<Vec<String>>,
    where_clause: Option<String>,
}

impl ExtractQueryBuilder {
    /// Create a builder for `table`
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            columns: None,
            where_clause: None,
        }
    }

    /// Set the schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    /// Restrict the projection (default: all columns)
    pub fn with_columns(mut self, columns: Vec<String>) -> Self {
        self.columns = Some(columns);
        self
    }

    /// Add an extra WHERE clause ANDed into every partition query
    pub fn with_where(mut self, clause: impl Into<String>) -> Self {
        self.where_clause = Some(clause.into());
        self
    }

    /// The aggregate MIN/MAX boundary query, restricted to
    /// `column > lower` when a checkpoint is present
    pub fn bounds_sql(&self, column: &str, lower: Option<&CheckValue>) -> String {
        let col = quote_identifier(column);
        let mut conditions = Vec::new();
        if let Some(lower) = lower {
            conditions.push(format!("{} > {}", col, lower.to_literal()));
        }
        if let Some(clause) = &self.where_clause {
            conditions.push(format!("({})", clause));
        }
        format!(
            "SELECT MIN({col}), MAX({col}) FROM {table}{where_clause}",
            col = col,
            table = self.table_ref(),
            where_clause = where_sql(&conditions),
        )
    }

    /// The bounded extraction query for one partition
    pub fn partition_sql(&self, column: &str, range: &PartitionRange) -> String {
        let col = quote_identifier(column);
        let mut conditions = vec![
            format!(
                "{} {} {}",
                col,
                range.low_operator(),
                range.low.to_literal()
            ),
            format!("{} <= {}", col, range.high.to_literal()),
        ];
        if let Some(clause) = &self.where_clause {
            conditions.push(format!("({})", clause));
        }
        format!(
            "SELECT {cols} FROM {table}{where_clause} ORDER BY {col} ASC",
            cols = self.projection(),
            table = self.table_ref(),
            where_clause = where_sql(&conditions),
            col = col,
        )
    }

    fn projection(&self) -> String {
        match &self.columns {
            Some(cols) if !cols.is_empty() => cols
                .iter()
                .map(|c| quote_identifier(c))
                .collect::<Vec<_>>()
                .join(", "),
            _ => "*".to_owned(),
        }
    }

    fn table_ref(&self) -> String {
        match &self.schema {
            Some(s) => format!("{}.{}", quote_identifier(s), quote_identifier(&self.table)),
            None => quote_identifier(&self.table),
        }
    }
}

fn where_sql(conditions: &[String]) -> String {
    if conditions.is_empty() {
        String::new()
    } else {
        format!(" WHERE {}", conditions.join(" AND "))
    }
}

/// Quote an identifier (table, column name)
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}
