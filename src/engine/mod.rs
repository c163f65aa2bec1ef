//! SQL backend abstraction.
//!
//! The build pipeline is a sequence of awaited SQL round trips against
//! one logical connection. `SqlEngine` abstracts the backend; the
//! in-process DuckDB implementation lives in [`duckdb`]. A Postgres
//! implementation plugs in behind the same trait without touching the
//! builders.

pub mod duckdb;

use async_trait::async_trait;

use crate::error::BuildResult;
use crate::sql::Dialect;

pub use duckdb::DuckDbEngine;

/// Rows appended per bulk batch.
pub const BULK_BATCH_SIZE: usize = 200_000;

/// A single cell travelling to or from the backend.
#[derive(Debug, Clone, PartialEq)]
pub enum CellValue {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Text(String),
}

impl CellValue {
    /// Render for text exports. NULL renders empty.
    pub fn render(&self) -> String {
        match self {
            CellValue::Null => String::new(),
            CellValue::Bool(b) => b.to_string(),
            CellValue::Int(n) => {
                let mut buf = itoa::Buffer::new();
                buf.format(*n).to_string()
            }
            CellValue::Float(f) => {
                let mut buf = ryu::Buffer::new();
                buf.format(*f).to_string()
            }
            CellValue::Text(s) => s.clone(),
        }
    }

    pub fn is_null(&self) -> bool {
        matches!(self, CellValue::Null)
    }

    /// Text content when the cell is textual.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            CellValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            CellValue::Int(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            CellValue::Float(f) => Some(*f),
            CellValue::Int(n) => Some(*n as f64),
            _ => None,
        }
    }
}

impl From<&str> for CellValue {
    fn from(s: &str) -> Self {
        CellValue::Text(s.into())
    }
}

impl From<String> for CellValue {
    fn from(s: String) -> Self {
        CellValue::Text(s)
    }
}

impl From<i64> for CellValue {
    fn from(n: i64) -> Self {
        CellValue::Int(n)
    }
}

impl From<f64> for CellValue {
    fn from(f: f64) -> Self {
        CellValue::Float(f)
    }
}

impl<T: Into<CellValue>> From<Option<T>> for CellValue {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => CellValue::Null,
        }
    }
}

/// A query result: column names plus rows.
#[derive(Debug, Clone, Default)]
pub struct RowSet {
    pub columns: Vec<String>,
    pub rows: Vec<Vec<CellValue>>,
}

impl RowSet {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// First cell of the first row, for scalar queries.
    pub fn scalar(&self) -> Option<&CellValue> {
        self.rows.first().and_then(|r| r.first())
    }

    /// Index of a named column.
    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }
}

/// Async SQL backend.
///
/// Implementations must keep statements from one caller strictly
/// ordered; the controller never interleaves writes to a revision
/// schema across connections.
#[async_trait]
pub trait SqlEngine: Send + Sync {
    /// Dialect the engine's SQL must be serialized for.
    fn dialect(&self) -> Dialect;

    /// Execute one statement, returning the affected row count.
    async fn execute(&self, sql: &str) -> BuildResult<u64>;

    /// Execute several statements in order.
    async fn execute_all(&self, statements: &[String]) -> BuildResult<()> {
        for sql in statements {
            self.execute(sql).await?;
        }
        Ok(())
    }

    /// Run a query and collect the full result set.
    async fn query(&self, sql: &str) -> BuildResult<RowSet>;

    /// Bulk-append literal rows, batching every [`BULK_BATCH_SIZE`] rows.
    async fn append_rows(
        &self,
        schema: &str,
        table: &str,
        rows: Vec<Vec<CellValue>>,
    ) -> BuildResult<u64>;
}
