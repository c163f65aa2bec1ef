//! In-process DuckDB engine.
//!
//! DuckDB connections are blocking, so the engine runs one dedicated
//! thread that owns the connection and serves requests over an mpsc
//! channel; each request carries a oneshot for its reply. Statement
//! order on the channel is the causal order the controller relies on.

use std::path::Path;
use std::thread;

use duckdb::Connection;
use tokio::sync::{mpsc, oneshot};

use super::{CellValue, RowSet, SqlEngine, BULK_BATCH_SIZE};
use crate::error::{BuildError, BuildResult};
use crate::sql::Dialect;

enum Request {
    Execute {
        sql: String,
        reply: oneshot::Sender<Result<u64, String>>,
    },
    Query {
        sql: String,
        reply: oneshot::Sender<Result<RowSet, String>>,
    },
    Append {
        schema: String,
        table: String,
        rows: Vec<Vec<CellValue>>,
        reply: oneshot::Sender<Result<u64, String>>,
    },
}

/// `SqlEngine` over an in-process DuckDB database.
pub struct DuckDbEngine {
    sender: mpsc::UnboundedSender<Request>,
    // Joined implicitly on drop: closing the channel ends the loop.
    _worker: thread::JoinHandle<()>,
}

impl DuckDbEngine {
    /// Open an in-memory database (tests, previews).
    pub fn open_in_memory() -> BuildResult<Self> {
        Self::spawn(None)
    }

    /// Open or create a database file.
    pub fn open(path: impl AsRef<Path>) -> BuildResult<Self> {
        Self::spawn(Some(path.as_ref().to_path_buf()))
    }

    fn spawn(path: Option<std::path::PathBuf>) -> BuildResult<Self> {
        let (sender, mut receiver) = mpsc::unbounded_channel::<Request>();
        let (ready_tx, ready_rx) = std::sync::mpsc::channel::<Result<(), String>>();

        let worker = thread::Builder::new()
            .name("duckdb-engine".into())
            .spawn(move || {
                let conn = match &path {
                    Some(p) => Connection::open(p),
                    None => Connection::open_in_memory(),
                };
                let conn = match conn {
                    Ok(conn) => {
                        let _ = ready_tx.send(Ok(()));
                        conn
                    }
                    Err(e) => {
                        let _ = ready_tx.send(Err(e.to_string()));
                        return;
                    }
                };

                while let Some(request) = receiver.blocking_recv() {
                    match request {
                        Request::Execute { sql, reply } => {
                            let _ = reply.send(run_execute(&conn, &sql));
                        }
                        Request::Query { sql, reply } => {
                            let _ = reply.send(run_query(&conn, &sql));
                        }
                        Request::Append {
                            schema,
                            table,
                            rows,
                            reply,
                        } => {
                            let _ = reply.send(run_append(&conn, &schema, &table, rows));
                        }
                    }
                }
            })
            .map_err(|e| BuildError::UnknownError(format!("engine thread spawn: {e}")))?;

        ready_rx
            .recv()
            .map_err(|_| BuildError::Backend("engine thread exited before ready".into()))?
            .map_err(BuildError::Backend)?;

        Ok(Self {
            sender,
            _worker: worker,
        })
    }

    async fn send<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<Result<T, String>>) -> Request,
    ) -> BuildResult<T> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.sender
            .send(build(reply_tx))
            .map_err(|_| BuildError::Backend("engine thread has shut down".into()))?;
        reply_rx
            .await
            .map_err(|_| BuildError::Backend("engine dropped the request".into()))?
            .map_err(BuildError::Backend)
    }
}

#[async_trait::async_trait]
impl SqlEngine for DuckDbEngine {
    fn dialect(&self) -> Dialect {
        Dialect::DuckDb
    }

    async fn execute(&self, sql: &str) -> BuildResult<u64> {
        let sql = sql.to_string();
        self.send(move |reply| Request::Execute { sql, reply }).await
    }

    async fn query(&self, sql: &str) -> BuildResult<RowSet> {
        let sql = sql.to_string();
        self.send(move |reply| Request::Query { sql, reply }).await
    }

    async fn append_rows(
        &self,
        schema: &str,
        table: &str,
        rows: Vec<Vec<CellValue>>,
    ) -> BuildResult<u64> {
        let schema = schema.to_string();
        let table = table.to_string();
        self.send(move |reply| Request::Append {
            schema,
            table,
            rows,
            reply,
        })
        .await
    }
}

// ============================================================================
// Blocking request handlers (engine thread only)
// ============================================================================

fn run_execute(conn: &Connection, sql: &str) -> Result<u64, String> {
    conn.execute(sql, [])
        .map(|n| n as u64)
        .map_err(|e| e.to_string())
}

fn run_query(conn: &Connection, sql: &str) -> Result<RowSet, String> {
    let mut stmt = conn.prepare(sql).map_err(|e| e.to_string())?;
    let mut rows = stmt.query([]).map_err(|e| e.to_string())?;

    let mut set = RowSet::default();
    let mut columns_known = false;

    while let Some(row) = rows.next().map_err(|e| e.to_string())? {
        if !columns_known {
            set.columns = row
                .as_ref()
                .column_names()
                .into_iter()
                .map(|c| c.to_string())
                .collect();
            columns_known = true;
        }
        let width = set.columns.len();
        let mut cells = Vec::with_capacity(width);
        for i in 0..width {
            let value: duckdb::types::Value = row.get(i).map_err(|e| e.to_string())?;
            cells.push(from_duckdb(value));
        }
        set.rows.push(cells);
    }

    // Empty result: recover column names from the executed statement.
    if !columns_known {
        drop(rows);
        set.columns = stmt.column_names().into_iter().map(String::from).collect();
    }

    Ok(set)
}

fn run_append(
    conn: &Connection,
    schema: &str,
    table: &str,
    rows: Vec<Vec<CellValue>>,
) -> Result<u64, String> {
    let mut appender = conn
        .appender_to_db(table, schema)
        .map_err(|e| e.to_string())?;

    let mut appended = 0u64;
    for chunk in rows.chunks(BULK_BATCH_SIZE) {
        for row in chunk {
            let params: Vec<duckdb::types::Value> =
                row.iter().map(|cell| to_duckdb(cell.clone())).collect();
            appender
                .append_row(duckdb::params_from_iter(params))
                .map_err(|e| e.to_string())?;
            appended += 1;
        }
        appender.flush().map_err(|e| e.to_string())?;
    }

    Ok(appended)
}

fn to_duckdb(cell: CellValue) -> duckdb::types::Value {
    use duckdb::types::Value;
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Boolean(b),
        CellValue::Int(n) => Value::BigInt(n),
        CellValue::Float(f) => Value::Double(f),
        CellValue::Text(s) => Value::Text(s),
    }
}

fn from_duckdb(value: duckdb::types::Value) -> CellValue {
    use duckdb::types::{TimeUnit, Value};
    match value {
        Value::Null => CellValue::Null,
        Value::Boolean(b) => CellValue::Bool(b),
        Value::TinyInt(n) => CellValue::Int(n as i64),
        Value::SmallInt(n) => CellValue::Int(n as i64),
        Value::Int(n) => CellValue::Int(n as i64),
        Value::BigInt(n) => CellValue::Int(n),
        Value::HugeInt(n) => CellValue::Int(n as i64),
        Value::UTinyInt(n) => CellValue::Int(n as i64),
        Value::USmallInt(n) => CellValue::Int(n as i64),
        Value::UInt(n) => CellValue::Int(n as i64),
        Value::UBigInt(n) => CellValue::Int(n as i64),
        Value::Float(f) => CellValue::Float(f as f64),
        Value::Double(f) => CellValue::Float(f),
        Value::Decimal(d) => CellValue::Text(d.to_string()),
        Value::Text(s) => CellValue::Text(s),
        Value::Enum(s) => CellValue::Text(s),
        Value::Date32(days) => {
            let date = chrono::NaiveDate::from_ymd_opt(1970, 1, 1)
                .expect("epoch")
                .checked_add_signed(chrono::Duration::days(days as i64));
            match date {
                Some(d) => CellValue::Text(d.format("%Y-%m-%d").to_string()),
                None => CellValue::Null,
            }
        }
        Value::Timestamp(unit, raw) => {
            let micros = match unit {
                TimeUnit::Second => raw.saturating_mul(1_000_000),
                TimeUnit::Millisecond => raw.saturating_mul(1_000),
                TimeUnit::Microsecond => raw,
                TimeUnit::Nanosecond => raw / 1_000,
            };
            match chrono::DateTime::from_timestamp_micros(micros) {
                Some(ts) => CellValue::Text(ts.naive_utc().format("%Y-%m-%d %H:%M:%S").to_string()),
                None => CellValue::Null,
            }
        }
        // Lists, blobs, structs and friends never appear in cube tables;
        // render through Debug so nothing is silently lost.
        other => CellValue::Text(format!("{other:?}")),
    }
}
