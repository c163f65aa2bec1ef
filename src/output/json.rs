//! JSON export.
//!
//! Streams a view cursor as one JSON array of objects, keyed by the
//! view's column names. The array is stitched page by page so the full
//! result set never sits in memory.

use std::io::Write;

use serde_json::{Map, Value};

use crate::engine::{CellValue, RowSet};
use crate::error::{BuildError, BuildResult};
use crate::output::ViewCursor;

/// Stream an entire cursor as a JSON array.
pub async fn write_json<W: Write>(cursor: &mut ViewCursor, mut writer: W) -> BuildResult<u64> {
    writer.write_all(b"[")?;
    let mut total = 0u64;

    while let Some(page) = cursor.next_page().await? {
        for row in &page.rows {
            if total > 0 {
                writer.write_all(b",")?;
            }
            let object = row_object(&page.columns, row);
            serde_json::to_writer(&mut writer, &object)
                .map_err(|e| BuildError::UnknownError(format!("json write: {e}")))?;
            total += 1;
        }
    }

    writer.write_all(b"]")?;
    writer.flush()?;
    Ok(total)
}

/// One page as a JSON array value (previews).
pub fn page_value(rows: &RowSet) -> Value {
    Value::Array(
        rows.rows
            .iter()
            .map(|row| Value::Object(row_object(&rows.columns, row)))
            .collect(),
    )
}

fn row_object(columns: &[String], row: &[CellValue]) -> Map<String, Value> {
    columns
        .iter()
        .zip(row.iter())
        .map(|(column, cell)| (column.clone(), cell_value(cell)))
        .collect()
}

fn cell_value(cell: &CellValue) -> Value {
    match cell {
        CellValue::Null => Value::Null,
        CellValue::Bool(b) => Value::Bool(*b),
        CellValue::Int(n) => Value::Number((*n).into()),
        CellValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(Value::Number)
            .unwrap_or(Value::Null),
        CellValue::Text(s) => Value::String(s.clone()),
    }
}
