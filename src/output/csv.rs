//! CSV export.
//!
//! Streams a view cursor into any `io::Write` with RFC 4180 quoting.
//! Numeric cells render through the itoa/ryu fast paths in
//! `CellValue::render`.

use std::io::Write;

use crate::engine::RowSet;
use crate::error::{BuildError, BuildResult};
use crate::output::ViewCursor;

/// Stream an entire cursor as CSV, header row first.
pub async fn write_csv<W: Write>(cursor: &mut ViewCursor, writer: W) -> BuildResult<u64> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    let mut total = 0u64;
    let mut header_written = false;

    while let Some(page) = cursor.next_page().await? {
        if !header_written {
            write_header(&mut csv_writer, &page)?;
            header_written = true;
        }
        for row in &page.rows {
            csv_writer
                .write_record(row.iter().map(|cell| cell.render()))
                .map_err(csv_error)?;
            total += 1;
        }
    }

    csv_writer.flush()?;
    Ok(total)
}

/// Write a single page (previews, tests).
pub fn write_page<W: Write>(rows: &RowSet, writer: W) -> BuildResult<()> {
    let mut csv_writer = csv::Writer::from_writer(writer);
    write_header(&mut csv_writer, rows)?;
    for row in &rows.rows {
        csv_writer
            .write_record(row.iter().map(|cell| cell.render()))
            .map_err(csv_error)?;
    }
    csv_writer.flush()?;
    Ok(())
}

fn write_header<W: Write>(writer: &mut csv::Writer<W>, rows: &RowSet) -> BuildResult<()> {
    writer
        .write_record(rows.columns.iter().map(String::as_str))
        .map_err(csv_error)
}

fn csv_error(e: csv::Error) -> BuildError {
    BuildError::UnknownError(format!("csv write: {e}"))
}
