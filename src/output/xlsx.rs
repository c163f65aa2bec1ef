//! Multi-sheet workbook export.
//!
//! An xlsx file is a zip of SpreadsheetML parts; the writer streams
//! worksheet XML straight into the archive with inline strings, so no
//! shared-string table and no full-sheet buffering. A fresh sheet (with
//! a repeated header row) starts whenever the row index would reach the
//! sheet row limit.

use std::io::{Seek, Write};

use zip::write::SimpleFileOptions;
use zip::ZipWriter;

use crate::engine::CellValue;
use crate::error::{BuildError, BuildResult};
use crate::output::ViewCursor;

/// Rows per sheet before rollover (a safety margin under the format's
/// hard 1,048,576 row ceiling).
pub const EXCEL_ROW_LIMIT: u64 = 1_048_500;

/// Streaming multi-sheet workbook writer.
pub struct WorkbookWriter<W: Write + Seek> {
    zip: ZipWriter<W>,
    headers: Vec<String>,
    sheet_count: u32,
    rows_in_sheet: u64,
    sheet_open: bool,
    row_limit: u64,
}

impl<W: Write + Seek> WorkbookWriter<W> {
    pub fn new(writer: W, headers: Vec<String>) -> Self {
        Self {
            zip: ZipWriter::new(writer),
            headers,
            sheet_count: 0,
            rows_in_sheet: 0,
            sheet_open: false,
            row_limit: EXCEL_ROW_LIMIT,
        }
    }

    /// Override the rollover threshold (tests).
    pub fn with_row_limit(mut self, limit: u64) -> Self {
        self.row_limit = limit.max(2);
        self
    }

    /// Append one data row, rolling to a new sheet at the limit.
    pub fn write_row(&mut self, row: &[CellValue]) -> BuildResult<()> {
        if !self.sheet_open || self.rows_in_sheet + 1 >= self.row_limit {
            self.start_sheet()?;
        }
        self.rows_in_sheet += 1;
        let cells: Vec<String> = row.iter().map(|c| c.render()).collect();
        self.write_sheet_row(&cells)
    }

    /// Close the workbook, writing the bookkeeping parts.
    pub fn finish(mut self) -> BuildResult<W> {
        if !self.sheet_open {
            // An empty export still yields a valid single-sheet workbook.
            self.start_sheet()?;
        }
        self.close_sheet()?;
        self.write_manifest()?;
        self.zip
            .finish()
            .map_err(|e| BuildError::UnknownError(format!("workbook finish: {e}")))
    }

    pub fn sheet_count(&self) -> u32 {
        self.sheet_count
    }

    // ------------------------------------------------------------------

    fn start_sheet(&mut self) -> BuildResult<()> {
        if self.sheet_open {
            self.close_sheet()?;
        }
        self.sheet_count += 1;
        self.rows_in_sheet = 1; // header row
        self.sheet_open = true;

        let name = format!("xl/worksheets/sheet{}.xml", self.sheet_count);
        self.zip
            .start_file(name, SimpleFileOptions::default())
            .map_err(zip_error)?;
        self.zip
            .write_all(
                b"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
                  <worksheet xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\"><sheetData>",
            )?;
        let headers = self.headers.clone();
        self.write_sheet_row(&headers)
    }

    fn close_sheet(&mut self) -> BuildResult<()> {
        self.zip.write_all(b"</sheetData></worksheet>")?;
        self.sheet_open = false;
        Ok(())
    }

    fn write_sheet_row(&mut self, cells: &[String]) -> BuildResult<()> {
        let mut row_xml = String::with_capacity(cells.iter().map(|c| c.len() + 32).sum());
        row_xml.push_str("<row>");
        for cell in cells {
            row_xml.push_str("<c t=\"inlineStr\"><is><t>");
            row_xml.push_str(&escape_xml(cell));
            row_xml.push_str("</t></is></c>");
        }
        row_xml.push_str("</row>");
        self.zip.write_all(row_xml.as_bytes())?;
        Ok(())
    }

    fn write_manifest(&mut self) -> BuildResult<()> {
        let options = SimpleFileOptions::default();

        // [Content_Types].xml
        let mut content_types = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Types xmlns=\"http://schemas.openxmlformats.org/package/2006/content-types\">\
             <Default Extension=\"rels\" ContentType=\"application/vnd.openxmlformats-package.relationships+xml\"/>\
             <Override PartName=\"/xl/workbook.xml\" ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.sheet.main+xml\"/>",
        );
        for sheet in 1..=self.sheet_count {
            content_types.push_str(&format!(
                "<Override PartName=\"/xl/worksheets/sheet{sheet}.xml\" \
                 ContentType=\"application/vnd.openxmlformats-officedocument.spreadsheetml.worksheet+xml\"/>"
            ));
        }
        content_types.push_str("</Types>");
        self.zip
            .start_file("[Content_Types].xml", options)
            .map_err(zip_error)?;
        self.zip.write_all(content_types.as_bytes())?;

        // _rels/.rels
        self.zip.start_file("_rels/.rels", options).map_err(zip_error)?;
        self.zip.write_all(
            b"<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
              <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">\
              <Relationship Id=\"rId1\" \
              Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/officeDocument\" \
              Target=\"xl/workbook.xml\"/></Relationships>",
        )?;

        // xl/workbook.xml
        let mut workbook = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <workbook xmlns=\"http://schemas.openxmlformats.org/spreadsheetml/2006/main\" \
             xmlns:r=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships\"><sheets>",
        );
        for sheet in 1..=self.sheet_count {
            workbook.push_str(&format!(
                "<sheet name=\"Data {sheet}\" sheetId=\"{sheet}\" r:id=\"rId{sheet}\"/>"
            ));
        }
        workbook.push_str("</sheets></workbook>");
        self.zip
            .start_file("xl/workbook.xml", options)
            .map_err(zip_error)?;
        self.zip.write_all(workbook.as_bytes())?;

        // xl/_rels/workbook.xml.rels
        let mut rels = String::from(
            "<?xml version=\"1.0\" encoding=\"UTF-8\" standalone=\"yes\"?>\n\
             <Relationships xmlns=\"http://schemas.openxmlformats.org/package/2006/relationships\">",
        );
        for sheet in 1..=self.sheet_count {
            rels.push_str(&format!(
                "<Relationship Id=\"rId{sheet}\" \
                 Type=\"http://schemas.openxmlformats.org/officeDocument/2006/relationships/worksheet\" \
                 Target=\"worksheets/sheet{sheet}.xml\"/>"
            ));
        }
        rels.push_str("</Relationships>");
        self.zip
            .start_file("xl/_rels/workbook.xml.rels", options)
            .map_err(zip_error)?;
        self.zip.write_all(rels.as_bytes())?;

        Ok(())
    }
}

/// Stream an entire cursor into a workbook.
pub async fn write_workbook<W: Write + Seek>(
    cursor: &mut ViewCursor,
    writer: W,
) -> BuildResult<u64> {
    let mut workbook: Option<WorkbookWriter<W>> = None;
    let mut pending = Some(writer);
    let mut total = 0u64;

    while let Some(page) = cursor.next_page().await? {
        if workbook.is_none() {
            let writer = pending.take().expect("writer consumed once");
            workbook = Some(WorkbookWriter::new(writer, page.columns.clone()));
        }
        let book = workbook.as_mut().expect("workbook initialised");
        for row in &page.rows {
            book.write_row(row)?;
            total += 1;
        }
    }

    match workbook {
        Some(book) => {
            book.finish()?;
        }
        None => {
            // No pages at all: emit an empty workbook with no headers.
            WorkbookWriter::new(pending.take().expect("writer unused"), Vec::new()).finish()?;
        }
    }
    Ok(total)
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}

fn zip_error(e: zip::result::ZipError) -> BuildError {
    BuildError::UnknownError(format!("workbook zip: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn text_row(values: &[&str]) -> Vec<CellValue> {
        values.iter().map(|v| CellValue::Text((*v).into())).collect()
    }

    #[test]
    fn test_single_sheet_workbook() {
        let buffer = Cursor::new(Vec::new());
        let mut book = WorkbookWriter::new(buffer, vec!["a".into(), "b".into()]);
        book.write_row(&text_row(&["1", "x"])).unwrap();
        book.write_row(&text_row(&["2", "y"])).unwrap();
        assert_eq!(book.sheet_count(), 1);
        let out = book.finish().unwrap().into_inner();
        assert_eq!(&out[0..2], b"PK");
    }

    #[test]
    fn test_sheet_rollover_at_limit() {
        let buffer = Cursor::new(Vec::new());
        // Limit 3 = header + 2 data rows per sheet
        let mut book = WorkbookWriter::new(buffer, vec!["a".into()]).with_row_limit(3);
        for i in 0..5 {
            book.write_row(&text_row(&[&i.to_string()])).unwrap();
        }
        // 5 rows at 2 per sheet = 3 sheets
        assert_eq!(book.sheet_count(), 3);
        book.finish().unwrap();
    }

    #[test]
    fn test_empty_workbook_still_valid() {
        let buffer = Cursor::new(Vec::new());
        let book = WorkbookWriter::new(buffer, vec!["a".into()]);
        let out = book.finish().unwrap().into_inner();
        assert_eq!(&out[0..2], b"PK");
    }

    #[test]
    fn test_xml_escaping() {
        assert_eq!(escape_xml("a<b&c>\"d'"), "a&lt;b&amp;c&gt;&quot;d&apos;");
    }

    #[test]
    fn test_workbook_parts_present() {
        let buffer = Cursor::new(Vec::new());
        let mut book = WorkbookWriter::new(buffer, vec!["h".into()]);
        book.write_row(&text_row(&["v"])).unwrap();
        let bytes = book.finish().unwrap().into_inner();

        let mut archive = zip::ZipArchive::new(Cursor::new(bytes)).unwrap();
        let names: Vec<String> = (0..archive.len())
            .map(|i| archive.by_index(i).unwrap().name().to_string())
            .collect();
        assert!(names.contains(&"[Content_Types].xml".to_string()));
        assert!(names.contains(&"xl/workbook.xml".to_string()));
        assert!(names.contains(&"xl/worksheets/sheet1.xml".to_string()));
        assert!(names.contains(&"xl/_rels/workbook.xml.rels".to_string()));
    }
}
