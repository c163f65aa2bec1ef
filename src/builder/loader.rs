//! File loader.
//!
//! Ingests one uploaded tabular file into a staging table on the
//! columnar engine. Text formats are normalised to UTF-8 first (the
//! source blob is never mutated); gzip is transcoded to a scratch file;
//! the engine's own readers do the parsing and type inference.

use flate2::read::GzDecoder;
use std::io::Read;

use crate::builder::BuildContext;
use crate::error::{BuildError, BuildResult};
use crate::filestore::StagedFile;
use crate::model::types::{DataType, FileType};
use crate::sql::ddl::CreateTable;
use crate::sql::query::Query;
use crate::sql::SqlDialect;

/// CSV inference is restricted to these candidates; everything else
/// stays text.
const CSV_TYPE_CANDIDATES: &str = "['BOOLEAN', 'BIGINT', 'DOUBLE', 'VARCHAR']";

/// A staged upload: schema-qualified table plus its inferred columns.
#[derive(Debug, Clone)]
pub struct StagingTable {
    pub name: String,
    pub columns: Vec<(String, DataType)>,
}

/// Load a file from the store into `schema.staging_name`.
///
/// The staging table is created with `CREATE TABLE AS SELECT` over the
/// engine's reader for the format; its column names are the file's
/// headers, verbatim.
pub async fn stage_file(
    ctx: &BuildContext,
    file_type: FileType,
    filename: &str,
    staging_name: &str,
) -> BuildResult<StagingTable> {
    let bytes = ctx
        .store
        .load(&ctx.dataset.id.to_string(), filename)
        .await?;

    let staged = prepare_local_file(&bytes, file_type)?;
    let path = staged.path_str()?;

    let reader_sql = reader_for(file_type, path);
    let create = CreateTable::new(staging_name)
        .schema(&ctx.schema)
        .as_select(Query::new().select_star().from_table_function(&reader_sql));

    ctx.engine
        .execute(&create.to_sql(ctx.dialect()))
        .await
        .map_err(|e| BuildError::FailedToLoadData {
            filename: filename.to_string(),
            message: e.to_string(),
        })?;

    let columns = describe_columns(ctx, staging_name).await?;
    tracing::debug!(
        table = staging_name,
        columns = columns.len(),
        "staged data file"
    );

    Ok(StagingTable {
        name: staging_name.to_string(),
        columns,
    })
}

/// Write the upload to a scratch file the engine can read, transcoding
/// text to UTF-8 and inflating gzip on the way.
fn prepare_local_file(bytes: &[u8], file_type: FileType) -> BuildResult<StagedFile> {
    match file_type {
        FileType::Csv => StagedFile::with_extension(to_utf8(bytes).as_bytes(), "csv"),
        FileType::GzipCsv => {
            let inflated = gunzip(bytes)?;
            StagedFile::with_extension(to_utf8(&inflated).as_bytes(), "csv")
        }
        FileType::Json => StagedFile::with_extension(to_utf8(bytes).as_bytes(), "json"),
        FileType::GzipJson => {
            let inflated = gunzip(bytes)?;
            StagedFile::with_extension(to_utf8(&inflated).as_bytes(), "json")
        }
        // Binary containers carry their own encoding.
        FileType::Parquet => StagedFile::with_extension(bytes, "parquet"),
        FileType::Excel => StagedFile::with_extension(bytes, "xlsx"),
    }
}

/// The engine reader call for a format. `path` is embedded as an escaped
/// string literal; nothing user-controlled reaches this string.
fn reader_for(file_type: FileType, path: &str) -> String {
    let quoted = format!("'{}'", path.replace('\'', "''"));
    match file_type {
        FileType::Csv | FileType::GzipCsv => format!(
            "read_csv({quoted}, header = true, sample_size = -1, auto_type_candidates = {CSV_TYPE_CANDIDATES})"
        ),
        FileType::Parquet => format!("read_parquet({quoted})"),
        FileType::Json | FileType::GzipJson => format!("read_json_auto({quoted})"),
        // First sheet, via the tabular-reader extension.
        FileType::Excel => format!("st_read({quoted})"),
    }
}

/// Decode arbitrary bytes to UTF-8.
///
/// A BOM wins; otherwise bytes that already validate as UTF-8 pass
/// through, and anything else decodes as windows-1252 (the encoding
/// spreadsheet exports in this domain actually arrive in).
fn to_utf8(bytes: &[u8]) -> String {
    if let Some((encoding, bom_len)) = encoding_rs::Encoding::for_bom(bytes) {
        let (text, _, _) = encoding.decode(&bytes[bom_len..]);
        return text.into_owned();
    }
    match std::str::from_utf8(bytes) {
        Ok(text) => text.to_string(),
        Err(_) => {
            let (text, _, _) = encoding_rs::WINDOWS_1252.decode(bytes);
            text.into_owned()
        }
    }
}

fn gunzip(bytes: &[u8]) -> BuildResult<Vec<u8>> {
    let mut decoder = GzDecoder::new(bytes);
    let mut out = Vec::new();
    decoder.read_to_end(&mut out)?;
    Ok(out)
}

/// Column names and engine-inferred types of a staged table.
pub async fn describe_columns(
    ctx: &BuildContext,
    table: &str,
) -> BuildResult<Vec<(String, DataType)>> {
    let dialect = ctx.dialect();
    let sql = format!(
        "SELECT column_name, data_type FROM information_schema.columns \
         WHERE table_schema = {} AND table_name = {} ORDER BY ordinal_position",
        dialect.quote_string(&ctx.schema),
        dialect.quote_string(table),
    );
    let rows = ctx.engine.query(&sql).await?;
    Ok(rows
        .rows
        .iter()
        .map(|row| {
            let name = row[0].render();
            let data_type = DataType::parse_lossy(&row[1].render());
            (name, data_type)
        })
        .collect())
}
