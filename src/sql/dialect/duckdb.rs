//! DuckDB SQL dialect.
//!
//! DuckDB is the embedded columnar engine used for staging, bulk loads
//! and export. PostgreSQL-compatible with extensions:
//! - ANSI identifier quoting (`"`)
//! - Table functions (`read_csv`, `read_parquet`, `read_json_auto`, `st_read`)
//! - `list_contains` / `string_split` over LIST values
//! - Aggregate FILTER clause

use super::helpers;
use super::SqlDialect;
use crate::sql::token::TokenStream;

/// DuckDB SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct DuckDb;

impl SqlDialect for DuckDb {
    fn name(&self) -> &'static str {
        "duckdb"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    // Uses default emit_limit_offset (LIMIT ... OFFSET ...)

    fn emit_split_contains(
        &self,
        text: TokenStream,
        delimiter: &str,
        needle: TokenStream,
    ) -> TokenStream {
        helpers::emit_split_contains_list(text, delimiter, needle)
    }

    fn emit_grouped_number(&self, value: TokenStream, decimals: u8) -> TokenStream {
        helpers::emit_grouped_number_format(value, decimals)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_duckdb(name)
    }
}
