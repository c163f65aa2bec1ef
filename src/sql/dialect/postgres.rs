//! PostgreSQL SQL dialect.
//!
//! The outer backend that owns per-revision schemas, metadata and the
//! pivot view. Features this engine relies on:
//! - ANSI identifier quoting (`"`)
//! - Materialized views
//! - FILTER clause for aggregates (`array_agg(x) FILTER (WHERE ...)`)
//! - `string_to_array` in place of DuckDB's `string_split`

use super::helpers;
use super::SqlDialect;

/// PostgreSQL SQL dialect.
#[derive(Debug, Clone, Copy)]
pub struct Postgres;

impl SqlDialect for Postgres {
    fn name(&self) -> &'static str {
        "postgres"
    }

    fn quote_identifier(&self, ident: &str) -> String {
        helpers::quote_double(ident)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        helpers::format_bool_literal(b)
    }

    // Uses default emit_limit_offset (LIMIT ... OFFSET ...)

    fn supports_materialized_view(&self) -> bool {
        true
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        helpers::remap_function_postgres(name)
    }
}
