//! SQL dialect definitions and formatting rules.
//!
//! The build engine talks to a PostgreSQL-compatible backend with an
//! embedded columnar engine attached for staging and export, so exactly
//! two dialects exist: `Postgres` and `DuckDb`. Each implements
//! `SqlDialect` to handle its specific syntax:
//!
//! - Identifier quoting (both ANSI `"`)
//! - Function naming: `STRFTIME` (DuckDB) vs `TO_CHAR` (Postgres)
//! - Materialized-view and aggregate-FILTER support
//!
//! # Usage
//!
//! ```ignore
//! use cubewright::sql::dialect::{Dialect, SqlDialect};
//!
//! let dialect = Dialect::DuckDb;
//! let quoted = dialect.quote_identifier("fact_table");  // "fact_table"
//! ```

mod duckdb;
pub mod helpers;
mod postgres;

pub use duckdb::DuckDb;
pub use postgres::Postgres;

use super::token::TokenStream;

/// SQL dialect trait - defines how SQL constructs are rendered.
///
/// The default implementations follow ANSI SQL where possible.
pub trait SqlDialect: std::fmt::Debug {
    /// Dialect name for display/logging.
    fn name(&self) -> &'static str;

    // =========================================================================
    // Identifier and Literal Quoting
    // =========================================================================

    /// Quote an identifier (schema, table, column, alias).
    fn quote_identifier(&self, ident: &str) -> String;

    /// Quote a string literal.
    ///
    /// Single quotes with `''` for escaping.
    fn quote_string(&self, s: &str) -> String {
        helpers::quote_string_single(s)
    }

    /// Format a boolean literal.
    fn format_bool(&self, b: bool) -> &'static str;

    /// Format a date literal: `DATE 'YYYY-MM-DD'`.
    fn format_date_literal(&self, date: &str) -> String {
        format!("DATE '{}'", date)
    }

    // =========================================================================
    // Pagination
    // =========================================================================

    /// Emit LIMIT/OFFSET clause.
    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        helpers::emit_limit_offset_standard(limit, offset)
    }

    // =========================================================================
    // Operators
    // =========================================================================

    /// String concatenation operator.
    fn concat_operator(&self) -> &'static str {
        "||"
    }

    // =========================================================================
    // Feature flags
    // =========================================================================

    /// Whether this dialect supports NULLS FIRST/LAST in ORDER BY.
    fn supports_nulls_ordering(&self) -> bool {
        true
    }

    /// Whether this dialect supports the FILTER clause for aggregates.
    ///
    /// The pivot view relies on `array_agg(x) FILTER (WHERE ...)`.
    fn supports_aggregate_filter(&self) -> bool {
        true
    }

    /// Whether this dialect supports IF NOT EXISTS for CREATE statements.
    fn supports_if_not_exists(&self) -> bool {
        true
    }

    /// Whether this dialect supports IF EXISTS for DROP statements.
    fn supports_if_exists(&self) -> bool {
        true
    }

    /// Whether this dialect supports CASCADE on DROP.
    fn supports_drop_cascade(&self) -> bool {
        true
    }

    /// Whether this dialect supports CREATE OR REPLACE VIEW.
    fn supports_create_or_replace_view(&self) -> bool {
        true
    }

    /// Whether this dialect supports materialized views. Engines
    /// without them materialise into plain tables instead.
    fn supports_materialized_view(&self) -> bool {
        false
    }

    // =========================================================================
    // Composite emission
    // =========================================================================

    /// Containment of `needle` in a delimiter-split text value.
    ///
    /// The note-code builders hang off this: DuckDB renders
    /// `LIST_CONTAINS(STRING_SPLIT(text, d), needle)`, Postgres the
    /// standard `needle = ANY(STRING_TO_ARRAY(text, d))`.
    fn emit_split_contains(
        &self,
        text: TokenStream,
        delimiter: &str,
        needle: TokenStream,
    ) -> TokenStream {
        helpers::emit_split_contains_any(text, delimiter, needle)
    }

    /// Thousands-grouped numeric rendering with fixed decimals.
    ///
    /// DuckDB goes through fmt-style `FORMAT('{:,.df}', ROUND(...))`;
    /// Postgres through `TO_CHAR` with an `FM` grouping pattern (its
    /// `format()` is printf-style and would pass the fmt spec through
    /// unsubstituted).
    fn emit_grouped_number(&self, value: TokenStream, decimals: u8) -> TokenStream {
        helpers::emit_grouped_number_to_char(value, decimals)
    }

    // =========================================================================
    // Function Remapping
    // =========================================================================

    /// Remap a function name for this dialect.
    ///
    /// The builders emit date formatting as `STRFTIME`; Postgres renders it
    /// as `TO_CHAR`. Matched case-insensitively; `None` keeps the original.
    fn remap_function(&self, name: &str) -> Option<&'static str> {
        let _ = name;
        None
    }

    // =========================================================================
    // DDL Support
    // =========================================================================

    /// Emit a data type for this dialect.
    fn emit_data_type(&self, dt: &crate::model::types::DataType) -> String {
        helpers::emit_data_type_ansi(dt)
    }
}

/// Supported SQL dialects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Dialect {
    #[default]
    DuckDb,
    Postgres,
}

impl Dialect {
    /// Get the dialect implementation.
    pub fn dialect(&self) -> &'static dyn SqlDialect {
        match self {
            Dialect::DuckDb => &DuckDb,
            Dialect::Postgres => &Postgres,
        }
    }
}

// Implement SqlDialect for Dialect enum by delegating to concrete types
impl SqlDialect for Dialect {
    fn name(&self) -> &'static str {
        self.dialect().name()
    }

    fn quote_identifier(&self, ident: &str) -> String {
        self.dialect().quote_identifier(ident)
    }

    fn quote_string(&self, s: &str) -> String {
        self.dialect().quote_string(s)
    }

    fn format_bool(&self, b: bool) -> &'static str {
        self.dialect().format_bool(b)
    }

    fn format_date_literal(&self, date: &str) -> String {
        self.dialect().format_date_literal(date)
    }

    fn emit_limit_offset(&self, limit: Option<u64>, offset: Option<u64>) -> TokenStream {
        self.dialect().emit_limit_offset(limit, offset)
    }

    fn concat_operator(&self) -> &'static str {
        self.dialect().concat_operator()
    }

    fn supports_nulls_ordering(&self) -> bool {
        self.dialect().supports_nulls_ordering()
    }

    fn supports_aggregate_filter(&self) -> bool {
        self.dialect().supports_aggregate_filter()
    }

    fn supports_if_not_exists(&self) -> bool {
        self.dialect().supports_if_not_exists()
    }

    fn supports_if_exists(&self) -> bool {
        self.dialect().supports_if_exists()
    }

    fn supports_drop_cascade(&self) -> bool {
        self.dialect().supports_drop_cascade()
    }

    fn supports_create_or_replace_view(&self) -> bool {
        self.dialect().supports_create_or_replace_view()
    }

    fn supports_materialized_view(&self) -> bool {
        self.dialect().supports_materialized_view()
    }

    fn emit_split_contains(
        &self,
        text: TokenStream,
        delimiter: &str,
        needle: TokenStream,
    ) -> TokenStream {
        self.dialect().emit_split_contains(text, delimiter, needle)
    }

    fn emit_grouped_number(&self, value: TokenStream, decimals: u8) -> TokenStream {
        self.dialect().emit_grouped_number(value, decimals)
    }

    fn remap_function(&self, name: &str) -> Option<&'static str> {
        self.dialect().remap_function(name)
    }

    fn emit_data_type(&self, dt: &crate::model::types::DataType) -> String {
        self.dialect().emit_data_type(dt)
    }
}

impl std::fmt::Display for Dialect {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.dialect().name())
    }
}
