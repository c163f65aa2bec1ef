//! Shared helper functions for SQL dialect implementations.
//!
//! Both backends are ANSI-quoting Postgres relatives, so most of the
//! rendering rules live here and the dialect types only override what
//! genuinely differs.

// =============================================================================
// Identifier Quoting
// =============================================================================

/// Quote identifier with double quotes (ANSI style).
pub fn quote_double(ident: &str) -> String {
    format!("\"{}\"", ident.replace('"', "\"\""))
}

// =============================================================================
// String Quoting
// =============================================================================

/// Quote string with single quotes (standard SQL).
pub fn quote_string_single(s: &str) -> String {
    format!("'{}'", s.replace('\'', "''"))
}

// =============================================================================
// Boolean Formatting
// =============================================================================

/// Format boolean as literal true/false.
pub fn format_bool_literal(b: bool) -> &'static str {
    if b {
        "true"
    } else {
        "false"
    }
}

// =============================================================================
// Pagination
// =============================================================================

use super::super::token::{Token, TokenStream};

/// Emit LIMIT ... OFFSET ... (standard SQL).
pub fn emit_limit_offset_standard(limit: Option<u64>, offset: Option<u64>) -> TokenStream {
    let mut ts = TokenStream::new();

    if let Some(lim) = limit {
        ts.push(Token::Limit)
            .space()
            .push(Token::LitInt(lim as i64));
    }

    if let Some(off) = offset {
        if limit.is_some() {
            ts.space();
        }
        ts.push(Token::Offset)
            .space()
            .push(Token::LitInt(off as i64));
    }

    ts
}

// =============================================================================
// Function Remapping
// =============================================================================

/// Remap functions for the Postgres dialect.
pub fn remap_function_postgres(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "STRFTIME" => Some("TO_CHAR"),
        "STRING_SPLIT" => Some("STRING_TO_ARRAY"),
        "NVL" => Some("COALESCE"),
        "IFNULL" => Some("COALESCE"),
        "STRING_AGG" => None, // native
        _ => None,
    }
}

/// Remap functions for the DuckDB dialect.
pub fn remap_function_duckdb(name: &str) -> Option<&'static str> {
    match name.to_uppercase().as_str() {
        "TO_CHAR" => Some("STRFTIME"),
        "NVL" => Some("COALESCE"),
        "IFNULL" => Some("COALESCE"),
        _ => None,
    }
}

// =============================================================================
// Split containment
// =============================================================================

/// `needle = ANY(STRING_TO_ARRAY(text, delimiter))` - standard quantified
/// comparison over an array. Used by: Postgres.
pub fn emit_split_contains_any(
    text: TokenStream,
    delimiter: &str,
    needle: TokenStream,
) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.append(&needle);
    ts.space().push(Token::Eq).space().push(Token::Any).lparen();
    ts.push(Token::FunctionName("STRING_SPLIT".into())).lparen();
    ts.append(&text);
    ts.comma()
        .space()
        .push(Token::LitString(delimiter.into()));
    ts.rparen().rparen();
    ts
}

/// `LIST_CONTAINS(STRING_SPLIT(text, delimiter), needle)`.
/// Used by: DuckDB.
pub fn emit_split_contains_list(
    text: TokenStream,
    delimiter: &str,
    needle: TokenStream,
) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::FunctionName("LIST_CONTAINS".into())).lparen();
    ts.push(Token::FunctionName("STRING_SPLIT".into())).lparen();
    ts.append(&text);
    ts.comma()
        .space()
        .push(Token::LitString(delimiter.into()));
    ts.rparen().comma().space();
    ts.append(&needle);
    ts.rparen();
    ts
}

// =============================================================================
// Grouped number rendering
// =============================================================================

/// `TO_CHAR(CAST(value AS DECIMAL(18, d)), 'FM999,999,999,990.00')` -
/// `to_char` rounds to the pattern's decimals and groups thousands.
/// Used by: Postgres.
pub fn emit_grouped_number_to_char(value: TokenStream, decimals: u8) -> TokenStream {
    let mut pattern = String::from("FM999,999,999,990");
    if decimals > 0 {
        pattern.push('.');
        for _ in 0..decimals {
            pattern.push('0');
        }
    }

    let mut ts = TokenStream::new();
    // TO_CHAR spelled literally: the remap table would send the
    // FunctionName variant to STRFTIME on the columnar engine, and this
    // helper must stay dialect-stable.
    ts.push(Token::Raw("TO_CHAR".into())).lparen();
    ts.push(Token::Cast).lparen();
    ts.append(&value);
    ts.space()
        .push(Token::As)
        .space()
        .push(Token::TypeName(format!("DECIMAL(18, {decimals})")));
    ts.rparen();
    ts.comma()
        .space()
        .push(Token::LitString(pattern));
    ts.rparen();
    ts
}

/// `FORMAT('{:,.df}', ROUND(value, d))` - fmt-style grouping.
/// Used by: DuckDB.
pub fn emit_grouped_number_format(value: TokenStream, decimals: u8) -> TokenStream {
    let mut ts = TokenStream::new();
    ts.push(Token::FunctionName("FORMAT".into())).lparen();
    ts.push(Token::LitString(format!("{{:,.{decimals}f}}")));
    ts.comma().space();
    ts.push(Token::FunctionName("ROUND".into())).lparen();
    ts.append(&value);
    ts.comma()
        .space()
        .push(Token::LitInt(decimals as i64));
    ts.rparen().rparen();
    ts
}

// =============================================================================
// Data Type Emission
// =============================================================================

use crate::model::types::DataType;

/// Emit data type for ANSI/Postgres style (shared by both backends).
pub fn emit_data_type_ansi(dt: &DataType) -> String {
    match dt {
        DataType::Bool => "BOOLEAN".into(),
        DataType::BigInt => "BIGINT".into(),
        DataType::Double => "DOUBLE PRECISION".into(),
        DataType::Decimal(p, s) => format!("DECIMAL({}, {})", p, s),
        DataType::Text => "TEXT".into(),
        DataType::Date => "DATE".into(),
        DataType::Timestamp => "TIMESTAMP".into(),
    }
}
