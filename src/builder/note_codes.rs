//! Note-code builder.
//!
//! Creates the static per-language code table from the translation
//! store, validates the codes observed in the fact column against the
//! closed set, then materialises `all_notes`: one row per distinct raw
//! comma-separated code string per language, with the translated
//! descriptions aggregated in deterministic order.

use crate::builder::{tables, BuildContext};
use crate::engine::CellValue;
use crate::error::{BuildError, BuildResult};
use crate::locale::SUPPORTED_LOCALES;
use crate::model::types::DataType;
use crate::sql::ddl::{ColumnDef, CreateTable};
use crate::sql::expr::{col, func, lit_str, split_contains, table_col, Expr, ExprExt};
use crate::sql::query::{Query, SelectExpr};
use crate::translation::{translate, NOTE_CODES};

/// Create and fill the static `note_codes` table.
pub async fn build_note_code_table(ctx: &BuildContext) -> BuildResult<()> {
    let create = CreateTable::new(tables::NOTE_CODES)
        .schema(&ctx.schema)
        .column(ColumnDef::new("code", DataType::Text).not_null())
        .column(ColumnDef::new("language", DataType::Text).not_null())
        .column(ColumnDef::new("tag", DataType::Text).not_null())
        .column(ColumnDef::new("description", DataType::Text).not_null());
    ctx.engine.execute(&create.to_sql(ctx.dialect())).await?;

    let mut rows = Vec::with_capacity(NOTE_CODES.len() * SUPPORTED_LOCALES.len());
    for code in NOTE_CODES {
        let tag = format!("note_codes.{code}");
        for locale in SUPPORTED_LOCALES {
            rows.push(vec![
                CellValue::Text((*code).into()),
                CellValue::Text(locale.tag().into()),
                CellValue::Text(tag.clone()),
                CellValue::Text(translate(&tag, locale).into()),
            ]);
        }
    }
    ctx.engine
        .append_rows(&ctx.schema, tables::NOTE_CODES, rows)
        .await?;
    Ok(())
}

/// Check every code observed in the fact column against the closed set.
pub async fn validate_note_codes(ctx: &BuildContext, note_column: &str) -> BuildResult<()> {
    let split = func(
        "UNNEST",
        vec![func(
            "STRING_SPLIT",
            vec![col(note_column), lit_str(",")],
        )],
    );
    let query = Query::new()
        .select(vec![SelectExpr::new(split).with_alias("code")])
        .distinct()
        .from(ctx.table(tables::FACT_TABLE))
        .filter(col(note_column).is_not_null())
        .filter(col(note_column).ne(lit_str("")));

    let observed = ctx.engine.query(&query.to_sql(ctx.dialect())).await?;
    if observed.is_empty() {
        return Err(BuildError::NoNoteCodes);
    }

    let unknown: Vec<String> = observed
        .rows
        .iter()
        .map(|row| row[0].render().trim().to_string())
        .filter(|code| !code.is_empty() && !NOTE_CODES.contains(&code.as_str()))
        .collect();
    if !unknown.is_empty() {
        return Err(BuildError::BadNoteCodes(unknown));
    }
    Ok(())
}

/// Materialise `all_notes(code, language, description)`.
///
/// Joins every distinct raw code string against the code table through
/// the dialect's split-containment predicate
/// (`LIST_CONTAINS(STRING_SPLIT(code, ','), note_codes.code)` on the
/// columnar engine) and aggregates the deduplicated translated
/// descriptions in sorted order.
pub async fn build_all_notes(ctx: &BuildContext, note_column: &str) -> BuildResult<()> {
    let aggregated = Expr::Function {
        name: "STRING_AGG".into(),
        args: vec![table_col("nc", "description"), lit_str(", ")],
        distinct: true,
        order_by: vec![table_col("nc", "description")],
        filter: None,
    };

    let distinct_codes = Query::new()
        .select(vec![SelectExpr::new(col(note_column)).with_alias("code")])
        .distinct()
        .from(ctx.table(tables::FACT_TABLE))
        .filter(col(note_column).is_not_null())
        .filter(col(note_column).ne(lit_str("")));

    let join_on = split_contains(table_col("f", "code"), ",", table_col("nc", "code"));

    let query = Query::new()
        .select(vec![
            SelectExpr::new(table_col("f", "code")).with_alias("code"),
            SelectExpr::new(table_col("nc", "language")).with_alias("language"),
            SelectExpr::new(aggregated).with_alias("description"),
        ])
        .from_subquery(distinct_codes, "f")
        .inner_join(ctx.table(tables::NOTE_CODES).with_alias("nc"), join_on)
        .group_by(vec![table_col("f", "code"), table_col("nc", "language")]);

    let create = CreateTable::new(tables::ALL_NOTES)
        .schema(&ctx.schema)
        .as_select(query);
    ctx.engine.execute(&create.to_sql(ctx.dialect())).await?;
    Ok(())
}
