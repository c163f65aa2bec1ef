//! Measure builder.
//!
//! Materialises the `measure` table from the dataset's measure rows and
//! composes the per-build value-formatting expression: one `CASE` over
//! the measure reference, rounding numeric formats to their declared
//! decimals with thousands grouping, passing text and date-like formats
//! through as text. Values with no measure row fall through to a plain
//! cast.

use crate::builder::{tables, BuildContext};
use crate::engine::CellValue;
use crate::error::{BuildError, BuildResult};
use crate::model::measure::{Measure, MeasureFormat};
use crate::model::types::DataType;
use crate::sql::ddl::{ColumnDef, CreateTable};
use crate::sql::expr::{case_of, cast_text, grouped_number, lit_str, Expr, ExprExt};

/// Create and populate the measure table.
pub async fn build_measure_table(ctx: &BuildContext) -> BuildResult<()> {
    let Some(measure) = &ctx.dataset.measure else {
        return Ok(());
    };
    let fact_column = ctx
        .dataset
        .columns
        .iter()
        .find(|c| c.name == measure.fact_table_column)
        .ok_or_else(|| BuildError::FactTableColumnMissing(measure.fact_table_column.clone()))?;

    let create = CreateTable::new(tables::MEASURE)
        .schema(&ctx.schema)
        .column(ColumnDef::new("reference", fact_column.data_type).not_null())
        .column(ColumnDef::new("language", DataType::Text).not_null())
        .column(ColumnDef::new("description", DataType::Text).not_null())
        .column(ColumnDef::new("notes", DataType::Text))
        .column(ColumnDef::new("sort_order", DataType::BigInt))
        .column(ColumnDef::new("format", DataType::Text).not_null())
        .column(ColumnDef::new("decimals", DataType::BigInt))
        .column(ColumnDef::new("measure_type", DataType::Text))
        .column(ColumnDef::new("hierarchy", DataType::Text));
    ctx.engine.execute(&create.to_sql(ctx.dialect())).await?;

    let reference_is_int = fact_column.data_type == DataType::BigInt;
    let rows: Vec<Vec<CellValue>> = measure
        .measure_table
        .iter()
        .map(|row| {
            let reference = if reference_is_int {
                row.reference
                    .parse::<i64>()
                    .map(CellValue::Int)
                    .unwrap_or_else(|_| CellValue::Text(row.reference.clone()))
            } else {
                CellValue::Text(row.reference.clone())
            };
            vec![
                reference,
                CellValue::Text(row.language.tag().into()),
                CellValue::Text(row.description.clone()),
                row.notes.clone().map(CellValue::Text).unwrap_or(CellValue::Null),
                row.sort_order.map(CellValue::Int).unwrap_or(CellValue::Null),
                CellValue::Text(format_name(row.format).into()),
                row.decimals
                    .map(|d| CellValue::Int(d as i64))
                    .unwrap_or(CellValue::Null),
                row.measure_type
                    .clone()
                    .map(CellValue::Text)
                    .unwrap_or(CellValue::Null),
                row.hierarchy
                    .clone()
                    .map(CellValue::Text)
                    .unwrap_or(CellValue::Null),
            ]
        })
        .collect();

    if !rows.is_empty() {
        ctx.engine
            .append_rows(&ctx.schema, tables::MEASURE, rows)
            .await?;
    }
    Ok(())
}

/// Stable lower-case name stored in the measure table's format column.
pub fn format_name(format: MeasureFormat) -> &'static str {
    match format {
        MeasureFormat::Decimal => "decimal",
        MeasureFormat::Float => "float",
        MeasureFormat::Integer => "integer",
        MeasureFormat::Long => "long",
        MeasureFormat::Percentage => "percentage",
        MeasureFormat::String => "string",
        MeasureFormat::Text => "text",
        MeasureFormat::Date => "date",
        MeasureFormat::DateTime => "datetime",
        MeasureFormat::Time => "time",
    }
}

/// The formatted-value expression for the default views.
///
/// `CASE CAST(measure_col AS TEXT) WHEN <ref> THEN <formatted> ... ELSE
/// CAST(value AS TEXT) END`, one WHEN per distinct reference. With no
/// measure at all, values pass through cast to text.
pub fn measure_format_expr(measure: Option<&Measure>, data_expr: Expr, measure_expr: Expr) -> Expr {
    let fallback = cast_text(data_expr.clone());
    let Some(measure) = measure else {
        return fallback;
    };

    let mut arms = Vec::new();
    for reference in measure.references() {
        let Some((format, decimals)) = measure.format_for(reference) else {
            continue;
        };
        arms.push((
            lit_str(reference),
            format_value_expr(data_expr.clone(), format, decimals),
        ));
    }
    if arms.is_empty() {
        return fallback;
    }
    case_of(cast_text(measure_expr), arms, Some(fallback))
}

/// Render one data value under a measure format.
///
/// Numeric formats round to the declared decimals with thousands
/// grouping through the dialect's grouped-number emitter; text and
/// date-like formats cast through text.
fn format_value_expr(data_expr: Expr, format: MeasureFormat, decimals: Option<u8>) -> Expr {
    let decimals = decimals.unwrap_or_else(|| format.default_decimals());
    if !format.is_numeric() {
        return cast_text(data_expr);
    }

    let grouped = grouped_number(data_expr, decimals);
    match format {
        MeasureFormat::Percentage => grouped.concat(lit_str("%")),
        _ => grouped,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::locale::Locale;
    use crate::model::measure::MeasureRow;
    use crate::sql::expr::col;
    use crate::sql::Dialect;
    use uuid::Uuid;

    fn measure_with(rows: Vec<(&str, MeasureFormat, Option<u8>)>) -> Measure {
        let measure_table = rows
            .into_iter()
            .flat_map(|(reference, format, decimals)| {
                [Locale::En, Locale::Cy].map(|language| MeasureRow {
                    reference: reference.into(),
                    language,
                    description: reference.into(),
                    notes: None,
                    sort_order: None,
                    format,
                    decimals,
                    measure_type: None,
                    hierarchy: None,
                })
            })
            .collect();
        Measure {
            id: Uuid::new_v4(),
            dataset_id: Uuid::new_v4(),
            fact_table_column: "measure".into(),
            join_column: None,
            measure_table,
        }
    }

    #[test]
    fn test_no_measure_is_plain_cast() {
        let expr = measure_format_expr(None, col("data_value"), col("measure"));
        assert_eq!(
            expr.to_sql(Dialect::DuckDb),
            "CAST(\"data_value\" AS TEXT)"
        );
    }

    #[test]
    fn test_case_per_reference() {
        let measure = measure_with(vec![
            ("1", MeasureFormat::Decimal, Some(2)),
            ("2", MeasureFormat::Integer, None),
        ]);
        let sql = measure_format_expr(Some(&measure), col("data_value"), col("measure"))
            .to_sql(Dialect::DuckDb);
        assert!(sql.starts_with("CASE CAST(\"measure\" AS TEXT)"));
        assert!(sql.contains("WHEN '1' THEN FORMAT('{:,.2f}', ROUND(\"data_value\", 2))"));
        assert!(sql.contains("WHEN '2' THEN FORMAT('{:,.0f}', ROUND(\"data_value\", 0))"));
        assert!(sql.ends_with("ELSE CAST(\"data_value\" AS TEXT) END"));
    }

    #[test]
    fn test_percentage_appends_sign() {
        let measure = measure_with(vec![("1", MeasureFormat::Percentage, Some(1))]);
        let sql = measure_format_expr(Some(&measure), col("v"), col("m")).to_sql(Dialect::DuckDb);
        assert!(sql.contains("|| '%'"));
    }

    #[test]
    fn test_numeric_formats_port_to_postgres() {
        let measure = measure_with(vec![("1", MeasureFormat::Decimal, Some(2))]);
        let sql = measure_format_expr(Some(&measure), col("data_value"), col("measure"))
            .to_sql(Dialect::Postgres);
        // Postgres's printf-style format() would echo a fmt spec back
        // verbatim; the grouped rendering must go through TO_CHAR there.
        assert!(sql.contains("TO_CHAR("));
        assert!(sql.contains("'FM999,999,999,990.00'"));
        assert!(!sql.contains("{:,"));
    }

    #[test]
    fn test_text_formats_cast_through() {
        let measure = measure_with(vec![("1", MeasureFormat::Date, None)]);
        let sql = measure_format_expr(Some(&measure), col("v"), col("m")).to_sql(Dialect::DuckDb);
        assert!(sql.contains("WHEN '1' THEN CAST(\"v\" AS TEXT)"));
    }

    #[test]
    fn test_format_names() {
        assert_eq!(format_name(MeasureFormat::Decimal), "decimal");
        assert_eq!(format_name(MeasureFormat::DateTime), "datetime");
    }
}
