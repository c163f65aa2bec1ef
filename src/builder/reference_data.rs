//! Reference-data loader.
//!
//! The engine embeds a fixed catalogue (categories, keys, items,
//! localized info, hierarchy) as CSV resources. Each build copies the
//! catalogue into the revision schema restricted to the category keys
//! the dataset's dimensions reference, prunes orphaned info and
//! hierarchy rows, and derives the canonical `{column}_lookup` table so
//! the validator and view builder treat reference dimensions exactly
//! like uploaded lookups.

use crate::builder::BuildContext;
use crate::engine::CellValue;
use crate::error::{BuildError, BuildResult};
use crate::ident::lookup_table_name;
use crate::model::dimension::{Dimension, ReferenceDataExtractor};
use crate::model::types::DataType;
use crate::sql::ddl::{ColumnDef, CreateTable, DropTable};
use crate::sql::dml::Delete;
use crate::sql::expr::{cast, col, lit_str, table_col, Expr, ExprExt};
use crate::sql::query::{Query, SelectExpr};

const CATEGORIES: &str = include_str!("../../resources/reference_data/categories.csv");
const CATEGORY_INFO: &str = include_str!("../../resources/reference_data/category_info.csv");
const CATEGORY_KEY: &str = include_str!("../../resources/reference_data/category_key.csv");
const CATEGORY_KEY_INFO: &str =
    include_str!("../../resources/reference_data/category_key_info.csv");
const REFERENCE_DATA: &str = include_str!("../../resources/reference_data/reference_data.csv");
const REFERENCE_DATA_INFO: &str =
    include_str!("../../resources/reference_data/reference_data_info.csv");
const HIERARCHY: &str = include_str!("../../resources/reference_data/hierarchy.csv");

/// Staging name for the unfiltered item table; dropped after filtering.
const REFERENCE_DATA_ALL: &str = "reference_data_all";

/// (table, embedded csv, column types)
fn catalogue_tables() -> Vec<(&'static str, &'static str, Vec<(&'static str, DataType)>)> {
    use DataType::{BigInt, Text};
    vec![
        ("categories", CATEGORIES, vec![("category", Text)]),
        (
            "category_info",
            CATEGORY_INFO,
            vec![
                ("category", Text),
                ("lang", Text),
                ("description", Text),
                ("notes", Text),
            ],
        ),
        (
            "category_key",
            CATEGORY_KEY,
            vec![("category_key", Text), ("category", Text)],
        ),
        (
            "category_key_info",
            CATEGORY_KEY_INFO,
            vec![
                ("category_key", Text),
                ("lang", Text),
                ("description", Text),
                ("notes", Text),
            ],
        ),
        (
            REFERENCE_DATA_ALL,
            REFERENCE_DATA,
            vec![
                ("item_id", Text),
                ("version_no", BigInt),
                ("sort_order", BigInt),
                ("category_key", Text),
                ("validity_start", Text),
                ("validity_end", Text),
            ],
        ),
        (
            "reference_data_info",
            REFERENCE_DATA_INFO,
            vec![
                ("item_id", Text),
                ("version_no", BigInt),
                ("category_key", Text),
                ("lang", Text),
                ("description", Text),
                ("notes", Text),
            ],
        ),
        (
            "hierarchy",
            HIERARCHY,
            vec![
                ("item_id", Text),
                ("version_no", BigInt),
                ("category_key", Text),
                ("parent_id", Text),
                ("parent_version", BigInt),
                ("parent_category_key", Text),
            ],
        ),
    ]
}

/// Load the catalogue into the revision schema, restricted to the
/// category keys named by any reference-data dimension.
pub async fn load_catalogue(ctx: &BuildContext, category_keys: &[String]) -> BuildResult<()> {
    for (table, embedded, columns) in catalogue_tables() {
        let mut create = CreateTable::new(table).schema(&ctx.schema);
        for (name, data_type) in &columns {
            create = create.column(ColumnDef::new(*name, *data_type));
        }
        ctx.engine.execute(&create.to_sql(ctx.dialect())).await?;

        let rows = parse_embedded(embedded, &columns)?;
        if !rows.is_empty() {
            ctx.engine.append_rows(&ctx.schema, table, rows).await?;
        }
    }

    // Restrict items to the referenced keys, then drop the "all" table.
    let keys: Vec<Expr> = category_keys.iter().map(|k| lit_str(k)).collect();
    let filtered = CreateTable::new("reference_data")
        .schema(&ctx.schema)
        .as_select(
            Query::new()
                .select_star()
                .from(ctx.table(REFERENCE_DATA_ALL))
                .filter(col("category_key").in_list(keys)),
        );
    ctx.engine.execute(&filtered.to_sql(ctx.dialect())).await?;
    let drop_all = DropTable::new(REFERENCE_DATA_ALL).schema(&ctx.schema);
    ctx.engine.execute(&drop_all.to_sql(ctx.dialect())).await?;

    prune_orphans(ctx).await?;
    tracing::info!(keys = ?category_keys, "loaded reference data catalogue");
    Ok(())
}

/// Cascade-prune everything no surviving item references.
async fn prune_orphans(ctx: &BuildContext) -> BuildResult<()> {
    let surviving_items = || {
        Query::new()
            .select(vec![col("item_id")])
            .from(ctx.table("reference_data"))
    };
    let surviving_keys = || {
        Query::new()
            .select(vec![col("category_key")])
            .from(ctx.table("reference_data"))
    };

    let statements = vec![
        Delete::from("reference_data_info")
            .schema(&ctx.schema)
            .filter(col("item_id").not_in_subquery(surviving_items()))
            .to_sql(ctx.dialect()),
        Delete::from("hierarchy")
            .schema(&ctx.schema)
            .filter(
                col("item_id")
                    .not_in_subquery(surviving_items())
                    .paren()
                    .or(col("parent_id").not_in_subquery(surviving_items()).paren()),
            )
            .to_sql(ctx.dialect()),
        Delete::from("category_key")
            .schema(&ctx.schema)
            .filter(col("category_key").not_in_subquery(surviving_keys()))
            .to_sql(ctx.dialect()),
        Delete::from("category_key_info")
            .schema(&ctx.schema)
            .filter(col("category_key").not_in_subquery(surviving_keys()))
            .to_sql(ctx.dialect()),
        Delete::from("categories")
            .schema(&ctx.schema)
            .filter(
                col("category").not_in_subquery(
                    Query::new()
                        .select(vec![col("category")])
                        .from(ctx.table("category_key")),
                ),
            )
            .to_sql(ctx.dialect()),
        Delete::from("category_info")
            .schema(&ctx.schema)
            .filter(
                col("category").not_in_subquery(
                    Query::new()
                        .select(vec![col("category")])
                        .from(ctx.table("categories")),
                ),
            )
            .to_sql(ctx.dialect()),
    ];
    ctx.engine.execute_all(&statements).await
}

/// Derive the canonical `{column}_lookup` for one reference dimension.
pub async fn build_reference_lookup(
    ctx: &BuildContext,
    dimension: &Dimension,
    extractor: &ReferenceDataExtractor,
) -> BuildResult<()> {
    let column = &dimension.fact_table_column;
    let fact_column = ctx
        .dataset
        .columns
        .iter()
        .find(|c| &c.name == column)
        .ok_or_else(|| BuildError::FactTableColumnMissing(column.clone()))?;

    let keys: Vec<Expr> = extractor.categories.iter().map(|k| lit_str(k)).collect();

    let query = Query::new()
        .select(vec![
            SelectExpr::new(cast(table_col("rd", "item_id"), fact_column.data_type))
                .with_alias(column),
            SelectExpr::new(table_col("info", "lang")).with_alias("language"),
            SelectExpr::new(table_col("info", "description")).with_alias("description"),
            SelectExpr::new(table_col("info", "notes")).with_alias("notes"),
            SelectExpr::new(table_col("rd", "sort_order")).with_alias("sort_order"),
            SelectExpr::new(table_col("h", "parent_id")).with_alias("hierarchy"),
        ])
        .from(ctx.table("reference_data").with_alias("rd"))
        .inner_join(
            ctx.table("reference_data_info").with_alias("info"),
            table_col("rd", "item_id")
                .eq(table_col("info", "item_id"))
                .and(table_col("rd", "category_key").eq(table_col("info", "category_key"))),
        )
        .left_join(
            ctx.table("hierarchy").with_alias("h"),
            table_col("rd", "item_id")
                .eq(table_col("h", "item_id"))
                .and(table_col("rd", "category_key").eq(table_col("h", "category_key"))),
        )
        .filter(table_col("rd", "category_key").in_list(keys));

    let create = CreateTable::new(lookup_table_name(column))
        .schema(&ctx.schema)
        .as_select(query);
    ctx.engine.execute(&create.to_sql(ctx.dialect())).await?;
    Ok(())
}

/// Parse an embedded CSV into typed cell rows.
fn parse_embedded(
    embedded: &str,
    columns: &[(&str, DataType)],
) -> BuildResult<Vec<Vec<CellValue>>> {
    let mut reader = csv::Reader::from_reader(embedded.as_bytes());
    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| BuildError::UnknownError(format!("catalogue csv: {e}")))?;
        let mut cells = Vec::with_capacity(columns.len());
        for (i, (name, data_type)) in columns.iter().enumerate() {
            let raw = record.get(i).unwrap_or_default();
            if raw.is_empty() {
                cells.push(CellValue::Null);
                continue;
            }
            cells.push(match data_type {
                DataType::BigInt => CellValue::Int(raw.parse().map_err(|_| {
                    BuildError::UnknownError(format!("catalogue csv: bad integer in {name}"))
                })?),
                _ => CellValue::Text(raw.to_string()),
            });
        }
        rows.push(cells);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_catalogue_resources_parse() {
        for (table, embedded, columns) in catalogue_tables() {
            let rows = parse_embedded(embedded, &columns).unwrap();
            if table != "hierarchy" {
                assert!(!rows.is_empty(), "{table} resource is empty");
            }
            for row in &rows {
                assert_eq!(row.len(), columns.len(), "{table} row width");
            }
        }
    }

    #[test]
    fn test_reference_data_info_covers_both_languages() {
        let columns = catalogue_tables()
            .into_iter()
            .find(|(t, _, _)| *t == "reference_data_info")
            .map(|(_, e, c)| (e, c))
            .unwrap();
        let rows = parse_embedded(columns.0, &columns.1).unwrap();
        let en = rows
            .iter()
            .filter(|r| r[3] == CellValue::Text("en-GB".into()))
            .count();
        let cy = rows
            .iter()
            .filter(|r| r[3] == CellValue::Text("cy-GB".into()))
            .count();
        assert_eq!(en, cy);
        assert!(en > 0);
    }
}
