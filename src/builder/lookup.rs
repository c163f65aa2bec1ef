//! Lookup-dimension builder.
//!
//! Turns an uploaded lookup file into the canonical per-dimension
//! lookup table `{sanitised(column)}_lookup` with schema
//! `{column (same type), language, description, notes, sort_order,
//! hierarchy}`. Wide-form files union one projection per language;
//! long-form files route a language column through the closed spelling
//! set.

use crate::builder::{loader, BuildContext};
use crate::error::{BuildError, BuildResult};
use crate::ident::lookup_table_name;
use crate::locale::{Locale, SUPPORTED_LOCALES};
use crate::model::dimension::{Dimension, LookupTableExtractor};
use crate::model::types::{DataType, FileType};
use crate::sql::ddl::{CreateTable, DropTable};
use crate::sql::expr::{case_of, cast, col, func, lit_null, lit_str, Expr};
use crate::sql::query::{Query, SelectExpr, UnionChain};

/// Build the lookup table for one dimension from its uploaded file.
///
/// The staging table is dropped on every path, failure included.
pub async fn build_lookup(
    ctx: &BuildContext,
    dimension: &Dimension,
    extractor: &LookupTableExtractor,
) -> BuildResult<()> {
    let column = &dimension.fact_table_column;
    let filename = dimension
        .lookup_table
        .as_ref()
        .ok_or_else(|| BuildError::InvalidCsv(format!("{column}: no lookup file attached")))?;
    let file_type = FileType::from_filename(filename)
        .ok_or_else(|| BuildError::UnknownFileType(filename.clone()))?;

    let staging_name = format!("lookup_{}", crate::ident::sanitise(column));
    let staging = loader::stage_file(ctx, file_type, filename, &staging_name).await?;

    let result = emit_lookup(ctx, dimension, extractor, &staging).await;
    drop_staging(ctx, &staging_name).await;
    result
}

async fn emit_lookup(
    ctx: &BuildContext,
    dimension: &Dimension,
    extractor: &LookupTableExtractor,
    staging: &loader::StagingTable,
) -> BuildResult<()> {
    let column = &dimension.fact_table_column;
    if extractor.description_columns.is_empty() {
        return Err(BuildError::InvalidCsv(format!(
            "{column}: no description columns"
        )));
    }

    let join_column = match &dimension.join_column {
        Some(explicit) => explicit.clone(),
        None => infer_join_column(column, staging)?,
    };

    let fact_column = ctx
        .dataset
        .columns
        .iter()
        .find(|c| &c.name == column)
        .ok_or_else(|| BuildError::FactTableColumnMissing(column.clone()))?;

    let table_name = lookup_table_name(column);
    let projections = if extractor.is_wide_form {
        wide_form_projections(
            ctx,
            &staging.name,
            &join_column,
            column,
            extractor,
            fact_column.data_type,
        )?
    } else {
        vec![long_form_projection(
            ctx,
            &staging.name,
            &join_column,
            column,
            extractor,
            fact_column.data_type,
        )?]
    };

    let create = CreateTable::new(&table_name)
        .schema(&ctx.schema)
        .as_select_union(UnionChain::union_all(projections));
    ctx.engine.execute(&create.to_sql(ctx.dialect())).await?;

    tracing::info!(dimension = %column, table = %table_name, "built lookup table");
    Ok(())
}

/// Infer the join column: the single staged column whose name does not
/// start with a translated keyword for description, sort, hierarchy,
/// note or language.
pub fn infer_join_column(
    dimension_column: &str,
    staging: &loader::StagingTable,
) -> BuildResult<String> {
    let keywords = crate::translation::reserved_header_keywords();
    let candidates: Vec<&String> = staging
        .columns
        .iter()
        .map(|(name, _)| name)
        .filter(|name| {
            let lower = name.to_lowercase();
            !keywords.iter().any(|kw| lower.starts_with(kw.as_str()))
        })
        .collect();

    match candidates.as_slice() {
        [single] => Ok((*single).clone()),
        _ => Err(BuildError::NoJoinColumn(format!(
            "{dimension_column}: {} candidate columns",
            candidates.len()
        ))),
    }
}

/// One projection per locale over the wide-form staging table.
fn wide_form_projections(
    ctx: &BuildContext,
    staging_name: &str,
    join_column: &str,
    fact_column: &str,
    extractor: &LookupTableExtractor,
    join_type: DataType,
) -> BuildResult<Vec<Query>> {
    let mut queries = Vec::new();
    for locale in SUPPORTED_LOCALES {
        let description = extractor.description_column_for(locale).ok_or_else(|| {
            BuildError::InvalidCsv(format!(
                "{fact_column}: no description column for {}",
                locale.tag()
            ))
        })?;
        queries.push(projection(
            ctx,
            staging_name,
            join_column,
            fact_column,
            join_type,
            lit_str(locale.tag()),
            description,
            extractor.notes_column_for(locale),
            extractor,
        ));
    }
    Ok(queries)
}

/// The single long-form projection; the language column maps through
/// the closed spelling set.
fn long_form_projection(
    ctx: &BuildContext,
    staging_name: &str,
    join_column: &str,
    fact_column: &str,
    extractor: &LookupTableExtractor,
    join_type: DataType,
) -> BuildResult<Query> {
    let description = extractor
        .description_column_for(Locale::En)
        .ok_or_else(|| BuildError::InvalidCsv(format!("{fact_column}: no description column")))?;

    let language_expr = match (&extractor.language_column, extractor.table_language) {
        (Some(language_column), _) => spelling_case(language_column),
        (None, Some(locale)) => lit_str(locale.tag()),
        (None, None) => {
            return Err(BuildError::InvalidCsv(format!(
                "{fact_column}: long-form lookup needs a language column or a table language"
            )))
        }
    };

    Ok(projection(
        ctx,
        staging_name,
        join_column,
        fact_column,
        join_type,
        language_expr,
        description,
        extractor.notes_column_for(Locale::En),
        extractor,
    ))
}

/// `CASE lower(trim(lang_col)) WHEN 'en' THEN 'en-GB' ... END`
fn spelling_case(language_column: &str) -> Expr {
    let operand = func("LOWER", vec![func("TRIM", vec![col(language_column)])]);
    let mut arms = Vec::new();
    for locale in SUPPORTED_LOCALES {
        for spelling in locale.spellings() {
            arms.push((lit_str(spelling), lit_str(locale.tag())));
        }
    }
    case_of(operand, arms, Some(lit_null()))
}

#[allow(clippy::too_many_arguments)]
fn projection(
    ctx: &BuildContext,
    staging_name: &str,
    join_column: &str,
    fact_column: &str,
    join_type: DataType,
    language_expr: Expr,
    description_column: &str,
    notes_column: Option<&str>,
    extractor: &LookupTableExtractor,
) -> Query {
    let notes = match notes_column {
        Some(name) => col(name),
        None => cast(lit_null(), DataType::Text),
    };
    let sort_order = match &extractor.sort_column {
        Some(name) => cast(col(name), DataType::BigInt),
        None => cast(lit_null(), DataType::BigInt),
    };
    let hierarchy = match &extractor.hierarchy_column {
        Some(name) => cast(col(name), DataType::Text),
        None => cast(lit_null(), DataType::Text),
    };

    Query::new()
        .select(vec![
            SelectExpr::new(cast(col(join_column), join_type)).with_alias(fact_column),
            SelectExpr::new(language_expr).with_alias("language"),
            SelectExpr::new(col(description_column)).with_alias("description"),
            SelectExpr::new(notes).with_alias("notes"),
            SelectExpr::new(sort_order).with_alias("sort_order"),
            SelectExpr::new(hierarchy).with_alias("hierarchy"),
        ])
        .from(ctx.table(staging_name))
}

async fn drop_staging(ctx: &BuildContext, staging_name: &str) {
    let drop = DropTable::new(staging_name).schema(&ctx.schema).if_exists();
    if let Err(e) = ctx.engine.execute(&drop.to_sql(ctx.dialect())).await {
        tracing::warn!(table = staging_name, error = %e, "failed to drop lookup staging table");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::types::DataType;

    fn staging(names: &[&str]) -> loader::StagingTable {
        loader::StagingTable {
            name: "lookup_x".into(),
            columns: names.iter().map(|n| (n.to_string(), DataType::Text)).collect(),
        }
    }

    #[test]
    fn test_infer_join_column_single_candidate() {
        let staging = staging(&["AreaCode", "Description_en", "Description_cy", "Sort_order"]);
        assert_eq!(infer_join_column("area", &staging).unwrap(), "AreaCode");
    }

    #[test]
    fn test_infer_join_column_welsh_keywords_excluded() {
        let staging = staging(&["Cod", "Disgrifiad", "Trefn"]);
        assert_eq!(infer_join_column("area", &staging).unwrap(), "Cod");
    }

    #[test]
    fn test_infer_join_column_ambiguous() {
        let staging = staging(&["Code", "OtherCode", "Description"]);
        assert!(matches!(
            infer_join_column("area", &staging),
            Err(BuildError::NoJoinColumn(_))
        ));
    }

    #[test]
    fn test_infer_join_column_none_left() {
        let staging = staging(&["Description", "Sort"]);
        assert!(matches!(
            infer_join_column("area", &staging),
            Err(BuildError::NoJoinColumn(_))
        ));
    }

    #[test]
    fn test_spelling_case_covers_closed_set() {
        let sql = spelling_case("Language").to_sql(crate::sql::Dialect::DuckDb);
        assert!(sql.contains("WHEN 'en' THEN 'en-GB'"));
        assert!(sql.contains("WHEN 'cymraeg' THEN 'cy-GB'"));
        assert!(sql.contains("WHEN 'welsh' THEN 'cy-GB'"));
        assert!(sql.ends_with("ELSE NULL END"));
    }
}
