//! Dimension validator.
//!
//! For every dimension with a lookup, checks that the set of fact
//! values (cast to text) is covered by the lookup's join column, and
//! that the lookup covers every supported language with non-null
//! descriptions. Unmatched fact values degrade the dimension to raw and
//! surface as an update task; everything else is fatal.

use crate::builder::{tables, BuildContext};
use crate::error::{BuildError, BuildResult};
use crate::ident::lookup_table_name;
use crate::locale::SUPPORTED_LOCALES;
use crate::model::dimension::Dimension;
use crate::sql::expr::{cast_text, col, count_star, lit_str, table_col, Expr, ExprExt};
use crate::sql::query::{OrderByExpr, Query, SelectExpr};

/// How many distinct offending values a failure carries.
const NON_MATCH_SAMPLE_LIMIT: u64 = 10;

/// Fact values missing from a lookup.
#[derive(Debug, Clone)]
pub struct NonMatchReport {
    pub total_non_matching: u64,
    pub non_matching_values: Vec<String>,
}

impl NonMatchReport {
    pub fn is_clean(&self) -> bool {
        self.total_non_matching == 0
    }
}

/// Anti-join the fact column against a lookup's join column.
///
/// The left join always tests the lookup side for NULL, so duplicate
/// join keys in the lookup cannot mask missing fact values.
pub async fn non_matched_rows(
    ctx: &BuildContext,
    fact_column: &str,
    lookup_table: &str,
    join_column: &str,
) -> BuildResult<NonMatchReport> {
    let join = cast_text(table_col("f", fact_column))
        .eq(cast_text(table_col("l", join_column)))
        .and(table_col("l", "language").eq(lit_str(
            crate::locale::SUPPORTED_LOCALES[0].tag(),
        )));

    let base = || {
        Query::new()
            .from(ctx.table(tables::FACT_TABLE).with_alias("f"))
            .left_join(ctx.table(lookup_table).with_alias("l"), join.clone())
            .filter(table_col("f", fact_column).is_not_null())
            .filter(table_col("l", join_column).is_null())
    };

    let total_query = base().select(vec![count_star()]);
    let total = ctx
        .engine
        .query(&total_query.to_sql(ctx.dialect()))
        .await?
        .scalar()
        .and_then(|c| c.as_i64())
        .unwrap_or(0) as u64;

    if total == 0 {
        return Ok(NonMatchReport {
            total_non_matching: 0,
            non_matching_values: Vec::new(),
        });
    }

    let sample_query = base()
        .select(vec![
            SelectExpr::new(cast_text(table_col("f", fact_column))).with_alias("value"),
        ])
        .distinct()
        .order_by(vec![OrderByExpr::asc(cast_text(table_col(
            "f",
            fact_column,
        )))])
        .limit(NON_MATCH_SAMPLE_LIMIT);
    let sample = ctx.engine.query(&sample_query.to_sql(ctx.dialect())).await?;

    Ok(NonMatchReport {
        total_non_matching: total,
        non_matching_values: sample.rows.iter().map(|r| r[0].render()).collect(),
    })
}

/// Validate one dimension's lookup coverage.
///
/// `Ok(None)` is a clean pass; `Ok(Some(error))` is the non-fatal
/// `DimensionNonMatchedRows` the controller records as a task; `Err` is
/// fatal.
pub async fn validate_dimension(
    ctx: &BuildContext,
    dimension: &Dimension,
) -> BuildResult<Option<BuildError>> {
    let column = &dimension.fact_table_column;
    let lookup_table = lookup_table_name(column);

    let report = non_matched_rows(ctx, column, &lookup_table, column).await?;
    if !report.is_clean() {
        tracing::warn!(
            dimension = %column,
            total = report.total_non_matching,
            "fact values missing from lookup; degrading dimension to raw"
        );
        return Ok(Some(BuildError::DimensionNonMatchedRows {
            dimension_id: dimension.id,
            fact_table_column: column.clone(),
            total_non_matching: report.total_non_matching,
            non_matching_values: report.non_matching_values,
        }));
    }

    verify_language_coverage(ctx, column, &lookup_table).await?;
    Ok(None)
}

/// Every reference must carry every supported language with a non-null
/// description.
async fn verify_language_coverage(
    ctx: &BuildContext,
    fact_column: &str,
    lookup_table: &str,
) -> BuildResult<()> {
    let distinct_languages = Expr::Function {
        name: "COUNT".into(),
        args: vec![col("language")],
        distinct: true,
        order_by: vec![],
        filter: None,
    };
    let null_descriptions = Expr::Function {
        name: "COUNT".into(),
        args: vec![crate::sql::expr::star()],
        distinct: false,
        order_by: vec![],
        filter: Some(Box::new(col("description").is_null())),
    };

    let query = Query::new()
        .select(vec![
            SelectExpr::new(cast_text(col(fact_column))).with_alias("reference"),
            SelectExpr::new(distinct_languages).with_alias("languages"),
            SelectExpr::new(null_descriptions).with_alias("null_descriptions"),
        ])
        .from(ctx.table(lookup_table))
        .group_by(vec![cast_text(col(fact_column))]);

    let rows = ctx.engine.query(&query.to_sql(ctx.dialect())).await?;
    let expected = SUPPORTED_LOCALES.len() as i64;
    for row in &rows.rows {
        let reference = row[0].render();
        let languages = row[1].as_i64().unwrap_or(0);
        let nulls = row[2].as_i64().unwrap_or(0);
        if languages < expected {
            return Err(BuildError::InvalidCsv(format!(
                "{fact_column}: reference {reference} covers {languages} of {expected} languages"
            )));
        }
        if nulls > 0 {
            return Err(BuildError::InvalidCsv(format!(
                "{fact_column}: reference {reference} has a NULL description"
            )));
        }
    }
    Ok(())
}

/// Validate the measure column against the measure table.
pub async fn validate_measure(ctx: &BuildContext) -> BuildResult<Option<BuildError>> {
    let Some(measure) = &ctx.dataset.measure else {
        return Ok(None);
    };
    let join_column = measure.join_column.as_deref().unwrap_or("reference");
    let report = non_matched_rows(
        ctx,
        &measure.fact_table_column,
        tables::MEASURE,
        join_column,
    )
    .await?;
    if report.is_clean() {
        Ok(None)
    } else {
        Ok(Some(BuildError::MeasureNonMatchedRows {
            total_non_matching: report.total_non_matching,
            non_matching_values: report.non_matching_values,
        }))
    }
}
