//! Output service.
//!
//! Serves the finished cube: cursor-backed streaming exports (CSV,
//! JSON, Parquet, multi-sheet workbook), paginated previews and the
//! pivot query. All reads go through `default_view_{lang}` with sort
//! and filter predicates resolved against `filter_table`.

pub mod csv;
pub mod json;
pub mod preview;
pub mod xlsx;

use std::sync::Arc;

use crate::builder::tables;
use crate::builder::views::default_view_name;
use crate::engine::{RowSet, SqlEngine};
use crate::error::{BuildError, BuildResult};
use crate::locale::Locale;
use crate::sql::expr::{col, lit_str, Expr, ExprExt};
use crate::sql::query::{OrderByExpr, Query, TableRef};
use crate::sql::SqlDialect;

/// Download formats the cube serves.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Csv,
    Json,
    Parquet,
    Excel,
}

impl OutputFormat {
    pub fn content_type(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "text/csv",
            OutputFormat::Json => "application/json",
            OutputFormat::Parquet => "application/vnd.apache.parquet",
            OutputFormat::Excel => "application/vnd.ms-excel",
        }
    }

    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
            OutputFormat::Parquet => "parquet",
            OutputFormat::Excel => "xlsx",
        }
    }
}

/// A filter over one dimension, by lookup reference.
#[derive(Debug, Clone)]
pub struct FilterBy {
    pub fact_table_column: String,
    pub references: Vec<String>,
}

/// Sort over one view column.
#[derive(Debug, Clone)]
pub struct SortBy {
    pub column: String,
    pub descending: bool,
}

/// Options applied to every cube read.
#[derive(Debug, Clone, Default)]
pub struct SelectOptions {
    pub sort_by: Option<SortBy>,
    pub filters: Vec<FilterBy>,
}

/// Resolve `SelectOptions` into a query over `default_view_{lang}`.
///
/// Filters arrive as lookup references and resolve to the view's
/// description column through `filter_table`; a reference that resolves
/// to nothing filters nothing out of caution the other way: it yields
/// an always-false predicate for that dimension.
pub async fn resolve_view_query(
    engine: &Arc<dyn SqlEngine>,
    schema: &str,
    locale: Locale,
    options: &SelectOptions,
) -> BuildResult<Query> {
    let view = default_view_name(locale);
    let mut query = Query::new()
        .select_star()
        .from(TableRef::new(&view).with_schema(schema));

    for filter in &options.filters {
        let (dimension_name, descriptions) =
            resolve_filter(engine, schema, locale, filter).await?;
        let values: Vec<Expr> = descriptions.iter().map(|d| lit_str(d)).collect();
        let predicate = if values.is_empty() {
            // No surviving references: match nothing rather than everything.
            crate::sql::expr::lit_bool(false)
        } else {
            col(&dimension_name).in_list(values)
        };
        query = query.filter(predicate);
    }

    if let Some(sort) = &options.sort_by {
        validate_view_column(engine, schema, &view, &sort.column).await?;
        let order = if sort.descending {
            OrderByExpr::desc(col(&sort.column))
        } else {
            OrderByExpr::asc(col(&sort.column))
        };
        query = query.order_by(vec![order]);
    }

    Ok(query)
}

/// Map filter references onto `(dimension_name, descriptions)` rows of
/// `filter_table` for the locale.
async fn resolve_filter(
    engine: &Arc<dyn SqlEngine>,
    schema: &str,
    locale: Locale,
    filter: &FilterBy,
) -> BuildResult<(String, Vec<String>)> {
    let references: Vec<Expr> = filter.references.iter().map(|r| lit_str(r)).collect();
    let query = Query::new()
        .select(vec![col("dimension_name"), col("description")])
        .from(TableRef::new(tables::FILTER_TABLE).with_schema(schema))
        .filter(col("fact_table_column").eq(lit_str(&filter.fact_table_column)))
        .filter(col("language").eq(lit_str(locale.tag())))
        .filter(col("reference").in_list(references));

    let rows = engine.query(&query.to_sql(engine.dialect())).await?;
    let dimension_name = rows
        .rows
        .first()
        .map(|r| r[0].render())
        .unwrap_or_else(|| filter.fact_table_column.clone());
    let descriptions = rows.rows.iter().map(|r| r[1].render()).collect();
    Ok((dimension_name, descriptions))
}

/// Reject sort columns the view does not expose.
async fn validate_view_column(
    engine: &Arc<dyn SqlEngine>,
    schema: &str,
    view: &str,
    column: &str,
) -> BuildResult<()> {
    let probe = Query::new()
        .select_star()
        .from(TableRef::new(view).with_schema(schema))
        .limit(0);
    let rows = engine.query(&probe.to_sql(engine.dialect())).await?;
    if rows.columns.iter().any(|c| c == column) {
        Ok(())
    } else {
        Err(BuildError::UnknownError(format!(
            "unknown sort column: {column}"
        )))
    }
}

/// Cursor over a view query, fetching `page_size` rows per round trip.
pub struct ViewCursor {
    engine: Arc<dyn SqlEngine>,
    base: Query,
    page_size: u64,
    offset: u64,
    done: bool,
}

impl ViewCursor {
    pub fn new(engine: Arc<dyn SqlEngine>, base: Query, page_size: u64) -> Self {
        Self {
            engine,
            base,
            page_size: page_size.max(1),
            offset: 0,
            done: false,
        }
    }

    /// Fetch the next page; `None` once the result set is exhausted.
    pub async fn next_page(&mut self) -> BuildResult<Option<RowSet>> {
        if self.done {
            return Ok(None);
        }
        let page = self
            .base
            .clone()
            .limit(self.page_size)
            .offset(self.offset);
        let rows = self
            .engine
            .query(&page.to_sql(self.engine.dialect()))
            .await?;
        if (rows.len() as u64) < self.page_size {
            self.done = true;
        }
        self.offset += rows.len() as u64;
        if rows.is_empty() && self.offset > 0 {
            return Ok(None);
        }
        Ok(Some(rows))
    }
}

/// Export a view to Parquet through the engine's own writer.
pub async fn export_parquet(
    engine: &Arc<dyn SqlEngine>,
    schema: &str,
    locale: Locale,
    path: &str,
) -> BuildResult<()> {
    let dialect = engine.dialect();
    let sql = format!(
        "COPY (SELECT * FROM {}.{}) TO {} (FORMAT parquet)",
        dialect.quote_identifier(schema),
        dialect.quote_identifier(&default_view_name(locale)),
        dialect.quote_string(path),
    );
    engine.execute(&sql).await?;
    Ok(())
}

/// The pivot read: one row per `y` value, one aggregated column per
/// distinct `x` value, optional single-value filters on other columns.
pub async fn pivot(
    engine: &Arc<dyn SqlEngine>,
    schema: &str,
    data_column: &str,
    x_column: &str,
    y_column: &str,
    filters: &[(String, String)],
) -> BuildResult<RowSet> {
    let fact = || TableRef::new(tables::FACT_TABLE).with_schema(schema);

    let distinct_x = Query::new()
        .select(vec![crate::sql::expr::cast_text(col(x_column))])
        .distinct()
        .from(fact())
        .order_by(vec![OrderByExpr::asc(crate::sql::expr::cast_text(col(
            x_column,
        )))]);
    let x_values = engine.query(&distinct_x.to_sql(engine.dialect())).await?;

    let mut select = vec![crate::sql::query::SelectExpr::new(col(y_column)).with_alias(y_column)];
    for x_row in &x_values.rows {
        let value = x_row[0].render();
        let aggregated = Expr::Function {
            name: "ARRAY_AGG".into(),
            args: vec![col(data_column)],
            distinct: false,
            order_by: vec![],
            filter: Some(Box::new(
                crate::sql::expr::cast_text(col(x_column)).eq(lit_str(&value)),
            )),
        };
        select.push(crate::sql::query::SelectExpr::new(aggregated).with_alias(&value));
    }

    let mut query = Query::new()
        .select(select)
        .from(fact())
        .group_by(vec![col(y_column)])
        .order_by(vec![OrderByExpr::asc(col(y_column))]);
    for (column, value) in filters {
        query = query.filter(crate::sql::expr::cast_text(col(column)).eq(lit_str(value)));
    }

    engine.query(&query.to_sql(engine.dialect())).await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_content_types() {
        assert_eq!(OutputFormat::Csv.content_type(), "text/csv");
        assert_eq!(OutputFormat::Json.content_type(), "application/json");
        assert_eq!(
            OutputFormat::Parquet.content_type(),
            "application/vnd.apache.parquet"
        );
        assert_eq!(
            OutputFormat::Excel.content_type(),
            "application/vnd.ms-excel"
        );
    }

    #[test]
    fn test_extensions() {
        assert_eq!(OutputFormat::Excel.extension(), "xlsx");
        assert_eq!(OutputFormat::Parquet.extension(), "parquet");
    }
}
