//! View builder.
//!
//! Emits, per supported language, the `default_view_*` (formatted
//! measure values, every dimension resolved through its lookup, note
//! descriptions) and `raw_view_*` (same projection, raw values, no
//! measure ordering), records each view's SQL in `metadata`, fills the
//! `filter_table` index, and optionally materialises the views.

use crate::builder::{measure::measure_format_expr, tables, BuildContext};
use crate::engine::CellValue;
use crate::error::{BuildError, BuildResult};
use crate::ident::lookup_table_name;
use crate::locale::{Locale, SUPPORTED_LOCALES};
use crate::model::dimension::{Dimension, DimensionType};
use crate::model::types::{ColumnRole, DataType};
use crate::sql::ddl::{ColumnDef, CreateTable, CreateView, TableConstraint};
use crate::sql::dml::Insert;
use crate::sql::expr::{cast_text, col, lit_str, table_col, ExprExt};
use crate::sql::query::{OrderByExpr, Query, SelectExpr};
use crate::sql::SqlDialect;
use uuid::Uuid;

/// How one fact column reaches the views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BindingKind {
    /// Selected verbatim (no extractor, or degraded by the validator).
    Raw,
    /// Resolved through `{column}_lookup`.
    Lookup,
    /// Resolved through the generated date-period lookup.
    DateLookup,
}

/// One grain column's resolution.
#[derive(Debug, Clone)]
pub struct Binding {
    pub column: String,
    pub kind: BindingKind,
    pub dimension: Option<Dimension>,
}

impl Binding {
    fn display_name(&self, locale: Locale) -> String {
        match &self.dimension {
            Some(d) => d.name_for(locale).to_string(),
            None => self.column.clone(),
        }
    }
}

/// The per-build view plan: every Dimension/Time column bound to its
/// resolution, in declared column order.
#[derive(Debug, Clone)]
pub struct ViewPlan {
    pub bindings: Vec<Binding>,
}

impl ViewPlan {
    /// Bind every grain dimension column, degrading the dimensions the
    /// validator flagged.
    pub fn for_dataset(
        dataset: &crate::model::Dataset,
        degraded: &[Uuid],
    ) -> Self {
        let mut bindings = Vec::new();
        for column in dataset.ordered_columns() {
            if !matches!(column.role, ColumnRole::Dimension | ColumnRole::Time) {
                continue;
            }
            let dimension = dataset
                .dimensions
                .iter()
                .find(|d| d.fact_table_column == column.name)
                .cloned();
            let kind = match &dimension {
                Some(d) if degraded.contains(&d.id) => BindingKind::Raw,
                Some(d) => match d.dimension_type {
                    DimensionType::Date | DimensionType::DatePeriod => BindingKind::DateLookup,
                    DimensionType::LookupTable | DimensionType::ReferenceData => {
                        BindingKind::Lookup
                    }
                    _ => BindingKind::Raw,
                },
                None => BindingKind::Raw,
            };
            bindings.push(Binding {
                column: column.name.clone(),
                kind,
                dimension,
            });
        }
        Self { bindings }
    }

    fn lookup_bindings(&self) -> impl Iterator<Item = &Binding> {
        self.bindings
            .iter()
            .filter(|b| b.kind != BindingKind::Raw)
    }
}

// ============================================================================
// View composition
// ============================================================================

/// The view body for one locale.
fn view_query(ctx: &BuildContext, plan: &ViewPlan, locale: Locale, formatted: bool) -> Query {
    let mut query = Query::new().from(ctx.table(tables::FACT_TABLE).with_alias("f"));
    let mut select = Vec::new();
    let mut order_by: Vec<OrderByExpr> = Vec::new();
    let mut date_order: Vec<OrderByExpr> = Vec::new();

    // Measure join comes first so its ordering leads.
    let measure = ctx.dataset.measure.as_ref();
    if let Some(measure) = measure {
        let join_column = measure.join_column.as_deref().unwrap_or("reference");
        query = query.left_join(
            ctx.table(tables::MEASURE).with_alias("m"),
            cast_text(table_col("f", &measure.fact_table_column))
                .eq(cast_text(table_col("m", join_column)))
                .and(table_col("m", "language").eq(lit_str(locale.tag()))),
        );
        select.push(
            SelectExpr::new(table_col("m", "description"))
                .with_alias(crate::translation::translate("headings.measure", locale)),
        );
        if formatted {
            order_by.push(OrderByExpr::asc(table_col("m", "sort_order")).nulls_last());
            order_by.push(OrderByExpr::asc(table_col("m", join_column)));
        }
    }

    // Dimensions, in declared order.
    for (position, binding) in plan.bindings.iter().enumerate() {
        let alias = format!("l{position}");
        match binding.kind {
            BindingKind::Raw => {
                select.push(
                    SelectExpr::new(table_col("f", &binding.column))
                        .with_alias(&binding.display_name(locale)),
                );
            }
            BindingKind::Lookup | BindingKind::DateLookup => {
                let lookup = lookup_table_name(&binding.column);
                query = query.left_join(
                    ctx.table(&lookup).with_alias(&alias),
                    cast_text(table_col("f", &binding.column))
                        .eq(cast_text(table_col(&alias, &binding.column)))
                        .and(table_col(&alias, "language").eq(lit_str(locale.tag()))),
                );
                select.push(
                    SelectExpr::new(table_col(&alias, "description"))
                        .with_alias(&binding.display_name(locale)),
                );
                if binding.kind == BindingKind::Lookup {
                    order_by.push(OrderByExpr::asc(table_col(&alias, "sort_order")).nulls_last());
                    order_by.push(OrderByExpr::asc(table_col(&alias, "hierarchy")).nulls_last());
                } else {
                    date_order.push(OrderByExpr::asc(table_col(&alias, "end_date")).nulls_last());
                }
            }
        }
    }

    // Data value, formatted through the measure CASE on the default view.
    if let Some(data_column) = ctx.dataset.data_values_column() {
        let raw = table_col("f", &data_column.name);
        let expr = if formatted {
            let measure_expr = measure
                .map(|m| table_col("f", &m.fact_table_column))
                .unwrap_or_else(|| raw.clone());
            measure_format_expr(measure, raw.clone(), measure_expr)
        } else {
            raw
        };
        select.push(SelectExpr::new(expr).with_alias(&data_column.name));
    }

    // Note codes resolve through all_notes.
    if let Some(note_column) = ctx.dataset.note_codes_column() {
        query = query.left_join(
            ctx.table(tables::ALL_NOTES).with_alias("an"),
            table_col("f", &note_column.name)
                .eq(table_col("an", "code"))
                .and(table_col("an", "language").eq(lit_str(locale.tag()))),
        );
        select.push(
            SelectExpr::new(table_col("an", "description"))
                .with_alias(crate::translation::translate("headings.notes", locale)),
        );
    }

    order_by.extend(date_order);
    query.select(select).order_by(order_by)
}

/// View names per locale.
pub fn default_view_name(locale: Locale) -> String {
    format!("default_view_{}", locale.suffix())
}

pub fn raw_view_name(locale: Locale) -> String {
    format!("raw_view_{}", locale.suffix())
}

/// Create every per-language view and record its SQL in metadata.
pub async fn build_views(ctx: &BuildContext, plan: &ViewPlan) -> BuildResult<()> {
    for locale in SUPPORTED_LOCALES {
        for (name, formatted) in [
            (default_view_name(locale), true),
            (raw_view_name(locale), false),
        ] {
            let body = view_query(ctx, plan, locale, formatted);
            let body_sql = body.to_sql(ctx.dialect());
            let create = CreateView::new(&name, body).schema(&ctx.schema).or_replace();
            ctx.engine
                .execute(&create.to_sql(ctx.dialect()))
                .await
                .map_err(|e| BuildError::CubeCreationFailed(e.to_string()))?;

            let record = Insert::into(tables::METADATA)
                .schema(&ctx.schema)
                .columns(["key", "value"])
                .values([lit_str(&name), lit_str(&body_sql)]);
            ctx.engine.execute(&record.to_sql(ctx.dialect())).await?;
        }
    }
    tracing::info!(schema = %ctx.schema, "created per-language views");
    Ok(())
}

/// Materialise the views once the base views exist.
///
/// Backends without materialized views persist the view bodies into
/// plain tables; either way the names are `*_mat_view_{lang}`.
pub async fn materialise_views(ctx: &BuildContext) -> BuildResult<()> {
    for locale in SUPPORTED_LOCALES {
        for (base, mat) in [
            (
                default_view_name(locale),
                format!("default_mat_view_{}", locale.suffix()),
            ),
            (
                raw_view_name(locale),
                format!("raw_mat_view_{}", locale.suffix()),
            ),
        ] {
            let body = Query::new().select_star().from(ctx.table(&base));
            let sql = if ctx.dialect().supports_materialized_view() {
                CreateView::new(&mat, body)
                    .schema(&ctx.schema)
                    .materialized()
                    .to_sql(ctx.dialect())
            } else {
                CreateTable::new(&mat)
                    .schema(&ctx.schema)
                    .as_select(body)
                    .to_sql(ctx.dialect())
            };
            ctx.engine
                .execute(&sql)
                .await
                .map_err(|e| BuildError::CubeCreationFailed(e.to_string()))?;
        }
    }
    Ok(())
}

// ============================================================================
// Filter table
// ============================================================================

/// Create `filter_table` and fill it with one row per
/// `(reference, language, fact_table_column)`.
pub async fn build_filter_table(ctx: &BuildContext, plan: &ViewPlan) -> BuildResult<()> {
    let create = CreateTable::new(tables::FILTER_TABLE)
        .schema(&ctx.schema)
        .column(ColumnDef::new("reference", DataType::Text).not_null())
        .column(ColumnDef::new("language", DataType::Text).not_null())
        .column(ColumnDef::new("fact_table_column", DataType::Text).not_null())
        .column(ColumnDef::new("dimension_name", DataType::Text).not_null())
        .column(ColumnDef::new("description", DataType::Text).not_null())
        .column(ColumnDef::new("hierarchy", DataType::Text))
        .constraint(TableConstraint::primary_key([
            "reference",
            "language",
            "fact_table_column",
        ]));
    ctx.engine.execute(&create.to_sql(ctx.dialect())).await?;

    for binding in plan.lookup_bindings() {
        let lookup = lookup_table_name(&binding.column);
        let query = Query::new()
            .select(vec![
                SelectExpr::new(cast_text(col(&binding.column))).with_alias("reference"),
                SelectExpr::new(col("language")).with_alias("language"),
                SelectExpr::new(col("description")).with_alias("description"),
                SelectExpr::new(col("hierarchy")).with_alias("hierarchy"),
            ])
            .from(ctx.table(&lookup));
        let rows = ctx.engine.query(&query.to_sql(ctx.dialect())).await?;

        let mut out: Vec<Vec<CellValue>> = Vec::with_capacity(rows.len());
        for row in rows.rows {
            let language = row[1].render();
            let locale = SUPPORTED_LOCALES
                .iter()
                .find(|l| l.tag() == language)
                .copied()
                .unwrap_or(Locale::En);
            out.push(vec![
                row[0].clone(),
                row[1].clone(),
                CellValue::Text(binding.column.clone()),
                CellValue::Text(binding.display_name(locale)),
                row[2].clone(),
                row[3].clone(),
            ]);
        }
        if !out.is_empty() {
            ctx.engine
                .append_rows(&ctx.schema, tables::FILTER_TABLE, out)
                .await?;
        }
    }
    Ok(())
}

// ============================================================================
// Filter hierarchy
// ============================================================================

/// A node of the filter tree shown in download UIs.
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct FilterNode {
    pub reference: String,
    pub description: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub children: Vec<FilterNode>,
}

/// Resolve flat `(reference, parent, description)` rows into trees.
///
/// Every child attaches to the parent it names; rows naming no parent
/// (or a parent that does not exist) become roots. Input order is
/// preserved at every level.
pub fn build_hierarchy(rows: &[(String, Option<String>, String)]) -> Vec<FilterNode> {
    use std::collections::HashMap;

    let known: HashMap<&str, usize> = rows
        .iter()
        .enumerate()
        .map(|(i, (reference, _, _))| (reference.as_str(), i))
        .collect();

    // children[i] = indices of rows whose parent is row i
    let mut children: Vec<Vec<usize>> = vec![Vec::new(); rows.len()];
    let mut roots: Vec<usize> = Vec::new();
    for (i, (_, parent, _)) in rows.iter().enumerate() {
        match parent.as_deref().and_then(|p| known.get(p)) {
            Some(&parent_index) if parent_index != i => children[parent_index].push(i),
            _ => roots.push(i),
        }
    }

    fn assemble(
        index: usize,
        rows: &[(String, Option<String>, String)],
        children: &[Vec<usize>],
    ) -> FilterNode {
        FilterNode {
            reference: rows[index].0.clone(),
            description: rows[index].2.clone(),
            children: children[index]
                .iter()
                .map(|&child| assemble(child, rows, children))
                .collect(),
        }
    }

    roots
        .into_iter()
        .map(|root| assemble(root, rows, &children))
        .collect()
}
