//! Fact-table assembler.
//!
//! Creates the per-revision fact table and folds the ordered history of
//! data tables into it: ReplaceAll truncates, Add appends, Revise
//! updates by grain where the data value differs (stamping an `r` note
//! code), AddRevise merges. Once the history is applied the composite
//! grain becomes the table's primary key; constraint failures classify
//! into duplicate-fact / incomplete-fact.

use crate::builder::{loader, tables, BuildContext};
use crate::error::{classify_constraint_error, BuildError, BuildResult};
use crate::model::types::DataTableAction;
use crate::model::{Dataset, FactTableColumn, Revision};
use crate::sql::ddl::{ColumnDef, CreateTable, DropTable, RenameTable, TableConstraint};
use crate::sql::dml::{Delete, Insert, Update};
use crate::sql::expr::{case_when, cast, col, lit_str, split_contains, table_col, Expr, ExprExt};
use crate::sql::query::{Query, SelectExpr};

/// Scratch name for the keyed rebuild of the fact table.
const FACT_TABLE_KEYED: &str = "fact_table_keyed";

/// Select the revision history feeding a build of `end`.
///
/// An indexed end revision takes every revision with `0 < index <= its
/// own`; a draft takes the whole published history plus itself. Only
/// revisions carrying a data table participate; an empty result is
/// `NoFirstRevision`. Ordering is ascending by upload time.
pub fn select_history<'a>(
    dataset: &'a Dataset,
    end: &'a Revision,
) -> BuildResult<Vec<&'a Revision>> {
    let mut history: Vec<&Revision> = match end.index {
        Some(end_index) if end_index > 0 => dataset
            .revisions
            .iter()
            .filter(|r| matches!(r.index, Some(i) if i > 0 && i <= end_index))
            .collect(),
        _ => {
            let mut revs: Vec<&Revision> = dataset
                .revisions
                .iter()
                .filter(|r| r.is_indexed())
                .collect();
            revs.push(end);
            revs
        }
    };

    history.retain(|r| r.data_table.is_some());
    if history.is_empty() {
        return Err(BuildError::NoFirstRevision);
    }

    history.sort_by_key(|r| {
        r.data_table
            .as_ref()
            .map(|dt| dt.uploaded_at)
            .unwrap_or(r.created_at)
    });
    Ok(history)
}

/// Create the empty fact table mirroring the dataset's column order.
pub async fn create_fact_table(ctx: &BuildContext) -> BuildResult<()> {
    let mut create = CreateTable::new(tables::FACT_TABLE).schema(&ctx.schema);
    for column in ctx.dataset.ordered_columns() {
        create = create.column(ColumnDef::new(&column.name, column.data_type));
    }
    ctx.engine
        .execute(&create.to_sql(ctx.dialect()))
        .await
        .map_err(|e| BuildError::FactTableCreationFailed(e.to_string()))?;
    Ok(())
}

/// Apply every data table in `history`, in order.
pub async fn apply_history(ctx: &BuildContext, history: &[&Revision]) -> BuildResult<()> {
    for (position, revision) in history.iter().enumerate() {
        let data_table = revision
            .data_table
            .as_ref()
            .ok_or(BuildError::NoDataTable)?;

        let staging_name = format!("load_{position}");
        let staging =
            loader::stage_file(ctx, data_table.file_type, &data_table.filename, &staging_name)
                .await?;

        let projection = map_staging_columns(ctx.dataset.as_ref(), &staging, data_table)?;

        tracing::info!(
            revision = %revision.id,
            action = ?data_table.action,
            file = %data_table.original_filename,
            "applying data table"
        );

        match data_table.action {
            DataTableAction::ReplaceAll => {
                // Unfiltered DELETE: the truncation both backends accept.
                let truncate = Delete::from(tables::FACT_TABLE).schema(&ctx.schema);
                ctx.engine.execute(&truncate.to_sql(ctx.dialect())).await?;
                insert_projection(ctx, &staging_name, &projection).await?;
            }
            DataTableAction::Add => {
                insert_projection(ctx, &staging_name, &projection).await?;
            }
            DataTableAction::Revise => {
                stage_update_table(ctx, &staging_name, &projection).await?;
                apply_revise(ctx).await?;
                drop_table(ctx, tables::UPDATE_TABLE).await?;
            }
            DataTableAction::AddRevise => {
                stage_update_table(ctx, &staging_name, &projection).await?;
                apply_revise(ctx).await?;
                delete_applied_updates(ctx).await?;
                insert_remaining_updates(ctx).await?;
                drop_table(ctx, tables::UPDATE_TABLE).await?;
            }
        }

        drop_table(ctx, &staging_name).await?;
    }
    Ok(())
}

/// Rebuild the fact table under its grain primary key.
///
/// The backend cannot retrofit a key onto a populated table, so the
/// assembler copies into a keyed sibling and renames it into place. A
/// constraint failure on the copy is the uniqueness/non-null check.
pub async fn key_fact_table(ctx: &BuildContext) -> BuildResult<()> {
    let grain: Vec<String> = ctx
        .dataset
        .grain_columns()
        .iter()
        .map(|c| c.name.clone())
        .collect();

    let mut create = CreateTable::new(FACT_TABLE_KEYED).schema(&ctx.schema);
    for column in ctx.dataset.ordered_columns() {
        let mut def = ColumnDef::new(&column.name, column.data_type);
        if column.role.in_grain() {
            def = def.not_null();
        }
        create = create.column(def);
    }
    create = create.constraint(TableConstraint::primary_key(grain));
    ctx.engine.execute(&create.to_sql(ctx.dialect())).await?;

    let copy = Insert::into(FACT_TABLE_KEYED).schema(&ctx.schema).from_select(
        Query::new()
            .select_star()
            .from(ctx.table(tables::FACT_TABLE)),
    );
    if let Err(err) = ctx.engine.execute(&copy.to_sql(ctx.dialect())).await {
        drop_table(ctx, FACT_TABLE_KEYED).await.ok();
        return Err(match err {
            BuildError::Backend(message) => classify_constraint_error(&message),
            other => other,
        });
    }

    drop_table(ctx, tables::FACT_TABLE).await?;
    let rename = RenameTable::new(FACT_TABLE_KEYED, tables::FACT_TABLE).schema(&ctx.schema);
    ctx.engine.execute(&rename.to_sql(ctx.dialect())).await?;
    Ok(())
}

// ============================================================================
// Column mapping
// ============================================================================

/// One fact column paired with the staging expression feeding it.
struct Projection {
    columns: Vec<String>,
    exprs: Vec<SelectExpr>,
}

/// Resolve the data table's column descriptions against the staged
/// headers, casting every file column to its fact column's type.
fn map_staging_columns(
    dataset: &Dataset,
    staging: &loader::StagingTable,
    data_table: &crate::model::DataTable,
) -> BuildResult<Projection> {
    let mut columns = Vec::new();
    let mut exprs = Vec::new();
    let mut described: Vec<&str> = Vec::new();

    for fact_column in dataset.ordered_columns() {
        let descriptor = data_table
            .column_descriptions
            .iter()
            .find(|d| d.fact_table_column == fact_column.name)
            .ok_or_else(|| BuildError::FactTableColumnMissing(fact_column.name.clone()))?;

        if !staging
            .columns
            .iter()
            .any(|(name, _)| name == &descriptor.column_name)
        {
            return Err(BuildError::UnmatchedColumns(vec![descriptor
                .column_name
                .clone()]));
        }

        described.push(descriptor.column_name.as_str());
        columns.push(fact_column.name.clone());
        exprs.push(
            SelectExpr::new(cast(col(&descriptor.column_name), fact_column.data_type))
                .with_alias(&fact_column.name),
        );
    }

    // Headers the descriptors never mention are a configuration error.
    let unmatched: Vec<String> = staging
        .columns
        .iter()
        .map(|(name, _)| name.clone())
        .filter(|name| !described.contains(&name.as_str()))
        .collect();
    if !unmatched.is_empty() {
        return Err(BuildError::UnmatchedColumns(unmatched));
    }

    Ok(Projection { columns, exprs })
}

// ============================================================================
// Action plumbing
// ============================================================================

async fn insert_projection(
    ctx: &BuildContext,
    staging_name: &str,
    projection: &Projection,
) -> BuildResult<()> {
    let insert = Insert::into(tables::FACT_TABLE)
        .schema(&ctx.schema)
        .columns(projection.columns.clone())
        .from_select(
            Query::new()
                .select(projection.exprs.clone())
                .from(ctx.table(staging_name)),
        );
    ctx.engine
        .execute(&insert.to_sql(ctx.dialect()))
        .await
        .map_err(classify_cast_error)?;
    Ok(())
}

async fn stage_update_table(
    ctx: &BuildContext,
    staging_name: &str,
    projection: &Projection,
) -> BuildResult<()> {
    let create = CreateTable::new(tables::UPDATE_TABLE)
        .schema(&ctx.schema)
        .as_select(
            Query::new()
                .select(projection.exprs.clone())
                .from(ctx.table(staging_name)),
        );
    ctx.engine
        .execute(&create.to_sql(ctx.dialect()))
        .await
        .map_err(classify_cast_error)?;
    Ok(())
}

/// Text that will not cast to the declared column type surfaces as a
/// conversion failure from the engine.
fn classify_cast_error(error: BuildError) -> BuildError {
    match error {
        BuildError::Backend(message)
            if message.to_lowercase().contains("could not convert") =>
        {
            BuildError::NonNumericDataValue(message)
        }
        other => other,
    }
}

/// Grain-match predicate between the fact table and the update table.
fn grain_match(dataset: &Dataset) -> Expr {
    let mut predicate: Option<Expr> = None;
    for column in dataset.grain_columns() {
        let eq = table_col(tables::FACT_TABLE, &column.name)
            .eq(table_col(tables::UPDATE_TABLE, &column.name));
        predicate = Some(match predicate {
            Some(p) => p.and(eq),
            None => eq,
        });
    }
    predicate.expect("datasets declare at least one grain column")
}

/// `fact.value` differs from `update.value`, NULLs included.
fn value_differs(data_column: &FactTableColumn) -> Expr {
    let fact = || table_col(tables::FACT_TABLE, &data_column.name);
    let update = || table_col(tables::UPDATE_TABLE, &data_column.name);
    fact()
        .ne(update())
        .paren()
        .or(fact().is_null().paren().and(update().is_not_null().paren()))
        .or(fact().is_not_null().paren().and(update().is_null().paren()))
}

/// Idempotently append `r` to the fact row's note-code string.
///
/// NULL and empty are treated alike; containment is by exact token, not
/// substring, so `nr` never satisfies an `r` check.
fn revised_note_codes(note_column: &FactTableColumn) -> Expr {
    let notes = || table_col(tables::FACT_TABLE, &note_column.name);
    let contains_r = split_contains(notes(), ",", lit_str("r"));
    case_when(
        vec![
            (
                notes().is_null().paren().or(notes().eq(lit_str("")).paren()),
                lit_str("r"),
            ),
            (
                Expr::UnaryOp {
                    op: crate::sql::expr::UnaryOperator::Not,
                    expr: Box::new(contains_r),
                },
                notes().concat(lit_str(",r")),
            ),
        ],
        Some(notes()),
    )
}

async fn apply_revise(ctx: &BuildContext) -> BuildResult<()> {
    let data_column = ctx
        .dataset
        .data_values_column()
        .ok_or(BuildError::NoDataValueColumn)?;

    let mut update = Update::table(tables::FACT_TABLE)
        .schema(&ctx.schema)
        .set(
            &data_column.name,
            table_col(tables::UPDATE_TABLE, &data_column.name),
        )
        .from(ctx.table(tables::UPDATE_TABLE))
        .filter(grain_match(ctx.dataset.as_ref()))
        .filter(value_differs(data_column).paren());

    if let Some(note_column) = ctx.dataset.note_codes_column() {
        update = update.set(&note_column.name, revised_note_codes(note_column));
    }

    ctx.engine.execute(&update.to_sql(ctx.dialect())).await?;
    Ok(())
}

/// Remove update rows whose grain already exists in the fact table
/// (they were applied by the revise pass).
async fn delete_applied_updates(ctx: &BuildContext) -> BuildResult<()> {
    let delete = Delete::from(tables::UPDATE_TABLE)
        .schema(&ctx.schema)
        .using(ctx.table(tables::FACT_TABLE))
        .filter(grain_match(ctx.dataset.as_ref()));
    ctx.engine.execute(&delete.to_sql(ctx.dialect())).await?;
    Ok(())
}

async fn insert_remaining_updates(ctx: &BuildContext) -> BuildResult<()> {
    let columns: Vec<String> = ctx
        .dataset
        .ordered_columns()
        .iter()
        .map(|c| c.name.clone())
        .collect();
    let insert = Insert::into(tables::FACT_TABLE)
        .schema(&ctx.schema)
        .columns(columns.clone())
        .from_select(
            Query::new()
                .select(columns.iter().map(|c| col(c)).collect::<Vec<_>>())
                .from(ctx.table(tables::UPDATE_TABLE)),
        );
    ctx.engine.execute(&insert.to_sql(ctx.dialect())).await?;
    Ok(())
}

async fn drop_table(ctx: &BuildContext, name: &str) -> BuildResult<()> {
    let drop = DropTable::new(name).schema(&ctx.schema).if_exists();
    ctx.engine.execute(&drop.to_sql(ctx.dialect())).await?;
    Ok(())
}
