//! Revision controller.
//!
//! Orchestrates one cube build for one end revision: schema creation,
//! fact assembly, lookup builders, validation, views, metadata stamps,
//! and the cube state machine
//! `Absent -> Building -> AwaitingMaterialisation -> Complete` with any
//! failure landing in `Failed`. Materialisation runs as a separate
//! entry point so callers can fire it after responding; its failure
//! marks the build failed without touching the base tables.

use std::sync::Arc;
use std::time::{Duration, Instant};

use uuid::Uuid;

use crate::builder::date_period::DateBounds;
use crate::builder::{
    date_period, fact_table, lookup, measure, note_codes, reference_data, tables, validator,
    views, BuildContext,
};
use crate::config::BuildSettings;
use crate::engine::SqlEngine;
use crate::error::{BuildError, BuildResult};
use crate::filestore::FileStore;
use crate::model::dimension::Extractor;
use crate::model::types::{CubeState, DataType};
use crate::model::{Dataset, DimensionUpdateTask, Revision, RevisionTask};
use crate::sql::ddl::{ColumnDef, CreateSchema, CreateTable, DropSchema};
use crate::sql::dml::{Delete, Insert};
use crate::sql::expr::{col, lit_str, ExprExt};

/// Builds cubes against one backend and one file store.
pub struct CubeBuilder {
    engine: Arc<dyn SqlEngine>,
    store: Arc<dyn FileStore>,
    settings: BuildSettings,
}

/// What a finished (or failed) build hands back to the caller.
#[derive(Debug, Clone)]
pub struct BuildOutcome {
    pub build_id: Uuid,
    pub revision_id: Uuid,
    pub schema: String,
    pub state: CubeState,
    /// Dimensions degraded to raw this build, plus a measure entry when
    /// the measure table missed references on an update revision.
    pub tasks: Option<RevisionTask>,
    pub date_bounds: Option<DateBounds>,
    pub stage_timings: Vec<(&'static str, Duration)>,
}

impl CubeBuilder {
    pub fn new(
        engine: Arc<dyn SqlEngine>,
        store: Arc<dyn FileStore>,
        settings: BuildSettings,
    ) -> Self {
        Self {
            engine,
            store,
            settings,
        }
    }

    /// Build the cube for `end_revision_id`, up to the base views.
    ///
    /// On success the cube is `AwaitingMaterialisation`; call
    /// [`materialise`](Self::materialise) to finish. On failure the
    /// schema is dropped when `cleanup_on_failure` is set and left for
    /// post-mortem otherwise.
    pub async fn build_cube(
        &self,
        dataset: Arc<Dataset>,
        end_revision_id: Uuid,
    ) -> BuildResult<BuildOutcome> {
        let end_revision = dataset
            .revision(end_revision_id)
            .ok_or(BuildError::NoFirstRevision)?
            .clone();

        let build_id = Uuid::new_v4();
        let schema = end_revision_id.to_string();
        let ctx = BuildContext::new(
            self.engine.clone(),
            self.store.clone(),
            dataset.clone(),
            &schema,
        );

        tracing::info!(
            dataset_id = %dataset.id,
            revision_id = %end_revision_id,
            build_id = %build_id,
            "cube build starting"
        );

        let mut outcome = BuildOutcome {
            build_id,
            revision_id: end_revision_id,
            schema: schema.clone(),
            state: CubeState::Building,
            tasks: None,
            date_bounds: None,
            stage_timings: Vec::new(),
        };

        match self.run_stages(&ctx, &end_revision, &mut outcome).await {
            Ok(()) => {
                outcome.state = CubeState::AwaitingMaterialisation;
                self.set_metadata(&ctx, "build_status", CubeState::AwaitingMaterialisation.build_status())
                    .await?;
                Ok(outcome)
            }
            Err(error) => {
                tracing::error!(
                    build_id = %build_id,
                    error = %error,
                    "cube build failed"
                );
                // Best effort: the stamp and the cleanup must not mask
                // the original failure.
                let _ = self
                    .set_metadata(&ctx, "build_status", CubeState::Failed.build_status())
                    .await;
                if self.settings.cleanup_on_failure {
                    let _ = self.drop_cube(&schema).await;
                }
                Err(error)
            }
        }
    }

    /// Materialise the views of a cube in `AwaitingMaterialisation`.
    pub async fn materialise(
        &self,
        dataset: Arc<Dataset>,
        end_revision_id: Uuid,
    ) -> BuildResult<()> {
        let schema = end_revision_id.to_string();
        let ctx = BuildContext::new(self.engine.clone(), self.store.clone(), dataset, &schema);

        match views::materialise_views(&ctx).await {
            Ok(()) => {
                self.set_metadata(&ctx, "build_finished", &now_iso()).await?;
                self.set_metadata(&ctx, "build_status", CubeState::Complete.build_status())
                    .await?;
                tracing::info!(schema = %schema, "cube complete");
                Ok(())
            }
            Err(error) => {
                // Base tables stay; only the status flips.
                let _ = self
                    .set_metadata(&ctx, "build_status", CubeState::Failed.build_status())
                    .await;
                Err(error)
            }
        }
    }

    /// Drop a revision's schema and everything in it.
    pub async fn drop_cube(&self, schema: &str) -> BuildResult<()> {
        let drop = DropSchema::new(schema).if_exists().cascade();
        self.engine.execute(&drop.to_sql(self.engine.dialect())).await?;
        Ok(())
    }

    // ========================================================================
    // Stages
    // ========================================================================

    async fn run_stages(
        &self,
        ctx: &BuildContext,
        end_revision: &Revision,
        outcome: &mut BuildOutcome,
    ) -> BuildResult<()> {
        let dataset = ctx.dataset.clone();
        let is_update_revision = end_revision.previous_revision_id.is_some()
            || matches!(end_revision.index, Some(i) if i > 1);

        // Two columns collapsing onto one sanitised identifier is a
        // configuration error, not something to paper over downstream.
        let collisions =
            crate::ident::find_collisions(dataset.columns.iter().map(|c| c.name.as_str()));
        if !collisions.is_empty() {
            return Err(BuildError::UnmatchedColumns(collisions));
        }

        // -- schema and metadata ------------------------------------------
        let started = self.stage_start();
        let create_schema = CreateSchema::new(&ctx.schema).if_not_exists();
        self.engine
            .execute(&create_schema.to_sql(ctx.dialect()))
            .await?;
        let metadata = CreateTable::new(tables::METADATA)
            .schema(&ctx.schema)
            .column(ColumnDef::new("key", DataType::Text).not_null())
            .column(ColumnDef::new("value", DataType::Text));
        self.engine.execute(&metadata.to_sql(ctx.dialect())).await?;
        self.set_metadata(ctx, "build_id", &outcome.build_id.to_string())
            .await?;
        self.set_metadata(ctx, "build_start", &now_iso()).await?;
        self.set_metadata(ctx, "build_status", CubeState::Building.build_status())
            .await?;
        self.stage_end(outcome, "schema", started);

        // -- fact table ----------------------------------------------------
        let started = self.stage_start();
        let history = fact_table::select_history(&dataset, end_revision)?;
        fact_table::create_fact_table(ctx).await?;
        fact_table::apply_history(ctx, &history).await?;
        fact_table::key_fact_table(ctx).await?;
        self.stage_end(outcome, "fact_table", started);

        // -- dimension lookups --------------------------------------------
        let started = self.stage_start();
        let mut bounds: Option<DateBounds> = None;
        let reference_categories: Vec<String> = dataset
            .dimensions
            .iter()
            .filter_map(|d| match &d.extractor {
                Some(Extractor::ReferenceData(extractor)) => Some(extractor.categories.clone()),
                _ => None,
            })
            .flatten()
            .collect();
        if !reference_categories.is_empty() {
            reference_data::load_catalogue(ctx, &reference_categories).await?;
        }

        for dimension in &dataset.dimensions {
            match &dimension.extractor {
                Some(Extractor::Date(extractor)) => {
                    if let Some(observed) =
                        date_period::build_date_lookup(ctx, dimension, extractor).await?
                    {
                        bounds = Some(match bounds {
                            Some(b) => b.widen(observed),
                            None => observed,
                        });
                    }
                }
                Some(Extractor::LookupTable(extractor)) => {
                    lookup::build_lookup(ctx, dimension, extractor).await?;
                }
                Some(Extractor::ReferenceData(extractor)) => {
                    reference_data::build_reference_lookup(ctx, dimension, extractor).await?;
                }
                Some(Extractor::Number(_)) | None => {}
            }
        }
        outcome.date_bounds = bounds;
        if let Some(bounds) = bounds {
            self.set_metadata(ctx, "start_date", &bounds.start.format("%Y-%m-%d").to_string())
                .await?;
            self.set_metadata(ctx, "end_date", &bounds.end.format("%Y-%m-%d").to_string())
                .await?;
        }
        self.stage_end(outcome, "lookups", started);

        // -- measure and note codes ---------------------------------------
        let started = self.stage_start();
        measure::build_measure_table(ctx).await?;
        if let Some(note_column) = dataset.note_codes_column() {
            note_codes::build_note_code_table(ctx).await?;
            match note_codes::validate_note_codes(ctx, &note_column.name).await {
                Ok(()) => {}
                Err(BuildError::NoNoteCodes) => {
                    tracing::info!("note-code column carries no codes");
                }
                Err(error) => return Err(error),
            }
            note_codes::build_all_notes(ctx, &note_column.name).await?;
        }
        self.stage_end(outcome, "measure_notes", started);

        // -- validation ----------------------------------------------------
        let started = self.stage_start();
        let mut degraded: Vec<Uuid> = Vec::new();
        let mut dimension_tasks: Vec<DimensionUpdateTask> = Vec::new();
        for dimension in &dataset.dimensions {
            let has_lookup = matches!(
                dimension.extractor,
                Some(Extractor::Date(_))
                    | Some(Extractor::LookupTable(_))
                    | Some(Extractor::ReferenceData(_))
            );
            if !has_lookup {
                continue;
            }
            match validator::validate_dimension(ctx, dimension).await? {
                None => {}
                Some(BuildError::DimensionNonMatchedRows { dimension_id, .. }) => {
                    degraded.push(dimension_id);
                    dimension_tasks.push(DimensionUpdateTask {
                        id: dimension_id,
                        lookup_table_updated: false,
                    });
                }
                Some(other) => return Err(other),
            }
        }

        let mut measure_task = None;
        if let Some(error) = validator::validate_measure(ctx).await? {
            if is_update_revision {
                // New measure references on an update revision need user
                // re-confirmation, like a dimension lookup gap.
                if let Some(m) = &dataset.measure {
                    measure_task = Some(DimensionUpdateTask {
                        id: m.id,
                        lookup_table_updated: false,
                    });
                }
            } else {
                return Err(error);
            }
        }

        if is_update_revision && (!dimension_tasks.is_empty() || measure_task.is_some()) {
            outcome.tasks = Some(RevisionTask {
                dimensions: dimension_tasks.clone(),
                measure: measure_task,
            });
        } else if !dimension_tasks.is_empty() {
            outcome.tasks = Some(RevisionTask {
                dimensions: dimension_tasks.clone(),
                measure: None,
            });
        }
        self.stage_end(outcome, "validate", started);

        // -- views and filter index ---------------------------------------
        let started = self.stage_start();
        let plan = views::ViewPlan::for_dataset(&dataset, &degraded);
        views::build_filter_table(ctx, &plan).await?;
        views::build_views(ctx, &plan).await?;
        self.stage_end(outcome, "views", started);

        Ok(())
    }

    // ========================================================================
    // Plumbing
    // ========================================================================

    /// Replace-then-insert keeps metadata writes idempotent.
    async fn set_metadata(&self, ctx: &BuildContext, key: &str, value: &str) -> BuildResult<()> {
        let delete = Delete::from(tables::METADATA)
            .schema(&ctx.schema)
            .filter(col("key").eq(lit_str(key)));
        self.engine.execute(&delete.to_sql(ctx.dialect())).await?;
        let insert = Insert::into(tables::METADATA)
            .schema(&ctx.schema)
            .columns(["key", "value"])
            .values([lit_str(key), lit_str(value)]);
        self.engine.execute(&insert.to_sql(ctx.dialect())).await?;
        Ok(())
    }

    fn stage_start(&self) -> Instant {
        Instant::now()
    }

    fn stage_end(&self, outcome: &mut BuildOutcome, stage: &'static str, started: Instant) {
        let elapsed = started.elapsed();
        if elapsed > Duration::from_secs(self.settings.stage_timeout_secs) {
            tracing::warn!(
                stage,
                elapsed_ms = elapsed.as_millis() as u64,
                limit_secs = self.settings.stage_timeout_secs,
                "stage ran longer than expected"
            );
        } else {
            tracing::debug!(stage, elapsed_ms = elapsed.as_millis() as u64, "stage finished");
        }
        outcome.stage_timings.push((stage, elapsed));
    }
}

fn now_iso() -> String {
    chrono::Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()
}
