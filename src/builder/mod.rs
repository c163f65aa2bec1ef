//! The cube build pipeline.
//!
//! One build composes, inside a dedicated per-revision schema: the fact
//! table assembled from the revision history, the per-dimension lookup
//! tables (date periods, uploaded lookups, reference data), the measure
//! and note-code tables, referential validation, and the per-language
//! views plus the filter index. The revision controller orchestrates the
//! stages and owns the cube state machine.

pub mod controller;
pub mod date_period;
pub mod fact_table;
pub mod loader;
pub mod lookup;
pub mod measure;
pub mod note_codes;
pub mod reference_data;
pub mod validator;
pub mod views;

use std::sync::Arc;

use crate::engine::SqlEngine;
use crate::filestore::FileStore;
use crate::model::Dataset;

/// Fixed table names inside a revision schema.
pub mod tables {
    pub const FACT_TABLE: &str = "fact_table";
    pub const UPDATE_TABLE: &str = "update_table";
    pub const METADATA: &str = "metadata";
    pub const FILTER_TABLE: &str = "filter_table";
    pub const MEASURE: &str = "measure";
    pub const NOTE_CODES: &str = "note_codes";
    pub const ALL_NOTES: &str = "all_notes";
}

/// Everything a build stage needs: the backend, the file store, the
/// dataset being built and the schema owned by this build.
///
/// The schema is owned exclusively by one build; no two builders ever
/// write to the same schema.
#[derive(Clone)]
pub struct BuildContext {
    pub engine: Arc<dyn SqlEngine>,
    pub store: Arc<dyn FileStore>,
    pub dataset: Arc<Dataset>,
    /// Schema name: the end revision's id.
    pub schema: String,
}

impl BuildContext {
    pub fn new(
        engine: Arc<dyn SqlEngine>,
        store: Arc<dyn FileStore>,
        dataset: Arc<Dataset>,
        schema: impl Into<String>,
    ) -> Self {
        Self {
            engine,
            store,
            dataset,
            schema: schema.into(),
        }
    }

    /// Dialect shorthand.
    pub fn dialect(&self) -> crate::sql::Dialect {
        self.engine.dialect()
    }

    /// A `TableRef` inside this build's schema.
    pub fn table(&self, name: &str) -> crate::sql::query::TableRef {
        crate::sql::query::TableRef::new(name).with_schema(&self.schema)
    }
}
