//! Revisions, data tables and update tasks.
//!
//! Revisions form a flat table keyed by id with `previous_revision_id`
//! as an optional foreign key; graphs are loaded depth-bounded by the
//! caller, never by recursive eager-loading.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::model::types::{CubeState, DataTableAction, FileType};

/// One immutable step in a dataset's history.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub id: Uuid,
    pub dataset_id: Uuid,
    /// Publication index; 1 is the originating revision, `None` a draft.
    pub index: Option<u32>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub publish_at: Option<DateTime<Utc>>,
    pub unpublished_at: Option<DateTime<Utc>>,
    pub previous_revision_id: Option<Uuid>,
    pub data_table: Option<DataTable>,
    pub tasks: Option<RevisionTask>,
    #[serde(default)]
    pub cube_state: CubeState,
}

impl Revision {
    /// Whether this revision has been assigned a publication index.
    pub fn is_indexed(&self) -> bool {
        matches!(self.index, Some(i) if i > 0)
    }

    /// Whether this revision is the unindexed draft.
    pub fn is_draft(&self) -> bool {
        !self.is_indexed()
    }
}

/// The uploaded file attached to a revision.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
    pub id: Uuid,
    pub file_type: FileType,
    /// Name in the file store (content-addressed under the dataset dir).
    pub filename: String,
    pub original_filename: String,
    pub mime_type: String,
    /// SHA-256 of the uploaded bytes.
    pub file_hash: String,
    pub uploaded_at: DateTime<Utc>,
    pub action: DataTableAction,
    /// Maps each file column onto a fact-table column.
    pub column_descriptions: Vec<ColumnDescriptor>,
}

/// Mapping from one file column to its fact-table column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ColumnDescriptor {
    /// Column header as it appears in the file.
    pub column_name: String,
    /// Name of the fact-table column it feeds.
    pub fact_table_column: String,
    /// Zero-based position in the file.
    pub column_index: u32,
}

/// Work recorded against a revision when a build finds new values.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RevisionTask {
    #[serde(default)]
    pub dimensions: Vec<DimensionUpdateTask>,
    pub measure: Option<DimensionUpdateTask>,
}

impl RevisionTask {
    pub fn is_empty(&self) -> bool {
        self.dimensions.is_empty() && self.measure.is_none()
    }
}

/// A dimension (or the measure) whose lookup needs user re-confirmation
/// because the fact table now carries values the lookup does not cover.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DimensionUpdateTask {
    pub id: Uuid,
    /// Set once the user has uploaded a corrected lookup.
    pub lookup_table_updated: bool,
}
