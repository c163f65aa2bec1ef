//! Build error types.
//!
//! The error set is closed: every failure a build can hit maps onto one
//! variant, and the revision controller matches on the variant to decide
//! fatal vs non-fatal. `DimensionNonMatchedRows` is the only non-fatal
//! kind - the dimension degrades to raw and the build continues.

use thiserror::Error;
use uuid::Uuid;

use crate::locale::SUPPORTED_LOCALES;

/// Result type for build operations.
pub type BuildResult<T> = Result<T, BuildError>;

/// Errors that can occur while building or serving a cube.
#[derive(Error, Debug)]
pub enum BuildError {
    /// The history holds no indexed revision to start from.
    #[error("no first revision exists for the dataset")]
    NoFirstRevision,

    /// The end revision has no data table and no inherited history.
    #[error("revision has no data table")]
    NoDataTable,

    /// The uploaded file is not one of the accepted formats.
    #[error("unknown file type: {0}")]
    UnknownFileType(String),

    /// CREATE of the fact table failed.
    #[error("failed to create the fact table: {0}")]
    FactTableCreationFailed(String),

    /// Staging or bulk-inserting a data file failed.
    #[error("failed to load data file {filename}: {message}")]
    FailedToLoadData { filename: String, message: String },

    /// The composite grain holds duplicate rows.
    #[error("fact table contains duplicate facts on the grain")]
    DuplicateFact,

    /// The composite grain holds NULLs.
    #[error("fact table contains incomplete facts (NULL in the grain)")]
    IncompleteFact,

    /// A grain constraint failed in a way the message classifier could
    /// not attribute.
    #[error("unclassified fact constraint failure: {0}")]
    UnknownFactError(String),

    /// A column named by a data table is missing from the dataset schema.
    #[error("fact table column missing: {0}")]
    FactTableColumnMissing(String),

    /// File columns do not line up with the declared fact-table columns.
    #[error("unmatched columns in data table: {0:?}")]
    UnmatchedColumns(Vec<String>),

    /// Fact values missing from a dimension lookup. Non-fatal: recorded
    /// as a dimension-update task and the dimension degrades to raw.
    #[error(
        "dimension {fact_table_column} has {total_non_matching} rows with values missing from its lookup"
    )]
    DimensionNonMatchedRows {
        dimension_id: Uuid,
        fact_table_column: String,
        total_non_matching: u64,
        /// Bounded sample of the distinct offending values.
        non_matching_values: Vec<String>,
    },

    /// Fact values missing from the measure table.
    #[error("measure column has {total_non_matching} rows with references missing from the measure table")]
    MeasureNonMatchedRows {
        total_non_matching: u64,
        non_matching_values: Vec<String>,
    },

    /// The lookup file carries no usable description columns.
    #[error("invalid lookup file: {0}")]
    InvalidCsv(String),

    /// The lookup join column was neither supplied nor inferable.
    #[error("no unambiguous join column in lookup for {0}")]
    NoJoinColumn(String),

    /// A note-code column was declared but carries no codes at all.
    #[error("note-code column contains no codes")]
    NoNoteCodes,

    /// A note-code value falls outside the closed code set.
    #[error("unrecognised note codes: {0:?}")]
    BadNoteCodes(Vec<String>),

    /// No data-values column is declared for the dataset.
    #[error("dataset has no data value column")]
    NoDataValueColumn,

    /// The data-values column holds text that does not parse as numeric.
    #[error("non-numeric data value: {0}")]
    NonNumericDataValue(String),

    /// View creation failed.
    #[error("cube view creation failed: {0}")]
    CubeCreationFailed(String),

    /// Anything the classifier cannot attribute.
    #[error("unknown error: {0}")]
    UnknownError(String),

    // -- carriers; classified as UnknownError at the controller boundary --
    /// Backend SQL error outside the classified set.
    #[error("backend error: {0}")]
    Backend(String),

    /// File store I/O.
    #[error("file store error: {0}")]
    FileStore(#[from] std::io::Error),
}

impl BuildError {
    /// Non-fatal errors are recorded as tasks and the build continues.
    pub fn is_fatal(&self) -> bool {
        !matches!(self, BuildError::DimensionNonMatchedRows { .. })
    }

    /// Stable machine tag used in user-visible payloads.
    pub fn tag(&self) -> &'static str {
        match self {
            BuildError::NoFirstRevision => "errors.cube.no_first_revision",
            BuildError::NoDataTable => "errors.cube.no_data_table",
            BuildError::UnknownFileType(_) => "errors.cube.unknown_file_type",
            BuildError::FactTableCreationFailed(_) => "errors.cube.fact_table_creation_failed",
            BuildError::FailedToLoadData { .. } => "errors.cube.failed_to_load_data",
            BuildError::DuplicateFact => "errors.cube.duplicate_fact",
            BuildError::IncompleteFact => "errors.cube.incomplete_fact",
            BuildError::UnknownFactError(_) => "errors.cube.unknown_fact_error",
            BuildError::FactTableColumnMissing(_) => "errors.cube.fact_table_column_missing",
            BuildError::UnmatchedColumns(_) => "errors.cube.unmatched_columns",
            BuildError::DimensionNonMatchedRows { .. } => "errors.cube.dimension_non_matched_rows",
            BuildError::MeasureNonMatchedRows { .. } => "errors.cube.measure_non_matched_rows",
            BuildError::InvalidCsv(_) => "errors.cube.invalid_csv",
            BuildError::NoJoinColumn(_) => "errors.cube.no_join_column",
            BuildError::NoNoteCodes => "errors.cube.no_note_codes",
            BuildError::BadNoteCodes(_) => "errors.cube.bad_note_codes",
            BuildError::NoDataValueColumn => "errors.cube.no_data_value_column",
            BuildError::NonNumericDataValue(_) => "errors.cube.non_numeric_data_value",
            BuildError::CubeCreationFailed(_) => "errors.cube.cube_creation_failed",
            BuildError::UnknownError(_) | BuildError::Backend(_) | BuildError::FileStore(_) => {
                "errors.cube.unknown_error"
            }
        }
    }

    /// HTTP status the out-of-scope API layer should surface.
    pub fn status(&self) -> u16 {
        match self {
            BuildError::NoFirstRevision
            | BuildError::NoDataTable
            | BuildError::UnknownFileType(_)
            | BuildError::DuplicateFact
            | BuildError::IncompleteFact
            | BuildError::FactTableColumnMissing(_)
            | BuildError::UnmatchedColumns(_)
            | BuildError::DimensionNonMatchedRows { .. }
            | BuildError::MeasureNonMatchedRows { .. }
            | BuildError::InvalidCsv(_)
            | BuildError::NoJoinColumn(_)
            | BuildError::NoNoteCodes
            | BuildError::BadNoteCodes(_)
            | BuildError::NoDataValueColumn
            | BuildError::NonNumericDataValue(_) => 400,
            _ => 500,
        }
    }
}

/// Classify a backend constraint-violation message into the closed set.
///
/// The grain primary key is added after the history is applied, so a
/// failure here is either duplicate rows, a NULL in the grain, or
/// something we cannot attribute.
pub fn classify_constraint_error(message: &str) -> BuildError {
    use once_cell::sync::Lazy;
    use regex::Regex;

    static DUPLICATE: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)duplicate key|could not create unique index|contains duplicates")
            .expect("static regex")
    });
    static NULL: Lazy<Regex> = Lazy::new(|| {
        Regex::new(r"(?i)null value|contains null|not.null constraint").expect("static regex")
    });

    if DUPLICATE.is_match(message) {
        BuildError::DuplicateFact
    } else if NULL.is_match(message) {
        BuildError::IncompleteFact
    } else {
        BuildError::UnknownFactError(message.to_string())
    }
}

// ============================================================================
// User-visible payloads
// ============================================================================

/// The payload the caller renders for a validation failure: one message
/// per supported language plus an extension bag of samples.
#[derive(Debug, Clone, serde::Serialize)]
pub struct ValidationPayload {
    pub status: u16,
    pub dataset_id: Uuid,
    pub errors: Vec<FieldError>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub extension: Option<PayloadExtension>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct FieldError {
    pub field: String,
    pub tag: String,
    /// One translated message per supported locale.
    pub message: Vec<LocalisedMessage>,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct LocalisedMessage {
    pub lang: String,
    pub message: String,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct PayloadExtension {
    pub total_non_matching: u64,
    pub non_matching_values: Vec<String>,
}

impl ValidationPayload {
    /// Build the payload for an error against a dataset.
    pub fn from_error(dataset_id: Uuid, error: &BuildError) -> Self {
        let extension = match error {
            BuildError::DimensionNonMatchedRows {
                total_non_matching,
                non_matching_values,
                ..
            }
            | BuildError::MeasureNonMatchedRows {
                total_non_matching,
                non_matching_values,
            } => Some(PayloadExtension {
                total_non_matching: *total_non_matching,
                non_matching_values: non_matching_values.clone(),
            }),
            _ => None,
        };

        let field = match error {
            BuildError::DimensionNonMatchedRows {
                fact_table_column, ..
            } => fact_table_column.clone(),
            BuildError::MeasureNonMatchedRows { .. } => "measure".into(),
            _ => "data_table".into(),
        };

        let message = SUPPORTED_LOCALES
            .iter()
            .map(|locale| LocalisedMessage {
                lang: locale.tag().to_string(),
                message: crate::translation::translate(error.tag(), *locale).to_string(),
            })
            .collect();

        ValidationPayload {
            status: error.status(),
            dataset_id,
            errors: vec![FieldError {
                field,
                tag: error.tag().to_string(),
                message,
            }],
            extension,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_duplicate() {
        let err =
            classify_constraint_error("Constraint Error: Duplicate key \"year: 1\" violates PK");
        assert!(matches!(err, BuildError::DuplicateFact));
    }

    #[test]
    fn test_classify_null() {
        let err = classify_constraint_error("NOT NULL constraint failed: fact_table.year");
        assert!(matches!(err, BuildError::IncompleteFact));
        let err = classify_constraint_error("column year contains NULL values");
        assert!(matches!(err, BuildError::IncompleteFact));
    }

    #[test]
    fn test_classify_unknown() {
        let err = classify_constraint_error("something exotic happened");
        assert!(matches!(err, BuildError::UnknownFactError(_)));
    }

    #[test]
    fn test_fatality() {
        let nonfatal = BuildError::DimensionNonMatchedRows {
            dimension_id: Uuid::new_v4(),
            fact_table_column: "country".into(),
            total_non_matching: 3,
            non_matching_values: vec!["ZZ".into()],
        };
        assert!(!nonfatal.is_fatal());
        assert!(BuildError::DuplicateFact.is_fatal());
        assert!(BuildError::NoFirstRevision.is_fatal());
    }

    #[test]
    fn test_payload_extension() {
        let err = BuildError::MeasureNonMatchedRows {
            total_non_matching: 5,
            non_matching_values: vec!["9".into()],
        };
        let payload = ValidationPayload::from_error(Uuid::new_v4(), &err);
        assert_eq!(payload.status, 400);
        let ext = payload.extension.expect("extension");
        assert_eq!(ext.total_non_matching, 5);
        assert_eq!(payload.errors[0].message.len(), 2);
    }
}
