//! Core types shared across the data model.

use serde::{Deserialize, Serialize};

/// SQL data types the engine stores fact and lookup columns in.
///
/// Staging inference is restricted to `{Bool, BigInt, Double, Text}`;
/// `Date`/`Timestamp` appear in generated period tables and `Decimal`
/// in measure columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataType {
    Bool,
    BigInt,
    Double,
    /// Decimal with precision and scale
    Decimal(u8, u8),
    Text,
    Date,
    Timestamp,
}

impl DataType {
    /// Parse a backend type string like "BIGINT" or "DECIMAL(18,2)".
    ///
    /// Used when introspecting staging tables the columnar engine typed
    /// for us; anything unrecognised collapses to `Text`.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.to_lowercase();
        let s = s.trim();

        if let Some(inner) = s.strip_prefix("decimal(").and_then(|s| s.strip_suffix(')')) {
            let parts: Vec<&str> = inner.split(',').collect();
            if parts.len() == 2 {
                let precision = parts[0].trim().parse().ok()?;
                let scale = parts[1].trim().parse().ok()?;
                return Some(DataType::Decimal(precision, scale));
            }
        }

        match s {
            "bool" | "boolean" => Some(DataType::Bool),
            "int8" | "int16" | "int32" | "int64" | "int" | "integer" | "smallint" | "tinyint"
            | "bigint" | "hugeint" | "ubigint" | "uinteger" => Some(DataType::BigInt),
            "float" | "float4" | "float8" | "real" | "double" | "double precision" => {
                Some(DataType::Double)
            }
            "varchar" | "text" | "string" | "char" | "bpchar" => Some(DataType::Text),
            "date" => Some(DataType::Date),
            "timestamp" | "datetime" | "timestamp without time zone" => Some(DataType::Timestamp),
            _ => None,
        }
    }

    /// Parse with a `Text` fallback for exotic backend types.
    pub fn parse_lossy(s: &str) -> Self {
        Self::parse(s).unwrap_or(DataType::Text)
    }
}

/// The role a fact-table column plays in the cube.
///
/// At most one column each for `Measure`, `DataValues` and `NoteCodes`;
/// the composite grain is the ordered set of `Dimension`/`Time`/`Measure`
/// columns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnRole {
    Dimension,
    Time,
    Measure,
    DataValues,
    NoteCodes,
    Unknown,
}

impl ColumnRole {
    /// Whether the column participates in the composite grain.
    pub fn in_grain(&self) -> bool {
        matches!(
            self,
            ColumnRole::Dimension | ColumnRole::Time | ColumnRole::Measure
        )
    }
}

/// Accepted upload formats.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FileType {
    Csv,
    GzipCsv,
    Parquet,
    Json,
    GzipJson,
    Excel,
}

impl FileType {
    /// Infer from a filename extension.
    pub fn from_filename(name: &str) -> Option<Self> {
        let lower = name.to_lowercase();
        if lower.ends_with(".csv.gz") {
            Some(FileType::GzipCsv)
        } else if lower.ends_with(".json.gz") {
            Some(FileType::GzipJson)
        } else if lower.ends_with(".csv") {
            Some(FileType::Csv)
        } else if lower.ends_with(".parquet") {
            Some(FileType::Parquet)
        } else if lower.ends_with(".json") {
            Some(FileType::Json)
        } else if lower.ends_with(".xlsx") || lower.ends_with(".xls") || lower.ends_with(".ods") {
            Some(FileType::Excel)
        } else {
            None
        }
    }

    pub fn mime_type(&self) -> &'static str {
        match self {
            FileType::Csv => "text/csv",
            FileType::GzipCsv => "application/gzip",
            FileType::Parquet => "application/vnd.apache.parquet",
            FileType::Json => "application/json",
            FileType::GzipJson => "application/gzip",
            FileType::Excel => "application/vnd.ms-excel",
        }
    }
}

/// How a data table folds into the fact table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataTableAction {
    /// Truncate the fact table, then bulk-insert.
    ReplaceAll,
    /// Bulk-insert.
    Add,
    /// Update existing rows by grain where the data value differs.
    Revise,
    /// Revise matching rows, then insert the rest.
    AddRevise,
}

/// Cube build lifecycle.
///
/// ```text
/// Absent -> Building -> AwaitingMaterialisation -> Complete
///                                 |                   |
///                                 +-----> Failed <----+
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CubeState {
    #[default]
    Absent,
    Building,
    AwaitingMaterialisation,
    Complete,
    Failed,
}

impl CubeState {
    /// The `build_status` metadata value written for this state.
    pub fn build_status(&self) -> &'static str {
        match self {
            CubeState::Absent | CubeState::Building => "incomplete",
            CubeState::AwaitingMaterialisation => "awaiting_materialization",
            CubeState::Complete => "complete",
            CubeState::Failed => "failed",
        }
    }
}
