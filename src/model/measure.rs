//! Measures.
//!
//! A measure behaves like a dimension whose lookup is the user-supplied
//! measure table: one row per `(reference, language)` with a description
//! and the display format used to render data values.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::locale::Locale;

/// The dataset's measure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measure {
    pub id: Uuid,
    pub dataset_id: Uuid,
    /// Name of the fact-table column holding measure references.
    pub fact_table_column: String,
    /// Explicit join column in the measure table; defaults to `reference`.
    pub join_column: Option<String>,
    pub measure_table: Vec<MeasureRow>,
}

impl Measure {
    /// Distinct references, in first-appearance order.
    pub fn references(&self) -> Vec<&str> {
        let mut seen = Vec::new();
        for row in &self.measure_table {
            if !seen.contains(&row.reference.as_str()) {
                seen.push(row.reference.as_str());
            }
        }
        seen
    }

    /// Format declared for a reference (the first row wins; rows for the
    /// same reference must not disagree across languages).
    pub fn format_for(&self, reference: &str) -> Option<(MeasureFormat, Option<u8>)> {
        self.measure_table
            .iter()
            .find(|r| r.reference == reference)
            .map(|r| (r.format, r.decimals))
    }
}

/// One `(reference, language)` row of the measure table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MeasureRow {
    pub reference: String,
    pub language: Locale,
    pub description: String,
    pub notes: Option<String>,
    pub sort_order: Option<i64>,
    pub format: MeasureFormat,
    pub decimals: Option<u8>,
    pub measure_type: Option<String>,
    pub hierarchy: Option<String>,
}

/// Display format of data values for one measure reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MeasureFormat {
    Decimal,
    Float,
    Integer,
    Long,
    Percentage,
    String,
    Text,
    Date,
    DateTime,
    Time,
}

impl MeasureFormat {
    /// Whether values render through the numeric rounding path.
    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            MeasureFormat::Decimal
                | MeasureFormat::Float
                | MeasureFormat::Integer
                | MeasureFormat::Long
                | MeasureFormat::Percentage
        )
    }

    /// Decimal places when the row declares none.
    pub fn default_decimals(&self) -> u8 {
        match self {
            MeasureFormat::Integer | MeasureFormat::Long => 0,
            _ => 2,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(reference: &str, language: Locale, format: MeasureFormat) -> MeasureRow {
        MeasureRow {
            reference: reference.into(),
            language,
            description: format!("{reference} ({})", language.tag()),
            notes: None,
            sort_order: None,
            format,
            decimals: None,
            measure_type: None,
            hierarchy: None,
        }
    }

    #[test]
    fn test_references_dedupe_in_order() {
        let measure = Measure {
            id: Uuid::new_v4(),
            dataset_id: Uuid::new_v4(),
            fact_table_column: "measure".into(),
            join_column: None,
            measure_table: vec![
                row("1", Locale::En, MeasureFormat::Decimal),
                row("1", Locale::Cy, MeasureFormat::Decimal),
                row("2", Locale::En, MeasureFormat::Integer),
                row("2", Locale::Cy, MeasureFormat::Integer),
            ],
        };
        assert_eq!(measure.references(), vec!["1", "2"]);
        assert_eq!(
            measure.format_for("2"),
            Some((MeasureFormat::Integer, None))
        );
        assert_eq!(measure.format_for("9"), None);
    }

    #[test]
    fn test_format_classes() {
        assert!(MeasureFormat::Decimal.is_numeric());
        assert!(MeasureFormat::Percentage.is_numeric());
        assert!(!MeasureFormat::Text.is_numeric());
        assert!(!MeasureFormat::Date.is_numeric());
        assert_eq!(MeasureFormat::Integer.default_decimals(), 0);
        assert_eq!(MeasureFormat::Decimal.default_decimals(), 2);
    }
}
