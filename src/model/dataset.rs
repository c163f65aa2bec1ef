//! Datasets and fact-table columns.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::locale::Locale;
use crate::model::dimension::Dimension;
use crate::model::measure::Measure;
use crate::model::revision::Revision;
use crate::model::types::{ColumnRole, DataType};

/// A published statistical dataset.
///
/// Exactly one revision carries index 1 (the originating revision); every
/// other revision is either indexed above 1 (published) or a draft.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Dataset {
    pub id: Uuid,
    /// Owning publishing group.
    pub group_id: Uuid,
    /// Ordered fact-table schema.
    pub columns: Vec<FactTableColumn>,
    pub measure: Option<Measure>,
    #[serde(default)]
    pub dimensions: Vec<Dimension>,
    #[serde(default)]
    pub revisions: Vec<Revision>,
    /// Per-language title/description metadata.
    #[serde(default)]
    pub info: Vec<DatasetInfo>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatasetInfo {
    pub language: Locale,
    pub title: String,
    pub description: Option<String>,
}

impl Dataset {
    /// Ordered grain columns (Dimension/Time/Measure roles).
    pub fn grain_columns(&self) -> Vec<&FactTableColumn> {
        let mut cols: Vec<&FactTableColumn> =
            self.columns.iter().filter(|c| c.role.in_grain()).collect();
        cols.sort_by_key(|c| c.index);
        cols
    }

    /// The single column with a given role, when one exists.
    pub fn column_with_role(&self, role: ColumnRole) -> Option<&FactTableColumn> {
        self.columns.iter().find(|c| c.role == role)
    }

    pub fn data_values_column(&self) -> Option<&FactTableColumn> {
        self.column_with_role(ColumnRole::DataValues)
    }

    pub fn note_codes_column(&self) -> Option<&FactTableColumn> {
        self.column_with_role(ColumnRole::NoteCodes)
    }

    pub fn measure_column(&self) -> Option<&FactTableColumn> {
        self.column_with_role(ColumnRole::Measure)
    }

    /// All columns in declared order.
    pub fn ordered_columns(&self) -> Vec<&FactTableColumn> {
        let mut cols: Vec<&FactTableColumn> = self.columns.iter().collect();
        cols.sort_by_key(|c| c.index);
        cols
    }

    /// Revision by id.
    pub fn revision(&self, id: Uuid) -> Option<&Revision> {
        self.revisions.iter().find(|r| r.id == id)
    }

    /// The draft revision, when one exists. A dataset never holds two.
    pub fn draft_revision(&self) -> Option<&Revision> {
        self.revisions.iter().find(|r| r.index.is_none())
    }

    /// Title for a locale, falling back to the first entry.
    pub fn title_for(&self, locale: Locale) -> Option<&str> {
        self.info
            .iter()
            .find(|i| i.language == locale)
            .or_else(|| self.info.first())
            .map(|i| i.title.as_str())
    }
}

/// One column of the fact table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FactTableColumn {
    pub name: String,
    pub data_type: DataType,
    /// Position in the declared column order.
    pub index: u32,
    pub role: ColumnRole,
}

impl FactTableColumn {
    pub fn new(name: &str, data_type: DataType, index: u32, role: ColumnRole) -> Self {
        Self {
            name: name.into(),
            data_type,
            index,
            role,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dataset_with_columns(columns: Vec<FactTableColumn>) -> Dataset {
        Dataset {
            id: Uuid::new_v4(),
            group_id: Uuid::new_v4(),
            columns,
            measure: None,
            dimensions: vec![],
            revisions: vec![],
            info: vec![],
        }
    }

    #[test]
    fn test_grain_columns_ordered_by_index() {
        let ds = dataset_with_columns(vec![
            FactTableColumn::new("data_value", DataType::Double, 3, ColumnRole::DataValues),
            FactTableColumn::new("year", DataType::Text, 1, ColumnRole::Time),
            FactTableColumn::new("area", DataType::Text, 0, ColumnRole::Dimension),
            FactTableColumn::new("measure", DataType::BigInt, 2, ColumnRole::Measure),
            FactTableColumn::new("notes", DataType::Text, 4, ColumnRole::NoteCodes),
        ]);
        let grain: Vec<&str> = ds.grain_columns().iter().map(|c| c.name.as_str()).collect();
        assert_eq!(grain, vec!["area", "year", "measure"]);
    }

    #[test]
    fn test_role_accessors() {
        let ds = dataset_with_columns(vec![
            FactTableColumn::new("value", DataType::Double, 0, ColumnRole::DataValues),
            FactTableColumn::new("notes", DataType::Text, 1, ColumnRole::NoteCodes),
        ]);
        assert_eq!(ds.data_values_column().unwrap().name, "value");
        assert_eq!(ds.note_codes_column().unwrap().name, "notes");
        assert!(ds.measure_column().is_none());
    }
}
