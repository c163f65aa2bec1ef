//! Logical data model: datasets, revisions, dimensions, measures.

pub mod dataset;
pub mod dimension;
pub mod measure;
pub mod revision;
pub mod types;

pub use dataset::{Dataset, DatasetInfo, FactTableColumn};
pub use dimension::{
    DateExtractor, DayFormat, Dimension, DimensionType, Extractor, LanguageColumn,
    LookupTableExtractor, MonthFormat, NumberExtractor, NumberKind, QuarterFormat,
    ReferenceDataExtractor, YearFormat, YearType,
};
pub use measure::{Measure, MeasureFormat, MeasureRow};
pub use revision::{
    ColumnDescriptor, DataTable, DimensionUpdateTask, Revision, RevisionTask,
};
pub use types::{ColumnRole, CubeState, DataTableAction, DataType, FileType};
