//! # Cubewright
//!
//! A statistical dataset build engine: compiles an ordered history of
//! uploaded data tables plus dimension/measure metadata into a
//! per-revision, multilingual, query-ready cube on a columnar SQL
//! backend, and serves exports and previews over the finished cube.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │        Revision history (data tables + actions)          │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [loader + fact-table assembler]
//! ┌─────────────────────────────────────────────────────────┐
//! │              fact_table (grain-keyed)                    │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [dimension builders + validator]
//! ┌─────────────────────────────────────────────────────────┐
//! │   lookups · date periods · reference data · measure ·    │
//! │   note codes                                             │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [view builder]
//! ┌─────────────────────────────────────────────────────────┐
//! │  default_view_* / raw_view_* · filter_table · metadata   │
//! └─────────────────────────────────────────────────────────┘
//!                          │
//!                          ▼ [output service]
//! ┌─────────────────────────────────────────────────────────┐
//! │        CSV · JSON · Parquet · workbook · previews        │
//! └─────────────────────────────────────────────────────────┘
//! ```

pub mod builder;
pub mod config;
pub mod engine;
pub mod error;
pub mod filestore;
pub mod ident;
pub mod locale;
pub mod model;
pub mod output;
pub mod sql;
pub mod translation;

// Re-export SQL submodules at crate level for convenient usage
pub use sql::ddl;
pub use sql::dialect;
pub use sql::dml;
pub use sql::expr;
pub use sql::query;
pub use sql::token;

/// Re-exports for convenient usage.
pub mod prelude {
    pub use crate::builder::controller::{BuildOutcome, CubeBuilder};
    pub use crate::builder::BuildContext;
    pub use crate::engine::{CellValue, DuckDbEngine, RowSet, SqlEngine};
    pub use crate::error::{BuildError, BuildResult};
    pub use crate::filestore::{FileStore, LocalFileStore};
    pub use crate::locale::{Locale, SUPPORTED_LOCALES};
    pub use crate::model::{
        ColumnRole, CubeState, DataTableAction, DataType, Dataset, Dimension, FactTableColumn,
        FileType, Measure, Revision,
    };
    pub use crate::sql::dialect::{Dialect, SqlDialect};
}

pub use engine::{DuckDbEngine, SqlEngine};
pub use error::{BuildError, BuildResult};
pub use locale::Locale;
pub use sql::Dialect;
