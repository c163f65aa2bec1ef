//! DDL (Data Definition Language) support.
//!
//! Builders for the statements a cube build issues: per-revision schemas,
//! staging/fact/lookup tables (plain or CREATE TABLE AS SELECT), the
//! composite-grain primary key, and the per-language views with their
//! materialised siblings.
//!
//! # Examples
//!
//! ```ignore
//! use cubewright::sql::ddl::{CreateTable, ColumnDef};
//! use cubewright::sql::dialect::Dialect;
//! use cubewright::model::types::DataType;
//!
//! let table = CreateTable::new("measure")
//!     .schema("rev_42")
//!     .column(ColumnDef::new("reference", DataType::Text).not_null())
//!     .column(ColumnDef::new("language", DataType::Text).not_null());
//!
//! println!("{}", table.to_sql(Dialect::DuckDb));
//! ```

use super::dialect::{Dialect, SqlDialect};
use super::query::{Query, UnionChain};
use super::token::{Token, TokenStream};
use crate::model::types::DataType;

// ============================================================================
// CREATE SCHEMA / DROP SCHEMA
// ============================================================================

/// CREATE SCHEMA statement. Each revision gets a schema named by its id.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct CreateSchema {
    pub name: String,
    pub if_not_exists: bool,
}

impl CreateSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            if_not_exists: false,
        }
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();
        ts.push(Token::Create).space().push(Token::Schema);
        if self.if_not_exists && dialect.supports_if_not_exists() {
            ts.space()
                .push(Token::If)
                .space()
                .push(Token::Not)
                .space()
                .push(Token::Exists);
        }
        ts.space().push(Token::Ident(self.name.clone()));
        ts.serialize(dialect)
    }
}

/// DROP SCHEMA statement.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct DropSchema {
    pub name: String,
    pub if_exists: bool,
    pub cascade: bool,
}

impl DropSchema {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            if_exists: false,
            cascade: false,
        }
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    pub fn cascade(mut self) -> Self {
        self.cascade = true;
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();
        ts.push(Token::Drop).space().push(Token::Schema);
        if self.if_exists && dialect.supports_if_exists() {
            ts.space().push(Token::If).space().push(Token::Exists);
        }
        ts.space().push(Token::Ident(self.name.clone()));
        if self.cascade && dialect.supports_drop_cascade() {
            ts.space().push(Token::Cascade);
        }
        ts.serialize(dialect)
    }
}

// ============================================================================
// CREATE TABLE
// ============================================================================

/// CREATE TABLE statement.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct CreateTable {
    pub if_not_exists: bool,
    pub schema: Option<String>,
    pub name: String,
    pub columns: Vec<ColumnDef>,
    pub constraints: Vec<TableConstraint>,
    pub as_query: Option<Box<Query>>,
    pub as_union: Option<Box<UnionChain>>,
}

impl CreateTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            if_not_exists: false,
            schema: None,
            name: name.into(),
            columns: Vec::new(),
            constraints: Vec::new(),
            as_query: None,
            as_union: None,
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn if_not_exists(mut self) -> Self {
        self.if_not_exists = true;
        self
    }

    pub fn column(mut self, col: ColumnDef) -> Self {
        self.columns.push(col);
        self
    }

    pub fn columns(mut self, cols: impl IntoIterator<Item = ColumnDef>) -> Self {
        self.columns.extend(cols);
        self
    }

    pub fn constraint(mut self, constraint: TableConstraint) -> Self {
        self.constraints.push(constraint);
        self
    }

    /// CREATE TABLE ... AS SELECT ...
    pub fn as_select(mut self, query: Query) -> Self {
        self.as_query = Some(Box::new(query));
        self
    }

    /// CREATE TABLE ... AS (q1 UNION ALL q2 ...) - wide-form lookups.
    pub fn as_select_union(mut self, union: UnionChain) -> Self {
        self.as_union = Some(Box::new(union));
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens(dialect).serialize(dialect)
    }

    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        ts.push(Token::Create).space().push(Token::Table);

        if self.if_not_exists && dialect.supports_if_not_exists() {
            ts.space()
                .push(Token::If)
                .space()
                .push(Token::Not)
                .space()
                .push(Token::Exists);
        }

        ts.space().push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.name.clone(),
        });

        if let Some(query) = &self.as_query {
            ts.space().push(Token::As).space();
            ts.append(&query.to_tokens_for_dialect(dialect));
            return ts;
        }

        if let Some(union) = &self.as_union {
            ts.space().push(Token::As).space();
            ts.append(&union.to_tokens_for_dialect(dialect));
            return ts;
        }

        ts.space().lparen();
        for (i, col) in self.columns.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.append(&col.to_tokens(dialect));
        }
        for constraint in &self.constraints {
            ts.comma().space();
            ts.append(&constraint.to_tokens(dialect));
        }
        ts.rparen();

        ts
    }
}

/// A column definition.
#[derive(Debug, Clone)]
#[must_use = "builders have no effect until used"]
pub struct ColumnDef {
    pub name: String,
    pub data_type: DataType,
    pub not_null: bool,
    pub primary_key: bool,
}

impl ColumnDef {
    pub fn new(name: impl Into<String>, data_type: DataType) -> Self {
        Self {
            name: name.into(),
            data_type,
            not_null: false,
            primary_key: false,
        }
    }

    pub fn not_null(mut self) -> Self {
        self.not_null = true;
        self
    }

    pub fn primary_key(mut self) -> Self {
        self.primary_key = true;
        self
    }

    pub fn to_tokens(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        ts.push(Token::Ident(self.name.clone()))
            .space()
            .push(Token::TypeName(dialect.emit_data_type(&self.data_type)));
        if self.not_null {
            ts.space().push(Token::Not).space().push(Token::Null);
        }
        if self.primary_key {
            ts.space().push(Token::Primary).space().push(Token::Key);
        }
        ts
    }
}

/// Table-level constraints.
#[derive(Debug, Clone)]
pub enum TableConstraint {
    PrimaryKey {
        name: Option<String>,
        columns: Vec<String>,
    },
}

impl TableConstraint {
    pub fn primary_key(columns: impl IntoIterator<Item = impl Into<String>>) -> Self {
        TableConstraint::PrimaryKey {
            name: None,
            columns: columns.into_iter().map(|c| c.into()).collect(),
        }
    }

    pub fn primary_key_named(
        name: impl Into<String>,
        columns: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        TableConstraint::PrimaryKey {
            name: Some(name.into()),
            columns: columns.into_iter().map(|c| c.into()).collect(),
        }
    }

    pub fn to_tokens(&self, _dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();
        match self {
            TableConstraint::PrimaryKey { name, columns } => {
                if let Some(name) = name {
                    ts.push(Token::Constraint)
                        .space()
                        .push(Token::Ident(name.clone()))
                        .space();
                }
                ts.push(Token::Primary).space().push(Token::Key).space().lparen();
                for (i, col) in columns.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.push(Token::Ident(col.clone()));
                }
                ts.rparen();
            }
        }
        ts
    }
}

// ============================================================================
// ALTER TABLE ... RENAME
// ============================================================================

/// ALTER TABLE ... RENAME TO ...
///
/// The assembler builds the keyed fact table under a scratch name and
/// renames it into place once the grain constraint holds.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct RenameTable {
    pub schema: Option<String>,
    pub name: String,
    pub to: String,
}

impl RenameTable {
    pub fn new(name: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            to: to.into(),
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();
        ts.push(Token::Alter)
            .space()
            .push(Token::Table)
            .space()
            .push(Token::QualifiedIdent {
                schema: self.schema.clone(),
                name: self.name.clone(),
            })
            .space()
            .push(Token::Rename)
            .space()
            .push(Token::To)
            .space()
            .push(Token::Ident(self.to.clone()));
        ts.serialize(dialect)
    }
}

// ============================================================================
// DROP TABLE / TRUNCATE
// ============================================================================

/// DROP TABLE statement.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct DropTable {
    pub schema: Option<String>,
    pub name: String,
    pub if_exists: bool,
}

impl DropTable {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            if_exists: false,
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();
        ts.push(Token::Drop).space().push(Token::Table);
        if self.if_exists && dialect.supports_if_exists() {
            ts.space().push(Token::If).space().push(Token::Exists);
        }
        ts.space().push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.name.clone(),
        });
        ts.serialize(dialect)
    }
}

// ============================================================================
// CREATE VIEW / DROP VIEW
// ============================================================================

/// CREATE VIEW statement, optionally materialized.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct CreateView {
    pub schema: Option<String>,
    pub name: String,
    pub query: Query,
    pub materialized: bool,
    pub or_replace: bool,
}

impl CreateView {
    pub fn new(name: impl Into<String>, query: Query) -> Self {
        Self {
            schema: None,
            name: name.into(),
            query,
            materialized: false,
            or_replace: false,
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn materialized(mut self) -> Self {
        self.materialized = true;
        self
    }

    pub fn or_replace(mut self) -> Self {
        self.or_replace = true;
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();
        ts.push(Token::Create);
        if self.or_replace && dialect.supports_create_or_replace_view() {
            ts.space()
                .push(Token::Or)
                .space()
                .push(Token::Replace);
        }
        if self.materialized {
            // Callers check supports_materialized_view() before asking.
            ts.space().push(Token::Materialized);
        }
        ts.space().push(Token::View).space().push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.name.clone(),
        });
        ts.space().push(Token::As).space();
        ts.append(&self.query.to_tokens_for_dialect(dialect));
        ts.serialize(dialect)
    }
}

/// DROP VIEW statement.
#[derive(Debug, Clone)]
#[must_use = "DDL statements have no effect until converted to SQL with to_sql()"]
pub struct DropView {
    pub schema: Option<String>,
    pub name: String,
    pub if_exists: bool,
    pub materialized: bool,
}

impl DropView {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            schema: None,
            name: name.into(),
            if_exists: false,
            materialized: false,
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn if_exists(mut self) -> Self {
        self.if_exists = true;
        self
    }

    pub fn materialized(mut self) -> Self {
        self.materialized = true;
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();
        ts.push(Token::Drop);
        if self.materialized {
            ts.space().push(Token::Materialized);
        }
        ts.space().push(Token::View);
        if self.if_exists && dialect.supports_if_exists() {
            ts.space().push(Token::If).space().push(Token::Exists);
        }
        ts.space().push(Token::QualifiedIdent {
            schema: self.schema.clone(),
            name: self.name.clone(),
        });
        ts.serialize(dialect)
    }
}
