//! DML (Data Manipulation Language) support.
//!
//! INSERT (literal rows or INSERT ... SELECT), UPDATE ... FROM and
//! DELETE ... USING - the statements the fact-table assembler needs to
//! apply Add/Revise/AddRevise actions.
//!
//! # Examples
//!
//! ```ignore
//! use cubewright::sql::dml::{Insert, Update, Delete};
//! use cubewright::sql::dialect::Dialect;
//! use cubewright::sql::expr::{col, lit_str};
//!
//! let insert = Insert::into("metadata")
//!     .columns(["key", "value"])
//!     .values([lit_str("build_status"), lit_str("complete")]);
//! ```

use super::dialect::Dialect;
use super::expr::Expr;
use super::query::{Query, TableRef};
use super::token::{Token, TokenStream};

// ============================================================================
// INSERT
// ============================================================================

/// INSERT statement.
#[derive(Debug, Clone)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Insert {
    pub schema: Option<String>,
    pub table: String,
    pub columns: Vec<String>,
    pub values: Vec<Vec<Expr>>,
    pub from_query: Option<Box<Query>>,
}

impl Insert {
    pub fn into(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            columns: Vec::new(),
            values: Vec::new(),
            from_query: None,
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn columns(mut self, cols: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.columns = cols.into_iter().map(|c| c.into()).collect();
        self
    }

    /// Add a row of values.
    pub fn values(mut self, vals: impl IntoIterator<Item = impl Into<Expr>>) -> Self {
        self.values
            .push(vals.into_iter().map(|v| v.into()).collect());
        self
    }

    /// INSERT INTO ... SELECT ...
    pub fn from_select(mut self, query: Query) -> Self {
        self.from_query = Some(Box::new(query));
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();

        ts.push(Token::Insert)
            .space()
            .push(Token::Into)
            .space()
            .push(Token::QualifiedIdent {
                schema: self.schema.clone(),
                name: self.table.clone(),
            });

        if !self.columns.is_empty() {
            ts.space().lparen();
            for (i, col) in self.columns.iter().enumerate() {
                if i > 0 {
                    ts.comma().space();
                }
                ts.push(Token::Ident(col.clone()));
            }
            ts.rparen();
        }

        if let Some(query) = &self.from_query {
            ts.space();
            ts.append(&query.to_tokens_for_dialect(dialect));
            return ts.serialize(dialect);
        }

        ts.space().push(Token::Values).space();
        for (i, row) in self.values.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.lparen();
            for (j, value) in row.iter().enumerate() {
                if j > 0 {
                    ts.comma().space();
                }
                ts.append(&value.to_tokens_for_dialect(dialect));
            }
            ts.rparen();
        }

        ts.serialize(dialect)
    }
}

// ============================================================================
// UPDATE
// ============================================================================

/// UPDATE statement with optional FROM (the Revise action joins the
/// update staging table against the fact table).
#[derive(Debug, Clone)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Update {
    pub schema: Option<String>,
    pub table: String,
    pub assignments: Vec<(String, Expr)>,
    pub from: Option<TableRef>,
    pub filter: Option<Expr>,
}

impl Update {
    pub fn table(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            assignments: Vec::new(),
            from: None,
            filter: None,
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn set(mut self, column: impl Into<String>, value: Expr) -> Self {
        self.assignments.push((column.into(), value));
        self
    }

    pub fn from(mut self, table: TableRef) -> Self {
        self.from = Some(table);
        self
    }

    pub fn filter(mut self, condition: Expr) -> Self {
        use super::expr::ExprExt;
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();

        ts.push(Token::Update)
            .space()
            .push(Token::QualifiedIdent {
                schema: self.schema.clone(),
                name: self.table.clone(),
            })
            .space()
            .push(Token::Set)
            .space();

        for (i, (column, value)) in self.assignments.iter().enumerate() {
            if i > 0 {
                ts.comma().space();
            }
            ts.push(Token::Ident(column.clone()))
                .space()
                .push(Token::Eq)
                .space();
            ts.append(&value.to_tokens_for_dialect(dialect));
        }

        if let Some(from) = &self.from {
            ts.space().push(Token::From).space();
            ts.append(&from.to_tokens());
        }

        if let Some(filter) = &self.filter {
            ts.space().push(Token::Where).space();
            ts.append(&filter.to_tokens_for_dialect(dialect));
        }

        ts.serialize(dialect)
    }
}

// ============================================================================
// DELETE
// ============================================================================

/// DELETE statement with optional USING (AddRevise removes already
/// applied rows from the staging table by joining the fact table).
#[derive(Debug, Clone)]
#[must_use = "DML statements have no effect until converted to SQL with to_sql()"]
pub struct Delete {
    pub schema: Option<String>,
    pub table: String,
    pub using: Option<TableRef>,
    pub filter: Option<Expr>,
}

impl Delete {
    pub fn from(table: impl Into<String>) -> Self {
        Self {
            schema: None,
            table: table.into(),
            using: None,
            filter: None,
        }
    }

    pub fn schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = Some(schema.into());
        self
    }

    pub fn using(mut self, table: TableRef) -> Self {
        self.using = Some(table);
        self
    }

    pub fn filter(mut self, condition: Expr) -> Self {
        use super::expr::ExprExt;
        self.filter = Some(match self.filter.take() {
            Some(existing) => existing.and(condition),
            None => condition,
        });
        self
    }

    pub fn to_sql(&self, dialect: Dialect) -> String {
        let mut ts = TokenStream::new();

        ts.push(Token::Delete)
            .space()
            .push(Token::From)
            .space()
            .push(Token::QualifiedIdent {
                schema: self.schema.clone(),
                name: self.table.clone(),
            });

        if let Some(using) = &self.using {
            ts.space().push(Token::Using).space();
            ts.append(&using.to_tokens());
        }

        if let Some(filter) = &self.filter {
            ts.space().push(Token::Where).space();
            ts.append(&filter.to_tokens_for_dialect(dialect));
        }

        ts.serialize(dialect)
    }
}
