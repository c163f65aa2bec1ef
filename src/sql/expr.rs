//! Expression AST - the core of SQL expression building.
//!
//! A strongly-typed AST for the expressions the cube builder emits:
//! lookup joins, the measure CASE formatter, note-code list containment,
//! validator anti-joins. Exhaustive pattern matching is enforced by the
//! compiler.

use super::dialect::{Dialect, SqlDialect};
use super::token::{Token, TokenStream};
use crate::model::types::DataType;

// =============================================================================
// Expression AST
// =============================================================================

/// A SQL expression.
///
/// Every variant must be handled in `to_tokens_for_dialect()`.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    /// Column reference: optional_table.column
    Column {
        table: Option<String>,
        column: String,
    },

    /// Literal values
    Literal(Literal),

    /// Binary operation: left op right
    BinaryOp {
        left: Box<Expr>,
        op: BinaryOperator,
        right: Box<Expr>,
    },

    /// Unary operation: op expr
    UnaryOp { op: UnaryOperator, expr: Box<Expr> },

    /// Function call: name(args...), optionally DISTINCT, with an
    /// in-aggregate ORDER BY and an aggregate FILTER (WHERE ...) clause.
    Function {
        name: String,
        args: Vec<Expr>,
        distinct: bool,
        order_by: Vec<Expr>,
        filter: Option<Box<Expr>>,
    },

    /// CASE [operand] WHEN... THEN... ELSE... END
    Case {
        operand: Option<Box<Expr>>,
        when_clauses: Vec<(Expr, Expr)>,
        else_clause: Option<Box<Expr>>,
    },

    /// CAST(expr AS type)
    Cast {
        expr: Box<Expr>,
        data_type: DataType,
    },

    /// Subquery: (SELECT ...)
    Subquery(Box<crate::sql::query::Query>),

    /// IN: expr IN (values...)
    In {
        expr: Box<Expr>,
        values: Vec<Expr>,
        negated: bool,
    },

    /// IN subquery: expr IN (SELECT ...)
    InSubquery {
        expr: Box<Expr>,
        subquery: Box<crate::sql::query::Query>,
        negated: bool,
    },

    /// IS NULL / IS NOT NULL
    IsNull { expr: Box<Expr>, negated: bool },

    /// Containment of a needle in a delimiter-split text value.
    ///
    /// Renders per dialect: `LIST_CONTAINS(STRING_SPLIT(..), ..)` on the
    /// columnar engine, `.. = ANY(STRING_TO_ARRAY(..))` on Postgres.
    SplitContains {
        text: Box<Expr>,
        delimiter: String,
        needle: Box<Expr>,
    },

    /// Thousands-grouped numeric rendering with fixed decimals.
    ///
    /// Renders per dialect: fmt-style `FORMAT` on the columnar engine,
    /// `TO_CHAR` with an `FM` pattern on Postgres.
    GroupedNumber { value: Box<Expr>, decimals: u8 },

    /// Wildcard: * or table.*
    Star { table: Option<String> },

    /// Parenthesized expression
    Paren(Box<Expr>),

    /// Raw SQL fragment passed through without escaping.
    ///
    /// Never pass user input here; the loader's table functions
    /// (`read_csv(...)` with pre-quoted literals) are the only callers.
    Raw(String),
}

/// Literal values.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Int(i64),
    Float(f64),
    String(String),
    Bool(bool),
    /// ISO date rendered as `DATE 'YYYY-MM-DD'`
    Date(String),
    Null,
}

/// Binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOperator {
    Eq,
    Ne,
    Lt,
    Lte,
    Gt,
    Gte,
    And,
    Or,
    Add,
    Sub,
    Mul,
    Div,
    Concat,
}

/// Unary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOperator {
    Not,
    Neg,
}

impl Expr {
    /// Convert to tokens using the default dialect.
    pub fn to_tokens(&self) -> TokenStream {
        self.to_tokens_for_dialect(Dialect::default())
    }

    /// Convert to tokens for a specific dialect.
    pub fn to_tokens_for_dialect(&self, dialect: Dialect) -> TokenStream {
        let mut ts = TokenStream::new();

        match self {
            Expr::Column { table, column } => {
                ts.push(Token::QualifiedIdent {
                    schema: table.clone(),
                    name: column.clone(),
                });
            }

            Expr::Literal(lit) => match lit {
                Literal::Int(n) => {
                    ts.push(Token::LitInt(*n));
                }
                Literal::Float(f) => {
                    ts.push(Token::LitFloat(*f));
                }
                Literal::String(s) => {
                    ts.push(Token::LitString(s.clone()));
                }
                Literal::Bool(b) => {
                    ts.push(Token::LitBool(*b));
                }
                Literal::Date(d) => {
                    ts.push(Token::LitDate(d.clone()));
                }
                Literal::Null => {
                    ts.push(Token::LitNull);
                }
            },

            Expr::BinaryOp { left, op, right } => {
                ts.append(&left.to_tokens_for_dialect(dialect));
                ts.space();
                ts.push(match op {
                    BinaryOperator::Eq => Token::Eq,
                    BinaryOperator::Ne => Token::Ne,
                    BinaryOperator::Lt => Token::Lt,
                    BinaryOperator::Lte => Token::Lte,
                    BinaryOperator::Gt => Token::Gt,
                    BinaryOperator::Gte => Token::Gte,
                    BinaryOperator::And => Token::And,
                    BinaryOperator::Or => Token::Or,
                    BinaryOperator::Add => Token::Plus,
                    BinaryOperator::Sub => Token::Minus,
                    BinaryOperator::Mul => Token::Mul,
                    BinaryOperator::Div => Token::Div,
                    BinaryOperator::Concat => Token::Concat,
                });
                ts.space();
                ts.append(&right.to_tokens_for_dialect(dialect));
            }

            Expr::UnaryOp { op, expr } => {
                match op {
                    UnaryOperator::Not => {
                        ts.push(Token::Not).space();
                    }
                    UnaryOperator::Neg => {
                        ts.push(Token::Minus);
                    }
                }
                ts.append(&expr.to_tokens_for_dialect(dialect));
            }

            Expr::Function {
                name,
                args,
                distinct,
                order_by,
                filter,
            } => {
                ts.push(Token::FunctionName(name.clone()));
                ts.lparen();
                if *distinct {
                    ts.push(Token::Distinct).space();
                }
                for (i, arg) in args.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&arg.to_tokens_for_dialect(dialect));
                }
                if !order_by.is_empty() {
                    ts.space().push(Token::OrderBy).space();
                    for (i, expr) in order_by.iter().enumerate() {
                        if i > 0 {
                            ts.comma().space();
                        }
                        ts.append(&expr.to_tokens_for_dialect(dialect));
                    }
                }
                ts.rparen();
                if let Some(pred) = filter {
                    ts.space()
                        .push(Token::Filter)
                        .space()
                        .lparen()
                        .push(Token::Where)
                        .space()
                        .append(&pred.to_tokens_for_dialect(dialect));
                    ts.rparen();
                }
            }

            Expr::Case {
                operand,
                when_clauses,
                else_clause,
            } => {
                ts.push(Token::Case);
                if let Some(op) = operand {
                    ts.space().append(&op.to_tokens_for_dialect(dialect));
                }
                for (when, then) in when_clauses {
                    ts.space()
                        .push(Token::When)
                        .space()
                        .append(&when.to_tokens_for_dialect(dialect))
                        .space()
                        .push(Token::Then)
                        .space()
                        .append(&then.to_tokens_for_dialect(dialect));
                }
                if let Some(els) = else_clause {
                    ts.space()
                        .push(Token::Else)
                        .space()
                        .append(&els.to_tokens_for_dialect(dialect));
                }
                ts.space().push(Token::End);
            }

            Expr::Cast { expr, data_type } => {
                ts.push(Token::Cast).lparen();
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space()
                    .push(Token::As)
                    .space()
                    .push(Token::TypeName(dialect.emit_data_type(data_type)));
                ts.rparen();
            }

            Expr::Subquery(query) => {
                ts.lparen();
                ts.append(&query.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::In {
                expr,
                values,
                negated,
            } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space();
                if *negated {
                    ts.push(Token::Not).space();
                }
                ts.push(Token::In).space().lparen();
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        ts.comma().space();
                    }
                    ts.append(&value.to_tokens_for_dialect(dialect));
                }
                ts.rparen();
            }

            Expr::InSubquery {
                expr,
                subquery,
                negated,
            } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space();
                if *negated {
                    ts.push(Token::Not).space();
                }
                ts.push(Token::In).space().lparen();
                ts.append(&subquery.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::IsNull { expr, negated } => {
                ts.append(&expr.to_tokens_for_dialect(dialect));
                ts.space();
                if *negated {
                    ts.push(Token::IsNotNull);
                } else {
                    ts.push(Token::IsNull);
                }
            }

            Expr::SplitContains {
                text,
                delimiter,
                needle,
            } => {
                ts.append(&dialect.emit_split_contains(
                    text.to_tokens_for_dialect(dialect),
                    delimiter,
                    needle.to_tokens_for_dialect(dialect),
                ));
            }

            Expr::GroupedNumber { value, decimals } => {
                ts.append(
                    &dialect.emit_grouped_number(value.to_tokens_for_dialect(dialect), *decimals),
                );
            }

            Expr::Star { table } => match table {
                Some(t) => {
                    ts.push(Token::Ident(t.clone()))
                        .push(Token::Dot)
                        .push(Token::Star);
                }
                None => {
                    ts.push(Token::Star);
                }
            },

            Expr::Paren(inner) => {
                ts.lparen();
                ts.append(&inner.to_tokens_for_dialect(dialect));
                ts.rparen();
            }

            Expr::Raw(sql) => {
                ts.push(Token::Raw(sql.clone()));
            }
        }

        ts
    }

    /// Serialize to SQL for the given dialect.
    pub fn to_sql(&self, dialect: Dialect) -> String {
        self.to_tokens_for_dialect(dialect).serialize(dialect)
    }
}

// =============================================================================
// Constructors
// =============================================================================

/// Bare column reference.
pub fn col(name: &str) -> Expr {
    Expr::Column {
        table: None,
        column: name.into(),
    }
}

/// Table-qualified column reference.
pub fn table_col(table: &str, column: &str) -> Expr {
    Expr::Column {
        table: Some(table.into()),
        column: column.into(),
    }
}

pub fn lit_int(n: i64) -> Expr {
    Expr::Literal(Literal::Int(n))
}

pub fn lit_float(f: f64) -> Expr {
    Expr::Literal(Literal::Float(f))
}

pub fn lit_str(s: &str) -> Expr {
    Expr::Literal(Literal::String(s.into()))
}

pub fn lit_bool(b: bool) -> Expr {
    Expr::Literal(Literal::Bool(b))
}

pub fn lit_date(iso: &str) -> Expr {
    Expr::Literal(Literal::Date(iso.into()))
}

pub fn lit_null() -> Expr {
    Expr::Literal(Literal::Null)
}

pub fn star() -> Expr {
    Expr::Star { table: None }
}

pub fn table_star(table: &str) -> Expr {
    Expr::Star {
        table: Some(table.into()),
    }
}

/// COUNT(*)
pub fn count_star() -> Expr {
    Expr::Function {
        name: "COUNT".into(),
        args: vec![star()],
        distinct: false,
        order_by: Vec::new(),
        filter: None,
    }
}

pub fn min(expr: Expr) -> Expr {
    func("MIN", vec![expr])
}

pub fn max(expr: Expr) -> Expr {
    func("MAX", vec![expr])
}

pub fn coalesce(args: Vec<Expr>) -> Expr {
    func("COALESCE", args)
}

/// Arbitrary function call.
pub fn func(name: &str, args: Vec<Expr>) -> Expr {
    Expr::Function {
        name: name.into(),
        args,
        distinct: false,
        order_by: Vec::new(),
        filter: None,
    }
}

/// Containment of `needle` in the delimiter-split `text`.
pub fn split_contains(text: Expr, delimiter: &str, needle: Expr) -> Expr {
    Expr::SplitContains {
        text: Box::new(text),
        delimiter: delimiter.into(),
        needle: Box::new(needle),
    }
}

/// Thousands-grouped rendering of `value` with `decimals` places.
pub fn grouped_number(value: Expr, decimals: u8) -> Expr {
    Expr::GroupedNumber {
        value: Box::new(value),
        decimals,
    }
}

/// CAST(expr AS type)
pub fn cast(expr: Expr, data_type: DataType) -> Expr {
    Expr::Cast {
        expr: Box::new(expr),
        data_type,
    }
}

/// CAST(expr AS TEXT) - the validator compares every join as text.
pub fn cast_text(expr: Expr) -> Expr {
    cast(expr, DataType::Text)
}

/// Searched CASE: CASE WHEN ... THEN ... [ELSE ...] END
pub fn case_when(when_clauses: Vec<(Expr, Expr)>, else_clause: Option<Expr>) -> Expr {
    Expr::Case {
        operand: None,
        when_clauses,
        else_clause: else_clause.map(Box::new),
    }
}

/// Simple CASE with an operand: CASE x WHEN ... THEN ... [ELSE ...] END
pub fn case_of(operand: Expr, when_clauses: Vec<(Expr, Expr)>, else_clause: Option<Expr>) -> Expr {
    Expr::Case {
        operand: Some(Box::new(operand)),
        when_clauses,
        else_clause: else_clause.map(Box::new),
    }
}

// =============================================================================
// ExprExt - fluent combinators
// =============================================================================

/// Fluent combinators over `Expr`.
pub trait ExprExt: Sized {
    fn into_expr(self) -> Expr;

    fn eq(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Eq, other.into())
    }

    fn ne(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Ne, other.into())
    }

    fn gt(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Gt, other.into())
    }

    fn gte(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Gte, other.into())
    }

    fn lt(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Lt, other.into())
    }

    fn lte(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Lte, other.into())
    }

    fn and(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::And, other.into())
    }

    fn or(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Or, other.into())
    }

    fn concat(self, other: impl Into<Expr>) -> Expr {
        binary(self.into_expr(), BinaryOperator::Concat, other.into())
    }

    fn is_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: false,
        }
    }

    fn is_not_null(self) -> Expr {
        Expr::IsNull {
            expr: Box::new(self.into_expr()),
            negated: true,
        }
    }

    fn in_list(self, values: Vec<Expr>) -> Expr {
        Expr::In {
            expr: Box::new(self.into_expr()),
            values,
            negated: false,
        }
    }

    fn in_subquery(self, subquery: crate::sql::query::Query) -> Expr {
        Expr::InSubquery {
            expr: Box::new(self.into_expr()),
            subquery: Box::new(subquery),
            negated: false,
        }
    }

    fn not_in_subquery(self, subquery: crate::sql::query::Query) -> Expr {
        Expr::InSubquery {
            expr: Box::new(self.into_expr()),
            subquery: Box::new(subquery),
            negated: true,
        }
    }

    fn paren(self) -> Expr {
        Expr::Paren(Box::new(self.into_expr()))
    }
}

fn binary(left: Expr, op: BinaryOperator, right: Expr) -> Expr {
    Expr::BinaryOp {
        left: Box::new(left),
        op,
        right: Box::new(right),
    }
}

impl ExprExt for Expr {
    fn into_expr(self) -> Expr {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_to_sql() {
        assert_eq!(col("code").to_sql(Dialect::DuckDb), "\"code\"");
        assert_eq!(
            table_col("fact_table", "year_code").to_sql(Dialect::DuckDb),
            "\"fact_table\".\"year_code\""
        );
    }

    #[test]
    fn test_binary_op() {
        let e = col("language").eq(lit_str("en-GB"));
        assert_eq!(e.to_sql(Dialect::DuckDb), "\"language\" = 'en-GB'");
    }

    #[test]
    fn test_cast_text() {
        let e = cast_text(col("area_code"));
        assert_eq!(e.to_sql(Dialect::DuckDb), "CAST(\"area_code\" AS TEXT)");
    }

    #[test]
    fn test_case_of() {
        let e = case_of(
            col("format"),
            vec![(lit_str("integer"), lit_int(0))],
            Some(lit_int(2)),
        );
        assert_eq!(
            e.to_sql(Dialect::DuckDb),
            "CASE \"format\" WHEN 'integer' THEN 0 ELSE 2 END"
        );
    }

    #[test]
    fn test_function_filter_clause() {
        let e = Expr::Function {
            name: "array_agg".into(),
            args: vec![col("data_value")],
            distinct: false,
            order_by: Vec::new(),
            filter: Some(Box::new(col("x").eq(lit_str("2020")))),
        };
        assert_eq!(
            e.to_sql(Dialect::Postgres),
            "ARRAY_AGG(\"data_value\") FILTER (WHERE \"x\" = '2020')"
        );
    }

    #[test]
    fn test_is_null_and_not() {
        assert_eq!(
            col("description").is_null().to_sql(Dialect::DuckDb),
            "\"description\" IS NULL"
        );
        assert_eq!(
            col("description").is_not_null().to_sql(Dialect::DuckDb),
            "\"description\" IS NOT NULL"
        );
    }

    #[test]
    fn test_string_escaping_in_literal() {
        let e = col("note").eq(lit_str("o'clock"));
        assert_eq!(e.to_sql(Dialect::DuckDb), "\"note\" = 'o''clock'");
    }

    #[test]
    fn test_concat_operator() {
        let e = col("note_codes").concat(lit_str(",r"));
        assert_eq!(e.to_sql(Dialect::DuckDb), "\"note_codes\" || ',r'");
    }

    #[test]
    fn test_split_contains_per_dialect() {
        let e = split_contains(col("note_codes"), ",", lit_str("r"));
        assert_eq!(
            e.to_sql(Dialect::DuckDb),
            "LIST_CONTAINS(STRING_SPLIT(\"note_codes\", ','), 'r')"
        );
        assert_eq!(
            e.to_sql(Dialect::Postgres),
            "'r' = ANY(STRING_TO_ARRAY(\"note_codes\", ','))"
        );
    }

    #[test]
    fn test_grouped_number_per_dialect() {
        let e = grouped_number(col("data_value"), 2);
        assert_eq!(
            e.to_sql(Dialect::DuckDb),
            "FORMAT('{:,.2f}', ROUND(\"data_value\", 2))"
        );
        assert_eq!(
            e.to_sql(Dialect::Postgres),
            "TO_CHAR(CAST(\"data_value\" AS DECIMAL(18, 2)), 'FM999,999,999,990.00')"
        );
    }

    #[test]
    fn test_grouped_number_zero_decimals() {
        let e = grouped_number(col("v"), 0);
        assert_eq!(e.to_sql(Dialect::DuckDb), "FORMAT('{:,.0f}', ROUND(\"v\", 0))");
        assert_eq!(
            e.to_sql(Dialect::Postgres),
            "TO_CHAR(CAST(\"v\" AS DECIMAL(18, 0)), 'FM999,999,999,990')"
        );
    }
}
