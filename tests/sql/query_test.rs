use cubewright::sql::expr::{
    case_when, cast_text, col, count_star, lit_int, lit_str, table_col, ExprExt,
};
use cubewright::sql::query::{OrderByExpr, Query, TableRef, UnionChain};
use cubewright::sql::Dialect;

#[test]
fn test_simple_select() {
    let q = Query::new()
        .select(vec![col("code"), col("description")])
        .from(TableRef::new("measure").with_schema("rev"));
    assert_eq!(
        q.to_sql(Dialect::DuckDb),
        "SELECT \"code\", \"description\" FROM \"rev\".\"measure\""
    );
}

#[test]
fn test_select_star_default() {
    let q = Query::new().from(TableRef::new("fact_table"));
    assert_eq!(q.to_sql(Dialect::DuckDb), "SELECT * FROM \"fact_table\"");
}

#[test]
fn test_distinct_and_order() {
    let q = Query::new()
        .select(vec![cast_text(col("year"))])
        .distinct()
        .from(TableRef::new("fact_table"))
        .order_by(vec![OrderByExpr::asc(cast_text(col("year")))]);
    assert_eq!(
        q.to_sql(Dialect::DuckDb),
        "SELECT DISTINCT CAST(\"year\" AS TEXT) FROM \"fact_table\" \
         ORDER BY CAST(\"year\" AS TEXT) ASC"
    );
}

#[test]
fn test_left_join_with_language_predicate() {
    let q = Query::new()
        .select(vec![table_col("l", "description")])
        .from(TableRef::new("fact_table").with_alias("f"))
        .left_join(
            TableRef::new("area_lookup").with_alias("l"),
            cast_text(table_col("f", "area"))
                .eq(cast_text(table_col("l", "area")))
                .and(table_col("l", "language").eq(lit_str("cy-GB"))),
        );
    let sql = q.to_sql(Dialect::DuckDb);
    assert!(sql.contains("LEFT OUTER JOIN \"area_lookup\" AS \"l\""));
    assert!(sql.contains("AND \"l\".\"language\" = 'cy-GB'"));
}

#[test]
fn test_filter_accumulates_with_and() {
    let q = Query::new()
        .select_star()
        .from(TableRef::new("t"))
        .filter(col("a").eq(lit_int(1)))
        .filter(col("b").is_not_null());
    assert_eq!(
        q.to_sql(Dialect::DuckDb),
        "SELECT * FROM \"t\" WHERE \"a\" = 1 AND \"b\" IS NOT NULL"
    );
}

#[test]
fn test_limit_offset() {
    let q = Query::new()
        .select_star()
        .from(TableRef::new("default_view_en"))
        .limit(100)
        .offset(200);
    assert!(q.to_sql(Dialect::DuckDb).ends_with("LIMIT 100 OFFSET 200"));
    assert!(q.to_sql(Dialect::Postgres).ends_with("LIMIT 100 OFFSET 200"));
}

#[test]
fn test_count_wrapper_subquery() {
    let base = Query::new().select_star().from(TableRef::new("v"));
    let count = Query::new()
        .select(vec![count_star()])
        .from_subquery(base, "c");
    assert_eq!(
        count.to_sql(Dialect::DuckDb),
        "SELECT COUNT(*) FROM (SELECT * FROM \"v\") AS \"c\""
    );
}

#[test]
fn test_union_all_chain() {
    let en = Query::new()
        .select(vec![col("code"), lit_str("en-GB")])
        .from(TableRef::new("staging"));
    let cy = Query::new()
        .select(vec![col("code"), lit_str("cy-GB")])
        .from(TableRef::new("staging"));
    let sql = UnionChain::union_all(vec![en, cy]).to_sql(Dialect::DuckDb);
    assert!(sql.contains("UNION ALL"));
    assert!(sql.contains("'en-GB'"));
    assert!(sql.contains("'cy-GB'"));
}

#[test]
fn test_group_by_and_nulls_last() {
    let q = Query::new()
        .select(vec![col("y"), count_star()])
        .from(TableRef::new("fact_table"))
        .group_by(vec![col("y")])
        .order_by(vec![OrderByExpr::asc(col("s")).nulls_last()]);
    let sql = q.to_sql(Dialect::Postgres);
    assert!(sql.contains("GROUP BY \"y\""));
    assert!(sql.contains("ORDER BY \"s\" ASC NULLS LAST"));
}

#[test]
fn test_case_expression_in_select() {
    let q = Query::new()
        .select(vec![case_when(
            vec![(col("n").is_null(), lit_str("r"))],
            Some(col("n")),
        )])
        .from(TableRef::new("t"));
    assert_eq!(
        q.to_sql(Dialect::DuckDb),
        "SELECT CASE WHEN \"n\" IS NULL THEN 'r' ELSE \"n\" END FROM \"t\""
    );
}

#[test]
fn test_table_function_from() {
    let q = Query::new()
        .select_star()
        .from_table_function("read_csv('/tmp/x.csv', header = true)");
    assert_eq!(
        q.to_sql(Dialect::DuckDb),
        "SELECT * FROM read_csv('/tmp/x.csv', header = true)"
    );
}

#[test]
fn test_identifier_injection_is_quoted() {
    let q = Query::new()
        .select(vec![col("evil\"; DROP TABLE fact_table; --")])
        .from(TableRef::new("t"));
    let sql = q.to_sql(Dialect::DuckDb);
    assert!(sql.contains("\"evil\"\"; DROP TABLE fact_table; --\""));
}

#[test]
fn test_literal_injection_is_escaped() {
    let q = Query::new()
        .select_star()
        .from(TableRef::new("t"))
        .filter(col("a").eq(lit_str("x'; DROP TABLE t; --")));
    let sql = q.to_sql(Dialect::DuckDb);
    assert!(sql.contains("'x''; DROP TABLE t; --'"));
}
